//! Air (pump/valve) and heat MOSFET drivers.
//!
//! Both are commanded with a 0-127 CC-style level and drive LEDC PWM
//! channels at 8-bit duty.
//!
//! ## Air: 64-centred level
//!
//! | Level  | Mode    | M1 pump+ | M2 pump- | M3 valve+ | M4 valve- |
//! |--------|---------|----------|----------|-----------|-----------|
//! | 64     | Stopped | 0        | 0        | 0         | 0         |
//! | 65-127 | Inflate | d        | 0        | d         | 0         |
//! | 0-63   | Deflate | 0        | d        | 0         | d         |
//!
//! Inflate `d = map(level, 65, 127, 0, 255)`; deflate
//! `d = map(level, 0, 63, 255, 0)`.
//!
//! ## Heat
//!
//! `duty = level * 255 / 127`.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives real PWM via hw_init helpers.
//! On host/test: tracks duties in-memory only.

use crate::drivers::hw_init;

pub const AIR_CENTRE: u8 = 64;

/// Integer linear re-mapping, truncating towards zero like the classic
/// Arduino `map`.
pub fn map_range(x: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    if in_max == in_min {
        return out_min;
    }
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AirMode {
    Stopped,
    Inflate,
    Deflate,
}

/// Mode and the four channel duties for an air level.
pub fn air_duties(level: u8) -> (AirMode, [u8; 4]) {
    let level = i32::from(level.min(127));
    match level.cmp(&i32::from(AIR_CENTRE)) {
        core::cmp::Ordering::Equal => (AirMode::Stopped, [0; 4]),
        core::cmp::Ordering::Greater => {
            let d = map_range(level, 65, 127, 0, 255).clamp(0, 255) as u8;
            (AirMode::Inflate, [d, 0, d, 0])
        }
        core::cmp::Ordering::Less => {
            let d = map_range(level, 0, 63, 255, 0).clamp(0, 255) as u8;
            (AirMode::Deflate, [0, d, 0, d])
        }
    }
}

/// Percentage of full inflate/deflate shown in logs.
pub fn air_percent(level: u8) -> u8 {
    let level = u16::from(level.min(127));
    let centre = u16::from(AIR_CENTRE);
    if level >= centre {
        ((level - centre) * 100 / 63) as u8
    } else {
        ((63 - level) * 100 / 63) as u8
    }
}

pub fn heat_duty(level: u8) -> u8 {
    (u16::from(level.min(127)) * 255 / 127) as u8
}

// ── Air ───────────────────────────────────────────────────────

pub struct AirDriver {
    mode: AirMode,
    duties: [u8; 4],
}

impl Default for AirDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl AirDriver {
    pub fn new() -> Self {
        Self {
            mode: AirMode::Stopped,
            duties: [0; 4],
        }
    }

    pub fn set_level(&mut self, level: u8) {
        let (mode, duties) = air_duties(level);
        for (&ch, &duty) in hw_init::LEDC_CH_AIR.iter().zip(duties.iter()) {
            hw_init::ledc_set(ch, duty);
        }
        if mode != self.mode {
            log::info!("air: {:?} {}% (CC={})", mode, air_percent(level), level);
        }
        self.mode = mode;
        self.duties = duties;
    }

    pub fn stop(&mut self) {
        self.set_level(AIR_CENTRE);
    }

    pub fn mode(&self) -> AirMode {
        self.mode
    }

    pub fn duties(&self) -> [u8; 4] {
        self.duties
    }
}

// ── Heat ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct HeatDriver {
    duty: u8,
}

impl HeatDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_level(&mut self, level: u8) {
        let duty = heat_duty(level);
        hw_init::ledc_set(hw_init::LEDC_CH_HEAT, duty);
        self.duty = duty;
    }

    pub fn stop(&mut self) {
        self.set_level(0);
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }
}
