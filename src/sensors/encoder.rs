//! Quadrature rotary encoder.
//!
//! The GPIO ISR feeds both channel levels into a transition-table decoder
//! that accumulates signed pulses in a static atomic. The control loop
//! turns pulses into detents (four pulses per detent) and from there into
//! either an unbounded position (effect selection) or a clamped 0-127 CC
//! level (air / heat).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: `encoder_isr_handler` is called from the any-edge GPIO ISR
//! registered by hw_init.
//! On host/test: pulses are injected with `sim_add_encoder_pulses`.

use core::sync::atomic::{AtomicI32, AtomicU8, Ordering};

/// Pulses (valid quadrature transitions) per mechanical detent.
pub const PULSES_PER_DETENT: i32 = 4;

/// Direction for each `(previous AB << 2) | current AB` transition.
/// Invalid double-steps and no-change entries are 0.
const TRANSITIONS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Pure transition-table decoder.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuadratureDecoder {
    ab: u8,
}

impl QuadratureDecoder {
    pub const fn new() -> Self {
        Self { ab: 0 }
    }

    /// Feed the current channel levels; returns -1, 0 or +1.
    pub fn update(&mut self, a: bool, b: bool) -> i8 {
        let next = (u8::from(a) << 1) | u8::from(b);
        let delta = TRANSITIONS[usize::from((self.ab << 2) | next)];
        self.ab = next;
        delta
    }
}

// ── ISR side ──────────────────────────────────────────────────

static ENC_AB: AtomicU8 = AtomicU8::new(0);
static ENC_PULSES: AtomicI32 = AtomicI32::new(0);

/// Lock-free; safe to call from interrupt context.
pub fn encoder_isr_handler(a: bool, b: bool) {
    let next = (u8::from(a) << 1) | u8::from(b);
    let prev = ENC_AB.swap(next, Ordering::Relaxed);
    let delta = TRANSITIONS[usize::from((prev << 2) | next)];
    if delta != 0 {
        ENC_PULSES.fetch_add(i32::from(delta), Ordering::Relaxed);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_add_encoder_pulses(pulses: i32) {
    ENC_PULSES.fetch_add(pulses, Ordering::Relaxed);
}

/// Detents from a raw pulse count, rounding towards negative infinity so
/// every detent spans exactly four pulses in both directions.
pub fn detents_from_pulses(pulses: i32) -> i32 {
    pulses.div_euclid(PULSES_PER_DETENT)
}

/// Unbounded detent position read from the ISR accumulator.
pub struct RotaryEncoder {
    origin: i32,
}

impl Default for RotaryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RotaryEncoder {
    /// Position 0 is wherever the knob rests at construction.
    pub fn new() -> Self {
        Self {
            origin: ENC_PULSES.load(Ordering::Relaxed),
        }
    }

    pub fn position(&self) -> i32 {
        detents_from_pulses(ENC_PULSES.load(Ordering::Relaxed).wrapping_sub(self.origin))
    }
}

// ── Level encoder ─────────────────────────────────────────────

pub const LEVEL_MAX: u8 = 127;

/// Turns detent positions into a clamped 0-127 level. Each detent moves
/// the level by `multiplier`.
#[derive(Debug, Clone)]
pub struct LevelEncoder {
    value: u8,
    multiplier: i32,
    last_position: i32,
}

impl LevelEncoder {
    pub fn new(initial: u8, multiplier: i32) -> Self {
        Self {
            value: initial.min(LEVEL_MAX),
            multiplier,
            last_position: 0,
        }
    }

    pub fn value(&self) -> u8 {
        self.value
    }

    /// Overwrite the level (e.g. when a MIDI CC arrives) without moving
    /// the position reference.
    pub fn set_value(&mut self, value: u8) {
        self.value = value.min(LEVEL_MAX);
    }

    /// Feed the latest position. Returns the new level when it changed.
    pub fn update(&mut self, position: i32) -> Option<u8> {
        let delta = position.wrapping_sub(self.last_position);
        self.last_position = position;
        if delta == 0 {
            return None;
        }
        let next = (i32::from(self.value) + delta.saturating_mul(self.multiplier))
            .clamp(0, i32::from(LEVEL_MAX)) as u8;
        if next == self.value {
            return None;
        }
        self.value = next;
        Some(next)
    }
}
