//! System configuration parameters
//!
//! All tunable parameters for the HBITS firmware. Values are compiled in;
//! product variants differ only in [`ControlConfig::variant`] and the
//! advertised device name.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which actuator the foreground loop drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductVariant {
    /// LRA haptics: FSR/CC volume, encoder effect selection.
    Haptic,
    /// Pump/valve air pressure, 64-centred level.
    Air,
    /// Single PWM heater, 0-127 level.
    Heat,
    /// Encoder-driven LED ring only (no actuator).
    LedOnly,
}

/// When the render task picks up a newly installed effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwitchPolicy {
    /// Snapshot once per pass; a new effect starts after the current pass.
    PassBoundary,
    /// Re-check before every step; a new effect starts at its first step.
    StepBoundary,
}

/// What happens when the haptic driver fails to come up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BringUpPolicy {
    /// Report the fault and stop the device (debug builds).
    Halt,
    /// Report the fault and keep running without haptics (field builds).
    Disable,
}

impl BringUpPolicy {
    /// `Halt` when debug assertions are on, `Disable` otherwise.
    pub const fn for_build() -> Self {
        if cfg!(debug_assertions) {
            Self::Halt
        } else {
            Self::Disable
        }
    }
}

/// Haptic subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HapticConfig {
    /// LRA resonance the open-loop drive period is computed from (Hz).
    pub lra_target_hz: f32,
    /// OD_CLAMP register value.
    pub output_clamp: u8,
    /// Volume installed before the first control input arrives (0.0-1.0).
    pub startup_volume: f32,
    /// Sleep between idle emissions (milliseconds).
    pub idle_interval_ms: u32,
    /// Largest amplitude the realtime input accepts.
    pub amplitude_max: u8,
    pub switch_policy: SwitchPolicy,
    pub bring_up_policy: BringUpPolicy,
    /// CPU core the render task is pinned to.
    pub task_core: u8,
    pub task_priority: u8,
    pub task_stack_kb: usize,
}

impl Default for HapticConfig {
    fn default() -> Self {
        Self {
            lra_target_hz: 175.0,
            output_clamp: 0x60,
            startup_volume: 0.0,
            idle_interval_ms: 100,
            amplitude_max: 127,
            switch_policy: SwitchPolicy::PassBoundary,
            bring_up_policy: BringUpPolicy::for_build(),
            task_core: 0,
            task_priority: 1,
            task_stack_kb: 4,
        }
    }
}

/// Encoder → effect mapping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Detents per full turn of the ring (cycle length).
    pub positions: u16,
    /// Number of effect bands the cycle is split into.
    pub bands: u16,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            positions: 24,
            bands: 6,
        }
    }
}

/// Foreground control loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    pub variant: ProductVariant,
    /// MIDI CC carrying haptic volume.
    pub volume_cc: u8,
    /// MIDI CC carrying the air/heat level.
    pub level_cc: u8,
    /// Encoder detent → CC step multiplier for level variants.
    pub encoder_multiplier: i32,
    /// Raw FSR reading that maps to full volume.
    pub fsr_full_scale: u16,
    pub fsr_poll_interval_ms: u32,
    /// Minimum FSR-derived volume change before it is applied.
    pub volume_change_threshold: f32,
    pub loop_interval_ms: u32,
    pub status_interval_ms: u32,
    pub watchdog_timeout_ms: u32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            variant: ProductVariant::Haptic,
            volume_cc: 22,
            level_cc: 23,
            encoder_multiplier: 6,
            fsr_full_scale: 8200,
            fsr_poll_interval_ms: 50,
            volume_change_threshold: 0.05,
            loop_interval_ms: 5,
            status_interval_ms: 10_000,
            watchdog_timeout_ms: 10_000,
        }
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// BLE-MIDI advertised name.
    pub device_name: heapless::String<24>,
    pub haptic: HapticConfig,
    pub selector: SelectorConfig,
    pub control: ControlConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self::for_variant(ProductVariant::Haptic)
    }
}

impl SystemConfig {
    /// Defaults for one product configuration.
    pub fn for_variant(variant: ProductVariant) -> Self {
        let name = match variant {
            ProductVariant::Haptic => "HBITS Haptic 1",
            ProductVariant::Air => "HBITS Air 1",
            ProductVariant::Heat => "HBITS Heat 1",
            ProductVariant::LedOnly => "HBITS Ring 1",
        };
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str(name);

        // Effect selection counts raw detents; level encoders step in CC units.
        let encoder_multiplier = match variant {
            ProductVariant::Haptic | ProductVariant::LedOnly => 1,
            ProductVariant::Air | ProductVariant::Heat => 6,
        };

        Self {
            device_name,
            haptic: HapticConfig::default(),
            selector: SelectorConfig::default(),
            control: ControlConfig {
                variant,
                encoder_multiplier,
                ..ControlConfig::default()
            },
        }
    }

    /// Reject configurations the firmware cannot run with.
    pub fn validate(&self) -> Result<()> {
        let s = &self.selector;
        if s.bands == 0 || s.positions == 0 {
            return Err(Error::Config("selector needs at least one band and position"));
        }
        if s.positions % s.bands != 0 {
            return Err(Error::Config("selector positions must divide evenly into bands"));
        }
        let h = &self.haptic;
        if !h.lra_target_hz.is_finite() || h.lra_target_hz <= 0.0 {
            return Err(Error::Config("lra_target_hz must be positive"));
        }
        if h.idle_interval_ms == 0 {
            return Err(Error::Config("idle_interval_ms must be non-zero"));
        }
        if h.amplitude_max == 0 {
            return Err(Error::Config("amplitude_max must be non-zero"));
        }
        let c = &self.control;
        if c.loop_interval_ms == 0 || c.fsr_poll_interval_ms == 0 {
            return Err(Error::Config("control intervals must be non-zero"));
        }
        if c.fsr_full_scale == 0 {
            return Err(Error::Config("fsr_full_scale must be non-zero"));
        }
        if c.encoder_multiplier <= 0 {
            return Err(Error::Config("encoder_multiplier must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let c = SystemConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.control.variant, ProductVariant::Haptic);
        assert_eq!(c.device_name.as_str(), "HBITS Haptic 1");
    }

    #[test]
    fn every_variant_is_valid() {
        for v in [
            ProductVariant::Haptic,
            ProductVariant::Air,
            ProductVariant::Heat,
            ProductVariant::LedOnly,
        ] {
            let c = SystemConfig::for_variant(v);
            assert!(c.validate().is_ok(), "{:?}", v);
            assert_eq!(c.control.variant, v);
        }
    }

    #[test]
    fn uneven_bands_rejected() {
        let mut c = SystemConfig::default();
        c.selector.bands = 5;
        assert!(matches!(c.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn zero_bands_rejected() {
        let mut c = SystemConfig::default();
        c.selector.bands = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn bad_frequency_rejected() {
        let mut c = SystemConfig::default();
        c.haptic.lra_target_hz = 0.0;
        assert!(c.validate().is_err());
        c.haptic.lra_target_hz = f32::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn default_band_is_four_detents_wide() {
        let c = SelectorConfig::default();
        assert_eq!(c.positions / c.bands, 4);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::for_variant(ProductVariant::Air);
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(c2.control.variant, ProductVariant::Air);
        assert_eq!(c2.haptic.output_clamp, 0x60);
        assert_eq!(c2.device_name, c.device_name);
        assert!((c2.haptic.lra_target_hz - 175.0).abs() < 0.001);
    }
}
