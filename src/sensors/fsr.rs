//! Force-sensitive resistor → haptic volume.
//!
//! Samples the FSR divider through ADC1, widens the 12-bit sample to the
//! 14-bit scale the volume calibration is expressed in, and smooths it with
//! an exponential moving average. The control loop polls it at a fixed
//! interval and only applies a new volume once it moves far enough from
//! the current one.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1_CH0 via the oneshot API (initialised by hw_init).
//! On host/test: reads from a static `AtomicU16` for injection.

use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;

static SIM_FSR_ADC: AtomicU16 = AtomicU16::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_fsr_adc(raw: u16) {
    SIM_FSR_ADC.store(raw, Ordering::Relaxed);
}

/// 12-bit ADC → 14-bit working scale.
const SCALE_SHIFT: u32 = 2;
/// EMA weight of a new sample is 1 / 2^EMA_SHIFT.
const EMA_SHIFT: u32 = 2;

/// Map a filtered reading to a volume in 0.01 steps.
///
/// Readings at or above `full_scale` are full volume.
pub fn volume_from_raw(raw: u16, full_scale: u16) -> f32 {
    if full_scale == 0 {
        return 0.0;
    }
    let percent = u32::from(raw.min(full_scale)) * 100 / u32::from(full_scale);
    percent as f32 / 100.0
}

pub struct FsrSensor {
    /// Filter state, 14-bit scale shifted left by EMA_SHIFT.
    acc: Option<u32>,
    poll_interval_ms: u64,
    last_poll_ms: Option<u64>,
}

impl FsrSensor {
    pub fn new(poll_interval_ms: u32) -> Self {
        Self {
            acc: None,
            poll_interval_ms: u64::from(poll_interval_ms),
            last_poll_ms: None,
        }
    }

    /// Take one sample and return the filtered 14-bit reading.
    pub fn read(&mut self) -> u16 {
        let sample = u32::from(self.read_adc().min(4095)) << SCALE_SHIFT;
        let acc = match self.acc {
            // Seed with the first sample so startup does not ramp from 0.
            None => sample << EMA_SHIFT,
            Some(acc) => acc - (acc >> EMA_SHIFT) + sample,
        };
        self.acc = Some(acc);
        (acc >> EMA_SHIFT) as u16
    }

    /// Sample when the poll interval has elapsed.
    pub fn poll(&mut self, now_ms: u64) -> Option<u16> {
        let due = self
            .last_poll_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.poll_interval_ms);
        if !due {
            return None;
        }
        self.last_poll_ms = Some(now_ms);
        Some(self.read())
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> u16 {
        hw_init::adc1_read(hw_init::ADC1_CH_FSR)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> u16 {
        SIM_FSR_ADC.load(Ordering::Relaxed)
    }
}

/// Applies a new volume only when it differs from the current one by more
/// than the threshold, so sensor noise does not churn the playback state.
#[derive(Debug, Clone, Copy)]
pub struct VolumeGate {
    threshold: f32,
}

impl VolumeGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn filter(&self, candidate: f32, current: f32) -> Option<f32> {
        ((candidate - current).abs() > self.threshold).then_some(candidate)
    }
}
