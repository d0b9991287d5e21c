//! Haptic render task.
//!
//! Plays whatever effect is installed in [`PlaybackState`] to the driver,
//! forever, at the timing the effect's steps declare:
//!
//! ```text
//!           effect slot empty (or zero steps)
//!   ┌──────┐ ─────────────────────────────────▶ ┌─────────┐
//!   │ Idle │                                    │ Playing │
//!   └──────┘ ◀───────────────────────────────── └─────────┘
//!    emit 0, wait idle_interval     emit scaled step, wait hold_ms
//! ```
//!
//! The only suspension points are the per-step hold and the idle wait,
//! both through the injected [`DelayNs`]. A pass of zero-length steps
//! ends with a [`MIN_PASS_WAIT_MS`] wait instead of looping hot. Emission failures never stop the
//! task; they are counted and the schedule continues.

use std::sync::Arc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::app::ports::HapticDriver;
use crate::config::{HapticConfig, SwitchPolicy};
use crate::haptic::state::PlaybackState;

/// Consecutive emission faults between repeated warnings.
const FAULT_LOG_EVERY: u32 = 100;

/// Wait after a pass whose steps all hold 0 ms, so the task still
/// suspends once per pass.
pub const MIN_PASS_WAIT_MS: u32 = 1;

/// Scale a design amplitude by volume.
///
/// `round(amplitude × volume)` with halves rounded away from zero, then
/// clamped to `0..=max`. Volume outside 0.0-1.0 is clamped first and NaN
/// is treated as silence.
pub fn scale_amplitude(amplitude: u8, volume: f32, max: u8) -> u8 {
    let volume = if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    };
    let scaled = (f32::from(amplitude) * volume).round();
    scaled.clamp(0.0, f32::from(max)) as u8
}

/// What one call to [`RenderTask::run_pass`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Nothing playable installed; emitted 0 and waited one idle interval.
    Idle,
    /// Played every step of the snapshot taken at the start of the pass.
    Completed { steps: usize },
    /// A different effect was installed mid-pass and the pass ended early
    /// (step-boundary switching only).
    Switched { steps: usize },
    /// The stop flag was raised.
    Stopped,
}

pub struct RenderTask<D, T> {
    driver: D,
    delay: T,
    state: Arc<PlaybackState>,
    idle_interval_ms: u32,
    amplitude_max: u8,
    switch_policy: SwitchPolicy,
    consecutive_faults: u32,
}

impl<D: HapticDriver, T: DelayNs> RenderTask<D, T> {
    /// The driver must already be brought up.
    pub fn new(driver: D, delay: T, state: Arc<PlaybackState>, config: &HapticConfig) -> Self {
        Self {
            driver,
            delay,
            state,
            idle_interval_ms: config.idle_interval_ms,
            amplitude_max: config.amplitude_max,
            switch_policy: config.switch_policy,
            consecutive_faults: 0,
        }
    }

    /// Run one full pass of the installed effect, or one idle tick.
    pub fn run_pass(&mut self) -> PassOutcome {
        if self.state.is_stopped() {
            return PassOutcome::Stopped;
        }

        // Held for the whole pass even if the slot is replaced meanwhile.
        let Some(effect) = self.state.effect().filter(|e| !e.is_empty()) else {
            self.emit(0);
            self.delay.delay_ms(self.idle_interval_ms);
            return PassOutcome::Idle;
        };

        let mut steps = 0;
        for step in effect.steps() {
            if self.state.is_stopped() {
                return PassOutcome::Stopped;
            }
            if self.switch_policy == SwitchPolicy::StepBoundary && !self.state.is_current(&effect) {
                log::debug!("haptic: switching away from {} after {} steps", effect.name(), steps);
                return PassOutcome::Switched { steps };
            }

            // Volume is re-read every step so changes land mid-pass.
            let amplitude = scale_amplitude(step.amplitude, self.state.volume(), self.amplitude_max);
            self.emit(amplitude);
            self.delay.delay_ms(step.hold_ms);
            steps += 1;
        }

        if effect.pass_duration_ms() == 0 {
            self.delay.delay_ms(MIN_PASS_WAIT_MS);
        }
        PassOutcome::Completed { steps }
    }

    /// Loop until the stop flag is raised, then silence the output and
    /// hand the driver back.
    pub fn run(mut self) -> D {
        log::info!(
            "haptic: render task running (idle {}ms, {:?})",
            self.idle_interval_ms,
            self.switch_policy
        );
        while self.run_pass() != PassOutcome::Stopped {}

        self.emit(0);
        log::info!("haptic: render task stopped");
        self.driver
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn delay(&self) -> &T {
        &self.delay
    }

    fn emit(&mut self, amplitude: u8) {
        match self.driver.write_realtime_amplitude(amplitude) {
            Ok(()) => {
                self.state.record_emitted(amplitude);
                self.consecutive_faults = 0;
            }
            Err(e) => {
                let total = self.state.record_fault();
                self.consecutive_faults = self.consecutive_faults.saturating_add(1);
                if self.consecutive_faults == 1 || self.consecutive_faults % FAULT_LOG_EVERY == 0 {
                    log::warn!(
                        "haptic: emit {} failed: {} ({} in a row, {} total)",
                        amplitude,
                        e,
                        self.consecutive_faults,
                        total
                    );
                }
            }
        }
    }
}

/// [`DelayNs`] backed by the scheduler's sleep. On ESP-IDF this yields the
/// FreeRTOS task for the duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
