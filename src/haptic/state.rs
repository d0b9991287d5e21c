//! Shared playback state between the control loop and the render task.
//!
//! ```text
//!   control loop ──set_effect/set_volume──▶ PlaybackState ◀──snapshot── render task
//! ```
//!
//! Every field is independently atomic. The effect slot is an
//! `ArcSwapOption`: a writer publishes a whole `Arc<Effect>`, a reader
//! takes a clone of whatever is installed. Neither side blocks, and a
//! reader never observes a half-replaced effect.
//!
//! Volume is stored as `f32` bits in an `AtomicU32`.

use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::haptic::effects::Effect;

pub struct PlaybackState {
    effect: ArcSwapOption<Effect>,
    volume_bits: AtomicU32,
    last_emitted: AtomicU8,
    emit_faults: AtomicU32,
    stopped: AtomicBool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Clamp into 0.0-1.0; NaN reads as silence.
fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

impl PlaybackState {
    /// Empty slot (idle) at the given startup volume.
    pub fn new(startup_volume: f32) -> Self {
        Self {
            effect: ArcSwapOption::empty(),
            volume_bits: AtomicU32::new(sanitize_volume(startup_volume).to_bits()),
            last_emitted: AtomicU8::new(0),
            emit_faults: AtomicU32::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    // ── Effect slot ───────────────────────────────────────────

    pub fn set_effect(&self, effect: Arc<Effect>) {
        self.effect.store(Some(effect));
    }

    /// Empty the slot; the render task goes idle after its current pass.
    pub fn clear_effect(&self) {
        self.effect.store(None);
    }

    /// Snapshot of the installed effect.
    pub fn effect(&self) -> Option<Arc<Effect>> {
        self.effect.load_full()
    }

    /// Whether `effect` is the very allocation currently installed.
    pub fn is_current(&self, effect: &Arc<Effect>) -> bool {
        self.effect
            .load()
            .as_ref()
            .is_some_and(|cur| Arc::ptr_eq(cur, effect))
    }

    // ── Volume ────────────────────────────────────────────────

    pub fn set_volume(&self, volume: f32) {
        self.volume_bits
            .store(sanitize_volume(volume).to_bits(), Ordering::Relaxed);
    }

    pub fn volume(&self) -> f32 {
        f32::from_bits(self.volume_bits.load(Ordering::Relaxed))
    }

    // ── Render bookkeeping ────────────────────────────────────

    pub fn record_emitted(&self, amplitude: u8) {
        self.last_emitted.store(amplitude, Ordering::Relaxed);
    }

    /// Last amplitude the driver accepted.
    pub fn last_emitted(&self) -> u8 {
        self.last_emitted.load(Ordering::Relaxed)
    }

    /// Count one failed emission; returns the new total.
    pub fn record_fault(&self) -> u32 {
        self.emit_faults.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
    }

    pub fn emit_faults(&self) -> u32 {
        self.emit_faults.load(Ordering::Relaxed)
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}
