//! Outbound application events.
//!
//! The [`Controller`](super::controller::Controller) emits these through
//! the [`EventSink`](super::ports::EventSink) port. Adapters on the other
//! side decide what to do with them: log to serial, notify a BLE client.

use std::sync::Arc;

use crate::config::ProductVariant;
use crate::error::BringUpError;
use crate::haptic::Effect;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The controller has started (carries the product variant).
    Started(ProductVariant),

    /// A new effect was installed.
    EffectSelected { index: usize, effect: Arc<Effect> },

    /// The haptic volume changed.
    VolumeChanged(f32),

    /// The air/heat level changed.
    LevelChanged(u8),

    /// The haptic driver failed bring-up and haptics are disabled.
    HapticFault(BringUpError),

    /// A MIDI test note was sent (`true`) or dropped for lack of a
    /// connection (`false`).
    TestNote(bool),
}
