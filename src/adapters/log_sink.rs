//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started(variant) => {
                info!("START | variant={:?}", variant);
            }
            AppEvent::EffectSelected { index, effect } => {
                info!(
                    "EFFECT | #{} {} | {} step(s), {} ms/pass",
                    index,
                    effect.name(),
                    effect.len(),
                    effect.pass_duration_ms()
                );
            }
            AppEvent::VolumeChanged(v) => {
                info!("VOLUME | {:.2}", v);
            }
            AppEvent::LevelChanged(level) => {
                info!("LEVEL | CC={}", level);
            }
            AppEvent::HapticFault(e) => {
                warn!("FAULT | haptics disabled: {}", e);
            }
            AppEvent::TestNote(sent) => {
                if *sent {
                    info!("MIDI | test note sent");
                } else {
                    warn!("MIDI | test note dropped (not connected)");
                }
            }
        }
    }
}
