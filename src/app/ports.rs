//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ HapticPlayer / Controller (domain)
//! ```
//!
//! Driven adapters (haptic driver, actuators, LED ring, MIDI transport,
//! event sinks) implement these traits. The domain consumes them via
//! generics, so the render loop and controller never touch hardware
//! directly and run unchanged against mocks on the host.

use crate::drivers::led_ring::Frame;
use crate::error::DriverError;
use crate::midi::MidiMessage;

// ───────────────────────────────────────────────────────────────
// Haptic driver port (domain → LRA driver chip)
// ───────────────────────────────────────────────────────────────

/// Register-level access to the haptic driver chip.
///
/// Bring-up uses the register accessors; the render task only ever calls
/// [`write_realtime_amplitude`](Self::write_realtime_amplitude).
pub trait HapticDriver {
    fn read_register(&mut self, addr: u8) -> Result<u8, DriverError>;

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), DriverError>;

    /// Emit one realtime-playback amplitude (0-127).
    fn write_realtime_amplitude(&mut self, amplitude: u8) -> Result<(), DriverError>;

    /// Read-modify-write helper.
    fn update_register(
        &mut self,
        addr: u8,
        f: impl FnOnce(u8) -> u8,
    ) -> Result<(), DriverError> {
        let value = self.read_register(addr)?;
        self.write_register(addr, f(value))
    }
}

// ───────────────────────────────────────────────────────────────
// Level actuator port (domain → air pumps / heater)
// ───────────────────────────────────────────────────────────────

/// An actuator commanded by a single 0-127 CC-style level.
pub trait LevelActuator {
    fn apply_level(&mut self, level: u8);

    /// Drive every output to its off state.
    fn stop(&mut self);
}

// ───────────────────────────────────────────────────────────────
// LED ring port
// ───────────────────────────────────────────────────────────────

pub trait LedRingPort {
    fn show(&mut self, frame: &Frame);
}

// ───────────────────────────────────────────────────────────────
// MIDI port (transport ↔ domain)
// ───────────────────────────────────────────────────────────────

/// Bidirectional MIDI transport (BLE-MIDI on the device).
pub trait MidiPort {
    /// Next fully decoded inbound message, if any.
    fn poll(&mut self) -> Option<MidiMessage>;

    /// Queue an outbound message. Returns `false` when the transport is
    /// not connected and the message was dropped.
    fn send(&mut self, msg: MidiMessage) -> bool;

    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
