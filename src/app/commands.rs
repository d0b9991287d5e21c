//! Inbound control events.
//!
//! These represent input from the outside world (BLE-MIDI callbacks and
//! the serial CLI) that the
//! [`Controller`](super::controller::Controller) interprets and acts upon.
//! They travel through the lock-free [`events`](crate::events) queue, so
//! every variant is `Copy`.

use crate::cli::CliCommand;

/// Control input delivered to the foreground loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    /// Haptic volume, 0.0-1.0 (clamped on application).
    Volume(f32),

    /// Air/heat level on the 0-127 CC scale.
    Level(u8),

    /// Install the effect at this library index.
    SelectEffect(usize),

    /// Play the MIDI test note (CLI `test`).
    SendTestNote,

    /// A parsed serial command; its reply is printed by the loop.
    Cli(CliCommand),
}
