//! Application core — control logic behind port traits.
//!
//! The [`controller`] turns encoder, FSR, MIDI and CLI input into haptic
//! playback, actuator levels and ring frames. All interaction with
//! hardware happens through the **port traits** in [`ports`], so the
//! whole layer runs against mocks on the host.

pub mod commands;
pub mod controller;
pub mod events;
pub mod ports;
