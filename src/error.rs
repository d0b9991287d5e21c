//! Unified error types for the HBITS firmware.
//!
//! One `Error` enum that every subsystem converts into, so `main` and the
//! controller handle failures uniformly. All variants are `Copy` and carry
//! no heap data; they cross task boundaries freely.
//!
//! Only the haptic bring-up fault is ever fatal. Everything the render task
//! or the control loop hits at runtime is recovered locally (logged, counted,
//! skipped) and never reaches this type.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A bus transaction with the haptic driver failed.
    Driver(DriverError),
    /// The haptic driver could not be brought up.
    BringUp(BringUpError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
    /// A background task could not be spawned.
    Spawn,
    /// A background task panicked before it could be joined.
    TaskPanicked,
    /// A Bluetooth stack call returned this `esp_err_t`.
    Ble(i32),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Driver(e) => write!(f, "driver: {e}"),
            Self::BringUp(e) => write!(f, "bring-up: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Spawn => write!(f, "task spawn failed"),
            Self::TaskPanicked => write!(f, "task panicked"),
            Self::Ble(code) => write!(f, "ble: esp_err {code}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Driver (bus) errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// The device did not acknowledge its address or a data byte.
    Nack,
    /// Any other bus-level failure (arbitration loss, timeout, overrun).
    Bus,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nack => write!(f, "no acknowledge"),
            Self::Bus => write!(f, "bus error"),
        }
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

// ---------------------------------------------------------------------------
// Bring-up faults
// ---------------------------------------------------------------------------

/// Fatal faults of the one-shot haptic driver configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BringUpError {
    /// The chip did not answer the identity read.
    NotDetected,
    /// The chip answered but its device id is not a supported part.
    UnexpectedDevice(u8),
    /// A configuration register write or read-back failed.
    Register { addr: u8, cause: DriverError },
}

impl fmt::Display for BringUpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotDetected => write!(f, "haptic driver not detected"),
            Self::UnexpectedDevice(id) => write!(f, "unexpected device id {id}"),
            Self::Register { addr, cause } => {
                write!(f, "register 0x{addr:02X} access failed ({cause})")
            }
        }
    }
}

impl From<BringUpError> for Error {
    fn from(e: BringUpError) -> Self {
        Self::BringUp(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
