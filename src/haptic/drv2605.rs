//! DRV2605(L) LRA driver: register map, I2C transport, bring-up.
//!
//! The chip is run in open-loop realtime-playback (RTP) mode: after
//! bring-up, the render task writes one unsigned amplitude byte to the RTP
//! input register per step and the chip drives the LRA at that level.
//!
//! Bring-up order:
//!
//! ```text
//!   STATUS id check ─▶ MODE=0 (leave standby) ─▶ RTP=0
//!     ─▶ FEEDBACK.N_ERM_LRA=1            (LRA load)
//!     ─▶ CONTROL3.LRA_OPEN_LOOP=1, DATA_FORMAT_RTP=0 (unsigned)
//!     ─▶ OL_LRA_PERIOD=ol_period_from_hz(f)
//!     ─▶ OD_CLAMP
//!     ─▶ MODE=RTP
//! ```

use embedded_hal::i2c::{ErrorKind, I2c};

use crate::app::ports::HapticDriver;
use crate::config::HapticConfig;
use crate::error::{BringUpError, DriverError};

/// 7-bit I2C address (fixed in silicon).
pub const I2C_ADDR: u8 = 0x5A;

/// Register addresses and bit fields.
pub mod reg {
    pub const STATUS: u8 = 0x00;
    pub const MODE: u8 = 0x01;
    pub const RTP_INPUT: u8 = 0x02;
    pub const OD_CLAMP: u8 = 0x17;
    pub const FEEDBACK: u8 = 0x1A;
    pub const CONTROL3: u8 = 0x1D;
    pub const OL_LRA_PERIOD: u8 = 0x20;

    pub const MODE_INTERNAL_TRIGGER: u8 = 0x00;
    pub const MODE_REALTIME: u8 = 0x05;

    /// FEEDBACK: 1 = LRA, 0 = ERM.
    pub const FEEDBACK_N_ERM_LRA: u8 = 0x80;
    /// CONTROL3: open-loop LRA drive.
    pub const CONTROL3_LRA_OPEN_LOOP: u8 = 0x01;
    /// CONTROL3: 1 = unsigned RTP data.
    pub const CONTROL3_DATA_FORMAT_RTP: u8 = 0x20;

    pub const STATUS_DEVICE_ID_SHIFT: u8 = 5;
}

/// Device ids (STATUS[7:5]) of parts that speak this register map.
pub const SUPPORTED_IDS: [u8; 4] = [3, 4, 6, 7];

/// Datasheet constant of the open-loop period formula.
const OL_PERIOD_DIVISOR: f64 = 98.46;
const OL_PERIOD_MAX: u8 = 127;

/// Open-loop LRA drive period code for a resonance frequency in Hz.
///
/// `round(1_000_000 / (98.46 × f))`, halves away from zero, clamped to
/// 0-127. Non-finite or non-positive input yields 127.
pub fn ol_period_from_hz(hz: f32) -> u8 {
    let hz = f64::from(hz);
    if !hz.is_finite() || hz <= 0.0 {
        return OL_PERIOD_MAX;
    }
    let code = (1_000_000.0 / (OL_PERIOD_DIVISOR * hz)).round();
    code.clamp(0.0, f64::from(OL_PERIOD_MAX)) as u8
}

// ---------------------------------------------------------------------------
// I2C transport
// ---------------------------------------------------------------------------

/// DRV2605 on any `embedded-hal` 1.0 I2C bus.
pub struct Drv2605<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Drv2605<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, I2C_ADDR)
    }

    pub fn with_address(i2c: I2C, address: u8) -> Self {
        Self { i2c, address }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

fn map_bus_error(e: &impl embedded_hal::i2c::Error) -> DriverError {
    match e.kind() {
        ErrorKind::NoAcknowledge(_) => DriverError::Nack,
        _ => DriverError::Bus,
    }
}

impl<I2C: I2c> HapticDriver for Drv2605<I2C> {
    fn read_register(&mut self, addr: u8) -> Result<u8, DriverError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[addr], &mut buf)
            .map_err(|e| map_bus_error(&e))?;
        Ok(buf[0])
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), DriverError> {
        self.i2c
            .write(self.address, &[addr, value])
            .map_err(|e| map_bus_error(&e))
    }

    fn write_realtime_amplitude(&mut self, amplitude: u8) -> Result<(), DriverError> {
        self.write_register(reg::RTP_INPUT, amplitude)
    }
}

// ---------------------------------------------------------------------------
// Bring-up
// ---------------------------------------------------------------------------

fn at(addr: u8) -> impl Fn(DriverError) -> BringUpError {
    move |cause| BringUpError::Register { addr, cause }
}

/// Identify the chip and configure it for open-loop realtime playback.
/// Returns the detected device id.
pub fn bring_up<D: HapticDriver>(driver: &mut D, config: &HapticConfig) -> Result<u8, BringUpError> {
    let status = driver
        .read_register(reg::STATUS)
        .map_err(|_| BringUpError::NotDetected)?;
    let id = status >> reg::STATUS_DEVICE_ID_SHIFT;
    if !SUPPORTED_IDS.contains(&id) {
        return Err(BringUpError::UnexpectedDevice(id));
    }
    log::debug!("bring-up: device id {}", id);

    driver
        .write_register(reg::MODE, reg::MODE_INTERNAL_TRIGGER)
        .map_err(at(reg::MODE))?;
    driver
        .write_realtime_amplitude(0)
        .map_err(at(reg::RTP_INPUT))?;

    driver
        .update_register(reg::FEEDBACK, |v| v | reg::FEEDBACK_N_ERM_LRA)
        .map_err(at(reg::FEEDBACK))?;
    log::debug!("bring-up: LRA mode");

    driver
        .update_register(reg::CONTROL3, |v| {
            (v | reg::CONTROL3_LRA_OPEN_LOOP) & !reg::CONTROL3_DATA_FORMAT_RTP
        })
        .map_err(at(reg::CONTROL3))?;
    log::debug!("bring-up: open loop, unsigned RTP");

    let period = ol_period_from_hz(config.lra_target_hz);
    driver
        .write_register(reg::OL_LRA_PERIOD, period)
        .map_err(at(reg::OL_LRA_PERIOD))?;
    log::debug!("bring-up: OL period {} ({} Hz)", period, config.lra_target_hz);

    driver
        .write_register(reg::OD_CLAMP, config.output_clamp)
        .map_err(at(reg::OD_CLAMP))?;

    driver
        .write_register(reg::MODE, reg::MODE_REALTIME)
        .map_err(at(reg::MODE))?;

    log::info!("bring-up: DRV260x id {} ready in RTP mode", id);
    Ok(id)
}
