//! Mock hardware for integration tests.
//!
//! Records every register write and realtime amplitude so tests can assert
//! on the full command history without touching a real I²C bus.

use hbits::app::events::AppEvent;
use hbits::app::ports::{EventSink, HapticDriver, LedRingPort, LevelActuator, MidiPort};
use hbits::drivers::led_ring::Frame;
use hbits::error::DriverError;
use hbits::haptic::drv2605::reg;
use hbits::midi::MidiMessage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ── Haptic driver ─────────────────────────────────────────────

/// Register file plus call history of a DRV2605 stand-in.
pub struct MockHapticDriver {
    pub regs: [u8; 0x24],
    /// Every successful register write, in order (RTP writes excluded).
    pub writes: Vec<(u8, u8)>,
    /// Every successfully emitted realtime amplitude.
    pub amplitudes: Vec<u8>,
    /// The chip does not answer at all.
    pub absent: bool,
    /// Writes to this register fail.
    pub fail_register: Option<u8>,
    /// The next N realtime writes fail.
    pub fail_amplitudes: usize,
    /// Copy of `amplitudes` readable while the render thread owns the mock.
    pub shared: Option<Arc<Mutex<Vec<u8>>>>,
}

#[allow(dead_code)]
impl MockHapticDriver {
    /// A DRV2605L (device id 7) with power-on register values.
    pub fn new() -> Self {
        Self::with_device_id(7)
    }

    pub fn with_device_id(id: u8) -> Self {
        let mut regs = [0u8; 0x24];
        regs[reg::STATUS as usize] = id << reg::STATUS_DEVICE_ID_SHIFT;
        // Standby after reset.
        regs[reg::MODE as usize] = 0x40;
        // ERM, closed loop, signed RTP.
        regs[reg::FEEDBACK as usize] = 0x36;
        regs[reg::CONTROL3 as usize] = 0xA0;
        Self {
            regs,
            writes: Vec::new(),
            amplitudes: Vec::new(),
            absent: false,
            fail_register: None,
            fail_amplitudes: 0,
            shared: None,
        }
    }

    pub fn with_shared_log(mut self, log: Arc<Mutex<Vec<u8>>>) -> Self {
        self.shared = Some(log);
        self
    }

    pub fn reg(&self, addr: u8) -> u8 {
        self.regs[addr as usize]
    }

    pub fn write_order(&self) -> Vec<u8> {
        self.writes.iter().map(|(a, _)| *a).collect()
    }
}

impl Default for MockHapticDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl HapticDriver for MockHapticDriver {
    fn read_register(&mut self, addr: u8) -> Result<u8, DriverError> {
        if self.absent {
            return Err(DriverError::Nack);
        }
        Ok(self.regs[addr as usize])
    }

    fn write_register(&mut self, addr: u8, value: u8) -> Result<(), DriverError> {
        if self.absent {
            return Err(DriverError::Nack);
        }
        if self.fail_register == Some(addr) {
            return Err(DriverError::Bus);
        }
        self.regs[addr as usize] = value;
        if addr != reg::RTP_INPUT {
            self.writes.push((addr, value));
        }
        Ok(())
    }

    fn write_realtime_amplitude(&mut self, amplitude: u8) -> Result<(), DriverError> {
        if self.fail_amplitudes > 0 {
            self.fail_amplitudes -= 1;
            return Err(DriverError::Bus);
        }
        self.write_register(reg::RTP_INPUT, amplitude)?;
        self.amplitudes.push(amplitude);
        if let Some(log) = &self.shared {
            log.lock().unwrap().push(amplitude);
        }
        Ok(())
    }
}

// ── Delays ────────────────────────────────────────────────────

/// Records requested holds without sleeping.
#[derive(Default)]
pub struct RecordingDelay {
    pub waits_ms: Vec<u32>,
}

impl embedded_hal::delay::DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.waits_ms.push(ns / 1_000_000);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.waits_ms.push(ms);
    }
}

/// Sleeps a fixed, short time per requested hold so threaded tests make
/// fast progress without spinning.
#[derive(Default, Clone, Copy)]
pub struct FastDelay;

impl embedded_hal::delay::DelayNs for FastDelay {
    fn delay_ns(&mut self, _ns: u32) {
        std::thread::sleep(Duration::from_micros(200));
    }

    fn delay_ms(&mut self, _ms: u32) {
        std::thread::sleep(Duration::from_micros(200));
    }
}

// ── Controller ports ──────────────────────────────────────────

#[derive(Default)]
pub struct MockActuator {
    pub levels: Vec<u8>,
    pub stops: usize,
}

impl LevelActuator for MockActuator {
    fn apply_level(&mut self, level: u8) {
        self.levels.push(level);
    }

    fn stop(&mut self) {
        self.stops += 1;
    }
}

#[derive(Default)]
pub struct MockRing {
    pub frames: Vec<Frame>,
}

#[allow(dead_code)]
impl MockRing {
    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }
}

impl LedRingPort for MockRing {
    fn show(&mut self, frame: &Frame) {
        self.frames.push(*frame);
    }
}

#[derive(Default)]
pub struct MockMidi {
    pub inbound: VecDeque<MidiMessage>,
    pub sent: Vec<MidiMessage>,
    pub connected: bool,
}

impl MidiPort for MockMidi {
    fn poll(&mut self) -> Option<MidiMessage> {
        self.inbound.pop_front()
    }

    fn send(&mut self, msg: MidiMessage) -> bool {
        if self.connected {
            self.sent.push(msg);
        }
        self.connected
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct LogSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
