//! MIDI decoding and control routing.
//!
//! Channel voice messages are decoded from a raw byte stream with running
//! status. System real-time bytes may appear anywhere and are ignored;
//! system exclusive payloads are skipped. BLE-MIDI packets are unwrapped
//! (header and per-message timestamps stripped) before decoding.
//!
//! ```text
//!  BLE packet ──decode_ble_packet──▶ MidiDecoder ──▶ MidiMessage ──route──▶ ControlEvent
//! ```

use crate::app::commands::ControlEvent;
use crate::config::ControlConfig;

/// A decoded channel voice message. Channels are 0-based (0-15).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOff { channel: u8, note: u8, velocity: u8 },
    NoteOn { channel: u8, note: u8, velocity: u8 },
    PolyPressure { channel: u8, note: u8, pressure: u8 },
    ControlChange { channel: u8, control: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// 14-bit value, 8192 is centre.
    PitchBend { channel: u8, value: u16 },
}

impl MidiMessage {
    /// Wire encoding: status byte followed by one or two data bytes.
    pub fn to_bytes(self) -> heapless::Vec<u8, 3> {
        let (kind, channel, d1, d2) = match self {
            Self::NoteOff { channel, note, velocity } => (0x80, channel, note, Some(velocity)),
            Self::NoteOn { channel, note, velocity } => (0x90, channel, note, Some(velocity)),
            Self::PolyPressure { channel, note, pressure } => (0xA0, channel, note, Some(pressure)),
            Self::ControlChange { channel, control, value } => (0xB0, channel, control, Some(value)),
            Self::ProgramChange { channel, program } => (0xC0, channel, program, None),
            Self::ChannelPressure { channel, pressure } => (0xD0, channel, pressure, None),
            Self::PitchBend { channel, value } => {
                (0xE0, channel, (value & 0x7F) as u8, Some(((value >> 7) & 0x7F) as u8))
            }
        };
        let mut out = heapless::Vec::new();
        let _ = out.push(kind | (channel & 0x0F));
        let _ = out.push(d1 & 0x7F);
        if let Some(d2) = d2 {
            let _ = out.push(d2 & 0x7F);
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Byte-stream decoder
// ---------------------------------------------------------------------------

const SYSEX_START: u8 = 0xF0;
const SYSEX_END: u8 = 0xF7;
const REALTIME_FIRST: u8 = 0xF8;

/// Incremental decoder for a MIDI 1.0 byte stream.
#[derive(Debug, Default)]
pub struct MidiDecoder {
    running_status: Option<u8>,
    data: [u8; 2],
    len: usize,
    in_sysex: bool,
}

/// Data bytes a channel voice status expects.
fn data_len(status: u8) -> usize {
    match status & 0xF0 {
        0xC0 | 0xD0 => 1,
        _ => 2,
    }
}

impl MidiDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte. Returns a message when this byte completes one.
    pub fn feed(&mut self, byte: u8) -> Option<MidiMessage> {
        if byte >= REALTIME_FIRST {
            return None;
        }

        if byte & 0x80 != 0 {
            self.len = 0;
            match byte {
                SYSEX_START => {
                    self.in_sysex = true;
                    self.running_status = None;
                }
                SYSEX_END => self.in_sysex = false,
                // System common messages cancel running status; their
                // data bytes are dropped with it.
                0xF1..=0xF6 => {
                    self.in_sysex = false;
                    self.running_status = None;
                }
                _ => {
                    self.in_sysex = false;
                    self.running_status = Some(byte);
                }
            }
            return None;
        }

        if self.in_sysex {
            return None;
        }
        let status = self.running_status?;

        self.data[self.len] = byte;
        self.len += 1;
        if self.len < data_len(status) {
            return None;
        }
        self.len = 0;
        Some(Self::build(status, self.data[0], self.data[1]))
    }

    /// Feed a slice, handing every completed message to `sink`.
    pub fn feed_all(&mut self, bytes: &[u8], mut sink: impl FnMut(MidiMessage)) {
        for &b in bytes {
            if let Some(msg) = self.feed(b) {
                sink(msg);
            }
        }
    }

    fn build(status: u8, d1: u8, d2: u8) -> MidiMessage {
        let channel = status & 0x0F;
        match status & 0xF0 {
            0x80 => MidiMessage::NoteOff { channel, note: d1, velocity: d2 },
            // Note-on with zero velocity is a note-off.
            0x90 if d2 == 0 => MidiMessage::NoteOff { channel, note: d1, velocity: 0 },
            0x90 => MidiMessage::NoteOn { channel, note: d1, velocity: d2 },
            0xA0 => MidiMessage::PolyPressure { channel, note: d1, pressure: d2 },
            0xB0 => MidiMessage::ControlChange { channel, control: d1, value: d2 },
            0xC0 => MidiMessage::ProgramChange { channel, program: d1 },
            0xD0 => MidiMessage::ChannelPressure { channel, pressure: d1 },
            _ => MidiMessage::PitchBend {
                channel,
                value: u16::from(d1) | (u16::from(d2) << 7),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// BLE-MIDI framing
// ---------------------------------------------------------------------------

/// Unwrap one BLE-MIDI packet and decode its messages.
///
/// Layout: a header byte (`10tttttt`), then for each message a timestamp
/// byte (`1ttttttt`) and the MIDI bytes. Running-status data may follow a
/// message without a new timestamp. Returns the number of messages
/// decoded; a packet with a malformed header yields 0.
pub fn decode_ble_packet(
    decoder: &mut MidiDecoder,
    packet: &[u8],
    mut sink: impl FnMut(MidiMessage),
) -> usize {
    let Some((&header, body)) = packet.split_first() else {
        return 0;
    };
    if header & 0xC0 != 0x80 {
        log::debug!("midi: bad BLE header 0x{:02X}", header);
        return 0;
    }

    let mut count = 0;
    // After the header or a data byte, a byte with the top bit set is a
    // timestamp; after a timestamp it is a status byte.
    let mut expect_timestamp = true;
    for &b in body {
        if b & 0x80 != 0 && expect_timestamp {
            expect_timestamp = false;
            continue;
        }
        expect_timestamp = b & 0x80 == 0;
        if let Some(msg) = decoder.feed(b) {
            sink(msg);
            count += 1;
        }
    }
    count
}

/// Wrap one message in a single-message BLE-MIDI packet.
pub fn encode_ble_packet(msg: MidiMessage, timestamp_ms: u32) -> heapless::Vec<u8, 5> {
    let mut out = heapless::Vec::new();
    let _ = out.push(0x80 | ((timestamp_ms >> 7) & 0x3F) as u8);
    let _ = out.push(0x80 | (timestamp_ms & 0x7F) as u8);
    for b in msg.to_bytes() {
        let _ = out.push(b);
    }
    out
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Map an inbound message to a control event. Any channel is accepted.
pub fn route(msg: MidiMessage, config: &ControlConfig) -> Option<ControlEvent> {
    let MidiMessage::ControlChange { control, value, .. } = msg else {
        return None;
    };
    if control == config.volume_cc {
        Some(ControlEvent::Volume(f32::from(value) / 127.0))
    } else if control == config.level_cc {
        Some(ControlEvent::Level(value))
    } else {
        None
    }
}

/// The test note sent by the CLI `test` command: middle C, channel 1.
pub const TEST_NOTE: u8 = 60;
pub const TEST_VELOCITY: u8 = 100;
