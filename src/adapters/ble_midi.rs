//! BLE-MIDI port — MIDI over the standard BLE-MIDI GATT characteristic.
//!
//! The GATT server ([`ble_gatt`](super::ble_gatt)) runs its callbacks in
//! the Bluedroid task, so everything they touch lives in a shared
//! [`BleMidiLink`]:
//!
//! ```text
//!  GATT write ──▶ BleMidiLink::on_packet ──┬─ routed CC ──▶ events::push_event
//!                                          └─ other msg ──▶ inbox ──▶ poll()
//!  send() ──▶ outbox ──▶ BleMidiPort::flush ──▶ GATT notify
//! ```
//!
//! Volume / level CCs go straight into the control-event queue so they
//! reach the foreground loop through the same path as every other input.
//!
//! ## GATT Service Layout
//!
//! | Item           | UUID                                   | Perms                   |
//! |----------------|----------------------------------------|-------------------------|
//! | MIDI service   | `03b80e5a-ede8-4b33-a751-6ce34ec4c700` |                         |
//! | MIDI I/O       | `7772e5db-3868-4112-a1a9-f2669d106bf3` | Read/WriteNR/Notify     |

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use heapless::Deque;
use log::{debug, info, warn};

use crate::app::commands::ControlEvent;
use crate::app::ports::MidiPort;
use crate::config::ControlConfig;
use crate::events;
use crate::midi::{self, MidiDecoder, MidiMessage};

use super::ble_gatt;

// ── Constants ────────────────────────────────────────────────

pub const MIDI_SERVICE_UUID: u128 = 0x03b80e5a_ede8_4b33_a751_6ce34ec4c700;
pub const MIDI_IO_CHAR_UUID: u128 = 0x7772e5db_3868_4112_a1a9_f2669d106bf3;

const INBOX_CAP: usize = 32;
const OUTBOX_CAP: usize = 16;

/// One framed outbound packet.
pub type BlePacket = heapless::Vec<u8, 5>;

/// Where routed control events go. Production uses the global queue.
pub type EventPush = fn(ControlEvent) -> bool;

struct Rx {
    decoder: MidiDecoder,
    inbox: Deque<MidiMessage, INBOX_CAP>,
}

/// State shared between the GATT callbacks and the control loop.
pub struct BleMidiLink {
    routing: ControlConfig,
    push: EventPush,
    rx: Mutex<Rx>,
    outbox: Mutex<Deque<BlePacket, OUTBOX_CAP>>,
    connected: AtomicBool,
    dropped: AtomicU32,
}

impl BleMidiLink {
    fn new(routing: ControlConfig, push: EventPush) -> Self {
        Self {
            routing,
            push,
            rx: Mutex::new(Rx {
                decoder: MidiDecoder::new(),
                inbox: Deque::new(),
            }),
            outbox: Mutex::new(Deque::new()),
            connected: AtomicBool::new(false),
            dropped: AtomicU32::new(0),
        }
    }

    /// Connection state from the GATT server.
    pub fn set_connected(&self, connected: bool) {
        if self.connected.swap(connected, Ordering::AcqRel) == connected {
            return;
        }
        info!("midi: {}", if connected { "connected" } else { "disconnected" });
        if !connected {
            if let Ok(mut rx) = self.rx.lock() {
                rx.decoder = MidiDecoder::new();
            }
            if let Ok(mut outbox) = self.outbox.lock() {
                outbox.clear();
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// A write to the MIDI I/O characteristic.
    pub fn on_packet(&self, packet: &[u8]) {
        let Ok(mut rx) = self.rx.lock() else {
            return;
        };
        let Rx { decoder, inbox } = &mut *rx;
        let n = midi::decode_ble_packet(decoder, packet, |msg| {
            let kept = match midi::route(msg, &self.routing) {
                Some(event) => (self.push)(event),
                None => inbox.push_back(msg).is_ok(),
            };
            if !kept {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        });
        debug!("midi: {} message(s) from {} byte packet", n, packet.len());
    }

    /// Inbound messages lost to a full queue.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn poll(&self) -> Option<MidiMessage> {
        self.rx.lock().ok().and_then(|mut rx| rx.inbox.pop_front())
    }

    fn queue(&self, packet: BlePacket) -> bool {
        self.outbox
            .lock()
            .is_ok_and(|mut outbox| outbox.push_back(packet).is_ok())
    }

    fn next_outbound(&self) -> Option<BlePacket> {
        self.outbox.lock().ok().and_then(|mut outbox| outbox.pop_front())
    }
}

/// The control loop's end of the BLE-MIDI link.
pub struct BleMidiPort {
    link: Arc<BleMidiLink>,
}

impl BleMidiPort {
    /// Routed CCs are pushed into the global control-event queue.
    pub fn new(routing: ControlConfig) -> Self {
        Self::with_event_push(routing, events::push_event)
    }

    pub fn with_event_push(routing: ControlConfig, push: EventPush) -> Self {
        Self {
            link: Arc::new(BleMidiLink::new(routing, push)),
        }
    }

    /// Handle for the GATT server.
    pub fn link(&self) -> Arc<BleMidiLink> {
        Arc::clone(&self.link)
    }

    /// Next packet to notify, oldest first.
    pub fn next_outbound(&mut self) -> Option<BlePacket> {
        self.link.next_outbound()
    }

    /// Notify every queued packet. Returns how many went out.
    pub fn flush(&mut self) -> usize {
        let mut sent = 0;
        while let Some(packet) = self.link.next_outbound() {
            if ble_gatt::notify(&packet) {
                sent += 1;
            } else {
                debug!("midi: notify failed, {} byte packet dropped", packet.len());
            }
        }
        sent
    }

    pub fn dropped(&self) -> u32 {
        self.link.dropped()
    }

    fn timestamp_ms() -> u32 {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: reads the free-running high-resolution timer.
            (unsafe { esp_idf_svc::sys::esp_timer_get_time() } / 1_000) as u32
        }
        #[cfg(not(target_os = "espidf"))]
        {
            0
        }
    }
}

impl MidiPort for BleMidiPort {
    fn poll(&mut self) -> Option<MidiMessage> {
        self.link.poll()
    }

    fn send(&mut self, msg: MidiMessage) -> bool {
        if !self.link.is_connected() {
            return false;
        }
        let packet = midi::encode_ble_packet(msg, Self::timestamp_ms());
        if !self.link.queue(packet) {
            warn!("midi: outbound queue full, {:?} dropped", msg);
            return false;
        }
        true
    }

    fn is_connected(&self) -> bool {
        self.link.is_connected()
    }
}
