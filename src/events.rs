//! Lock-free control-event queue.
//!
//! Events are produced by:
//! - The BLE-MIDI GATT write callback (volume / level CCs)
//! - The serial CLI reader thread (parsed commands)
//!
//! Events are consumed by the foreground control loop, which drains the
//! queue once per iteration in FIFO order.
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GATT write   │────▶│  Event Queue │────▶│  Main Loop   │
//! │ CLI thread   │────▶│  (lock-free) │     │  (consumer)  │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! Producers may run on any thread; a full queue drops the event and
//! bumps a counter rather than blocking the producer.

use core::sync::atomic::{AtomicU32, Ordering};

use heapless::mpmc::Q32;

use crate::app::commands::ControlEvent;

/// Maximum number of pending events.
pub const EVENT_QUEUE_CAP: usize = 32;

/// A bounded multi-producer multi-consumer event queue.
pub struct EventQueue {
    queue: Q32<ControlEvent>,
    dropped: AtomicU32,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub const fn new() -> Self {
        Self {
            queue: Q32::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Returns `false` if the queue is full (event dropped).
    pub fn push(&self, event: ControlEvent) -> bool {
        if self.queue.enqueue(event).is_ok() {
            true
        } else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    pub fn pop(&self) -> Option<ControlEvent> {
        self.queue.dequeue()
    }

    /// Drain all pending events into a callback, FIFO.
    pub fn drain(&self, mut handler: impl FnMut(ControlEvent)) {
        while let Some(event) = self.pop() {
            handler(event);
        }
    }

    /// Events lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

// ── Process-wide queue ────────────────────────────────────────

static EVENTS: EventQueue = EventQueue::new();

/// Push an event into the global queue. Safe from any thread.
pub fn push_event(event: ControlEvent) -> bool {
    let ok = EVENTS.push(event);
    if !ok {
        log::warn!("events: queue full, dropped {:?}", event);
    }
    ok
}

pub fn pop_event() -> Option<ControlEvent> {
    EVENTS.pop()
}

pub fn drain_events(handler: impl FnMut(ControlEvent)) {
    EVENTS.drain(handler);
}

pub fn dropped_events() -> u32 {
    EVENTS.dropped()
}
