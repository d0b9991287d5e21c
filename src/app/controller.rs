//! Foreground controller — one control loop shape for every product variant.
//!
//! ```text
//!  encoder / FSR / MIDI / CLI ──▶ Controller ──▶ HapticPlayer (Haptic)
//!                                     │      ──▶ LevelActuator (Air, Heat)
//!                                     │      ──▶ LedRingPort
//!                                     └────────▶ EventSink
//! ```
//!
//! Every input goes through the same path: input → shared state or level →
//! actuator → ring display → [`AppEvent`]. The controller owns its output
//! ports; the event sink is injected per call like the rest of the app
//! layer.

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use log::{debug, info};

use crate::cli::{self, CliCommand, StatusReport};
use crate::config::{ProductVariant, SystemConfig};
use crate::drivers::actuators::AIR_CENTRE;
use crate::drivers::led_ring;
use crate::error::Result;
use crate::events;
use crate::haptic::effects::DEFAULT_EFFECT;
use crate::haptic::{Effect, EffectSelector, HapticPlayer, RenderHandle};
use crate::midi::{self, MidiMessage, TEST_NOTE, TEST_VELOCITY};
use crate::sensors::encoder::LevelEncoder;
use crate::sensors::fsr::{self, VolumeGate};

use super::commands::ControlEvent;
use super::events::AppEvent;
use super::ports::{EventSink, HapticDriver, LedRingPort, LevelActuator, MidiPort};

/// How long the CLI test note is held before its NoteOff.
pub const TEST_NOTE_HOLD_MS: u64 = 500;

/// Channel used for everything the device sends.
const TX_CHANNEL: u8 = 0;

pub struct Controller<A, L, M> {
    config: SystemConfig,
    player: HapticPlayer,
    haptics_enabled: bool,
    selector: EffectSelector,
    level: LevelEncoder,
    volume_gate: VolumeGate,
    /// Selected effect (Haptic) or ring band (LedOnly).
    effect_index: Option<usize>,
    note_off_at: Option<u64>,
    actuator: A,
    led: L,
    midi: M,
}

impl<A, L, M> Controller<A, L, M>
where
    A: LevelActuator,
    L: LedRingPort,
    M: MidiPort,
{
    pub fn new(config: SystemConfig, actuator: A, led: L, midi: M) -> Self {
        let initial_level = match config.control.variant {
            ProductVariant::Air => AIR_CENTRE,
            _ => 0,
        };
        Self {
            player: HapticPlayer::new(config.haptic.clone()),
            haptics_enabled: false,
            selector: EffectSelector::new(config.selector),
            level: LevelEncoder::new(initial_level, config.control.encoder_multiplier),
            volume_gate: VolumeGate::new(config.control.volume_change_threshold),
            effect_index: None,
            note_off_at: None,
            config,
            actuator,
            led,
            midi,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Bring the haptic driver up and start the render task, applying the
    /// configured bring-up policy. Only the Haptic variant plays effects.
    pub fn start_haptics<D, T>(
        &mut self,
        driver: D,
        delay: T,
        sink: &mut impl EventSink,
    ) -> Result<Option<RenderHandle<D>>>
    where
        D: HapticDriver + Send + 'static,
        T: DelayNs + Send + 'static,
    {
        let handle = self.player.start_with_policy(driver, delay, sink)?;
        self.haptics_enabled = handle.is_some();
        Ok(handle)
    }

    /// Put every output into its initial state.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        let variant = self.config.control.variant;
        match variant {
            ProductVariant::Haptic | ProductVariant::LedOnly => {
                self.select_effect(self.selector.current_band(), sink);
            }
            ProductVariant::Air | ProductVariant::Heat => {
                let level = self.level.value();
                self.apply_level(level, sink);
            }
        }
        sink.emit(&AppEvent::Started(variant));
        info!("controller: started as {:?}", variant);
    }

    // ── Inputs ────────────────────────────────────────────────

    /// Feed the latest unbounded encoder position (in detents).
    pub fn on_encoder(&mut self, position: i32, sink: &mut impl EventSink) {
        match self.config.control.variant {
            ProductVariant::Haptic | ProductVariant::LedOnly => {
                if let Some(band) = self.selector.update(position) {
                    self.select_effect(band, sink);
                }
            }
            ProductVariant::Air | ProductVariant::Heat => {
                if let Some(level) = self.level.update(position) {
                    self.apply_level(level, sink);
                    // Mirror local changes to the connected host.
                    self.midi.send(MidiMessage::ControlChange {
                        channel: TX_CHANNEL,
                        control: self.config.control.level_cc,
                        value: level,
                    });
                }
            }
        }
    }

    /// Feed a filtered FSR reading. Small movements are ignored.
    pub fn on_fsr(&mut self, raw: u16, sink: &mut impl EventSink) {
        if self.config.control.variant != ProductVariant::Haptic {
            return;
        }
        let candidate = fsr::volume_from_raw(raw, self.config.control.fsr_full_scale);
        if let Some(volume) = self.volume_gate.filter(candidate, self.player.volume()) {
            self.set_volume(volume, sink);
            // The pad doubles as a volume controller for the host.
            self.midi.send(MidiMessage::ControlChange {
                channel: TX_CHANNEL,
                control: self.config.control.volume_cc,
                value: (self.player.volume() * 127.0).round() as u8,
            });
        }
    }

    pub fn handle_event(&mut self, event: ControlEvent, now_ms: u64, sink: &mut impl EventSink) {
        let variant = self.config.control.variant;
        match event {
            ControlEvent::Volume(v) if variant == ProductVariant::Haptic => self.set_volume(v, sink),
            ControlEvent::Level(l) if matches!(variant, ProductVariant::Air | ProductVariant::Heat) => {
                self.level.set_value(l);
                let level = self.level.value();
                self.apply_level(level, sink);
            }
            ControlEvent::SelectEffect(i)
                if matches!(variant, ProductVariant::Haptic | ProductVariant::LedOnly) =>
            {
                self.select_effect(i, sink);
            }
            ControlEvent::SendTestNote => {
                self.send_test_note(now_ms, sink);
            }
            ControlEvent::Cli(cmd) => {
                let reply = self.handle_cli(cmd, now_ms, sink);
                info!("cli: {}", reply);
            }
            other => debug!("controller: {:?} ignored by {:?}", other, variant),
        }
    }

    /// Entry point for the control-event queue. CLI commands return the
    /// text to print; everything else is applied silently.
    pub fn dispatch(
        &mut self,
        event: ControlEvent,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> Option<String> {
        match event {
            ControlEvent::Cli(cmd) => Some(self.handle_cli(cmd, now_ms, sink)),
            other => {
                self.handle_event(other, now_ms, sink);
                None
            }
        }
    }

    pub fn handle_midi(&mut self, msg: MidiMessage, now_ms: u64, sink: &mut impl EventSink) {
        if let Some(event) = midi::route(msg, &self.config.control) {
            self.handle_event(event, now_ms, sink);
        }
    }

    /// Drain every message the transport has buffered.
    pub fn poll_midi(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        while let Some(msg) = self.midi.poll() {
            self.handle_midi(msg, now_ms, sink);
        }
    }

    /// Execute a CLI command and return the text to print.
    pub fn handle_cli(
        &mut self,
        cmd: CliCommand,
        now_ms: u64,
        sink: &mut impl EventSink,
    ) -> String {
        match cmd {
            CliCommand::Status => self.status(now_ms / 1000).render(),
            CliCommand::Help => cli::HELP.to_string(),
            CliCommand::Test => {
                if self.send_test_note(now_ms, sink) {
                    "Test MIDI message sent".to_string()
                } else {
                    "Bluetooth MIDI not connected".to_string()
                }
            }
            CliCommand::Volume(v) => {
                self.handle_event(ControlEvent::Volume(v), now_ms, sink);
                format!("Volume: {:.2}", self.player.volume())
            }
            CliCommand::Effect(i) => {
                self.handle_event(ControlEvent::SelectEffect(i), now_ms, sink);
                match self.current_effect() {
                    Some(e) => format!("Effect: {}", e.name()),
                    None => format!("Band: {}", self.effect_index.unwrap_or_default()),
                }
            }
            CliCommand::Cc { control, value } => {
                let msg = MidiMessage::ControlChange { channel: TX_CHANNEL, control, value };
                match midi::route(msg, &self.config.control) {
                    Some(event) => {
                        self.handle_event(event, now_ms, sink);
                        format!("CC {} = {}", control, value)
                    }
                    None => format!("CC {} not mapped", control),
                }
            }
        }
    }

    /// Time-driven work: releases the pending test note.
    pub fn tick(&mut self, now_ms: u64) {
        if self.note_off_at.is_some_and(|at| now_ms >= at) {
            self.note_off_at = None;
            self.midi.send(MidiMessage::NoteOff {
                channel: TX_CHANNEL,
                note: TEST_NOTE,
                velocity: 0,
            });
        }
    }

    // ── Outputs ───────────────────────────────────────────────

    fn set_volume(&mut self, volume: f32, sink: &mut impl EventSink) {
        self.player.on_volume_change(volume);
        sink.emit(&AppEvent::VolumeChanged(self.player.volume()));
    }

    fn apply_level(&mut self, level: u8, sink: &mut impl EventSink) {
        self.actuator.apply_level(level);
        let frame = match self.config.control.variant {
            ProductVariant::Air => led_ring::air_frame(level),
            _ => led_ring::heat_frame(level),
        };
        self.led.show(&frame);
        sink.emit(&AppEvent::LevelChanged(level));
    }

    fn select_effect(&mut self, index: usize, sink: &mut impl EventSink) {
        let index = if index < self.player.library().len() {
            index
        } else {
            DEFAULT_EFFECT.index()
        };
        match self.config.control.variant {
            ProductVariant::Haptic => {
                let already = self.effect_index == Some(index);
                let effect = self.player.on_effect_select(index);
                self.effect_index = Some(index);
                self.led.show(&led_ring::effect_frame(index));
                if !already {
                    sink.emit(&AppEvent::EffectSelected { index, effect });
                }
            }
            _ => {
                self.effect_index = Some(index);
                self.led.show(&led_ring::effect_frame(index));
            }
        }
    }

    /// Send NoteOn now and schedule its NoteOff. Returns whether the
    /// transport accepted the note.
    fn send_test_note(&mut self, now_ms: u64, sink: &mut impl EventSink) -> bool {
        let sent = self.midi.send(MidiMessage::NoteOn {
            channel: TX_CHANNEL,
            note: TEST_NOTE,
            velocity: TEST_VELOCITY,
        });
        if sent {
            self.note_off_at = Some(now_ms + TEST_NOTE_HOLD_MS);
        }
        sink.emit(&AppEvent::TestNote(sent));
        sent
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self, uptime_s: u64) -> StatusReport {
        let effect = self.current_effect().map(|e| {
            let mut name = heapless::String::new();
            for c in e.name().chars() {
                if name.push(c).is_err() {
                    break;
                }
            }
            name
        });
        StatusReport {
            device: self.config.device_name.clone(),
            variant: self.config.control.variant,
            uptime_s,
            haptics_enabled: self.haptics_enabled,
            effect_index: self.effect_index,
            effect,
            volume: self.player.volume(),
            last_emitted: self.player.last_emitted(),
            emit_faults: self.player.emit_faults(),
            level: self.level.value(),
            midi_connected: self.midi.is_connected(),
            dropped_events: events::dropped_events(),
        }
    }

    pub fn current_effect(&self) -> Option<Arc<Effect>> {
        match self.config.control.variant {
            ProductVariant::Haptic => self.player.current_effect(),
            _ => None,
        }
    }

    pub fn effect_index(&self) -> Option<usize> {
        self.effect_index
    }

    pub fn level(&self) -> u8 {
        self.level.value()
    }

    pub fn haptics_enabled(&self) -> bool {
        self.haptics_enabled
    }

    pub fn player(&self) -> &HapticPlayer {
        &self.player
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    pub fn led(&self) -> &L {
        &self.led
    }

    pub fn midi(&self) -> &M {
        &self.midi
    }

    pub fn midi_mut(&mut self) -> &mut M {
        &mut self.midi
    }
}
