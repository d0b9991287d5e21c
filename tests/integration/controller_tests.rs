//! Integration tests for the foreground controller across product variants.

use crate::mock_hw::{FastDelay, LogSink, MockActuator, MockHapticDriver, MockMidi, MockRing};

use hbits::adapters::ble_midi::BleMidiPort;
use hbits::app::commands::ControlEvent;
use hbits::app::controller::Controller;
use hbits::app::events::AppEvent;
use hbits::cli::{self, CliCommand};
use hbits::config::{BringUpPolicy, ControlConfig, ProductVariant, SystemConfig};
use hbits::drivers::led_ring;
use hbits::events::EventQueue;
use hbits::midi::MidiMessage;

type TestController = Controller<MockActuator, MockRing, MockMidi>;

fn make(variant: ProductVariant) -> (TestController, LogSink) {
    let mut c = Controller::new(
        SystemConfig::for_variant(variant),
        MockActuator::default(),
        MockRing::default(),
        MockMidi::default(),
    );
    let mut sink = LogSink::default();
    c.start(&mut sink);
    (c, sink)
}

fn cc(control: u8, value: u8) -> MidiMessage {
    MidiMessage::ControlChange { channel: 0, control, value }
}

// ── Haptic ────────────────────────────────────────────────────

#[test]
fn haptic_end_to_end_with_render_task() {
    let (mut c, mut sink) = make(ProductVariant::Haptic);
    let handle = c
        .start_haptics(MockHapticDriver::new(), FastDelay, &mut sink)
        .unwrap()
        .expect("bring-up succeeds");
    assert!(c.haptics_enabled());

    c.midi_mut().inbound.push_back(cc(22, 127));
    c.poll_midi(0, &mut sink);
    assert!((c.player().volume() - 1.0).abs() < f32::EPSILON);

    // Band 3 of the default 24-position ring.
    c.on_encoder(13, &mut sink);
    assert_eq!(c.current_effect().unwrap().name(), "TWO_PULSE");

    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
    while c.player().last_emitted() != 127 && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    assert_eq!(c.player().last_emitted(), 127);

    let driver = handle.stop_and_join().unwrap();
    assert!(driver.amplitudes.contains(&127));
}

#[test]
fn encoder_wraps_backwards_to_last_band() {
    let (mut c, mut sink) = make(ProductVariant::Haptic);
    c.on_encoder(-1, &mut sink);
    assert_eq!(c.effect_index(), Some(5));
    assert_eq!(c.current_effect().unwrap().name(), "PULSE_PURR");
    assert_eq!(c.led().last(), Some(&led_ring::effect_frame(5)));
}

#[test]
fn encoder_within_a_band_is_silent() {
    let (mut c, mut sink) = make(ProductVariant::Haptic);
    let before = sink.events.len();
    for pos in 1..4 {
        c.on_encoder(pos, &mut sink);
    }
    assert_eq!(sink.events.len(), before);
    // A whole turn lands back in band 0 without an event.
    c.on_encoder(24, &mut sink);
    assert_eq!(sink.events.len(), before);
}

#[test]
fn invalid_effect_index_falls_back() {
    let (mut c, mut sink) = make(ProductVariant::Haptic);
    c.handle_event(ControlEvent::SelectEffect(4), 0, &mut sink);
    c.handle_event(ControlEvent::SelectEffect(42), 0, &mut sink);
    assert_eq!(c.effect_index(), Some(0));
    assert_eq!(c.current_effect().unwrap().name(), "CONST_VIBE");
}

#[test]
fn queued_events_reach_the_controller() {
    let (mut c, mut sink) = make(ProductVariant::Haptic);
    let queue = EventQueue::new();
    assert!(queue.push(ControlEvent::Volume(0.25)));
    assert!(queue.push(ControlEvent::SelectEffect(2)));
    queue.drain(|ev| c.handle_event(ev, 0, &mut sink));

    assert!((c.player().volume() - 0.25).abs() < f32::EPSILON);
    assert_eq!(c.current_effect().unwrap().name(), "RAMP_UP");
    assert!(sink.events.iter().any(|e| matches!(e, AppEvent::VolumeChanged(v) if (*v - 0.25).abs() < f32::EPSILON)));
}

static BLE_ROUTED: EventQueue = EventQueue::new();

fn push_ble_routed(event: ControlEvent) -> bool {
    BLE_ROUTED.push(event)
}

#[test]
fn ble_midi_writes_reach_the_controller_through_the_queue() {
    let (mut c, mut sink) = make(ProductVariant::Haptic);
    let port = BleMidiPort::with_event_push(ControlConfig::default(), push_ble_routed);
    let link = port.link();

    // What the GATT write callback does with a CC 22 packet.
    link.on_packet(&[0x80, 0x80, 0xB0, 22, 127]);
    BLE_ROUTED.drain(|ev| {
        assert_eq!(c.dispatch(ev, 0, &mut sink), None);
    });

    assert!((c.player().volume() - 1.0).abs() < f32::EPSILON);
}

#[test]
fn queued_cli_commands_return_their_reply() {
    let (mut c, mut sink) = make(ProductVariant::Haptic);
    let queue = EventQueue::new();
    for line in ["volume 0.4", "effect 1", "cc 22 0"] {
        let cmd = cli::parse(line).unwrap().unwrap();
        assert!(queue.push(ControlEvent::Cli(cmd)));
    }

    let mut replies = Vec::new();
    queue.drain(|ev| replies.extend(c.dispatch(ev, 0, &mut sink)));

    assert_eq!(replies, vec!["Volume: 0.40", "Effect: PULSE", "CC 22 = 0"]);
    assert_eq!(c.player().volume(), 0.0);
}

#[test]
fn missing_chip_under_disable_policy() {
    let mut config = SystemConfig::for_variant(ProductVariant::Haptic);
    config.haptic.bring_up_policy = BringUpPolicy::Disable;
    let mut c = Controller::new(config, MockActuator::default(), MockRing::default(), MockMidi::default());
    let mut sink = LogSink::default();
    let mut driver = MockHapticDriver::new();
    driver.absent = true;

    assert!(c.start_haptics(driver, FastDelay, &mut sink).unwrap().is_none());
    assert!(!c.haptics_enabled());
    assert!(matches!(sink.events.first(), Some(AppEvent::HapticFault(_))));

    let report = c.handle_cli(CliCommand::Status, 5_000, &mut sink);
    assert!(report.contains("Haptics: DISABLED"));
    assert!(report.contains("\"haptics_enabled\":false"));
}

#[test]
fn status_reports_playback_state() {
    let (mut c, mut sink) = make(ProductVariant::Haptic);
    c.handle_cli(CliCommand::Volume(0.5), 0, &mut sink);
    c.handle_cli(CliCommand::Effect(1), 0, &mut sink);

    let s = c.status(42);
    assert_eq!(s.uptime_s, 42);
    assert_eq!(s.effect_index, Some(1));
    assert_eq!(s.effect.as_deref(), Some("PULSE"));
    assert!((s.volume - 0.5).abs() < f32::EPSILON);
    assert!(s.to_json().contains("\"variant\":\"Haptic\""));
}

#[test]
fn cli_lines_round_through_parser() {
    let (mut c, mut sink) = make(ProductVariant::Haptic);
    let cmd = cli::parse("effect 3\r\n").unwrap().unwrap();
    assert_eq!(c.handle_cli(cmd, 0, &mut sink), "Effect: TWO_PULSE");
    let help = c.handle_cli(cli::parse("help").unwrap().unwrap(), 0, &mut sink);
    assert_eq!(help, cli::HELP);
}

// ── Air ───────────────────────────────────────────────────────

#[test]
fn air_starts_stopped_at_centre() {
    let (c, sink) = make(ProductVariant::Air);
    assert_eq!(c.level(), 64);
    assert_eq!(c.actuator().levels, vec![64]);
    assert_eq!(c.led().last(), Some(&led_ring::air_frame(64)));
    assert!(matches!(sink.events.last(), Some(AppEvent::Started(ProductVariant::Air))));
}

#[test]
fn air_encoder_steps_clamp_and_echo_cc() {
    let (mut c, mut sink) = make(ProductVariant::Air);
    c.midi_mut().connected = true;

    c.on_encoder(2, &mut sink);
    assert_eq!(c.level(), 76);
    c.on_encoder(20, &mut sink);
    assert_eq!(c.level(), 127);
    c.on_encoder(30, &mut sink);
    assert_eq!(c.actuator().levels, vec![64, 76, 127]);

    assert_eq!(c.midi().sent, vec![cc(23, 76), cc(23, 127)]);
}

#[test]
fn air_cc_overrides_encoder_level() {
    let (mut c, mut sink) = make(ProductVariant::Air);
    c.midi_mut().inbound.push_back(cc(23, 10));
    c.poll_midi(0, &mut sink);
    assert_eq!(c.level(), 10);
    // Encoder continues from the CC value.
    c.on_encoder(-1, &mut sink);
    assert_eq!(c.level(), 4);
    assert_eq!(c.led().last(), Some(&led_ring::air_frame(4)));
}

// ── Heat ──────────────────────────────────────────────────────

#[test]
fn heat_level_drives_gradient() {
    let (mut c, mut sink) = make(ProductVariant::Heat);
    assert_eq!(c.level(), 0);
    c.handle_midi(cc(23, 127), 0, &mut sink);
    assert_eq!(c.actuator().levels.last(), Some(&127));
    assert_eq!(c.led().last(), Some(&led_ring::heat_frame(127)));
    assert!(matches!(sink.events.last(), Some(AppEvent::LevelChanged(127))));
}

#[test]
fn heat_ignores_volume_cc() {
    let (mut c, mut sink) = make(ProductVariant::Heat);
    let before = sink.events.len();
    c.handle_midi(cc(22, 90), 0, &mut sink);
    assert_eq!(sink.events.len(), before);
    assert_eq!(c.actuator().levels, vec![0]);
}

// ── LED only ──────────────────────────────────────────────────

#[test]
fn led_only_shows_bands_without_playback() {
    let (mut c, mut sink) = make(ProductVariant::LedOnly);
    c.on_encoder(9, &mut sink);
    assert_eq!(c.effect_index(), Some(2));
    assert!(c.current_effect().is_none());
    assert_eq!(c.led().last(), Some(&led_ring::effect_frame(2)));
    assert!(c.actuator().levels.is_empty());
}
