//! Integration tests for the render task and the haptic player.
//!
//! Single-pass tests drive [`RenderTask`] directly with a recording delay
//! so every emission and hold is deterministic. Threaded tests start the
//! real core-pinned task against the mock driver.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use embedded_hal::delay::DelayNs;

use crate::mock_hw::{FastDelay, LogSink, MockHapticDriver, RecordingDelay};

use hbits::app::events::AppEvent;
use hbits::config::{BringUpPolicy, HapticConfig, SwitchPolicy};
use hbits::error::{BringUpError, Error};
use hbits::haptic::drv2605::reg;
use hbits::haptic::{
    Effect, EffectId, EffectLibrary, HapticPlayer, HapticStep, PassOutcome, PlaybackState,
    RenderTask, ThreadDelay,
};

fn task(
    state: &Arc<PlaybackState>,
    config: &HapticConfig,
) -> RenderTask<MockHapticDriver, RecordingDelay> {
    RenderTask::new(
        MockHapticDriver::new(),
        RecordingDelay::default(),
        Arc::clone(state),
        config,
    )
}

/// Poll `cond` for up to two seconds.
fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    false
}

// ── Single passes ─────────────────────────────────────────────

#[test]
fn ramp_up_pass_at_full_volume() {
    let state = Arc::new(PlaybackState::new(1.0));
    state.set_effect(EffectLibrary::new().by_id(EffectId::RampUp));
    let mut t = task(&state, &HapticConfig::default());

    assert_eq!(t.run_pass(), PassOutcome::Completed { steps: 9 });
    assert_eq!(t.driver().amplitudes, vec![16, 32, 48, 64, 80, 96, 112, 127, 0]);
    assert_eq!(t.delay().waits_ms, vec![25, 25, 25, 25, 25, 25, 25, 25, 100]);
    assert_eq!(state.last_emitted(), 0);
}

#[test]
fn pass_is_scaled_by_volume() {
    let state = Arc::new(PlaybackState::new(0.5));
    state.set_effect(EffectLibrary::new().by_id(EffectId::PulsePurr));
    let mut t = task(&state, &HapticConfig::default());

    t.run_pass();
    // 127*.5=63.5→64, 96→48, 64→32, 40→20, 20→10, 0
    assert_eq!(t.driver().amplitudes, vec![64, 48, 32, 20, 10, 0]);
}

#[test]
fn idle_pass_emits_silence_at_idle_interval() {
    let state = Arc::new(PlaybackState::new(1.0));
    let config = HapticConfig {
        idle_interval_ms: 40,
        ..HapticConfig::default()
    };
    let mut t = task(&state, &config);

    assert_eq!(t.run_pass(), PassOutcome::Idle);
    assert_eq!(t.run_pass(), PassOutcome::Idle);
    assert_eq!(t.driver().amplitudes, vec![0, 0]);
    assert_eq!(t.delay().waits_ms, vec![40, 40]);
}

#[test]
fn cleared_slot_goes_back_to_idle() {
    let state = Arc::new(PlaybackState::new(1.0));
    state.set_effect(EffectLibrary::new().by_id(EffectId::ConstVibe));
    let mut t = task(&state, &HapticConfig::default());

    assert_eq!(t.run_pass(), PassOutcome::Completed { steps: 1 });
    state.clear_effect();
    assert_eq!(t.run_pass(), PassOutcome::Idle);
    assert_eq!(t.driver().amplitudes, vec![127, 0]);
}

#[test]
fn emission_faults_are_skipped_and_counted() {
    let state = Arc::new(PlaybackState::new(1.0));
    state.set_effect(EffectLibrary::new().by_id(EffectId::TwoPulse));
    let mut driver = MockHapticDriver::new();
    driver.fail_amplitudes = 2;
    let mut t = RenderTask::new(driver, RecordingDelay::default(), Arc::clone(&state), &HapticConfig::default());

    assert_eq!(t.run_pass(), PassOutcome::Completed { steps: 4 });
    // First two writes lost; the schedule still ran every hold.
    assert_eq!(t.driver().amplitudes, vec![127, 0]);
    assert_eq!(t.delay().waits_ms, vec![40, 60, 40, 260]);
    assert_eq!(state.emit_faults(), 2);
}

// ── Mid-pass changes ──────────────────────────────────────────

/// Delay that performs `action` after the first hold of a pass.
struct MidPass<F: FnMut()> {
    calls: usize,
    action: F,
}

impl<F: FnMut()> DelayNs for MidPass<F> {
    fn delay_ns(&mut self, _ns: u32) {
        self.calls += 1;
        if self.calls == 1 {
            (self.action)();
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay_ns(ms.saturating_mul(1_000_000));
    }
}

#[test]
fn volume_change_applies_to_the_next_step() {
    let state = Arc::new(PlaybackState::new(1.0));
    state.set_effect(EffectLibrary::new().by_id(EffectId::PulsePurr));
    let s = Arc::clone(&state);
    let delay = MidPass { calls: 0, action: move || s.set_volume(0.5) };
    let mut t = RenderTask::new(MockHapticDriver::new(), delay, Arc::clone(&state), &HapticConfig::default());

    t.run_pass();
    assert_eq!(t.driver().amplitudes, vec![127, 48, 32, 20, 10, 0]);
}

#[test]
fn pass_boundary_finishes_the_old_effect() {
    let lib = EffectLibrary::new();
    let state = Arc::new(PlaybackState::new(1.0));
    state.set_effect(lib.by_id(EffectId::TwoPulse));
    let s = Arc::clone(&state);
    let next = lib.by_id(EffectId::StrongBuzz);
    let delay = MidPass { calls: 0, action: move || s.set_effect(Arc::clone(&next)) };
    let mut t = RenderTask::new(MockHapticDriver::new(), delay, Arc::clone(&state), &HapticConfig::default());

    assert_eq!(t.run_pass(), PassOutcome::Completed { steps: 4 });
    assert_eq!(t.run_pass(), PassOutcome::Completed { steps: 2 });
    assert_eq!(t.driver().amplitudes, vec![127, 0, 127, 0, 127, 100]);
}

#[test]
fn step_boundary_restarts_the_new_effect() {
    let lib = EffectLibrary::new();
    let state = Arc::new(PlaybackState::new(1.0));
    state.set_effect(lib.by_id(EffectId::TwoPulse));
    let s = Arc::clone(&state);
    let next = lib.by_id(EffectId::RampUp);
    let delay = MidPass { calls: 0, action: move || s.set_effect(Arc::clone(&next)) };
    let config = HapticConfig {
        switch_policy: SwitchPolicy::StepBoundary,
        ..HapticConfig::default()
    };
    let mut t = RenderTask::new(MockHapticDriver::new(), delay, Arc::clone(&state), &config);

    assert_eq!(t.run_pass(), PassOutcome::Switched { steps: 1 });
    assert_eq!(t.run_pass(), PassOutcome::Completed { steps: 9 });
    // New effect starts from its first step.
    assert_eq!(&t.driver().amplitudes[..3], &[127, 16, 32]);
}

#[test]
fn custom_effects_play_like_catalog_entries() {
    let state = Arc::new(PlaybackState::new(1.0));
    state.set_effect(Arc::new(Effect::new(
        "tick",
        vec![HapticStep::new(90, 5), HapticStep::new(200, 5)],
    )));
    let config = HapticConfig {
        amplitude_max: 100,
        ..HapticConfig::default()
    };
    let mut t = task(&state, &config);

    t.run_pass();
    assert_eq!(t.driver().amplitudes, vec![90, 100]);
}

#[test]
fn stop_flag_ends_the_pass() {
    let state = Arc::new(PlaybackState::new(1.0));
    state.set_effect(EffectLibrary::new().by_id(EffectId::RampUp));
    state.stop();
    let mut t = task(&state, &HapticConfig::default());
    assert_eq!(t.run_pass(), PassOutcome::Stopped);
    assert!(t.driver().amplitudes.is_empty());
}

// ── Threaded player ───────────────────────────────────────────

#[test]
fn player_plays_selected_effect_on_background_task() {
    let player = HapticPlayer::new(HapticConfig::default());
    let handle = player.start(MockHapticDriver::new(), FastDelay).unwrap();

    player.on_volume_change(1.0);
    player.on_effect_select(EffectId::ConstVibe.index());
    assert!(wait_for(|| player.last_emitted() == 127));

    player.on_volume_change(0.5);
    assert!(wait_for(|| player.last_emitted() == 64));

    let driver = handle.stop_and_join().unwrap();
    assert!(driver.amplitudes.contains(&127));
    assert!(driver.amplitudes.contains(&64));
    // Output is silenced on the way out.
    assert_eq!(driver.amplitudes.last(), Some(&0));
}

#[test]
fn player_idles_until_an_effect_is_installed() {
    let player = HapticPlayer::new(HapticConfig::default());
    let handle = player.start(MockHapticDriver::new(), FastDelay).unwrap();
    std::thread::sleep(Duration::from_millis(20));

    let driver = handle.stop_and_join().unwrap();
    assert!(!driver.amplitudes.is_empty());
    assert!(driver.amplitudes.iter().all(|&a| a == 0));
}

#[test]
fn rtp_clear_failure_aborts_start() {
    let player = HapticPlayer::new(HapticConfig::default());
    let mut driver = MockHapticDriver::new();
    driver.fail_amplitudes = 1;
    assert!(matches!(
        player.start(driver, FastDelay),
        Err(Error::BringUp(BringUpError::Register { addr: reg::RTP_INPUT, .. }))
    ));
}

#[test]
fn start_fails_without_a_chip() {
    let player = HapticPlayer::new(HapticConfig::default());
    let mut driver = MockHapticDriver::new();
    driver.absent = true;
    assert!(matches!(
        player.start(driver, FastDelay),
        Err(Error::BringUp(BringUpError::NotDetected))
    ));
}

#[test]
fn disable_policy_reports_and_continues() {
    let player = HapticPlayer::new(HapticConfig {
        bring_up_policy: BringUpPolicy::Disable,
        ..HapticConfig::default()
    });
    let mut driver = MockHapticDriver::new();
    driver.absent = true;
    let mut sink = LogSink::default();

    let handle = player.start_with_policy(driver, FastDelay, &mut sink).unwrap();
    assert!(handle.is_none());
    assert!(matches!(
        sink.events.as_slice(),
        [AppEvent::HapticFault(BringUpError::NotDetected)]
    ));
}

#[test]
fn halt_policy_propagates_the_fault() {
    let player = HapticPlayer::new(HapticConfig {
        bring_up_policy: BringUpPolicy::Halt,
        ..HapticConfig::default()
    });
    let mut sink = LogSink::default();
    let result = player.start_with_policy(MockHapticDriver::with_device_id(1), FastDelay, &mut sink);
    assert!(matches!(result, Err(Error::BringUp(BringUpError::UnexpectedDevice(1)))));
    assert_eq!(sink.events.len(), 1);
}

// ── Concurrent swaps ──────────────────────────────────────────

/// Distinct first amplitudes mark where each pass starts.
const STRONG: [u8; 4] = [110, 100, 100, 100];
const SOFT: [u8; 4] = [60, 50, 50, 50];

fn flat_effect(name: &'static str, amplitudes: [u8; 4]) -> Arc<Effect> {
    Arc::new(Effect::new(
        name,
        amplitudes.iter().map(|&a| HapticStep::new(a, 1)).collect(),
    ))
}

/// Split an emission log into passes, dropping anything before the first
/// pass start.
fn split_passes(amplitudes: &[u8]) -> Vec<&[u8]> {
    let starts: Vec<usize> = amplitudes
        .iter()
        .enumerate()
        .filter(|(_, a)| **a == STRONG[0] || **a == SOFT[0])
        .map(|(i, _)| i)
        .collect();
    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(amplitudes.len());
            &amplitudes[start..end]
        })
        .collect()
}

#[test]
fn concurrent_swaps_never_mix_two_effects() {
    let strong = flat_effect("strong", STRONG);
    let soft = flat_effect("soft", SOFT);
    let log = Arc::new(Mutex::new(Vec::new()));

    let player = HapticPlayer::new(HapticConfig::default());
    player.on_volume_change(1.0);
    player.set_effect(Arc::clone(&strong));
    let driver = MockHapticDriver::new().with_shared_log(Arc::clone(&log));
    let handle = player.start(driver, ThreadDelay).unwrap();

    let writer = {
        let state = Arc::clone(player.state());
        let (strong, soft) = (Arc::clone(&strong), Arc::clone(&soft));
        std::thread::spawn(move || {
            // Ends on `soft`.
            for i in 0..200 {
                let next = if i % 2 == 0 { &strong } else { &soft };
                state.set_effect(Arc::clone(next));
                std::thread::sleep(Duration::from_micros(700));
            }
        })
    };
    writer.join().unwrap();
    let settled_at = log.lock().unwrap().len();
    assert!(wait_for(|| split_passes(&log.lock().unwrap()[settled_at..]).len() >= 3));

    let driver = handle.stop_and_join().unwrap();
    let mut amplitudes = driver.amplitudes.clone();
    // Bring-up clears RTP first and shutdown silences the output.
    assert_eq!(amplitudes.pop(), Some(0));

    let passes = split_passes(&amplitudes);
    let (last, full) = passes.split_last().unwrap();
    assert!(!full.is_empty());
    for pass in full {
        assert!(*pass == STRONG || *pass == SOFT, "mixed pass {:?}", pass);
    }
    assert!(STRONG.starts_with(last) || SOFT.starts_with(last), "mixed pass {:?}", last);

    // The pass running when the writer finished may still be the old
    // effect; every later one is the last installed.
    let after = split_passes(&amplitudes[settled_at..]);
    assert!(after.len() >= 3);
    for pass in &after[1..] {
        assert_eq!(pass[0], SOFT[0], "stale pass {:?}", pass);
    }
}
