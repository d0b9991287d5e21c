//! Effect library — the fixed catalog of haptic waveforms.
//!
//! An [`Effect`] is an ordered list of [`HapticStep`]s played start to end
//! and then looped. Effects are built once and shared by `Arc`; nothing
//! ever mutates one after construction, so the render task can hold a
//! reference for a whole pass while the control loop installs another.
//!
//! Amplitudes are full-scale design values on the 0-127 realtime scale;
//! volume is applied at render time.

use std::borrow::Cow;
use std::sync::Arc;

/// One point of a waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HapticStep {
    /// Pre-volume amplitude (0-127).
    pub amplitude: u8,
    /// How long the amplitude is held before the next step (milliseconds).
    pub hold_ms: u32,
}

impl HapticStep {
    pub const fn new(amplitude: u8, hold_ms: u32) -> Self {
        Self { amplitude, hold_ms }
    }
}

/// An immutable, named waveform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Effect {
    name: Cow<'static, str>,
    steps: Cow<'static, [HapticStep]>,
}

impl Effect {
    /// Effect backed by static catalog data.
    pub const fn from_static(name: &'static str, steps: &'static [HapticStep]) -> Self {
        Self {
            name: Cow::Borrowed(name),
            steps: Cow::Borrowed(steps),
        }
    }

    /// Effect authored at runtime (tests, CLI experiments).
    pub fn new(name: impl Into<Cow<'static, str>>, steps: Vec<HapticStep>) -> Self {
        Self {
            name: name.into(),
            steps: Cow::Owned(steps),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn steps(&self) -> &[HapticStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// An empty effect renders as idle.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Wall-clock length of one pass.
    pub fn pass_duration_ms(&self) -> u64 {
        self.steps.iter().map(|s| u64::from(s.hold_ms)).sum()
    }
}

// ── Catalog data ──────────────────────────────────────────────

static CONST_VIBE: [HapticStep; 1] = [HapticStep::new(127, 100)];

static PULSE: [HapticStep; 2] = [HapticStep::new(127, 60), HapticStep::new(0, 140)];

static RAMP_UP: [HapticStep; 9] = [
    HapticStep::new(16, 25),
    HapticStep::new(32, 25),
    HapticStep::new(48, 25),
    HapticStep::new(64, 25),
    HapticStep::new(80, 25),
    HapticStep::new(96, 25),
    HapticStep::new(112, 25),
    HapticStep::new(127, 25),
    HapticStep::new(0, 100),
];

static TWO_PULSE: [HapticStep; 4] = [
    HapticStep::new(127, 40),
    HapticStep::new(0, 60),
    HapticStep::new(127, 40),
    HapticStep::new(0, 260),
];

static STRONG_BUZZ: [HapticStep; 2] = [HapticStep::new(127, 30), HapticStep::new(100, 10)];

static PULSE_PURR: [HapticStep; 6] = [
    HapticStep::new(127, 30),
    HapticStep::new(96, 30),
    HapticStep::new(64, 30),
    HapticStep::new(40, 30),
    HapticStep::new(20, 30),
    HapticStep::new(0, 150),
];

/// Catalog entries in selector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectId {
    ConstVibe = 0,
    Pulse = 1,
    RampUp = 2,
    TwoPulse = 3,
    StrongBuzz = 4,
    PulsePurr = 5,
}

impl EffectId {
    pub const ALL: [EffectId; 6] = [
        Self::ConstVibe,
        Self::Pulse,
        Self::RampUp,
        Self::TwoPulse,
        Self::StrongBuzz,
        Self::PulsePurr,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::ConstVibe => "CONST_VIBE",
            Self::Pulse => "PULSE",
            Self::RampUp => "RAMP_UP",
            Self::TwoPulse => "TWO_PULSE",
            Self::StrongBuzz => "STRONG_BUZZ",
            Self::PulsePurr => "PULSE_PURR",
        }
    }

    fn steps(self) -> &'static [HapticStep] {
        match self {
            Self::ConstVibe => &CONST_VIBE,
            Self::Pulse => &PULSE,
            Self::RampUp => &RAMP_UP,
            Self::TwoPulse => &TWO_PULSE,
            Self::StrongBuzz => &STRONG_BUZZ,
            Self::PulsePurr => &PULSE_PURR,
        }
    }
}

/// The effect every invalid lookup resolves to.
pub const DEFAULT_EFFECT: EffectId = EffectId::ConstVibe;

/// Shared handles to every catalog effect, built once at startup.
pub struct EffectLibrary {
    entries: Vec<Arc<Effect>>,
}

impl Default for EffectLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectLibrary {
    pub fn new() -> Self {
        let entries = EffectId::ALL
            .iter()
            .map(|id| Arc::new(Effect::from_static(id.name(), id.steps())))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up by selector index. Out-of-range indices fall back to
    /// [`DEFAULT_EFFECT`] instead of failing.
    pub fn get(&self, index: usize) -> Arc<Effect> {
        match self.entries.get(index) {
            Some(effect) => Arc::clone(effect),
            None => {
                log::debug!(
                    "haptic: effect index {} out of range, using {}",
                    index,
                    DEFAULT_EFFECT.name()
                );
                Arc::clone(&self.entries[DEFAULT_EFFECT.index()])
            }
        }
    }

    pub fn by_id(&self, id: EffectId) -> Arc<Effect> {
        Arc::clone(&self.entries[id.index()])
    }

    /// Case-insensitive name lookup.
    pub fn by_name(&self, name: &str) -> Option<Arc<Effect>> {
        self.entries
            .iter()
            .find(|e| e.name().eq_ignore_ascii_case(name))
            .map(Arc::clone)
    }
}
