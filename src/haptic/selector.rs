//! Encoder position → effect index.
//!
//! The raw position is unbounded in both directions. It is wrapped into a
//! cycle of `positions` detents, and the cycle is cut into `bands` equal
//! runs; each run selects one effect. A change is reported only when the
//! band changes, so turning within a band never reinstalls the effect.
//!
//! ```text
//!  positions = 24, bands = 6
//!  wrapped:  0 1 2 3 | 4 5 6 7 | ... | 20 21 22 23
//!  band:        0    |    1    | ... |     5
//! ```

use crate::config::SelectorConfig;

pub struct EffectSelector {
    positions: i64,
    band_width: i64,
    /// Last wrapped position seen (not the last band).
    last_wrapped: i64,
}

impl EffectSelector {
    /// Caller guarantees a validated config (non-zero, evenly divisible).
    pub fn new(config: SelectorConfig) -> Self {
        let positions = i64::from(config.positions.max(1));
        let bands = i64::from(config.bands.clamp(1, config.positions.max(1)));
        Self {
            positions,
            band_width: positions / bands,
            last_wrapped: 0,
        }
    }

    /// Wrap a raw position into `0..positions`. Negative positions wrap
    /// backwards instead of sticking at zero.
    pub fn wrap(&self, raw: i32) -> i64 {
        i64::from(raw).rem_euclid(self.positions)
    }

    /// Band a raw position falls into.
    pub fn band_of(&self, raw: i32) -> usize {
        (self.wrap(raw) / self.band_width) as usize
    }

    /// Band of the last position fed to [`update`](Self::update).
    pub fn current_band(&self) -> usize {
        (self.last_wrapped / self.band_width) as usize
    }

    /// Feed the latest raw position. Returns the new effect index when the
    /// band changed, `None` otherwise.
    pub fn update(&mut self, raw: i32) -> Option<usize> {
        let wrapped = self.wrap(raw);
        if wrapped == self.last_wrapped {
            return None;
        }
        let old_band = self.last_wrapped / self.band_width;
        let new_band = wrapped / self.band_width;
        self.last_wrapped = wrapped;

        (new_band != old_band).then_some(new_band as usize)
    }

    /// Forget history so the next update into any band other than 0 fires.
    pub fn reset(&mut self) {
        self.last_wrapped = 0;
    }
}
