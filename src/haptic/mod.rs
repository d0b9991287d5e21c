//! Haptic subsystem: effect catalog, encoder selection, shared playback
//! state, the background render task and the DRV2605 driver.

pub mod drv2605;
pub mod effects;
pub mod player;
pub mod render;
pub mod selector;
pub mod state;

pub use effects::{Effect, EffectId, EffectLibrary, HapticStep};
pub use player::{HapticPlayer, RenderHandle};
pub use render::{PassOutcome, RenderTask, ThreadDelay};
pub use selector::EffectSelector;
pub use state::PlaybackState;
