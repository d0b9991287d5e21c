//! Haptic player — the context object tying the subsystem together.
//!
//! Built once at startup and shared with whoever feeds control input.
//! Owns the effect library and the shared [`PlaybackState`]; starting it
//! brings the driver up and moves it into the render task, after which
//! nothing else touches the driver.
//!
//! ```text
//!  MIDI / FSR / encoder ──▶ HapticPlayer ──▶ PlaybackState ◀── RenderTask ──▶ driver
//! ```

use std::sync::Arc;
use std::thread::JoinHandle;

use embedded_hal::delay::DelayNs;

use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, HapticDriver};
use crate::config::{BringUpPolicy, HapticConfig};
use crate::drivers::task_pin::{self, Core};
use crate::error::{Error, Result};
use crate::haptic::drv2605;
use crate::haptic::effects::{Effect, EffectLibrary};
use crate::haptic::render::RenderTask;
use crate::haptic::state::PlaybackState;

pub struct HapticPlayer {
    state: Arc<PlaybackState>,
    library: EffectLibrary,
    config: HapticConfig,
}

impl HapticPlayer {
    pub fn new(config: HapticConfig) -> Self {
        Self {
            state: Arc::new(PlaybackState::new(config.startup_volume)),
            library: EffectLibrary::new(),
            config,
        }
    }

    /// Bring the driver up and hand it to a core-pinned render task.
    ///
    /// The render task is not started when bring-up fails.
    pub fn start<D, T>(&self, mut driver: D, delay: T) -> Result<RenderHandle<D>>
    where
        D: HapticDriver + Send + 'static,
        T: DelayNs + Send + 'static,
    {
        drv2605::bring_up(&mut driver, &self.config)?;

        let task = RenderTask::new(driver, delay, Arc::clone(&self.state), &self.config);
        let join = task_pin::spawn_on_core(
            Core::from_index(self.config.task_core),
            self.config.task_priority,
            self.config.task_stack_kb,
            "haptic\0",
            move || task.run(),
        )
        .map_err(|e| {
            log::error!("haptic: render task spawn failed: {}", e);
            Error::Spawn
        })?;

        Ok(RenderHandle {
            state: Arc::clone(&self.state),
            join,
        })
    }

    /// [`start`](Self::start) with the configured [`BringUpPolicy`]
    /// applied. A bring-up fault is reported through `sink`; `Halt` then
    /// propagates it, `Disable` returns `Ok(None)` so the rest of the
    /// device keeps running.
    pub fn start_with_policy<D, T>(
        &self,
        driver: D,
        delay: T,
        sink: &mut impl EventSink,
    ) -> Result<Option<RenderHandle<D>>>
    where
        D: HapticDriver + Send + 'static,
        T: DelayNs + Send + 'static,
    {
        match self.start(driver, delay) {
            Ok(handle) => Ok(Some(handle)),
            Err(Error::BringUp(e)) => {
                sink.emit(&AppEvent::HapticFault(e));
                match self.config.bring_up_policy {
                    BringUpPolicy::Halt => Err(Error::BringUp(e)),
                    BringUpPolicy::Disable => {
                        log::error!("haptic: {}; continuing without haptics", e);
                        Ok(None)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    // ── Control input ─────────────────────────────────────────

    pub fn on_volume_change(&self, volume: f32) {
        self.state.set_volume(volume);
    }

    /// Install the effect at `index` (out of range falls back to the
    /// default). Re-selecting the installed effect is a no-op.
    pub fn on_effect_select(&self, index: usize) -> Arc<Effect> {
        let effect = self.library.get(index);
        if !self.state.is_current(&effect) {
            log::info!("haptic: effect {} ({})", index, effect.name());
            self.state.set_effect(Arc::clone(&effect));
        }
        effect
    }

    pub fn set_effect(&self, effect: Arc<Effect>) {
        self.state.set_effect(effect);
    }

    pub fn clear_effect(&self) {
        self.state.clear_effect();
    }

    // ── Diagnostics ───────────────────────────────────────────

    pub fn volume(&self) -> f32 {
        self.state.volume()
    }

    pub fn last_emitted(&self) -> u8 {
        self.state.last_emitted()
    }

    pub fn emit_faults(&self) -> u32 {
        self.state.emit_faults()
    }

    pub fn current_effect(&self) -> Option<Arc<Effect>> {
        self.state.effect()
    }

    pub fn state(&self) -> &Arc<PlaybackState> {
        &self.state
    }

    pub fn library(&self) -> &EffectLibrary {
        &self.library
    }

    pub fn config(&self) -> &HapticConfig {
        &self.config
    }
}

/// Handle to a running render task.
///
/// Dropping it leaves the task running for the life of the process.
pub struct RenderHandle<D> {
    state: Arc<PlaybackState>,
    join: JoinHandle<D>,
}

impl<D> RenderHandle<D> {
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Raise the stop flag and wait for the task to silence the driver and
    /// return it.
    pub fn stop_and_join(self) -> Result<D> {
        self.state.stop();
        self.join.join().map_err(|_| Error::TaskPanicked)
    }
}
