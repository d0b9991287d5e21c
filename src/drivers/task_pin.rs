//! Pinned task spawning for the haptic render loop.
//!
//! On ESP-IDF, `std::thread` is backed by pthreads on top of FreeRTOS.
//! `esp_pthread_set_cfg()` stores a per-caller config (core, priority,
//! stack, name) that the *next* thread created from the same caller picks
//! up, so the configure and spawn calls here are always made back to
//! back. Host builds spawn an ordinary thread and ignore placement.

use std::io;
use std::thread::JoinHandle;

/// ESP32-S3 cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): BLE stack, haptic render task.
    Pro = 0,
    /// Core 1 (APP_CPU): foreground control loop.
    App = 1,
}

impl Core {
    /// Anything other than 0 selects the APP core.
    pub const fn from_index(index: u8) -> Self {
        if index == 0 { Self::Pro } else { Self::App }
    }
}

/// Start `f` on `core` and hand back its join handle. `name` is passed to
/// FreeRTOS as-is, so it carries a trailing NUL (`"haptic\0"`).
#[cfg(target_os = "espidf")]
pub fn spawn_on_core<T: Send + 'static>(
    core: Core,
    priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() -> T + Send + 'static,
) -> io::Result<JoinHandle<T>> {
    // SAFETY: the config struct is fully initialised by IDF and `name`
    // is a static NUL-terminated string that outlives the task.
    let ret = unsafe {
        let mut cfg = esp_idf_sys::esp_create_default_pthread_config();
        cfg.pin_to_core = core as i32;
        cfg.prio = priority as i32;
        cfg.stack_size = (stack_kb * 1024) as i32;
        cfg.thread_name = name.as_ptr() as *const _;
        esp_idf_sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    let display_name = name.trim_end_matches('\0');
    log::info!(
        "task: '{}' on {:?} core, priority {}, {} KB stack",
        display_name,
        core,
        priority,
        stack_kb
    );

    std::thread::Builder::new()
        .name(display_name.into())
        .spawn(f)
}

/// Host build: placement and priority are ignored.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core<T: Send + 'static>(
    _core: Core,
    _priority: u8,
    stack_kb: usize,
    name: &'static str,
    f: impl FnOnce() -> T + Send + 'static,
) -> io::Result<JoinHandle<T>> {
    let display_name = name.trim_end_matches('\0');
    log::info!(
        "task(sim): '{}' ({} KB requested)",
        display_name,
        stack_kb
    );

    // Host threads get a generous floor; debug builds overflow 4 KB easily.
    std::thread::Builder::new()
        .name(display_name.into())
        .stack_size((stack_kb * 1024).max(64 * 1024))
        .spawn(f)
}
