//! HBITS Firmware — Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Drv2605 (I²C)      ActuatorAdapter   LedRingAdapter           │
//! │  (HapticDriver)     (LevelActuator)   (LedRingPort)            │
//! │  BleMidiPort        LogEventSink      Esp32TimeAdapter         │
//! │  (MidiPort)         (EventSink)                                │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  Controller (foreground)  ──▶  HapticPlayer            │    │
//! │  │  selector · level · FSR gate   PlaybackState ◀── render │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                   core-pinned  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The product variant is chosen at build time: `--features air`,
//! `--features heat` or `--features led-only`; Haptic otherwise.
#![deny(unused_must_use)]

use std::io::Read;
use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{error, info, warn};

use hbits::adapters::ble_gatt;
use hbits::adapters::ble_midi::BleMidiPort;
use hbits::adapters::hardware::{ActuatorAdapter, LedRingAdapter};
use hbits::adapters::log_sink::LogEventSink;
use hbits::adapters::time::Esp32TimeAdapter;
use hbits::app::commands::ControlEvent;
use hbits::app::controller::Controller;
use hbits::cli::{self, LineBuffer, StatusTicker};
use hbits::config::{ProductVariant, SystemConfig};
use hbits::drivers::{hw_init, watchdog::Watchdog};
use hbits::events;
use hbits::haptic::drv2605::Drv2605;
use hbits::haptic::ThreadDelay;
use hbits::pins;
use hbits::sensors::encoder::RotaryEncoder;
use hbits::sensors::fsr::FsrSensor;

const VARIANT: ProductVariant = if cfg!(feature = "air") {
    ProductVariant::Air
} else if cfg!(feature = "heat") {
    ProductVariant::Heat
} else if cfg!(feature = "led-only") {
    ProductVariant::LedOnly
} else {
    ProductVariant::Haptic
};

/// Log and park the main task. The watchdog is not yet subscribed, so the
/// device stays in this state for inspection.
fn halt(reason: &dyn core::fmt::Display) -> ! {
    error!("{}; halting", reason);
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}

/// Reads the serial console byte by byte and queues parsed commands for
/// the control loop.
fn spawn_cli_reader() -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("cli".into())
        .stack_size(8 * 1024)
        .spawn(move || {
            let mut line_buf = LineBuffer::new();
            for byte in std::io::stdin().lock().bytes() {
                let Ok(byte) = byte else {
                    std::thread::sleep(Duration::from_millis(10));
                    continue;
                };
                let Some(line) = line_buf.push(char::from(byte)) else {
                    continue;
                };
                match cli::parse(&line) {
                    Ok(Some(cmd)) => {
                        events::push_event(ControlEvent::Cli(cmd));
                    }
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                }
            }
        })
        .map(|_| ())
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  HBITS v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::for_variant(VARIANT);
    if let Err(e) = config.validate() {
        halt(&e);
    }
    info!("Config: {} ({:?})", config.device_name, VARIANT);

    // ── 3. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals(VARIANT) {
        halt(&e);
    }
    let peripherals = Peripherals::take()?;

    // ── 4. Adapters + controller ──────────────────────────────
    let mut sink = LogEventSink::new();
    let mut controller = Controller::new(
        config.clone(),
        ActuatorAdapter::for_variant(VARIANT),
        LedRingAdapter::new(),
        BleMidiPort::new(config.control.clone()),
    );
    if let Err(e) = ble_gatt::start(&config.device_name, controller.midi().link()) {
        warn!("midi: BLE unavailable ({})", e);
    }

    // ── 5. Haptic render task ─────────────────────────────────
    let mut haptic_task = None;
    if VARIANT == ProductVariant::Haptic {
        let i2c_cfg = I2cConfig::new().baudrate(Hertz(pins::I2C_BAUD_HZ));
        let i2c = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio3,
            peripherals.pins.gpio4,
            &i2c_cfg,
        )?;
        match controller.start_haptics(Drv2605::new(i2c), ThreadDelay, &mut sink) {
            Ok(handle) => haptic_task = handle,
            Err(e) => halt(&e),
        }
    }

    controller.start(&mut sink);

    // ── 6. Inputs ─────────────────────────────────────────────
    let time = Esp32TimeAdapter::new();
    let encoder = RotaryEncoder::new();
    let mut fsr = FsrSensor::new(config.control.fsr_poll_interval_ms);
    let mut ticker = StatusTicker::new(config.control.status_interval_ms);

    if let Err(e) = spawn_cli_reader() {
        warn!("cli: reader not started ({})", e);
    }
    println!("{}", cli::HELP);

    let watchdog = Watchdog::new(config.control.watchdog_timeout_ms);
    let loop_interval = Duration::from_millis(u64::from(config.control.loop_interval_ms));
    let mut render_exit_logged = false;

    info!("System ready. Entering control loop.");

    // ── 7. Control loop ───────────────────────────────────────
    loop {
        let now_ms = time.uptime_ms();

        controller.on_encoder(encoder.position(), &mut sink);

        if VARIANT == ProductVariant::Haptic {
            if let Some(raw) = fsr.poll(now_ms) {
                controller.on_fsr(raw, &mut sink);
            }
        }

        // BLE-MIDI CCs and CLI commands, queued from their own tasks.
        events::drain_events(|event| {
            if let Some(reply) = controller.dispatch(event, now_ms, &mut sink) {
                println!("{}", reply);
            }
        });
        controller.poll_midi(now_ms, &mut sink);

        controller.tick(now_ms);
        controller.midi_mut().flush();

        if let Some(line) = ticker.tick(now_ms) {
            println!("{}", line);
        }

        if !render_exit_logged && haptic_task.as_ref().is_some_and(|h| h.is_finished()) {
            error!("haptic: render task exited");
            render_exit_logged = true;
        }

        watchdog.feed();
        std::thread::sleep(loop_interval);
    }
}
