//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements     | Connects to                   |
//! |-------------|----------------|-------------------------------|
//! | `ble_midi`  | MidiPort       | BLE-MIDI GATT characteristic  |
//! | `ble_gatt`  | —              | Bluedroid GATT server         |
//! | `hardware`  | LevelActuator  | ESP32 LEDC PWM (air / heat)   |
//! |             | LedRingPort    | 24-LED ring                   |
//! | `log_sink`  | EventSink      | Serial log output             |
//! | `time`      | —              | ESP32 system timer            |
//!
//! The haptic driver port is implemented directly by
//! [`Drv2605`](crate::haptic::drv2605::Drv2605) over any `embedded-hal` I²C bus.

pub mod ble_gatt;
pub mod ble_midi;
pub mod hardware;
pub mod log_sink;
pub mod time;
