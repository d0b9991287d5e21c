//! GPIO / peripheral pin assignments for the HBITS boards.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers. The Haptic, Air and Heat boards share one
//! ESP32-S3 module footprint; outputs that reuse a GPIO are never
//! configured together because only one product variant runs per build.

// ---------------------------------------------------------------------------
// Rotary encoder (effect / level select)
// ---------------------------------------------------------------------------

/// Quadrature channel A.
pub const ENCODER_A_GPIO: i32 = 21;
/// Quadrature channel B.
pub const ENCODER_B_GPIO: i32 = 38;

// ---------------------------------------------------------------------------
// Force-sensitive resistor (haptic volume)
// ---------------------------------------------------------------------------

/// FSR voltage divider, ADC1 channel 0 (GPIO 1 on ESP32-S3).
pub const FSR_ADC_GPIO: i32 = 1;

// ---------------------------------------------------------------------------
// I²C bus (DRV2605 haptic driver, IS31FL3746 LED ring)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 3;
pub const I2C_SCL_GPIO: i32 = 4;
pub const I2C_BAUD_HZ: u32 = 400_000;

// ---------------------------------------------------------------------------
// Air board: pump / valve MOSFETs
// ---------------------------------------------------------------------------

/// M1 pump inflate, M2 pump deflate, M3 valve inflate, M4 valve deflate.
pub const AIR_MOTOR_GPIOS: [i32; 4] = [18, 17, 10, 9];

// ---------------------------------------------------------------------------
// Heat board: heater MOSFET
// ---------------------------------------------------------------------------

pub const HEAT_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits). 8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC frequency for pumps, valves and heater.
pub const ACTUATOR_PWM_FREQ_HZ: u32 = 1_000;
