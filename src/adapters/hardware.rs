//! Hardware adapter — bridges the actuator and ring drivers to port traits.
//!
//! Exposes the variant's PWM driver through [`LevelActuator`] and the LED
//! ring through [`LedRingPort`]. On non-espidf targets the underlying
//! drivers use cfg-gated simulation stubs.

use log::debug;

use crate::app::ports::{LedRingPort, LevelActuator};
use crate::config::ProductVariant;
use crate::drivers::actuators::{AirDriver, HeatDriver};
use crate::drivers::led_ring::{self, Frame};

/// The level-driven actuator fitted to this board.
pub enum ActuatorAdapter {
    Air(AirDriver),
    Heat(HeatDriver),
    /// Haptic and ring-only boards have no level actuator.
    None,
}

impl ActuatorAdapter {
    pub fn for_variant(variant: ProductVariant) -> Self {
        match variant {
            ProductVariant::Air => Self::Air(AirDriver::new()),
            ProductVariant::Heat => Self::Heat(HeatDriver::new()),
            ProductVariant::Haptic | ProductVariant::LedOnly => Self::None,
        }
    }
}

impl LevelActuator for ActuatorAdapter {
    fn apply_level(&mut self, level: u8) {
        match self {
            Self::Air(air) => air.set_level(level),
            Self::Heat(heat) => heat.set_level(level),
            Self::None => {}
        }
    }

    fn stop(&mut self) {
        match self {
            Self::Air(air) => air.stop(),
            Self::Heat(heat) => heat.stop(),
            Self::None => {}
        }
    }
}

/// Holds the frame most recently pushed to the ring.
///
/// The IS31FL3746 matrix driver sits on the shared I²C bus behind this
/// port; until it is attached the adapter only records frames.
pub struct LedRingAdapter {
    frame: Frame,
}

impl Default for LedRingAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LedRingAdapter {
    pub fn new() -> Self {
        Self {
            frame: led_ring::blank(),
        }
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

impl LedRingPort for LedRingAdapter {
    fn show(&mut self, frame: &Frame) {
        if *frame != self.frame {
            debug!("ring: {} LED(s) lit", led_ring::lit_count(frame));
            self.frame = *frame;
        }
    }
}
