//! Actuator drivers, hardware initialisation, and peripheral helpers.

pub mod actuators;
pub mod hw_init;
pub mod led_ring;
pub mod task_pin;
pub mod watchdog;
