//! HBITS firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod cli;
pub mod config;
pub mod events;
pub mod haptic;
pub mod midi;

pub mod error;
pub mod pins;

// ESP-IDF-backed modules; each carries a host simulation path.
pub mod adapters;
pub mod drivers;
pub mod sensors;
