//! Input sensors: the FSR volume pad and the quadrature encoder.

pub mod encoder;
pub mod fsr;
