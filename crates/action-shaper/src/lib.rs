//! Rule-Based Action Shaping
//!
//! Turns raw network predictions into actuator commands: suppresses brake
//! noise, prefers throttle over incidental braking, governs speed and
//! rescales outputs for models trained on a compressed range.

mod rules;

pub use rules::{ActionShaper, ShapingConfig};
