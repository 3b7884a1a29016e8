//! Common utilities and types for the Vanguard robot

/// Common types used across the codebase
pub mod types {
    /// Normalized motor power, -100..=100
    pub type Power = f64;

    /// Heading in degrees, clockwise positive
    pub type Degrees = f64;

    /// Largest power magnitude a motor accepts
    pub const POWER_LIMIT: Power = 100.0;
}

use self::types::{Power, POWER_LIMIT};

/// Sign of a value as -1, 0 or 1
pub fn sign(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Clamp a power to +/- `limit`, never beyond the motor range
pub fn clamp_power(power: Power, limit: Power) -> Power {
    let limit = limit.abs().min(POWER_LIMIT);
    power.clamp(-limit, limit)
}
