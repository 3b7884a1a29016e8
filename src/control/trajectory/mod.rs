//! Motion targets and their self-computed timeouts
//!
//! Callers never pass a timeout to a closed-loop move. It is derived from the
//! size of the move and, where one is given, the commanded power.

use crate::common::sign;
use crate::config::{DriveConfig, RangeConfig, SwingConfig, TurnConfig};
use std::time::Duration;

/// A single straight-line or point-turn move
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionTarget {
    /// Encoder degrees, millimetres or degrees of heading, unsigned
    pub magnitude: f64,
    /// Absolute heading held or reached during the move
    pub heading_deg: f64,
    /// -1, 0 or 1
    pub direction: f64,
    /// Time after which the move gives up
    pub timeout: Duration,
}

impl MotionTarget {
    /// Point turn over `error_deg` toward `heading_deg`
    pub fn turn(heading_deg: f64, error_deg: f64, config: &TurnConfig) -> Self {
        MotionTarget {
            magnitude: error_deg.abs(),
            heading_deg,
            direction: sign(error_deg),
            timeout: seconds(error_deg.abs() / config.timeout_deg_per_s + config.timeout_margin_s),
        }
    }

    /// Swing turn over `error_deg` toward `heading_deg`
    pub fn swing(heading_deg: f64, error_deg: f64, config: &SwingConfig) -> Self {
        MotionTarget {
            magnitude: error_deg.abs(),
            heading_deg,
            direction: sign(error_deg),
            timeout: seconds(error_deg.abs() / config.timeout_deg_per_s + config.timeout_margin_s),
        }
    }

    /// Encoder distance drive; the timeout includes the grace period
    pub fn distance(encoder_deg: f64, heading_deg: f64, config: &DriveConfig) -> Self {
        let base = encoder_deg.abs() / config.timeout_units_per_s + config.timeout_margin_s;
        MotionTarget {
            magnitude: encoder_deg.abs(),
            heading_deg,
            direction: sign(encoder_deg),
            timeout: seconds(base + config.timeout_grace_s),
        }
    }

    /// Open-loop encoder move at `power`
    pub fn encoder(encoder_deg: f64, power: f64, config: &DriveConfig) -> Self {
        let base = (config.encoder_timeout_factor * encoder_deg / power).abs();
        MotionTarget {
            magnitude: encoder_deg.abs(),
            heading_deg: 0.0,
            direction: sign(power),
            timeout: seconds(base + config.encoder_timeout_margin_s),
        }
    }

    /// Range-assisted drive from an optional starting distance
    ///
    /// `power` must already be floored to a non-zero magnitude. Without a
    /// starting distance a conservative travel estimate is assumed.
    pub fn range(
        target_mm: f64,
        start_mm: Option<f64>,
        power: f64,
        heading_deg: f64,
        config: &RangeConfig,
    ) -> Self {
        let (magnitude, base) = match start_mm {
            Some(start) => {
                let travel = (start - target_mm).abs();
                (travel, (config.timeout_factor * travel / power).abs())
            }
            None => (
                config.fallback_travel_mm,
                config.timeout_factor * config.fallback_travel_mm / power.abs()
                    + config.fallback_margin_s,
            ),
        };
        MotionTarget {
            magnitude,
            heading_deg,
            direction: sign(power),
            timeout: seconds(base + config.timeout_grace_s),
        }
    }
}

/// Non-finite or negative spans collapse to zero
fn seconds(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}
