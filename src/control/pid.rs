//! PID building blocks
//!
//! [`GainBands`] is the adaptive gain schedule of the point turn and
//! [`PidState`] the per-invocation controller memory with integral
//! anti-windup.

use crate::common::sign;
use crate::config::{SwingConfig, TurnConfig};

/// Controller gains
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Proportional and derivative gains scheduled on |error|
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainBands {
    /// Upper bound of the small-error band (exclusive)
    pub small_below: f64,
    /// Upper bound of the large-error band (exclusive)
    pub large_below: f64,
    pub small: (f64, f64),
    pub large: (f64, f64),
    pub very_large: (f64, f64),
    pub ki: f64,
}

impl GainBands {
    pub fn from_config(config: &TurnConfig) -> Self {
        GainBands {
            small_below: config.small_band_deg,
            large_below: config.large_band_deg,
            small: (config.kp_small, config.kd_small),
            large: (config.kp_large, config.kd_large),
            very_large: (config.kp_very_large, config.kd_very_large),
            ki: config.ki,
        }
    }

    /// Gains for an error magnitude
    pub fn gains(&self, abs_error: f64) -> Gains {
        let abs_error = abs_error.abs();
        let (kp, kd) = if abs_error < self.small_below {
            self.small
        } else if abs_error < self.large_below {
            self.large
        } else {
            self.very_large
        };
        Gains { kp, ki: self.ki, kd }
    }
}

/// Integral accumulation rules
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntegralLimits {
    /// Amount added per iteration, signed by the error
    pub step: f64,
    /// Accumulator clamp
    pub range: f64,
    /// Accumulate only while |error| is below this
    pub start: f64,
}

impl IntegralLimits {
    pub fn for_turn(config: &TurnConfig) -> Self {
        IntegralLimits {
            step: config.integral_step,
            range: config.integral_range,
            start: config.integral_start_deg,
        }
    }

    pub fn for_swing(config: &SwingConfig) -> Self {
        IntegralLimits {
            step: config.integral_step,
            range: config.integral_range,
            start: config.integral_start_deg,
        }
    }
}

/// Controller memory of one invocation
#[derive(Debug, Clone)]
pub struct PidState {
    error: f64,
    last_error: f64,
    integral: f64,
    limits: IntegralLimits,
}

impl PidState {
    /// Start from the error measured before the first iteration
    pub fn new(initial_error: f64, limits: IntegralLimits) -> Self {
        PidState {
            error: initial_error,
            last_error: initial_error,
            integral: 0.0,
            limits,
        }
    }

    /// Feed a new error; returns its change since the previous iteration
    pub fn update(&mut self, error: f64) -> f64 {
        let rate = error - self.last_error;

        if self.integral.abs() < self.limits.range && error.abs() < self.limits.start {
            self.integral += sign(error) * self.limits.step;
            self.integral = self.integral.clamp(-self.limits.range, self.limits.range);
        }
        // Crossing the target drops the accumulated push.
        if error * self.last_error <= 0.0 {
            self.integral = 0.0;
        }

        self.last_error = error;
        self.error = error;
        rate
    }

    pub fn output(&self, gains: Gains, rate: f64) -> f64 {
        gains.kp * self.error + gains.kd * rate + gains.ki * self.integral
    }

    pub fn error(&self) -> f64 {
        self.error
    }

    pub fn integral(&self) -> f64 {
        self.integral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bands() -> GainBands {
        GainBands::from_config(&TurnConfig::default())
    }

    #[test]
    fn gain_bands_cover_every_error() {
        let b = bands();
        assert_eq!(b.gains(0.0).kp, 6.0);
        assert_eq!(b.gains(29.9).kd, 50.0);
        assert_eq!(b.gains(30.0).kp, 3.5);
        assert_eq!(b.gains(-90.0).kd, 35.0);
        assert_eq!(b.gains(120.0).kp, 3.0);
        assert_eq!(b.gains(180.0).kd, 30.0);
        assert_eq!(b.gains(180.0).ki, 35.0);
    }

    #[test]
    fn integral_waits_for_start_threshold() {
        let mut pid = PidState::new(90.0, IntegralLimits::for_turn(&TurnConfig::default()));
        pid.update(80.0);
        assert_eq!(pid.integral(), 0.0);
        pid.update(50.0);
        assert!((pid.integral() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn integral_resets_on_crossing() {
        let mut pid = PidState::new(5.0, IntegralLimits::for_turn(&TurnConfig::default()));
        for _ in 0..10 {
            pid.update(4.0);
        }
        assert!(pid.integral() > 0.0);
        pid.update(-0.5);
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn output_combines_terms() {
        let mut pid = PidState::new(10.0, IntegralLimits::for_turn(&TurnConfig::default()));
        let rate = pid.update(8.0);
        let gains = Gains { kp: 6.0, ki: 35.0, kd: 50.0 };
        let expected = 6.0 * 8.0 + 50.0 * -2.0 + 35.0 * 0.01;
        assert!((pid.output(gains, rate) - expected).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn integral_stays_clamped_and_resets(
            start in -180.0f64..180.0,
            errors in prop::collection::vec(-180.0f64..180.0, 1..400),
            step in 0.001f64..2.0,
        ) {
            let limits = IntegralLimits { step, range: 3.0, start: 60.0 };
            let mut pid = PidState::new(start, limits);
            let mut previous = start;
            for error in errors {
                pid.update(error);
                prop_assert!(pid.integral().abs() <= limits.range);
                if error * previous <= 0.0 {
                    prop_assert_eq!(pid.integral(), 0.0);
                }
                previous = error;
            }
        }

        #[test]
        fn bands_are_monotonic_in_kp(a in 0.0f64..360.0, b in 0.0f64..360.0) {
            let g = bands();
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            // Small errors never get a weaker gain than large ones.
            if lo < 30.0 && hi >= 30.0 {
                prop_assert!(g.gains(lo).kp > g.gains(hi).kp);
            }
        }
    }
}
