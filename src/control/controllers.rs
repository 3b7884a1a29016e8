//! Driver control mixing

use super::actuators::ChassisCommand;
use crate::config::DriverConfig;

/// One reading of the driver's controller
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DriverSample {
    /// Forward stick, -100..=100
    pub forward: f64,
    /// Turn stick, -100..=100, positive turns clockwise
    pub turn: f64,
    /// Hold-toggle button is down
    pub hold_pressed: bool,
    /// Collect with color sorting (R1)
    pub collect_pressed: bool,
    /// Collect and shoot into the high goal (R2)
    pub shoot_high_pressed: bool,
    /// Run the whole feed backwards (B)
    pub outtake_pressed: bool,
    /// Lower the goal selector and score low (Down)
    pub score_low_pressed: bool,
    /// Raise the goal selector (X)
    pub raise_goal_pressed: bool,
    /// Load-gate toggle button is down (L2)
    pub load_pressed: bool,
}

/// What the driver asks of the feed this iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverFeed {
    Idle,
    Collect,
    ShootHigh,
    Outtake,
    ScoreLow,
}

impl DriverFeed {
    /// Resolve the feed buttons; high shot wins, then outtake, then low
    /// scoring, then collecting
    pub fn from_sample(sample: &DriverSample) -> Self {
        if sample.shoot_high_pressed {
            DriverFeed::ShootHigh
        } else if sample.outtake_pressed {
            DriverFeed::Outtake
        } else if sample.score_low_pressed {
            DriverFeed::ScoreLow
        } else if sample.collect_pressed {
            DriverFeed::Collect
        } else {
            DriverFeed::Idle
        }
    }

    /// Whether the request runs the color decision on the intake
    pub fn sorts(self) -> bool {
        matches!(
            self,
            DriverFeed::Collect | DriverFeed::ShootHigh | DriverFeed::ScoreLow
        )
    }
}

/// Source of driver input
pub trait DriverInput: Send + Sync {
    fn sample(&self) -> DriverSample;
}

/// Arcade mixing for a differential drive
pub struct ArcadeMixer {
    speed_scale: f64,
    turn_scale: f64,
}

impl ArcadeMixer {
    /// Create a new mixer
    pub fn new(config: &DriverConfig) -> Self {
        ArcadeMixer {
            speed_scale: config.speed_scale,
            turn_scale: config.turn_scale,
        }
    }

    /// Compute side powers from the sticks
    pub fn mix(&self, forward: f64, turn: f64) -> ChassisCommand {
        ChassisCommand::steer(forward * self.speed_scale, turn * self.turn_scale)
    }
}

/// Press-to-toggle latch (drive hold, load gate)
#[derive(Debug, Default)]
pub struct ButtonToggle {
    on: bool,
    was_pressed: bool,
}

impl ButtonToggle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Feed the button state; returns the new state on a press
    pub fn update(&mut self, pressed: bool) -> Option<bool> {
        let edge = pressed && !self.was_pressed;
        self.was_pressed = pressed;
        if edge {
            self.on = !self.on;
            Some(self.on)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arcade_mix() {
        let mixer = ArcadeMixer::new(&DriverConfig::default());
        let cmd = mixer.mix(50.0, 20.0);
        assert!((cmd.left - 69.8).abs() < 1e-9);
        assert!((cmd.right - 30.2).abs() < 1e-9);
        assert_eq!(mixer.mix(100.0, 100.0).left, 100.0);
    }

    #[test]
    fn toggles_on_press_only() {
        let mut hold = ButtonToggle::new();
        assert_eq!(hold.update(true), Some(true));
        assert_eq!(hold.update(true), None);
        assert_eq!(hold.update(false), None);
        assert!(hold.is_on());
        assert_eq!(hold.update(true), Some(false));
        assert!(!hold.is_on());
    }

    #[test]
    fn feed_buttons_resolve_by_priority() {
        let none = DriverSample::default();
        assert_eq!(DriverFeed::from_sample(&none), DriverFeed::Idle);

        let collect = DriverSample {
            collect_pressed: true,
            ..none
        };
        assert_eq!(DriverFeed::from_sample(&collect), DriverFeed::Collect);

        let low = DriverSample {
            score_low_pressed: true,
            ..collect
        };
        assert_eq!(DriverFeed::from_sample(&low), DriverFeed::ScoreLow);

        let outtake = DriverSample {
            outtake_pressed: true,
            ..low
        };
        assert_eq!(DriverFeed::from_sample(&outtake), DriverFeed::Outtake);

        let high = DriverSample {
            shoot_high_pressed: true,
            ..outtake
        };
        assert_eq!(DriverFeed::from_sample(&high), DriverFeed::ShootHigh);
        assert!(DriverFeed::ShootHigh.sorts());
        assert!(!DriverFeed::Outtake.sorts());
    }
}
