//! Actuator interfaces
//!
//! Drive powers are given in the robot's logical frame: positive power on
//! both sides drives forward, positive left with negative right turns
//! clockwise. Mapping to motor polarity belongs to the device layer.

use crate::common::clamp_power;
use crate::common::types::{Power, POWER_LIMIT};

/// How a stopped motor holds its shaft
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrakeMode {
    /// Free spin
    Coast,
    /// Short the windings
    Brake,
    /// Actively hold position
    Hold,
}

/// Power for both drive sides
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChassisCommand {
    pub left: Power,
    pub right: Power,
}

impl ChassisCommand {
    /// Build a command, clamping both sides to the motor range
    pub fn new(left: Power, right: Power) -> Self {
        ChassisCommand {
            left: clamp_power(left, POWER_LIMIT),
            right: clamp_power(right, POWER_LIMIT),
        }
    }

    /// Straight drive at `power`
    pub fn straight(power: Power) -> Self {
        Self::new(power, power)
    }

    /// Drive at `power` steering by `turn` (positive turns clockwise)
    pub fn steer(power: Power, turn: Power) -> Self {
        Self::new(power + turn, power - turn)
    }

    /// In-place rotation, positive clockwise
    pub fn spin(power: Power) -> Self {
        Self::new(power, -power)
    }
}

/// The six drive motors, paired into left and right sides
pub trait Drivetrain: Send + Sync {
    /// Apply power to both sides; the last command wins
    fn command(&self, command: ChassisCommand);

    fn stop(&self, mode: BrakeMode);

    /// Zero both side encoders
    fn reset_positions(&self);

    /// Side displacements in encoder degrees since the last reset
    fn positions_deg(&self) -> (f64, f64);

    /// Side speeds in rpm
    fn velocities_rpm(&self) -> (f64, f64);
}

/// Ball-handling motors
pub trait FeedMotors: Send + Sync {
    fn set_intake(&self, power: Power);
    fn set_separator(&self, power: Power);
    fn set_shooter(&self, power: Power);
}

/// Binary pneumatic actuators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Valve {
    LoadGate,
    WingLeft,
    WingRight,
    GoalHeight,
    Basket,
}

/// Wing command of the routines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wing {
    ExtendRight,
    ExtendLeft,
    RetractBoth,
}

/// Set-only pneumatic outputs; their state is never read back
pub trait Pneumatics: Send + Sync {
    fn set(&self, valve: Valve, engaged: bool);
}
