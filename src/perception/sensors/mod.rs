//! Sensor interfaces for the Vanguard robot
//!
//! Sensors are shared between the control stack and background tasks, so
//! every read takes `&self` and implementations use interior mutability.

use crate::error::SensorError;

/// A generic sensor interface
pub trait Sensor: Send + Sync {
    /// Get the sensor name
    fn name(&self) -> &str;
}

/// Inertial heading sensor, degrees, clockwise positive, unwrapped
pub trait HeadingSensor: Sensor {
    /// Current absolute heading
    fn heading_deg(&self) -> f64;

    /// Redefine the current heading as `heading_deg`
    fn set_heading(&self, heading_deg: f64);

    /// Run the sensor's calibration; blocks until done
    fn calibrate(&self) -> Result<(), SensorError>;
}

/// Single-axis ranging sensor
pub trait RangeSensor: Sensor {
    /// Distance to the object in front, `None` when nothing valid is in range
    fn distance_mm(&self) -> Option<f64>;
}

/// Optical sensor that classifies the ball in front of it
pub trait ColorSensor: Sensor {
    fn sample(&self) -> ColorSample;
}

/// Ball colors of the game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallColor {
    Red,
    Blue,
}

/// One reading of a color sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorSample {
    /// Recognized color, `None` for anything outside the palette
    pub color: Option<BallColor>,
    /// The proximity channel sees an object close to the lens
    pub near: bool,
}

impl ColorSample {
    /// Nothing in front of the sensor
    pub const EMPTY: ColorSample = ColorSample {
        color: None,
        near: false,
    };

    /// A ball of `color` pressed against the sensor
    pub fn ball(color: BallColor) -> Self {
        ColorSample {
            color: Some(color),
            near: true,
        }
    }
}
