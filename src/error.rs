//! Error types for the robot core
//!
//! Control primitives never fail: timeouts and missing sensor readings are
//! ordinary outcomes reported through [`crate::control::MotionReport`]. The
//! errors below only cover the edges of the core: configuration, logging,
//! component lifecycle and device setup.

use thiserror::Error;

/// Errors raised by a sensor device
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SensorError {
    /// The device is not answering on its port
    #[error("Sensor disconnected: {0}")]
    Disconnected(String),

    /// Calibration did not finish in time
    #[error("Calibration timed out after {0} ms")]
    CalibrationTimeout(u64),
}

/// Errors raised by the robot core
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration file could not be read
    #[error("Cannot read the configuration file: {0}")]
    ConfigRead(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Cannot parse the configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration values are inconsistent
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Logging could not be installed (usually because it already was)
    #[error("Cannot initialise logging: {0}")]
    Logging(String),

    /// A lifecycle transition of a component failed
    #[error("Lifecycle transition failed for `{node}`: {reason}")]
    Lifecycle { node: String, reason: String },

    /// A background task was started outside of a tokio runtime
    #[error("No tokio runtime available to spawn `{0}`")]
    NoRuntime(String),

    /// A device reported an error
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),
}

impl CoreError {
    /// Build a lifecycle error for the given node
    pub fn lifecycle(node: &str, reason: impl Into<String>) -> Self {
        CoreError::Lifecycle {
            node: node.to_string(),
            reason: reason.into(),
        }
    }
}
