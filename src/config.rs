//! Tunable parameters of the robot core
//!
//! Every section has a `Default` holding the values the robot was tuned with,
//! so a configuration file only needs to list what it changes.

use crate::error::CoreError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Complete configuration of the core
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Sleep at the end of every drive-control iteration
    pub loop_period_ms: u64,
    pub turn: TurnConfig,
    pub swing: SwingConfig,
    pub drive: DriveConfig,
    pub range: RangeConfig,
    pub stall: StallConfig,
    pub sort: SortConfig,
    pub driver: DriverConfig,
    pub telemetry: TelemetryConfig,
}

/// Point turn (adaptive gain PID)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    /// Errors below this use the small-error band (degrees)
    pub small_band_deg: f64,
    /// Errors from `small_band_deg` up to this use the large-error band
    pub large_band_deg: f64,
    pub kp_small: f64,
    pub kd_small: f64,
    pub kp_large: f64,
    pub kd_large: f64,
    pub kp_very_large: f64,
    pub kd_very_large: f64,
    pub ki: f64,
    /// Per-iteration integral step, signed by the error
    pub integral_step: f64,
    /// Accumulator clamp
    pub integral_range: f64,
    /// Integral only accumulates while |error| is below this (degrees)
    pub integral_start_deg: f64,
    pub tolerance_deg: f64,
    /// Maximum |error change| per iteration counted as settled
    pub rate_tolerance: f64,
    pub power_limit: f64,
    /// Timeout is |initial error| / this, in seconds
    pub timeout_deg_per_s: f64,
    pub timeout_margin_s: f64,
    pub early_exit_deg: f64,
    pub early_exit_rpm: f64,
}

/// Swing turn (one side driven)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SwingConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub integral_step: f64,
    pub integral_range: f64,
    pub integral_start_deg: f64,
    pub tolerance_deg: f64,
    pub rate_tolerance: f64,
    pub power_limit: f64,
    pub timeout_deg_per_s: f64,
    pub timeout_margin_s: f64,
    pub early_exit_deg: f64,
    pub early_exit_rpm: f64,
}

/// Encoder distance drive
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub move_kp: f64,
    pub move_kd: f64,
    pub heading_kp: f64,
    pub heading_kd: f64,
    /// Forward power never drops below this while driving
    pub min_power: f64,
    pub tolerance: f64,
    pub rate_tolerance: f64,
    /// Timeout is |target| / this, in seconds
    pub timeout_units_per_s: f64,
    pub timeout_margin_s: f64,
    /// Extra time the loop keeps running past the timeout
    pub timeout_grace_s: f64,
    /// Open-loop encoder drive timeout factor (seconds per unit per power)
    pub encoder_timeout_factor: f64,
    pub encoder_timeout_margin_s: f64,
}

/// Range-assisted drive
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    pub heading_kp: f64,
    pub heading_kd: f64,
    pub cross_track_kp: f64,
    /// Both readings feed cross-track correction only while they differ by
    /// less than this (millimetres)
    pub cross_track_max_diff_mm: f64,
    /// The ramp covers this fraction of the total travel
    pub ramp_fraction: f64,
    /// Travel estimates at or below this disable the ramp (millimetres)
    pub min_ramp_travel_mm: f64,
    /// Timeout is this factor times travel / power, in seconds
    pub timeout_factor: f64,
    /// Assumed travel when no starting distance is known (millimetres)
    pub fallback_travel_mm: f64,
    pub fallback_margin_s: f64,
    pub timeout_grace_s: f64,
}

/// Stall and deviation abort
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StallConfig {
    /// Stall detection is ignored while the base spins up
    pub spin_up_ms: u64,
    /// Either side below this speed counts as stalled
    pub stall_rpm: f64,
}

/// Color sort engine
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    pub period_ms: u64,
    pub accept_power: f64,
    pub eject_separator_power: f64,
    /// Intake keeps running slowly while a ball is ejected
    pub eject_intake_power: f64,
    /// Shooter power of the AutoSort and CollectUnsorted presets
    pub collect_shooter_power: f64,
}

/// Driver control mixing
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub period_ms: u64,
    pub speed_scale: f64,
    pub turn_scale: f64,
    /// Shooter power while collecting, and while no feed button is down
    pub collect_shooter_power: f64,
    pub idle_shooter_power: f64,
    pub high_shooter_power: f64,
    pub low_shooter_power: f64,
    /// Power of every feed motor while outtaking
    pub outtake_power: f64,
}

/// Telemetry logging
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub period_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig {
            loop_period_ms: 10,
            turn: TurnConfig::default(),
            swing: SwingConfig::default(),
            drive: DriveConfig::default(),
            range: RangeConfig::default(),
            stall: StallConfig::default(),
            sort: SortConfig::default(),
            driver: DriverConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        TurnConfig {
            small_band_deg: 30.0,
            large_band_deg: 120.0,
            kp_small: 6.0,
            kd_small: 50.0,
            kp_large: 3.5,
            kd_large: 35.0,
            kp_very_large: 3.0,
            kd_very_large: 30.0,
            ki: 35.0,
            integral_step: 0.01,
            integral_range: 3.0,
            integral_start_deg: 60.0,
            tolerance_deg: 2.0,
            rate_tolerance: 0.2,
            power_limit: 100.0,
            timeout_deg_per_s: 50.0,
            timeout_margin_s: 1.0,
            early_exit_deg: 3.0,
            early_exit_rpm: 5.0,
        }
    }
}

impl Default for SwingConfig {
    fn default() -> Self {
        SwingConfig {
            kp: 5.0,
            ki: 35.0,
            kd: 40.0,
            integral_step: 0.01,
            integral_range: 2.0,
            integral_start_deg: 80.0,
            tolerance_deg: 2.0,
            rate_tolerance: 0.2,
            power_limit: 100.0,
            timeout_deg_per_s: 50.0,
            timeout_margin_s: 1.0,
            early_exit_deg: 3.0,
            early_exit_rpm: 3.0,
        }
    }
}

impl Default for DriveConfig {
    fn default() -> Self {
        DriveConfig {
            move_kp: 0.13,
            move_kd: 0.2,
            heading_kp: 0.0,
            heading_kd: 0.0,
            min_power: 26.0,
            tolerance: 2.0,
            rate_tolerance: 1.0,
            timeout_units_per_s: 200.0,
            timeout_margin_s: 1.0,
            timeout_grace_s: 0.5,
            encoder_timeout_factor: 0.1,
            encoder_timeout_margin_s: 1.0,
        }
    }
}

impl Default for RangeConfig {
    fn default() -> Self {
        RangeConfig {
            heading_kp: 2.0,
            heading_kd: 20.0,
            cross_track_kp: 0.5,
            cross_track_max_diff_mm: 200.0,
            ramp_fraction: 1.0 / 3.0,
            min_ramp_travel_mm: 1.0,
            timeout_factor: 0.1,
            fallback_travel_mm: 2500.0,
            fallback_margin_s: 2.0,
            timeout_grace_s: 0.5,
        }
    }
}

impl Default for StallConfig {
    fn default() -> Self {
        StallConfig {
            spin_up_ms: 100,
            stall_rpm: 10.0,
        }
    }
}

impl Default for SortConfig {
    fn default() -> Self {
        SortConfig {
            period_ms: 10,
            accept_power: 100.0,
            eject_separator_power: -100.0,
            eject_intake_power: 30.0,
            collect_shooter_power: -60.0,
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            period_ms: 5,
            speed_scale: 1.0,
            turn_scale: 0.99,
            collect_shooter_power: -50.0,
            idle_shooter_power: -40.0,
            high_shooter_power: 100.0,
            low_shooter_power: 50.0,
            outtake_power: -100.0,
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        TelemetryConfig { period_ms: 50 }
    }
}

impl CoreConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, CoreError> {
        let config: CoreConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Drive-control iteration period
    pub fn loop_period(&self) -> Duration {
        Duration::from_millis(self.loop_period_ms)
    }

    fn validate(&self) -> Result<(), CoreError> {
        let periods = [
            ("loop_period_ms", self.loop_period_ms),
            ("sort.period_ms", self.sort.period_ms),
            ("driver.period_ms", self.driver.period_ms),
            ("telemetry.period_ms", self.telemetry.period_ms),
        ];
        for (name, value) in periods {
            if value == 0 {
                return Err(CoreError::ConfigInvalid(format!("{} must be > 0", name)));
            }
        }
        if self.turn.small_band_deg >= self.turn.large_band_deg {
            return Err(CoreError::ConfigInvalid(format!(
                "turn.small_band_deg ({}) must be below turn.large_band_deg ({})",
                self.turn.small_band_deg, self.turn.large_band_deg
            )));
        }
        if self.turn.timeout_deg_per_s <= 0.0
            || self.swing.timeout_deg_per_s <= 0.0
            || self.drive.timeout_units_per_s <= 0.0
        {
            return Err(CoreError::ConfigInvalid(
                "timeout rates must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.range.ramp_fraction) {
            return Err(CoreError::ConfigInvalid(format!(
                "range.ramp_fraction ({}) must be within [0, 1]",
                self.range.ramp_fraction
            )));
        }
        Ok(())
    }
}
