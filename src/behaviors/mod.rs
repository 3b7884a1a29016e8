//! Behaviors of the ball-handling mechanism
//!
//! The intake, separator and shooter motors form one resource. Routine
//! presets and the color sort engine both write it, always through
//! [`FeedControl`], which serializes them on one lock.
pub mod color_sort;
pub mod telemetry;

use self::color_sort::{decide, sort_state, SortDecision, SortState};
use crate::config::{DriverConfig, SortConfig};
use crate::context::Alliance;
use crate::control::actuators::FeedMotors;
use crate::control::controllers::DriverFeed;
use crate::perception::sensors::ColorSample;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Whether the color sort engine drives the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Idle,
    SortAndCollect,
}

/// Who currently writes the feed motors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOwner {
    Routine,
    SortEngine,
}

/// Named power presets of the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPreset {
    /// Everything off, sorting off
    Stop,
    /// Intake, separator and shooter forward (scoring high)
    NormalFeed,
    /// Intake reversed (scoring low)
    InvertedFeed,
    /// Collect with the shooter held back and color sorting engaged
    AutoSortFeed,
    /// Collect like `AutoSortFeed` without sorting
    CollectUnsorted,
}

/// Powers last written to the feed motors
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeedCommand {
    pub intake: f64,
    pub separator: f64,
    pub shooter: f64,
}

struct FeedState {
    mode: SortMode,
    divert: bool,
    /// Separator power of a preset that arrived during an ejection
    deferred_separator: Option<f64>,
    command: FeedCommand,
}

/// Arbiter of the feed motors
pub struct FeedControl {
    motors: Arc<dyn FeedMotors>,
    config: SortConfig,
    state: Mutex<FeedState>,
}

impl FeedControl {
    pub fn new(motors: Arc<dyn FeedMotors>, config: SortConfig) -> Self {
        FeedControl {
            motors,
            config,
            state: Mutex::new(FeedState {
                mode: SortMode::Idle,
                divert: false,
                deferred_separator: None,
                command: FeedCommand::default(),
            }),
        }
    }

    pub fn mode(&self) -> SortMode {
        self.state.lock().mode
    }

    pub fn owner(&self) -> FeedOwner {
        match self.mode() {
            SortMode::Idle => FeedOwner::Routine,
            SortMode::SortAndCollect => FeedOwner::SortEngine,
        }
    }

    pub fn divert_active(&self) -> bool {
        self.state.lock().divert
    }

    /// Powers last written to the motors
    pub fn command(&self) -> FeedCommand {
        self.state.lock().command
    }

    /// Write a preset; with `honor_divert` the separator is not touched while
    /// an ejection is in progress
    pub(crate) fn apply_preset(&self, preset: FeedPreset, honor_divert: bool) {
        let full = self.config.accept_power;
        let (intake, separator, shooter, mode) = match preset {
            FeedPreset::Stop => (0.0, 0.0, 0.0, SortMode::Idle),
            FeedPreset::NormalFeed => (full, full, full, SortMode::Idle),
            FeedPreset::InvertedFeed => (-full, full, full, SortMode::Idle),
            FeedPreset::AutoSortFeed => (
                full,
                full,
                self.config.collect_shooter_power,
                SortMode::SortAndCollect,
            ),
            FeedPreset::CollectUnsorted => {
                (full, full, self.config.collect_shooter_power, SortMode::Idle)
            }
        };

        let mut state = self.state.lock();
        let keep_separator = preset != FeedPreset::Stop && honor_divert && state.divert;

        self.write_intake(&mut state, intake);
        if keep_separator {
            // Finish the ejection; the engine applies this once it is done.
            state.deferred_separator = (mode == SortMode::Idle).then_some(separator);
        } else {
            self.write_separator(&mut state, separator);
            state.divert = false;
            state.deferred_separator = None;
        }
        self.write_shooter(&mut state, shooter);
        state.mode = mode;

        info!(
            "Feed preset {:?} (mode {:?}, separator {})",
            preset,
            mode,
            if keep_separator { "deferred" } else { "written" }
        );
    }

    /// Run one sort engine iteration against the current mode
    ///
    /// The mode is read under the same lock the presets write it with, so a
    /// preset applied before this call is always honored.
    pub(crate) fn sort_step(
        &self,
        alliance: Alliance,
        intake: ColorSample,
        transport: ColorSample,
    ) -> SortDecision {
        let mut state = self.state.lock();
        let sort = sort_state(state.mode, alliance);
        let decision = decide(sort, intake, transport);

        match sort {
            SortState::Disabled => {
                if state.divert {
                    state.divert = false;
                    if let Some(power) = state.deferred_separator.take() {
                        self.write_separator(&mut state, power);
                    }
                    debug!("Ejection released after sorting was disabled");
                }
            }
            _ => {
                let output = decision.output(&self.config);
                self.write_intake(&mut state, output.intake);
                self.write_separator(&mut state, output.separator);
                if let Some(shooter) = output.shooter {
                    self.write_shooter(&mut state, shooter);
                }
                if output.divert != state.divert {
                    debug!("Divert {}", if output.divert { "on" } else { "off" });
                }
                state.divert = output.divert;
            }
        }
        decision
    }

    /// Write the feed for one driver-control iteration
    ///
    /// Sorting requests run the color decision on demand; the engine task has
    /// ended by then, so the driver owns the feed.
    pub(crate) fn driver_step(
        &self,
        alliance: Alliance,
        intake: ColorSample,
        transport: ColorSample,
        request: DriverFeed,
        driver: &DriverConfig,
    ) -> FeedCommand {
        let (intake_power, separator, divert) = if request.sorts() {
            let sort = sort_state(SortMode::SortAndCollect, alliance);
            let output = decide(sort, intake, transport).output(&self.config);
            (output.intake, output.separator, output.divert)
        } else if request == DriverFeed::Outtake {
            (driver.outtake_power, driver.outtake_power, false)
        } else {
            (0.0, 0.0, false)
        };
        let shooter = match request {
            DriverFeed::Idle => driver.idle_shooter_power,
            DriverFeed::Collect => driver.collect_shooter_power,
            DriverFeed::ShootHigh => driver.high_shooter_power,
            DriverFeed::ScoreLow => driver.low_shooter_power,
            DriverFeed::Outtake => driver.outtake_power,
        };

        let mut state = self.state.lock();
        self.write_intake(&mut state, intake_power);
        self.write_separator(&mut state, separator);
        self.write_shooter(&mut state, shooter);
        state.mode = SortMode::Idle;
        state.divert = divert;
        state.deferred_separator = None;
        state.command
    }

    /// Called when the sort task ends: an ejection in progress hands the
    /// separator to its deferred preset, and an engine-owned feed is stopped
    pub(crate) fn shutdown_sorting(&self) {
        let mut state = self.state.lock();
        if state.divert {
            let power = state.deferred_separator.take().unwrap_or(0.0);
            self.write_separator(&mut state, power);
            state.divert = false;
            debug!("Ejection released at sort shutdown");
        }
        if state.mode == SortMode::SortAndCollect {
            self.write_intake(&mut state, 0.0);
            self.write_separator(&mut state, 0.0);
            self.write_shooter(&mut state, 0.0);
            state.mode = SortMode::Idle;
            state.divert = false;
            state.deferred_separator = None;
            info!("Sorting shut down, feed stopped");
        }
    }

    fn write_intake(&self, state: &mut FeedState, power: f64) {
        self.motors.set_intake(power);
        state.command.intake = power;
    }

    fn write_separator(&self, state: &mut FeedState, power: f64) {
        self.motors.set_separator(power);
        state.command.separator = power;
    }

    fn write_shooter(&self, state: &mut FeedState, power: f64) {
        self.motors.set_shooter(power);
        state.command.shooter = power;
    }
}
