//! Control module for the Vanguard robot
//!
//! [`ControlStack`] owns the drivetrain. Every drive primitive takes
//! `&mut self`, so only one of them can command the chassis at a time, and
//! each one returns only after converging, stopping or timing out.
pub mod actuators;
pub mod controllers;
pub mod distance;
pub mod pid;
pub mod range;
pub mod stall;
pub mod trajectory;
pub mod turn;

use self::actuators::{BrakeMode, ChassisCommand, Drivetrain, Pneumatics, Valve, Wing};
use self::controllers::{ArcadeMixer, ButtonToggle, DriverFeed, DriverInput};
use crate::behaviors::color_sort::ColorSortEngine;
use crate::behaviors::FeedPreset;
use crate::config::CoreConfig;
use crate::context::RobotContext;
use crate::error::CoreError;
use crate::lifecycle::task::Phase;
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use crate::perception::filters::{RangePair, RangeSide};
use crate::perception::sensors::{HeadingSensor, RangeSensor};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, info};

/// How a drive primitive ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// Error and error rate inside tolerance
    Converged,
    /// Close to the target with the wheels already stopped
    Settled,
    /// The range reading passed the target distance
    ReachedRange,
    /// A drive side stopped turning
    Stalled,
    /// The heading drifted beyond the allowed error
    Deflected,
    /// The self-computed timeout elapsed first
    TimedOut,
    /// Nothing to do, the drivetrain was not touched
    Skipped,
}

/// Result of a drive primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionReport {
    pub outcome: MotionOutcome,
    pub elapsed: Duration,
    pub iterations: u32,
    /// Error left at exit, in the unit of the move; `None` if never measured
    pub final_error: Option<f64>,
}

impl MotionReport {
    pub fn timed_out(&self) -> bool {
        self.outcome == MotionOutcome::TimedOut
    }

    fn skipped() -> Self {
        MotionReport {
            outcome: MotionOutcome::Skipped,
            elapsed: Duration::ZERO,
            iterations: 0,
            final_error: None,
        }
    }
}

/// Iteration bookkeeping shared by every control loop
struct LoopClock {
    started: Instant,
    period: Duration,
    iterations: u32,
}

impl LoopClock {
    fn start(period: Duration) -> Self {
        LoopClock {
            started: Instant::now(),
            period,
            iterations: 0,
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn tick(&mut self) {
        self.iterations += 1;
    }

    /// End of iteration; this is where other tasks get to run
    async fn wait(&self) {
        time::sleep(self.period).await;
    }

    fn finish(&self, outcome: MotionOutcome, final_error: Option<f64>) -> MotionReport {
        MotionReport {
            outcome,
            elapsed: self.elapsed(),
            iterations: self.iterations,
            final_error,
        }
    }
}

/// Devices driven and read by the control stack
#[derive(Clone)]
pub struct DriveDevices {
    pub drivetrain: Arc<dyn Drivetrain>,
    pub heading: Arc<dyn HeadingSensor>,
    pub range_left: Arc<dyn RangeSensor>,
    pub range_right: Arc<dyn RangeSensor>,
    pub pneumatics: Arc<dyn Pneumatics>,
}

impl DriveDevices {
    fn ranges(&self) -> RangePair {
        RangePair::new(self.range_left.distance_mm(), self.range_right.distance_mm())
    }

    fn range(&self, side: RangeSide) -> Option<f64> {
        match side {
            RangeSide::Left => self.range_left.distance_mm(),
            RangeSide::Right => self.range_right.distance_mm(),
        }
    }

    fn mean_abs_position(&self) -> f64 {
        let (left, right) = self.drivetrain.positions_deg();
        (left.abs() + right.abs()) / 2.0
    }
}

/// Control stack for the robot
pub struct ControlStack {
    base: LifecycleNodeBase,
    config: CoreConfig,
    ctx: RobotContext,
    devices: DriveDevices,
    mixer: ArcadeMixer,
}

impl ControlStack {
    /// Create a new control stack
    pub fn new(devices: DriveDevices, ctx: RobotContext, config: CoreConfig) -> Self {
        let mixer = ArcadeMixer::new(&config.driver);
        ControlStack {
            base: LifecycleNodeBase::new("control_stack"),
            config,
            ctx,
            devices,
            mixer,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Absolute heading from the sensor
    pub fn heading_deg(&self) -> f64 {
        self.devices.heading.heading_deg()
    }

    fn clock(&self) -> LoopClock {
        LoopClock::start(self.config.loop_period())
    }

    /// Drive both sides at `power` for `duration`, then coast
    pub async fn drive_for(&mut self, power: f64, duration: Duration) {
        debug!("drive_for: power {} for {:?}", power, duration);
        self.devices.drivetrain.command(ChassisCommand::straight(power));
        time::sleep(duration).await;
        self.devices.drivetrain.stop(BrakeMode::Coast);
    }

    /// Hold position for `duration`, then release to coast
    pub async fn hold_stop(&mut self, duration: Duration) {
        self.devices.drivetrain.stop(BrakeMode::Hold);
        time::sleep(duration).await;
        self.devices.drivetrain.stop(BrakeMode::Coast);
    }

    pub fn set_valve(&mut self, valve: Valve, engaged: bool) {
        debug!("{:?} -> {}", valve, engaged);
        self.devices.pneumatics.set(valve, engaged);
    }

    /// Extend one wing, or retract both
    pub fn set_wing(&mut self, wing: Wing) {
        match wing {
            Wing::ExtendRight => self.set_valve(Valve::WingRight, true),
            Wing::ExtendLeft => self.set_valve(Valve::WingLeft, true),
            Wing::RetractBoth => {
                self.set_valve(Valve::WingRight, false);
                self.set_valve(Valve::WingLeft, false);
            }
        }
    }

    /// Arcade driving and ball handling from `input` until the phase leaves
    /// driver control
    ///
    /// The feed buttons go through `sorter`, so collecting still rejects the
    /// other alliance's balls. The feed is stopped when the phase ends.
    /// Returns the number of iterations run.
    pub async fn run_driver(&mut self, input: &dyn DriverInput, sorter: &ColorSortEngine) -> u64 {
        let mut phase = self.ctx.subscribe_phase();
        let period = Duration::from_millis(self.config.driver.period_ms);
        let mut hold = ButtonToggle::new();
        let mut load = ButtonToggle::new();
        let mut goal_raised = None;
        let mut last_feed = None;
        let mut iterations = 0u64;
        info!("Driver control started");

        while *phase.borrow_and_update() == Phase::DriverControl {
            let sample = input.sample();
            if let Some(holding) = hold.update(sample.hold_pressed) {
                let mode = if holding { BrakeMode::Hold } else { BrakeMode::Coast };
                info!("Drive hold {}", if holding { "on" } else { "off" });
                self.devices.drivetrain.stop(mode);
            }
            if !hold.is_on() {
                self.devices
                    .drivetrain
                    .command(self.mixer.mix(sample.forward, sample.turn));
            }

            if let Some(open) = load.update(sample.load_pressed) {
                self.set_valve(Valve::LoadGate, open);
            }
            let request = DriverFeed::from_sample(&sample);
            let raise = if sample.raise_goal_pressed {
                Some(true)
            } else if request == DriverFeed::ScoreLow {
                Some(false)
            } else {
                None
            };
            if raise.is_some() && raise != goal_raised {
                goal_raised = raise;
                self.set_valve(Valve::GoalHeight, raise == Some(true));
            }
            if last_feed != Some(request) {
                debug!("Driver feed {:?}", request);
                last_feed = Some(request);
            }
            sorter.driver_step(request, &self.config.driver);
            iterations += 1;

            tokio::select! {
                changed = phase.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = time::sleep(period) => {}
            }
        }

        self.devices.drivetrain.stop(BrakeMode::Coast);
        self.ctx.feed().apply_preset(FeedPreset::Stop, false);
        info!("Driver control ended after {} iterations", iterations);
        iterations
    }
}

impl LifecycleNode for ControlStack {
    fn on_configure(&mut self) -> Result<(), CoreError> {
        info!("Configuring control stack");
        self.devices.drivetrain.stop(BrakeMode::Coast);
        self.devices.drivetrain.reset_positions();
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_activate(&mut self) -> Result<(), CoreError> {
        info!("Activating control stack");
        self.base.set_state(State::Active);
        Ok(())
    }

    fn on_deactivate(&mut self) -> Result<(), CoreError> {
        info!("Deactivating control stack");
        self.devices.drivetrain.stop(BrakeMode::Coast);
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_cleanup(&mut self) -> Result<(), CoreError> {
        info!("Cleaning up control stack");
        self.base.set_state(State::Unconfigured);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
