//! Periodic telemetry logging

use crate::config::TelemetryConfig;
use crate::context::{Alliance, RobotContext};
use crate::control::actuators::Drivetrain;
use crate::error::CoreError;
use crate::lifecycle::task::{BackgroundTask, CancelToken, Phase};
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use crate::perception::sensors::HeadingSensor;
use parking_lot::Mutex;
use std::any::Any;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One telemetry record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySample {
    pub phase: Phase,
    pub alliance: Alliance,
    pub heading_deg: f64,
    /// Mean absolute speed of both drive sides
    pub drive_rpm: f64,
}

/// Logs the robot state every period
///
/// The task ends when it is deactivated or when the match is over, i.e. the
/// phase drops to `Disabled` after driver control.
pub struct TelemetryNode {
    base: LifecycleNodeBase,
    ctx: RobotContext,
    heading: Arc<dyn HeadingSensor>,
    drivetrain: Arc<dyn Drivetrain>,
    period: Duration,
    latest: Arc<Mutex<Option<TelemetrySample>>>,
    task: Option<BackgroundTask>,
}

impl TelemetryNode {
    pub fn new(
        ctx: RobotContext,
        heading: Arc<dyn HeadingSensor>,
        drivetrain: Arc<dyn Drivetrain>,
        config: &TelemetryConfig,
    ) -> Self {
        TelemetryNode {
            base: LifecycleNodeBase::new("telemetry"),
            ctx,
            heading,
            drivetrain,
            period: Duration::from_millis(config.period_ms),
            latest: Arc::new(Mutex::new(None)),
            task: None,
        }
    }

    /// Most recent sample, if the task has run
    pub fn latest(&self) -> Option<TelemetrySample> {
        *self.latest.lock()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl LifecycleNode for TelemetryNode {
    fn on_configure(&mut self) -> Result<(), CoreError> {
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_activate(&mut self) -> Result<(), CoreError> {
        self.base.require(State::Inactive, "activate")?;

        let ctx = self.ctx.clone();
        let heading = self.heading.clone();
        let drivetrain = self.drivetrain.clone();
        let latest = self.latest.clone();
        let mut driver_seen = false;
        let task = BackgroundTask::spawn(
            &self.base.name,
            self.period,
            CancelToken::new(),
            move || {
                let phase = ctx.phase();
                match phase {
                    Phase::DriverControl => driver_seen = true,
                    Phase::Disabled if driver_seen => return ControlFlow::Break(()),
                    _ => {}
                }
                let (left, right) = drivetrain.velocities_rpm();
                let sample = TelemetrySample {
                    phase,
                    alliance: ctx.alliance(),
                    heading_deg: heading.heading_deg(),
                    drive_rpm: (left.abs() + right.abs()) / 2.0,
                };
                debug!(
                    "phase={:?} alliance={:?} heading={:.1} rpm={:.0}",
                    sample.phase, sample.alliance, sample.heading_deg, sample.drive_rpm
                );
                *latest.lock() = Some(sample);
                ControlFlow::Continue(())
            },
            || info!("Telemetry ended with the match"),
        )?;

        self.task = Some(task);
        self.base.set_state(State::Active);
        Ok(())
    }

    fn on_deactivate(&mut self) -> Result<(), CoreError> {
        if let Some(task) = self.task.take() {
            task.cancel();
        }
        info!("Telemetry stopped");
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_cleanup(&mut self) -> Result<(), CoreError> {
        self.base.set_state(State::Unconfigured);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
