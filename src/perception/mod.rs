//! Perception module for the Vanguard robot
pub mod filters;
pub mod localization;
pub mod sensors;

use self::sensors::HeadingSensor;
use crate::context::RobotContext;
use crate::error::CoreError;
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use std::any::Any;
use std::sync::Arc;
use tracing::{info, warn};

/// Readings below this count as a zeroed heading sensor
const ZERO_TOLERANCE_DEG: f64 = 1e-6;

/// Perception stack for the robot
pub struct PerceptionStack {
    base: LifecycleNodeBase,
    ctx: RobotContext,
    heading: Arc<dyn HeadingSensor>,
}

impl PerceptionStack {
    /// Create a new perception stack
    pub fn new(ctx: RobotContext, heading: Arc<dyn HeadingSensor>) -> Self {
        PerceptionStack {
            base: LifecycleNodeBase::new("perception_stack"),
            ctx,
            heading,
        }
    }

    /// Absolute sensor heading
    pub fn absolute_heading(&self) -> f64 {
        self.heading.heading_deg()
    }

    /// Heading in the current routine frame
    pub fn routine_heading(&self) -> Option<f64> {
        self.ctx.frame().to_relative(self.heading.heading_deg())
    }
}

impl LifecycleNode for PerceptionStack {
    fn on_configure(&mut self) -> Result<(), CoreError> {
        info!("Configuring perception stack: calibrating {}", self.heading.name());
        self.heading.calibrate()?;
        self.heading.set_heading(0.0);

        let reading = self.heading.heading_deg();
        if reading.abs() > ZERO_TOLERANCE_DEG {
            warn!("{} reads {:.3} deg after zeroing", self.heading.name(), reading);
        }
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_activate(&mut self) -> Result<(), CoreError> {
        info!("Activating perception stack");
        self.base.set_state(State::Active);
        Ok(())
    }

    fn on_deactivate(&mut self) -> Result<(), CoreError> {
        info!("Deactivating perception stack");
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_cleanup(&mut self) -> Result<(), CoreError> {
        info!("Cleaning up perception stack");
        self.base.set_state(State::Unconfigured);
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
