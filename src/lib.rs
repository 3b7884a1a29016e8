pub mod behaviors;
pub mod common;
pub mod config;
pub mod context;
pub mod control;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod perception;
pub mod sim;

use crate::context::RobotContext;
use crate::error::CoreError;
use crate::lifecycle::task::Phase;
use crate::lifecycle::LifecycleNode;
use tracing::info;

/// Core functionality for the Vanguard robot
pub struct RobotCore {
    components: Vec<Box<dyn LifecycleNode>>,
    ctx: RobotContext,
}

impl RobotCore {
    /// Create a new core around the shared run state
    pub fn new(ctx: RobotContext) -> Self {
        RobotCore {
            components: Vec::new(),
            ctx,
        }
    }

    pub fn context(&self) -> &RobotContext {
        &self.ctx
    }

    /// Register a component with the core
    pub fn register<T: LifecycleNode + 'static>(&mut self, component: T) {
        self.components.push(Box::new(component));
    }

    /// Configure and activate all registered components, in order
    pub fn init(&mut self) -> Result<(), CoreError> {
        for component in &mut self.components {
            component.on_configure()?;
            component.on_activate()?;
        }
        info!("{} components initialised", self.components.len());
        Ok(())
    }

    /// Deactivate and clean up all registered components, in reverse order
    pub fn shutdown(&mut self) -> Result<(), CoreError> {
        for component in self.components.iter_mut().rev() {
            component.on_deactivate()?;
            component.on_cleanup()?;
        }
        Ok(())
    }

    /// Publish a new competition phase
    pub fn enter_phase(&self, phase: Phase) {
        self.ctx.publish_phase(phase);
    }

    /// Handle for the field controller to switch phases from another task
    pub fn phase_switch(&self) -> PhaseSwitch {
        PhaseSwitch {
            ctx: self.ctx.clone(),
        }
    }

    /// Get a registered component by type
    pub fn component_mut<T: LifecycleNode + 'static>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .find_map(|component| component.as_any_mut().downcast_mut::<T>())
    }
}

/// Writer of the competition phase
#[derive(Clone)]
pub struct PhaseSwitch {
    ctx: RobotContext,
}

impl PhaseSwitch {
    pub fn enter(&self, phase: Phase) {
        self.ctx.publish_phase(phase);
    }
}
