//! Lifecycle management for Vanguard components
pub mod task;

use crate::error::CoreError;
use std::any::Any;

/// Trait for components that follow a lifecycle pattern
pub trait LifecycleNode: Send + Sync {
    /// Configure the node
    fn on_configure(&mut self) -> Result<(), CoreError>;

    /// Activate the node
    fn on_activate(&mut self) -> Result<(), CoreError>;

    /// Deactivate the node
    fn on_deactivate(&mut self) -> Result<(), CoreError>;

    /// Clean up the node
    fn on_cleanup(&mut self) -> Result<(), CoreError>;

    /// Convert to Any for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Base implementation for lifecycle nodes
pub struct LifecycleNodeBase {
    pub name: String,
    state: State,
}

/// State of a lifecycle node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconfigured,
    Inactive,
    Active,
}

impl LifecycleNodeBase {
    /// Create a new lifecycle node base
    pub fn new(name: &str) -> Self {
        LifecycleNodeBase {
            name: name.to_string(),
            state: State::Unconfigured,
        }
    }

    /// Set the state
    pub fn set_state(&mut self, state: State) {
        tracing::debug!("{}: {:?} -> {:?}", self.name, self.state, state);
        self.state = state;
    }

    /// Fail unless the node is in `expected`
    pub fn require(&self, expected: State, transition: &str) -> Result<(), CoreError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CoreError::lifecycle(
                &self.name,
                format!("cannot {} from {:?}", transition, self.state),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_current_state() {
        let mut base = LifecycleNodeBase::new("control_stack");
        assert!(base.require(State::Unconfigured, "configure").is_ok());

        base.set_state(State::Active);
        let err = base.require(State::Inactive, "activate").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("control_stack"), "{}", msg);
        assert!(msg.contains("Active"), "{}", msg);
    }
}
