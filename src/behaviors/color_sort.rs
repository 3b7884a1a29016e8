//! Color sort engine
//!
//! Two optical sensors watch the ball path: one at the intake mouth and one
//! further along the transport. Every iteration the engine classifies the
//! first ball it sees and either accepts it or ejects it through the
//! separator. Unknown readings are accepted.

use super::{FeedCommand, SortMode};
use crate::config::{DriverConfig, SortConfig};
use crate::context::{Alliance, RobotContext};
use crate::control::controllers::DriverFeed;
use crate::error::CoreError;
use crate::lifecycle::task::{BackgroundTask, CancelToken, Phase};
use crate::lifecycle::{LifecycleNode, LifecycleNodeBase, State};
use crate::perception::sensors::{BallColor, ColorSample, ColorSensor};
use std::any::Any;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, trace};

/// State of the engine, re-evaluated every iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortState {
    Disabled,
    ManualAccept,
    AllianceFilterRed,
    AllianceFilterBlue,
}

impl SortState {
    /// Color the state keeps, `None` when it does not filter
    pub fn kept_color(self) -> Option<BallColor> {
        match self {
            SortState::AllianceFilterRed => Some(BallColor::Red),
            SortState::AllianceFilterBlue => Some(BallColor::Blue),
            SortState::Disabled | SortState::ManualAccept => None,
        }
    }
}

/// What the engine does with the feed this iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDecision {
    /// Sorting disabled, the engine writes nothing
    Off,
    Accept,
    Eject,
}

/// Motor powers of a decision
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortOutput {
    pub intake: f64,
    pub separator: f64,
    /// `None` leaves the shooter at the preset's power
    pub shooter: Option<f64>,
    pub divert: bool,
}

impl SortDecision {
    pub fn output(self, config: &SortConfig) -> SortOutput {
        match self {
            SortDecision::Off => SortOutput {
                intake: 0.0,
                separator: 0.0,
                shooter: Some(0.0),
                divert: false,
            },
            SortDecision::Accept => SortOutput {
                intake: config.accept_power,
                separator: config.accept_power,
                shooter: None,
                divert: false,
            },
            SortDecision::Eject => SortOutput {
                intake: config.eject_intake_power,
                separator: config.eject_separator_power,
                shooter: None,
                divert: true,
            },
        }
    }
}

/// Engine state from the feed mode and the alliance
pub fn sort_state(mode: SortMode, alliance: Alliance) -> SortState {
    match (mode, alliance) {
        (SortMode::Idle, _) => SortState::Disabled,
        (SortMode::SortAndCollect, Alliance::Manual) => SortState::ManualAccept,
        (SortMode::SortAndCollect, Alliance::Red) => SortState::AllianceFilterRed,
        (SortMode::SortAndCollect, Alliance::Blue) => SortState::AllianceFilterBlue,
    }
}

/// Classify the first visible ball and decide
///
/// The intake sensor wins over the transport sensor. The transport sensor
/// only counts a color when its proximity channel sees the ball.
pub fn decide(state: SortState, intake: ColorSample, transport: ColorSample) -> SortDecision {
    let keep = match state {
        SortState::Disabled => return SortDecision::Off,
        SortState::ManualAccept => return SortDecision::Accept,
        filter => filter.kept_color(),
    };

    let seen = intake
        .color
        .or_else(|| transport.color.filter(|_| transport.near));

    match (seen, keep) {
        (Some(color), Some(kept)) if color != kept => SortDecision::Eject,
        _ => SortDecision::Accept,
    }
}

/// One iteration of sorting against live sensors
#[derive(Clone)]
pub struct ColorSortEngine {
    ctx: RobotContext,
    intake_sensor: Arc<dyn ColorSensor>,
    transport_sensor: Arc<dyn ColorSensor>,
}

impl ColorSortEngine {
    pub fn new(
        ctx: RobotContext,
        intake_sensor: Arc<dyn ColorSensor>,
        transport_sensor: Arc<dyn ColorSensor>,
    ) -> Self {
        ColorSortEngine {
            ctx,
            intake_sensor,
            transport_sensor,
        }
    }

    /// Read both sensors and apply the decision to the feed
    pub fn step(&self) -> SortDecision {
        let intake = self.intake_sensor.sample();
        let transport = self.transport_sensor.sample();
        let decision = self
            .ctx
            .feed()
            .sort_step(self.ctx.alliance(), intake, transport);
        trace!(?intake, ?transport, ?decision, "sort step");
        decision
    }

    /// Read both sensors and write the driver's feed request
    pub fn driver_step(&self, request: DriverFeed, driver: &DriverConfig) -> FeedCommand {
        let intake = self.intake_sensor.sample();
        let transport = self.transport_sensor.sample();
        self.ctx
            .feed()
            .driver_step(self.ctx.alliance(), intake, transport, request, driver)
    }
}

/// Lifecycle node running the engine as a background task
///
/// The task ends when the node is deactivated or the phase turns to driver
/// control; if it still owned the feed, the feed is stopped.
pub struct ColorSortNode {
    base: LifecycleNodeBase,
    engine: ColorSortEngine,
    period: Duration,
    task: Option<BackgroundTask>,
}

impl ColorSortNode {
    pub fn new(engine: ColorSortEngine, config: &SortConfig) -> Self {
        ColorSortNode {
            base: LifecycleNodeBase::new("color_sort"),
            engine,
            period: Duration::from_millis(config.period_ms),
            task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Cancel the task and wait until it has finished its last iteration
    pub async fn stop(&mut self) -> Result<(), CoreError> {
        if let Some(task) = self.task.take() {
            let ticks = task.stop().await?;
            info!("Color sort stopped after {} iterations", ticks);
        }
        Ok(())
    }
}

impl LifecycleNode for ColorSortNode {
    fn on_configure(&mut self) -> Result<(), CoreError> {
        self.base.require(State::Unconfigured, "configure")?;
        info!("Configuring color sort ({} ms period)", self.period.as_millis());
        self.base.set_state(State::Inactive);
        Ok(())
    }

    fn on_activate(&mut self) -> Result<(), CoreError> {
        self.base.require(State::Inactive, "activate")?;

        let engine = self.engine.clone();
        let feed_ctx = self.engine.ctx.clone();
        let task = BackgroundTask::spawn(
            &self.base.name,
            self.period,
            CancelToken::new(),
            move || {
                if engine.ctx.phase() == Phase::DriverControl {
                    return ControlFlow::Break(());
                }
                engine.step();
                ControlFlow::Continue(())
            },
            move || feed_ctx.feed().shutdown_sorting(),
        )?;

        self.task = Some(task);
        self.base.set_state(State::Active);
        Ok(())
    }

    fn on_deactivate(&mut self) -> Result<(), CoreError> {
        if let Some(task) = self.task.take() {
            info!("Deactivating color sort");
            task.cancel();
        }
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

#[cfg(test)]
mod tests {
    use super::*;

    const RED: ColorSample = ColorSample {
        color: Some(BallColor::Red),
        near: true,
    };
    const BLUE: ColorSample = ColorSample {
        color: Some(BallColor::Blue),
        near: true,
    };
    const EMPTY: ColorSample = ColorSample::EMPTY;

    #[test]
    fn states_follow_mode_and_alliance() {
        assert_eq!(sort_state(SortMode::Idle, Alliance::Red), SortState::Disabled);
        assert_eq!(
            sort_state(SortMode::SortAndCollect, Alliance::Manual),
            SortState::ManualAccept
        );
        assert_eq!(
            sort_state(SortMode::SortAndCollect, Alliance::Blue),
            SortState::AllianceFilterBlue
        );
    }

    #[test]
    fn no_color_is_accepted_for_every_alliance() {
        let config = SortConfig::default();
        for state in [
            SortState::ManualAccept,
            SortState::AllianceFilterRed,
            SortState::AllianceFilterBlue,
        ] {
            let decision = decide(state, EMPTY, EMPTY);
            assert_eq!(decision, SortDecision::Accept, "{:?}", state);
            let out = decision.output(&config);
            assert_eq!((out.intake, out.separator, out.divert), (100.0, 100.0, false));
        }
    }

    #[test]
    fn alliance_symmetry() {
        let config = SortConfig::default();
        let red_keeps_red = decide(SortState::AllianceFilterRed, RED, EMPTY).output(&config);
        let blue_keeps_blue = decide(SortState::AllianceFilterBlue, BLUE, EMPTY).output(&config);
        assert_eq!(red_keeps_red, blue_keeps_blue);

        let eject = decide(SortState::AllianceFilterRed, BLUE, EMPTY);
        assert_eq!(eject, SortDecision::Eject);
        let out = eject.output(&config);
        assert!(out.separator < 0.0);
        assert!(out.intake > 0.0 && out.intake < config.accept_power);
        assert!(out.divert);
    }

    #[test]
    fn intake_sensor_has_priority() {
        assert_eq!(
            decide(SortState::AllianceFilterRed, RED, BLUE),
            SortDecision::Accept
        );
        assert_eq!(
            decide(SortState::AllianceFilterRed, BLUE, RED),
            SortDecision::Eject
        );
    }

    #[test]
    fn transport_sensor_needs_proximity() {
        let far_blue = ColorSample {
            color: Some(BallColor::Blue),
            near: false,
        };
        assert_eq!(
            decide(SortState::AllianceFilterRed, EMPTY, far_blue),
            SortDecision::Accept
        );
        assert_eq!(
            decide(SortState::AllianceFilterRed, EMPTY, BLUE),
            SortDecision::Eject
        );
    }

    #[test]
    fn manual_and_disabled_ignore_sensors() {
        assert_eq!(decide(SortState::ManualAccept, BLUE, RED), SortDecision::Accept);
        assert_eq!(decide(SortState::Disabled, BLUE, RED), SortDecision::Off);
    }
}
