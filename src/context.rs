//! Shared state of a competition run
//!
//! [`RobotContext`] is a cheap, clonable read handle given to the control
//! stack and to every background task. Each field has a single writer:
//!
//! - alliance, field side, start offset and feed mode: [`RoutineWriter`],
//!   which cannot be cloned, so only the routine layer holding it can write
//! - last commanded heading: the turn controllers
//! - divert flag: the color sort engine
//! - competition phase: the field controller through [`crate::PhaseSwitch`]

use crate::behaviors::{FeedControl, FeedPreset, SortMode};
use crate::config::SortConfig;
use crate::control::actuators::FeedMotors;
use crate::lifecycle::task::Phase;
use crate::perception::localization::{FieldSide, HeadingFrame};
use crate::perception::sensors::BallColor;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Declared alliance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alliance {
    /// No color filtering, every ball is kept
    Manual,
    Red,
    Blue,
}

impl Alliance {
    /// Color of the balls this alliance keeps
    pub fn color(self) -> Option<BallColor> {
        match self {
            Alliance::Manual => None,
            Alliance::Red => Some(BallColor::Red),
            Alliance::Blue => Some(BallColor::Blue),
        }
    }
}

struct Shared {
    alliance: RwLock<Alliance>,
    frame: RwLock<HeadingFrame>,
    phase: watch::Sender<Phase>,
    feed: FeedControl,
}

/// Read handle on the shared state
#[derive(Clone)]
pub struct RobotContext {
    shared: Arc<Shared>,
}

impl RobotContext {
    /// Create the shared state and its only routine writer
    pub fn new(
        feed_motors: Arc<dyn FeedMotors>,
        sort: SortConfig,
    ) -> (RobotContext, RoutineWriter) {
        let (phase, _) = watch::channel(Phase::Disabled);
        let ctx = RobotContext {
            shared: Arc::new(Shared {
                alliance: RwLock::new(Alliance::Manual),
                frame: RwLock::new(HeadingFrame::default()),
                phase,
                feed: FeedControl::new(feed_motors, sort),
            }),
        };
        let writer = RoutineWriter { ctx: ctx.clone() };
        (ctx, writer)
    }

    pub fn alliance(&self) -> Alliance {
        *self.shared.alliance.read()
    }

    /// Snapshot of the heading frame
    pub fn frame(&self) -> HeadingFrame {
        *self.shared.frame.read()
    }

    pub fn phase(&self) -> Phase {
        *self.shared.phase.borrow()
    }

    /// Receiver notified on every phase change
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.shared.phase.subscribe()
    }

    pub fn sort_mode(&self) -> SortMode {
        self.shared.feed.mode()
    }

    /// A wrong-colored ball is being ejected
    pub fn divert_active(&self) -> bool {
        self.shared.feed.divert_active()
    }

    /// Arbiter of the intake, separator and shooter group
    pub fn feed(&self) -> &FeedControl {
        &self.shared.feed
    }

    /// Record the routine-relative target of a turn command
    pub(crate) fn record_commanded_heading(&self, heading_deg: f64) {
        self.shared.frame.write().last_commanded_deg = heading_deg;
    }

    pub(crate) fn publish_phase(&self, phase: Phase) {
        let previous = self.shared.phase.send_replace(phase);
        if previous != phase {
            info!("Phase {:?} -> {:?}", previous, phase);
        }
    }
}

/// The routine layer's write access to the shared state
pub struct RoutineWriter {
    ctx: RobotContext,
}

impl RoutineWriter {
    pub fn context(&self) -> &RobotContext {
        &self.ctx
    }

    pub fn set_alliance(&mut self, alliance: Alliance) {
        info!("Alliance set to {:?}", alliance);
        *self.ctx.shared.alliance.write() = alliance;
    }

    pub fn set_side(&mut self, side: FieldSide) {
        self.ctx.shared.frame.write().side = side;
    }

    pub fn set_start_offset(&mut self, start_offset_deg: f64) {
        self.ctx.shared.frame.write().start_offset_deg = start_offset_deg;
    }

    /// Establish a new routine frame; the last commanded heading returns to 0
    pub fn reset_frame(&mut self, side: FieldSide, start_offset_deg: f64) {
        info!(
            "Heading frame reset: side {:?}, start offset {:.1} deg",
            side, start_offset_deg
        );
        *self.ctx.shared.frame.write() = HeadingFrame::new(side, start_offset_deg);
    }

    /// Apply a feed preset; the separator is left alone while a ball is ejected
    pub fn set_feed_mode(&mut self, preset: FeedPreset) {
        self.ctx.shared.feed.apply_preset(preset, true);
    }

    /// Apply a feed preset even over an ejection in progress
    pub fn set_feed_mode_forced(&mut self, preset: FeedPreset) {
        self.ctx.shared.feed.apply_preset(preset, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimRobot;

    fn context() -> (RobotContext, RoutineWriter) {
        let robot = SimRobot::new();
        RobotContext::new(robot.feed_motors(), SortConfig::default())
    }

    #[test]
    fn writer_updates_are_visible_to_readers() {
        let (ctx, mut writer) = context();
        let reader = ctx.clone();

        writer.set_alliance(Alliance::Blue);
        writer.reset_frame(FieldSide::Mirrored, 12.0);

        assert_eq!(reader.alliance(), Alliance::Blue);
        let frame = reader.frame();
        assert_eq!(frame.side, FieldSide::Mirrored);
        assert_eq!(frame.start_offset_deg, 12.0);
        assert_eq!(frame.last_commanded_deg, 0.0);
    }

    #[test]
    fn reset_frame_clears_last_command() {
        let (ctx, mut writer) = context();
        ctx.record_commanded_heading(90.0);
        assert_eq!(ctx.frame().last_commanded_deg, 90.0);

        writer.reset_frame(FieldSide::Normal, 0.0);
        assert_eq!(ctx.frame().last_commanded_deg, 0.0);
    }

    #[test]
    fn phase_changes_reach_subscribers() {
        let (ctx, _writer) = context();
        let mut rx = ctx.subscribe_phase();
        assert_eq!(ctx.phase(), Phase::Disabled);

        ctx.publish_phase(Phase::Autonomous);
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), Phase::Autonomous);
    }

    #[test]
    fn feed_mode_follows_presets() {
        let (ctx, mut writer) = context();
        writer.set_feed_mode(FeedPreset::AutoSortFeed);
        assert_eq!(ctx.sort_mode(), SortMode::SortAndCollect);
        writer.set_feed_mode(FeedPreset::Stop);
        assert_eq!(ctx.sort_mode(), SortMode::Idle);
    }
}
