#![allow(dead_code)]

use vanguard_core::behaviors::color_sort::ColorSortEngine;
use vanguard_core::config::CoreConfig;
use vanguard_core::context::{RobotContext, RoutineWriter};
use vanguard_core::control::ControlStack;
use vanguard_core::sim::physics::SimParams;
use vanguard_core::sim::SimRobot;

/// Simulated robot with a control stack wired to it
pub struct Rig {
    pub robot: SimRobot,
    pub ctx: RobotContext,
    pub writer: RoutineWriter,
    pub control: ControlStack,
    /// Feed path of the driver phase
    pub sorter: ColorSortEngine,
}

pub fn rig(params: SimParams) -> Rig {
    let config = CoreConfig::default();
    let robot = SimRobot::with_params(params);
    let (ctx, writer) = RobotContext::new(robot.feed_motors(), config.sort.clone());
    let control = ControlStack::new(robot.drive_devices(), ctx.clone(), config);
    let sorter = ColorSortEngine::new(
        ctx.clone(),
        robot.intake_color_sensor(),
        robot.transport_color_sensor(),
    );
    Rig {
        robot,
        ctx,
        writer,
        control,
        sorter,
    }
}

pub fn open_field() -> Rig {
    rig(SimParams::open_field())
}

/// Robot facing the wall, `y_mm` from the field origin
pub fn facing_wall(y_mm: f64, heading_deg: f64) -> Rig {
    let rig = rig(SimParams::default());
    rig.robot.place(y_mm, heading_deg);
    rig
}
