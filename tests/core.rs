use std::time::Duration;
use vanguard_core::behaviors::color_sort::{ColorSortEngine, ColorSortNode};
use vanguard_core::behaviors::telemetry::TelemetryNode;
use vanguard_core::config::CoreConfig;
use vanguard_core::context::{Alliance, RobotContext, RoutineWriter};
use vanguard_core::control::{ControlStack, MotionOutcome};
use vanguard_core::error::{CoreError, SensorError};
use vanguard_core::lifecycle::task::Phase;
use vanguard_core::lifecycle::LifecycleNode;
use vanguard_core::perception::localization::FieldSide;
use vanguard_core::perception::PerceptionStack;
use vanguard_core::sim::SimRobot;
use vanguard_core::RobotCore;

fn build(robot: &SimRobot) -> (RobotCore, RoutineWriter) {
    let config = CoreConfig::default();
    let (ctx, writer) = RobotContext::new(robot.feed_motors(), config.sort.clone());
    let mut core = RobotCore::new(ctx.clone());

    core.register(PerceptionStack::new(ctx.clone(), robot.heading_sensor()));
    core.register(TelemetryNode::new(
        ctx.clone(),
        robot.heading_sensor(),
        robot.drivetrain(),
        &config.telemetry,
    ));
    let engine = ColorSortEngine::new(
        ctx.clone(),
        robot.intake_color_sensor(),
        robot.transport_color_sensor(),
    );
    core.register(ColorSortNode::new(engine, &config.sort));
    core.register(ControlStack::new(robot.drive_devices(), ctx, config));
    (core, writer)
}

#[tokio::test(start_paused = true)]
async fn components_start_and_stop_together() {
    let robot = SimRobot::new();
    robot.set_heading_deg(15.0);
    let (mut core, mut writer) = build(&robot);

    core.init().unwrap();
    assert_eq!(robot.calibrations(), 1);
    assert_eq!(robot.heading_sensor().heading_deg(), 0.0);
    assert!(core.component_mut::<ColorSortNode>().unwrap().is_running());

    core.enter_phase(Phase::Autonomous);
    writer.set_alliance(Alliance::Red);
    writer.reset_frame(FieldSide::Normal, 0.0);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let sample = core.component_mut::<TelemetryNode>().unwrap().latest().unwrap();
    assert_eq!(sample.phase, Phase::Autonomous);
    assert_eq!(sample.alliance, Alliance::Red);

    let control = core.component_mut::<ControlStack>().unwrap();
    let report = control.turn_to(90.0).await;
    assert_eq!(report.outcome, MotionOutcome::Converged);

    core.shutdown().unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!core.component_mut::<ColorSortNode>().unwrap().is_running());
}

#[tokio::test(start_paused = true)]
async fn calibration_failure_stops_initialisation() {
    let robot = SimRobot::new();
    robot.fail_calibration(SensorError::Disconnected("port 21".into()));
    let (mut core, _writer) = build(&robot);

    let err = core.init().unwrap_err();
    assert!(matches!(err, CoreError::Sensor(SensorError::Disconnected(_))));
    assert!(!core.component_mut::<ColorSortNode>().unwrap().is_running());
}

#[tokio::test(start_paused = true)]
async fn sort_node_cannot_be_activated_twice() {
    let robot = SimRobot::new();
    let (mut core, _writer) = build(&robot);
    core.init().unwrap();

    let node = core.component_mut::<ColorSortNode>().unwrap();
    let err = node.on_activate().unwrap_err();
    assert!(matches!(err, CoreError::Lifecycle { .. }));
    core.shutdown().unwrap();
}

#[test]
fn background_nodes_need_a_runtime() {
    let robot = SimRobot::new();
    let (mut core, _writer) = build(&robot);
    let err = core.init().unwrap_err();
    assert!(matches!(err, CoreError::NoRuntime(_)));
}
