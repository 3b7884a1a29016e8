use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;
use vanguard_core::behaviors::color_sort::{ColorSortEngine, ColorSortNode};
use vanguard_core::behaviors::telemetry::TelemetryNode;
use vanguard_core::behaviors::FeedPreset;
use vanguard_core::config::CoreConfig;
use vanguard_core::context::{Alliance, RobotContext};
use vanguard_core::control::actuators::Wing;
use vanguard_core::control::controllers::DriverSample;
use vanguard_core::control::ControlStack;
use vanguard_core::lifecycle::task::Phase;
use vanguard_core::logging::{init_logging, DEFAULT_FILTER};
use vanguard_core::perception::filters::RangeSide;
use vanguard_core::perception::localization::FieldSide;
use vanguard_core::perception::sensors::{BallColor, ColorSample};
use vanguard_core::perception::PerceptionStack;
use vanguard_core::sim::{ScriptedDriver, SimRobot};
use vanguard_core::RobotCore;

const DEFAULT_CONFIG: &str = "config/core.toml";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(DEFAULT_FILTER)?;

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = CoreConfig::load(&path).with_context(|| format!("loading {}", path))?;
    info!("Initializing Vanguard core with {}", path);

    let robot = SimRobot::new();
    let (ctx, mut writer) = RobotContext::new(robot.feed_motors(), config.sort.clone());
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
    core.register(ColorSortNode::new(engine.clone(), &config.sort));
    core.register(ControlStack::new(robot.drive_devices(), ctx.clone(), config));
    core.init()?;

    // Autonomous
    core.enter_phase(Phase::Autonomous);
    writer.set_alliance(Alliance::Red);
    writer.reset_frame(FieldSide::Normal, robot.heading_sensor().heading_deg());
    writer.set_feed_mode(FeedPreset::AutoSortFeed);
    robot.set_colors(ColorSample::ball(BallColor::Blue), ColorSample::EMPTY);

    let control = core
        .component_mut::<ControlStack>()
        .context("control stack not registered")?;
    let report = control.drive_distance(300.0, None).await;
    info!("Drive: {:?}", report);
    robot.set_colors(ColorSample::EMPTY, ColorSample::EMPTY);

    let report = control.turn_to(90.0).await;
    info!("Turn: {:?}", report);
    let report = control.turn_to(0.0).await;
    info!("Turn back: {:?}", report);

    control.set_wing(Wing::ExtendRight);
    let report = control
        .drive_to_range_single(RangeSide::Left, 400.0, 60.0, 0.0, false)
        .await;
    info!("Range approach: {:?}", report);
    control.set_wing(Wing::RetractBoth);

    let report = control
        .drive_until_stall_or_drift(40.0, Duration::from_secs(2), 15.0)
        .await;
    info!("Square up: {:?}", report);
    writer.set_feed_mode(FeedPreset::NormalFeed);
    control.hold_stop(Duration::from_millis(300)).await;
    writer.set_feed_mode(FeedPreset::Stop);

    // Driver control
    let phases = core.phase_switch();
    phases.enter(Phase::DriverControl);
    let driver = ScriptedDriver::new();
    driver.set(DriverSample {
        forward: -50.0,
        turn: 20.0,
        collect_pressed: true,
        ..DriverSample::default()
    });
    let end_of_match = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        phases.enter(Phase::Disabled);
    };
    let control = core
        .component_mut::<ControlStack>()
        .context("control stack not registered")?;
    let (iterations, ()) = tokio::join!(control.run_driver(&driver, &engine), end_of_match);
    info!("Driver control ran {} iterations", iterations);

    let (x, y, heading) = robot.pose();
    info!("Final pose: x {:.0} mm, y {:.0} mm, heading {:.1} deg", x, y, heading);

    core.shutdown()?;
    info!("Core shut down");
    Ok(())
}
