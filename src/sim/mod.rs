//! Simulated robot
//!
//! Implements every device trait over a shared world that is integrated
//! lazily on the tokio clock, so tests on a paused runtime run the whole
//! robot deterministically. Color sensors and driver input are scripted.
pub mod physics;

use self::physics::{Body, DriveMode, SimParams};
use crate::behaviors::FeedCommand;
use crate::control::actuators::{
    BrakeMode, ChassisCommand, Drivetrain, FeedMotors, Pneumatics, Valve,
};
use crate::control::controllers::{DriverInput, DriverSample};
use crate::control::DriveDevices;
use crate::error::SensorError;
use crate::perception::filters::RangeSide;
use crate::perception::sensors::{ColorSample, ColorSensor, HeadingSensor, RangeSensor, Sensor};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const STEP: Duration = Duration::from_millis(1);

struct World {
    params: SimParams,
    body: Body,
    updated: Instant,
    heading_offset: f64,
    calibrations: u32,
    calibration_error: Option<SensorError>,
    range_faults: [bool; 2],
    intake_color: ColorSample,
    transport_color: ColorSample,
    drive_command: ChassisCommand,
    feed: FeedCommand,
    valves: HashMap<Valve, bool>,
}

impl World {
    /// Integrate up to the current time
    fn advance(&mut self) {
        let now = Instant::now();
        while self.updated + STEP <= now {
            self.body.step(&self.params, STEP.as_secs_f64());
            self.updated += STEP;
        }
    }

    fn heading(&self) -> f64 {
        self.body.heading_deg + self.heading_offset
    }

    fn range(&self, side: RangeSide) -> Option<f64> {
        let (index, lateral) = match side {
            RangeSide::Left => (0, -self.params.sensor_lateral_mm),
            RangeSide::Right => (1, self.params.sensor_lateral_mm),
        };
        if self.range_faults[index] {
            return None;
        }
        self.body.range_to_wall(&self.params, lateral)
    }
}

/// Handle on the simulated robot; clones share the same world
#[derive(Clone)]
pub struct SimRobot {
    world: Arc<Mutex<World>>,
}

impl SimRobot {
    /// Default robot 1500 mm from a wall, facing it
    pub fn new() -> Self {
        Self::with_params(SimParams::default())
    }

    pub fn with_params(params: SimParams) -> Self {
        SimRobot {
            world: Arc::new(Mutex::new(World {
                params,
                body: Body::at(0.0, 0.0),
                updated: Instant::now(),
                heading_offset: 0.0,
                calibrations: 0,
                calibration_error: None,
                range_faults: [false; 2],
                intake_color: ColorSample::EMPTY,
                transport_color: ColorSample::EMPTY,
                drive_command: ChassisCommand::default(),
                feed: FeedCommand::default(),
                valves: HashMap::new(),
            })),
        }
    }

    fn with_world<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        let mut world = self.world.lock();
        world.advance();
        f(&mut world)
    }

    // Device handles

    pub fn drivetrain(&self) -> Arc<dyn Drivetrain> {
        Arc::new(SimDrivetrain(self.clone()))
    }

    pub fn heading_sensor(&self) -> Arc<dyn HeadingSensor> {
        Arc::new(SimHeading(self.clone()))
    }

    pub fn range_sensor(&self, side: RangeSide) -> Arc<dyn RangeSensor> {
        Arc::new(SimRange {
            robot: self.clone(),
            side,
        })
    }

    pub fn intake_color_sensor(&self) -> Arc<dyn ColorSensor> {
        Arc::new(SimColor {
            robot: self.clone(),
            transport: false,
        })
    }

    pub fn transport_color_sensor(&self) -> Arc<dyn ColorSensor> {
        Arc::new(SimColor {
            robot: self.clone(),
            transport: true,
        })
    }

    pub fn feed_motors(&self) -> Arc<dyn FeedMotors> {
        Arc::new(SimFeed(self.clone()))
    }

    pub fn pneumatics(&self) -> Arc<dyn Pneumatics> {
        Arc::new(SimPneumatics(self.clone()))
    }

    /// Everything the control stack needs
    pub fn drive_devices(&self) -> DriveDevices {
        DriveDevices {
            drivetrain: self.drivetrain(),
            heading: self.heading_sensor(),
            range_left: self.range_sensor(RangeSide::Left),
            range_right: self.range_sensor(RangeSide::Right),
            pneumatics: self.pneumatics(),
        }
    }

    // Scenario setup and inspection

    /// Put the robot at rest at `y_mm` with a physical heading
    pub fn place(&self, y_mm: f64, heading_deg: f64) {
        self.with_world(|w| {
            w.body = Body::at(y_mm, heading_deg);
            w.heading_offset = 0.0;
        });
    }

    /// Make the heading sensor read `heading_deg` without moving the robot
    pub fn set_heading_deg(&self, heading_deg: f64) {
        self.with_world(|w| w.heading_offset = heading_deg - w.body.heading_deg);
    }

    /// Physical pose: x, y and heading
    pub fn pose(&self) -> (f64, f64, f64) {
        self.with_world(|w| (w.body.x_mm, w.body.y_mm, w.body.heading_deg))
    }

    pub fn set_yaw_disturbance(&self, deg_per_s: f64) {
        self.with_world(|w| w.body.yaw_disturbance = deg_per_s);
    }

    /// Make one range sensor report nothing
    pub fn set_range_fault(&self, side: RangeSide, faulty: bool) {
        let index = match side {
            RangeSide::Left => 0,
            RangeSide::Right => 1,
        };
        self.with_world(|w| w.range_faults[index] = faulty);
    }

    pub fn set_colors(&self, intake: ColorSample, transport: ColorSample) {
        self.with_world(|w| {
            w.intake_color = intake;
            w.transport_color = transport;
        });
    }

    pub fn fail_calibration(&self, error: SensorError) {
        self.with_world(|w| w.calibration_error = Some(error));
    }

    pub fn calibrations(&self) -> u32 {
        self.with_world(|w| w.calibrations)
    }

    /// Last command sent to the drivetrain
    pub fn drive_command(&self) -> ChassisCommand {
        self.with_world(|w| w.drive_command)
    }

    /// Brake mode if the drivetrain is stopped
    pub fn brake_mode(&self) -> Option<BrakeMode> {
        self.with_world(|w| match w.body.mode {
            DriveMode::Powered => None,
            DriveMode::Stopped(mode) => Some(mode),
        })
    }

    pub fn feed_command(&self) -> FeedCommand {
        self.with_world(|w| w.feed)
    }

    pub fn valve(&self, valve: Valve) -> Option<bool> {
        self.with_world(|w| w.valves.get(&valve).copied())
    }
}

impl Default for SimRobot {
    fn default() -> Self {
        Self::new()
    }
}

struct SimDrivetrain(SimRobot);

impl Drivetrain for SimDrivetrain {
    fn command(&self, command: ChassisCommand) {
        self.0.with_world(|w| {
            w.body.mode = DriveMode::Powered;
            w.body.left_power = command.left;
            w.body.right_power = command.right;
            w.drive_command = command;
        });
    }

    fn stop(&self, mode: BrakeMode) {
        self.0.with_world(|w| {
            w.body.mode = DriveMode::Stopped(mode);
            w.body.left_power = 0.0;
            w.body.right_power = 0.0;
            w.drive_command = ChassisCommand::default();
        });
    }

    fn reset_positions(&self) {
        self.0.with_world(|w| {
            w.body.left_position = 0.0;
            w.body.right_position = 0.0;
        });
    }

    fn positions_deg(&self) -> (f64, f64) {
        self.0
            .with_world(|w| (w.body.left_position, w.body.right_position))
    }

    fn velocities_rpm(&self) -> (f64, f64) {
        self.0
            .with_world(|w| (w.body.left_speed / 6.0, w.body.right_speed / 6.0))
    }
}

struct SimHeading(SimRobot);

impl Sensor for SimHeading {
    fn name(&self) -> &str {
        "sim_imu"
    }
}

impl HeadingSensor for SimHeading {
    fn heading_deg(&self) -> f64 {
        self.0.with_world(|w| w.heading())
    }

    fn set_heading(&self, heading_deg: f64) {
        self.0.set_heading_deg(heading_deg);
    }

    fn calibrate(&self) -> Result<(), SensorError> {
        self.0.with_world(|w| match &w.calibration_error {
            Some(error) => Err(error.clone()),
            None => {
                w.calibrations += 1;
                Ok(())
            }
        })
    }
}

struct SimRange {
    robot: SimRobot,
    side: RangeSide,
}

impl Sensor for SimRange {
    fn name(&self) -> &str {
        match self.side {
            RangeSide::Left => "sim_range_left",
            RangeSide::Right => "sim_range_right",
        }
    }
}

impl RangeSensor for SimRange {
    fn distance_mm(&self) -> Option<f64> {
        self.robot.with_world(|w| w.range(self.side))
    }
}

struct SimColor {
    robot: SimRobot,
    transport: bool,
}

impl Sensor for SimColor {
    fn name(&self) -> &str {
        if self.transport {
            "sim_color_transport"
        } else {
            "sim_color_intake"
        }
    }
}

impl ColorSensor for SimColor {
    fn sample(&self) -> ColorSample {
        self.robot.with_world(|w| {
            if self.transport {
                w.transport_color
            } else {
                w.intake_color
            }
        })
    }
}

struct SimFeed(SimRobot);

impl FeedMotors for SimFeed {
    fn set_intake(&self, power: f64) {
        self.0.with_world(|w| w.feed.intake = power);
    }

    fn set_separator(&self, power: f64) {
        self.0.with_world(|w| w.feed.separator = power);
    }

    fn set_shooter(&self, power: f64) {
        self.0.with_world(|w| w.feed.shooter = power);
    }
}

struct SimPneumatics(SimRobot);

impl Pneumatics for SimPneumatics {
    fn set(&self, valve: Valve, engaged: bool) {
        self.0.with_world(|w| {
            w.valves.insert(valve, engaged);
        });
    }
}

/// Driver input set by the test or demo
#[derive(Default)]
pub struct ScriptedDriver {
    sample: Mutex<DriverSample>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, sample: DriverSample) {
        *self.sample.lock() = sample;
    }
}

impl DriverInput for ScriptedDriver {
    fn sample(&self) -> DriverSample {
        *self.sample.lock()
    }
}
