//! Straight-line drives measured by the wheel encoders

use super::actuators::{BrakeMode, ChassisCommand};
use super::trajectory::MotionTarget;
use super::{ControlStack, MotionOutcome, MotionReport};
use tracing::{debug, info, trace};

impl ControlStack {
    /// Drive a signed encoder distance while holding a heading
    ///
    /// `heading_deg` defaults to the last commanded heading. Forward power
    /// comes from a PD on the distance error and never drops below the
    /// minimum drive power; the heading PD only trims steering.
    pub async fn drive_distance(
        &mut self,
        encoder_deg: f64,
        heading_deg: Option<f64>,
    ) -> MotionReport {
        let config = &self.config.drive;
        let frame = self.ctx.frame();
        let heading = frame.to_absolute(heading_deg.unwrap_or(frame.last_commanded_deg));
        let motion = MotionTarget::distance(encoder_deg, heading, config);

        self.devices.drivetrain.reset_positions();
        debug!(
            "drive_distance {:.0} at heading {:.1}, timeout {:?}",
            encoder_deg, heading, motion.timeout
        );

        let mut last_error = motion.magnitude;
        let mut last_heading_error = heading - self.devices.heading.heading_deg();
        let mut error = motion.magnitude;

        let mut clock = self.clock();
        let outcome = loop {
            if clock.elapsed() > motion.timeout {
                break MotionOutcome::TimedOut;
            }
            clock.tick();

            error = motion.magnitude - self.devices.mean_abs_position();
            let rate = error - last_error;
            last_error = error;

            let heading_error = heading - self.devices.heading.heading_deg();
            let turn = config.heading_kp * heading_error
                + config.heading_kd * (heading_error - last_heading_error);
            last_heading_error = heading_error;

            if error < config.tolerance && rate.abs() < config.rate_tolerance {
                break MotionOutcome::Converged;
            }

            let power = (config.move_kp * error + config.move_kd * rate).max(config.min_power);
            trace!(error, rate, power, turn, "drive");
            self.devices
                .drivetrain
                .command(ChassisCommand::steer(motion.direction * power, turn));
            clock.wait().await;
        };

        self.devices.drivetrain.stop(BrakeMode::Brake);
        info!("drive_distance {:.0}: {:?}, error {:.1}", encoder_deg, outcome, error);
        clock.finish(outcome, Some(error))
    }

    /// Drive open-loop at `power` until the wheels travel `encoder_deg`
    pub async fn drive_encoder(&mut self, power: f64, encoder_deg: f64) -> MotionReport {
        if power == 0.0 || encoder_deg == 0.0 {
            return MotionReport::skipped();
        }
        let motion = MotionTarget::encoder(encoder_deg, power, &self.config.drive);
        self.devices.drivetrain.reset_positions();

        let mut clock = self.clock();
        let outcome = loop {
            if clock.elapsed() > motion.timeout {
                break MotionOutcome::TimedOut;
            }
            clock.tick();
            if self.devices.mean_abs_position() >= motion.magnitude {
                break MotionOutcome::Converged;
            }
            self.devices.drivetrain.command(ChassisCommand::straight(power));
            clock.wait().await;
        };

        self.devices.drivetrain.stop(BrakeMode::Brake);
        let remaining = motion.magnitude - self.devices.mean_abs_position();
        debug!("drive_encoder {:.0} at {}: {:?}", encoder_deg, power, outcome);
        clock.finish(outcome, Some(remaining))
    }
}
