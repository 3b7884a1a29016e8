//! Heading controllers: point turn, swing turn and encoder turn

use super::actuators::{BrakeMode, ChassisCommand};
use super::pid::{GainBands, Gains, IntegralLimits, PidState};
use super::trajectory::MotionTarget;
use super::{ControlStack, MotionOutcome, MotionReport};
use crate::common::{clamp_power, sign};
use tracing::{debug, info, trace};

impl ControlStack {
    /// Rotate in place to a routine-relative heading
    ///
    /// Gains are scheduled on the initial error. The heading becomes the
    /// default target of later distance moves.
    pub async fn turn_to(&mut self, heading_deg: f64) -> MotionReport {
        let config = &self.config.turn;
        self.ctx.record_commanded_heading(heading_deg);
        let target = self.ctx.frame().to_absolute(heading_deg);

        let initial_error = target - self.devices.heading.heading_deg();
        let motion = MotionTarget::turn(target, initial_error, config);
        let gains = GainBands::from_config(config).gains(initial_error);
        let mut pid = PidState::new(initial_error, IntegralLimits::for_turn(config));
        debug!(
            "turn_to {:.1} (absolute {:.1}): error {:.1}, kp {}, kd {}, timeout {:?}",
            heading_deg, target, initial_error, gains.kp, gains.kd, motion.timeout
        );

        let mut clock = self.clock();
        let outcome = loop {
            clock.tick();
            let error = target - self.devices.heading.heading_deg();
            let rate = pid.update(error);

            let (left, right) = self.devices.drivetrain.velocities_rpm();
            if error.abs() <= config.early_exit_deg
                && (left.abs() < config.early_exit_rpm || right.abs() < config.early_exit_rpm)
            {
                break MotionOutcome::Settled;
            }
            if error.abs() <= config.tolerance_deg && rate.abs() <= config.rate_tolerance {
                break MotionOutcome::Converged;
            }
            if clock.elapsed() >= motion.timeout {
                break MotionOutcome::TimedOut;
            }

            let power = clamp_power(pid.output(gains, rate), config.power_limit);
            trace!(error, rate, integral = pid.integral(), power, "turn");
            self.devices.drivetrain.command(ChassisCommand::spin(power));
            clock.wait().await;
        };

        self.devices.drivetrain.stop(BrakeMode::Brake);
        let report = clock.finish(outcome, Some(pid.error()));
        info!(
            "turn_to {:.1}: {:?} after {:?}, error {:.2}",
            heading_deg,
            outcome,
            report.elapsed,
            pid.error()
        );
        report
    }

    /// Turn to a routine-relative heading by driving one side only
    ///
    /// The side pivoting forward is picked from the sign of the initial error.
    pub async fn swing_to(&mut self, heading_deg: f64) -> MotionReport {
        let config = &self.config.swing;
        self.ctx.record_commanded_heading(heading_deg);
        let target = self.ctx.frame().to_absolute(heading_deg);

        let initial_error = target - self.devices.heading.heading_deg();
        let motion = MotionTarget::swing(target, initial_error, config);
        let gains = Gains {
            kp: config.kp,
            ki: config.ki,
            kd: config.kd,
        };
        let mut pid = PidState::new(initial_error, IntegralLimits::for_swing(config));
        let drive_left = initial_error >= 0.0;

        let mut clock = self.clock();
        let outcome = loop {
            clock.tick();
            let error = target - self.devices.heading.heading_deg();
            let rate = pid.update(error);

            let (left, right) = self.devices.drivetrain.velocities_rpm();
            if error.abs() <= config.early_exit_deg
                && (left.abs() < config.early_exit_rpm || right.abs() < config.early_exit_rpm)
            {
                break MotionOutcome::Settled;
            }
            if error.abs() <= config.tolerance_deg && rate.abs() <= config.rate_tolerance {
                break MotionOutcome::Converged;
            }
            if clock.elapsed() >= motion.timeout {
                break MotionOutcome::TimedOut;
            }

            let power = clamp_power(pid.output(gains, rate), config.power_limit);
            let command = if drive_left {
                ChassisCommand::new(power, 0.0)
            } else {
                ChassisCommand::new(0.0, -power)
            };
            self.devices.drivetrain.command(command);
            clock.wait().await;
        };

        self.devices.drivetrain.stop(BrakeMode::Brake);
        info!("swing_to {:.1}: {:?}, error {:.2}", heading_deg, outcome, pid.error());
        clock.finish(outcome, Some(pid.error()))
    }

    /// Rotate at a fixed power until the wheels travel `encoder_deg`
    ///
    /// The direction is mirrored with the field side.
    pub async fn turn_encoder(&mut self, power: f64, encoder_deg: f64) -> MotionReport {
        let spin = self.ctx.frame().side.sign() * sign(encoder_deg) * power;
        if spin == 0.0 {
            debug!("turn_encoder: nothing to do (power {}, encoder {})", power, encoder_deg);
            return MotionReport::skipped();
        }
        let motion = MotionTarget::encoder(encoder_deg, power, &self.config.drive);

        self.devices.drivetrain.stop(BrakeMode::Coast);
        self.devices.drivetrain.reset_positions();

        let mut clock = self.clock();
        let outcome = loop {
            clock.tick();
            if self.devices.mean_abs_position() >= motion.magnitude {
                break MotionOutcome::Converged;
            }
            if clock.elapsed() > motion.timeout {
                break MotionOutcome::TimedOut;
            }
            self.devices.drivetrain.command(ChassisCommand::spin(spin));
            clock.wait().await;
        };

        self.devices.drivetrain.stop(BrakeMode::Brake);
        let remaining = motion.magnitude - self.devices.mean_abs_position();
        clock.finish(outcome, Some(remaining))
    }
}
