//! Open-loop drives that end on contact
//!
//! Used to square up against a wall or a goal: the robot drives at a fixed
//! power and watches for a stall or for the heading being knocked away from
//! the frame's reference. Power is never corrected mid-drive.

use super::actuators::{BrakeMode, ChassisCommand};
use super::{ControlStack, MotionOutcome, MotionReport};
use std::time::Duration;
use tokio::time;
use tracing::{debug, info};

impl ControlStack {
    fn stalled(&self) -> bool {
        let (left, right) = self.devices.drivetrain.velocities_rpm();
        let threshold = self.config.stall.stall_rpm;
        left.abs() < threshold || right.abs() < threshold
    }

    /// Drive at `power` until a side stalls, the heading drifts more than
    /// `allowed_drift_deg` from the last commanded heading, or `timeout`
    pub async fn drive_until_stall_or_drift(
        &mut self,
        power: f64,
        timeout: Duration,
        allowed_drift_deg: f64,
    ) -> MotionReport {
        let reference = self.ctx.frame().reference_absolute();
        let spin_up = Duration::from_millis(self.config.stall.spin_up_ms);
        let mut drift = self.devices.heading.heading_deg() - reference;
        debug!(
            "drive_until_stall_or_drift: power {}, reference {:.1}, allowed {:.1}",
            power, reference, allowed_drift_deg
        );

        let mut clock = self.clock();
        let outcome = loop {
            if clock.elapsed() >= timeout {
                break MotionOutcome::TimedOut;
            }
            clock.tick();

            drift = self.devices.heading.heading_deg() - reference;
            if drift.abs() > allowed_drift_deg {
                break MotionOutcome::Deflected;
            }
            if clock.elapsed() >= spin_up && self.stalled() {
                break MotionOutcome::Stalled;
            }

            self.devices.drivetrain.command(ChassisCommand::straight(power));
            clock.wait().await;
        };

        self.devices.drivetrain.stop(BrakeMode::Brake);
        info!(
            "drive_until_stall_or_drift: {:?} after {:?}, drift {:.1}",
            outcome,
            clock.elapsed(),
            drift
        );
        clock.finish(outcome, Some(drift))
    }

    /// Drive at `power` until a side stalls or `timeout`; ends with zero power
    pub async fn wall_stop(&mut self, power: f64, timeout: Duration) -> MotionReport {
        let spin_up = Duration::from_millis(self.config.stall.spin_up_ms);
        let mut clock = self.clock();
        self.devices.drivetrain.command(ChassisCommand::straight(power));
        time::sleep(spin_up).await;

        let outcome = loop {
            if clock.elapsed() > timeout {
                break MotionOutcome::TimedOut;
            }
            clock.tick();
            if self.stalled() {
                break MotionOutcome::Stalled;
            }
            clock.wait().await;
        };

        self.devices.drivetrain.command(ChassisCommand::straight(0.0));
        debug!("wall_stop at {}: {:?} after {:?}", power, outcome, clock.elapsed());
        clock.finish(outcome, None)
    }
}
