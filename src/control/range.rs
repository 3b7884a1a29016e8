//! Range-assisted drives
//!
//! The robot holds a heading with a PD loop and stops once the ranging
//! reading passes a target distance. With both sensors on the same surface
//! their difference also steers the chassis parallel to it. Power ramps down
//! over the final part of the travel.

use super::actuators::{BrakeMode, ChassisCommand};
use super::trajectory::MotionTarget;
use super::{ControlStack, MotionOutcome, MotionReport};
use crate::perception::filters::{RangePair, RangeSide, RangeSource, RangeStop};
use tracing::{debug, info, trace, warn};

/// Power after the deceleration ramp
///
/// `None` travel or a travel too short to ramp over leaves `power` as is.
pub(crate) fn ramp_power(
    power: f64,
    remaining: f64,
    total_travel: Option<f64>,
    ramp_fraction: f64,
    min_travel: f64,
    min_power: f64,
) -> f64 {
    match total_travel {
        Some(travel) if travel > min_travel => {
            let decel = travel * ramp_fraction;
            let scaled = if remaining < decel {
                power * remaining / decel
            } else {
                power
            };
            scaled.max(min_power)
        }
        _ => power,
    }
}

impl ControlStack {
    /// Drive until the combined reading of both range sensors passes
    /// `target_mm`
    ///
    /// `reverse` selects a retreat: stop once the distance rises above the
    /// target instead of falling below it. The sign of `power` sets the
    /// direction of travel.
    pub async fn drive_to_range(
        &mut self,
        target_mm: f64,
        power: f64,
        heading_deg: f64,
        reverse: bool,
    ) -> MotionReport {
        self.range_drive(RangeSource::Pair, target_mm, power, heading_deg, reverse)
            .await
    }

    /// Same as [`ControlStack::drive_to_range`] with one sensor and no
    /// cross-track correction
    pub async fn drive_to_range_single(
        &mut self,
        sensor: RangeSide,
        target_mm: f64,
        power: f64,
        heading_deg: f64,
        reverse: bool,
    ) -> MotionReport {
        self.range_drive(RangeSource::Single(sensor), target_mm, power, heading_deg, reverse)
            .await
    }

    fn read_ranges(&self, source: RangeSource) -> RangePair {
        match source {
            RangeSource::Pair => self.devices.ranges(),
            RangeSource::Single(RangeSide::Left) => {
                RangePair::new(self.devices.range(RangeSide::Left), None)
            }
            RangeSource::Single(RangeSide::Right) => {
                RangePair::new(None, self.devices.range(RangeSide::Right))
            }
        }
    }

    async fn range_drive(
        &mut self,
        source: RangeSource,
        target_mm: f64,
        power: f64,
        heading_deg: f64,
        reverse: bool,
    ) -> MotionReport {
        if power == 0.0 {
            warn!("Range drive to {:.0} mm with zero power skipped", target_mm);
            return MotionReport::skipped();
        }
        let config = &self.config.range;
        let min_power = self.config.drive.min_power;
        let heading = self.ctx.frame().to_absolute(heading_deg);
        let stop = RangeStop { target_mm, reverse };
        let magnitude = power.abs().max(min_power);

        let start = self.read_ranges(source).distance(source);
        let motion = MotionTarget::range(target_mm, start, magnitude, heading, config);
        let mut total_travel = start.map(|d| (d - target_mm).abs());
        match start {
            Some(d) => debug!(
                "{:?} range drive {:.0} -> {:.0} mm, timeout {:?}",
                source, d, target_mm, motion.timeout
            ),
            None => warn!(
                "{:?} range drive to {:.0} mm without a reading, timeout {:?}",
                source, target_mm, motion.timeout
            ),
        }

        let mut last_heading_error = heading - self.devices.heading.heading_deg();
        let mut current = None;

        let mut clock = self.clock();
        let outcome = loop {
            if clock.elapsed() > motion.timeout {
                break MotionOutcome::TimedOut;
            }
            clock.tick();

            let ranges = self.read_ranges(source);
            current = ranges.distance(source);
            if let Some(distance) = current {
                if stop.reached(distance) {
                    break MotionOutcome::ReachedRange;
                }
                total_travel.get_or_insert((distance - target_mm).abs());
            }

            let heading_error = heading - self.devices.heading.heading_deg();
            let mut turn = config.heading_kp * heading_error
                + config.heading_kd * (heading_error - last_heading_error);
            last_heading_error = heading_error;

            if source == RangeSource::Pair {
                if let Some(offset) = ranges.cross_track(config.cross_track_max_diff_mm) {
                    turn += config.cross_track_kp * offset;
                }
            }

            let drive = match current {
                Some(distance) => ramp_power(
                    magnitude,
                    (distance - target_mm).abs(),
                    total_travel,
                    config.ramp_fraction,
                    config.min_ramp_travel_mm,
                    min_power,
                ),
                None => magnitude,
            };
            trace!(?current, drive, turn, "range");
            self.devices
                .drivetrain
                .command(ChassisCommand::steer(motion.direction * drive, turn));
            clock.wait().await;
        };

        self.devices.drivetrain.stop(BrakeMode::Brake);
        let final_error = current.map(|d| d - target_mm);
        info!(
            "{:?} range drive to {:.0} mm: {:?} at {:?} mm",
            source, target_mm, outcome, current
        );
        clock.finish(outcome, final_error)
    }
}
