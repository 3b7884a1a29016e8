//! Kinematics of the simulated chassis
//!
//! Each drive side is a first-order lag toward a speed set by its power,
//! with a static deadband standing in for drivetrain friction. The field is
//! empty apart from an optional wall straight ahead (heading 0).

use crate::control::actuators::BrakeMode;

/// Physical parameters of the simulated robot
#[derive(Debug, Clone, PartialEq)]
pub struct SimParams {
    /// Power needed before a side starts moving
    pub deadband: f64,
    /// Side speed at full power, encoder degrees per second
    pub max_speed_deg_s: f64,
    pub mm_per_deg: f64,
    pub track_mm: f64,
    /// Distance from the center to the front face with the range sensors
    pub front_offset_mm: f64,
    /// Lateral offset of each range sensor from the center line
    pub sensor_lateral_mm: f64,
    /// Wall across the field at this y, `None` for an open field
    pub wall_y_mm: Option<f64>,
    pub max_range_mm: f64,
    /// Range sensors lose the wall beyond this angle
    pub max_range_angle_deg: f64,
    pub drive_tau_s: f64,
    pub brake_tau_s: f64,
    pub coast_tau_s: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            deadband: 22.0,
            max_speed_deg_s: 1500.0,
            mm_per_deg: 2.5,
            track_mm: 750.0,
            front_offset_mm: 150.0,
            sensor_lateral_mm: 100.0,
            wall_y_mm: Some(1500.0),
            max_range_mm: 2000.0,
            max_range_angle_deg: 60.0,
            drive_tau_s: 0.08,
            brake_tau_s: 0.03,
            coast_tau_s: 0.3,
        }
    }
}

impl SimParams {
    /// Default robot on a field without walls
    pub fn open_field() -> Self {
        SimParams {
            wall_y_mm: None,
            ..Self::default()
        }
    }
}

/// Drive mode of both sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    Powered,
    Stopped(BrakeMode),
}

/// Pose and wheel state
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub x_mm: f64,
    pub y_mm: f64,
    /// Clockwise positive, degrees
    pub heading_deg: f64,
    pub left_speed: f64,
    pub right_speed: f64,
    pub left_position: f64,
    pub right_position: f64,
    pub left_power: f64,
    pub right_power: f64,
    pub mode: DriveMode,
    /// External yaw rate pushing the robot, degrees per second
    pub yaw_disturbance: f64,
}

impl Body {
    pub fn at(y_mm: f64, heading_deg: f64) -> Self {
        Body {
            x_mm: 0.0,
            y_mm,
            heading_deg,
            left_speed: 0.0,
            right_speed: 0.0,
            left_position: 0.0,
            right_position: 0.0,
            left_power: 0.0,
            right_power: 0.0,
            mode: DriveMode::Stopped(BrakeMode::Coast),
            yaw_disturbance: 0.0,
        }
    }

    fn target_speed(&self, power: f64, params: &SimParams) -> f64 {
        if self.mode != DriveMode::Powered {
            return 0.0;
        }
        let effective = (power.abs() - params.deadband).max(0.0) / (100.0 - params.deadband);
        effective.copysign(power) * params.max_speed_deg_s
    }

    fn tau(&self, params: &SimParams) -> f64 {
        match self.mode {
            DriveMode::Powered => params.drive_tau_s,
            DriveMode::Stopped(BrakeMode::Brake | BrakeMode::Hold) => params.brake_tau_s,
            DriveMode::Stopped(BrakeMode::Coast) => params.coast_tau_s,
        }
    }

    /// Advance by `dt` seconds
    pub fn step(&mut self, params: &SimParams, dt: f64) {
        let tau = self.tau(params);
        let left_target = self.target_speed(self.left_power, params);
        let right_target = self.target_speed(self.right_power, params);
        self.left_speed += (left_target - self.left_speed) * dt / tau;
        self.right_speed += (right_target - self.right_speed) * dt / tau;

        let yaw_rate = ((self.left_speed - self.right_speed) * params.mm_per_deg / params.track_mm)
            .to_degrees()
            + self.yaw_disturbance;
        let speed_mm = (self.left_speed + self.right_speed) / 2.0 * params.mm_per_deg;
        let heading = self.heading_deg.to_radians();
        let next_y = self.y_mm + speed_mm * heading.cos() * dt;

        if let Some(wall) = params.wall_y_mm {
            if speed_mm > 0.0 && next_y + params.front_offset_mm * heading.cos() >= wall {
                // Pinned against the wall: the wheels stop turning.
                self.y_mm = wall - params.front_offset_mm * heading.cos();
                self.left_speed = 0.0;
                self.right_speed = 0.0;
                return;
            }
        }

        self.y_mm = next_y;
        self.x_mm += speed_mm * heading.sin() * dt;
        self.left_position += self.left_speed * dt;
        self.right_position += self.right_speed * dt;
        self.heading_deg += yaw_rate * dt;
    }

    /// Reading of a forward range sensor `lateral_mm` right of the center line
    pub fn range_to_wall(&self, params: &SimParams, lateral_mm: f64) -> Option<f64> {
        let wall = params.wall_y_mm?;
        if self.heading_deg.abs() >= params.max_range_angle_deg {
            return None;
        }
        let heading = self.heading_deg.to_radians();
        let sensor_y =
            self.y_mm + params.front_offset_mm * heading.cos() - lateral_mm * heading.sin();
        let distance = (wall - sensor_y) / heading.cos();
        (0.0..=params.max_range_mm).contains(&distance).then_some(distance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(body: &mut Body, params: &SimParams, seconds: f64) {
        for _ in 0..(seconds * 1000.0) as usize {
            body.step(params, 0.001);
        }
    }

    #[test]
    fn deadband_power_does_not_move() {
        let params = SimParams::open_field();
        let mut body = Body::at(0.0, 0.0);
        body.mode = DriveMode::Powered;
        body.left_power = 20.0;
        body.right_power = 20.0;
        run(&mut body, &params, 1.0);
        assert_eq!(body.y_mm, 0.0);
    }

    #[test]
    fn spin_turns_clockwise() {
        let params = SimParams::open_field();
        let mut body = Body::at(0.0, 0.0);
        body.mode = DriveMode::Powered;
        body.left_power = 60.0;
        body.right_power = -60.0;
        run(&mut body, &params, 0.5);
        assert!(body.heading_deg > 10.0);
        assert!(body.y_mm.abs() < 1e-6);
    }

    #[test]
    fn wall_stops_the_robot() {
        let params = SimParams::default();
        let mut body = Body::at(1000.0, 0.0);
        body.mode = DriveMode::Powered;
        body.left_power = 80.0;
        body.right_power = 80.0;
        run(&mut body, &params, 2.0);
        assert!((body.y_mm - 1350.0).abs() < 1e-6);
        assert_eq!(body.left_speed, 0.0);
        assert_eq!(body.range_to_wall(&params, 0.0), Some(0.0));
    }

    #[test]
    fn turned_robot_sees_left_sensor_closer() {
        let params = SimParams::default();
        let body = Body::at(0.0, 5.0);
        let left = body.range_to_wall(&params, -params.sensor_lateral_mm).unwrap();
        let right = body.range_to_wall(&params, params.sensor_lateral_mm).unwrap();
        assert!(left < right);
    }
}
