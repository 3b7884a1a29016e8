mod common;

use std::time::Duration;
use vanguard_core::control::actuators::{BrakeMode, ChassisCommand};
use vanguard_core::control::MotionOutcome;

#[tokio::test(start_paused = true)]
async fn contact_with_the_wall_is_a_stall() {
    let mut rig = common::facing_wall(1200.0, 0.0);
    let report = rig
        .control
        .drive_until_stall_or_drift(60.0, Duration::from_secs(3), 10.0)
        .await;

    assert_eq!(report.outcome, MotionOutcome::Stalled, "{:?}", report);
    assert!((rig.robot.pose().1 - 1350.0).abs() < 1e-6);
    assert!(report.elapsed < Duration::from_millis(500));
    assert_eq!(rig.robot.brake_mode(), Some(BrakeMode::Brake));
}

#[tokio::test(start_paused = true)]
async fn deflection_aborts_the_drive() {
    let mut rig = common::open_field();
    rig.robot.set_yaw_disturbance(30.0);
    let report = rig
        .control
        .drive_until_stall_or_drift(60.0, Duration::from_secs(3), 5.0)
        .await;

    assert_eq!(report.outcome, MotionOutcome::Deflected, "{:?}", report);
    assert!(report.final_error.unwrap() > 5.0);
}

#[tokio::test(start_paused = true)]
async fn drift_is_measured_from_the_last_commanded_heading() {
    let mut rig = common::open_field();
    rig.control.turn_to(90.0).await;
    let report = rig
        .control
        .drive_until_stall_or_drift(60.0, Duration::from_millis(500), 10.0)
        .await;

    // Still inside the allowed drift of the 90 degree reference.
    assert_eq!(report.outcome, MotionOutcome::TimedOut, "{:?}", report);
    assert!(report.final_error.unwrap().abs() < 10.0);
}

#[tokio::test(start_paused = true)]
async fn open_field_drive_times_out() {
    let mut rig = common::open_field();
    let report = rig
        .control
        .drive_until_stall_or_drift(60.0, Duration::from_millis(500), 45.0)
        .await;

    assert!(report.timed_out());
    assert!(report.elapsed >= Duration::from_millis(500));
    assert!(rig.robot.pose().1 > 0.0);
}

#[tokio::test(start_paused = true)]
async fn power_below_friction_stalls_after_spin_up() {
    let mut rig = common::open_field();
    let report = rig
        .control
        .drive_until_stall_or_drift(20.0, Duration::from_secs(3), 10.0)
        .await;

    assert_eq!(report.outcome, MotionOutcome::Stalled);
    assert!(report.elapsed >= Duration::from_millis(100));
    assert!(report.elapsed <= Duration::from_millis(120));
}

#[tokio::test(start_paused = true)]
async fn wall_stop_ends_with_zero_power() {
    let mut rig = common::facing_wall(1200.0, 0.0);
    let report = rig.control.wall_stop(60.0, Duration::from_secs(3)).await;

    assert_eq!(report.outcome, MotionOutcome::Stalled);
    assert_eq!(rig.robot.drive_command(), ChassisCommand::default());
    assert_eq!(rig.robot.brake_mode(), None);
}
