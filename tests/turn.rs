mod common;

use std::time::Duration;
use vanguard_core::control::MotionOutcome;
use vanguard_core::perception::localization::FieldSide;

fn turn_timeout(error_deg: f64) -> Duration {
    Duration::from_secs_f64(error_deg.abs() / 50.0 + 1.0)
}

#[tokio::test(start_paused = true)]
async fn point_turn_converges_across_bands() {
    for target in [30.0, 90.0, 180.0, -120.0] {
        let mut rig = common::open_field();
        let report = rig.control.turn_to(target).await;

        assert_eq!(report.outcome, MotionOutcome::Converged, "target {}", target);
        let error = report.final_error.unwrap();
        assert!(error.abs() <= 2.0, "target {}: error {}", target, error);
        assert!(report.elapsed <= turn_timeout(target), "target {}: {:?}", target, report);
        assert!((rig.control.heading_deg() - target).abs() <= 3.0);
    }
}

#[tokio::test(start_paused = true)]
async fn small_error_settles_without_moving() {
    let mut rig = common::open_field();
    let report = rig.control.turn_to(2.0).await;

    assert_eq!(report.outcome, MotionOutcome::Settled);
    assert_eq!(report.iterations, 1);
    assert_eq!(rig.robot.pose().2, 0.0);
}

#[tokio::test(start_paused = true)]
async fn turn_records_commanded_heading() {
    let mut rig = common::open_field();
    rig.control.turn_to(90.0).await;
    assert_eq!(rig.ctx.frame().last_commanded_deg, 90.0);

    rig.control.swing_to(60.0).await;
    assert_eq!(rig.ctx.frame().last_commanded_deg, 60.0);
}

#[tokio::test(start_paused = true)]
async fn mirrored_side_turns_the_other_way() {
    let mut rig = common::open_field();
    rig.writer.reset_frame(FieldSide::Mirrored, 0.0);
    let report = rig.control.turn_to(45.0).await;

    assert!(!report.timed_out());
    assert!((rig.control.heading_deg() + 45.0).abs() <= 3.0);
    // Routine-relative commands stay unmirrored.
    assert_eq!(rig.ctx.frame().last_commanded_deg, 45.0);
}

#[tokio::test(start_paused = true)]
async fn start_offset_shifts_the_target() {
    let mut rig = common::open_field();
    rig.writer.reset_frame(FieldSide::Normal, 20.0);
    rig.control.turn_to(40.0).await;
    assert!((rig.control.heading_deg() - 60.0).abs() <= 3.0);
}

#[tokio::test(start_paused = true)]
async fn swing_turn_reaches_heading_in_both_directions() {
    for target in [45.0, -45.0] {
        let mut rig = common::open_field();
        let report = rig.control.swing_to(target).await;

        assert!(
            matches!(report.outcome, MotionOutcome::Settled | MotionOutcome::Converged),
            "target {}: {:?}",
            target,
            report
        );
        assert!(report.final_error.unwrap().abs() <= 3.0);
        // A swing moves the center off the spot.
        let (x, y, _) = rig.robot.pose();
        assert!(x.abs() + y.abs() > 1.0);
    }
}

#[tokio::test(start_paused = true)]
async fn encoder_turn_is_mirrored_by_side() {
    let mut rig = common::open_field();
    let report = rig.control.turn_encoder(50.0, 180.0).await;
    assert_eq!(report.outcome, MotionOutcome::Converged);
    let clockwise = rig.control.heading_deg();
    assert!(clockwise > 0.0);

    let mut rig = common::open_field();
    rig.writer.reset_frame(FieldSide::Mirrored, 0.0);
    rig.control.turn_encoder(50.0, 180.0).await;
    assert!(rig.control.heading_deg() < 0.0);
    assert!((rig.control.heading_deg() + clockwise).abs() < 1e-6);
}

#[tokio::test(start_paused = true)]
async fn encoder_turn_with_unset_side_does_nothing() {
    let mut rig = common::open_field();
    rig.writer.reset_frame(FieldSide::Unset, 0.0);
    let report = rig.control.turn_encoder(50.0, 180.0).await;
    assert_eq!(report.outcome, MotionOutcome::Skipped);
    assert_eq!(rig.robot.pose().2, 0.0);
}
