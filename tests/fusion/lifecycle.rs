//! Track birth, corroboration and retirement through the engine

use obstacle_fusion::fusion::RetireReason;
use obstacle_fusion::reporter::DebugReporter;
use obstacle_fusion::{
    FuseOptions, FusionEngine, FusionInitOptions, ProbabilisticFusion, SensorModality, TrackId,
    TrackStatus,
};

use super::helpers::{empty_frame, frame, obs_at, CAMERA, LIDAR, RADAR};

fn engine() -> ProbabilisticFusion<DebugReporter> {
    let mut engine = ProbabilisticFusion::with_reporter(DebugReporter::new());
    engine.init(FusionInitOptions::new([LIDAR])).unwrap();
    engine
}

#[test]
fn test_tentative_track_promoted_by_second_sensor() {
    let mut engine = engine();
    let options = FuseOptions::default();

    let out = engine
        .fuse(&options, &frame(RADAR, SensorModality::Radar, 0.0, vec![obs_at(1, 0.0, 20.0, 3.0)]))
        .unwrap();
    assert!(out.is_empty());
    assert_eq!(engine.num_tracks(), 1);

    let out = engine
        .fuse(&options, &frame(CAMERA, SensorModality::Camera, 0.2, vec![obs_at(5, 0.2, 20.1, 3.0)]))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, TrackId(1));
    assert_eq!(engine.reporter().promotions(), &[TrackId(1)]);
}

#[test]
fn test_same_sensor_cannot_corroborate_itself() {
    let mut engine = engine();
    let options = FuseOptions::default();

    engine
        .fuse(&options, &frame(RADAR, SensorModality::Radar, 0.0, vec![obs_at(1, 0.0, 30.0, 0.0)]))
        .unwrap();
    let out = engine
        .fuse(&options, &frame(RADAR, SensorModality::Radar, 0.3, vec![obs_at(1, 0.3, 30.0, 0.0)]))
        .unwrap();
    assert!(out.is_empty());
    assert_eq!(
        engine.track_store().get(TrackId(1)).map(|t| t.status),
        Some(TrackStatus::Tentative)
    );

    // Past the corroboration window
    engine
        .fuse(&options, &empty_frame(RADAR, SensorModality::Radar, 0.6))
        .unwrap();
    assert!(engine.track_store().is_empty());
    assert_eq!(
        engine.reporter().retirements(),
        &[(TrackId(1), RetireReason::NotCorroborated)]
    );
}

#[test]
fn test_late_corroboration_does_not_promote() {
    let mut engine = ProbabilisticFusion::with_reporter(DebugReporter::new());
    let mut options = FusionInitOptions::new([LIDAR]);
    options.params.lifecycle.corroboration_window = 0.5;
    options.params.lifecycle.max_miss_duration = 5.0;
    engine.init(options).unwrap();
    let fuse = FuseOptions::default();

    engine
        .fuse(&fuse, &frame(RADAR, SensorModality::Radar, 0.0, vec![obs_at(1, 0.0, 30.0, 0.0)]))
        .unwrap();
    let out = engine
        .fuse(&fuse, &frame(CAMERA, SensorModality::Camera, 0.7, vec![obs_at(2, 0.7, 30.0, 0.0)]))
        .unwrap();

    // Matched, but too late to confirm; retired in the same cycle
    assert!(out.is_empty());
    assert!(engine.track_store().is_empty());
    assert!(engine.reporter().promotions().is_empty());
}

#[test]
fn test_confirmed_track_survives_until_max_miss() {
    let mut engine = engine();
    let options = FuseOptions::default();

    engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 0.0, vec![obs_at(1, 0.0, 10.0, 0.0)]))
        .unwrap();

    let out = engine
        .fuse(&options, &empty_frame(LIDAR, SensorModality::Lidar, 2.0))
        .unwrap();
    assert_eq!(out.len(), 1, "exactly max-miss old is still alive");

    let out = engine
        .fuse(&options, &empty_frame(LIDAR, SensorModality::Lidar, 2.1))
        .unwrap();
    assert!(out.is_empty());
    assert_eq!(
        engine.reporter().retirements(),
        &[(TrackId(1), RetireReason::MissedTooLong)]
    );
}

#[test]
fn test_track_ids_are_never_reused() {
    let mut engine = engine();
    let options = FuseOptions::default();

    engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 0.0, vec![obs_at(1, 0.0, 10.0, 0.0)]))
        .unwrap();
    engine
        .fuse(&options, &empty_frame(LIDAR, SensorModality::Lidar, 3.0))
        .unwrap();
    let out = engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 3.1, vec![obs_at(1, 3.1, 10.0, 0.0)]))
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, TrackId(2));
    assert_eq!(engine.reporter().births(), &[TrackId(1), TrackId(2)]);
}

#[test]
fn test_non_main_birth_can_be_disabled() {
    let mut engine = ProbabilisticFusion::new();
    let mut options = FusionInitOptions::new([LIDAR]);
    options.params.lifecycle.allow_non_main_birth = false;
    engine.init(options).unwrap();

    engine
        .fuse(
            &FuseOptions::default(),
            &frame(RADAR, SensorModality::Radar, 0.0, vec![obs_at(1, 0.0, 20.0, 0.0)]),
        )
        .unwrap();
    assert!(engine.track_store().is_empty());
}
