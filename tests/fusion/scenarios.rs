//! End-to-end fusion scenarios

use nalgebra::{Matrix3, Vector3};

use obstacle_fusion::reporter::DebugReporter;
use obstacle_fusion::{
    FuseOptions, FusionEngine, FusionInitOptions, InputError, ObjectType, ProbabilisticFusion,
    SensorModality, TrackId, TypeDistribution,
};

use super::helpers::{empty_frame, frame, generate_scenario, obs_at, run, CAMERA, LIDAR, RADAR};

fn engine() -> ProbabilisticFusion {
    let mut engine = ProbabilisticFusion::new();
    engine.init(FusionInitOptions::new([LIDAR])).unwrap();
    engine
}

/// Lidar births, radar refines velocity, silence retires the track.
#[test]
fn test_lidar_birth_radar_update_and_timeout() {
    let mut engine = engine();
    let options = FuseOptions::default();

    let out = engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 0.0, vec![obs_at(1, 0.0, 10.0, 0.0)]))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, TrackId(1));
    assert_eq!(out[0].velocity, Vector3::zeros());

    let radar_obs = obs_at(7, 0.05, 10.1, 0.05).with_velocity(Vector3::new(2.0, 0.0, 0.0), Matrix3::identity() * 0.25);
    let out = engine
        .fuse(&options, &frame(RADAR, SensorModality::Radar, 0.05, vec![radar_obs]))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, TrackId(1));
    assert!(out[0].velocity.x > 1.5, "velocity {:?}", out[0].velocity);
    assert_eq!(out[0].num_updates, 1);
    assert_eq!(out[0].contributing_sensors.len(), 2);

    let out = engine
        .fuse(&options, &empty_frame(LIDAR, SensorModality::Lidar, 5.0))
        .unwrap();
    assert!(out.is_empty());
    assert!(engine.track_store().is_empty());
}

/// A radar without Doppler still pulls velocity through the motion model.
#[test]
fn test_position_only_radar_estimates_velocity() {
    let mut engine = engine();
    let options = FuseOptions::default();

    engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 0.0, vec![obs_at(1, 0.0, 10.0, 0.0)]))
        .unwrap();

    let out = engine
        .fuse(&options, &frame(RADAR, SensorModality::Radar, 0.05, vec![obs_at(7, 0.05, 10.1, 0.05)]))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, TrackId(1));
    assert!(out[0].velocity.x > 0.0, "velocity {:?}", out[0].velocity);
    assert!(out[0].position.x > 10.0 && out[0].position.x < 10.1);
    assert_eq!(out[0].num_updates, 1);

    let out = engine
        .fuse(&options, &empty_frame(LIDAR, SensorModality::Lidar, 5.0))
        .unwrap();
    assert!(out.is_empty());
    assert!(engine.track_store().get(TrackId(1)).is_none());
}

/// Confident agreement between sensors beats the unweighted average.
#[test]
fn test_weighted_classification() {
    let mut engine = engine();
    let options = FuseOptions::default();

    let lidar_obs = obs_at(1, 0.0, 10.0, 0.0)
        .with_type(TypeDistribution::with_probability(ObjectType::Vehicle, 0.6))
        .with_confidence(0.6);
    engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 0.0, vec![lidar_obs]))
        .unwrap();

    let camera_obs = obs_at(3, 0.0, 10.05, 0.0)
        .with_type(TypeDistribution::with_probability(ObjectType::Vehicle, 0.9))
        .with_confidence(0.9);
    let out = engine
        .fuse(&options, &frame(CAMERA, SensorModality::Camera, 0.0, vec![camera_obs]))
        .unwrap();

    assert_eq!(out.len(), 1);
    let p = out[0].type_probs.probability(ObjectType::Vehicle);
    assert!(p > 0.75, "fused vehicle probability {}", p);
    assert!(p <= 1.0);
    assert!((p - 0.78).abs() < 1e-9);
    assert_eq!(out[0].object_type, ObjectType::Vehicle);
}

/// Stale and duplicate frames are no-ops that return the current snapshot.
#[test]
fn test_out_of_order_frame_is_ignored() {
    let mut engine = ProbabilisticFusion::with_reporter(DebugReporter::new());
    engine.init(FusionInitOptions::new([LIDAR])).unwrap();
    let options = FuseOptions::default();

    let before = engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 1.0, vec![obs_at(1, 1.0, 10.0, 0.0)]))
        .unwrap();

    let stale = engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 0.5, vec![obs_at(1, 0.5, 40.0, 0.0)]))
        .unwrap();
    let duplicate = engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 1.0, vec![obs_at(1, 1.0, 40.0, 0.0)]))
        .unwrap();

    assert_eq!(stale, before);
    assert_eq!(duplicate, before);
    assert_eq!(engine.num_tracks(), 1);

    let rejected = engine.reporter().rejected_frames();
    assert_eq!(rejected.len(), 2);
    assert!(matches!(rejected[0].1, InputError::TimestampRegression { .. }));
}

/// An older observation from another sensor is folded in without moving
/// the track's clock backwards.
#[test]
fn test_late_observation_from_other_sensor() {
    let mut engine = engine();
    let options = FuseOptions::default();

    engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 1.0, vec![obs_at(1, 1.0, 10.0, 0.0)]))
        .unwrap();
    let out = engine
        .fuse(&options, &frame(RADAR, SensorModality::Radar, 0.9, vec![obs_at(4, 0.9, 10.1, 0.0)]))
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].timestamp, 1.0);
    assert_eq!(out[0].num_updates, 1);
    assert!(out[0].position_covariance.iter().all(|v| v.is_finite()));
}

/// Non-finite observations are skipped, the rest of the frame is fused.
#[test]
fn test_non_finite_observation_is_skipped() {
    let mut engine = ProbabilisticFusion::with_reporter(DebugReporter::new());
    engine.init(FusionInitOptions::new([LIDAR])).unwrap();

    let bad = obs_at(2, 0.0, f64::NAN, 0.0);
    let out = engine
        .fuse(
            &FuseOptions::default(),
            &frame(LIDAR, SensorModality::Lidar, 0.0, vec![obs_at(1, 0.0, 10.0, 0.0), bad]),
        )
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(engine.reporter().skipped_observations().len(), 1);
}

#[test]
fn test_multi_object_scenario_keeps_one_track_per_object() {
    let scenario = generate_scenario(42, 4, 3.0);
    let mut engine = engine();

    let out = run(&mut engine, &scenario.frames);

    assert_eq!(out.len(), scenario.num_objects);
    assert_eq!(engine.num_tracks(), scenario.num_objects);
    for object in &out {
        assert_eq!(object.object_type, ObjectType::Vehicle);
        assert_eq!(object.contributing_sensors.len(), 2);
        assert!(object.num_updates > 50);
    }
}

#[test]
fn test_fusion_is_deterministic() {
    let scenario = generate_scenario(7, 3, 2.0);

    let mut first = engine();
    let mut second = engine();
    let options = FuseOptions {
        include_trajectory: true,
        ..FuseOptions::default()
    };
    for frame in &scenario.frames {
        let a = first.fuse(&options, frame).unwrap();
        let b = second.fuse(&options, frame).unwrap();
        assert_eq!(a, b);
    }
}

#[test]
fn test_extrapolation_to_frame_time() {
    let mut engine = engine();
    let options = FuseOptions {
        extrapolate_to_frame_time: true,
        ..FuseOptions::default()
    };
    let moving = obs_at(1, 0.0, 10.0, 0.0).with_velocity(Vector3::new(4.0, 0.0, 0.0), Matrix3::identity() * 0.01);
    engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 0.0, vec![moving]))
        .unwrap();

    // Radar frame far from the track: no update, but the snapshot moves
    let out = engine
        .fuse(&options, &frame(RADAR, SensorModality::Radar, 0.5, vec![obs_at(9, 0.5, 60.0, 0.0)]))
        .unwrap();

    assert_eq!(out.len(), 1);
    assert_eq!(out[0].timestamp, 0.5);
    assert!((out[0].position.x - 12.0).abs() < 0.1, "position {:?}", out[0].position);
    let track = engine.track_store().get(out[0].id).unwrap();
    assert_eq!(track.last_update_time, 0.0);
}
