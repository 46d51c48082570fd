//! Strategy behavior, configuration and registry

use std::thread;

use nalgebra::{Matrix3, Vector3};

use obstacle_fusion::{
    global_registry, register_builtin_strategies, ConfigError, FuseOptions, FusionEngine, FusionError,
    FusionInitOptions, ProbabilisticFusion, RegistryError, RuleBasedFusion, SensorModality,
    SharedFusionEngine, StrategyRegistry,
};

use super::helpers::{frame, obs_at, run, generate_scenario, LIDAR, RADAR};

#[test]
fn test_fuse_before_init_fails() {
    let mut engine = RuleBasedFusion::new();
    let result = engine.fuse(
        &FuseOptions::default(),
        &frame(LIDAR, SensorModality::Lidar, 0.0, vec![obs_at(1, 0.0, 1.0, 0.0)]),
    );
    assert_eq!(result, Err(FusionError::NotInitialized));
    assert!(engine.track_store().is_empty());
}

#[test]
fn test_failed_init_leaves_engine_uninitialized() {
    let mut engine = ProbabilisticFusion::new();
    engine.init(FusionInitOptions::new([LIDAR])).unwrap();

    let empty: [&str; 0] = [];
    assert_eq!(
        engine.init(FusionInitOptions::new(empty)),
        Err(ConfigError::EmptyMainSensors)
    );
    assert!(!engine.is_initialized());

    let mut options = FusionInitOptions::new([LIDAR]);
    options.params.association.gate_cost = -1.0;
    assert!(matches!(
        engine.init(options),
        Err(ConfigError::InvalidParameter { .. })
    ));
}

#[test]
fn test_init_options_from_json() {
    let json = r#"{
        "main_sensors": ["lidar_top", "lidar_rear"],
        "params": {
            "lifecycle": { "max_miss_duration": 1.0 },
            "association": { "gate_cost": 6.0 }
        }
    }"#;
    let options: FusionInitOptions = serde_json::from_str(json).unwrap();

    assert_eq!(options.main_sensors.len(), 2);
    assert_eq!(options.params.lifecycle.max_miss_duration, 1.0);
    assert_eq!(options.params.association.gate_cost, 6.0);
    assert_eq!(options.params.lifecycle.corroboration_window, 0.5);
    assert!(options.validate().is_ok());

    let mut engine = ProbabilisticFusion::new();
    engine.init(options).unwrap();
    assert!(engine.is_initialized());
}

#[test]
fn test_rule_based_follows_main_sensor() {
    let mut engine = RuleBasedFusion::new();
    engine.init(FusionInitOptions::new([LIDAR])).unwrap();
    let options = FuseOptions::default();

    engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 0.0, vec![obs_at(1, 0.0, 10.0, 0.0)]))
        .unwrap();

    let radar_obs = obs_at(3, 0.05, 10.5, 0.2).with_velocity(Vector3::new(3.0, 0.0, 0.0), Matrix3::identity() * 0.1);
    let out = engine
        .fuse(&options, &frame(RADAR, SensorModality::Radar, 0.05, vec![radar_obs]))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].position, Vector3::new(10.0, 0.0, 0.0));
    assert_eq!(out[0].contributing_sensors.len(), 2);

    let out = engine
        .fuse(&options, &frame(LIDAR, SensorModality::Lidar, 0.1, vec![obs_at(1, 0.1, 10.2, 0.0)]))
        .unwrap();
    assert_eq!(out.len(), 1);
    assert!((out[0].position - Vector3::new(10.2, 0.0, 0.0)).norm() < 1e-9);
}

#[test]
fn test_rule_based_radar_matches_keep_track_alive() {
    let mut engine = RuleBasedFusion::new();
    engine.init(FusionInitOptions::new([LIDAR])).unwrap();

    let mut frames = vec![frame(LIDAR, SensorModality::Lidar, 0.0, vec![obs_at(1, 0.0, 10.0, 0.0)])];
    for k in 1..=30 {
        let t = k as f64 * 0.1;
        frames.push(frame(RADAR, SensorModality::Radar, t, vec![obs_at(3, t, 10.0, 0.0)]));
    }

    // Well past max_miss_duration since the only lidar observation
    let out = run(&mut engine, &frames);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].position, Vector3::new(10.0, 0.0, 0.0));

    let track = engine.track_store().iter().next().unwrap();
    assert_eq!(engine.track_store().len(), 1);
    assert_eq!(track.last_update_time, 0.0);
    assert!(track.last_matched_time > 2.9);
}

#[test]
fn test_strategies_agree_on_track_count() {
    let scenario = generate_scenario(11, 3, 2.0);

    let mut probabilistic = ProbabilisticFusion::new();
    probabilistic.init(FusionInitOptions::new([LIDAR])).unwrap();
    let mut rule_based = RuleBasedFusion::new();
    rule_based.init(FusionInitOptions::new([LIDAR])).unwrap();

    assert_eq!(run(&mut probabilistic, &scenario.frames).len(), 3);
    assert_eq!(run(&mut rule_based, &scenario.frames).len(), 3);
}

#[test]
fn test_registry_creates_engines_by_name() {
    {
        let mut registry = global_registry().write();
        if !registry.contains("ProbabilisticFusion") {
            register_builtin_strategies(&mut registry).unwrap();
        }
    }

    let registry = global_registry().read();
    let mut engine = registry.create("RuleBasedFusion").unwrap();
    assert_eq!(engine.name(), "RuleBasedFusion");
    engine.init(FusionInitOptions::new([LIDAR])).unwrap();

    assert!(matches!(
        registry.create("DoesNotExist"),
        Err(RegistryError::UnknownStrategy(_))
    ));
}

#[test]
fn test_shared_engine_across_threads() {
    let mut registry = StrategyRegistry::new();
    register_builtin_strategies(&mut registry).unwrap();

    let shared = SharedFusionEngine::new(registry.create("ProbabilisticFusion").unwrap());
    shared.init(FusionInitOptions::new([LIDAR, RADAR])).unwrap();

    let handles: Vec<_> = [(LIDAR, SensorModality::Lidar, 0.0), (RADAR, SensorModality::Radar, 40.0)]
        .into_iter()
        .map(|(sensor, modality, x)| {
            let shared = shared.clone();
            thread::spawn(move || {
                for k in 0..10 {
                    let t = k as f64 * 0.1;
                    let f = frame(sensor, modality, t, vec![obs_at(1, t, x, 0.0)]);
                    shared.fuse(&FuseOptions::default(), &f).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(shared.num_tracks(), 2);
}
