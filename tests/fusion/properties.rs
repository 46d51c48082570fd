//! Property tests over random frame sequences

use std::collections::BTreeSet;

use nalgebra::{DMatrix, Matrix3, Vector3};
use proptest::prelude::*;

use obstacle_fusion::common::linalg::is_positive_semi_definite;
use obstacle_fusion::{
    FuseOptions, FusionEngine, FusionInitOptions, Observation, ProbabilisticFusion, RuleBasedFusion,
    SensorFrame, SensorModality,
};

use super::helpers::{CAMERA, LIDAR, RADAR};

const SENSORS: [(&str, SensorModality); 3] = [
    (LIDAR, SensorModality::Lidar),
    (RADAR, SensorModality::Radar),
    (CAMERA, SensorModality::Camera),
];

fn frames_strategy() -> impl Strategy<Value = Vec<(usize, Vec<(f64, f64, f64)>)>> {
    prop::collection::vec(
        (
            0usize..3,
            prop::collection::vec((-30.0f64..30.0, -30.0f64..30.0, 0.01f64..2.0), 0..6),
        ),
        1..25,
    )
}

fn build_frames(raw: &[(usize, Vec<(f64, f64, f64)>)]) -> Vec<SensorFrame> {
    raw.iter()
        .enumerate()
        .map(|(k, (sensor, detections))| {
            let (id, modality) = SENSORS[*sensor];
            let t = k as f64 * 0.1;
            let observations = detections
                .iter()
                .enumerate()
                .map(|(i, &(x, y, var))| {
                    Observation::new(i as u32, t, Vector3::new(x, y, 0.0), Matrix3::identity() * var)
                })
                .collect();
            SensorFrame::in_world(id, modality, t, observations)
        })
        .collect()
}

fn is_psd3(m: &Matrix3<f64>) -> bool {
    is_positive_semi_definite(&DMatrix::from_column_slice(3, 3, m.as_slice()), 1e-9)
}

fn check_outputs(engine: &mut dyn FusionEngine, frames: &[SensorFrame]) -> Result<(), TestCaseError> {
    let options = FuseOptions::default();
    for frame in frames {
        let out = engine.fuse(&options, frame).unwrap();

        let ids: BTreeSet<_> = out.iter().map(|o| o.id).collect();
        prop_assert_eq!(ids.len(), out.len());
        prop_assert!(out.windows(2).all(|w| w[0].id < w[1].id));

        for object in &out {
            prop_assert!(is_psd3(&object.position_covariance));
            prop_assert!(is_psd3(&object.velocity_covariance));
            let p: f64 = object.type_probs.as_array().iter().sum();
            prop_assert!((p - 1.0).abs() < 1e-9);
        }

        // Every stored track, emitted or not, keeps a valid covariance
        for track in engine.track_store().iter() {
            prop_assert!(track.covariance.iter().all(|v| v.is_finite()));
            prop_assert!(is_positive_semi_definite(&track.covariance, 1e-9));
        }
    }
    Ok(())
}

proptest! {
    #[test]
    fn prop_probabilistic_outputs_are_consistent(raw in frames_strategy()) {
        let mut engine = ProbabilisticFusion::new();
        engine.init(FusionInitOptions::new([LIDAR])).unwrap();
        check_outputs(&mut engine, &build_frames(&raw))?;
    }

    #[test]
    fn prop_rule_based_outputs_are_consistent(raw in frames_strategy()) {
        let mut engine = RuleBasedFusion::new();
        engine.init(FusionInitOptions::new([LIDAR])).unwrap();
        check_outputs(&mut engine, &build_frames(&raw))?;
    }
}
