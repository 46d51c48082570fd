//! Shared scenario builders for fusion integration tests

use nalgebra::{Matrix3, Vector3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use obstacle_fusion::{
    FuseOptions, FusedObject, FusionEngine, ObjectType, Observation, SensorFrame, SensorModality,
    TypeDistribution,
};

pub const LIDAR: &str = "lidar_top";
pub const RADAR: &str = "radar_front";
pub const CAMERA: &str = "camera_front";

/// Position-only observation with a small isotropic covariance
pub fn obs_at(id: u32, t: f64, x: f64, y: f64) -> Observation {
    Observation::new(id, t, Vector3::new(x, y, 0.0), Matrix3::identity() * 0.04)
}

/// Single-observation frame already in world coordinates
pub fn frame(sensor: &str, modality: SensorModality, t: f64, observations: Vec<Observation>) -> SensorFrame {
    SensorFrame::in_world(sensor, modality, t, observations)
}

/// Frame without observations, used to advance a sensor's clock
pub fn empty_frame(sensor: &str, modality: SensorModality, t: f64) -> SensorFrame {
    SensorFrame::in_world(sensor, modality, t, Vec::new())
}

/// Feed frames in order and return the output of the last call.
pub fn run(engine: &mut dyn FusionEngine, frames: &[SensorFrame]) -> Vec<FusedObject> {
    let options = FuseOptions::default();
    let mut last = Vec::new();
    for frame in frames {
        last = engine.fuse(&options, frame).unwrap();
    }
    last
}

/// Straight-line movers observed by a lidar at 10 Hz and a radar at 20 Hz.
///
/// Objects are spaced 15 m apart laterally so gates never overlap.
pub struct Scenario {
    pub frames: Vec<SensorFrame>,
    pub num_objects: usize,
}

pub fn generate_scenario(seed: u64, num_objects: usize, duration: f64) -> Scenario {
    let mut rng = StdRng::seed_from_u64(seed);

    let objects: Vec<(Vector3<f64>, Vector3<f64>)> = (0..num_objects)
        .map(|i| {
            let start = Vector3::new(rng.gen_range(5.0..30.0), 15.0 * i as f64, 0.0);
            let velocity = Vector3::new(rng.gen_range(-3.0..3.0), rng.gen_range(-0.2..0.2), 0.0);
            (start, velocity)
        })
        .collect();

    let mut frames = Vec::new();
    let steps = (duration / 0.05).round() as usize;
    for k in 0..=steps {
        let t = k as f64 * 0.05;
        let lidar_tick = k % 2 == 0;
        let (sensor, modality, sigma) = if lidar_tick {
            (LIDAR, SensorModality::Lidar, 0.1)
        } else {
            (RADAR, SensorModality::Radar, 0.3)
        };

        let observations = objects
            .iter()
            .enumerate()
            .map(|(i, (start, velocity))| {
                let truth = start + velocity * t;
                let noise = Vector3::new(rng.gen_range(-sigma..sigma), rng.gen_range(-sigma..sigma), 0.0);
                let mut obs = Observation::new(i as u32 + 1, t, truth + noise, Matrix3::identity() * (sigma * sigma));
                if lidar_tick {
                    obs = obs.with_type(TypeDistribution::with_probability(ObjectType::Vehicle, 0.8));
                } else {
                    obs = obs.with_velocity(*velocity, Matrix3::identity() * 0.25);
                }
                obs
            })
            .collect();
        frames.push(frame(sensor, modality, t, observations));
    }

    Scenario { frames, num_objects }
}
