//! Frame ingestion: validation and sensor-to-world normalization.
//!
//! A frame is accepted only if its transform and timestamp are finite and it
//! is strictly newer than the last accepted frame from the same sensor. Out
//! of order frames are dropped without touching any state. Inside an
//! accepted frame, observations with non-finite values are skipped one by
//! one.

use std::collections::BTreeMap;

use nalgebra::{Isometry3, Point3, Vector3};

use super::errors::InputError;
use super::types::{Gaussian3, Observation, SensorFrame, SensorId, SensorModality};
use crate::common::linalg::{rotate_covariance, wrap_angle, yaw_of};

/// Observations of one accepted frame, in world coordinates
#[derive(Debug, Clone)]
pub struct IngestedFrame {
    /// Producing sensor
    pub sensor_id: SensorId,
    /// Producing sensor's modality
    pub modality: SensorModality,
    /// Frame time
    pub timestamp: f64,
    /// World-frame observations, in frame order
    pub observations: Vec<Observation>,
    /// Per-observation problems that caused a skip
    pub skipped: Vec<InputError>,
}

/// Normalizes sensor frames into the fusion world frame.
#[derive(Debug, Clone, Default)]
pub struct FrameIngestor {
    last_timestamps: BTreeMap<SensorId, f64>,
}

impl FrameIngestor {
    /// Create an ingestor with no sensor history
    pub fn new() -> Self {
        Self::default()
    }

    /// Last accepted timestamp of a sensor
    pub fn last_timestamp(&self, sensor: &SensorId) -> Option<f64> {
        self.last_timestamps.get(sensor).copied()
    }

    /// Forget every sensor's history
    pub fn reset(&mut self) {
        self.last_timestamps.clear();
    }

    /// Check whether a frame would be accepted, without recording anything.
    pub fn check(&self, frame: &SensorFrame) -> Result<(), InputError> {
        if !is_finite_pose(&frame.sensor_to_world) {
            return Err(InputError::NonFiniteTransform);
        }
        if !frame.timestamp.is_finite() {
            return Err(InputError::NonFiniteTimestamp);
        }
        if let Some(last) = self.last_timestamp(&frame.sensor_id) {
            if frame.timestamp <= last {
                return Err(InputError::TimestampRegression {
                    sensor: frame.sensor_id.0.clone(),
                    last,
                    received: frame.timestamp,
                });
            }
        }
        Ok(())
    }

    /// Validate a frame and transform its observations into the world frame.
    ///
    /// On success the sensor's last timestamp advances to the frame's.
    pub fn ingest(&mut self, frame: &SensorFrame) -> Result<IngestedFrame, InputError> {
        self.check(frame)?;

        let mut observations = Vec::with_capacity(frame.observations.len());
        let mut skipped = Vec::new();
        for obs in &frame.observations {
            if let Some(field) = obs.first_non_finite_field() {
                let err = InputError::NonFiniteObservation {
                    observation_id: obs.id,
                    field,
                };
                log::warn!("[{}] skipping observation: {}", frame.sensor_id, err);
                skipped.push(err);
                continue;
            }
            let world = transform_observation(obs, &frame.sensor_to_world);
            if let Some(field) = world.first_non_finite_field() {
                let err = InputError::NonFiniteObservation {
                    observation_id: obs.id,
                    field,
                };
                log::warn!("[{}] skipping observation after transform: {}", frame.sensor_id, err);
                skipped.push(err);
                continue;
            }
            observations.push(world);
        }

        self.last_timestamps
            .insert(frame.sensor_id.clone(), frame.timestamp);

        log::trace!(
            "[{}] ingested {} of {} observations at {:.6}",
            frame.sensor_id,
            observations.len(),
            frame.num_observations(),
            frame.timestamp
        );

        Ok(IngestedFrame {
            sensor_id: frame.sensor_id.clone(),
            modality: frame.modality,
            timestamp: frame.timestamp,
            observations,
            skipped,
        })
    }
}

/// True when translation and rotation are all finite and the rotation is a
/// proper unit quaternion.
pub fn is_finite_pose(pose: &Isometry3<f64>) -> bool {
    let translation_ok = pose.translation.vector.iter().all(|v| v.is_finite());
    let q = pose.rotation.quaternion();
    let rotation_ok = q.coords.iter().all(|v| v.is_finite()) && (q.norm() - 1.0).abs() < 1e-6;
    translation_ok && rotation_ok
}

/// Express an observation in the world frame.
///
/// Position and polygon are transformed as points; velocity and acceleration
/// are rotated; every covariance becomes `R Σ Rᵀ`; the heading is rotated by
/// projecting the heading vector through the rotation.
pub fn transform_observation(obs: &Observation, pose: &Isometry3<f64>) -> Observation {
    let rotation = pose.rotation.to_rotation_matrix();
    let rotate = |g: &Gaussian3| Gaussian3::new(rotation * g.mean, rotate_covariance(&rotation, &g.covariance));

    let mut world = obs.clone();
    world.position = Gaussian3::new(
        (pose * Point3::from(obs.position.mean)).coords,
        rotate_covariance(&rotation, &obs.position.covariance),
    );
    world.velocity = obs.velocity.as_ref().map(rotate);
    world.acceleration = obs.acceleration.as_ref().map(rotate);
    if let Some(shape) = world.shape.as_mut() {
        let heading = rotation * Vector3::new(shape.theta.cos(), shape.theta.sin(), 0.0);
        shape.theta = if heading.xy().norm() > 1e-9 {
            wrap_angle(heading.y.atan2(heading.x))
        } else {
            // Heading rotated onto the vertical; fall back to the pose yaw
            wrap_angle(shape.theta + yaw_of(&pose.rotation))
        };
    }
    world.polygon = obs
        .polygon
        .iter()
        .map(|p| (pose * Point3::from(*p)).coords)
        .collect();
    world
}
