//! Fused object snapshots returned from `fuse`.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use super::track::{MotionState, Track, TrackId, TrajectoryPoint, POSITION_OFFSET, VELOCITY_OFFSET};
use super::types::{Gaussian3, ObjectType, Polygon, SensorId, Shape, TypeDistribution};
use crate::common::linalg::block3;
use crate::components::prediction::MotionModel;

/// Deep copy of one confirmed track at emission time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedObject {
    /// Track identifier
    pub id: TrackId,
    /// Time the kinematic fields refer to
    pub timestamp: f64,
    /// Fused position
    pub position: Vector3<f64>,
    /// Position covariance
    pub position_covariance: Matrix3<f64>,
    /// Fused velocity
    pub velocity: Vector3<f64>,
    /// Velocity covariance
    pub velocity_covariance: Matrix3<f64>,
    /// Fused acceleration
    pub acceleration: Gaussian3,
    /// Fused box geometry
    pub shape: Option<Shape>,
    /// Fused class distribution
    pub type_probs: TypeDistribution,
    /// Most probable class
    pub object_type: ObjectType,
    /// Motion classification
    pub motion_state: MotionState,
    /// Velocity covariance has settled
    pub velocity_converged: bool,
    /// Sensors that have reported this object, in id order
    pub contributing_sensors: Vec<SensorId>,
    /// Footprint polygon
    pub polygon: Polygon,
    /// Number of measurement updates
    pub num_updates: u32,
    /// Seconds since birth
    pub age: f64,
    /// Recent fused states, oldest first, when requested
    pub trajectory: Option<Vec<TrajectoryPoint>>,
}

impl FusedObject {
    /// Snapshot a track as it is.
    pub fn from_track(track: &Track, include_trajectory: bool) -> Self {
        Self {
            id: track.id,
            timestamp: track.last_update_time,
            position: track.position(),
            position_covariance: track.position_covariance(),
            velocity: track.velocity(),
            velocity_covariance: track.velocity_covariance(),
            acceleration: track.acceleration,
            shape: track.shape,
            type_probs: track.type_probs,
            object_type: track.type_probs.argmax(),
            motion_state: track.motion_state,
            velocity_converged: track.velocity_converged,
            contributing_sensors: track.contributions.keys().cloned().collect(),
            polygon: track.polygon.clone(),
            num_updates: track.num_updates,
            age: track.age(track.last_update_time),
            trajectory: include_trajectory.then(|| track.trajectory.to_vec()),
        }
    }

    /// Snapshot a track predicted forward to `timestamp`.
    ///
    /// The track itself is not modified. Timestamps at or before the track's
    /// own time leave the kinematics as they are.
    pub fn extrapolated(track: &Track, motion: &MotionModel, timestamp: f64, include_trajectory: bool) -> Self {
        let mut object = Self::from_track(track, include_trajectory);
        let dt = timestamp - track.last_update_time;
        if dt > 0.0 {
            let (mean, covariance) = motion.predict(&track.mean, &track.covariance, dt);
            object.position = Vector3::new(mean[0], mean[1], mean[2]);
            object.position_covariance = block3(&covariance, POSITION_OFFSET);
            object.velocity = Vector3::new(mean[3], mean[4], mean[5]);
            object.velocity_covariance = block3(&covariance, VELOCITY_OFFSET);
            object.timestamp = timestamp;
            object.age = track.age(timestamp);
        }
        object
    }
}
