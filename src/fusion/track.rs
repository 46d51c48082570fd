//! Track and track store types
//!
//! Tracks live by value in a [`TrackStore`] arena keyed by [`TrackId`].
//! Everything that refers to a track (association results, lifecycle
//! decisions, emitted snapshots) does so through its id.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use super::types::{Gaussian3, Polygon, SensorId, SensorModality, Shape, TypeDistribution};
use crate::common::linalg::block3;

/// Dimension of the kinematic state `[px, py, pz, vx, vy, vz]`
pub const STATE_DIM: usize = 6;
/// Offset of the position block in the kinematic state
pub const POSITION_OFFSET: usize = 0;
/// Offset of the velocity block in the kinematic state
pub const VELOCITY_OFFSET: usize = 3;

/// Stable track identifier. Never reused within one engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Confirmation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    /// Awaiting corroboration from a second sensor
    Tentative,
    /// Eligible for output
    Confirmed,
}

/// Coarse motion classification with hysteresis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    #[default]
    Unknown,
    Stationary,
    Moving,
}

/// One recorded fused state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    /// Time of the state
    pub timestamp: f64,
    /// Fused position
    pub position: Vector3<f64>,
    /// Fused velocity
    pub velocity: Vector3<f64>,
}

/// Bounded trajectory history.
///
/// A ring buffer: pushing onto a full history evicts the oldest entry, the
/// buffer never grows past its capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryHistory {
    points: VecDeque<TrajectoryPoint>,
    capacity: usize,
}

impl TrajectoryHistory {
    /// Create an empty history with a fixed capacity (at least 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a point, evicting the oldest one when full
    pub fn push(&mut self, point: TrajectoryPoint) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    /// Number of stored points
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when nothing has been recorded
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fixed capacity
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest-first iteration
    pub fn iter(&self) -> impl Iterator<Item = &TrajectoryPoint> {
        self.points.iter()
    }

    /// Most recent point
    pub fn latest(&self) -> Option<&TrajectoryPoint> {
        self.points.back()
    }

    /// Copy out oldest-first
    pub fn to_vec(&self) -> Vec<TrajectoryPoint> {
        self.points.iter().copied().collect()
    }
}

/// Latest report a sensor made about a track
#[derive(Debug, Clone, PartialEq)]
pub struct SensorContribution {
    /// Modality of the sensor
    pub modality: SensorModality,
    /// Observation id the sensor's own tracker used
    pub local_id: u32,
    /// Timestamp of the latest matched observation
    pub last_seen: f64,
    /// Class distribution reported
    pub type_probs: TypeDistribution,
    /// Detection confidence reported
    pub confidence: f64,
}

/// Persistent fused entity for one physical obstacle.
#[derive(Debug, Clone)]
pub struct Track {
    /// Stable identifier
    pub id: TrackId,
    /// Confirmation state
    pub status: TrackStatus,
    /// Kinematic mean `[px, py, pz, vx, vy, vz]`
    pub mean: DVector<f64>,
    /// Kinematic covariance (6x6)
    pub covariance: DMatrix<f64>,
    /// Fused acceleration
    pub acceleration: Gaussian3,
    /// Fused box geometry, once any sensor reported one
    pub shape: Option<Shape>,
    /// Fused class distribution
    pub type_probs: TypeDistribution,
    /// Motion classification
    pub motion_state: MotionState,
    /// Velocity covariance has settled
    pub velocity_converged: bool,
    /// Consecutive updates with a small velocity covariance
    pub converged_streak: u32,
    /// Recent fused states
    pub trajectory: TrajectoryHistory,
    /// Per-sensor latest contribution
    pub contributions: BTreeMap<SensorId, SensorContribution>,
    /// Sensor whose observation spawned the track
    pub origin_sensor: SensorId,
    /// Time of birth
    pub birth_time: f64,
    /// Time the kinematic state refers to
    pub last_update_time: f64,
    /// Latest observation time of any match, late ones included
    pub last_matched_time: f64,
    /// Number of measurement updates applied (the birth observation is not one)
    pub num_updates: u32,
    /// Footprint from the most recent observation that carried one
    pub polygon: Polygon,
}

impl Track {
    /// Create a track from an initial kinematic state
    pub fn new(
        id: TrackId,
        status: TrackStatus,
        mean: DVector<f64>,
        covariance: DMatrix<f64>,
        timestamp: f64,
        origin_sensor: SensorId,
        trajectory_capacity: usize,
    ) -> Self {
        Self {
            id,
            status,
            mean,
            covariance,
            acceleration: Gaussian3::new(Vector3::zeros(), Matrix3::identity()),
            shape: None,
            type_probs: TypeDistribution::unknown(),
            motion_state: MotionState::Unknown,
            velocity_converged: false,
            converged_streak: 0,
            trajectory: TrajectoryHistory::new(trajectory_capacity),
            contributions: BTreeMap::new(),
            origin_sensor,
            birth_time: timestamp,
            last_update_time: timestamp,
            last_matched_time: timestamp,
            num_updates: 0,
            polygon: Polygon::new(),
        }
    }

    /// Fused position
    #[inline]
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.mean[0], self.mean[1], self.mean[2])
    }

    /// Fused velocity
    #[inline]
    pub fn velocity(&self) -> Vector3<f64> {
        Vector3::new(self.mean[3], self.mean[4], self.mean[5])
    }

    /// Position covariance block
    pub fn position_covariance(&self) -> Matrix3<f64> {
        block3(&self.covariance, POSITION_OFFSET)
    }

    /// Velocity covariance block
    pub fn velocity_covariance(&self) -> Matrix3<f64> {
        block3(&self.covariance, VELOCITY_OFFSET)
    }

    /// Horizontal speed
    #[inline]
    pub fn speed(&self) -> f64 {
        self.velocity().xy().norm()
    }

    /// True for confirmed tracks
    #[inline]
    pub fn is_confirmed(&self) -> bool {
        self.status == TrackStatus::Confirmed
    }

    /// Seconds since an observation last matched the track, relative to `now`
    #[inline]
    pub fn time_since_match(&self, now: f64) -> f64 {
        now - self.last_matched_time
    }

    /// Seconds since birth, relative to `now`
    #[inline]
    pub fn age(&self, now: f64) -> f64 {
        now - self.birth_time
    }

    /// True when a sensor other than the origin has contributed
    pub fn is_corroborated(&self) -> bool {
        self.contributions.keys().any(|s| *s != self.origin_sensor)
    }

    /// Record the current fused state in the trajectory
    pub fn record_state(&mut self) {
        let point = TrajectoryPoint {
            timestamp: self.last_update_time,
            position: self.position(),
            velocity: self.velocity(),
        };
        self.trajectory.push(point);
    }
}

/// Arena of tracks keyed by id.
///
/// Iteration is always in ascending id order, which is what makes cost
/// matrices and emitted snapshots deterministic.
#[derive(Debug, Clone)]
pub struct TrackStore {
    tracks: BTreeMap<TrackId, Track>,
    next_id: u64,
}

impl TrackStore {
    /// Create an empty store; the first id handed out is 1
    pub fn new() -> Self {
        Self {
            tracks: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Reserve a fresh id
    pub fn allocate_id(&mut self) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Insert a track under its own id
    pub fn insert(&mut self, track: Track) {
        self.tracks.insert(track.id, track);
    }

    /// Look up a track
    #[inline]
    pub fn get(&self, id: TrackId) -> Option<&Track> {
        self.tracks.get(&id)
    }

    /// Look up a track mutably
    #[inline]
    pub fn get_mut(&mut self, id: TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(&id)
    }

    /// Remove a track
    pub fn remove(&mut self, id: TrackId) -> Option<Track> {
        self.tracks.remove(&id)
    }

    /// Number of tracks (tentative and confirmed)
    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    /// True when no tracks exist
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracks in id order
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Confirmed tracks in id order
    pub fn confirmed(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values().filter(|t| t.is_confirmed())
    }

    /// Drop every track; the id counter keeps counting
    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new()
    }
}
