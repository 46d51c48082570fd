//! Sensor input types
//!
//! Observations arrive bundled in a [`SensorFrame`] expressed in the sensor's
//! local frame. They are produced upstream by per-sensor trackers and are
//! read-only to the engine.

use std::fmt;

use nalgebra::{Isometry3, Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Identifier of one physical sensor (e.g. `"velodyne64"`, `"radar_front"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorId(pub String);

impl SensorId {
    /// Create a sensor id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SensorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Physical sensing modality of a sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorModality {
    Lidar,
    Radar,
    Camera,
    Ultrasonic,
}

impl SensorModality {
    /// All modalities in declaration order
    pub const ALL: [SensorModality; 4] = [
        SensorModality::Lidar,
        SensorModality::Radar,
        SensorModality::Camera,
        SensorModality::Ultrasonic,
    ];

    /// Dense index in `0..4`
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Obstacle class
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    Unknown,
    UnknownMovable,
    UnknownUnmovable,
    Pedestrian,
    Bicycle,
    Vehicle,
}

impl ObjectType {
    /// Number of classes
    pub const COUNT: usize = 6;

    /// All classes in index order
    pub const ALL: [ObjectType; Self::COUNT] = [
        ObjectType::Unknown,
        ObjectType::UnknownMovable,
        ObjectType::UnknownUnmovable,
        ObjectType::Pedestrian,
        ObjectType::Bicycle,
        ObjectType::Vehicle,
    ];

    /// Dense index in `0..COUNT`
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// True for the three "unknown" classes
    #[inline]
    pub fn is_unknown(self) -> bool {
        matches!(
            self,
            ObjectType::Unknown | ObjectType::UnknownMovable | ObjectType::UnknownUnmovable
        )
    }
}

/// Probability distribution over [`ObjectType`].
///
/// Always normalized: constructors and fusion renormalize, and an all-zero
/// input collapses to certainty on [`ObjectType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeDistribution {
    probs: [f64; ObjectType::COUNT],
}

impl TypeDistribution {
    /// Build from raw (possibly unnormalized) class weights.
    ///
    /// Negative or non-finite weights count as zero.
    pub fn from_weights(weights: [f64; ObjectType::COUNT]) -> Self {
        let mut probs = weights.map(|w| if w.is_finite() && w > 0.0 { w } else { 0.0 });
        let sum: f64 = probs.iter().sum();
        if sum > 0.0 {
            probs.iter_mut().for_each(|p| *p /= sum);
        } else {
            probs = [0.0; ObjectType::COUNT];
            probs[ObjectType::Unknown.index()] = 1.0;
        }
        Self { probs }
    }

    /// Distribution with `p` on `class` and the remainder on `Unknown`.
    pub fn with_probability(class: ObjectType, p: f64) -> Self {
        let p = if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 };
        let mut weights = [0.0; ObjectType::COUNT];
        weights[class.index()] += p;
        weights[ObjectType::Unknown.index()] += 1.0 - p;
        Self::from_weights(weights)
    }

    /// Certainty on `Unknown`
    pub fn unknown() -> Self {
        Self::with_probability(ObjectType::Unknown, 1.0)
    }

    /// Probability of one class
    #[inline]
    pub fn probability(&self, class: ObjectType) -> f64 {
        self.probs[class.index()]
    }

    /// Raw probability vector in [`ObjectType::ALL`] order
    #[inline]
    pub fn as_array(&self) -> &[f64; ObjectType::COUNT] {
        &self.probs
    }

    /// Most probable class; lowest index wins ties.
    pub fn argmax(&self) -> ObjectType {
        let mut best = 0;
        for i in 1..ObjectType::COUNT {
            if self.probs[i] > self.probs[best] {
                best = i;
            }
        }
        ObjectType::ALL[best]
    }
}

impl Default for TypeDistribution {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Mean and covariance of a 3-vector quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gaussian3 {
    /// Mean
    pub mean: Vector3<f64>,
    /// Covariance
    pub covariance: Matrix3<f64>,
}

impl Gaussian3 {
    /// Create a Gaussian from mean and covariance
    pub fn new(mean: Vector3<f64>, covariance: Matrix3<f64>) -> Self {
        Self { mean, covariance }
    }

    /// Isotropic Gaussian with the given per-axis variance
    pub fn isotropic(mean: Vector3<f64>, variance: f64) -> Self {
        Self::new(mean, Matrix3::from_diagonal_element(variance))
    }

    /// True when mean and covariance are all finite
    pub fn is_finite(&self) -> bool {
        self.mean.iter().all(|v| v.is_finite()) && self.covariance.iter().all(|v| v.is_finite())
    }
}

/// Box geometry: size plus heading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// (length, width, height) in meters
    pub size: Vector3<f64>,
    /// Per-axis size variance
    pub size_variance: Vector3<f64>,
    /// Heading (yaw about +z) in radians
    pub theta: f64,
    /// Heading variance
    pub theta_variance: f64,
}

impl Shape {
    /// Create a shape
    pub fn new(size: Vector3<f64>, size_variance: Vector3<f64>, theta: f64, theta_variance: f64) -> Self {
        Self {
            size,
            size_variance,
            theta,
            theta_variance,
        }
    }

    /// True when all fields are finite
    pub fn is_finite(&self) -> bool {
        self.size.iter().all(|v| v.is_finite())
            && self.size_variance.iter().all(|v| v.is_finite())
            && self.theta.is_finite()
            && self.theta_variance.is_finite()
    }
}

/// Modality-specific extras carried along with an observation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SensorSupplement {
    #[default]
    None,
    Lidar {
        /// Number of points in the segmented cluster
        num_points: u32,
    },
    Radar {
        /// Range to target (m)
        range: f64,
        /// Azimuth in sensor frame (rad)
        azimuth: f64,
        /// Radial speed (m/s, positive = receding)
        radial_speed: f64,
    },
    Camera {
        /// Image box `[x_min, y_min, x_max, y_max]` in pixels
        image_box: [f64; 4],
        /// Whether depth was inferred from monocular cues only
        depth_from_image: bool,
    },
    Ultrasonic {
        /// Echo distance (m)
        echo_distance: f64,
    },
}

/// Footprint polygon; most obstacles need at most eight vertices
pub type Polygon = SmallVec<[Vector3<f64>; 8]>;

/// One sensor's report of one object at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Id assigned by the per-sensor tracker
    pub id: u32,
    /// Measurement time (seconds)
    pub timestamp: f64,
    /// Center position
    pub position: Gaussian3,
    /// Velocity, if the sensor measures it
    pub velocity: Option<Gaussian3>,
    /// Acceleration, if the sensor estimates it
    pub acceleration: Option<Gaussian3>,
    /// Box geometry, if the sensor measures it
    pub shape: Option<Shape>,
    /// Class distribution
    pub type_probs: TypeDistribution,
    /// Detection confidence in `[0, 1]`
    pub confidence: f64,
    /// Footprint polygon
    pub polygon: Polygon,
    /// Modality-specific extras
    pub supplement: SensorSupplement,
}

impl Observation {
    /// Create a position-only observation with full confidence
    pub fn new(id: u32, timestamp: f64, position: Vector3<f64>, position_covariance: Matrix3<f64>) -> Self {
        Self {
            id,
            timestamp,
            position: Gaussian3::new(position, position_covariance),
            velocity: None,
            acceleration: None,
            shape: None,
            type_probs: TypeDistribution::unknown(),
            confidence: 1.0,
            polygon: Polygon::new(),
            supplement: SensorSupplement::None,
        }
    }

    /// Set measured velocity
    pub fn with_velocity(mut self, velocity: Vector3<f64>, covariance: Matrix3<f64>) -> Self {
        self.velocity = Some(Gaussian3::new(velocity, covariance));
        self
    }

    /// Set estimated acceleration
    pub fn with_acceleration(mut self, acceleration: Vector3<f64>, covariance: Matrix3<f64>) -> Self {
        self.acceleration = Some(Gaussian3::new(acceleration, covariance));
        self
    }

    /// Set box geometry
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = Some(shape);
        self
    }

    /// Set class distribution
    pub fn with_type(mut self, type_probs: TypeDistribution) -> Self {
        self.type_probs = type_probs;
        self
    }

    /// Set detection confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set footprint polygon
    pub fn with_polygon(mut self, polygon: impl IntoIterator<Item = Vector3<f64>>) -> Self {
        self.polygon = polygon.into_iter().collect();
        self
    }

    /// Set modality-specific extras
    pub fn with_supplement(mut self, supplement: SensorSupplement) -> Self {
        self.supplement = supplement;
        self
    }

    /// First non-finite field, if any
    pub fn first_non_finite_field(&self) -> Option<&'static str> {
        if !self.timestamp.is_finite() {
            return Some("timestamp");
        }
        if !self.position.is_finite() {
            return Some("position");
        }
        if self.velocity.map_or(false, |v| !v.is_finite()) {
            return Some("velocity");
        }
        if self.acceleration.map_or(false, |a| !a.is_finite()) {
            return Some("acceleration");
        }
        if self.shape.map_or(false, |s| !s.is_finite()) {
            return Some("shape");
        }
        if !self.confidence.is_finite() {
            return Some("confidence");
        }
        if self.polygon.iter().any(|p| p.iter().any(|v| !v.is_finite())) {
            return Some("polygon");
        }
        None
    }
}

/// A bundle of observations from one sensor at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Producing sensor
    pub sensor_id: SensorId,
    /// Producing sensor's modality
    pub modality: SensorModality,
    /// Frame time (seconds)
    pub timestamp: f64,
    /// Sensor-to-world rigid transform
    pub sensor_to_world: Isometry3<f64>,
    /// Observations in the sensor frame
    pub observations: Vec<Observation>,
}

impl SensorFrame {
    /// Create a frame
    pub fn new(
        sensor_id: impl Into<SensorId>,
        modality: SensorModality,
        timestamp: f64,
        sensor_to_world: Isometry3<f64>,
        observations: Vec<Observation>,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            modality,
            timestamp,
            sensor_to_world,
            observations,
        }
    }

    /// Frame whose sensor frame coincides with the world frame
    pub fn in_world(
        sensor_id: impl Into<SensorId>,
        modality: SensorModality,
        timestamp: f64,
        observations: Vec<Observation>,
    ) -> Self {
        Self::new(sensor_id, modality, timestamp, Isometry3::identity(), observations)
    }

    /// Number of observations
    #[inline]
    pub fn num_observations(&self) -> usize {
        self.observations.len()
    }
}

impl From<String> for SensorId {
    fn from(s: String) -> Self {
        Self(s)
    }
}
