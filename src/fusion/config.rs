//! Configuration types for the fusion engine
//!
//! The configuration is decomposed into focused parameter groups, one per
//! component, all of which carry calibrated defaults and deserialize from
//! partial documents (missing fields take the default).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::errors::ConfigError;
use super::types::{SensorId, SensorModality};

/// A weight per sensor modality
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModalityWeights {
    pub lidar: f64,
    pub radar: f64,
    pub camera: f64,
    pub ultrasonic: f64,
}

impl ModalityWeights {
    /// Same weight for every modality
    pub fn uniform(weight: f64) -> Self {
        Self {
            lidar: weight,
            radar: weight,
            camera: weight,
            ultrasonic: weight,
        }
    }

    /// Weight for one modality
    #[inline]
    pub fn get(&self, modality: SensorModality) -> f64 {
        match modality {
            SensorModality::Lidar => self.lidar,
            SensorModality::Radar => self.radar,
            SensorModality::Camera => self.camera,
            SensorModality::Ultrasonic => self.ultrasonic,
        }
    }

    fn iter(&self) -> impl Iterator<Item = f64> {
        [self.lidar, self.radar, self.camera, self.ultrasonic].into_iter()
    }
}

impl Default for ModalityWeights {
    fn default() -> Self {
        Self {
            lidar: super::DEFAULT_TYPE_TRUST_LIDAR,
            radar: super::DEFAULT_TYPE_TRUST_RADAR,
            camera: super::DEFAULT_TYPE_TRUST_CAMERA,
            ultrasonic: super::DEFAULT_TYPE_TRUST_ULTRASONIC,
        }
    }
}

/// Observation-to-track cost weights and gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationParams {
    /// Cost per meter of horizontal center distance
    pub center_weight: f64,
    /// Cost per meter of size difference (Euclidean over l/w/h)
    pub size_weight: f64,
    /// Cost per radian of heading difference
    pub orientation_weight: f64,
    /// Flat cost when the most probable classes disagree
    pub type_mismatch_penalty: f64,
    /// Cost per second between observation time and the track's last update
    pub time_gap_weight: f64,
    /// Hard gate on horizontal center distance (m)
    pub max_center_distance: f64,
    /// Candidates with a larger total cost are excluded
    pub gate_cost: f64,
    /// Cost multiplier when the sensor's local id matches the one last bound
    /// to the track (1.0 disables the discount)
    pub id_consistency_factor: f64,
}

impl Default for AssociationParams {
    fn default() -> Self {
        Self {
            center_weight: 1.0,
            size_weight: 0.5,
            orientation_weight: 0.5,
            type_mismatch_penalty: 1.0,
            time_gap_weight: 0.5,
            max_center_distance: super::DEFAULT_MAX_CENTER_DISTANCE,
            gate_cost: super::DEFAULT_GATE_COST,
            id_consistency_factor: 0.5,
        }
    }
}

/// State estimation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorParams {
    /// White-noise acceleration standard deviation of the motion model (m/s²)
    pub acceleration_noise: f64,
    /// Velocity variance assigned at birth when the sensor does not measure it
    pub initial_velocity_variance: f64,
    /// Acceleration variance assigned at birth when the sensor does not estimate it
    pub initial_acceleration_variance: f64,
    /// Acceleration variance growth per second
    pub acceleration_drift: f64,
    /// Size variance growth per second
    pub size_drift: f64,
    /// Heading variance growth per second
    pub theta_drift: f64,
    /// Eigenvalue floor applied when repairing covariances
    pub min_variance: f64,
    /// Velocity covariance trace below which an update counts towards convergence
    pub velocity_converged_trace: f64,
    /// Consecutive qualifying updates needed to flag the velocity converged
    pub velocity_converged_updates: u32,
    /// Speed at or above which a track is moving (m/s)
    pub moving_speed: f64,
    /// Speed at or below which a track is stationary (m/s)
    pub stationary_speed: f64,
    /// Per-modality trust in classification output
    pub type_trust: ModalityWeights,
    /// Contributions older than this no longer vote on the class (s)
    pub contribution_window: f64,
}

impl Default for EstimatorParams {
    fn default() -> Self {
        Self {
            acceleration_noise: 2.0,
            initial_velocity_variance: 25.0,
            initial_acceleration_variance: 4.0,
            acceleration_drift: 1.0,
            size_drift: 0.01,
            theta_drift: 0.01,
            min_variance: super::DEFAULT_MIN_VARIANCE,
            velocity_converged_trace: 1.0,
            velocity_converged_updates: 3,
            moving_speed: super::DEFAULT_MOVING_SPEED,
            stationary_speed: super::DEFAULT_STATIONARY_SPEED,
            type_trust: ModalityWeights::default(),
            contribution_window: 1.0,
        }
    }
}

/// Track birth, confirmation and retirement parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleParams {
    /// Confirmed tracks not matched for longer than this are deleted (s)
    pub max_miss_duration: f64,
    /// Tentative tracks must be corroborated by another sensor within this window (s)
    pub corroboration_window: f64,
    /// Whether non-main sensors may spawn tentative tracks
    pub allow_non_main_birth: bool,
    /// Maximum trajectory history length per track
    pub trajectory_capacity: usize,
}

impl Default for LifecycleParams {
    fn default() -> Self {
        Self {
            max_miss_duration: super::DEFAULT_MAX_MISS_DURATION,
            corroboration_window: super::DEFAULT_CORROBORATION_WINDOW,
            allow_non_main_birth: true,
            trajectory_capacity: super::DEFAULT_TRAJECTORY_CAPACITY,
        }
    }
}

/// All strategy parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionParams {
    pub association: AssociationParams,
    pub estimator: EstimatorParams,
    pub lifecycle: LifecycleParams,
}

fn check_non_negative(name: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("must be finite and >= 0, got {}", v)))
    }
}

fn check_positive(name: &'static str, v: f64) -> Result<(), ConfigError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, format!("must be finite and > 0, got {}", v)))
    }
}

impl FusionParams {
    /// Check every parameter range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.association;
        check_non_negative("association.center_weight", a.center_weight)?;
        check_non_negative("association.size_weight", a.size_weight)?;
        check_non_negative("association.orientation_weight", a.orientation_weight)?;
        check_non_negative("association.type_mismatch_penalty", a.type_mismatch_penalty)?;
        check_non_negative("association.time_gap_weight", a.time_gap_weight)?;
        check_positive("association.max_center_distance", a.max_center_distance)?;
        check_positive("association.gate_cost", a.gate_cost)?;
        check_positive("association.id_consistency_factor", a.id_consistency_factor)?;
        if a.id_consistency_factor > 1.0 {
            return Err(ConfigError::invalid(
                "association.id_consistency_factor",
                "must not exceed 1.0",
            ));
        }

        let e = &self.estimator;
        check_non_negative("estimator.acceleration_noise", e.acceleration_noise)?;
        check_positive("estimator.initial_velocity_variance", e.initial_velocity_variance)?;
        check_positive(
            "estimator.initial_acceleration_variance",
            e.initial_acceleration_variance,
        )?;
        check_non_negative("estimator.acceleration_drift", e.acceleration_drift)?;
        check_non_negative("estimator.size_drift", e.size_drift)?;
        check_non_negative("estimator.theta_drift", e.theta_drift)?;
        check_positive("estimator.min_variance", e.min_variance)?;
        check_positive("estimator.velocity_converged_trace", e.velocity_converged_trace)?;
        if e.velocity_converged_updates == 0 {
            return Err(ConfigError::invalid(
                "estimator.velocity_converged_updates",
                "must be at least 1",
            ));
        }
        check_non_negative("estimator.stationary_speed", e.stationary_speed)?;
        check_positive("estimator.moving_speed", e.moving_speed)?;
        if e.stationary_speed >= e.moving_speed {
            return Err(ConfigError::invalid(
                "estimator.stationary_speed",
                format!(
                    "hysteresis band is empty: stationary {} >= moving {}",
                    e.stationary_speed, e.moving_speed
                ),
            ));
        }
        if e.type_trust.iter().any(|w| !w.is_finite() || w < 0.0) {
            return Err(ConfigError::invalid(
                "estimator.type_trust",
                "weights must be finite and >= 0",
            ));
        }
        check_positive("estimator.contribution_window", e.contribution_window)?;

        let l = &self.lifecycle;
        check_positive("lifecycle.max_miss_duration", l.max_miss_duration)?;
        check_positive("lifecycle.corroboration_window", l.corroboration_window)?;
        if l.trajectory_capacity == 0 {
            return Err(ConfigError::invalid(
                "lifecycle.trajectory_capacity",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Options handed to `FusionEngine::init`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FusionInitOptions {
    /// Sensors trusted to confirm a track on their own, in priority order
    pub main_sensors: Vec<SensorId>,
    /// Strategy parameters
    #[serde(default)]
    pub params: FusionParams,
}

impl FusionInitOptions {
    /// Options with default parameters
    pub fn new<I, S>(main_sensors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SensorId>,
    {
        Self {
            main_sensors: main_sensors.into_iter().map(Into::into).collect(),
            params: FusionParams::default(),
        }
    }

    /// Create with builder pattern.
    pub fn builder() -> FusionInitOptionsBuilder {
        FusionInitOptionsBuilder::default()
    }

    /// Validate the main-sensor list and all parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.main_sensors.is_empty() {
            return Err(ConfigError::EmptyMainSensors);
        }
        let mut seen = BTreeSet::new();
        for id in &self.main_sensors {
            if id.as_str().trim().is_empty() {
                return Err(ConfigError::BlankSensorId);
            }
            if !seen.insert(id) {
                return Err(ConfigError::DuplicateMainSensor(id.0.clone()));
            }
        }
        self.params.validate()
    }
}

/// Builder for [`FusionInitOptions`].
#[derive(Debug, Default)]
pub struct FusionInitOptionsBuilder {
    main_sensors: Vec<SensorId>,
    association: Option<AssociationParams>,
    estimator: Option<EstimatorParams>,
    lifecycle: Option<LifecycleParams>,
    max_miss_duration: Option<f64>,
    corroboration_window: Option<f64>,
    gate_cost: Option<f64>,
}

impl FusionInitOptionsBuilder {
    /// Add a main sensor.
    pub fn main_sensor(mut self, id: impl Into<SensorId>) -> Self {
        self.main_sensors.push(id.into());
        self
    }

    /// Set association parameters.
    pub fn association(mut self, params: AssociationParams) -> Self {
        self.association = Some(params);
        self
    }

    /// Set estimator parameters.
    pub fn estimator(mut self, params: EstimatorParams) -> Self {
        self.estimator = Some(params);
        self
    }

    /// Set lifecycle parameters.
    pub fn lifecycle(mut self, params: LifecycleParams) -> Self {
        self.lifecycle = Some(params);
        self
    }

    /// Override the confirmed-track miss duration.
    pub fn max_miss_duration(mut self, seconds: f64) -> Self {
        self.max_miss_duration = Some(seconds);
        self
    }

    /// Override the tentative-track corroboration window.
    pub fn corroboration_window(mut self, seconds: f64) -> Self {
        self.corroboration_window = Some(seconds);
        self
    }

    /// Override the association gate.
    pub fn gate_cost(mut self, cost: f64) -> Self {
        self.gate_cost = Some(cost);
        self
    }

    /// Build the options. Validation happens in `init`.
    pub fn build(self) -> FusionInitOptions {
        let mut params = FusionParams {
            association: self.association.unwrap_or_default(),
            estimator: self.estimator.unwrap_or_default(),
            lifecycle: self.lifecycle.unwrap_or_default(),
        };
        if let Some(v) = self.max_miss_duration {
            params.lifecycle.max_miss_duration = v;
        }
        if let Some(v) = self.corroboration_window {
            params.lifecycle.corroboration_window = v;
        }
        if let Some(v) = self.gate_cost {
            params.association.gate_cost = v;
        }
        FusionInitOptions {
            main_sensors: self.main_sensors,
            params,
        }
    }
}
