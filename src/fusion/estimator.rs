//! Track state estimation
//!
//! [`TrackEstimator`] fuses one matched observation into its track. The
//! kinematic part is pluggable through [`StateUpdater`]:
//!
//! - [`InformationFormUpdater`] - predict to the observation time, then add
//!   the observation's information (`Y⁺ = Y + HᵀR⁻¹H`). Older observations
//!   are retrodicted: the update happens at the observation time and the
//!   result is predicted forward to the track's time.
//! - [`LatestMainUpdater`] - main-sensor observations overwrite the
//!   kinematic state, other sensors leave it alone.
//!
//! Everything else (acceleration, shape, classification, convergence, motion
//! state, trajectory) is shared bookkeeping applied after either updater.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

use super::config::EstimatorParams;
use super::errors::NumericalError;
use super::track::{MotionState, SensorContribution, Track, STATE_DIM, VELOCITY_OFFSET};
use super::types::{Gaussian3, ObjectType, Observation, SensorId, SensorModality, TypeDistribution};
use crate::common::linalg::{repair_covariance, set_block3};
use crate::components::prediction::MotionModel;
use crate::components::update::{fuse_gaussian3, fuse_heading, fuse_scalar, information_update, Measurement};

/// Settings for one kinematic update
#[derive(Debug, Clone, Copy)]
pub struct UpdateContext<'a> {
    /// Whether the producing sensor is a main sensor
    pub is_main: bool,
    /// Estimation parameters
    pub params: &'a EstimatorParams,
}

/// Kinematic update policy.
///
/// Implementations update `track.mean`, `track.covariance` and
/// `track.last_update_time` only; the estimator handles the rest.
pub trait StateUpdater: Send {
    /// Fuse the observation's kinematics into the track.
    fn update_kinematics(
        &self,
        track: &mut Track,
        obs: &Observation,
        ctx: &UpdateContext<'_>,
    ) -> Result<(), NumericalError>;

    /// Updater name for logging
    fn name(&self) -> &'static str;
}

// ============================================================================
// Information form
// ============================================================================

/// Covariance-weighted fusion in information form.
#[derive(Debug, Clone, Copy, Default)]
pub struct InformationFormUpdater;

impl StateUpdater for InformationFormUpdater {
    fn update_kinematics(
        &self,
        track: &mut Track,
        obs: &Observation,
        ctx: &UpdateContext<'_>,
    ) -> Result<(), NumericalError> {
        let min_var = ctx.params.min_variance;
        let motion = MotionModel::new(ctx.params.acceleration_noise);
        let dt = obs.timestamp - track.last_update_time;

        let (mean, covariance) = motion.predict(&track.mean, &track.covariance, dt);
        let (mut mean, mut covariance) =
            information_update(&mean, &covariance, &Measurement::from_observation(obs), min_var)?;

        if dt < 0.0 {
            // Bring the retrodicted estimate back to the track's own time
            let (m, c) = motion.predict(&mean, &covariance, -dt);
            mean = m;
            covariance = repair_covariance(&c, min_var).ok_or(NumericalError::NonFiniteCovariance {
                context: "retrodiction",
            })?;
        } else {
            track.last_update_time = obs.timestamp;
        }

        track.mean = mean;
        track.covariance = covariance;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "InformationForm"
    }
}

// ============================================================================
// Latest main sensor wins
// ============================================================================

/// Main-sensor observations replace the kinematic state outright.
///
/// Measured components take the observation's values and covariance;
/// unmeasured velocity keeps the track's predicted estimate. Non-main
/// observations do not move the state.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestMainUpdater;

impl StateUpdater for LatestMainUpdater {
    fn update_kinematics(
        &self,
        track: &mut Track,
        obs: &Observation,
        ctx: &UpdateContext<'_>,
    ) -> Result<(), NumericalError> {
        if !ctx.is_main {
            return Ok(());
        }
        let min_var = ctx.params.min_variance;
        let motion = MotionModel::new(ctx.params.acceleration_noise);
        let dt = obs.timestamp - track.last_update_time;
        let (predicted_mean, predicted_cov) = motion.predict(&track.mean, &track.covariance, dt);

        let mut mean = predicted_mean;
        let mut covariance = DMatrix::zeros(STATE_DIM, STATE_DIM);
        mean.fixed_rows_mut::<3>(0).copy_from(&obs.position.mean);
        set_block3(&mut covariance, 0, &obs.position.covariance);
        match &obs.velocity {
            Some(v) => {
                mean.fixed_rows_mut::<3>(VELOCITY_OFFSET).copy_from(&v.mean);
                set_block3(&mut covariance, VELOCITY_OFFSET, &v.covariance);
            }
            None => {
                let block = Matrix3::from_fn(|r, c| predicted_cov[(VELOCITY_OFFSET + r, VELOCITY_OFFSET + c)]);
                set_block3(&mut covariance, VELOCITY_OFFSET, &block);
            }
        }

        if dt < 0.0 {
            let (m, c) = motion.predict(&mean, &covariance, -dt);
            mean = m;
            covariance = c;
        } else {
            track.last_update_time = obs.timestamp;
        }

        track.covariance = repair_covariance(&covariance, min_var).ok_or(NumericalError::NonFiniteCovariance {
            context: "state overwrite",
        })?;
        track.mean = mean;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "LatestMain"
    }
}

// ============================================================================
// TrackEstimator
// ============================================================================

/// Fuses observations into tracks with a pluggable kinematic updater.
#[derive(Debug, Clone, Default)]
pub struct TrackEstimator<U: StateUpdater> {
    updater: U,
    params: EstimatorParams,
}

impl<U: StateUpdater> TrackEstimator<U> {
    /// Create an estimator
    pub fn new(updater: U, params: EstimatorParams) -> Self {
        Self { updater, params }
    }

    /// Estimation parameters
    pub fn params(&self) -> &EstimatorParams {
        &self.params
    }

    /// Kinematic updater
    pub fn updater(&self) -> &U {
        &self.updater
    }

    /// Initial kinematic state for a track born from `obs`.
    ///
    /// Measured components take the observation's covariance; unmeasured
    /// velocity starts at zero with `initial_velocity_variance`.
    pub fn initial_state(&self, obs: &Observation) -> (DVector<f64>, DMatrix<f64>) {
        let mut mean = DVector::zeros(STATE_DIM);
        let mut covariance = DMatrix::zeros(STATE_DIM, STATE_DIM);
        mean.fixed_rows_mut::<3>(0).copy_from(&obs.position.mean);
        set_block3(&mut covariance, 0, &obs.position.covariance);
        match &obs.velocity {
            Some(v) => {
                mean.fixed_rows_mut::<3>(VELOCITY_OFFSET).copy_from(&v.mean);
                set_block3(&mut covariance, VELOCITY_OFFSET, &v.covariance);
            }
            None => set_block3(
                &mut covariance,
                VELOCITY_OFFSET,
                &Matrix3::from_diagonal_element(self.params.initial_velocity_variance),
            ),
        }
        let covariance = repair_covariance(&covariance, self.params.min_variance)
            .unwrap_or_else(|| DMatrix::identity(STATE_DIM, STATE_DIM) * self.params.initial_velocity_variance);
        (mean, covariance)
    }

    /// Seed a freshly born track's non-kinematic state from its first observation.
    pub fn initialize(&self, track: &mut Track, obs: &Observation, sensor_id: &SensorId, modality: SensorModality) {
        track.acceleration = obs
            .acceleration
            .unwrap_or_else(|| Gaussian3::isotropic(Vector3::zeros(), self.params.initial_acceleration_variance));
        track.shape = obs.shape;
        track.polygon = obs.polygon.clone();
        self.record_contribution(track, obs, sensor_id, modality);
        self.refresh_derived(track, obs.timestamp);
    }

    /// Fuse one matched observation into its track.
    ///
    /// On error the track's state is unspecified and it must be dropped.
    pub fn update(
        &self,
        track: &mut Track,
        obs: &Observation,
        sensor_id: &SensorId,
        modality: SensorModality,
        is_main: bool,
    ) -> Result<(), NumericalError> {
        let ctx = UpdateContext {
            is_main,
            params: &self.params,
        };
        let elapsed = (obs.timestamp - track.last_update_time).abs();

        self.updater.update_kinematics(track, obs, &ctx)?;
        self.fuse_acceleration(track, obs, elapsed)?;
        self.fuse_shape(track, obs, elapsed);

        if !obs.polygon.is_empty() && (is_main || track.polygon.is_empty()) {
            track.polygon = obs.polygon.clone();
        }

        self.record_contribution(track, obs, sensor_id, modality);
        track.last_matched_time = track.last_matched_time.max(obs.timestamp);
        track.num_updates += 1;
        self.refresh_derived(track, obs.timestamp);

        log::trace!(
            "{} updated by {} obs {} ({}): pos=({:.2}, {:.2}) speed={:.2}",
            track.id,
            sensor_id,
            obs.id,
            self.updater.name(),
            track.mean[0],
            track.mean[1],
            track.speed()
        );
        Ok(())
    }

    fn fuse_acceleration(&self, track: &mut Track, obs: &Observation, elapsed: f64) -> Result<(), NumericalError> {
        track.acceleration.covariance += Matrix3::from_diagonal_element(self.params.acceleration_drift * elapsed);
        if let Some(observed) = &obs.acceleration {
            track.acceleration = fuse_gaussian3(&track.acceleration, observed, self.params.min_variance)?;
        }
        Ok(())
    }

    fn fuse_shape(&self, track: &mut Track, obs: &Observation, elapsed: f64) {
        let observed = match &obs.shape {
            Some(s) => s,
            None => return,
        };
        let min_var = self.params.min_variance;
        let current = match track.shape {
            Some(s) => s,
            None => {
                track.shape = Some(*observed);
                return;
            }
        };

        let mut fused = current;
        for axis in 0..3 {
            let var = current.size_variance[axis] + self.params.size_drift * elapsed;
            let (size, size_var) = fuse_scalar(current.size[axis], var, observed.size[axis], observed.size_variance[axis], min_var);
            fused.size[axis] = size;
            fused.size_variance[axis] = size_var;
        }
        let theta_var = current.theta_variance + self.params.theta_drift * elapsed;
        let (theta, theta_var) = fuse_heading(current.theta, theta_var, observed.theta, observed.theta_variance, min_var);
        fused.theta = theta;
        fused.theta_variance = theta_var;
        track.shape = Some(fused);
    }

    fn record_contribution(&self, track: &mut Track, obs: &Observation, sensor_id: &SensorId, modality: SensorModality) {
        track.contributions.insert(
            sensor_id.clone(),
            SensorContribution {
                modality,
                local_id: obs.id,
                last_seen: obs.timestamp,
                type_probs: obs.type_probs,
                confidence: obs.confidence,
            },
        );
    }

    /// Recompute classification, convergence, motion state and history.
    fn refresh_derived(&self, track: &mut Track, obs_time: f64) {
        let now = track.last_update_time.max(obs_time);
        track.type_probs = fuse_classification(track, &self.params, now).unwrap_or(track.type_probs);

        let velocity_trace = track.velocity_covariance().trace();
        if velocity_trace < self.params.velocity_converged_trace {
            track.converged_streak += 1;
        } else {
            track.converged_streak = 0;
        }
        track.velocity_converged = track.converged_streak >= self.params.velocity_converged_updates;

        track.motion_state = next_motion_state(track.motion_state, track.speed(), &self.params);
        track.record_state();
    }
}

/// Confidence and modality-trust weighted average of the class
/// distributions reported within `contribution_window` of `now`.
///
/// `None` when no contribution carries positive weight.
pub fn fuse_classification(track: &Track, params: &EstimatorParams, now: f64) -> Option<TypeDistribution> {
    let mut weights = [0.0; ObjectType::COUNT];
    let mut total = 0.0;
    for contribution in track.contributions.values() {
        if now - contribution.last_seen > params.contribution_window {
            continue;
        }
        let confidence = if contribution.confidence.is_finite() {
            contribution.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let w = confidence * params.type_trust.get(contribution.modality);
        if w <= 0.0 {
            continue;
        }
        for (acc, p) in weights.iter_mut().zip(contribution.type_probs.as_array()) {
            *acc += w * p;
        }
        total += w;
    }
    (total > 0.0).then(|| TypeDistribution::from_weights(weights))
}

/// Motion state with hysteresis between `stationary_speed` and `moving_speed`.
pub fn next_motion_state(previous: MotionState, speed: f64, params: &EstimatorParams) -> MotionState {
    if speed >= params.moving_speed {
        MotionState::Moving
    } else if speed <= params.stationary_speed {
        MotionState::Stationary
    } else {
        previous
    }
}
