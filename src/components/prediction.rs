//! Constant-velocity track prediction
//!
//! Propagates a track's kinematic state to an arbitrary timestamp:
//! - `x' = F(dt) × x`
//! - `P' = F(dt) × P × F(dt)ᵀ + Q(|dt|)`
//!
//! `dt` may be negative (retrodiction for an observation older than the
//! track state); process noise always uses `|dt|` so uncertainty grows in
//! both directions.

use nalgebra::{DMatrix, DVector, Vector3};

use crate::fusion::track::{Track, STATE_DIM};

/// Constant-velocity motion model with white-noise acceleration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionModel {
    /// Acceleration noise standard deviation (m/s²)
    pub acceleration_noise: f64,
}

impl MotionModel {
    /// Create a motion model
    pub fn new(acceleration_noise: f64) -> Self {
        Self { acceleration_noise }
    }

    /// State transition for state `[px, py, pz, vx, vy, vz]`
    ///
    /// `F = [I, dt*I; 0, I]`
    pub fn transition_matrix(&self, dt: f64) -> DMatrix<f64> {
        let mut f = DMatrix::identity(STATE_DIM, STATE_DIM);
        for axis in 0..3 {
            f[(axis, axis + 3)] = dt;
        }
        f
    }

    /// Process noise (continuous white noise acceleration)
    ///
    /// `Q = q * [(|dt|³/3)*I, (dt²/2)*sign(dt)*I; (dt²/2)*sign(dt)*I, |dt|*I]`
    pub fn process_noise(&self, dt: f64) -> DMatrix<f64> {
        let q = self.acceleration_noise * self.acceleration_noise;
        let adt = dt.abs();
        let dt2 = dt * dt;
        let dt3 = dt2 * adt;
        // Cross terms follow the direction of propagation
        let cross = q * dt2 / 2.0 * dt.signum();
        let mut r = DMatrix::zeros(STATE_DIM, STATE_DIM);
        for axis in 0..3 {
            r[(axis, axis)] = q * dt3 / 3.0;
            r[(axis, axis + 3)] = cross;
            r[(axis + 3, axis)] = cross;
            r[(axis + 3, axis + 3)] = q * adt;
        }
        r
    }

    /// Predict a Gaussian state by `dt` seconds
    pub fn predict(
        &self,
        mean: &DVector<f64>,
        covariance: &DMatrix<f64>,
        dt: f64,
    ) -> (DVector<f64>, DMatrix<f64>) {
        if dt == 0.0 {
            return (mean.clone(), covariance.clone());
        }
        let f = self.transition_matrix(dt);
        let mean = &f * mean;
        let covariance = &f * covariance * f.transpose() + self.process_noise(dt);
        (mean, covariance)
    }
}

/// Position a track would have at `timestamp` (mean only, no covariance work).
#[inline]
pub fn predicted_position(track: &Track, timestamp: f64) -> Vector3<f64> {
    let dt = timestamp - track.last_update_time;
    track.position() + track.velocity() * dt
}
