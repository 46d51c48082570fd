//! Information-form measurement updates
//!
//! Fuses a measurement into a Gaussian state by adding information:
//! - `Y⁺ = P⁻¹ + Hᵀ R⁻¹ H`
//! - `y⁺ = P⁻¹ x + Hᵀ R⁻¹ z`
//! - `P⁺ = (Y⁺)⁻¹`, `x⁺ = P⁺ y⁺`
//!
//! The estimate with the smaller covariance dominates the result. Scalar and
//! 3-vector helpers apply the same rule to shape and acceleration.

use nalgebra::{DMatrix, DVector, Vector3};

use crate::common::linalg::{repair_covariance, robust_inverse, set_block3, wrap_angle};
use crate::fusion::errors::NumericalError;
use crate::fusion::track::{POSITION_OFFSET, STATE_DIM, VELOCITY_OFFSET};
use crate::fusion::types::{Gaussian3, Observation};

/// Linear measurement `z = H x + v`, `v ~ N(0, R)`
#[derive(Debug, Clone)]
pub struct Measurement {
    /// Measured values
    pub z: DVector<f64>,
    /// Observation matrix
    pub h: DMatrix<f64>,
    /// Measurement noise covariance
    pub r: DMatrix<f64>,
}

impl Measurement {
    /// Build the kinematic measurement carried by an observation.
    ///
    /// Position is always measured; velocity only when the observation has it.
    pub fn from_observation(obs: &Observation) -> Self {
        let with_velocity = obs.velocity.is_some();
        let z_dim = if with_velocity { 6 } else { 3 };

        let mut z = DVector::zeros(z_dim);
        let mut h = DMatrix::zeros(z_dim, STATE_DIM);
        let mut r = DMatrix::zeros(z_dim, z_dim);

        z.fixed_rows_mut::<3>(0).copy_from(&obs.position.mean);
        for axis in 0..3 {
            h[(axis, POSITION_OFFSET + axis)] = 1.0;
        }
        set_block3(&mut r, 0, &obs.position.covariance);

        if let Some(velocity) = &obs.velocity {
            z.fixed_rows_mut::<3>(3).copy_from(&velocity.mean);
            for axis in 0..3 {
                h[(3 + axis, VELOCITY_OFFSET + axis)] = 1.0;
            }
            set_block3(&mut r, 3, &velocity.covariance);
        }

        Self { z, h, r }
    }

    /// Measurement dimension
    #[inline]
    pub fn z_dim(&self) -> usize {
        self.z.len()
    }
}

/// Fuse a measurement into a Gaussian state in information form.
///
/// Both the prior and the measurement covariance are first projected to
/// valid covariances with eigenvalue floor `min_variance`, so their inverses
/// exist. The posterior is repaired the same way before returning.
pub fn information_update(
    mean: &DVector<f64>,
    covariance: &DMatrix<f64>,
    measurement: &Measurement,
    min_variance: f64,
) -> Result<(DVector<f64>, DMatrix<f64>), NumericalError> {
    let prior = repair_covariance(covariance, min_variance).ok_or(
        NumericalError::NonFiniteCovariance {
            context: "prior covariance",
        },
    )?;
    let noise = repair_covariance(&measurement.r, min_variance).ok_or(
        NumericalError::NonFiniteCovariance {
            context: "measurement covariance",
        },
    )?;

    let prior_info = robust_inverse(&prior).ok_or(NumericalError::SingularInformation {
        context: "prior inversion",
    })?;
    let noise_info = robust_inverse(&noise).ok_or(NumericalError::SingularInformation {
        context: "measurement inversion",
    })?;

    let ht_rinv = measurement.h.transpose() * &noise_info;
    let info_matrix = &prior_info + &ht_rinv * &measurement.h;
    let info_vector = &prior_info * mean + &ht_rinv * &measurement.z;

    let posterior = robust_inverse(&info_matrix).ok_or(NumericalError::SingularInformation {
        context: "posterior inversion",
    })?;
    let posterior_mean = &posterior * info_vector;
    if posterior_mean.iter().any(|v| !v.is_finite()) {
        return Err(NumericalError::NonFiniteCovariance {
            context: "posterior mean",
        });
    }
    let posterior = repair_covariance(&posterior, min_variance).ok_or(
        NumericalError::NonFiniteCovariance {
            context: "posterior covariance",
        },
    )?;

    Ok((posterior_mean, posterior))
}

/// Inverse-variance fusion of two scalar estimates.
///
/// Returns `(mean, variance)`. Non-positive variances are floored at
/// `min_variance`.
pub fn fuse_scalar(a: f64, var_a: f64, b: f64, var_b: f64, min_variance: f64) -> (f64, f64) {
    let wa = 1.0 / var_a.max(min_variance);
    let wb = 1.0 / var_b.max(min_variance);
    let var = 1.0 / (wa + wb);
    ((a * wa + b * wb) * var, var)
}

/// Inverse-variance fusion of two headings. The observed heading is first
/// folded onto the half turn closest to the current one (box headings are
/// ambiguous by π), then fused along the shortest arc.
pub fn fuse_heading(theta: f64, var: f64, observed: f64, observed_var: f64, min_variance: f64) -> (f64, f64) {
    let mut innovation = wrap_angle(observed - theta);
    if innovation > std::f64::consts::FRAC_PI_2 {
        innovation -= std::f64::consts::PI;
    } else if innovation < -std::f64::consts::FRAC_PI_2 {
        innovation += std::f64::consts::PI;
    }
    let (delta, fused_var) = fuse_scalar(0.0, var, innovation, observed_var, min_variance);
    (wrap_angle(theta + delta), fused_var)
}

/// Information-form fusion of two 3-vector Gaussians.
pub fn fuse_gaussian3(a: &Gaussian3, b: &Gaussian3, min_variance: f64) -> Result<Gaussian3, NumericalError> {
    let mean = DVector::from_column_slice(a.mean.as_slice());
    let covariance = DMatrix::from_column_slice(3, 3, a.covariance.as_slice());
    let measurement = Measurement {
        z: DVector::from_column_slice(b.mean.as_slice()),
        h: DMatrix::identity(3, 3),
        r: DMatrix::from_column_slice(3, 3, b.covariance.as_slice()),
    };
    let (m, p) = information_update(&mean, &covariance, &measurement, min_variance)?;
    Ok(Gaussian3::new(
        Vector3::new(m[0], m[1], m[2]),
        nalgebra::Matrix3::from_fn(|r, c| p[(r, c)]),
    ))
}
