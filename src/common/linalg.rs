//! Linear algebra utilities
//!
//! Covariance hygiene (symmetrization, positive semi-definite repair),
//! robust inversion, frame rotation helpers and angle arithmetic used by
//! the estimator and the associator.

use nalgebra::{DMatrix, Matrix3, Rotation3, UnitQuaternion};
use std::f64::consts::PI;

/// Relative tolerance used when judging eigenvalues against zero.
const EIGEN_TOLERANCE: f64 = 1e-9;

/// Make matrix symmetric
///
/// Ensures a matrix is symmetric by averaging with its transpose
pub fn symmetrize(matrix: &DMatrix<f64>) -> DMatrix<f64> {
    0.5 * (matrix + matrix.transpose())
}

/// True when every entry of the matrix is finite.
#[inline]
pub fn is_finite_matrix(matrix: &DMatrix<f64>) -> bool {
    matrix.iter().all(|v| v.is_finite())
}

/// Smallest eigenvalue of the symmetric part of `matrix`.
///
/// Returns `f64::NAN` for an empty or non-finite matrix.
pub fn min_eigenvalue(matrix: &DMatrix<f64>) -> f64 {
    if matrix.is_empty() || !is_finite_matrix(matrix) {
        return f64::NAN;
    }
    symmetrize(matrix)
        .symmetric_eigenvalues()
        .iter()
        .cloned()
        .fold(f64::INFINITY, f64::min)
}

/// True when the symmetric part of `matrix` has no eigenvalue below
/// `-tolerance * max(1, |λ|max)`.
pub fn is_positive_semi_definite(matrix: &DMatrix<f64>, tolerance: f64) -> bool {
    if matrix.is_empty() {
        return true;
    }
    if !is_finite_matrix(matrix) {
        return false;
    }
    let eigenvalues = symmetrize(matrix).symmetric_eigenvalues();
    let scale = eigenvalues.iter().fold(1.0_f64, |acc, v| acc.max(v.abs()));
    eigenvalues.iter().all(|&v| v >= -tolerance * scale)
}

/// Project a covariance onto the nearest valid covariance.
///
/// The matrix is symmetrized and every eigenvalue below `min_variance` is
/// raised to `min_variance`. A matrix that already satisfies the floor is
/// returned symmetrized but otherwise untouched.
///
/// Returns `None` if the matrix contains non-finite entries; such a
/// covariance cannot be repaired.
pub fn repair_covariance(matrix: &DMatrix<f64>, min_variance: f64) -> Option<DMatrix<f64>> {
    if !is_finite_matrix(matrix) {
        return None;
    }
    let sym = symmetrize(matrix);
    let eigen = sym.clone().symmetric_eigen();
    if eigen.eigenvalues.iter().all(|&v| v >= min_variance) {
        return Some(sym);
    }

    let clamped = eigen.eigenvalues.map(|v| v.max(min_variance));
    let repaired = &eigen.eigenvectors
        * DMatrix::from_diagonal(&clamped)
        * eigen.eigenvectors.transpose();
    let repaired = symmetrize(&repaired);
    if is_finite_matrix(&repaired) {
        Some(repaired)
    } else {
        None
    }
}

/// Invert a symmetric positive definite matrix.
///
/// Tries Cholesky first, then falls back to LU. Returns `None` when the
/// matrix is singular.
pub fn robust_inverse(matrix: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    if let Some(chol) = matrix.clone().cholesky() {
        return Some(chol.inverse());
    }
    let scale = matrix.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return None;
    }
    let inverse = matrix.clone().try_inverse()?;
    let residual = (matrix * &inverse - DMatrix::identity(matrix.nrows(), matrix.ncols())).norm();
    if residual.is_finite() && residual < EIGEN_TOLERANCE.sqrt() * matrix.nrows() as f64 {
        Some(inverse)
    } else {
        None
    }
}

/// Rotate a 3x3 covariance into another frame: `R Σ Rᵀ`.
#[inline]
pub fn rotate_covariance(rotation: &Rotation3<f64>, covariance: &Matrix3<f64>) -> Matrix3<f64> {
    let r = rotation.matrix();
    r * covariance * r.transpose()
}

/// Yaw (rotation about +z) of a rotation, in radians.
#[inline]
pub fn yaw_of(rotation: &UnitQuaternion<f64>) -> f64 {
    rotation.euler_angles().2
}

/// Wrap an angle to `(-π, π]`.
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}

/// Difference between two box headings, treating a box as symmetric under a
/// half turn. Result lies in `[0, π/2]`.
pub fn heading_difference(a: f64, b: f64) -> f64 {
    let d = wrap_angle(a - b).abs();
    d.min(PI - d)
}

/// Embed a 3x3 block into a square dynamic matrix at `(offset, offset)`.
pub fn set_block3(target: &mut DMatrix<f64>, offset: usize, block: &Matrix3<f64>) {
    for r in 0..3 {
        for c in 0..3 {
            target[(offset + r, offset + c)] = block[(r, c)];
        }
    }
}

/// Extract a 3x3 block from a square dynamic matrix at `(offset, offset)`.
pub fn block3(source: &DMatrix<f64>, offset: usize) -> Matrix3<f64> {
    Matrix3::from_fn(|r, c| source[(offset + r, offset + c)])
}
