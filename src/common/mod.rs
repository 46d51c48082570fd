//! Common utilities shared by the fusion engine.
//!
//! This module contains the assignment solver and the linear algebra helpers
//! used by the estimator and the associator.

pub mod association;
pub mod linalg;
