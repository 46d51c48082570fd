//! Core algorithmic components
//!
//! This module provides the shared estimation building blocks used by all
//! fusion strategies:
//!
//! - [`prediction`] - Constant-velocity prediction and retrodiction
//! - [`update`] - Information-form measurement updates

pub mod prediction;
pub mod update;

pub use prediction::{predicted_position, MotionModel};
pub use update::{fuse_gaussian3, fuse_heading, fuse_scalar, information_update, Measurement};
