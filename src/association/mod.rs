//! Observation-to-track association
//!
//! This module provides:
//! - [`cost`] - Gated association cost between an observation and a track
//! - [`associator`] - Cost matrix construction and exact assignment

pub mod associator;
pub mod cost;

pub use crate::common::association::hungarian;

pub use associator::{AssociationResult, GatedAssociator};
pub use cost::{association_cost, CostTerms};
