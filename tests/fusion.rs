//! Fusion engine integration tests.
//!
//! End-to-end scenarios, lifecycle behavior, strategy selection and
//! randomized consistency checks.

#[path = "fusion/helpers.rs"]
mod helpers;

#[path = "fusion/scenarios.rs"]
mod scenarios;

#[path = "fusion/lifecycle.rs"]
mod lifecycle;

#[path = "fusion/strategies.rs"]
mod strategies;

#[path = "fusion/properties.rs"]
mod properties;
