//! Built-in fusion strategies
//!
//! Both are [`FusionCore`] configurations:
//!
//! - [`ProbabilisticFusion`] - information-form estimation; any sensor may
//!   start a (tentative) track.
//! - [`RuleBasedFusion`] - the latest main-sensor observation defines the
//!   state; only main sensors start tracks, the others contribute class
//!   evidence and keep tracks alive.

use super::engine::FusionCore;
use super::estimator::{InformationFormUpdater, LatestMainUpdater};
use crate::reporter::{NoOpReporter, StepReporter};

/// Name reported by [`ProbabilisticFusion`]
pub const PROBABILISTIC_FUSION: &str = "ProbabilisticFusion";
/// Name reported by [`RuleBasedFusion`]
pub const RULE_BASED_FUSION: &str = "RuleBasedFusion";

/// Covariance-weighted multi-sensor fusion
pub type ProbabilisticFusion<R = NoOpReporter> = FusionCore<InformationFormUpdater, R>;

/// Main-sensor-driven fusion
pub type RuleBasedFusion<R = NoOpReporter> = FusionCore<LatestMainUpdater, R>;

impl FusionCore<InformationFormUpdater, NoOpReporter> {
    /// Create an uninitialized probabilistic fusion engine.
    pub fn new() -> Self {
        Self::with_reporter(NoOpReporter)
    }
}

impl Default for FusionCore<InformationFormUpdater, NoOpReporter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: StepReporter> FusionCore<InformationFormUpdater, R> {
    /// Create an uninitialized probabilistic fusion engine with a reporter.
    pub fn with_reporter(reporter: R) -> Self {
        Self::from_parts(PROBABILISTIC_FUSION, InformationFormUpdater, false, reporter)
    }
}

impl FusionCore<LatestMainUpdater, NoOpReporter> {
    /// Create an uninitialized rule-based fusion engine.
    pub fn new() -> Self {
        Self::with_reporter(NoOpReporter)
    }
}

impl Default for FusionCore<LatestMainUpdater, NoOpReporter> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: StepReporter> FusionCore<LatestMainUpdater, R> {
    /// Create an uninitialized rule-based fusion engine with a reporter.
    pub fn with_reporter(reporter: R) -> Self {
        Self::from_parts(RULE_BASED_FUSION, LatestMainUpdater, true, reporter)
    }
}
