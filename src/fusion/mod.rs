//! Multi-sensor obstacle fusion
//!
//! Per `fuse` call the engine runs one cycle over a single sensor frame:
//!
//! 1. [`FrameIngestor`] validates the frame and moves its observations to the
//!    world frame.
//! 2. [`GatedAssociator`](crate::association::GatedAssociator) matches them
//!    against the [`TrackStore`].
//! 3. A [`StateUpdater`] fuses matched observations into their tracks.
//! 4. [`TrackLifecycleManager`] promotes, spawns and retires tracks.
//! 5. The confirmed tracks are emitted as [`FusedObject`] snapshots.
//!
//! Strategies ([`ProbabilisticFusion`], [`RuleBasedFusion`]) plug different
//! updaters and lifecycle settings into the same [`FusionCore`].

pub mod config;
pub mod engine;
pub mod errors;
pub mod estimator;
pub mod ingest;
pub mod lifecycle;
pub mod output;
pub mod registry;
pub mod strategies;
pub mod track;
pub mod types;

// ============================================================================
// Calibrated defaults
// ============================================================================

/// Classification trust of a lidar
pub const DEFAULT_TYPE_TRUST_LIDAR: f64 = 1.0;
/// Classification trust of a radar (weak classifier)
pub const DEFAULT_TYPE_TRUST_RADAR: f64 = 0.5;
/// Classification trust of a camera
pub const DEFAULT_TYPE_TRUST_CAMERA: f64 = 1.0;
/// Classification trust of an ultrasonic sensor
pub const DEFAULT_TYPE_TRUST_ULTRASONIC: f64 = 0.2;

/// Horizontal center distance gate (m)
pub const DEFAULT_MAX_CENTER_DISTANCE: f64 = 4.0;
/// Association cost gate
pub const DEFAULT_GATE_COST: f64 = 4.0;

/// Eigenvalue floor for covariance repair
pub const DEFAULT_MIN_VARIANCE: f64 = 1e-6;
/// Speed at which a track becomes moving (m/s)
pub const DEFAULT_MOVING_SPEED: f64 = 1.0;
/// Speed at which a track becomes stationary (m/s)
pub const DEFAULT_STATIONARY_SPEED: f64 = 0.3;

/// Confirmed tracks unseen for longer are retired (s)
pub const DEFAULT_MAX_MISS_DURATION: f64 = 2.0;
/// Tentative tracks must be corroborated within this window (s)
pub const DEFAULT_CORROBORATION_WINDOW: f64 = 0.5;
/// Trajectory history length
pub const DEFAULT_TRAJECTORY_CAPACITY: usize = 50;

// ============================================================================
// Re-exports
// ============================================================================

pub use config::{
    AssociationParams, EstimatorParams, FusionInitOptions, FusionInitOptionsBuilder, FusionParams,
    LifecycleParams, ModalityWeights,
};
pub use engine::{FuseOptions, FusionCore, FusionEngine, SharedFusionEngine};
pub use errors::{ConfigError, FusionError, InputError, NumericalError, RegistryError};
pub use estimator::{
    InformationFormUpdater, LatestMainUpdater, StateUpdater, TrackEstimator, UpdateContext,
};
pub use ingest::{FrameIngestor, IngestedFrame};
pub use lifecycle::{LifecycleEvents, RetireReason, TrackLifecycleManager};
pub use output::FusedObject;
pub use registry::{global_registry, register_builtin_strategies, StrategyConstructor, StrategyRegistry};
pub use strategies::{ProbabilisticFusion, RuleBasedFusion};
pub use track::{
    MotionState, SensorContribution, Track, TrackId, TrackStatus, TrackStore, TrajectoryHistory,
    TrajectoryPoint,
};
pub use types::{
    Gaussian3, ObjectType, Observation, Polygon, SensorFrame, SensorId, SensorModality,
    SensorSupplement, Shape, TypeDistribution,
};
