/*!
# Obstacle fusion - multi-sensor obstacle tracking library

Fuses per-sensor obstacle detections (lidar, radar, camera, ultrasonic) into
one consistent set of tracked objects in a common world frame.

## Features

- Pluggable fusion strategies behind the [`FusionEngine`] trait
- Probabilistic (information-form) and rule-based (main-sensor) strategies
- Gated optimal association (Hungarian assignment)
- Track lifecycle with corroboration of non-main sensor births
- Per-sensor classification weighting and motion-state hysteresis

## Modules

- [`fusion`] - Engine, strategies, tracks, configuration and errors
- [`association`] - Association cost and gated assignment
- [`components`] - Shared algorithms: prediction, update
- [`common`] - Low-level utilities
- [`reporter`] - Observation hooks into each fusion cycle

## Example

```rust,no_run
use obstacle_fusion::{
    FuseOptions, FusionEngine, FusionInitOptions, Observation, ProbabilisticFusion, SensorFrame,
    SensorModality,
};
use nalgebra::{Matrix3, Vector3};

let mut engine = ProbabilisticFusion::new();
engine.init(FusionInitOptions::new(["lidar_front"])).unwrap();

let obs = Observation::new(1, 0.0, Vector3::new(10.0, 0.0, 0.0), Matrix3::identity() * 0.04)
    .with_velocity(Vector3::new(2.0, 0.0, 0.0), Matrix3::identity() * 0.25);
let frame = SensorFrame::in_world("lidar_front", SensorModality::Lidar, 0.0, vec![obs]);

let objects = engine.fuse(&FuseOptions::default(), &frame).unwrap();
for object in &objects {
    println!("{} at {:?}", object.id, object.position);
}
```
*/

// ============================================================================
// Core modules
// ============================================================================

/// Multi-sensor obstacle fusion engine
///
/// This is the main module:
/// - Strategies: `ProbabilisticFusion`, `RuleBasedFusion`
/// - Pipeline stages: `FrameIngestor`, `TrackEstimator`, `TrackLifecycleManager`
/// - Strategy lookup: `StrategyRegistry`
pub mod fusion;

/// Shared estimation components (prediction, update)
pub mod components;

/// Data association
pub mod association;

/// Low-level utilities (linear algebra, assignment)
pub mod common;

/// Fusion cycle reporters
pub mod reporter;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// Inputs and outputs
pub use fusion::{
    FuseOptions, FusedObject, Gaussian3, ObjectType, Observation, Polygon, SensorFrame, SensorId,
    SensorModality, SensorSupplement, Shape, TypeDistribution,
};

// Configuration
pub use fusion::{
    AssociationParams, EstimatorParams, FusionInitOptions, FusionInitOptionsBuilder, FusionParams,
    LifecycleParams, ModalityWeights,
};

// Errors
pub use fusion::{ConfigError, FusionError, InputError, NumericalError, RegistryError};

// Engines
pub use fusion::{FusionCore, FusionEngine, ProbabilisticFusion, RuleBasedFusion, SharedFusionEngine};

// Tracks
pub use fusion::{MotionState, Track, TrackId, TrackStatus, TrackStore};

// Registry
pub use fusion::{global_registry, register_builtin_strategies, StrategyRegistry};

// Reporters
pub use reporter::{CompositeReporter, DebugReporter, LoggingReporter, NoOpReporter, StepReporter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
