//! Observability for fusion cycles.
//!
//! This module provides the [`StepReporter`] trait for debugging and
//! instrumentation. Reporters receive callbacks at key points of a `fuse`
//! call without polluting the core algorithm logic.
//!
//! # Zero-Cost Abstraction
//!
//! The default [`NoOpReporter`] compiles to zero overhead - all callback
//! methods are empty and will be optimized away by the compiler.
//!
//! # Example
//!
//! ```
//! use obstacle_fusion::fusion::{FuseOptions, FusionEngine, FusionInitOptions, ProbabilisticFusion};
//! use obstacle_fusion::reporter::DebugReporter;
//!
//! let mut engine = ProbabilisticFusion::with_reporter(DebugReporter::new());
//! engine.init(FusionInitOptions::new(["lidar"])).unwrap();
//!
//! // ... feed frames ...
//!
//! println!("{} births so far", engine.reporter().births().len());
//! ```

use crate::association::AssociationResult;
use crate::fusion::errors::InputError;
use crate::fusion::lifecycle::RetireReason;
use crate::fusion::output::FusedObject;
use crate::fusion::track::{Track, TrackId};
use crate::fusion::types::SensorId;

// ============================================================================
// StepReporter Trait
// ============================================================================

/// Observability trait for fusion cycle execution.
///
/// All methods have default empty implementations, so you only need to
/// override the events you care about.
///
/// # Thread Safety
///
/// Reporters use `&mut self` for callbacks. An engine is `Send` only when its
/// reporter is, which is what [`SharedFusionEngine`](crate::fusion::SharedFusionEngine)
/// requires.
pub trait StepReporter {
    /// Called when a whole frame is rejected. No state has changed.
    fn on_frame_rejected(&mut self, _sensor: &SensorId, _error: &InputError) {}

    /// Called for each observation skipped inside an accepted frame.
    fn on_observation_skipped(&mut self, _sensor: &SensorId, _error: &InputError) {}

    /// Called after the frame's observations are associated.
    fn on_association(&mut self, _sensor: &SensorId, _result: &AssociationResult) {}

    /// Called after a track is created.
    fn on_birth(&mut self, _track: &Track) {}

    /// Called after a tentative track is confirmed.
    fn on_promotion(&mut self, _track: &Track) {}

    /// Called after a track is deleted.
    fn on_retire(&mut self, _track: TrackId, _reason: RetireReason) {}

    /// Called with the snapshot returned from `fuse`.
    fn on_emit(&mut self, _objects: &[FusedObject]) {}
}

// ============================================================================
// NoOpReporter
// ============================================================================

/// Zero-cost reporter that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReporter;

impl NoOpReporter {
    /// Create a new no-op reporter.
    pub fn new() -> Self {
        Self
    }
}

impl StepReporter for NoOpReporter {}

// ============================================================================
// DebugReporter
// ============================================================================

/// Reporter that captures all events for debugging and tests.
///
/// Tracks are captured by id only; emitted snapshots by their id lists.
#[derive(Debug, Clone, Default)]
pub struct DebugReporter {
    rejected_frames: Vec<(SensorId, InputError)>,
    skipped_observations: Vec<(SensorId, InputError)>,
    associations: Vec<(SensorId, usize)>,
    births: Vec<TrackId>,
    promotions: Vec<TrackId>,
    retirements: Vec<(TrackId, RetireReason)>,
    emissions: Vec<Vec<TrackId>>,
}

impl DebugReporter {
    /// Create a new debug reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all captured events.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Rejected frames with the reason
    pub fn rejected_frames(&self) -> &[(SensorId, InputError)] {
        &self.rejected_frames
    }

    /// Skipped observations with the reason
    pub fn skipped_observations(&self) -> &[(SensorId, InputError)] {
        &self.skipped_observations
    }

    /// Number of matches per associated frame
    pub fn associations(&self) -> &[(SensorId, usize)] {
        &self.associations
    }

    /// Born track ids in birth order
    pub fn births(&self) -> &[TrackId] {
        &self.births
    }

    /// Promoted track ids
    pub fn promotions(&self) -> &[TrackId] {
        &self.promotions
    }

    /// Deleted track ids with the reason
    pub fn retirements(&self) -> &[(TrackId, RetireReason)] {
        &self.retirements
    }

    /// Emitted id lists, one per `fuse` call
    pub fn emissions(&self) -> &[Vec<TrackId>] {
        &self.emissions
    }

    /// Total number of captured events across all types.
    pub fn total_events(&self) -> usize {
        self.rejected_frames.len()
            + self.skipped_observations.len()
            + self.associations.len()
            + self.births.len()
            + self.promotions.len()
            + self.retirements.len()
            + self.emissions.len()
    }
}

impl StepReporter for DebugReporter {
    fn on_frame_rejected(&mut self, sensor: &SensorId, error: &InputError) {
        self.rejected_frames.push((sensor.clone(), error.clone()));
    }

    fn on_observation_skipped(&mut self, sensor: &SensorId, error: &InputError) {
        self.skipped_observations.push((sensor.clone(), error.clone()));
    }

    fn on_association(&mut self, sensor: &SensorId, result: &AssociationResult) {
        self.associations.push((sensor.clone(), result.num_matches()));
    }

    fn on_birth(&mut self, track: &Track) {
        self.births.push(track.id);
    }

    fn on_promotion(&mut self, track: &Track) {
        self.promotions.push(track.id);
    }

    fn on_retire(&mut self, track: TrackId, reason: RetireReason) {
        self.retirements.push((track, reason));
    }

    fn on_emit(&mut self, objects: &[FusedObject]) {
        self.emissions.push(objects.iter().map(|o| o.id).collect());
    }
}

// ============================================================================
// LoggingReporter
// ============================================================================

/// Reporter that logs events using the log crate.
///
/// # Log Levels
///
/// - `on_frame_rejected`, `on_observation_skipped`: WARN
/// - `on_birth`, `on_promotion`, `on_retire`, `on_emit`: DEBUG
/// - `on_association`: TRACE
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingReporter {
    /// Whether to include per-object details in log messages
    verbose: bool,
}

impl LoggingReporter {
    /// Create a new logging reporter.
    pub fn new() -> Self {
        Self { verbose: false }
    }

    /// Create a verbose logging reporter that includes object details.
    pub fn verbose() -> Self {
        Self { verbose: true }
    }
}

impl StepReporter for LoggingReporter {
    fn on_frame_rejected(&mut self, sensor: &SensorId, error: &InputError) {
        log::warn!("Frame from {} rejected: {}", sensor, error);
    }

    fn on_observation_skipped(&mut self, sensor: &SensorId, error: &InputError) {
        log::warn!("Observation from {} skipped: {}", sensor, error);
    }

    fn on_association(&mut self, sensor: &SensorId, result: &AssociationResult) {
        log::trace!(
            "Association for {}: {} matches, {} unmatched observations, {} unmatched tracks",
            sensor,
            result.num_matches(),
            result.unmatched_observations.len(),
            result.unmatched_tracks.len()
        );
    }

    fn on_birth(&mut self, track: &Track) {
        log::debug!("Birth: {} ({:?}) from {}", track.id, track.status, track.origin_sensor);
    }

    fn on_promotion(&mut self, track: &Track) {
        log::debug!("Promotion: {}", track.id);
    }

    fn on_retire(&mut self, track: TrackId, reason: RetireReason) {
        log::debug!("Retired: {} ({})", track, reason);
    }

    fn on_emit(&mut self, objects: &[FusedObject]) {
        log::debug!("Emit: {} objects", objects.len());
        if self.verbose {
            for o in objects {
                log::debug!(
                    "  {}: type={:?}, pos=({:.2}, {:.2}), speed={:.2}, sensors={}",
                    o.id,
                    o.object_type,
                    o.position.x,
                    o.position.y,
                    o.velocity.xy().norm(),
                    o.contributing_sensors.len()
                );
            }
        }
    }
}

// ============================================================================
// CompositeReporter
// ============================================================================

/// Reporter that forwards events to two child reporters.
#[derive(Debug, Clone)]
pub struct CompositeReporter<A: StepReporter, B: StepReporter> {
    first: A,
    second: B,
}

impl<A: StepReporter, B: StepReporter> CompositeReporter<A, B> {
    /// Create a new composite reporter.
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    /// Get a reference to the first reporter.
    pub fn first(&self) -> &A {
        &self.first
    }

    /// Get a reference to the second reporter.
    pub fn second(&self) -> &B {
        &self.second
    }

    /// Consume and return both reporters.
    pub fn into_parts(self) -> (A, B) {
        (self.first, self.second)
    }
}

impl<A: StepReporter, B: StepReporter> StepReporter for CompositeReporter<A, B> {
    fn on_frame_rejected(&mut self, sensor: &SensorId, error: &InputError) {
        self.first.on_frame_rejected(sensor, error);
        self.second.on_frame_rejected(sensor, error);
    }

    fn on_observation_skipped(&mut self, sensor: &SensorId, error: &InputError) {
        self.first.on_observation_skipped(sensor, error);
        self.second.on_observation_skipped(sensor, error);
    }

    fn on_association(&mut self, sensor: &SensorId, result: &AssociationResult) {
        self.first.on_association(sensor, result);
        self.second.on_association(sensor, result);
    }

    fn on_birth(&mut self, track: &Track) {
        self.first.on_birth(track);
        self.second.on_birth(track);
    }

    fn on_promotion(&mut self, track: &Track) {
        self.first.on_promotion(track);
        self.second.on_promotion(track);
    }

    fn on_retire(&mut self, track: TrackId, reason: RetireReason) {
        self.first.on_retire(track, reason);
        self.second.on_retire(track, reason);
    }

    fn on_emit(&mut self, objects: &[FusedObject]) {
        self.first.on_emit(objects);
        self.second.on_emit(objects);
    }
}

// ============================================================================
// Tests
// ============================================================================
