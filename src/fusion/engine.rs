//! Fusion engine facade.
//!
//! [`FusionEngine`] is the strategy contract hosts program against:
//! `init`, `fuse` and `name`. [`FusionCore`] implements one complete fusion
//! cycle generic over the kinematic [`StateUpdater`] and a [`StepReporter`];
//! the built-in strategies are configurations of it.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::config::FusionInitOptions;
use super::errors::{ConfigError, FusionError};
use super::estimator::{StateUpdater, TrackEstimator};
use super::ingest::FrameIngestor;
use super::lifecycle::{LifecycleEvents, RetireReason, TrackLifecycleManager};
use super::output::FusedObject;
use super::track::TrackStore;
use super::types::SensorFrame;
use crate::association::GatedAssociator;
use crate::components::prediction::MotionModel;
use crate::reporter::{NoOpReporter, StepReporter};

/// Per-call flags for `fuse`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseOptions {
    /// Predict emitted snapshots to the frame timestamp (tracks are not modified)
    pub extrapolate_to_frame_time: bool,
    /// Copy each track's trajectory history into its snapshot
    pub include_trajectory: bool,
}

/// Pluggable fusion strategy.
///
/// A strategy must be initialized before use; `fuse` on an uninitialized
/// engine returns [`FusionError::NotInitialized`] without touching any state.
pub trait FusionEngine: Send {
    /// Validate options and (re)start from an empty track store.
    ///
    /// On error the engine is left uninitialized.
    fn init(&mut self, options: FusionInitOptions) -> Result<(), ConfigError>;

    /// Consume one sensor frame and return the confirmed tracks in id order.
    ///
    /// A rejected frame (bad transform, bad or stale timestamp) changes
    /// nothing and yields the current confirmed tracks.
    fn fuse(&mut self, options: &FuseOptions, frame: &SensorFrame) -> Result<Vec<FusedObject>, FusionError>;

    /// Strategy name
    fn name(&self) -> &'static str;

    /// True after a successful `init`
    fn is_initialized(&self) -> bool;

    /// Read-only view of every track, tentative ones included
    fn track_store(&self) -> &TrackStore;

    /// Drop all tracks and sensor history; keeps the configuration
    fn reset(&mut self);
}

/// Components built by `init`
#[derive(Debug, Clone)]
struct CoreState<U: StateUpdater> {
    options: FusionInitOptions,
    associator: GatedAssociator,
    estimator: TrackEstimator<U>,
    lifecycle: TrackLifecycleManager,
    motion: MotionModel,
}

/// One fusion cycle: ingest, associate, update, manage lifecycle, emit.
#[derive(Debug, Clone)]
pub struct FusionCore<U: StateUpdater, R: StepReporter = NoOpReporter> {
    name: &'static str,
    updater: U,
    main_only_births: bool,
    state: Option<CoreState<U>>,
    ingestor: FrameIngestor,
    store: TrackStore,
    reporter: R,
}

impl<U: StateUpdater + Clone, R: StepReporter> FusionCore<U, R> {
    /// Assemble a strategy from its parts.
    ///
    /// With `main_only_births` set, only main sensors may start tracks,
    /// whatever the lifecycle parameters say.
    pub fn from_parts(name: &'static str, updater: U, main_only_births: bool, reporter: R) -> Self {
        Self {
            name,
            updater,
            main_only_births,
            state: None,
            ingestor: FrameIngestor::new(),
            store: TrackStore::new(),
            reporter,
        }
    }

    /// Options accepted by the last successful `init`
    pub fn options(&self) -> Option<&FusionInitOptions> {
        self.state.as_ref().map(|s| &s.options)
    }

    /// Get the reporter
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Get the reporter mutably
    pub fn reporter_mut(&mut self) -> &mut R {
        &mut self.reporter
    }

    /// Number of live tracks (tentative and confirmed)
    pub fn num_tracks(&self) -> usize {
        self.store.len()
    }

    fn initialize(&mut self, options: FusionInitOptions) -> Result<(), ConfigError> {
        self.state = None;
        options.validate()?;

        let mut params = options.params.clone();
        if self.main_only_births {
            params.lifecycle.allow_non_main_birth = false;
        }

        let mains: Vec<&str> = options.main_sensors.iter().map(|s| s.as_str()).collect();
        log::info!("{} initialized with main sensors [{}]", self.name, mains.join(", "));

        self.state = Some(CoreState {
            associator: GatedAssociator::new(params.association.clone()),
            estimator: TrackEstimator::new(self.updater.clone(), params.estimator.clone()),
            lifecycle: TrackLifecycleManager::new(params.lifecycle.clone(), options.main_sensors.clone()),
            motion: MotionModel::new(params.estimator.acceleration_noise),
            options,
        });
        self.store.clear();
        self.ingestor.reset();
        Ok(())
    }

    fn run_cycle(&mut self, options: &FuseOptions, frame: &SensorFrame) -> Result<Vec<FusedObject>, FusionError> {
        let state = self.state.as_ref().ok_or(FusionError::NotInitialized)?;

        let ingested = match self.ingestor.ingest(frame) {
            Ok(ingested) => ingested,
            Err(err) => {
                log::warn!("{}: frame from {} rejected: {}", self.name, frame.sensor_id, err);
                self.reporter.on_frame_rejected(&frame.sensor_id, &err);
                let objects = emit(&self.store, &state.motion, options, None);
                self.reporter.on_emit(&objects);
                return Ok(objects);
            }
        };
        for err in &ingested.skipped {
            self.reporter.on_observation_skipped(&ingested.sensor_id, err);
        }

        let sensor = &ingested.sensor_id;
        let is_main = state.lifecycle.is_main(sensor);
        let association = state
            .associator
            .associate(sensor, &ingested.observations, &self.store);
        self.reporter.on_association(sensor, &association);

        let mut events = LifecycleEvents::default();

        for &(obs_idx, track_id) in &association.matches {
            let obs = &ingested.observations[obs_idx];
            let track = match self.store.get_mut(track_id) {
                Some(track) => track,
                None => continue,
            };
            match state
                .estimator
                .update(track, obs, sensor, ingested.modality, is_main)
            {
                Ok(()) => {
                    if state.lifecycle.corroborate(track, sensor, obs.timestamp) {
                        self.reporter.on_promotion(track);
                        events.promoted.push(track_id);
                    }
                }
                Err(err) => {
                    log::warn!("{} dropped after update from {}: {}", track_id, sensor, err);
                    state.lifecycle.drop_failed(&mut self.store, track_id);
                    self.reporter.on_retire(track_id, RetireReason::NumericalFailure);
                    events.retired.push((track_id, RetireReason::NumericalFailure));
                }
            }
        }

        for &obs_idx in &association.unmatched_observations {
            let obs = &ingested.observations[obs_idx];
            let born = state
                .lifecycle
                .spawn(&mut self.store, &state.estimator, obs, sensor, ingested.modality);
            if let Some(id) = born {
                if let Some(track) = self.store.get(id) {
                    self.reporter.on_birth(track);
                }
                events.born.push(id);
            }
        }

        for (id, reason) in state.lifecycle.retire(&mut self.store, ingested.timestamp) {
            self.reporter.on_retire(id, reason);
            events.retired.push((id, reason));
        }

        let objects = emit(&self.store, &state.motion, options, Some(ingested.timestamp));
        self.reporter.on_emit(&objects);

        log::debug!(
            "{}: {} @ {:.3}: {} obs, {} matched, {} born, {} promoted, {} retired, {} tracks, {} emitted",
            self.name,
            sensor,
            ingested.timestamp,
            ingested.observations.len(),
            association.num_matches(),
            events.born.len(),
            events.promoted.len(),
            events.retired.len(),
            self.store.len(),
            objects.len()
        );
        Ok(objects)
    }
}

/// Snapshot the confirmed tracks in id order.
fn emit(store: &TrackStore, motion: &MotionModel, options: &FuseOptions, frame_time: Option<f64>) -> Vec<FusedObject> {
    store
        .confirmed()
        .map(|track| match frame_time {
            Some(t) if options.extrapolate_to_frame_time => {
                FusedObject::extrapolated(track, motion, t, options.include_trajectory)
            }
            _ => FusedObject::from_track(track, options.include_trajectory),
        })
        .collect()
}

impl<U, R> FusionEngine for FusionCore<U, R>
where
    U: StateUpdater + Clone,
    R: StepReporter + Send,
{
    fn init(&mut self, options: FusionInitOptions) -> Result<(), ConfigError> {
        self.initialize(options)
    }

    fn fuse(&mut self, options: &FuseOptions, frame: &SensorFrame) -> Result<Vec<FusedObject>, FusionError> {
        self.run_cycle(options, frame)
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_initialized(&self) -> bool {
        self.state.is_some()
    }

    fn track_store(&self) -> &TrackStore {
        &self.store
    }

    fn reset(&mut self) {
        self.store.clear();
        self.ingestor.reset();
    }
}

// ============================================================================
// SharedFusionEngine
// ============================================================================

/// A boxed engine behind a mutex, shareable between producer threads.
///
/// Every call holds the lock for its whole duration, so cycles from
/// different threads never interleave.
#[derive(Clone)]
pub struct SharedFusionEngine {
    inner: Arc<Mutex<Box<dyn FusionEngine>>>,
}

impl SharedFusionEngine {
    /// Wrap an engine
    pub fn new(engine: Box<dyn FusionEngine>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// See [`FusionEngine::init`]
    pub fn init(&self, options: FusionInitOptions) -> Result<(), ConfigError> {
        self.inner.lock().init(options)
    }

    /// See [`FusionEngine::fuse`]
    pub fn fuse(&self, options: &FuseOptions, frame: &SensorFrame) -> Result<Vec<FusedObject>, FusionError> {
        self.inner.lock().fuse(options, frame)
    }

    /// Strategy name
    pub fn name(&self) -> &'static str {
        self.inner.lock().name()
    }

    /// Number of live tracks
    pub fn num_tracks(&self) -> usize {
        self.inner.lock().track_store().len()
    }

    /// Run a closure with exclusive access to the engine
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut dyn FusionEngine) -> T) -> T {
        let mut guard = self.inner.lock();
        f(guard.as_mut())
    }
}

impl fmt::Debug for SharedFusionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedFusionEngine")
            .field("name", &self.name())
            .finish()
    }
}
