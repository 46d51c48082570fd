//! Track birth, confirmation and retirement
//!
//! - An unmatched observation from a main sensor spawns a confirmed track.
//!   Other sensors spawn tentative tracks when the strategy allows it.
//! - A tentative track is confirmed once a sensor other than its origin
//!   matches it within `corroboration_window` of its birth.
//! - Confirmed tracks no observation matched for longer than
//!   `max_miss_duration` and
//!   tentative tracks never corroborated in time are deleted. So is any
//!   track whose update failed numerically.
//!
//! All durations are measured against the current frame timestamp.

use std::fmt;

use super::config::LifecycleParams;
use super::estimator::{StateUpdater, TrackEstimator};
use super::track::{Track, TrackId, TrackStatus, TrackStore};
use super::types::{Observation, SensorId, SensorModality};

/// Why a track was deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetireReason {
    /// Confirmed track not updated for longer than `max_miss_duration`
    MissedTooLong,
    /// Tentative track not corroborated within `corroboration_window`
    NotCorroborated,
    /// State could not be kept numerically valid
    NumericalFailure,
}

impl fmt::Display for RetireReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetireReason::MissedTooLong => write!(f, "missed too long"),
            RetireReason::NotCorroborated => write!(f, "not corroborated"),
            RetireReason::NumericalFailure => write!(f, "numerical failure"),
        }
    }
}

/// Lifecycle changes made during one cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LifecycleEvents {
    /// Tracks created this cycle
    pub born: Vec<TrackId>,
    /// Tentative tracks confirmed this cycle
    pub promoted: Vec<TrackId>,
    /// Tracks deleted this cycle
    pub retired: Vec<(TrackId, RetireReason)>,
}

/// Creates, confirms and retires tracks.
#[derive(Debug, Clone)]
pub struct TrackLifecycleManager {
    params: LifecycleParams,
    main_sensors: Vec<SensorId>,
}

impl TrackLifecycleManager {
    /// Create a manager for the given main sensors
    pub fn new(params: LifecycleParams, main_sensors: Vec<SensorId>) -> Self {
        Self { params, main_sensors }
    }

    /// Lifecycle parameters
    pub fn params(&self) -> &LifecycleParams {
        &self.params
    }

    /// Main sensors in priority order
    pub fn main_sensors(&self) -> &[SensorId] {
        &self.main_sensors
    }

    /// True when the sensor may confirm tracks on its own
    pub fn is_main(&self, sensor: &SensorId) -> bool {
        self.main_sensors.contains(sensor)
    }

    /// Spawn a track for an unmatched observation.
    ///
    /// Returns `None` when the sensor is not allowed to start tracks.
    pub fn spawn<U: StateUpdater>(
        &self,
        store: &mut TrackStore,
        estimator: &TrackEstimator<U>,
        obs: &Observation,
        sensor: &SensorId,
        modality: SensorModality,
    ) -> Option<TrackId> {
        let status = if self.is_main(sensor) {
            TrackStatus::Confirmed
        } else if self.params.allow_non_main_birth {
            TrackStatus::Tentative
        } else {
            return None;
        };

        let (mean, covariance) = estimator.initial_state(obs);
        let id = store.allocate_id();
        let mut track = Track::new(
            id,
            status,
            mean,
            covariance,
            obs.timestamp,
            sensor.clone(),
            self.params.trajectory_capacity,
        );
        estimator.initialize(&mut track, obs, sensor, modality);
        store.insert(track);

        log::debug!(
            "{} born {:?} from {} obs {} at ({:.2}, {:.2})",
            id,
            status,
            sensor,
            obs.id,
            obs.position.mean.x,
            obs.position.mean.y
        );
        Some(id)
    }

    /// Confirm a tentative track matched by a corroborating sensor.
    ///
    /// Returns true when the track was promoted.
    pub fn corroborate(&self, track: &mut Track, sensor: &SensorId, timestamp: f64) -> bool {
        if track.status != TrackStatus::Tentative || *sensor == track.origin_sensor {
            return false;
        }
        if timestamp - track.birth_time > self.params.corroboration_window {
            return false;
        }
        track.status = TrackStatus::Confirmed;
        log::debug!("{} confirmed by {}", track.id, sensor);
        true
    }

    /// Delete tracks that outlived their miss or corroboration budget.
    pub fn retire(&self, store: &mut TrackStore, now: f64) -> Vec<(TrackId, RetireReason)> {
        let expired: Vec<(TrackId, RetireReason)> = store
            .iter()
            .filter_map(|track| self.expiry(track, now).map(|reason| (track.id, reason)))
            .collect();
        for (id, reason) in &expired {
            store.remove(*id);
            log::debug!("{} retired: {}", id, reason);
        }
        expired
    }

    /// Why a track should be deleted at `now`, if it should.
    pub fn expiry(&self, track: &Track, now: f64) -> Option<RetireReason> {
        match track.status {
            TrackStatus::Confirmed if track.time_since_match(now) > self.params.max_miss_duration => {
                Some(RetireReason::MissedTooLong)
            }
            TrackStatus::Tentative if track.age(now) > self.params.corroboration_window => {
                Some(RetireReason::NotCorroborated)
            }
            _ => None,
        }
    }

    /// Delete a track whose update failed.
    pub fn drop_failed(&self, store: &mut TrackStore, id: TrackId) -> Option<Track> {
        store.remove(id)
    }
}
