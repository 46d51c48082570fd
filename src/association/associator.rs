//! Gated one-to-one association of observations to tracks.
//!
//! Rows of the cost matrix are observations in frame order, columns are
//! tracks in ascending id order. The Hungarian solver returns the
//! maximum-cardinality, minimum-cost assignment over the finite entries.

use nalgebra::DMatrix;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::cost::association_cost;
use crate::common::association::hungarian::hungarian;
use crate::fusion::config::AssociationParams;
use crate::fusion::track::{Track, TrackId, TrackStore};
use crate::fusion::types::{Observation, SensorId};

/// Outcome of associating one frame
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationResult {
    /// `(observation index, track)` pairs in observation order
    pub matches: Vec<(usize, TrackId)>,
    /// Observations without a track, in frame order
    pub unmatched_observations: Vec<usize>,
    /// Tracks without an observation, in id order
    pub unmatched_tracks: Vec<TrackId>,
    /// Gated cost matrix (observations × tracks)
    pub cost: DMatrix<f64>,
    /// Sum of the matched costs
    pub total_cost: f64,
}

impl AssociationResult {
    /// Number of matched pairs
    pub fn num_matches(&self) -> usize {
        self.matches.len()
    }

    /// Track matched to an observation, if any
    pub fn track_for(&self, observation: usize) -> Option<TrackId> {
        self.matches
            .iter()
            .find(|(o, _)| *o == observation)
            .map(|(_, t)| *t)
    }
}

/// Gated Hungarian associator
#[derive(Debug, Clone, Default)]
pub struct GatedAssociator {
    params: AssociationParams,
}

impl GatedAssociator {
    /// Create an associator
    pub fn new(params: AssociationParams) -> Self {
        Self { params }
    }

    /// Cost weights and gates in use
    pub fn params(&self) -> &AssociationParams {
        &self.params
    }

    /// Build the gated cost matrix (observations × tracks).
    pub fn cost_matrix(&self, sensor: &SensorId, observations: &[Observation], tracks: &[&Track]) -> DMatrix<f64> {
        let row = |obs: &Observation| -> Vec<f64> {
            tracks
                .iter()
                .map(|t| association_cost(obs, sensor, t, &self.params))
                .collect()
        };

        #[cfg(feature = "rayon")]
        let rows: Vec<Vec<f64>> = observations.par_iter().map(row).collect();

        #[cfg(not(feature = "rayon"))]
        let rows: Vec<Vec<f64>> = observations.iter().map(row).collect();

        DMatrix::from_fn(observations.len(), tracks.len(), |i, j| rows[i][j])
    }

    /// Associate a frame's observations against every track in the store.
    pub fn associate(&self, sensor: &SensorId, observations: &[Observation], store: &TrackStore) -> AssociationResult {
        let tracks: Vec<&Track> = store.iter().collect();
        let ids: Vec<TrackId> = tracks.iter().map(|t| t.id).collect();
        let cost = self.cost_matrix(sensor, observations, &tracks);

        if observations.is_empty() || tracks.is_empty() {
            return AssociationResult {
                matches: Vec::new(),
                unmatched_observations: (0..observations.len()).collect(),
                unmatched_tracks: ids,
                cost,
                total_cost: 0.0,
            };
        }

        let solution = hungarian(&cost);
        let matches: Vec<(usize, TrackId)> = solution.pairs().map(|(o, t)| (o, ids[t])).collect();
        let unmatched_observations = solution
            .assignment
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_none())
            .map(|(o, _)| o)
            .collect();
        let unmatched_tracks = solution
            .column_assignment(ids.len())
            .iter()
            .zip(&ids)
            .filter(|(a, _)| a.is_none())
            .map(|(_, id)| *id)
            .collect();

        log::trace!(
            "[{}] association: {} observations, {} tracks, {} matches, cost {:.4}",
            sensor,
            observations.len(),
            ids.len(),
            matches.len(),
            solution.cost
        );

        AssociationResult {
            matches,
            unmatched_observations,
            unmatched_tracks,
            cost,
            total_cost: solution.cost,
        }
    }
}
