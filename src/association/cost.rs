//! Observation-to-track association cost.
//!
//! The cost is a weighted sum of geometric and semantic disagreements between
//! a world-frame observation and a track predicted to the observation's
//! timestamp:
//!
//! ```text
//! cost = w_center      * |p_o - p_t|_xy
//!      + w_size        * |size_o - size_t|          (both shapes known)
//!      + w_orientation * heading_difference(θo, θt)  (both shapes known)
//!      + type_mismatch_penalty                      (argmax disagree, neither unknown)
//!      + w_time_gap    * |t_o - t_last_update|
//! ```
//!
//! A sensor re-reporting the local id it last bound to the track gets the
//! total multiplied by `id_consistency_factor`. Gated pairs cost
//! `f64::INFINITY`.

use crate::common::linalg::heading_difference;
use crate::components::prediction::predicted_position;
use crate::fusion::config::AssociationParams;
use crate::fusion::track::Track;
use crate::fusion::types::{Observation, SensorId};

/// Breakdown of one candidate pair's cost
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostTerms {
    /// Horizontal center distance (m)
    pub center_distance: f64,
    /// Euclidean size difference, when both shapes are known
    pub size_difference: Option<f64>,
    /// Heading difference in `[0, π/2]`, when both shapes are known
    pub heading_difference: Option<f64>,
    /// Most probable classes disagree
    pub type_mismatch: bool,
    /// Seconds between the observation and the track state
    pub time_gap: f64,
    /// The sensor reported the same local id last time
    pub same_local_id: bool,
}

impl CostTerms {
    /// Measure every disagreement between an observation and a track.
    pub fn measure(obs: &Observation, sensor: &SensorId, track: &Track) -> Self {
        let predicted = predicted_position(track, obs.timestamp);
        let center_distance = (obs.position.mean.xy() - predicted.xy()).norm();

        let (size_difference, heading_diff) = match (&obs.shape, &track.shape) {
            (Some(o), Some(t)) => (
                Some((o.size - t.size).norm()),
                Some(heading_difference(o.theta, t.theta)),
            ),
            _ => (None, None),
        };

        let obs_type = obs.type_probs.argmax();
        let track_type = track.type_probs.argmax();
        let type_mismatch =
            obs_type != track_type && !obs_type.is_unknown() && !track_type.is_unknown();

        let same_local_id = track
            .contributions
            .get(sensor)
            .map_or(false, |c| c.local_id == obs.id);

        Self {
            center_distance,
            size_difference,
            heading_difference: heading_diff,
            type_mismatch,
            time_gap: (obs.timestamp - track.last_update_time).abs(),
            same_local_id,
        }
    }

    /// Weighted total before gating
    pub fn total(&self, params: &AssociationParams) -> f64 {
        let mut cost = params.center_weight * self.center_distance
            + params.size_weight * self.size_difference.unwrap_or(0.0)
            + params.orientation_weight * self.heading_difference.unwrap_or(0.0)
            + params.time_gap_weight * self.time_gap;
        if self.type_mismatch {
            cost += params.type_mismatch_penalty;
        }
        if self.same_local_id {
            cost *= params.id_consistency_factor;
        }
        cost
    }
}

/// Gated association cost; `f64::INFINITY` when the pair is not a candidate.
pub fn association_cost(
    obs: &Observation,
    sensor: &SensorId,
    track: &Track,
    params: &AssociationParams,
) -> f64 {
    let terms = CostTerms::measure(obs, sensor, track);
    if !(terms.center_distance <= params.max_center_distance) {
        return f64::INFINITY;
    }
    let cost = terms.total(params);
    if cost.is_finite() && cost <= params.gate_cost {
        cost
    } else {
        f64::INFINITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::track::{SensorContribution, TrackId, TrackStatus, STATE_DIM};
    use crate::fusion::types::{ObjectType, SensorModality, Shape, TypeDistribution};
    use nalgebra::{DMatrix, DVector, Matrix3, Vector3};

    fn track_at(x: f64, y: f64, vx: f64) -> Track {
        Track::new(
            TrackId(1),
            TrackStatus::Confirmed,
            DVector::from_vec(vec![x, y, 0.0, vx, 0.0, 0.0]),
            DMatrix::identity(STATE_DIM, STATE_DIM),
            0.0,
            SensorId::from("lidar"),
            8,
        )
    }

    fn obs_at(x: f64, y: f64, t: f64) -> Observation {
        Observation::new(3, t, Vector3::new(x, y, 0.0), Matrix3::identity())
    }

    fn params() -> AssociationParams {
        AssociationParams::default()
    }

    #[test]
    fn test_cost_uses_predicted_position() {
        let track = track_at(0.0, 0.0, 10.0);
        let obs = obs_at(1.0, 0.0, 0.1);
        let terms = CostTerms::measure(&obs, &SensorId::from("radar"), &track);
        assert!(terms.center_distance < 1e-12);
        assert!((terms.time_gap - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_distance_gate() {
        let track = track_at(0.0, 0.0, 0.0);
        let obs = obs_at(params().max_center_distance + 0.5, 0.0, 0.0);
        assert_eq!(
            association_cost(&obs, &SensorId::from("radar"), &track, &params()),
            f64::INFINITY
        );
    }

    #[test]
    fn test_cost_gate() {
        let track = track_at(0.0, 0.0, 0.0);
        let mut p = params();
        p.gate_cost = 0.5;
        let obs = obs_at(1.0, 0.0, 0.0);
        assert_eq!(association_cost(&obs, &SensorId::from("radar"), &track, &p), f64::INFINITY);
    }

    #[test]
    fn test_type_mismatch_penalty() {
        let mut track = track_at(0.0, 0.0, 0.0);
        track.type_probs = TypeDistribution::with_probability(ObjectType::Vehicle, 0.9);
        let sensor = SensorId::from("camera");

        let ped = obs_at(0.0, 0.0, 0.0).with_type(TypeDistribution::with_probability(ObjectType::Pedestrian, 0.9));
        let unknown = obs_at(0.0, 0.0, 0.0);

        let c_ped = association_cost(&ped, &sensor, &track, &params());
        let c_unknown = association_cost(&unknown, &sensor, &track, &params());
        assert!((c_ped - c_unknown - params().type_mismatch_penalty).abs() < 1e-12);
    }

    #[test]
    fn test_heading_is_half_turn_symmetric() {
        let mut track = track_at(0.0, 0.0, 0.0);
        track.shape = Some(Shape::new(Vector3::new(4.0, 2.0, 1.5), Vector3::repeat(0.1), 0.1, 0.01));
        let obs = obs_at(0.0, 0.0, 0.0).with_shape(Shape::new(
            Vector3::new(4.0, 2.0, 1.5),
            Vector3::repeat(0.1),
            0.1 + std::f64::consts::PI,
            0.01,
        ));
        let terms = CostTerms::measure(&obs, &SensorId::from("lidar"), &track);
        assert!(terms.heading_difference.unwrap() < 1e-9);
        assert!(terms.size_difference.unwrap() < 1e-12);
    }

    #[test]
    fn test_id_consistency_discount() {
        let mut track = track_at(0.0, 0.0, 0.0);
        let sensor = SensorId::from("radar");
        track.contributions.insert(
            sensor.clone(),
            SensorContribution {
                modality: SensorModality::Radar,
                local_id: 3,
                last_seen: 0.0,
                type_probs: TypeDistribution::unknown(),
                confidence: 1.0,
            },
        );
        let obs = obs_at(1.0, 0.0, 0.0);
        let discounted = association_cost(&obs, &sensor, &track, &params());
        let other = association_cost(&obs, &SensorId::from("radar_rear"), &track, &params());
        assert!((discounted - other * params().id_consistency_factor).abs() < 1e-12);
    }
}
