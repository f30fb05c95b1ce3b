use serde::Serialize;

use crate::{
    case::Case,
    space::{self, RealPoint},
};

/// Micro-cluster identifier, assigned by the engine and never reused.
pub type McId = u64;

/// Fading summary of the points absorbed by a micro-cluster.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MicroCluster {
    pub(crate) id: McId,
    pub(crate) n_features: usize,
    pub(crate) creation_time: u64,
    pub(crate) lambda: f64,
    /// linear sum
    pub(crate) cf: RealPoint,
    /// sum of squares
    pub(crate) cf2: RealPoint,
    pub(crate) weight: f64,
}

impl MicroCluster {
    /// Builds a new empty micro-cluster.
    pub fn new(id: McId, n_features: usize, creation_time: u64, lambda: f64) -> Self {
        MicroCluster {
            id,
            n_features,
            creation_time,
            lambda,
            cf: vec![0.; n_features],
            cf2: vec![0.; n_features],
            weight: 0.,
        }
    }

    /// Builds a micro-cluster from already accumulated statistics.
    /// `cf` and `cf2` must have the same length.
    pub fn from_stats(
        id: McId,
        creation_time: u64,
        lambda: f64,
        cf: RealPoint,
        cf2: RealPoint,
        weight: f64,
    ) -> Self {
        debug_assert_eq!(cf.len(), cf2.len());
        MicroCluster {
            id,
            n_features: cf.len(),
            creation_time,
            lambda,
            cf,
            cf2,
            weight,
        }
    }

    pub fn id(&self) -> McId {
        self.id
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn creation_time(&self) -> u64 {
        self.creation_time
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn cf(&self) -> &[f64] {
        &self.cf
    }

    pub fn cf2(&self) -> &[f64] {
        &self.cf2
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// `CF / weight`. The micro-cluster must not be empty.
    pub fn centroid(&self) -> RealPoint {
        debug_assert!(self.weight > 0., "centroid of an empty micro-cluster");
        self.cf.iter().map(|x| x / self.weight).collect()
    }

    pub fn radius(&self) -> f64 {
        radius(&self.cf, &self.cf2, self.weight)
    }

    /// The radius this micro-cluster would have after absorbing `point`.
    pub fn radius_with_new_point(&self, point: &[f64]) -> f64 {
        let cf = space::add(&self.cf, point);
        let cf2 = space::add_squared(&self.cf2, point);
        radius(&cf, &cf2, self.weight + 1.)
    }

    /// Absorbs the feature point of a case.
    pub fn update(&mut self, case: &Case) {
        self.insert(&case.point());
    }

    /// Absorbs a feature point, which must have `n_features` coordinates.
    pub(crate) fn insert(&mut self, point: &[f64]) {
        debug_assert_eq!(self.n_features, point.len(), "feature point dimension");
        self.cf = space::add(&self.cf, point);
        self.cf2 = space::add_squared(&self.cf2, point);
        self.weight += 1.;
    }

    /// Fades the statistics by one time step.
    pub fn decay(&mut self) {
        let factor = 2f64.powf(-self.lambda);
        space::scale(&mut self.cf, factor);
        space::scale(&mut self.cf2, factor);
        self.weight *= factor;
    }
}

/// Square root of the summed per-dimension variances, zero for an empty summary.
/// Variances made negative by rounding are clamped to zero.
fn radius(cf: &[f64], cf2: &[f64], weight: f64) -> f64 {
    if weight <= 0. {
        return 0.;
    }
    cf.iter()
        .zip(cf2)
        .map(|(ls, ss)| {
            let mean = ls / weight;
            (ss / weight - mean * mean).max(0.)
        })
        .sum::<f64>()
        .sqrt()
}
