//! Periodic pruning of the micro-cluster populations.
//!
//! Potential micro-clusters whose weight faded below `β·μ` are demoted to outliers, or dropped
//! when they are no longer viable outliers either. Outlier micro-clusters below the viability
//! threshold are dropped. Cases held by a dropped micro-cluster leave the case index in the same pass.

use std::collections::HashSet;

use log::debug;

use crate::{
    denstream::DenStream,
    micro_cluster::{McId, MicroCluster},
};

/// What a maintenance pass changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Maintenance {
    pub demoted: Vec<McId>,
    pub removed_potential: Vec<McId>,
    pub removed_outliers: Vec<McId>,
    /// number of cases dropped from the case index
    pub released_cases: usize,
}

impl Maintenance {
    pub fn is_change(&self) -> bool {
        !(self.demoted.is_empty()
            && self.removed_potential.is_empty()
            && self.removed_outliers.is_empty())
    }
}

impl DenStream {
    /// Ticks between two maintenance passes.
    pub fn maintenance_period(&self) -> u64 {
        self.config.maintenance_period()
    }

    /// Minimal weight, at the current time, of a viable outlier micro-cluster created at `creation_time`.
    pub fn outlier_threshold(&self, creation_time: u64) -> f64 {
        self.config.outlier_threshold(self.time, creation_time)
    }

    /// Runs a maintenance pass. Populations are rebuilt rather than mutated while scanned.
    pub fn maintain(&mut self) -> Maintenance {
        let mut report = Maintenance::default();
        let promotion_weight = self.config.promotion_weight();

        let mut demoted: Vec<MicroCluster> = vec![];
        let potentials = std::mem::take(&mut self.p_micro_clusters);
        for mc in potentials {
            if mc.weight >= promotion_weight {
                self.p_micro_clusters.push(mc);
            } else if mc.weight >= self.outlier_threshold(mc.creation_time) {
                debug!("demoting micro-cluster {} (weight {})", mc.id, mc.weight);
                report.demoted.push(mc.id);
                demoted.push(mc);
            } else {
                debug!("removing potential micro-cluster {} (weight {})", mc.id, mc.weight);
                report.removed_potential.push(mc.id);
            }
        }

        let outliers = std::mem::take(&mut self.o_micro_clusters);
        for mc in outliers {
            if mc.weight >= self.outlier_threshold(mc.creation_time) {
                self.o_micro_clusters.push(mc);
            } else {
                debug!("removing outlier micro-cluster {} (weight {})", mc.id, mc.weight);
                report.removed_outliers.push(mc.id);
            }
        }
        self.o_micro_clusters.extend(demoted);

        let removed: HashSet<McId> = report
            .removed_potential
            .iter()
            .chain(&report.removed_outliers)
            .copied()
            .collect();
        if !removed.is_empty() {
            let before = self.all_cases.len();
            self.all_cases.retain(|_, mc_id| !removed.contains(&*mc_id));
            report.released_cases = before - self.all_cases.len();
        }
        report
    }
}
