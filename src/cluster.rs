//! Read-only snapshots of the micro-cluster populations, for drift analysis.

use std::collections::HashMap;

use serde::Serialize;

use crate::{
    denstream::DenStream,
    micro_cluster::{McId, MicroCluster},
    space::RealPoint,
};

/// Summary of a micro-cluster and of the cases it holds.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cluster {
    pub id: McId,
    pub centroid: RealPoint,
    pub weight: f64,
    /// in case index order
    pub case_ids: Vec<String>,
}

impl DenStream {
    /// Summaries of the potential micro-clusters.
    pub fn generate_clusters(&self) -> Vec<Cluster> {
        self.summarize(&self.p_micro_clusters)
    }

    /// Summaries of the outlier micro-clusters.
    pub fn generate_outlier_clusters(&self) -> Vec<Cluster> {
        self.summarize(&self.o_micro_clusters)
    }

    fn summarize(&self, micro_clusters: &[MicroCluster]) -> Vec<Cluster> {
        let mut members: HashMap<McId, Vec<String>> = HashMap::new();
        for (case_id, mc_id) in &self.all_cases {
            members.entry(*mc_id).or_default().push(case_id.clone());
        }
        micro_clusters
            .iter()
            .map(|mc| Cluster {
                id: mc.id,
                centroid: if mc.weight > 0. {
                    mc.centroid()
                } else {
                    mc.cf.clone()
                },
                weight: mc.weight,
                case_ids: members.remove(&mc.id).unwrap_or_default(),
            })
            .collect()
    }
}
