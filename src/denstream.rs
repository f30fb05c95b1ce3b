use std::collections::VecDeque;

use indexmap::IndexMap;
use log::{debug, info};

use crate::{
    case::Case,
    config::DenStreamConfig,
    error::DenStreamError,
    micro_cluster::{McId, MicroCluster},
    neighbors::GetClosest,
    space::{self, RealPoint},
};

/// The DenStream engine: two fading micro-cluster populations fed one case at a time.
#[derive(Clone, Debug)]
pub struct DenStream {
    pub(crate) config: DenStreamConfig,
    /// potential micro-clusters
    pub(crate) p_micro_clusters: Vec<MicroCluster>,
    /// outlier micro-clusters
    pub(crate) o_micro_clusters: Vec<MicroCluster>,
    pub(crate) time: u64,
    /// case id to the micro-cluster holding it
    pub(crate) all_cases: IndexMap<String, McId>,
    /// next unused micro-cluster id
    pub(crate) mc_id: McId,
    processed_cases: u64,
}

impl DenStream {
    /// Builds a new engine, failing on the first invalid parameter.
    pub fn new(config: DenStreamConfig) -> Result<Self, DenStreamError> {
        config.validate()?;
        Ok(Self {
            config,
            p_micro_clusters: vec![],
            o_micro_clusters: vec![],
            time: 0,
            all_cases: IndexMap::new(),
            mc_id: 0,
            processed_cases: 0,
        })
    }

    pub fn config(&self) -> &DenStreamConfig {
        &self.config
    }

    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn mc_id(&self) -> McId {
        self.mc_id
    }

    pub fn p_micro_clusters(&self) -> &[MicroCluster] {
        &self.p_micro_clusters
    }

    pub fn o_micro_clusters(&self) -> &[MicroCluster] {
        &self.o_micro_clusters
    }

    pub fn all_cases(&self) -> &IndexMap<String, McId> {
        &self.all_cases
    }

    pub fn euclidean_distance(p1: &[f64], p2: &[f64]) -> f64 {
        space::euclid_dist(p1, p2)
    }

    /// Finds the micro-cluster whose centroid is the closest to `point`,
    /// returning its index in `micro_clusters`, itself and the distance.
    /// A micro-cluster faded down to a null weight has no centroid and lies at an infinite distance.
    pub fn find_closest_mc<'a>(
        point: &[f64],
        micro_clusters: &'a [MicroCluster],
    ) -> Result<(usize, &'a MicroCluster, f64), DenStreamError> {
        micro_clusters
            .iter()
            .get_closest(point, |p: &[f64], mc: &MicroCluster| {
                if mc.weight > 0. {
                    Self::euclidean_distance(p, &mc.centroid())
                } else {
                    f64::INFINITY
                }
            })
            .map(|closest| closest.into_parts())
            .ok_or(DenStreamError::NoMicroCluster)
    }

    /// Absorbs the case into the closest micro-cluster able to take it, or creates a new outlier micro-cluster.
    /// Returns the id of the micro-cluster now holding the case.
    pub fn add_point(&mut self, case: &Case) -> Result<McId, DenStreamError> {
        let point = self.case_point(case)?;

        if let Some((i, radius)) = Self::closest_radius(&point, &self.p_micro_clusters) {
            if radius <= self.config.epsilon {
                let mc = &mut self.p_micro_clusters[i];
                mc.insert(&point);
                return Ok(mc.id);
            }
        }

        if let Some((i, radius)) = Self::closest_radius(&point, &self.o_micro_clusters) {
            if radius <= self.config.epsilon {
                let mc = &mut self.o_micro_clusters[i];
                mc.insert(&point);
                let id = mc.id;
                if mc.weight >= self.config.promotion_weight() {
                    let mc = self.o_micro_clusters.remove(i);
                    debug!("promoting micro-cluster {} (weight {})", mc.id, mc.weight);
                    self.p_micro_clusters.push(mc);
                }
                return Ok(id);
            }
        }

        Ok(self.create_outlier(&point))
    }

    /// Closest micro-cluster index and its radius once `point` is absorbed, `None` when the population is empty.
    fn closest_radius(point: &[f64], micro_clusters: &[MicroCluster]) -> Option<(usize, f64)> {
        let (i, mc, _) = Self::find_closest_mc(point, micro_clusters).ok()?;
        Some((i, mc.radius_with_new_point(point)))
    }

    fn create_outlier(&mut self, point: &[f64]) -> McId {
        let id = self.next_id();
        let mut mc = MicroCluster::new(id, self.config.n_features, self.time, self.config.lambda);
        mc.insert(point);
        debug!("new outlier micro-cluster {} at time {}", id, self.time);
        self.o_micro_clusters.push(mc);
        id
    }

    fn next_id(&mut self) -> McId {
        let id = self.mc_id;
        self.mc_id += 1;
        id
    }

    /// Fades every micro-cluster of both populations but the one identified by `excluded`,
    /// which already reflects the current step through its absorption.
    pub fn decay_micro_clusters(&mut self, excluded: McId) {
        self.p_micro_clusters
            .iter_mut()
            .chain(self.o_micro_clusters.iter_mut())
            .filter(|mc| mc.id != excluded)
            .for_each(|mc| mc.decay());
    }

    /// Processes one streamed case: advances time, absorbs the case, fades the other
    /// micro-clusters, records the case membership and runs the maintenance when due.
    pub fn train(&mut self, case: &Case) -> Result<McId, DenStreamError> {
        self.case_point(case)?;
        self.processed_cases += 1;
        let ticked = self.processed_cases % self.config.stream_speed == 0;
        if ticked {
            self.time += 1;
        }
        let mc_id = self.add_point(case)?;
        self.decay_micro_clusters(mc_id);
        self.all_cases.insert(case.id.clone(), mc_id);
        if ticked && self.time % self.maintenance_period() == 0 {
            let report = self.maintain();
            if report.is_change() {
                info!("maintenance at time {}: {:?}", self.time, report);
            }
        }
        Ok(mc_id)
    }

    /// Cold start: seeds potential micro-clusters from the epsilon-connected groups of a batch of cases.
    /// Groups smaller than the configured minimum are left unclustered.
    pub fn dbscan(&mut self, cases: &[Case]) -> Result<(), DenStreamError> {
        let points = cases
            .iter()
            .map(|case| self.case_point(case))
            .collect::<Result<Vec<_>, _>>()?;
        let components = connected_components(&points, self.config.epsilon);
        let mut seeded = 0;
        for component in components {
            if component.len() < self.config.cold_start_min_size {
                continue;
            }
            let n = self.config.n_features;
            let (cf, cf2) = component.iter().fold(
                (vec![0.; n], vec![0.; n]),
                |(cf, cf2), &i| (space::add(&cf, &points[i]), space::add_squared(&cf2, &points[i])),
            );
            let id = self.next_id();
            let mc = MicroCluster::from_stats(
                id,
                self.time,
                self.config.lambda,
                cf,
                cf2,
                component.len() as f64,
            );
            self.p_micro_clusters.push(mc);
            for &i in &component {
                self.all_cases.insert(cases[i].id.clone(), id);
            }
            seeded += 1;
        }
        info!(
            "cold start: {} potential micro-clusters from {} cases",
            seeded,
            cases.len()
        );
        Ok(())
    }

    fn case_point(&self, case: &Case) -> Result<RealPoint, DenStreamError> {
        let point = case.point();
        if point.len() != self.config.n_features {
            return Err(DenStreamError::DimensionMismatch(
                case.id.clone(),
                point.len(),
                self.config.n_features,
            ));
        }
        if !point.iter().all(|x| x.is_finite()) {
            return Err(DenStreamError::NonFiniteFeature(case.id.clone()));
        }
        Ok(point)
    }
}

/// Groups the points connected through chains of neighbors closer than `epsilon`.
/// Components come in order of their first point, members in visiting order.
/// Neighbors are looked up among the unvisited points when a point is dequeued.
fn connected_components(points: &[RealPoint], epsilon: f64) -> Vec<Vec<usize>> {
    let mut visited = vec![false; points.len()];
    let mut components = vec![];
    for root in 0..points.len() {
        if visited[root] {
            continue;
        }
        visited[root] = true;
        let mut component = vec![];
        let mut process_queue = VecDeque::from([root]);
        while let Some(i) = process_queue.pop_front() {
            component.push(i);
            for j in 0..points.len() {
                if !visited[j] && space::euclid_dist(&points[i], &points[j]) <= epsilon {
                    visited[j] = true;
                    process_queue.push_back(j);
                }
            }
        }
        components.push(component);
    }
    components
}

#[cfg(test)]
pub(crate) mod tests {
    use approx_eq::assert_approx_eq;

    use crate::denstream::*;

    pub(crate) fn build_denstream() -> DenStream {
        DenStream::new(DenStreamConfig::new(2, 0.15, 0.3, 0.1, 4., 1000)).unwrap()
    }

    pub(crate) fn case_at(id: &str, graph_distance: f64, time_distance: f64) -> Case {
        let mut case = Case::new(id);
        case.set_distances(graph_distance, time_distance);
        case
    }

    fn with_stats(id: McId, cf: [f64; 2], cf2: [f64; 2], weight: f64) -> MicroCluster {
        MicroCluster::from_stats(id, 0, 0.15, cf.to_vec(), cf2.to_vec(), weight)
    }

    #[test]
    fn test_initial_value() {
        let denstream = build_denstream();
        assert_eq!(2, denstream.config.n_features);
        assert_eq!(0.15, denstream.config.lambda);
        assert_eq!(0.3, denstream.config.beta);
        assert_eq!(0.1, denstream.config.epsilon);
        assert_eq!(4., denstream.config.mu);
        assert_eq!(1000, denstream.config.stream_speed);
        assert!(denstream.p_micro_clusters.is_empty());
        assert!(denstream.o_micro_clusters.is_empty());
        assert_eq!(0, denstream.time);
        assert!(denstream.all_cases.is_empty());
        assert_eq!(0, denstream.mc_id);
    }

    #[test]
    fn test_invalid_config() {
        let config = DenStreamConfig::new(2, -0.15, 0.3, 0.1, 4., 1000);
        assert!(matches!(
            DenStream::new(config),
            Err(DenStreamError::InvalidParameter(_, _, _))
        ));
    }

    #[test]
    fn test_euclidean_distance() {
        assert_eq!(1., DenStream::euclidean_distance(&[0., 0.], &[0., 1.]));
    }

    #[test]
    fn test_find_closest_mc() {
        let mut denstream = build_denstream();
        let point = [0., 0.];
        assert_eq!(
            Err(DenStreamError::NoMicroCluster),
            DenStream::find_closest_mc(&point, &denstream.p_micro_clusters)
        );
        assert_eq!(
            Err(DenStreamError::NoMicroCluster),
            DenStream::find_closest_mc(&point, &denstream.o_micro_clusters)
        );

        denstream.p_micro_clusters = vec![
            with_stats(0, [0., 1.], [0., 0.], 2.),
            with_stats(1, [0., 1.], [0., 0.], 1.),
        ];
        let (i, mc, dist) = DenStream::find_closest_mc(&point, &denstream.p_micro_clusters).unwrap();
        assert_eq!(0, i);
        assert_eq!(vec![0., 1.], mc.cf);
        assert_eq!(2., mc.weight);
        assert_eq!(0.5, dist);

        let (i, mc, dist) = DenStream::find_closest_mc(&[0., 2.], &denstream.p_micro_clusters).unwrap();
        assert_eq!(1, i);
        assert_eq!(1., mc.weight);
        assert_eq!(1., dist);

        denstream.o_micro_clusters = vec![
            with_stats(4, [0., 3.], [0., 0.], 2.),
            with_stats(5, [0., 1.], [0., 0.], 3.),
            with_stats(6, [0., 2.], [0., 0.], 1.),
        ];
        let (i, mc, _) = DenStream::find_closest_mc(&[0., 3.], &denstream.o_micro_clusters).unwrap();
        assert_eq!(2, i);
        assert_eq!(vec![0., 2.], mc.cf);
        assert_eq!(1., mc.weight);
    }

    #[test]
    fn test_find_closest_mc_single() {
        let micro_clusters = vec![with_stats(9, [3., 4.], [0., 0.], 1.)];
        let (i, mc, dist) = DenStream::find_closest_mc(&[0., 0.], &micro_clusters).unwrap();
        assert_eq!((0, 9, 5.), (i, mc.id, dist));
    }

    #[test]
    fn test_add_point() {
        let mut denstream = build_denstream();
        let case = case_at("3", 0.75, 0.4);
        denstream.p_micro_clusters.push(with_stats(10, [0.5, -0.5], [0.5, -0.1], 10.));
        denstream.o_micro_clusters.push(with_stats(11, [0., 0.], [0., 0.], 5.));
        denstream.mc_id = 2;

        let mc_id = denstream.add_point(&case).unwrap();
        assert_eq!(2, mc_id);
        assert_eq!(3, denstream.mc_id);
        assert_eq!(2, denstream.o_micro_clusters.len());
        let created = &denstream.o_micro_clusters[1];
        assert_eq!(0., created.radius());
        assert_eq!(1., created.weight);
        assert_eq!(case.point(), created.cf);
        assert_eq!(space::add_squared(&[0., 0.], &case.point()), created.cf2);

        let cf = created.cf.clone();
        let cf2 = created.cf2.clone();
        let mc_id = denstream.add_point(&case).unwrap();
        assert_eq!(2, mc_id);
        assert_eq!(1, denstream.o_micro_clusters.len());
        assert_eq!(2, denstream.p_micro_clusters.len());
        let promoted = &denstream.p_micro_clusters[1];
        assert_eq!(2., promoted.weight);
        assert_eq!(space::add(&cf, &case.point()), promoted.cf);
        assert_eq!(space::add_squared(&cf2, &case.point()), promoted.cf2);
    }

    #[test]
    fn test_add_point_absorbed_by_potential() {
        let mut denstream = build_denstream();
        denstream.p_micro_clusters.push(with_stats(0, [0.6, 0.6], [0.18, 0.18], 2.));
        denstream.mc_id = 1;
        let mc_id = denstream.add_point(&case_at("1", 0.3, 0.3)).unwrap();
        assert_eq!(0, mc_id);
        assert_eq!(1, denstream.mc_id);
        assert!(denstream.o_micro_clusters.is_empty());
        assert_eq!(3., denstream.p_micro_clusters[0].weight);
    }

    #[test]
    fn test_add_point_absorbed_by_outlier_without_promotion() {
        let mut denstream = DenStream::new(DenStreamConfig::new(2, 0.15, 1., 0.1, 4., 1000)).unwrap();
        denstream.add_point(&case_at("1", 0.3, 0.3)).unwrap();
        denstream.add_point(&case_at("2", 0.3, 0.3)).unwrap();
        assert!(denstream.p_micro_clusters.is_empty());
        assert_eq!(1, denstream.o_micro_clusters.len());
        assert_eq!(2., denstream.o_micro_clusters[0].weight);
    }

    #[test]
    fn test_add_point_dimension_mismatch() {
        let mut denstream = DenStream::new(DenStreamConfig::new(3, 0.15, 0.3, 0.1, 4., 1000)).unwrap();
        assert_eq!(
            Err(DenStreamError::DimensionMismatch("1".into(), 2, 3)),
            denstream.add_point(&case_at("1", 0.3, 0.3))
        );
        assert!(denstream.o_micro_clusters.is_empty());
    }

    #[test]
    fn test_non_finite_feature() {
        let mut denstream = build_denstream();
        assert_eq!(
            Err(DenStreamError::NonFiniteFeature("1".into())),
            denstream.train(&case_at("1", f64::NAN, 0.3))
        );
        assert_eq!(
            Err(DenStreamError::NonFiniteFeature("2".into())),
            denstream.dbscan(&[case_at("1", 0.3, 0.3), case_at("2", 0.3, f64::INFINITY)])
        );
        assert!(denstream.o_micro_clusters.is_empty());
        assert!(denstream.p_micro_clusters.is_empty());
        assert!(denstream.all_cases.is_empty());
        assert_eq!(0, denstream.processed_cases);
    }

    #[test]
    fn test_decay_micro_clusters() {
        let mut denstream = build_denstream();
        denstream.p_micro_clusters = vec![
            with_stats(0, [5., 5.], [1., 1.], 5.),
            with_stats(1, [1., 5.], [3., 0.], 10.),
            with_stats(2, [0., 0.], [10., 2.], 3.),
        ];
        denstream.o_micro_clusters = vec![with_stats(3, [2., 2.], [4., 4.], 1.)];
        denstream.decay_micro_clusters(0);
        let factor = 2f64.powf(-0.15);

        let p = &denstream.p_micro_clusters;
        assert_eq!(vec![5., 5.], p[0].cf);
        assert_eq!(vec![1., 1.], p[0].cf2);
        assert_eq!(5., p[0].weight);

        assert_eq!(vec![factor, 5. * factor], p[1].cf);
        assert_eq!(vec![3. * factor, 0.], p[1].cf2);
        assert_eq!(10. * factor, p[1].weight);

        assert_eq!(vec![0., 0.], p[2].cf);
        assert_eq!(vec![10. * factor, 2. * factor], p[2].cf2);
        assert_eq!(3. * factor, p[2].weight);

        assert_eq!(factor, denstream.o_micro_clusters[0].weight);
    }

    #[test]
    fn test_dbscan() {
        let mut denstream = build_denstream();
        let cases = vec![
            case_at("1", 0.2, 0.3),
            case_at("2", 0.6, 0.9),
            case_at("3", 1., 0.1),
            case_at("4", 0.2, 0.3),
        ];
        denstream.dbscan(&cases).unwrap();
        assert_eq!(1, denstream.p_micro_clusters.len());
        assert!(denstream.o_micro_clusters.is_empty());
        let keys: Vec<&str> = denstream.all_cases.keys().map(|k| k.as_str()).collect();
        assert_eq!(vec!["1", "4"], keys);
        let mc = &denstream.p_micro_clusters[0];
        assert_eq!(0, mc.id);
        assert_eq!(2., mc.weight);
        assert_eq!(0, mc.creation_time);
        assert_eq!(0.15, mc.lambda);
        assert_approx_eq!(0.4, mc.cf[0], 1E-9);
        assert_approx_eq!(0.6, mc.cf[1], 1E-9);
        assert_eq!(1, denstream.mc_id);
    }

    #[test]
    fn test_dbscan_transitive_groups() {
        let mut denstream = build_denstream();
        let cases = vec![
            case_at("a", 0., 0.),
            case_at("b", 5., 5.),
            case_at("c", 0.08, 0.),
            case_at("d", 5., 5.05),
            case_at("e", 0.16, 0.),
        ];
        denstream.dbscan(&cases).unwrap();
        assert_eq!(2, denstream.p_micro_clusters.len());
        assert_eq!(3., denstream.p_micro_clusters[0].weight);
        assert_eq!(2., denstream.p_micro_clusters[1].weight);
        assert_eq!(Some(&0), denstream.all_cases.get("e"));
        assert_eq!(Some(&1), denstream.all_cases.get("d"));
    }

    #[test]
    fn test_connected_components() {
        let points = vec![vec![0., 0.], vec![1., 1.], vec![0., 0.05], vec![3., 3.]];
        assert_eq!(
            vec![vec![0, 2], vec![1], vec![3]],
            connected_components(&points, 0.1)
        );
        assert!(connected_components(&[], 0.1).is_empty());
    }

    #[test]
    fn test_connected_components_visiting_order() {
        let points = vec![
            vec![0., 0.],
            vec![0.3, 0.],
            vec![0.08, 0.],
            vec![0.22, 0.],
            vec![0.16, 0.],
        ];
        assert_eq!(vec![vec![0, 2, 4, 3, 1]], connected_components(&points, 0.1));
    }

    #[test]
    fn test_dbscan_many_identical_cases() {
        let mut denstream = build_denstream();
        let cases: Vec<Case> = (0..5000).map(|i| case_at(&i.to_string(), 0.4, 0.4)).collect();
        denstream.dbscan(&cases).unwrap();
        assert_eq!(1, denstream.p_micro_clusters.len());
        assert_eq!(5000., denstream.p_micro_clusters[0].weight);
        assert_eq!(5000, denstream.all_cases.len());
    }

    #[test]
    fn test_train() {
        let mut denstream =
            DenStream::new(DenStreamConfig::new(2, 0.15, 0.3, 0.1, 4., 2)).unwrap();
        let first = denstream.train(&case_at("1", 0.2, 0.2)).unwrap();
        assert_eq!(0, denstream.time);
        let second = denstream.train(&case_at("2", 0.9, 0.9)).unwrap();
        assert_eq!(1, denstream.time);
        assert_ne!(first, second);
        assert_eq!(2f64.powf(-0.15), denstream.o_micro_clusters[0].weight);
        assert_eq!(1., denstream.o_micro_clusters[1].weight);
        assert_eq!(1, denstream.o_micro_clusters[1].creation_time);
        assert_eq!(Some(&first), denstream.all_cases.get("1"));
        assert_eq!(Some(&second), denstream.all_cases.get("2"));
    }

    #[test]
    fn test_train_moves_known_case() {
        let mut denstream = build_denstream();
        denstream.train(&case_at("1", 0.2, 0.2)).unwrap();
        let moved = denstream.train(&case_at("1", 0.9, 0.9)).unwrap();
        assert_eq!(1, denstream.all_cases.len());
        assert_eq!(Some(&moved), denstream.all_cases.get("1"));
    }
}
