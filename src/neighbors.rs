/// A reference to a candidate, its position in the scanned population and its distance from some point in space.
#[derive(PartialEq, Debug)]
pub struct NeighborDist<'a, Model>(usize, &'a Model, f64);

impl<'a, Model> NeighborDist<'a, Model> {
    /// Builds a new instance.
    pub fn new(index: usize, coord: &'a Model, dist: f64) -> Self {
        Self(index, coord, dist)
    }

    /// Position of the candidate in the scanned population.
    pub fn index(&self) -> usize {
        self.0
    }

    /// The candidate reference
    pub fn coord(&self) -> &'a Model {
        self.1
    }

    /// The distance to the searched point
    pub fn dist(&self) -> f64 {
        self.2
    }

    pub fn into_parts(self) -> (usize, &'a Model, f64) {
        (self.0, self.1, self.2)
    }
}

/// Defines a nearest neighbor getter function.
///
/// This trait is implemented by iterators over a population of models living in a space of `Point`.
pub trait GetClosest<'a, Point: ?Sized, Model, Dist>
where
    Dist: Fn(&Point, &Model) -> f64,
{
    /// Get the nearest model. Ties are won by the first model met, `None` when the population is empty.
    /// ```
    /// use fluent_drift::space;
    /// use fluent_drift::neighbors::*;
    ///
    /// let centers = vec![vec![1., 1.], vec![0., 0.5], vec![2.4, 4.], vec![0., -0.5]];
    /// let point: &[f64] = &[0., 0.];
    /// let nn = centers
    ///     .iter()
    ///     .get_closest(point, |p: &[f64], c: &Vec<f64>| space::euclid_dist(p, c));
    /// assert_eq!(Some(NeighborDist::new(1, &centers[1], 0.5)), nn);
    /// ```
    fn get_closest(self, point: &Point, dist: Dist) -> Option<NeighborDist<'a, Model>>;
}

/// Implementation of the nearest neighbor getter for an iterator over a set of models.
impl<'a, Iter, Point, Model, Dist> GetClosest<'a, Point, Model, Dist> for Iter
where
    Iter: Iterator<Item = &'a Model>,
    Point: ?Sized,
    Model: 'a,
    Dist: Fn(&Point, &Model) -> f64,
{
    fn get_closest(self, point: &Point, dist: Dist) -> Option<NeighborDist<'a, Model>> {
        self.enumerate()
            .map(|(i, m)| NeighborDist(i, m, dist(point, m)))
            .fold(None, closest)
    }
}

/// keeps the closest of the current best and the candidate, the current best on ties.
fn closest<'a, Model>(
    best: Option<NeighborDist<'a, Model>>,
    candidate: NeighborDist<'a, Model>,
) -> Option<NeighborDist<'a, Model>> {
    match best {
        Some(best) if best.2 <= candidate.2 || candidate.2.is_nan() => Some(best),
        _ => Some(candidate),
    }
}
