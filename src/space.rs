//! This module defines the vector arithmetic the micro-clusters rely on, for feature points in R^n.
//!  - the Euclidian distance function
//!  - element-wise accumulation of points and of squared points
//!  - uniform scaling, used by fading

/// A point in R^n.
pub type RealPoint = Vec<f64>;

/// Computes Euclidian distance in R^n.
pub fn euclid_dist(p1: &[f64], p2: &[f64]) -> f64 {
    p1.iter()
        .zip(p2)
        .map(|(x1, x2)| {
            let d = x1 - x2;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Element-wise `p1 + p2`.
pub fn add(p1: &[f64], p2: &[f64]) -> RealPoint {
    p1.iter().zip(p2).map(|(x1, x2)| x1 + x2).collect()
}

/// Element-wise `acc + p * p`.
pub fn add_squared(acc: &[f64], p: &[f64]) -> RealPoint {
    acc.iter().zip(p).map(|(s, x)| s + x * x).collect()
}

/// Multiplies every coordinate by `factor` in place.
pub fn scale(p: &mut [f64], factor: f64) {
    p.iter_mut().for_each(|x| *x *= factor);
}
