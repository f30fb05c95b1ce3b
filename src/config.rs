//! DenStream engine parameters.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::DenStreamError;

/// Engine configuration. Missing fields take the default values when deserialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenStreamConfig {
    /// dimensionality of the feature points
    pub n_features: usize,
    /// fading rate
    pub lambda: f64,
    /// outlier to potential promotion factor, in (0, 1]
    pub beta: f64,
    /// maximum radius of a micro-cluster absorbing a point
    pub epsilon: f64,
    /// base weight scale
    pub mu: f64,
    /// number of cases per time tick
    pub stream_speed: u64,
    /// ticks between two maintenance passes, derived from the fading parameters when unset
    pub maintenance_period: Option<u64>,
    /// minimal weight of a viable outlier micro-cluster, time dependent when unset
    pub outlier_threshold: Option<f64>,
    /// minimal number of cases forming a micro-cluster at cold start
    pub cold_start_min_size: usize,
}

impl Default for DenStreamConfig {
    fn default() -> Self {
        Self {
            n_features: 2,
            lambda: 0.15,
            beta: 0.3,
            epsilon: 0.1,
            mu: 4.,
            stream_speed: 1000,
            maintenance_period: None,
            outlier_threshold: None,
            cold_start_min_size: 2,
        }
    }
}

impl DenStreamConfig {
    /// Builds a configuration with the default maintenance and cold start settings.
    pub fn new(
        n_features: usize,
        lambda: f64,
        beta: f64,
        epsilon: f64,
        mu: f64,
        stream_speed: u64,
    ) -> Self {
        Self {
            n_features,
            lambda,
            beta,
            epsilon,
            mu,
            stream_speed,
            ..Default::default()
        }
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DenStreamError> {
        let path = path.as_ref();
        let unreadable =
            |reason: String| DenStreamError::UnableToRead(path.display().to_string(), reason);
        let content = fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| unreadable(e.to_string()))
    }

    /// Weight a micro-cluster needs to be a potential one.
    pub fn promotion_weight(&self) -> f64 {
        self.beta * self.mu
    }

    /// Ticks between two maintenance passes.
    ///
    /// Unless configured, this is the minimal time for a potential micro-cluster to fade into an outlier,
    /// `ceil(log2(βμ / (βμ - 1)) / λ)`, or one tick when `βμ <= 1`.
    pub fn maintenance_period(&self) -> u64 {
        self.maintenance_period.unwrap_or_else(|| {
            let bm = self.promotion_weight();
            if bm <= 1. {
                1
            } else {
                ((bm / (bm - 1.)).log2() / self.lambda).ceil().max(1.) as u64
            }
        })
    }

    /// Minimal weight of an outlier micro-cluster created at `creation_time`, evaluated at `time`.
    ///
    /// Unless configured, this is the DenStream lower weight limit
    /// `ξ = (2^(-λ(t - t0 + Tp)) - 1) / (2^(-λTp) - 1)`.
    pub fn outlier_threshold(&self, time: u64, creation_time: u64) -> f64 {
        self.outlier_threshold.unwrap_or_else(|| {
            let tp = self.maintenance_period() as f64;
            let age = time.saturating_sub(creation_time) as f64;
            let num = 2f64.powf(-self.lambda * (age + tp)) - 1.;
            let den = 2f64.powf(-self.lambda * tp) - 1.;
            num / den
        })
    }

    /// Checks every parameter, the first invalid one is reported.
    pub fn validate(&self) -> Result<(), DenStreamError> {
        check("n_features", "at least 1", self.n_features, self.n_features >= 1)?;
        check("lambda", "a positive number", self.lambda, positive(self.lambda))?;
        check(
            "beta",
            "a number in (0, 1]",
            self.beta,
            positive(self.beta) && self.beta <= 1.,
        )?;
        check("epsilon", "a positive number", self.epsilon, positive(self.epsilon))?;
        check("mu", "a positive number", self.mu, positive(self.mu))?;
        check("stream_speed", "at least 1", self.stream_speed, self.stream_speed >= 1)?;
        if let Some(period) = self.maintenance_period {
            check("maintenance_period", "at least 1", period, period >= 1)?;
        }
        if let Some(threshold) = self.outlier_threshold {
            check(
                "outlier_threshold",
                "a non-negative number",
                threshold,
                threshold.is_finite() && threshold >= 0.,
            )?;
        }
        check(
            "cold_start_min_size",
            "at least 2",
            self.cold_start_min_size,
            self.cold_start_min_size >= 2,
        )
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.
}

fn check(
    name: &str,
    expected: &str,
    value: impl ToString,
    valid: bool,
) -> Result<(), DenStreamError> {
    if valid {
        Ok(())
    } else {
        Err(DenStreamError::InvalidParameter(
            name.to_string(),
            expected.to_string(),
            value.to_string(),
        ))
    }
}
