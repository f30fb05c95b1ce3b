//! Errors
//!
//! Custom error types used throughout the `fluent_drift` crate.
use thiserror::Error;

/// Errors that can occur in the DenStream engine.
#[derive(Debug, Error, PartialEq)]
pub enum DenStreamError {
    /// The searched micro-cluster population is empty.
    #[error("No micro-cluster available.")]
    NoMicroCluster,
    /// First value is the name of the parameter, second is expected, third is what was passed.
    #[error("Invalid parameter value passed for {0}, expected {1} but {2} provided.")]
    InvalidParameter(String, String, String),
    /// Case id, number of features found, number of features expected.
    #[error("Case {0} has {1} features, expected {2}.")]
    DimensionMismatch(String, usize, usize),
    /// Case id of a feature point with a NaN or infinite coordinate.
    #[error("Case {0} has a non finite feature.")]
    NonFiniteFeature(String),
    /// Unable to read the configuration.
    #[error("Unable to read configuration from {0}: {1}")]
    UnableToRead(String, String),
}
