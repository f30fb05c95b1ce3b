//! A low footprint DenStream micro-clustering engine for concept drift detection on process-mining case streams.
//!
//! Cases are reduced to a 2-D feature point `(graph_distance, time_distance)` by a [`case::CaseDistance`]
//! collaborator, then absorbed by fading micro-clusters split into a potential and an outlier population.
//!
//! ```
//! use fluent_drift::{case::Case, config::DenStreamConfig, denstream::DenStream};
//!
//! let mut engine = DenStream::new(DenStreamConfig::default()).unwrap();
//! let batch: Vec<Case> = ["1", "2", "3"]
//!     .iter()
//!     .map(|id| {
//!         let mut case = Case::new(*id);
//!         case.set_distances(0.2, 0.3);
//!         case
//!     })
//!     .collect();
//! engine.dbscan(&batch).unwrap();
//! assert_eq!(1, engine.generate_clusters().len());
//!
//! let mut case = Case::new("4");
//! case.set_distances(0.9, 0.1);
//! engine.train(&case).unwrap();
//! assert_eq!(1, engine.generate_outlier_clusters().len());
//! ```
pub mod case;
pub mod cluster;
pub mod config;
pub mod denstream;
pub mod error;
pub mod maintenance;
pub mod micro_cluster;
pub mod neighbors;
pub mod service;
pub mod space;
pub mod streamer;
