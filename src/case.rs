//! Process-mining cases, as seen by the clustering engine.
//!
//! A case is a timestamped sequence of activities. The engine never looks at the activities
//! themselves: it clusters the 2-D feature point `(graph_distance, time_distance)` that a
//! [`CaseDistance`] collaborator computes against a reference process graph.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::space::RealPoint;

/// One executed activity of a case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    pub timestamp: NaiveDateTime,
}

/// A case record: an identifier, its activities in arrival order and its distances to the reference graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: String,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub graph_distance: f64,
    #[serde(default)]
    pub time_distance: f64,
}

impl Case {
    /// Builds a new case without activities.
    pub fn new(id: impl Into<String>) -> Self {
        Case {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Appends an activity.
    pub fn set_activity(&mut self, name: impl Into<String>, timestamp: NaiveDateTime) {
        self.activities.push(Activity {
            name: name.into(),
            timestamp,
        });
    }

    /// The activity names, in order.
    pub fn trace(&self) -> Vec<&str> {
        self.activities.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn set_distances(&mut self, graph_distance: f64, time_distance: f64) {
        self.graph_distance = graph_distance;
        self.time_distance = time_distance;
    }

    /// The feature point the engine clusters on.
    pub fn point(&self) -> RealPoint {
        vec![self.graph_distance, self.time_distance]
    }
}

/// Computes the `(graph_distance, time_distance)` of a case against some reference graph.
pub trait CaseDistance {
    fn case_distances(&self, case: &Case) -> (f64, f64);
}

impl<F> CaseDistance for F
where
    F: Fn(&Case) -> (f64, f64),
{
    fn case_distances(&self, case: &Case) -> (f64, f64) {
        self(case)
    }
}

/// Distances already carried by the case record.
pub fn precomputed(case: &Case) -> (f64, f64) {
    (case.graph_distance, case.time_distance)
}
