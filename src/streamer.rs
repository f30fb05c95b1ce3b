use std::{
    error::Error,
    io,
    sync::mpsc::{Receiver, Sender},
};

use log::{debug, warn};
use serde_json::{json, Value};

use crate::{
    case::{Case, CaseDistance},
    denstream::DenStream,
};

/// Feeds a stream of JSON case records to an engine and writes a model snapshot after each step.
pub struct Streamer<In, Out> {
    cases: In,
    write: Out,
    cold_start: usize,
}

impl<In, Out, Err> Streamer<In, Out>
where
    In: Iterator<Item = Result<String, Err>>,
    Out: FnMut(String) -> Result<(), Box<dyn Error>>,
    Box<dyn Error>: From<Err>,
{
    pub fn new(cases: In, write: Out) -> Self {
        Self {
            cases,
            write,
            cold_start: 0,
        }
    }

    /// Buffers the first `count` cases to seed the engine before streaming.
    pub fn cold_start(mut self, count: usize) -> Self {
        self.cold_start = count;
        self
    }

    pub fn run<Distance: CaseDistance>(
        mut streamer: Streamer<In, Out>,
        engine: &mut DenStream,
        distance: &Distance,
    ) -> Result<(), Box<dyn Error>> {
        let mut batch: Vec<Case> = vec![];
        let mut seeded = streamer.cold_start == 0;
        for input in streamer.cases {
            let case_str = input?;
            let mut case: Case = match serde_json::from_str(&case_str) {
                Ok(case) => case,
                Err(reason) => {
                    warn!("rejected case record: {}", reason);
                    continue;
                }
            };
            let (graph_distance, time_distance) = distance.case_distances(&case);
            case.set_distances(graph_distance, time_distance);
            if seeded {
                let mc_id = engine.train(&case)?;
                debug!("case {} held by micro-cluster {}", case.id, mc_id);
            } else {
                batch.push(case);
                if batch.len() < streamer.cold_start {
                    continue;
                }
                engine.dbscan(&batch)?;
                batch.clear();
                seeded = true;
            }
            let output = serde_json::to_string(&serialize_model(engine))?;
            (streamer.write)(output)?;
        }
        if !seeded && !batch.is_empty() {
            engine.dbscan(&batch)?;
            let output = serde_json::to_string(&serialize_model(engine))?;
            (streamer.write)(output)?;
        }
        Ok(())
    }
}

fn serialize_model(engine: &DenStream) -> Value {
    json!({
        "time": engine.time(),
        "clusters": engine.generate_clusters(),
        "outliers": engine.generate_outlier_clusters(),
    })
}

pub fn stdio() -> (
    impl Iterator<Item = Result<String, io::Error>>,
    impl FnMut(String) -> Result<(), Box<dyn Error>>,
) {
    let cases = io::stdin().lines();
    let write = |model: String| -> Result<(), Box<dyn Error>> {
        println!("{}", model);
        Ok(())
    };
    (cases, write)
}

/// Bridges the stream to channels: cases are received from `case_receiver`, snapshots sent to `model_producer`.
pub fn channels(
    case_receiver: Receiver<String>,
    model_producer: Sender<String>,
) -> (
    impl Iterator<Item = Result<String, Box<dyn Error>>>,
    impl FnMut(String) -> Result<(), Box<dyn Error>>,
) {
    let cases = case_receiver.into_iter().map(Ok);
    let write = move |model: String| -> Result<(), Box<dyn Error>> {
        model_producer.send(model)?;
        Ok(())
    };
    (cases, write)
}
