use std::{error::Error, path::PathBuf};

use clap::Parser;
use log::info;

use fluent_drift::{
    case,
    config::DenStreamConfig,
    denstream::DenStream,
    service::service,
    streamer::{self, Streamer},
};

/// Streams JSON case records through a DenStream engine and writes cluster snapshots.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// JSON configuration file, overridden by the other options
    #[clap(long, value_parser)]
    config: Option<PathBuf>,
    #[clap(long, value_parser)]
    lambda: Option<f64>,
    #[clap(long, value_parser)]
    beta: Option<f64>,
    #[clap(long, value_parser)]
    epsilon: Option<f64>,
    #[clap(long, value_parser)]
    mu: Option<f64>,
    /// Cases per time tick
    #[clap(long, value_parser)]
    stream_speed: Option<u64>,
    /// Ticks between two maintenance passes
    #[clap(long, value_parser)]
    maintenance_period: Option<u64>,
    /// Fixed minimal weight of outlier micro-clusters
    #[clap(long, value_parser)]
    outlier_threshold: Option<f64>,
    /// Number of cases seeding the engine before streaming
    #[clap(long, value_parser, default_value_t = 0)]
    cold_start: usize,
    /// Serve websockets on this address instead of using stdin/stdout
    #[clap(long, value_parser)]
    service: Option<String>,
}

impl Args {
    fn engine_config(&self) -> Result<DenStreamConfig, Box<dyn Error>> {
        let mut config = match &self.config {
            Some(path) => DenStreamConfig::from_file(path)?,
            None => DenStreamConfig::default(),
        };
        config.lambda = self.lambda.unwrap_or(config.lambda);
        config.beta = self.beta.unwrap_or(config.beta);
        config.epsilon = self.epsilon.unwrap_or(config.epsilon);
        config.mu = self.mu.unwrap_or(config.mu);
        config.stream_speed = self.stream_speed.unwrap_or(config.stream_speed);
        config.maintenance_period = self.maintenance_period.or(config.maintenance_period);
        config.outlier_threshold = self.outlier_threshold.or(config.outlier_threshold);
        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();
    let mut engine = DenStream::new(args.engine_config()?)?;
    info!("starting with {:?}", engine.config());
    match &args.service {
        Some(addr) => {
            let (cases, write) = service(addr)?;
            info!("listening on {}", addr);
            let streamer = Streamer::new(cases, write).cold_start(args.cold_start);
            Streamer::run(streamer, &mut engine, &case::precomputed)
        }
        None => {
            let (cases, write) = streamer::stdio();
            let streamer = Streamer::new(cases, write).cold_start(args.cold_start);
            Streamer::run(streamer, &mut engine, &case::precomputed)
        }
    }
}
