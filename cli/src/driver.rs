// Drives accumulators through the registry the way a simulation main loop
// would: one update per step, observables supplied by synthetic sources.
use std::fs;
use std::path::PathBuf;

use arrow::util::pretty::pretty_format_batches;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use log::info;
use serde::Serialize;
use serde_json::json;

use mtau_core::registry::{self, AccumulatorOutput, ObservableSource, Registry};
use mtau_core::signal::{ConstantSignal, ExponentialDecay, NoisySine, WhiteNoise};
use mtau_core::utils::output_to_record_batch;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SignalKind {
    Constant,
    Decay,
    Sine,
    Noise,
}

impl SignalKind {
    fn build(self, dimension: usize, tau: f64, seed: u64) -> Box<dyn ObservableSource> {
        match self {
            SignalKind::Constant => Box::new(ConstantSignal::new(vec![1.0; dimension])),
            SignalKind::Decay => Box::new(ExponentialDecay::new(tau, vec![1.0; dimension])),
            SignalKind::Sine => Box::new(NoisySine::new(1.0, 64.0, 0.1, dimension, seed)),
            SignalKind::Noise => Box::new(WhiteNoise::new(dimension, seed)),
        }
    }
}

pub struct CorrelateOptions {
    pub steps: u64,
    pub dimension: usize,
    pub tau_lin: usize,
    pub tau_max: u64,
    pub delta_n: u64,
    pub operator: String,
    pub normalization: String,
    pub signal: SignalKind,
    pub tau: f64,
    pub seed: u64,
    pub json: bool,
    pub checkpoint_out: Option<PathBuf>,
    pub resume: Option<PathBuf>,
}

pub struct StatsOptions {
    pub steps: u64,
    pub dimension: usize,
    pub signal: SignalKind,
    pub tau: f64,
    pub seed: u64,
    pub json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    generated_at: DateTime<Utc>,
    kind: &'a str,
    steps: u64,
    output: &'a AccumulatorOutput,
}

pub fn run_correlate(options: CorrelateOptions) -> Result<(), String> {
    registry::initialize();
    let mut registry = Registry::new();

    let source = options
        .signal
        .build(options.dimension, options.tau, options.seed);

    let handle = match &options.resume {
        Some(path) => {
            let state = fs::read_to_string(path)
                .map_err(|e| format!("Failed to read checkpoint {}: {}", path.display(), e))?;
            let handle = registry
                .create_from_checkpoint(&state, source)
                .map_err(|e| e.to_string())?;
            info!("Resumed accumulator from {}", path.display());
            handle
        }
        None => {
            let params = json!({
                "dimension": options.dimension,
                "tau_lin": options.tau_lin,
                "tau_max": options.tau_max,
                "delta_n": options.delta_n,
                "operator": options.operator,
                "normalization": options.normalization,
            });
            registry
                .create("correlator", &params, source)
                .map_err(|e| e.to_string())?
        }
    };

    for _ in 0..options.steps {
        registry.update(handle).map_err(|e| e.to_string())?;
    }

    if let Some(path) = &options.checkpoint_out {
        let state = registry.checkpoint(handle).map_err(|e| e.to_string())?;
        fs::write(path, state)
            .map_err(|e| format!("Failed to write checkpoint {}: {}", path.display(), e))?;
        info!("Checkpoint written to {}", path.display());
    }

    let output = registry.result(handle).map_err(|e| e.to_string())?;
    print_output("correlator", options.steps, &output, options.json)
}

pub fn run_stats(options: StatsOptions) -> Result<(), String> {
    registry::initialize();
    let mut registry = Registry::new();

    let source = options
        .signal
        .build(options.dimension, options.tau, options.seed);
    let handle = registry
        .create("mean_variance", &json!({ "dimension": options.dimension }), source)
        .map_err(|e| e.to_string())?;

    for _ in 0..options.steps {
        registry.update(handle).map_err(|e| e.to_string())?;
    }

    let output = registry.result(handle).map_err(|e| e.to_string())?;
    print_output("mean_variance", options.steps, &output, options.json)
}

fn print_output(
    kind: &str,
    steps: u64,
    output: &AccumulatorOutput,
    as_json: bool,
) -> Result<(), String> {
    if as_json {
        let report = Report {
            generated_at: Utc::now(),
            kind,
            steps,
            output,
        };
        let rendered = serde_json::to_string_pretty(&report)
            .map_err(|e| format!("Failed to serialize report: {}", e))?;
        println!("{}", rendered);
    } else {
        let batch = output_to_record_batch(output)?;
        let table = pretty_format_batches(&[batch])
            .map_err(|e| format!("Failed to format result table: {}", e))?;
        println!("{}", table);
    }
    Ok(())
}
