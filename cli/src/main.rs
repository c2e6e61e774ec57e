mod driver;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::info;

use driver::{run_correlate, run_stats, CorrelateOptions, SignalKind, StatsOptions};

#[derive(Debug, Parser)]
#[command(name = "mtau")]
#[command(about = "Drive multiple-tau accumulators over synthetic trajectories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Stream a synthetic observable through a Correlator and report the
    /// assembled correlation function.
    Correlate {
        #[arg(long, default_value_t = 1000)]
        steps: u64,

        #[arg(long, default_value_t = 3)]
        dimension: usize,

        #[arg(long, default_value_t = 16)]
        tau_lin: usize,

        #[arg(long, default_value_t = 1024)]
        tau_max: u64,

        #[arg(long, default_value_t = 1)]
        delta_n: u64,

        #[arg(long, default_value = "scalar_product")]
        operator: String,

        #[arg(long, default_value = "moment")]
        normalization: String,

        #[arg(long, value_enum, default_value = "decay")]
        signal: SignalKind,

        /// Decay constant of the synthetic signal, in steps.
        #[arg(long, default_value_t = 200.0)]
        tau: f64,

        #[arg(long, default_value_t = 7)]
        seed: u64,

        /// Emit a JSON report instead of the lag table.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Write the final accumulator state to this file.
        #[arg(long)]
        checkpoint_out: Option<PathBuf>,

        /// Resume from a checkpoint file instead of starting fresh.
        #[arg(long)]
        resume: Option<PathBuf>,
    },
    /// Stream a synthetic observable through a MeanVarianceCalculator.
    Stats {
        #[arg(long, default_value_t = 1000)]
        steps: u64,

        #[arg(long, default_value_t = 3)]
        dimension: usize,

        #[arg(long, value_enum, default_value = "sine")]
        signal: SignalKind,

        #[arg(long, default_value_t = 200.0)]
        tau: f64,

        #[arg(long, default_value_t = 7)]
        seed: u64,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Correlate {
            steps,
            dimension,
            tau_lin,
            tau_max,
            delta_n,
            operator,
            normalization,
            signal,
            tau,
            seed,
            json,
            checkpoint_out,
            resume,
        } => {
            info!("Running correlate for {} steps", steps);
            run_correlate(CorrelateOptions {
                steps,
                dimension,
                tau_lin,
                tau_max,
                delta_n,
                operator,
                normalization,
                signal,
                tau,
                seed,
                json,
                checkpoint_out,
                resume,
            })
        }
        Commands::Stats {
            steps,
            dimension,
            signal,
            tau,
            seed,
            json,
        } => {
            info!("Running stats for {} steps", steps);
            run_stats(StatsOptions {
                steps,
                dimension,
                signal,
                tau,
                seed,
                json,
            })
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
