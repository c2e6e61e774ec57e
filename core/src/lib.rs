// Declare the accumulators module
pub mod accumulator {
    pub mod cascade;
    pub mod correlator;
    pub mod mean_variance;

    pub mod operators;
}

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod registry;
pub mod signal;
pub mod utils;
