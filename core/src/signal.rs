// Synthetic observable sources.
//
// These stand in for the simulation's observable-evaluation layer when
// exercising the accumulators from the CLI, tests and benches. Random
// sources are seeded so runs are reproducible.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::registry::ObservableSource;

/// Fixed vector, every step.
pub struct ConstantSignal {
    values: Vec<f64>,
}

impl ConstantSignal {
    pub fn new(values: Vec<f64>) -> Self {
        ConstantSignal { values }
    }
}

impl ObservableSource for ConstantSignal {
    fn dimension(&self) -> usize {
        self.values.len()
    }

    fn evaluate(&mut self, _step: u64) -> Vec<f64> {
        self.values.clone()
    }
}

/// exp(-t / tau) * e for a fixed direction vector e.
pub struct ExponentialDecay {
    tau: f64,
    direction: Vec<f64>,
}

impl ExponentialDecay {
    pub fn new(tau: f64, direction: Vec<f64>) -> Self {
        ExponentialDecay { tau, direction }
    }
}

impl ObservableSource for ExponentialDecay {
    fn dimension(&self) -> usize {
        self.direction.len()
    }

    fn evaluate(&mut self, step: u64) -> Vec<f64> {
        let envelope = (-(step as f64) / self.tau).exp();
        self.direction.iter().map(|e| envelope * e).collect()
    }
}

/// Sinusoid with uniform noise on every component.
pub struct NoisySine {
    amplitude: f64,
    period: f64,
    noise: f64,
    dimension: usize,
    rng: StdRng,
}

impl NoisySine {
    pub fn new(amplitude: f64, period: f64, noise: f64, dimension: usize, seed: u64) -> Self {
        NoisySine {
            amplitude,
            period,
            noise,
            dimension,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ObservableSource for NoisySine {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn evaluate(&mut self, step: u64) -> Vec<f64> {
        let phase = 2.0 * std::f64::consts::PI * step as f64 / self.period;
        (0..self.dimension)
            .map(|i| {
                self.amplitude * (phase + i as f64).sin()
                    + self.noise * self.rng.random_range(-1.0..1.0)
            })
            .collect()
    }
}

/// Uniform white noise in [-1, 1).
pub struct WhiteNoise {
    dimension: usize,
    rng: StdRng,
}

impl WhiteNoise {
    pub fn new(dimension: usize, seed: u64) -> Self {
        WhiteNoise {
            dimension,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ObservableSource for WhiteNoise {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn evaluate(&mut self, _step: u64) -> Vec<f64> {
        (0..self.dimension)
            .map(|_| self.rng.random_range(-1.0..1.0))
            .collect()
    }
}
