use serde::{Deserialize, Serialize};

use crate::error::AccumulatorError;

/// Running mean/variance companion accumulator.
///
/// Per-component Welford update: numerically stable, O(1) per sample, no
/// catastrophic cancellation from a naive sum-of-squares formula.
/// `variance()` is the population variance (M2 / count) and requires at
/// least two samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanVarianceCalculator {
    dimension: usize,
    count: u64,
    mean: Vec<f64>,
    /// Sum of squared deviations from the current mean.
    m2: Vec<f64>,
}

impl MeanVarianceCalculator {
    pub fn new(dimension: usize) -> Result<Self, AccumulatorError> {
        if dimension == 0 {
            return Err(AccumulatorError::Configuration {
                message: "dimension must be positive".to_string(),
            });
        }
        Ok(MeanVarianceCalculator {
            dimension,
            count: 0,
            mean: vec![0.0; dimension],
            m2: vec![0.0; dimension],
        })
    }

    pub fn update(&mut self, values: &[f64]) -> Result<(), AccumulatorError> {
        if values.len() != self.dimension {
            return Err(AccumulatorError::DimensionMismatch {
                expected: self.dimension,
                got: values.len(),
            });
        }

        self.count += 1;
        let count = self.count as f64;
        for ((value, mean), m2) in values.iter().zip(self.mean.iter_mut()).zip(self.m2.iter_mut())
        {
            let delta = value - *mean;
            *mean += delta / count;
            *m2 += delta * (value - *mean);
        }
        Ok(())
    }

    pub fn mean(&self) -> Result<Vec<f64>, AccumulatorError> {
        if self.count < 1 {
            return Err(AccumulatorError::InsufficientSamples {
                required: 1,
                got: self.count,
            });
        }
        Ok(self.mean.clone())
    }

    pub fn variance(&self) -> Result<Vec<f64>, AccumulatorError> {
        if self.count < 2 {
            return Err(AccumulatorError::InsufficientSamples {
                required: 2,
                got: self.count,
            });
        }
        let count = self.count as f64;
        Ok(self.m2.iter().map(|m2| m2 / count).collect())
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Back to the just-constructed state.
    pub fn reset(&mut self) {
        self.count = 0;
        self.mean.iter_mut().for_each(|m| *m = 0.0);
        self.m2.iter_mut().for_each(|m| *m = 0.0);
    }
}
