use serde::{Deserialize, Serialize};

use crate::accumulator::operators::{CorrelationOperator, Normalization};
use crate::error::AccumulatorError;

/// Construction-time configuration of a Correlator. Immutable after the
/// accumulator is created.
///
/// Times are expressed in base simulation steps: `delta_n` is the number of
/// steps between accepted samples, `tau_max` the largest lag time the
/// correlator resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatorConfig {
    /// Fixed dimension of the observable vector.
    pub dimension: usize,
    /// Samples buffered per level before the oldest pair is compressed.
    pub tau_lin: usize,
    /// Maximum lag time to resolve, in base simulation steps.
    pub tau_max: u64,
    /// Simulation steps between accepted samples.
    pub delta_n: u64,
    pub operator: CorrelationOperator,
    pub normalization: Normalization,
}

impl CorrelatorConfig {
    pub fn validate(&self) -> Result<(), AccumulatorError> {
        let fail = |message: String| Err(AccumulatorError::Configuration { message });

        if self.dimension == 0 {
            return fail("dimension must be positive".to_string());
        }
        if self.tau_lin == 0 {
            return fail("tau_lin must be positive".to_string());
        }
        // Compression removes samples two at a time, so the buffer length
        // has to tile into pairs.
        if self.tau_lin % 2 != 0 {
            return fail(format!("tau_lin must be even, got {}", self.tau_lin));
        }
        if self.delta_n == 0 {
            return fail("delta_n must be positive".to_string());
        }
        if self.tau_max < self.tau_lin as u64 * self.delta_n {
            return fail(format!(
                "tau_max ({}) must cover at least one full level: tau_lin * delta_n = {}",
                self.tau_max,
                self.tau_lin as u64 * self.delta_n
            ));
        }
        if self.operator == CorrelationOperator::SquareDistance
            && self.normalization == Normalization::Connected
        {
            return fail(
                "connected normalization is undefined for square_distance".to_string(),
            );
        }
        Ok(())
    }

    /// Dimension of the per-lag correlation value.
    pub fn value_dimension(&self) -> usize {
        self.operator.output_dimension(self.dimension)
    }
}
