// Pairwise correlation operators applied to (new, old) sample pairs.
//
// The operator set is closed and known at configuration time, so dispatch
// goes through a lookup table of pure functions rather than trait objects.
// Each function adds its contribution into a per-lag sums slice sized by
// `output_dimension`.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AccumulatorError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationOperator {
    /// Dot product of the two sample vectors. Scalar result.
    ScalarProduct,
    /// Element-wise product. Vector result, one entry per component.
    ComponentProduct,
    /// Mean squared difference of the two vectors, for MSD-style
    /// observables. Scalar result.
    SquareDistance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Raw second moment: sums[lag] / counts[lag].
    Moment,
    /// Connected correlation: subtracts the product of the running means.
    Connected,
}

type PairOp = fn(&[f64], &[f64], &mut [f64]);

fn scalar_product(a: &[f64], b: &[f64], out: &mut [f64]) {
    let mut dot = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
    }
    out[0] += dot;
}

fn component_product(a: &[f64], b: &[f64], out: &mut [f64]) {
    for ((x, y), o) in a.iter().zip(b.iter()).zip(out.iter_mut()) {
        *o += x * y;
    }
}

fn square_distance(a: &[f64], b: &[f64], out: &mut [f64]) {
    let mut acc = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let d = x - y;
        acc += d * d;
    }
    out[0] += acc / a.len() as f64;
}

// Indexed by the enum discriminant.
const OPERATOR_TABLE: [PairOp; 3] = [scalar_product, component_product, square_distance];

impl CorrelationOperator {
    /// Dimension of the operator output for a given sample dimension.
    pub fn output_dimension(self, sample_dimension: usize) -> usize {
        match self {
            CorrelationOperator::ScalarProduct => 1,
            CorrelationOperator::ComponentProduct => sample_dimension,
            CorrelationOperator::SquareDistance => 1,
        }
    }

    /// Add the correlation contribution of the pair (a, b) into `out`.
    pub fn accumulate(self, a: &[f64], b: &[f64], out: &mut [f64]) {
        OPERATOR_TABLE[self as usize](a, b, out)
    }
}

impl fmt::Display for CorrelationOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tag = match self {
            CorrelationOperator::ScalarProduct => "scalar_product",
            CorrelationOperator::ComponentProduct => "component_product",
            CorrelationOperator::SquareDistance => "square_distance",
        };
        write!(f, "{}", tag)
    }
}

impl FromStr for CorrelationOperator {
    type Err = AccumulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scalar_product" => Ok(CorrelationOperator::ScalarProduct),
            "component_product" => Ok(CorrelationOperator::ComponentProduct),
            "square_distance" => Ok(CorrelationOperator::SquareDistance),
            other => Err(AccumulatorError::Configuration {
                message: format!("unknown correlation operator tag '{}'", other),
            }),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tag = match self {
            Normalization::Moment => "moment",
            Normalization::Connected => "connected",
        };
        write!(f, "{}", tag)
    }
}

impl FromStr for Normalization {
    type Err = AccumulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "moment" => Ok(Normalization::Moment),
            "connected" => Ok(Normalization::Connected),
            other => Err(AccumulatorError::Configuration {
                message: format!("unknown normalization tag '{}'", other),
            }),
        }
    }
}
