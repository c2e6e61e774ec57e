use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::accumulator::correlator::CorrelatorResult;
use crate::registry::AccumulatorOutput;

// Converts assembled accumulator output into Arrow record batches for
// reporting layers. Correlation results become one row per lag; vector
// valued operators get one value column per observable component.

pub fn correlation_to_record_batch(result: &CorrelatorResult) -> Result<RecordBatch, String> {
    let value_dimension = result
        .entries
        .first()
        .map(|e| e.value.len())
        .ok_or_else(|| "Correlation result has no lag entries".to_string())?;

    let mut fields = vec![
        Field::new("lag_time", DataType::UInt64, false),
        Field::new("count", DataType::UInt64, false),
    ];
    if value_dimension == 1 {
        fields.push(Field::new("value", DataType::Float64, false));
    } else {
        for i in 0..value_dimension {
            fields.push(Field::new(format!("value_{}", i), DataType::Float64, false));
        }
    }
    let schema = Arc::new(Schema::new(fields));

    let lag_times: Vec<u64> = result.entries.iter().map(|e| e.lag_time).collect();
    let counts: Vec<u64> = result.entries.iter().map(|e| e.count).collect();

    let mut arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(lag_times)) as ArrayRef,
        Arc::new(UInt64Array::from(counts)) as ArrayRef,
    ];
    for i in 0..value_dimension {
        let column: Vec<f64> = result.entries.iter().map(|e| e.value[i]).collect();
        arrays.push(Arc::new(Float64Array::from(column)) as ArrayRef);
    }

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| format!("Failed to create correlation record batch: {}", e))
}

pub fn mean_variance_to_record_batch(
    count: u64,
    mean: Option<&[f64]>,
    variance: Option<&[f64]>,
) -> Result<RecordBatch, String> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("component", DataType::UInt64, false),
        Field::new("count", DataType::UInt64, false),
        Field::new("mean", DataType::Float64, true),
        Field::new("variance", DataType::Float64, true),
    ]));

    // Before the first sample no dimension is known; report an empty batch.
    let dimension = mean.map(|m| m.len()).unwrap_or(0);

    let components: Vec<u64> = (0..dimension as u64).collect();
    let counts: Vec<u64> = vec![count; dimension];
    let means: Vec<Option<f64>> = match mean {
        Some(values) => values.iter().map(|v| Some(*v)).collect(),
        None => vec![],
    };
    let variances: Vec<Option<f64>> = match variance {
        Some(values) => values.iter().map(|v| Some(*v)).collect(),
        None => vec![None; dimension],
    };

    let arrays: Vec<ArrayRef> = vec![
        Arc::new(UInt64Array::from(components)),
        Arc::new(UInt64Array::from(counts)),
        Arc::new(Float64Array::from(means)),
        Arc::new(Float64Array::from(variances)),
    ];

    RecordBatch::try_new(schema, arrays)
        .map_err(|e| format!("Failed to create mean/variance record batch: {}", e))
}

pub fn output_to_record_batch(output: &AccumulatorOutput) -> Result<RecordBatch, String> {
    match output {
        AccumulatorOutput::Correlation(result) => correlation_to_record_batch(result),
        AccumulatorOutput::MeanVariance {
            count,
            mean,
            variance,
        } => mean_variance_to_record_batch(*count, mean.as_deref(), variance.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::correlator::ResultEntry;
    use arrow::array::Array;

    #[test]
    fn test_correlation_batch_scalar_value() {
        let result = CorrelatorResult {
            entries: vec![
                ResultEntry {
                    lag_time: 0,
                    value: vec![2.5],
                    count: 10,
                },
                ResultEntry {
                    lag_time: 1,
                    value: vec![1.5],
                    count: 9,
                },
            ],
        };

        let batch = correlation_to_record_batch(&result).unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(
            batch.schema().field(2).name(),
            "value",
            "scalar operators get a single value column"
        );
    }

    #[test]
    fn test_correlation_batch_vector_value() {
        let result = CorrelatorResult {
            entries: vec![ResultEntry {
                lag_time: 0,
                value: vec![1.0, 2.0, 3.0],
                count: 1,
            }],
        };

        let batch = correlation_to_record_batch(&result).unwrap();
        assert_eq!(batch.num_columns(), 5);
        assert_eq!(batch.schema().field(4).name(), "value_2");
    }

    #[test]
    fn test_mean_variance_batch_without_variance() {
        let batch = mean_variance_to_record_batch(1, Some(&[3.0, 4.0]), None).unwrap();
        assert_eq!(batch.num_rows(), 2);
        let variance = batch
            .column(3)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert!(variance.is_null(0), "undefined variance must be null");
    }

    #[test]
    fn test_mean_variance_batch_empty() {
        let batch = mean_variance_to_record_batch(0, None, None).unwrap();
        assert_eq!(batch.num_rows(), 0);
    }
}
