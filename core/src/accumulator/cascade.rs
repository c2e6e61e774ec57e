// One resolution tier of the multiple-tau buffer cascade.
//
// A Level holds at most `tau_lin` samples at a fixed time resolution. When
// the buffer is full, the two oldest samples are averaged into a single
// sample at half the time resolution and handed back to the caller, which
// feeds it to the next-coarser level. Compression happens once per two
// arrivals at a given level, so the amortized update cost is O(1) per raw
// sample and the total number of levels is logarithmic in the trajectory
// length.
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::operators::CorrelationOperator;

/// One accepted observable vector, tagged with its time of observation in
/// base simulation steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub tick: u64,
    pub values: Vec<f64>,
}

/// Pairwise-average the two oldest samples of a level into one sample at
/// half the time resolution, tagged with the midpoint tick.
fn compress(older: &Sample, newer: &Sample) -> Sample {
    let values = older
        .values
        .iter()
        .zip(newer.values.iter())
        .map(|(a, b)| 0.5 * (a + b))
        .collect();
    Sample {
        tick: (older.tick + newer.tick) / 2,
        values,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level {
    /// Time between adjacent buffer slots, in base simulation steps.
    time_step: u64,
    tau_lin: usize,
    buffer: VecDeque<Sample>,
    /// Correlation sums indexed by lag 0..tau_lin, operator-output sized.
    sums: Vec<Vec<f64>>,
    counts: Vec<u64>,
}

impl Level {
    pub fn new(time_step: u64, tau_lin: usize, value_dimension: usize) -> Self {
        Level {
            time_step,
            tau_lin,
            buffer: VecDeque::with_capacity(tau_lin),
            sums: vec![vec![0.0; value_dimension]; tau_lin],
            counts: vec![0; tau_lin],
        }
    }

    /// Append `sample` to the buffer. If the buffer was already at capacity,
    /// the two oldest samples are first compressed and returned; that value
    /// is the only path by which the next-coarser level receives data.
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        let compressed = if self.buffer.len() == self.tau_lin {
            let older = self.buffer.pop_front().unwrap();
            let newer = self.buffer.pop_front().unwrap();
            Some(compress(&older, &newer))
        } else {
            None
        };
        self.buffer.push_back(sample);
        compressed
    }

    /// Correlate the most recently pushed sample against every resident
    /// sample, itself included (the lag-0 self term).
    ///
    /// Samples arrive at this level with uniform spacing `time_step`, so
    /// the lag index is the positional distance in the buffer. This equals
    /// |tick_new - tick_old| / time_step without the rounding that midpoint
    /// ticks of compressed samples would introduce.
    pub fn correlate_latest(&mut self, operator: CorrelationOperator) {
        let len = self.buffer.len();
        let newest = len - 1;
        for lag in 0..len {
            let a = &self.buffer[newest];
            let b = &self.buffer[newest - lag];
            operator.accumulate(&a.values, &b.values, &mut self.sums[lag]);
            self.counts[lag] += 1;
        }
    }

    pub fn time_step(&self) -> u64 {
        self.time_step
    }

    pub fn sums(&self) -> &[Vec<f64>] {
        &self.sums
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Number of samples currently buffered, for memory instrumentation.
    pub fn stored_samples(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tick: u64, value: f64) -> Sample {
        Sample {
            tick,
            values: vec![value],
        }
    }

    #[test]
    fn test_push_below_capacity_does_not_compress() {
        let mut level = Level::new(1, 4, 1);
        for t in 0..4 {
            assert!(level.push(sample(t, t as f64)).is_none());
        }
        assert_eq!(level.stored_samples(), 4);
    }

    #[test]
    fn test_push_at_capacity_compresses_oldest_pair() {
        let mut level = Level::new(1, 4, 1);
        for t in 0..4 {
            level.push(sample(t, t as f64));
        }

        let compressed = level.push(sample(4, 4.0)).expect("should compress");
        assert_eq!(compressed.values, vec![0.5], "average of samples 0 and 1");
        assert_eq!(compressed.tick, 0, "midpoint of ticks 0 and 1");
        assert_eq!(
            level.stored_samples(),
            3,
            "two removed, one appended on a full buffer"
        );
    }

    #[test]
    fn test_correlate_latest_counts_by_positional_lag() {
        let mut level = Level::new(1, 4, 1);
        for t in 0..3 {
            level.push(sample(t, 2.0));
            level.correlate_latest(CorrelationOperator::ScalarProduct);
        }

        // Three pushes: lag 0 hit three times, lag 1 twice, lag 2 once.
        assert_eq!(level.counts()[..4], [3, 2, 1, 0]);
        assert_eq!(level.sums()[0][0], 12.0, "3 * (2*2)");
        assert_eq!(level.sums()[1][0], 8.0);
        assert_eq!(level.sums()[2][0], 4.0);
    }

    #[test]
    fn test_compression_preserves_vector_components() {
        let mut level = Level::new(2, 2, 2);
        level.push(Sample {
            tick: 0,
            values: vec![1.0, 10.0],
        });
        level.push(Sample {
            tick: 2,
            values: vec![3.0, 30.0],
        });
        let compressed = level
            .push(Sample {
                tick: 4,
                values: vec![5.0, 50.0],
            })
            .unwrap();
        assert_eq!(compressed.values, vec![2.0, 20.0]);
        assert_eq!(compressed.tick, 1);
    }
}
