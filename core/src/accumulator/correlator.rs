// The multiple-tau correlation accumulator.
//
// A Correlator owns an ordered sequence of Levels grown lazily up to the
// configured tau_max. Each accepted sample enters level 0; whenever a level
// overflows it hands a compressed sample to the next-coarser level, which
// repeats the same per-lag accumulation at half the time resolution. Total
// memory after N samples is O(tau_lin * log2(N / tau_lin)), never O(N).
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use super::cascade::{Level, Sample};
use super::mean_variance::MeanVarianceCalculator;
use super::operators::{CorrelationOperator, Normalization};
use crate::config::CorrelatorConfig;
use crate::error::AccumulatorError;

/// One point of the assembled lag axis.
///
/// `count == 0` marks a lag slot of an allocated level that has not seen a
/// pair yet; the value vector is all zeros in that case and interpretation
/// (NaN, omission) is left to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    /// Lag time in base simulation steps.
    pub lag_time: u64,
    pub value: Vec<f64>,
    pub count: u64,
}

/// Assembled correlation function, strictly increasing in `lag_time`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatorResult {
    pub entries: Vec<ResultEntry>,
}

impl CorrelatorResult {
    /// Entries that have actually accumulated at least one pair.
    pub fn counted(&self) -> impl Iterator<Item = &ResultEntry> {
        self.entries.iter().filter(|e| e.count > 0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correlator {
    config: CorrelatorConfig,
    levels: Vec<Level>,
    n_accepted: u64,
    /// Running mean of the observable, used by connected normalization.
    stats: MeanVarianceCalculator,
}

impl Correlator {
    pub fn new(config: CorrelatorConfig) -> Result<Self, AccumulatorError> {
        config.validate()?;
        let stats = MeanVarianceCalculator::new(config.dimension)?;
        let level0 = Level::new(config.delta_n, config.tau_lin, config.value_dimension());
        Ok(Correlator {
            config,
            levels: vec![level0],
            n_accepted: 0,
            stats,
        })
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.config
    }

    /// Feed one accepted sample through the level cascade.
    ///
    /// The dimension check happens before any state is touched, so a
    /// `DimensionMismatch` never leaves a partial update behind.
    pub fn update(&mut self, values: &[f64]) -> Result<(), AccumulatorError> {
        if values.len() != self.config.dimension {
            return Err(AccumulatorError::DimensionMismatch {
                expected: self.config.dimension,
                got: values.len(),
            });
        }

        let tick = self.n_accepted * self.config.delta_n;
        self.n_accepted += 1;
        self.stats.update(values)?;

        let mut carry = Some(Sample {
            tick,
            values: values.to_vec(),
        });
        let mut index = 0;
        while let Some(sample) = carry.take() {
            if index == self.levels.len() {
                // Nothing coarser than tau_max is ever resolved.
                let time_step = match self.config.delta_n.checked_shl(index as u32) {
                    Some(step) if step <= self.config.tau_max => step,
                    _ => {
                        debug!(
                            "Dropping compressed sample at tick {}: level {} would exceed tau_max {}",
                            sample.tick, index, self.config.tau_max
                        );
                        break;
                    }
                };
                self.levels.push(Level::new(
                    time_step,
                    self.config.tau_lin,
                    self.config.value_dimension(),
                ));
            }
            let level = &mut self.levels[index];
            carry = level.push(sample);
            level.correlate_latest(self.config.operator);
            index += 1;
        }
        Ok(())
    }

    /// Assemble the lag axis across all levels. Pure: repeated calls
    /// without an intervening `update` return identical output.
    pub fn result(&self) -> CorrelatorResult {
        let mut assembled: BTreeMap<u64, ResultEntry> = BTreeMap::new();

        // Levels are walked fine-to-coarse; where two levels cover the same
        // physical lag the finer-resolution entry wins, unless it has no
        // counts and the coarser one does.
        for level in &self.levels {
            for (lag, &count) in level.counts().iter().enumerate() {
                let lag_time = lag as u64 * level.time_step();
                if lag_time > self.config.tau_max {
                    continue;
                }
                let value = if count > 0 {
                    self.normalized_value(&level.sums()[lag], count)
                } else {
                    vec![0.0; self.config.value_dimension()]
                };
                let candidate = ResultEntry {
                    lag_time,
                    value,
                    count,
                };
                match assembled.entry(lag_time) {
                    Entry::Vacant(slot) => {
                        slot.insert(candidate);
                    }
                    Entry::Occupied(mut slot) => {
                        if slot.get().count == 0 && candidate.count > 0 {
                            slot.insert(candidate);
                        }
                    }
                }
            }
        }

        CorrelatorResult {
            entries: assembled.into_values().collect(),
        }
    }

    fn normalized_value(&self, sums: &[f64], count: u64) -> Vec<f64> {
        let mut value: Vec<f64> = sums.iter().map(|s| s / count as f64).collect();
        if self.config.normalization == Normalization::Connected {
            if let Ok(mean) = self.stats.mean() {
                match self.config.operator {
                    CorrelationOperator::ScalarProduct => {
                        value[0] -= mean.iter().map(|m| m * m).sum::<f64>();
                    }
                    CorrelationOperator::ComponentProduct => {
                        for (v, m) in value.iter_mut().zip(mean.iter()) {
                            *v -= m * m;
                        }
                    }
                    // Rejected at construction time.
                    CorrelationOperator::SquareDistance => {}
                }
            }
        }
        value
    }

    /// Clear all levels, sums and counts back to the just-constructed
    /// state.
    pub fn reset(&mut self) {
        self.levels = vec![Level::new(
            self.config.delta_n,
            self.config.tau_lin,
            self.config.value_dimension(),
        )];
        self.n_accepted = 0;
        self.stats.reset();
    }

    pub fn n_accepted(&self) -> u64 {
        self.n_accepted
    }

    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    /// Total raw + compressed samples currently buffered across all levels.
    pub fn stored_samples(&self) -> usize {
        self.levels.iter().map(|l| l.stored_samples()).sum()
    }
}
