// Scripting-boundary registry for accumulator instances.
//
// The factory map is process-wide and read-only after `initialize()` runs;
// it holds no other mutable global state. Live instances are owned by a
// Registry, addressed by opaque integer handles, and driven once per
// simulation step by the main loop. The registry fetches the observable
// vector from the instance's ObservableSource and forwards it, honoring the
// configured delta_N acceptance interval.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::accumulator::correlator::{Correlator, CorrelatorResult};
use crate::accumulator::mean_variance::MeanVarianceCalculator;
use crate::checkpoint;
use crate::error::AccumulatorError;

/// Seam to the observable-evaluation layer.
///
/// The observable layer performs any cross-worker reduction before the
/// registry sees the vector, so `evaluate` always returns one fully
/// resolved sample.
pub trait ObservableSource: Send {
    fn dimension(&self) -> usize;
    fn evaluate(&mut self, step: u64) -> Vec<f64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorKind {
    Correlator,
    MeanVariance,
}

impl AccumulatorKind {
    pub fn tag(self) -> &'static str {
        match self {
            AccumulatorKind::Correlator => "correlator",
            AccumulatorKind::MeanVariance => "mean_variance",
        }
    }
}

impl fmt::Display for AccumulatorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for AccumulatorKind {
    type Err = AccumulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "correlator" => Ok(AccumulatorKind::Correlator),
            "mean_variance" => Ok(AccumulatorKind::MeanVariance),
            other => Err(AccumulatorError::UnknownKind {
                kind: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AccumulatorInstance {
    Correlator(Correlator),
    MeanVariance(MeanVarianceCalculator),
}

impl AccumulatorInstance {
    pub fn update(&mut self, values: &[f64]) -> Result<(), AccumulatorError> {
        match self {
            AccumulatorInstance::Correlator(c) => c.update(values),
            AccumulatorInstance::MeanVariance(m) => m.update(values),
        }
    }

    pub fn reset(&mut self) {
        match self {
            AccumulatorInstance::Correlator(c) => c.reset(),
            AccumulatorInstance::MeanVariance(m) => m.reset(),
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            AccumulatorInstance::Correlator(c) => c.config().dimension,
            AccumulatorInstance::MeanVariance(m) => m.dimension(),
        }
    }

    /// Steps between accepted samples; 1 for the running-statistics kind.
    pub fn delta_n(&self) -> u64 {
        match self {
            AccumulatorInstance::Correlator(c) => c.config().delta_n,
            AccumulatorInstance::MeanVariance(_) => 1,
        }
    }

    pub fn output(&self) -> AccumulatorOutput {
        match self {
            AccumulatorInstance::Correlator(c) => AccumulatorOutput::Correlation(c.result()),
            AccumulatorInstance::MeanVariance(m) => AccumulatorOutput::MeanVariance {
                count: m.count(),
                mean: m.mean().ok(),
                variance: m.variance().ok(),
            },
        }
    }
}

/// Result shape handed to the scripting layer, serializable as-is.
///
/// `mean`/`variance` are `None` while the sample count is too small for
/// them to be defined, rather than fabricated zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccumulatorOutput {
    Correlation(CorrelatorResult),
    MeanVariance {
        count: u64,
        mean: Option<Vec<f64>>,
        variance: Option<Vec<f64>>,
    },
}

type FactoryFn = fn(&Value) -> Result<AccumulatorInstance, AccumulatorError>;

static FACTORIES: OnceLock<HashMap<&'static str, FactoryFn>> = OnceLock::new();

fn make_correlator(params: &Value) -> Result<AccumulatorInstance, AccumulatorError> {
    let config = serde_json::from_value(params.clone()).map_err(|e| {
        AccumulatorError::Configuration {
            message: format!("bad correlator parameters: {}", e),
        }
    })?;
    Ok(AccumulatorInstance::Correlator(Correlator::new(config)?))
}

fn make_mean_variance(params: &Value) -> Result<AccumulatorInstance, AccumulatorError> {
    #[derive(Deserialize)]
    struct Params {
        dimension: usize,
    }
    let params: Params = serde_json::from_value(params.clone()).map_err(|e| {
        AccumulatorError::Configuration {
            message: format!("bad mean_variance parameters: {}", e),
        }
    })?;
    Ok(AccumulatorInstance::MeanVariance(
        MeanVarianceCalculator::new(params.dimension)?,
    ))
}

/// Populate the process-wide factory map. Idempotent; must run before any
/// `Registry::create` call.
pub fn initialize() {
    FACTORIES.get_or_init(|| {
        let mut map: HashMap<&'static str, FactoryFn> = HashMap::new();
        map.insert(AccumulatorKind::Correlator.tag(), make_correlator);
        map.insert(AccumulatorKind::MeanVariance.tag(), make_mean_variance);
        map
    });
}

struct RegisteredAccumulator {
    instance: AccumulatorInstance,
    source: Box<dyn ObservableSource>,
    delta_n: u64,
    steps_seen: u64,
}

impl RegisteredAccumulator {
    /// Advance by one simulation step, accepting a sample every delta_n
    /// steps (the first step is always accepted).
    fn step(&mut self) -> Result<(), AccumulatorError> {
        let step = self.steps_seen;
        self.steps_seen += 1;
        if step % self.delta_n != 0 {
            return Ok(());
        }
        let values = self.source.evaluate(step);
        self.instance.update(&values)
    }
}

#[derive(Default)]
pub struct Registry {
    next_handle: u64,
    entries: HashMap<u64, RegisteredAccumulator>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            next_handle: 0,
            entries: HashMap::new(),
        }
    }

    /// Construct an accumulator from a named-parameter bag and bind it to
    /// an observable source.
    pub fn create(
        &mut self,
        kind: &str,
        params: &Value,
        source: Box<dyn ObservableSource>,
    ) -> Result<u64, AccumulatorError> {
        let factories = FACTORIES.get().ok_or_else(|| AccumulatorError::Configuration {
            message: "accumulator factories not initialized; call initialize() first".to_string(),
        })?;
        let factory = factories
            .get(kind)
            .ok_or_else(|| AccumulatorError::UnknownKind {
                kind: kind.to_string(),
            })?;
        let instance = factory(params)?;

        if instance.dimension() != source.dimension() {
            log::warn!(
                "Rejecting accumulator '{}': observable dimension {} does not match configured {}",
                kind,
                source.dimension(),
                instance.dimension()
            );
            return Err(AccumulatorError::DimensionMismatch {
                expected: instance.dimension(),
                got: source.dimension(),
            });
        }

        let delta_n = instance.delta_n();
        let handle = self.next_handle;
        self.next_handle += 1;
        self.entries.insert(
            handle,
            RegisteredAccumulator {
                instance,
                source,
                delta_n,
                steps_seen: 0,
            },
        );
        Ok(handle)
    }

    /// Restore an accumulator from a checkpoint record, rebinding it to a
    /// live observable source. The step counter resumes at the number of
    /// accepted samples times delta_n.
    pub fn create_from_checkpoint(
        &mut self,
        json: &str,
        source: Box<dyn ObservableSource>,
    ) -> Result<u64, AccumulatorError> {
        let instance: AccumulatorInstance = checkpoint::load(json)?;
        if instance.dimension() != source.dimension() {
            return Err(AccumulatorError::DimensionMismatch {
                expected: instance.dimension(),
                got: source.dimension(),
            });
        }
        let delta_n = instance.delta_n();
        let steps_seen = match &instance {
            AccumulatorInstance::Correlator(c) => c.n_accepted() * delta_n,
            AccumulatorInstance::MeanVariance(m) => m.count(),
        };
        let handle = self.next_handle;
        self.next_handle += 1;
        self.entries.insert(
            handle,
            RegisteredAccumulator {
                instance,
                source,
                delta_n,
                steps_seen,
            },
        );
        Ok(handle)
    }

    fn entry(&self, handle: u64) -> Result<&RegisteredAccumulator, AccumulatorError> {
        self.entries
            .get(&handle)
            .ok_or(AccumulatorError::UnknownHandle { handle })
    }

    fn entry_mut(&mut self, handle: u64) -> Result<&mut RegisteredAccumulator, AccumulatorError> {
        self.entries
            .get_mut(&handle)
            .ok_or(AccumulatorError::UnknownHandle { handle })
    }

    /// Advance one accumulator by one simulation step.
    pub fn update(&mut self, handle: u64) -> Result<(), AccumulatorError> {
        self.entry_mut(handle)?.step()
    }

    /// Advance every registered accumulator by one simulation step.
    /// Instances are independent, so they are stepped in parallel; each
    /// one is still touched by exactly one thread per call.
    pub fn update_all(&mut self) -> Result<(), AccumulatorError> {
        self.entries
            .par_iter_mut()
            .try_for_each(|(_, entry)| entry.step())
    }

    pub fn result(&self, handle: u64) -> Result<AccumulatorOutput, AccumulatorError> {
        Ok(self.entry(handle)?.instance.output())
    }

    pub fn reset(&mut self, handle: u64) -> Result<(), AccumulatorError> {
        let entry = self.entry_mut(handle)?;
        entry.instance.reset();
        entry.steps_seen = 0;
        Ok(())
    }

    pub fn remove(&mut self, handle: u64) -> Result<(), AccumulatorError> {
        self.entries
            .remove(&handle)
            .map(|_| ())
            .ok_or(AccumulatorError::UnknownHandle { handle })
    }

    pub fn checkpoint(&self, handle: u64) -> Result<String, AccumulatorError> {
        checkpoint::save(&self.entry(handle)?.instance)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
