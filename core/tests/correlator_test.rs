use mtau_core::accumulator::correlator::Correlator;
use mtau_core::accumulator::operators::{CorrelationOperator, Normalization};
use mtau_core::checkpoint;
use mtau_core::config::CorrelatorConfig;
use mtau_core::registry::{self, AccumulatorOutput, Registry};
use mtau_core::signal::ExponentialDecay;
use mtau_core::utils::output_to_record_batch;
use serde_json::json;

fn scalar_config(tau_lin: usize, tau_max: u64) -> CorrelatorConfig {
    CorrelatorConfig {
        dimension: 1,
        tau_lin,
        tau_max,
        delta_n: 1,
        operator: CorrelationOperator::ScalarProduct,
        normalization: Normalization::Moment,
    }
}

#[test]
fn test_exponential_decay_end_to_end() {
    // Reference configuration: tau_lin=4, tau_max=32, delta_N=1,
    // scalar_product, s_t = exp(-t/tau) * e. The assembled correlation,
    // normalized by its zero-lag value, must follow exp(-lag/tau). The
    // coarse levels average a decaying signal over truncated windows, which
    // biases their prefactor by a few percent; 8% relative tolerance covers
    // that across the full lag range.
    let tau = 2000.0;
    let mut correlator = Correlator::new(scalar_config(4, 32)).unwrap();
    for t in 0..1000u64 {
        let s = (-(t as f64) / tau).exp();
        correlator.update(&[s]).unwrap();
    }

    let result = correlator.result();
    let value0 = result.entries[0].value[0];
    assert!(value0 > 0.0);

    let mut checked = 0;
    for entry in result.counted() {
        let expected = (-(entry.lag_time as f64) / tau).exp();
        let observed = entry.value[0] / value0;
        assert!(
            (observed - expected).abs() / expected < 0.08,
            "lag {}: observed {:.5}, expected {:.5}",
            entry.lag_time,
            observed,
            expected
        );
        checked += 1;
    }
    assert!(checked >= 10, "lag range should cover all levels, got {}", checked);
}

#[test]
fn test_exponential_decay_shape_within_level_zero() {
    // A wide level 0 resolves lags 0..31 at full resolution, where the
    // only bias is the shrinking pair count per lag (< 3.5% here). This
    // pins the actual decay shape to 5%.
    let tau = 100.0;
    let mut correlator = Correlator::new(scalar_config(32, 64)).unwrap();
    for t in 0..1000u64 {
        let s = (-(t as f64) / tau).exp();
        correlator.update(&[s]).unwrap();
    }

    let result = correlator.result();
    let value0 = result.entries[0].value[0];
    for entry in result.counted().filter(|e| e.lag_time < 32) {
        let expected = (-(entry.lag_time as f64) / tau).exp();
        let observed = entry.value[0] / value0;
        assert!(
            (observed - expected).abs() / expected < 0.05,
            "lag {}: observed {:.5}, expected {:.5}",
            entry.lag_time,
            observed,
            expected
        );
    }
}

#[test]
fn test_square_distance_of_linear_motion_is_exact() {
    // For ballistic motion x_t = (t, 2t) the mean squared displacement is
    // exactly 2.5 * lag^2 at every lag. Pairwise averaging of a linear
    // signal is exact, so every level must reproduce this without bias.
    let config = CorrelatorConfig {
        dimension: 2,
        tau_lin: 8,
        tau_max: 256,
        delta_n: 1,
        operator: CorrelationOperator::SquareDistance,
        normalization: Normalization::Moment,
    };
    let mut correlator = Correlator::new(config).unwrap();
    for t in 0..2000u64 {
        correlator.update(&[t as f64, 2.0 * t as f64]).unwrap();
    }

    let result = correlator.result();
    assert!(result.counted().count() > 20);
    for entry in result.counted() {
        let expected = 2.5 * (entry.lag_time as f64).powi(2);
        assert!(
            (entry.value[0] - expected).abs() <= 1.0e-6 * expected.max(1.0),
            "lag {}: got {}, expected {}",
            entry.lag_time,
            entry.value[0],
            expected
        );
    }
}

#[test]
fn test_checkpoint_resume_continues_identically() {
    let make_input = |t: u64| vec![(t as f64 * 0.1).sin(), (t as f64 * 0.05).cos()];
    let config = CorrelatorConfig {
        dimension: 2,
        tau_lin: 4,
        tau_max: 64,
        delta_n: 1,
        operator: CorrelationOperator::ComponentProduct,
        normalization: Normalization::Connected,
    };

    let mut original = Correlator::new(config).unwrap();
    for t in 0..500u64 {
        original.update(&make_input(t)).unwrap();
    }

    let json = checkpoint::save(&original).unwrap();
    let mut restored: Correlator = checkpoint::load(&json).unwrap();
    assert_eq!(restored.result(), original.result());

    // Both continue over the same tail of the trajectory.
    for t in 500..800u64 {
        original.update(&make_input(t)).unwrap();
        restored.update(&make_input(t)).unwrap();
    }
    assert_eq!(
        restored.result(),
        original.result(),
        "a restored correlator must resume update exactly where it left off"
    );
}

#[test]
fn test_registry_drives_decay_signal_into_arrow_batch() {
    registry::initialize();
    let mut registry = Registry::new();
    let handle = registry
        .create(
            "correlator",
            &json!({
                "dimension": 3,
                "tau_lin": 4,
                "tau_max": 32,
                "delta_n": 1,
                "operator": "component_product",
                "normalization": "moment"
            }),
            Box::new(ExponentialDecay::new(200.0, vec![1.0, 0.5, -0.5])),
        )
        .unwrap();

    for _ in 0..300 {
        registry.update(handle).unwrap();
    }

    let output = registry.result(handle).unwrap();
    let batch = output_to_record_batch(&output).unwrap();
    assert!(batch.num_rows() > 4, "one row per assembled lag");
    assert_eq!(
        batch.num_columns(),
        5,
        "lag_time, count and one value column per component"
    );

    // The scripting layer serializes outputs as-is.
    let serialized = serde_json::to_string(&output).unwrap();
    let round_tripped: AccumulatorOutput = serde_json::from_str(&serialized).unwrap();
    assert_eq!(round_tripped, output);
}
