use proptest::prelude::*;
use victim_belief::divergence::{hellinger, hellinger_distributions};
use victim_belief::omega::WeightSignals;
use victim_belief::sensor::BayesSensor;
use victim_belief::{BeliefVector, FusionEngine, OmegaWeightEngine, SensorModel};

fn belief_pair() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    (1usize..24).prop_flat_map(|n| {
        (
            prop::collection::vec(0.0..=1.0, n),
            prop::collection::vec(0.0..=1.0, n),
        )
    })
}

fn signals() -> impl Strategy<Value = Vec<WeightSignals>> {
    prop::collection::vec(
        (0.0..=0.5, 0.0..=1.0, 0.0..=1.0, 0.0..=1.0).prop_map(
            |(recency, confidence, degradation, sensor_quality)| WeightSignals {
                recency,
                confidence,
                degradation,
                sensor_quality,
            },
        ),
        0..12,
    )
}

#[test]
fn pair_fusion_swaps_with_complementary_omega() {
    proptest!(|((a, b) in belief_pair(), omega in 0.0..=1.0)| {
        let engine = FusionEngine::new();
        let a = BeliefVector::new(a);
        let b = BeliefVector::new(b);
        let ab = engine.chernoff_pair(&a, &b, omega).unwrap();
        let ba = engine.chernoff_pair(&b, &a, 1.0 - omega).unwrap();
        for (x, y) in ab.as_slice().iter().zip(ba.as_slice()) {
            prop_assert!((x - y).abs() < 1e-9);
        }
    });
}

#[test]
fn pair_fusion_stays_in_unit_interval() {
    proptest!(|((a, b) in belief_pair(), omega in 0.0..=1.0)| {
        let fused = FusionEngine::new()
            .chernoff_pair(&BeliefVector::new(a), &BeliefVector::new(b), omega)
            .unwrap();
        for v in fused.as_slice() {
            prop_assert!((0.0..=1.0).contains(v));
        }
    });
}

#[test]
fn pair_fusion_is_idempotent() {
    proptest!(|((a, _) in belief_pair(), omega in 0.0..=1.0)| {
        let a = BeliefVector::new(a);
        let fused = FusionEngine::new().chernoff_pair(&a, &a, omega).unwrap();
        for (x, y) in fused.as_slice().iter().zip(a.as_slice()) {
            prop_assert!((x - y).abs() < 1e-6);
        }
    });
}

#[test]
fn n_ary_fusion_stays_in_unit_interval() {
    proptest!(|(
        beliefs in (1usize..16).prop_flat_map(|n| prop::collection::vec(prop::collection::vec(0.0..=1.0, n), 1..6)),
        raw in prop::collection::vec(0.01..1.0, 6),
    )| {
        let beliefs: Vec<BeliefVector> = beliefs.into_iter().map(BeliefVector::new).collect();
        let refs: Vec<&BeliefVector> = beliefs.iter().collect();
        let raw = &raw[..refs.len()];
        let sum: f64 = raw.iter().sum();
        let weights: Vec<f64> = raw.iter().map(|w| w / sum).collect();

        let fused = FusionEngine::new().chernoff_n(&refs, &weights).unwrap();
        prop_assert_eq!(fused.len(), beliefs[0].len());
        for v in fused.as_slice() {
            prop_assert!((0.0..=1.0).contains(v));
        }
    });
}

#[test]
fn omega_weights_form_a_distribution() {
    proptest!(|(signals in signals())| {
        let weights = OmegaWeightEngine::default().weights_from_signals(&signals);
        prop_assert_eq!(weights.len(), signals.len());
        if !weights.is_empty() {
            prop_assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        for w in weights {
            prop_assert!(w.is_finite() && w >= 0.0);
        }
    });
}

#[test]
fn hellinger_is_a_bounded_symmetric_distance() {
    proptest!(|((p, q) in belief_pair())| {
        let pq = hellinger(&p, &q).unwrap();
        let qp = hellinger(&q, &p).unwrap();
        prop_assert!((0.0..=1.0).contains(&pq));
        prop_assert!((pq - qp).abs() < 1e-12);
    });
}

#[test]
fn hellinger_vanishes_on_identical_distributions() {
    proptest!(|(raw in prop::collection::vec(0.01..1.0, 1..24))| {
        let sum: f64 = raw.iter().sum();
        let p: Vec<f64> = raw.iter().map(|v| v / sum).collect();
        prop_assert!(hellinger_distributions(&p, &p).unwrap() < 1e-6);
    });
}

#[test]
fn bayes_posterior_is_a_probability() {
    proptest!(|(prior in 0.0..=1.0, z in 0.0..5.0)| {
        if let Some(p) = BayesSensor::default().posterior(prior, z).unwrap() {
            prop_assert!((0.0..=1.0).contains(&p));
            // a detection never lowers belief under p(z|occ) > p(z|free)
            prop_assert!(p + 1e-9 >= prior);
        }
    });
}
