//! Training partition: determinism, conservation and registry integration.

use std::sync::Arc;

use approx::assert_relative_eq;
use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rx_analysis::classifier::StrangeChannelSignal;
use rx_analysis::columns::{IS_SIGNAL, IS_TRAINING, W_ANALYSIS, W_NOMINAL};
use rx_analysis::partition::{
    PartitionConfig, TrainingCandidate, event_key, partition_candidates, select_top,
};
use rx_analysis::testing::{McEvent, data_events, mc_events};
use rx_analysis::{InMemorySource, Manifest, Registry, RegistryConfig, SampleDescriptor};
use rx_frame::Frame;

fn candidates(weights: &[f64], seed: u64) -> Vec<TrainingCandidate> {
    weights
        .iter()
        .enumerate()
        .map(|(i, &w)| TrainingCandidate::new(event_key(7, i as i64 / 100, i as i64), w, seed))
        .collect()
}

proptest! {
    #[test]
    fn partition_ignores_arrival_order(
        weights in proptest::collection::vec(0.01f64..10.0, 1..300),
        k in 0usize..50,
        shuffle_seed in 0u64..1000,
    ) {
        let config = PartitionConfig { n_signal: k, n_background: k / 2, seed: 12_345 };
        let mut sig = candidates(&weights, config.seed);
        let mut bkg: Vec<TrainingCandidate> = sig.iter().map(|c| TrainingCandidate { weight: c.weight * 2.0, ..*c }).collect();
        let reference = partition_candidates(&mut sig.clone(), &mut bkg.clone(), &config);

        let mut rng = StdRng::seed_from_u64(shuffle_seed);
        sig.shuffle(&mut rng);
        bkg.shuffle(&mut rng);
        let shuffled = partition_candidates(&mut sig, &mut bkg, &config);

        prop_assert_eq!(&reference.signal.ids, &shuffled.signal.ids);
        prop_assert_eq!(&reference.background.ids, &shuffled.background.ids);
        prop_assert_eq!(reference.rescale(true).to_bits(), shuffled.rescale(true).to_bits());
        prop_assert_eq!(reference.rescale(false).to_bits(), shuffled.rescale(false).to_bits());
        prop_assert_eq!(reference.n_signal(), k.min(weights.len()));
    }

    #[test]
    fn analysis_weight_is_conserved(
        weights in proptest::collection::vec(0.01f64..10.0, 2..200),
        k in 1usize..10,
    ) {
        prop_assume!(k < weights.len());
        let config = PartitionConfig { n_signal: k, n_background: 0, seed: 99 };
        let mut sig = candidates(&weights, config.seed);
        let result = partition_candidates(&mut sig, &mut [], &config);

        let total: f64 = weights.iter().sum();
        let analysis: f64 = sig
            .iter()
            .map(|c| result.analysis_weight(c.weight, true, result.is_training(c.event_key, true)))
            .sum();
        prop_assert!((analysis - total).abs() <= 1e-9 * total);
    }
}

#[test]
fn heavier_events_are_drawn_more_often() {
    // one heavy event among many light ones; the heavy one should almost always win
    let mut wins = 0;
    for seed in 0..200u64 {
        let mut weights = vec![0.01; 50];
        weights[17] = 100.0;
        let cands = candidates(&weights, seed);
        if select_top(&cands, 1).contains(&cands[17].event_key) {
            wins += 1;
        }
    }
    assert!(wins > 150, "{wins}");
}

fn signal(evt: i64, w: f64) -> McEvent {
    McEvent::new(1, 1, evt).lambdas(1).weight(w)
}

fn background(evt: i64, w: f64) -> McEvent {
    McEvent::new(1, 1, evt).weight(w)
}

fn two_entry_registry(config: PartitionConfig) -> Registry {
    let manifest = Manifest::new()
        .add_sample(
            "numi",
            "run1",
            SampleDescriptor::new("strangeness").file("a.root").detvar("cv", ["a_cv.root"]),
        )
        .add_sample("numi", "run1", SampleDescriptor::new("mc").file("b.root"))
        .add_sample("numi", "run1", SampleDescriptor::new("data").file("d.root"));
    let a = vec![signal(1, 1.0), signal(2, 2.0), background(3, 5.0)];
    let b = vec![signal(4, 3.0), background(5, 5.0)];
    let source = InMemorySource::new()
        .with_file("a.root", mc_events(&a).unwrap())
        .with_file("a_cv.root", mc_events(&a).unwrap())
        .with_file("b.root", mc_events(&b).unwrap())
        .with_file("d.root", data_events(&[(1, 1, 1), (1, 1, 2)]).unwrap());
    let config = RegistryConfig::new(Arc::new(StrangeChannelSignal)).partition(config);
    Registry::build(&manifest, &source, &config).unwrap()
}

fn class_sum(frame: &Frame, column: &str, is_signal: bool) -> f64 {
    frame
        .filter("class", &[IS_SIGNAL], move |r| r.flag(0) == is_signal)
        .unwrap()
        .sum(column)
        .unwrap()
}

#[test]
fn sliced_samples_feed_the_partition() {
    let config = PartitionConfig { n_signal: 1, n_background: 1, seed: 12_345 };
    let registry = two_entry_registry(config);
    let partition = registry.partition();
    assert_eq!(partition.n_signal(), 1);
    assert_eq!(partition.n_background(), 1);

    let sim = registry.simulation_entries("numi", &["run1"]);
    assert_eq!(sim.len(), 2);
    // the strangeness slice drops the background event of the first sample
    assert_eq!(sim[0].nominal().count(), 2);

    let (mut sig, mut bkg, mut n_training) = (0.0, 0.0, 0);
    for entry in &sim {
        sig += class_sum(entry.nominal(), W_ANALYSIS, true);
        bkg += class_sum(entry.nominal(), W_ANALYSIS, false);
        n_training += entry.nominal().take_bool(IS_TRAINING).unwrap().iter().filter(|&&t| t).count();
    }
    assert_relative_eq!(sig, 6.0, epsilon = 1e-12);
    // a single background candidate is always drawn for training
    assert_eq!(bkg, 0.0);
    assert_eq!(n_training, 2);

    assert_relative_eq!(partition.signal.total_weight, 6.0);
    assert_relative_eq!(partition.background.total_weight, 5.0);
    assert!(partition.background.is_saturated());
    assert_eq!(partition.rescale(false), 1.0);
}

#[test]
fn end_to_end_without_slices() {
    let manifest = Manifest::new()
        .add_sample("bnb", "run1", SampleDescriptor::new("mc").file("a.root"))
        .add_sample("bnb", "run2", SampleDescriptor::new("mc").file("b.root"));
    let a = vec![signal(1, 1.0), signal(2, 2.0), background(3, 5.0)];
    let b = vec![signal(4, 3.0), background(5, 5.0)];
    let source = InMemorySource::new()
        .with_file("a.root", mc_events(&a).unwrap())
        .with_file("b.root", mc_events(&b).unwrap());
    let config = RegistryConfig::new(Arc::new(StrangeChannelSignal))
        .partition(PartitionConfig { n_signal: 1, n_background: 1, seed: 12_345 });
    let registry = Registry::build(&manifest, &source, &config).unwrap();

    let sim = registry.simulation_entries("bnb", &["run1", "run2"]);
    let sig: f64 = sim.iter().map(|e| class_sum(e.nominal(), W_ANALYSIS, true)).sum();
    let bkg: f64 = sim.iter().map(|e| class_sum(e.nominal(), W_ANALYSIS, false)).sum();
    assert_relative_eq!(sig, 6.0, epsilon = 1e-12);
    assert_relative_eq!(bkg, 10.0, epsilon = 1e-12);
    assert_relative_eq!(registry.partition().rescale(false), 2.0);

    let nominal: f64 = sim.iter().map(|e| e.nominal().sum(W_NOMINAL).unwrap()).sum();
    assert_relative_eq!(nominal, 16.0);
}

#[test]
fn data_views_keep_nominal_weight() {
    let registry = two_entry_registry(PartitionConfig::default());
    let data = registry.data_entries("numi", &["run1"]);
    assert_eq!(data.len(), 1);
    let f = data[0].nominal();
    assert_eq!(f.take_bool(IS_TRAINING).unwrap(), vec![false, false]);
    assert_eq!(f.take_f64(W_ANALYSIS).unwrap(), f.take_f64(W_NOMINAL).unwrap());
}

#[test]
fn detector_variations_share_the_partition() {
    let registry = two_entry_registry(PartitionConfig { n_signal: 1, n_background: 1, seed: 5 });
    let entry = registry.simulation_entries("numi", &["run1"])[0];
    let cv = entry.detvar("cv").unwrap();
    assert_eq!(
        cv.take_bool(IS_TRAINING).unwrap(),
        entry.nominal().take_bool(IS_TRAINING).unwrap()
    );
    assert_eq!(cv.take_f64(W_ANALYSIS).unwrap(), entry.nominal().take_f64(W_ANALYSIS).unwrap());
}

#[test]
fn saturated_classes_keep_unit_rescale() {
    let registry = two_entry_registry(PartitionConfig::default());
    let p = registry.partition();
    assert_eq!(p.n_signal(), 3);
    assert_eq!(p.n_background(), 1);
    assert_eq!(p.rescale(true), 1.0);
    assert_eq!(p.rescale(false), 1.0);
    for entry in registry.simulation_entries("numi", &["run1"]) {
        assert_eq!(entry.nominal().sum(W_ANALYSIS).unwrap(), 0.0);
    }
}

#[test]
fn repeated_builds_agree() {
    let config = PartitionConfig { n_signal: 2, n_background: 1, seed: 77 };
    let a = two_entry_registry(config);
    let b = two_entry_registry(config);
    assert_eq!(a.partition().as_ref(), b.partition().as_ref());
}
