//! Weighted training partition.
//!
//! Simulated events are split into a training subset and an analysis subset,
//! separately for signal and background. Training events are drawn by
//! weighted sampling without replacement using exponential keys
//! (`ln(u) / w`, keep the largest), with `u` derived from the event identity
//! so the draw is reproducible. The analysis weights of the remaining events
//! are scaled up so that each class keeps its total weight.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use rx_core::{Error, Result, Source};
use rx_frame::Frame;
use serde::{Deserialize, Serialize};

use crate::columns::{EVT, IS_SIGNAL, IS_TRAINING, RUN, SUB, W_ANALYSIS, W_NOMINAL};
use crate::entry::EntryInfo;

/// Training subset sizes and the sampling seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    /// Maximum number of signal training events.
    pub n_signal: usize,
    /// Maximum number of background training events.
    pub n_background: usize,
    /// Seed mixed into every event's uniform draw.
    pub seed: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self { n_signal: 50_000, n_background: 50_000, seed: 12_345 }
    }
}

/// Event identity packed into 64 bits. Each field is truncated to 32 bits.
#[inline]
pub fn event_key(run: i64, sub: i64, evt: i64) -> u64 {
    let r = u64::from(run as u32);
    let s = u64::from(sub as u32);
    let e = u64::from(evt as u32);
    (r << 42) ^ (s << 21) ^ e
}

/// SplitMix64 finaliser.
#[inline]
pub fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Uniform draw in the open interval (0, 1), fixed per (key, seed).
#[inline]
pub fn stable_uniform(key: u64, seed: u64) -> f64 {
    let h = splitmix64(key ^ seed);
    ((h >> 11) as f64 + 0.5) / (1u64 << 53) as f64
}

/// Exponential sampling key. Larger keys are drawn first.
#[inline]
pub fn sampling_key(u: f64, weight: f64) -> f64 {
    u.ln() / weight
}

/// One event eligible for training.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingCandidate {
    /// [`event_key`] of the event.
    pub event_key: u64,
    /// [`sampling_key`] of the event.
    pub key: f64,
    /// Nominal weight (finite and positive).
    pub weight: f64,
}

impl TrainingCandidate {
    /// Candidate for an event with the given identity and weight.
    pub fn new(event_key: u64, weight: f64, seed: u64) -> Self {
        let key = sampling_key(stable_uniform(event_key, seed), weight);
        Self { event_key, key, weight }
    }
}

/// Draw order: sampling key descending, then event key ascending.
fn draw_order(a: &TrainingCandidate, b: &TrainingCandidate) -> Ordering {
    b.key.total_cmp(&a.key).then(a.event_key.cmp(&b.event_key))
}

/// Event keys of the `k` candidates with the largest sampling keys.
///
/// Ties resolve by ascending event key. An event key is counted once even
/// if several candidates share it, in which case further candidates are
/// drawn until `k` distinct keys are selected or candidates run out.
pub fn select_top(candidates: &[TrainingCandidate], k: usize) -> HashSet<u64> {
    if k == 0 {
        return HashSet::new();
    }
    if candidates.len() <= k {
        return candidates.iter().map(|c| c.event_key).collect();
    }

    let mut work = candidates.to_vec();
    work.select_nth_unstable_by(k - 1, draw_order);
    let (head, tail) = work.split_at_mut(k);

    let mut ids = HashSet::with_capacity(k);
    ids.extend(head.iter().map(|c| c.event_key));
    if ids.len() < k {
        tail.sort_unstable_by(draw_order);
        for c in tail.iter() {
            if ids.len() == k {
                break;
            }
            ids.insert(c.event_key);
        }
    }
    ids
}

/// Training selection of one event class.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassPartition {
    /// Event keys held out for training.
    pub ids: HashSet<u64>,
    /// Σ weight over all candidates.
    pub total_weight: f64,
    /// Σ weight over candidates whose key was selected.
    pub selected_weight: f64,
    /// `total / (total - selected)`, or 1 when nothing is left.
    pub rescale: f64,
    /// Number of candidates.
    pub n_candidates: usize,
}

impl ClassPartition {
    /// Select up to `k` training events from candidates already sorted by
    /// event key.
    fn from_candidates(candidates: &[TrainingCandidate], k: usize) -> Self {
        let ids = select_top(candidates, k);
        let total_weight: f64 = candidates.iter().map(|c| c.weight).sum();
        let selected_weight: f64 =
            candidates.iter().filter(|c| ids.contains(&c.event_key)).map(|c| c.weight).sum();
        let analysis = total_weight - selected_weight;
        let rescale = if analysis > 0.0 { total_weight / analysis } else { 1.0 };
        Self { ids, total_weight, selected_weight, rescale, n_candidates: candidates.len() }
    }

    /// Whether every candidate weight ended up in training.
    pub fn is_saturated(&self) -> bool {
        self.n_candidates > 0 && self.total_weight - self.selected_weight <= 0.0
    }
}

/// Training sets and rescale factors for both classes.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionResult {
    /// Signal class.
    pub signal: ClassPartition,
    /// Background class.
    pub background: ClassPartition,
}

impl Default for PartitionResult {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartitionResult {
    /// Result with no training events and unit rescale.
    pub fn empty() -> Self {
        let class = ClassPartition { rescale: 1.0, ..ClassPartition::default() };
        Self { signal: class.clone(), background: class }
    }

    fn class(&self, is_signal: bool) -> &ClassPartition {
        if is_signal { &self.signal } else { &self.background }
    }

    /// Whether the event is held out for training.
    pub fn is_training(&self, event_key: u64, is_signal: bool) -> bool {
        self.class(is_signal).ids.contains(&event_key)
    }

    /// Analysis rescale factor of a class.
    pub fn rescale(&self, is_signal: bool) -> f64 {
        self.class(is_signal).rescale
    }

    /// Analysis weight of a simulated event.
    pub fn analysis_weight(&self, w_nominal: f64, is_signal: bool, is_training: bool) -> f64 {
        if is_training || !w_nominal.is_finite() || w_nominal <= 0.0 {
            return 0.0;
        }
        let w = w_nominal * self.rescale(is_signal);
        if w.is_finite() && w > 0.0 { w } else { 0.0 }
    }

    /// Number of signal training events.
    pub fn n_signal(&self) -> usize {
        self.signal.ids.len()
    }

    /// Number of background training events.
    pub fn n_background(&self) -> usize {
        self.background.ids.len()
    }
}

impl fmt::Display for PartitionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, c) in [("signal", &self.signal), ("background", &self.background)] {
            writeln!(
                f,
                "{name}: {} / {} candidates in training, weight {:.6} of {:.6}, rescale {:.6}",
                c.ids.len(),
                c.n_candidates,
                c.selected_weight,
                c.total_weight,
                c.rescale
            )?;
        }
        Ok(())
    }
}

#[derive(Default)]
struct Candidates {
    signal: Vec<TrainingCandidate>,
    background: Vec<TrainingCandidate>,
    n_skipped: u64,
}

/// Collects training candidates from simulation views, then draws the
/// partition.
pub struct PartitionBuilder {
    config: PartitionConfig,
    candidates: Mutex<Candidates>,
}

impl PartitionBuilder {
    /// Builder with the given sizes and seed.
    pub fn new(config: PartitionConfig) -> Self {
        Self { config, candidates: Mutex::new(Candidates::default()) }
    }

    /// Scan one simulation view. Events with non-finite or non-positive
    /// `w_nominal` are skipped.
    pub fn add(&self, info: &EntryInfo, frame: &Frame) -> Result<()> {
        if info.source != Source::MC {
            return Ok(());
        }
        let seed = self.config.seed;
        frame
            .for_each(&[RUN, SUB, EVT, IS_SIGNAL, W_NOMINAL], |r| {
                let w = r.f64(4);
                let valid = w.is_finite() && w > 0.0;
                let cand = valid
                    .then(|| TrainingCandidate::new(event_key(r.i64(0), r.i64(1), r.i64(2)), w, seed));
                let is_signal = r.flag(3);
                let Ok(mut acc) = self.candidates.lock() else {
                    return;
                };
                match cand {
                    Some(c) if is_signal => acc.signal.push(c),
                    Some(c) => acc.background.push(c),
                    None => acc.n_skipped += 1,
                }
            })
            .map_err(|e| Error::Schema(format!("{}: {e}", info.context())))
    }

    /// Draw both training sets.
    pub fn finish(self) -> Result<PartitionResult> {
        let Candidates { mut signal, mut background, n_skipped } = self
            .candidates
            .into_inner()
            .map_err(|_| Error::Source("training candidate scan panicked".into()))?;
        let result = partition_candidates(&mut signal, &mut background, &self.config);
        if n_skipped > 0 {
            log::debug!("training partition: skipped {n_skipped} events with zero weight");
        }
        Ok(result)
    }
}

/// Draw the partition from collected candidates. Candidates are sorted in
/// place so the result does not depend on the order they were collected in.
pub fn partition_candidates(
    signal: &mut [TrainingCandidate],
    background: &mut [TrainingCandidate],
    config: &PartitionConfig,
) -> PartitionResult {
    let canonical = |a: &TrainingCandidate, b: &TrainingCandidate| {
        a.event_key.cmp(&b.event_key).then(a.weight.total_cmp(&b.weight))
    };
    signal.sort_unstable_by(canonical);
    background.sort_unstable_by(canonical);

    let result = PartitionResult {
        signal: ClassPartition::from_candidates(signal, config.n_signal),
        background: ClassPartition::from_candidates(background, config.n_background),
    };

    for (name, class) in [("signal", &result.signal), ("background", &result.background)] {
        if class.is_saturated() {
            log::warn!(
                "training partition: every {name} candidate is in training; \
                 {name} analysis weights are zero (rescale 1.0)"
            );
        }
    }
    log::info!(
        "training partition: {} signal / {} background events (seed {})",
        result.n_signal(),
        result.n_background(),
        config.seed
    );
    log::debug!("{result}");
    result
}

/// Add `is_training` and `w_analysis` to a view.
///
/// Simulation uses the partition; data views get `is_training = false` and
/// `w_analysis = w_nominal`.
pub fn annotate(frame: &Frame, partition: &Arc<PartitionResult>, info: &EntryInfo) -> Result<Frame> {
    let schema = |e: rx_frame::FrameError| Error::Schema(format!("{}: {e}", info.context()));
    if info.source != Source::MC {
        return frame
            .define_bool(IS_TRAINING, &[], |_| false)
            .and_then(|f| f.define_f64(W_ANALYSIS, &[W_NOMINAL], |r| r.f64(0)))
            .map_err(schema);
    }

    let p = Arc::clone(partition);
    let f = frame
        .define_bool(IS_TRAINING, &[RUN, SUB, EVT, IS_SIGNAL], move |r| {
            p.is_training(event_key(r.i64(0), r.i64(1), r.i64(2)), r.flag(3))
        })
        .map_err(schema)?;
    let p = Arc::clone(partition);
    f.define_f64(W_ANALYSIS, &[W_NOMINAL, IS_SIGNAL, IS_TRAINING], move |r| {
        p.analysis_weight(r.f64(0), r.flag(1), r.flag(2))
    })
    .map_err(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cands(weights: &[f64], seed: u64) -> Vec<TrainingCandidate> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &w)| TrainingCandidate::new(event_key(1, 1, i as i64 + 1), w, seed))
            .collect()
    }

    #[test]
    fn event_key_layout() {
        assert_eq!(event_key(0, 0, 7), 7);
        assert_eq!(event_key(1, 0, 0), 1 << 42);
        assert_eq!(event_key(0, 1, 0), 1 << 21);
        assert_eq!(event_key(-1, 0, 0), u64::from(u32::MAX) << 42);
    }

    #[test]
    fn uniform_is_open_interval() {
        for key in [0, 1, u64::MAX, 12_345, 1 << 42] {
            let u = stable_uniform(key, 12_345);
            assert!(u > 0.0 && u < 1.0, "{u}");
            assert_eq!(u, stable_uniform(key, 12_345));
        }
        assert_ne!(stable_uniform(5, 1), stable_uniform(5, 2));
    }

    #[test]
    fn select_top_ties_break_by_event_key() {
        let c = |k, key| TrainingCandidate { event_key: k, key, weight: 1.0 };
        let all = [c(9, -1.0), c(3, -1.0), c(5, -1.0), c(1, -2.0)];
        let ids = select_top(&all, 2);
        assert_eq!(ids, HashSet::from([3, 5]));
    }

    #[test]
    fn select_top_counts_duplicates_once() {
        let c = |k, key| TrainingCandidate { event_key: k, key, weight: 1.0 };
        let all = [c(1, -0.1), c(1, -0.2), c(2, -0.3), c(3, -0.4)];
        assert_eq!(select_top(&all, 2), HashSet::from([1, 2]));
        assert!(select_top(&all, 0).is_empty());
        assert_eq!(select_top(&all, 10), HashSet::from([1, 2, 3]));
    }

    #[test]
    fn weight_is_conserved() {
        let config = PartitionConfig { n_signal: 1, n_background: 1, seed: 12_345 };
        let mut bkg = cands(&[10.0, 20.0, 30.0, 40.0], config.seed);
        let result = partition_candidates(&mut [], &mut bkg, &config);
        assert_eq!(result.n_background(), 1);

        let total: f64 = bkg
            .iter()
            .map(|c| {
                let training = result.is_training(c.event_key, false);
                result.analysis_weight(c.weight, false, training)
            })
            .sum();
        assert_relative_eq!(total, 100.0, epsilon = 1e-9);
        assert_eq!(result.signal.rescale, 1.0);
    }

    #[test]
    fn saturation_gives_unit_rescale() {
        let config = PartitionConfig { n_signal: 5, n_background: 5, seed: 7 };
        let mut sig = cands(&[1.0, 2.0, 3.0], config.seed);
        let result = partition_candidates(&mut sig, &mut [], &config);
        assert_eq!(result.n_signal(), 3);
        assert_eq!(result.rescale(true), 1.0);
        assert!(sig.iter().all(|c| result.analysis_weight(c.weight, true, true) == 0.0));
    }

    #[test]
    fn analysis_weight_rules() {
        let mut p = PartitionResult::empty();
        p.signal.rescale = 2.0;
        assert_eq!(p.analysis_weight(3.0, true, false), 6.0);
        assert_eq!(p.analysis_weight(3.0, true, true), 0.0);
        assert_eq!(p.analysis_weight(-3.0, true, false), 0.0);
        assert_eq!(p.analysis_weight(f64::NAN, false, false), 0.0);
        assert_eq!(p.analysis_weight(3.0, false, false), 3.0);
    }
}
