//! Selection presets, efficiency/purity evaluation and cut-flows.

use std::fmt;
use std::str::FromStr;

use rx_core::{Channel, Error, Result, Source};
use rx_frame::{ColumnKind, Frame, FrameError};

use crate::columns::{ANALYSIS_CHANNELS, IN_RECO_FIDUCIAL, W_NOMINAL};
use crate::entry::{Entry, EntryInfo};

/// Minimum beam-window light for the optical trigger.
pub const TRIGGER_MIN_BEAM_PE: f64 = 0.0;
/// Maximum veto-window light for the optical trigger.
pub const TRIGGER_MAX_VETO_PE: f64 = 20.0;
/// Required number of neutrino slices.
pub const SLICE_REQUIRED_COUNT: i64 = 1;
/// Minimum topological score of the slice.
pub const SLICE_MIN_TOPOLOGY_SCORE: f64 = 0.06;
/// Minimum contained fraction.
pub const TOPOLOGY_MIN_CONTAINED_FRACTION: f64 = 0.0;
/// Minimum slice cluster fraction.
pub const TOPOLOGY_MIN_CLUSTER_FRACTION: f64 = 0.5;
/// Muon candidate: minimum track score.
pub const MUON_MIN_TRACK_SCORE: f64 = 0.5;
/// Muon candidate: minimum track length (cm).
pub const MUON_MIN_TRACK_LENGTH: f64 = 10.0;
/// Muon candidate: maximum distance to the vertex (cm).
pub const MUON_MAX_TRACK_DISTANCE: f64 = 4.0;
/// Muon candidate: required hierarchy generation.
pub const MUON_REQUIRED_GENERATION: f64 = 2.0;

const PE_BEAM: &str = "optical_filter_pe_beam";
const PE_VETO: &str = "optical_filter_pe_veto";
const SOFTWARE_TRIGGER: &str = "software_trigger";
const NUM_SLICES: &str = "num_slices";
const TOPOLOGICAL_SCORE: &str = "topological_score";
const CONTAINED_FRACTION: &str = "contained_fraction";
const CLUSTER_FRACTION: &str = "slice_cluster_fraction";
const TRACK_SCORES: &str = "track_shower_scores";
const TRACK_LENGTH: &str = "track_length";
const TRACK_DISTANCE: &str = "track_distance_to_vertex";
const PFP_GENERATIONS: &str = "pfp_generations";

/// Named selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preset {
    /// No cut.
    Empty,
    /// Optical and software trigger (simulation only).
    Trigger,
    /// Exactly one neutrino slice with a good topological score.
    Slice,
    /// Reconstructed vertex inside the fiducial volume.
    Fiducial,
    /// Containment and clustering quality.
    Topology,
    /// At least one muon-like track.
    Muon,
    /// Trigger, Slice, Fiducial, Topology, then Muon.
    InclusiveMuCC,
}

impl Preset {
    /// Every preset.
    pub const ALL: [Preset; 7] = [
        Preset::Empty,
        Preset::Trigger,
        Preset::Slice,
        Preset::Fiducial,
        Preset::Topology,
        Preset::Muon,
        Preset::InclusiveMuCC,
    ];

    /// Atomic presets this preset applies, in order.
    pub fn stages(self) -> &'static [Preset] {
        match self {
            Preset::Empty => &[],
            Preset::Trigger => &[Preset::Trigger],
            Preset::Slice => &[Preset::Slice],
            Preset::Fiducial => &[Preset::Fiducial],
            Preset::Topology => &[Preset::Topology],
            Preset::Muon => &[Preset::Muon],
            Preset::InclusiveMuCC => &[
                Preset::Trigger,
                Preset::Slice,
                Preset::Fiducial,
                Preset::Topology,
                Preset::Muon,
            ],
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Preset::Empty => "Empty",
            Preset::Trigger => "Trigger",
            Preset::Slice => "Slice",
            Preset::Fiducial => "Fiducial",
            Preset::Topology => "Topology",
            Preset::Muon => "Muon",
            Preset::InclusiveMuCC => "InclusiveMuCC",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::Configuration(format!("unknown preset: '{s}'")))
    }
}

/// Apply a preset to a view. The input frame is not modified.
pub fn apply(frame: &Frame, preset: Preset, info: &EntryInfo) -> Result<Frame> {
    let ctx = info.context();
    preset.stages().iter().try_fold(frame.clone(), |f, &stage| {
        apply_stage(&f, stage, info.source)
            .map_err(|e| Error::Schema(format!("{ctx}: preset {stage}: {e}")))
    })
}

fn apply_stage(f: &Frame, stage: Preset, source: Source) -> rx_frame::Result<Frame> {
    match stage {
        Preset::Empty | Preset::InclusiveMuCC => Ok(f.clone()),
        Preset::Trigger if source != Source::MC => Ok(f.clone()),
        Preset::Trigger => {
            let cols = [PE_BEAM, PE_VETO, SOFTWARE_TRIGGER];
            require_scalars(f, &cols)?;
            f.filter("trigger", &cols, |r| {
                r.f64(0) > TRIGGER_MIN_BEAM_PE && r.f64(1) < TRIGGER_MAX_VETO_PE && r.i64(2) > 0
            })
        }
        Preset::Slice => {
            let cols = [NUM_SLICES, TOPOLOGICAL_SCORE];
            require_scalars(f, &cols)?;
            f.filter("slice", &cols, |r| {
                r.i64(0) == SLICE_REQUIRED_COUNT && r.f64(1) > SLICE_MIN_TOPOLOGY_SCORE
            })
        }
        Preset::Fiducial => {
            require_scalars(f, &[IN_RECO_FIDUCIAL])?;
            f.filter("fiducial", &[IN_RECO_FIDUCIAL], |r| r.flag(0))
        }
        Preset::Topology => {
            let cols = [CONTAINED_FRACTION, CLUSTER_FRACTION];
            require_scalars(f, &cols)?;
            f.filter("topology", &cols, |r| {
                r.f64(0) >= TOPOLOGY_MIN_CONTAINED_FRACTION
                    && r.f64(1) >= TOPOLOGY_MIN_CLUSTER_FRACTION
            })
        }
        Preset::Muon => {
            let cols = [TRACK_SCORES, TRACK_LENGTH, TRACK_DISTANCE, PFP_GENERATIONS];
            let req: Vec<_> = cols.iter().map(|&c| (c, ColumnKind::Jagged)).collect();
            f.require(&req)?;
            f.filter("muon", &cols, |r| {
                has_muon_candidate(r.jagged(0), r.jagged(1), r.jagged(2), r.jagged(3))
            })
        }
    }
}

fn require_scalars(f: &Frame, cols: &[&str]) -> rx_frame::Result<()> {
    let req: Vec<_> = cols.iter().map(|&c| (c, ColumnKind::Scalar)).collect();
    f.require(&req)
}

/// Whether any track passes every muon-candidate cut.
///
/// Lists of different length are compared up to the shortest.
pub fn has_muon_candidate(
    scores: &[f64],
    lengths: &[f64],
    distances: &[f64],
    generations: &[f64],
) -> bool {
    scores
        .iter()
        .zip(lengths)
        .zip(distances)
        .zip(generations)
        .any(|(((&s, &l), &d), &g)| {
            s > MUON_MIN_TRACK_SCORE
                && l > MUON_MIN_TRACK_LENGTH
                && d < MUON_MAX_TRACK_DISTANCE
                && g == MUON_REQUIRED_GENERATION
        })
}

/// Weighted signal efficiency and purity of a selection.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EvalResult {
    /// Σ w_nominal over signal events before selection.
    pub denominator: f64,
    /// Σ w_nominal over selected signal events.
    pub numerator: f64,
    /// Σ w_nominal over all selected events.
    pub selected: f64,
}

impl EvalResult {
    /// `numerator / denominator`, or 0.
    pub fn efficiency(&self) -> f64 {
        if self.denominator > 0.0 { self.numerator / self.denominator } else { 0.0 }
    }

    /// `numerator / selected`, or 0.
    pub fn purity(&self) -> f64 {
        if self.selected > 0.0 { self.numerator / self.selected } else { 0.0 }
    }
}

/// Σ w_nominal over all events and over signal events of a view.
fn weight_sums(frame: &Frame, is_signal: &impl Fn(Channel) -> bool) -> rx_frame::Result<(f64, f64)> {
    let channels = frame.take_i64(ANALYSIS_CHANNELS)?;
    let weights = frame.take_f64(W_NOMINAL)?;
    let mut all = 0.0;
    let mut signal = 0.0;
    for (ch, w) in channels.into_iter().zip(weights) {
        all += w;
        if is_signal(Channel::from_code(ch)) {
            signal += w;
        }
    }
    Ok((all, signal))
}

/// Efficiency and purity of `preset` over the nominal views of `entries`.
pub fn evaluate<P>(entries: &[&Entry], is_signal: P, preset: Preset) -> Result<EvalResult>
where
    P: Fn(Channel) -> bool,
{
    let mut out = EvalResult::default();
    for entry in entries {
        let info = entry.info();
        let schema = |e: FrameError| Error::Schema(format!("{}: {e}", info.context()));
        let (_, denom) = weight_sums(entry.nominal(), &is_signal).map_err(schema)?;
        let selected = apply(entry.nominal(), preset, info)?;
        let (all, numer) = weight_sums(&selected, &is_signal).map_err(schema)?;
        out.denominator += denom;
        out.selected += all;
        out.numerator += numer;
    }
    Ok(out)
}

/// One row of a cumulative cut-flow.
#[derive(Debug, Clone, PartialEq)]
pub struct CutflowStage {
    /// Stages applied so far, joined by `+`.
    pub label: String,
    /// Weighted yields after those stages.
    pub result: EvalResult,
}

/// Apply `stages` cumulatively and evaluate after each one.
///
/// The denominator is the signal yield before any cut and is the same on
/// every row.
pub fn cutflow<P>(entries: &[&Entry], is_signal: P, stages: &[Preset]) -> Result<Vec<CutflowStage>>
where
    P: Fn(Channel) -> bool,
{
    let mut views = Vec::with_capacity(entries.len());
    let mut denominator = 0.0;
    for entry in entries {
        let info = entry.info();
        let (_, denom) = weight_sums(entry.nominal(), &is_signal)
            .map_err(|e| Error::Schema(format!("{}: {e}", info.context())))?;
        denominator += denom;
        views.push(entry.nominal().clone());
    }

    let mut rows = Vec::with_capacity(stages.len());
    let mut label = String::new();
    for &stage in stages {
        if !label.is_empty() {
            label.push('+');
        }
        label.push_str(stage.name());

        let mut result = EvalResult { denominator, ..EvalResult::default() };
        for (view, entry) in views.iter_mut().zip(entries) {
            let info = entry.info();
            *view = apply(view, stage, info)?;
            let (all, numer) = weight_sums(view, &is_signal)
                .map_err(|e| Error::Schema(format!("{}: {e}", info.context())))?;
            result.selected += all;
            result.numerator += numer;
        }
        log::debug!(
            "cutflow {label}: selected {:.3}, efficiency {:.4}, purity {:.4}",
            result.selected,
            result.efficiency(),
            result.purity()
        );
        rows.push(CutflowStage { label: label.clone(), result });
    }
    Ok(rows)
}

/// Fixed-width text table of a cut-flow.
pub fn format_cutflow(rows: &[CutflowStage]) -> String {
    let mut out = format!(
        "{:<36}{:>16}{:>16}{:>16}{:>16}{:>16}\n",
        "Stage", "Denom(signal)", "Selected(all)", "Selected(signal)", "Efficiency", "Purity"
    );
    for row in rows {
        let r = &row.result;
        out.push_str(&format!(
            "{:<36}{:>16.6}{:>16.6}{:>16.6}{:>16.6}{:>16.6}\n",
            row.label,
            r.denominator,
            r.selected,
            r.numerator,
            r.efficiency(),
            r.purity()
        ));
    }
    out
}
