//! Event classifier: derives weights, truth categories and signal flags.
//!
//! Simulation gets the full set of truth-derived columns; beam-on and
//! off-beam data get constant placeholders so every view exposes the same
//! schema. Raw inputs are checked with [`Frame::require`] before anything is
//! defined, so a missing column is reported before any event is read.

use std::fmt;
use std::sync::Arc;

use rx_core::{Channel, Error, Result, Source};
use rx_frame::{ColumnKind, Frame, FrameError, Row};
use serde::{Deserialize, Serialize};

use crate::columns::*;
use crate::entry::EntryInfo;

/// Purity above which a signal event counts as recognised.
pub const RECOGNITION_PURITY: f64 = 0.5;
/// Completeness above which a signal event counts as recognised.
pub const RECOGNITION_COMPLETENESS: f64 = 0.1;

/// Interaction modes kept as-is in `scattering_mode`.
const KNOWN_MODES: [i64; 5] = [0, 1, 2, 3, 10];

// ---------------------------------------------------------------------------
// Fiducial volume
// ---------------------------------------------------------------------------

/// Axis-aligned box in detector coordinates (cm). Bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiducialVolume {
    /// Lower x bound.
    pub x_min: f64,
    /// Upper x bound.
    pub x_max: f64,
    /// Lower y bound.
    pub y_min: f64,
    /// Upper y bound.
    pub y_max: f64,
    /// Lower z bound.
    pub z_min: f64,
    /// Upper z bound.
    pub z_max: f64,
}

impl Default for FiducialVolume {
    fn default() -> Self {
        Self { x_min: 5.0, x_max: 251.0, y_min: -110.0, y_max: 110.0, z_min: 20.0, z_max: 986.0 }
    }
}

impl FiducialVolume {
    /// Whether the point lies inside the box. `NaN` coordinates are outside.
    #[inline]
    pub fn contains(&self, x: f64, y: f64, z: f64) -> bool {
        (self.x_min..=self.x_max).contains(&x)
            && (self.y_min..=self.y_max).contains(&y)
            && (self.z_min..=self.z_max).contains(&z)
    }
}

// ---------------------------------------------------------------------------
// Channel rules
// ---------------------------------------------------------------------------

/// Truth quantities the channel decision list looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TruthSummary {
    /// Truth vertex inside the fiducial volume.
    pub in_fiducial: bool,
    /// Neutrino PDG code, 0 when there is none.
    pub nu_pdg: i64,
    /// 0 = charged current, 1 = neutral current.
    pub ccnc: i64,
    /// Total strange hadron multiplicity.
    pub n_strange: i64,
    /// Charged pion multiplicity.
    pub n_pi_charged: i64,
    /// Neutral pion multiplicity.
    pub n_pi0: i64,
    /// Photon multiplicity.
    pub n_gamma: i64,
    /// Proton multiplicity.
    pub n_proton: i64,
}

impl TruthSummary {
    fn is_cc(&self) -> bool {
        self.ccnc == 0
    }

    fn is_numu_cc(&self) -> bool {
        self.is_cc() && self.nu_pdg.abs() == 14
    }
}

/// One entry of the channel decision list.
#[derive(Clone, Copy)]
pub struct ChannelRule {
    /// Channel assigned when the rule matches.
    pub channel: Channel,
    /// Human-readable condition.
    pub description: &'static str,
    /// The condition.
    pub matches: fn(&TruthSummary) -> bool,
}

impl fmt::Debug for ChannelRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelRule")
            .field("channel", &self.channel)
            .field("description", &self.description)
            .finish()
    }
}

fn out_of_fv_no_neutrino(t: &TruthSummary) -> bool {
    !t.in_fiducial && t.nu_pdg == 0
}

fn out_of_fv(t: &TruthSummary) -> bool {
    !t.in_fiducial
}

fn neutral_current(t: &TruthSummary) -> bool {
    t.ccnc == 1
}

fn single_strange(t: &TruthSummary) -> bool {
    t.is_cc() && t.n_strange == 1
}

fn multi_strange(t: &TruthSummary) -> bool {
    t.is_cc() && t.n_strange > 1
}

fn electron_cc(t: &TruthSummary) -> bool {
    t.is_cc() && t.nu_pdg.abs() == 12
}

fn numu_0pi_ge1p(t: &TruthSummary) -> bool {
    t.is_numu_cc() && t.n_pi_charged == 0 && t.n_proton >= 1
}

fn numu_1pi(t: &TruthSummary) -> bool {
    t.is_numu_cc() && t.n_pi_charged == 1 && t.n_pi0 == 0
}

fn numu_pi0_gamma(t: &TruthSummary) -> bool {
    t.is_numu_cc() && (t.n_pi0 > 0 || t.n_gamma >= 2)
}

fn numu_npi(t: &TruthSummary) -> bool {
    t.is_numu_cc() && t.n_pi_charged > 1
}

fn numu_other(t: &TruthSummary) -> bool {
    t.is_numu_cc()
}

/// Ordered decision list; the first matching rule wins.
pub static CHANNEL_RULES: [ChannelRule; 11] = [
    ChannelRule {
        channel: Channel::OutOfFiducial,
        description: "outside fiducial volume, no neutrino",
        matches: out_of_fv_no_neutrino,
    },
    ChannelRule {
        channel: Channel::External,
        description: "outside fiducial volume",
        matches: out_of_fv,
    },
    ChannelRule {
        channel: Channel::NeutralCurrent,
        description: "neutral current",
        matches: neutral_current,
    },
    ChannelRule {
        channel: Channel::SingleStrange,
        description: "CC, one strange hadron",
        matches: single_strange,
    },
    ChannelRule {
        channel: Channel::MultiStrange,
        description: "CC, several strange hadrons",
        matches: multi_strange,
    },
    ChannelRule { channel: Channel::ElectronCC, description: "nue CC", matches: electron_cc },
    ChannelRule {
        channel: Channel::MuonCC0PiGe1P,
        description: "numu CC, no charged pion, >= 1 proton",
        matches: numu_0pi_ge1p,
    },
    ChannelRule {
        channel: Channel::MuonCC1Pi,
        description: "numu CC, one charged pion, no pi0",
        matches: numu_1pi,
    },
    ChannelRule {
        channel: Channel::MuonCCPi0OrGamma,
        description: "numu CC, pi0 or >= 2 photons",
        matches: numu_pi0_gamma,
    },
    ChannelRule {
        channel: Channel::MuonCCNPi,
        description: "numu CC, several charged pions",
        matches: numu_npi,
    },
    ChannelRule { channel: Channel::MuonCCOther, description: "numu CC", matches: numu_other },
];

/// Channel of a simulated event. Falls back to [`Channel::Unknown`].
pub fn classify(truth: &TruthSummary) -> Channel {
    CHANNEL_RULES
        .iter()
        .find(|rule| (rule.matches)(truth))
        .map(|rule| rule.channel)
        .unwrap_or(Channel::Unknown)
}

// ---------------------------------------------------------------------------
// Signal definitions
// ---------------------------------------------------------------------------

/// Pluggable definition of the `is_signal` flag for simulated events.
///
/// [`SignalDefinition::inputs`] may name any raw column or a column the
/// classifier defines before `is_signal` (weights, fiducial flags,
/// `count_strange`, `analysis_channels`, ...).
pub trait SignalDefinition: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Raw columns the definition needs, checked before any evaluation.
    fn required_columns(&self) -> Vec<(&'static str, ColumnKind)>;

    /// Columns handed to [`SignalDefinition::is_signal`], in access order.
    fn inputs(&self) -> Vec<&'static str>;

    /// Whether the event is signal.
    fn is_signal(&self, row: &Row<'_>) -> bool;
}

/// Signal = charged current with at least one strange hadron, inside the
/// fiducial volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrangeChannelSignal;

impl SignalDefinition for StrangeChannelSignal {
    fn name(&self) -> &str {
        "strange_channel"
    }

    fn required_columns(&self) -> Vec<(&'static str, ColumnKind)> {
        Vec::new()
    }

    fn inputs(&self) -> Vec<&'static str> {
        vec![ANALYSIS_CHANNELS]
    }

    fn is_signal(&self, row: &Row<'_>) -> bool {
        Channel::from_code(row.i64(0)).is_strange()
    }
}

/// Truth flag marking muon-neutrino charged current.
pub const IS_NU_MU_CC: &str = "is_nu_mu_cc";
/// Per-lambda flag: decay vertex inside the fiducial volume.
pub const LAMBDA_DECAY_IN_FID: &str = "lambda_decay_in_fid";

/// Signal = muon-neutrino CC with a lambda decaying inside the fiducial
/// volume.
#[derive(Debug, Clone, Copy, Default)]
pub struct MuonCcFiducialDecaySignal;

impl SignalDefinition for MuonCcFiducialDecaySignal {
    fn name(&self) -> &str {
        "numu_cc_lambda_decay_in_fid"
    }

    fn required_columns(&self) -> Vec<(&'static str, ColumnKind)> {
        vec![(IS_NU_MU_CC, ColumnKind::Scalar), (LAMBDA_DECAY_IN_FID, ColumnKind::Jagged)]
    }

    fn inputs(&self) -> Vec<&'static str> {
        vec![IS_NU_MU_CC, LAMBDA_DECAY_IN_FID]
    }

    fn is_signal(&self, row: &Row<'_>) -> bool {
        row.flag(0) && row.jagged(1).iter().any(|&v| v != 0.0)
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

/// Clamp a weight: non-finite or negative values become 0.
#[inline]
pub fn clamp_weight(w: f64) -> f64 {
    if w.is_finite() && w >= 0.0 { w } else { 0.0 }
}

/// Derives analysis columns from raw event columns.
#[derive(Clone)]
pub struct Classifier {
    truth_volume: FiducialVolume,
    reco_volume: FiducialVolume,
    signal: Arc<dyn SignalDefinition>,
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("truth_volume", &self.truth_volume)
            .field("reco_volume", &self.reco_volume)
            .field("signal", &self.signal.name())
            .finish()
    }
}

impl Classifier {
    /// Classifier with the default fiducial volume for truth and reco.
    pub fn new(signal: Arc<dyn SignalDefinition>) -> Self {
        Self {
            truth_volume: FiducialVolume::default(),
            reco_volume: FiducialVolume::default(),
            signal,
        }
    }

    /// Volume used for `in_fiducial`.
    pub fn with_truth_volume(mut self, volume: FiducialVolume) -> Self {
        self.truth_volume = volume;
        self
    }

    /// Volume used for `in_reco_fiducial`.
    pub fn with_reco_volume(mut self, volume: FiducialVolume) -> Self {
        self.reco_volume = volume;
        self
    }

    /// The configured signal definition.
    pub fn signal(&self) -> &dyn SignalDefinition {
        self.signal.as_ref()
    }

    /// Raw columns a sample of `source` must provide.
    pub fn required_columns(&self, source: Source) -> Vec<(&'static str, ColumnKind)> {
        let mut cols: Vec<(&'static str, ColumnKind)> =
            RECO_VTX.iter().map(|&c| (c, ColumnKind::Scalar)).collect();
        if source == Source::MC {
            let scalars = [WEIGHT_SPLINE, WEIGHT_TUNE]
                .into_iter()
                .chain(NU_VTX)
                .chain(STRANGE_COUNTS)
                .chain([
                    INT_MODE,
                    NU_PDG,
                    INT_CCNC,
                    N_PROTON,
                    N_PI_MINUS,
                    N_PI_PLUS,
                    N_PI0,
                    N_GAMMA,
                    PURITY,
                    COMPLETENESS,
                ]);
            cols.extend(scalars.map(|c| (c, ColumnKind::Scalar)));
            for req in self.signal.required_columns() {
                if !cols.contains(&req) {
                    cols.push(req);
                }
            }
        }
        cols
    }

    /// Define every analysis column on `frame`.
    pub fn run(&self, frame: &Frame, info: &EntryInfo) -> Result<Frame> {
        let ctx = info.context();
        let schema = |e: FrameError| Error::Schema(format!("{ctx}: {e}"));

        frame.require(&self.required_columns(info.source)).map_err(schema)?;

        let w_base = info.exposure.scale(info.source);
        let f = frame.define_f64(W_BASE, &[], move |_| w_base).map_err(schema)?;

        let f = match info.source {
            Source::MC => self.define_simulation(&f).map_err(schema)?,
            Source::Data | Source::Ext => {
                let channel = if info.source == Source::Ext {
                    Channel::External
                } else {
                    Channel::DataInclusive
                };
                define_placeholders(&f, channel).map_err(schema)?
            }
        };

        let reco = self.reco_volume;
        let f = f
            .define_bool(IN_RECO_FIDUCIAL, &RECO_VTX, move |r| {
                reco.contains(r.f64(0), r.f64(1), r.f64(2))
            })
            .map_err(schema)?;

        log::debug!(
            "{ctx}: classified {} sample ({} columns, signal '{}')",
            info.source,
            f.column_names().len(),
            self.signal.name()
        );
        Ok(f)
    }

    fn define_simulation(&self, f: &Frame) -> rx_frame::Result<Frame> {
        let truth = self.truth_volume;
        let f = f
            .define_f64(W_NOMINAL, &[W_BASE, WEIGHT_SPLINE, WEIGHT_TUNE], |r| {
                clamp_weight(r.f64(0) * r.f64(1) * r.f64(2))
            })?
            .define_bool(IN_FIDUCIAL, &NU_VTX, move |r| truth.contains(r.f64(0), r.f64(1), r.f64(2)))?
            .define_i64(COUNT_STRANGE, &STRANGE_COUNTS, |r| (0..r.len()).map(|i| r.i64(i)).sum())?
            .define_bool(IS_STRANGE, &[COUNT_STRANGE], |r| r.i64(0) > 0)?
            .define_i64(SCATTERING_MODE, &[INT_MODE], |r| {
                let mode = r.i64(0);
                if KNOWN_MODES.contains(&mode) { mode } else { -1 }
            })?
            .define_i64(
                ANALYSIS_CHANNELS,
                &[IN_FIDUCIAL, NU_PDG, INT_CCNC, COUNT_STRANGE, N_PI_MINUS, N_PI_PLUS, N_PI0, N_GAMMA, N_PROTON],
                |r| {
                    let truth = TruthSummary {
                        in_fiducial: r.flag(0),
                        nu_pdg: r.i64(1),
                        ccnc: r.i64(2),
                        n_strange: r.i64(3),
                        n_pi_charged: r.i64(4) + r.i64(5),
                        n_pi0: r.i64(6),
                        n_gamma: r.i64(7),
                        n_proton: r.i64(8),
                    };
                    classify(&truth).code()
                },
            )?;

        let signal = Arc::clone(&self.signal);
        let inputs = signal.inputs();
        let f = f
            .define_bool(IS_SIGNAL, &inputs, move |r| signal.is_signal(r))?
            .define_bool(RECOGNISED_SIGNAL, &[IS_SIGNAL, PURITY, COMPLETENESS], |r| {
                r.flag(0) && r.f64(1) > RECOGNITION_PURITY && r.f64(2) > RECOGNITION_COMPLETENESS
            })?;
        Ok(f)
    }
}

fn define_placeholders(f: &Frame, channel: Channel) -> rx_frame::Result<Frame> {
    let code = channel.code();
    f.define_f64(W_NOMINAL, &[W_BASE], |r| clamp_weight(r.f64(0)))?
        .define_bool(IN_FIDUCIAL, &[], |_| false)?
        .define_i64(COUNT_STRANGE, &[], |_| 0)?
        .define_bool(IS_STRANGE, &[], |_| false)?
        .define_i64(SCATTERING_MODE, &[], |_| -1)?
        .define_i64(ANALYSIS_CHANNELS, &[], move |_| code)?
        .define_bool(IS_SIGNAL, &[], |_| false)?
        .define_bool(RECOGNISED_SIGNAL, &[], |_| false)
}
