//! Synthetic events for tests.
//!
//! Defaults describe a well reconstructed muon-neutrino CC event with one
//! proton, inside both fiducial volumes, that passes every selection preset.

use rx_frame::{ColumnSet, JaggedCol, Result};

use crate::classifier::{IS_NU_MU_CC, LAMBDA_DECAY_IN_FID};
use crate::columns::*;

/// One reconstructed track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Track {
    /// Track-vs-shower score.
    pub score: f64,
    /// Length (cm).
    pub length: f64,
    /// Distance to the vertex (cm).
    pub distance: f64,
    /// Hierarchy generation.
    pub generation: f64,
}

impl Default for Track {
    fn default() -> Self {
        Self { score: 0.9, length: 50.0, distance: 1.0, generation: 2.0 }
    }
}

/// Reconstruction-level quantities read by the classifier and presets.
#[derive(Debug, Clone, PartialEq)]
pub struct Reco {
    /// Reconstructed vertex.
    pub vertex: [f64; 3],
    /// Beam-window light.
    pub pe_beam: f64,
    /// Veto-window light.
    pub pe_veto: f64,
    /// Software trigger decision.
    pub software_trigger: i64,
    /// Number of neutrino slices.
    pub num_slices: i64,
    /// Slice topological score.
    pub topological_score: f64,
    /// Contained fraction.
    pub contained_fraction: f64,
    /// Slice cluster fraction.
    pub cluster_fraction: f64,
    /// Tracks of the slice.
    pub tracks: Vec<Track>,
}

impl Default for Reco {
    fn default() -> Self {
        Self {
            vertex: [120.0, 0.0, 500.0],
            pe_beam: 50.0,
            pe_veto: 5.0,
            software_trigger: 1,
            num_slices: 1,
            topological_score: 0.5,
            contained_fraction: 0.9,
            cluster_fraction: 0.8,
            tracks: vec![Track::default()],
        }
    }
}

/// A simulated event.
#[derive(Debug, Clone, PartialEq)]
pub struct McEvent {
    /// Run number.
    pub run: i64,
    /// Sub-run number.
    pub sub: i64,
    /// Event number.
    pub evt: i64,
    /// Spline weight.
    pub weight_spline: f64,
    /// Tune weight.
    pub weight_tune: f64,
    /// True vertex.
    pub nu_vtx: [f64; 3],
    /// Strange multiplicities in [`STRANGE_COUNTS`] order.
    pub strange: [i64; 7],
    /// Interaction mode.
    pub int_mode: i64,
    /// Neutrino PDG code.
    pub nu_pdg: i64,
    /// 0 = CC, 1 = NC.
    pub int_ccnc: i64,
    /// Protons.
    pub n_p: i64,
    /// Negative pions.
    pub n_pi_minus: i64,
    /// Positive pions.
    pub n_pi_plus: i64,
    /// Neutral pions.
    pub n_pi0: i64,
    /// Photons.
    pub n_gamma: i64,
    /// Slice purity.
    pub purity: f64,
    /// Slice completeness.
    pub completeness: f64,
    /// Muon-neutrino CC truth flag.
    pub is_nu_mu_cc: bool,
    /// Per-lambda decay-in-volume flags.
    pub lambda_decay_in_fid: Vec<f64>,
    /// Reconstruction.
    pub reco: Reco,
}

impl McEvent {
    /// Default event with the given identity.
    pub fn new(run: i64, sub: i64, evt: i64) -> Self {
        Self {
            run,
            sub,
            evt,
            weight_spline: 1.0,
            weight_tune: 1.0,
            nu_vtx: [120.0, 0.0, 500.0],
            strange: [0; 7],
            int_mode: 0,
            nu_pdg: 14,
            int_ccnc: 0,
            n_p: 1,
            n_pi_minus: 0,
            n_pi_plus: 0,
            n_pi0: 0,
            n_gamma: 0,
            purity: 0.9,
            completeness: 0.9,
            is_nu_mu_cc: true,
            lambda_decay_in_fid: Vec::new(),
            reco: Reco::default(),
        }
    }

    /// Set the product of the generator weights.
    pub fn weight(mut self, w: f64) -> Self {
        self.weight_spline = w;
        self.weight_tune = 1.0;
        self
    }

    /// Put `n` lambdas in the final state.
    pub fn lambdas(mut self, n: i64) -> Self {
        self.strange[3] = n;
        self
    }

    /// Move the true vertex.
    pub fn truth_vertex(mut self, x: f64, y: f64, z: f64) -> Self {
        self.nu_vtx = [x, y, z];
        self
    }

    /// Set neutrino flavour and current.
    pub fn neutrino(mut self, pdg: i64, ccnc: i64) -> Self {
        self.nu_pdg = pdg;
        self.int_ccnc = ccnc;
        self
    }
}

fn push_reco<'a>(
    set: &mut ColumnSet,
    reco: impl Iterator<Item = &'a Reco> + Clone,
) -> Result<()> {
    for (axis, name) in RECO_VTX.iter().enumerate() {
        set.push(*name, reco.clone().map(|r| r.vertex[axis]).collect::<Vec<f64>>())?;
    }
    set.push("optical_filter_pe_beam", reco.clone().map(|r| r.pe_beam).collect::<Vec<_>>())?;
    set.push("optical_filter_pe_veto", reco.clone().map(|r| r.pe_veto).collect::<Vec<_>>())?;
    set.push("software_trigger", reco.clone().map(|r| r.software_trigger).collect::<Vec<_>>())?;
    set.push("num_slices", reco.clone().map(|r| r.num_slices).collect::<Vec<_>>())?;
    set.push("topological_score", reco.clone().map(|r| r.topological_score).collect::<Vec<_>>())?;
    set.push("contained_fraction", reco.clone().map(|r| r.contained_fraction).collect::<Vec<_>>())?;
    set.push("slice_cluster_fraction", reco.clone().map(|r| r.cluster_fraction).collect::<Vec<_>>())?;

    let tracks = |get: fn(&Track) -> f64| {
        let rows: Vec<Vec<f64>> = reco.clone().map(|r| r.tracks.iter().map(get).collect()).collect();
        JaggedCol::from_rows(&rows)
    };
    set.push("track_shower_scores", tracks(|t| t.score))?;
    set.push("track_length", tracks(|t| t.length))?;
    set.push("track_distance_to_vertex", tracks(|t| t.distance))?;
    set.push("pfp_generations", tracks(|t| t.generation))?;
    Ok(())
}

/// Beam-on or off-beam events with default reconstruction.
pub fn data_events(ids: &[(i64, i64, i64)]) -> Result<ColumnSet> {
    let reco: Vec<Reco> = ids.iter().map(|_| Reco::default()).collect();
    data_events_with(ids, &reco)
}

/// Beam-on or off-beam events with the given reconstruction.
pub fn data_events_with(ids: &[(i64, i64, i64)], reco: &[Reco]) -> Result<ColumnSet> {
    let mut set = ColumnSet::new();
    set.push(RUN, ids.iter().map(|i| i.0).collect::<Vec<_>>())?;
    set.push(SUB, ids.iter().map(|i| i.1).collect::<Vec<_>>())?;
    set.push(EVT, ids.iter().map(|i| i.2).collect::<Vec<_>>())?;
    push_reco(&mut set, reco.iter())?;
    Ok(set)
}

/// Simulated events with every raw column the classifier and presets read.
pub fn mc_events(events: &[McEvent]) -> Result<ColumnSet> {
    let mut set = ColumnSet::new();
    let ints = |get: fn(&McEvent) -> i64| events.iter().map(get).collect::<Vec<i64>>();
    let floats = |get: fn(&McEvent) -> f64| events.iter().map(get).collect::<Vec<f64>>();

    set.push(RUN, ints(|e| e.run))?;
    set.push(SUB, ints(|e| e.sub))?;
    set.push(EVT, ints(|e| e.evt))?;
    set.push(WEIGHT_SPLINE, floats(|e| e.weight_spline))?;
    set.push(WEIGHT_TUNE, floats(|e| e.weight_tune))?;
    for (axis, name) in NU_VTX.iter().enumerate() {
        set.push(*name, events.iter().map(|e| e.nu_vtx[axis]).collect::<Vec<f64>>())?;
    }
    for (k, name) in STRANGE_COUNTS.iter().enumerate() {
        set.push(*name, events.iter().map(|e| e.strange[k]).collect::<Vec<i64>>())?;
    }
    set.push(INT_MODE, ints(|e| e.int_mode))?;
    set.push(NU_PDG, ints(|e| e.nu_pdg))?;
    set.push(INT_CCNC, ints(|e| e.int_ccnc))?;
    set.push(N_PROTON, ints(|e| e.n_p))?;
    set.push(N_PI_MINUS, ints(|e| e.n_pi_minus))?;
    set.push(N_PI_PLUS, ints(|e| e.n_pi_plus))?;
    set.push(N_PI0, ints(|e| e.n_pi0))?;
    set.push(N_GAMMA, ints(|e| e.n_gamma))?;
    set.push(PURITY, floats(|e| e.purity))?;
    set.push(COMPLETENESS, floats(|e| e.completeness))?;
    set.push(IS_NU_MU_CC, events.iter().map(|e| e.is_nu_mu_cc).collect::<Vec<bool>>())?;
    let decays: Vec<&[f64]> = events.iter().map(|e| e.lambda_decay_in_fid.as_slice()).collect();
    set.push(LAMBDA_DECAY_IN_FID, JaggedCol::from_rows(&decays))?;
    push_reco(&mut set, events.iter().map(|e| &e.reco))?;
    Ok(set)
}
