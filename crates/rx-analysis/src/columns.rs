//! Column names shared between the classifier, presets and partition.

// Event identifiers.
/// Run number.
pub const RUN: &str = "run";
/// Sub-run number.
pub const SUB: &str = "sub";
/// Event number.
pub const EVT: &str = "evt";

// Derived by the classifier.
/// Exposure scale factor.
pub const W_BASE: &str = "w_base";
/// Clamped nominal event weight.
pub const W_NOMINAL: &str = "w_nominal";
/// Truth vertex inside the fiducial volume.
pub const IN_FIDUCIAL: &str = "in_fiducial";
/// Total strange hadron multiplicity.
pub const COUNT_STRANGE: &str = "count_strange";
/// At least one strange hadron.
pub const IS_STRANGE: &str = "is_strange";
/// Interaction mode, or -1 when not recognised.
pub const SCATTERING_MODE: &str = "scattering_mode";
/// [`rx_core::Channel`] code.
pub const ANALYSIS_CHANNELS: &str = "analysis_channels";
/// Signal flag from the configured signal definition.
pub const IS_SIGNAL: &str = "is_signal";
/// Signal that was also well reconstructed.
pub const RECOGNISED_SIGNAL: &str = "recognised_signal";
/// Reconstructed vertex inside the fiducial volume.
pub const IN_RECO_FIDUCIAL: &str = "in_reco_fiducial";

// Derived by the partition.
/// Event held out for training.
pub const IS_TRAINING: &str = "is_training";
/// Rescaled weight for analysis yields.
pub const W_ANALYSIS: &str = "w_analysis";

// Raw simulation inputs.
/// Spline reweighting factor.
pub const WEIGHT_SPLINE: &str = "weightSpline";
/// Generator tune weight.
pub const WEIGHT_TUNE: &str = "weightTune";
/// True neutrino vertex.
pub const NU_VTX: [&str; 3] = ["nu_vtx_x", "nu_vtx_y", "nu_vtx_z"];
/// Strange hadron multiplicities.
pub const STRANGE_COUNTS: [&str; 7] =
    ["n_K_plus", "n_K_minus", "n_K0", "n_lambda", "n_sigma_plus", "n_sigma0", "n_sigma_minus"];
/// Interaction mode code.
pub const INT_MODE: &str = "int_mode";
/// True neutrino PDG code (0 when there is no neutrino).
pub const NU_PDG: &str = "nu_pdg";
/// 0 for charged current, 1 for neutral current.
pub const INT_CCNC: &str = "int_ccnc";
/// Final-state multiplicities used by the muon-CC split.
pub const N_PROTON: &str = "n_p";
/// Negative pion multiplicity.
pub const N_PI_MINUS: &str = "n_pi_minus";
/// Positive pion multiplicity.
pub const N_PI_PLUS: &str = "n_pi_plus";
/// Neutral pion multiplicity.
pub const N_PI0: &str = "n_pi0";
/// Photon multiplicity.
pub const N_GAMMA: &str = "n_gamma";
/// Neutrino purity of the selected slice.
pub const PURITY: &str = "neutrino_purity_from_pfp";
/// Neutrino completeness of the selected slice.
pub const COMPLETENESS: &str = "neutrino_completeness_from_pfp";

// Raw reconstruction inputs.
/// Reconstructed, space-charge corrected vertex.
pub const RECO_VTX: [&str; 3] =
    ["reco_neutrino_vertex_sce_x", "reco_neutrino_vertex_sce_y", "reco_neutrino_vertex_sce_z"];
