//! Common data types for rarexsec

use std::fmt;

use serde::{Deserialize, Serialize};

/// Provenance of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Beam-on detector data.
    Data,
    /// Off-beam (cosmic) data used to model external backgrounds.
    Ext,
    /// Monte-Carlo simulation.
    #[serde(rename = "mc")]
    MC,
}

impl Source {
    /// Lower-case tag used in labels and log messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Data => "data",
            Source::Ext => "ext",
            Source::MC => "mc",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutually exclusive sub-selection of a simulated sample's truth content.
///
/// Only [`Source::MC`] samples may carry a slice other than `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slice {
    /// No truth-level sub-selection.
    #[default]
    None,
    /// Keep only events without strange hadrons in the final state.
    #[serde(rename = "beam")]
    BeamInclusive,
    /// Keep only events with at least one strange hadron.
    #[serde(rename = "strangeness")]
    StrangenessInclusive,
}

impl Slice {
    /// Lower-case tag used in labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Slice::None => "none",
            Slice::BeamInclusive => "beam",
            Slice::StrangenessInclusive => "strangeness",
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sample origin marker. Distinguishes dirt simulation from other MC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Beam-on data.
    Data,
    /// Off-beam data.
    Ext,
    /// Beam-inclusive simulation.
    Beam,
    /// Strangeness-enriched simulation.
    Strangeness,
    /// Interactions outside the cryostat.
    Dirt,
    /// Simulation without a slice designation.
    Unknown,
}

impl Origin {
    /// Derive the origin from the sample's source and slice.
    pub fn from_source_slice(source: Source, slice: Slice) -> Self {
        match (source, slice) {
            (Source::Data, _) => Origin::Data,
            (Source::Ext, _) => Origin::Ext,
            (Source::MC, Slice::BeamInclusive) => Origin::Beam,
            (Source::MC, Slice::StrangenessInclusive) => Origin::Strangeness,
            (Source::MC, Slice::None) => Origin::Unknown,
        }
    }
}

/// Normalisation metadata of a sample.
///
/// Simulation is scaled by protons-on-target (POT), off-beam data by trigger
/// counts. A ratio is only applied when both of its terms are positive.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Exposure {
    /// Target POT the simulation is normalised to.
    pub pot_nominal: f64,
    /// POT equivalent of the simulated sample.
    pub pot_equivalent: f64,
    /// Target trigger count the off-beam sample is normalised to.
    pub trig_nominal: f64,
    /// Trigger count recorded in the off-beam sample.
    pub trig_equivalent: f64,
}

impl Exposure {
    /// Simulation exposure.
    pub fn pot(nominal: f64, equivalent: f64) -> Self {
        Self { pot_nominal: nominal, pot_equivalent: equivalent, ..Self::default() }
    }

    /// Off-beam exposure.
    pub fn triggers(nominal: f64, equivalent: f64) -> Self {
        Self { trig_nominal: nominal, trig_equivalent: equivalent, ..Self::default() }
    }

    /// Per-event base weight for a sample of the given source.
    pub fn scale(&self, source: Source) -> f64 {
        match source {
            Source::MC => ratio_or_one(self.pot_nominal, self.pot_equivalent),
            Source::Ext => ratio_or_one(self.trig_nominal, self.trig_equivalent),
            Source::Data => 1.0,
        }
    }
}

fn ratio_or_one(nominal: f64, equivalent: f64) -> f64 {
    if nominal > 0.0 && equivalent > 0.0 { nominal / equivalent } else { 1.0 }
}

/// Physics category of an event.
///
/// Every event maps to exactly one value. Codes are stable and are what the
/// `analysis_channels` column stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Channel {
    /// Any beam-on data event.
    DataInclusive,
    /// Off-beam event, or a neutrino interaction outside the fiducial volume.
    External,
    /// Outside the fiducial volume with no neutrino.
    OutOfFiducial,
    /// Neutral-current interaction.
    NeutralCurrent,
    /// Charged current with exactly one strange hadron.
    SingleStrange,
    /// Charged current with more than one strange hadron.
    MultiStrange,
    /// Electron-neutrino charged current.
    ElectronCC,
    /// Muon-neutrino CC, no charged pions and at least one proton.
    MuonCC0PiGe1P,
    /// Muon-neutrino CC, one charged pion and no neutral pion.
    MuonCC1Pi,
    /// Muon-neutrino CC with a neutral pion or at least two photons.
    MuonCCPi0OrGamma,
    /// Muon-neutrino CC with more than one charged pion.
    MuonCCNPi,
    /// Any other muon-neutrino CC topology.
    MuonCCOther,
    /// Not covered by any other category.
    Unknown,
}

impl Channel {
    /// Every channel, in code order.
    pub const ALL: [Channel; 13] = [
        Channel::DataInclusive,
        Channel::External,
        Channel::OutOfFiducial,
        Channel::NeutralCurrent,
        Channel::SingleStrange,
        Channel::MultiStrange,
        Channel::ElectronCC,
        Channel::MuonCC0PiGe1P,
        Channel::MuonCC1Pi,
        Channel::MuonCCPi0OrGamma,
        Channel::MuonCCNPi,
        Channel::MuonCCOther,
        Channel::Unknown,
    ];

    /// Integer code stored in derived columns.
    pub fn code(self) -> i64 {
        match self {
            Channel::DataInclusive => 0,
            Channel::External => 1,
            Channel::OutOfFiducial => 2,
            Channel::NeutralCurrent => 3,
            Channel::SingleStrange => 10,
            Channel::MultiStrange => 11,
            Channel::ElectronCC => 20,
            Channel::MuonCC0PiGe1P => 30,
            Channel::MuonCC1Pi => 31,
            Channel::MuonCCPi0OrGamma => 32,
            Channel::MuonCCNPi => 33,
            Channel::MuonCCOther => 34,
            Channel::Unknown => 99,
        }
    }

    /// Inverse of [`Channel::code`]. Unrecognised codes map to `Unknown`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Channel::DataInclusive,
            1 => Channel::External,
            2 => Channel::OutOfFiducial,
            3 => Channel::NeutralCurrent,
            10 => Channel::SingleStrange,
            11 => Channel::MultiStrange,
            20 => Channel::ElectronCC,
            30 => Channel::MuonCC0PiGe1P,
            31 => Channel::MuonCC1Pi,
            32 => Channel::MuonCCPi0OrGamma,
            33 => Channel::MuonCCNPi,
            34 => Channel::MuonCCOther,
            _ => Channel::Unknown,
        }
    }

    /// Whether the channel is one of the strange-hadron CC categories.
    pub fn is_strange(self) -> bool {
        matches!(self, Channel::SingleStrange | Channel::MultiStrange)
    }

    /// Whether the channel is one of the five muon-neutrino CC sub-channels.
    pub fn is_muon_cc(self) -> bool {
        matches!(
            self,
            Channel::MuonCC0PiGe1P
                | Channel::MuonCC1Pi
                | Channel::MuonCCPi0OrGamma
                | Channel::MuonCCNPi
                | Channel::MuonCCOther
        )
    }

    /// Short label used in tables and plots.
    pub fn label(self) -> &'static str {
        match self {
            Channel::DataInclusive => "data",
            Channel::External => "external",
            Channel::OutOfFiducial => "out_fv",
            Channel::NeutralCurrent => "nc",
            Channel::SingleStrange => "cc_s1",
            Channel::MultiStrange => "cc_sgt1",
            Channel::ElectronCC => "nue_cc",
            Channel::MuonCC0PiGe1P => "numu_cc_0pi_ge1p",
            Channel::MuonCC1Pi => "numu_cc_1pi",
            Channel::MuonCCPi0OrGamma => "numu_cc_pi0_gamma",
            Channel::MuonCCNPi => "numu_cc_npi",
            Channel::MuonCCOther => "numu_cc_other",
            Channel::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn channel_codes_round_trip_and_are_unique() {
        let mut seen = HashSet::new();
        for ch in Channel::ALL {
            assert_eq!(Channel::from_code(ch.code()), ch);
            assert!(seen.insert(ch.code()), "duplicate code for {ch:?}");
        }
        assert_eq!(Channel::from_code(-7), Channel::Unknown);
    }

    #[test]
    fn exposure_scale() {
        let e = Exposure::pot(1.0e20, 4.0e20);
        assert_eq!(e.scale(Source::MC), 0.25);
        assert_eq!(e.scale(Source::Data), 1.0);
        assert_eq!(e.scale(Source::Ext), 1.0);

        let e = Exposure::pot(1.0e20, 0.0);
        assert_eq!(e.scale(Source::MC), 1.0);

        let e = Exposure::triggers(300.0, 100.0);
        assert_eq!(e.scale(Source::Ext), 3.0);
        assert_eq!(e.scale(Source::MC), 1.0);
    }

    #[test]
    fn origin_from_source_slice() {
        assert_eq!(Origin::from_source_slice(Source::Data, Slice::None), Origin::Data);
        assert_eq!(Origin::from_source_slice(Source::Ext, Slice::None), Origin::Ext);
        assert_eq!(Origin::from_source_slice(Source::MC, Slice::BeamInclusive), Origin::Beam);
        assert_eq!(
            Origin::from_source_slice(Source::MC, Slice::StrangenessInclusive),
            Origin::Strangeness
        );
        assert_eq!(Origin::from_source_slice(Source::MC, Slice::None), Origin::Unknown);
    }

    #[test]
    fn channel_groups() {
        let strange: Vec<_> = Channel::ALL.iter().filter(|c| c.is_strange()).collect();
        assert_eq!(strange.len(), 2);
        let mucc: Vec<_> = Channel::ALL.iter().filter(|c| c.is_muon_cc()).collect();
        assert_eq!(mucc.len(), 5);
    }
}
