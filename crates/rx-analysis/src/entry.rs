//! Registry entries: one sample with its nominal and detector-variation views.

use std::collections::BTreeMap;

use rx_core::{Exposure, Origin, Slice, Source};
use rx_frame::Frame;

/// Sample metadata shared by all views of an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryInfo {
    /// Beamline key.
    pub beamline: String,
    /// Run period key.
    pub period: String,
    /// Position of the sample within its period.
    pub index: usize,
    /// Provenance.
    pub source: Source,
    /// Truth slice.
    pub slice: Slice,
    /// Origin marker.
    pub origin: Origin,
    /// Normalisation.
    pub exposure: Exposure,
    /// Nominal input files.
    pub files: Vec<String>,
}

impl EntryInfo {
    /// Metadata for a sample outside any registry (tests, ad-hoc frames).
    pub fn standalone(source: Source, exposure: Exposure) -> Self {
        Self {
            beamline: String::new(),
            period: String::new(),
            index: 0,
            source,
            slice: Slice::None,
            origin: Origin::from_source_slice(source, Slice::None),
            exposure,
            files: Vec::new(),
        }
    }

    /// `beamline/period/sample#index`, used in error messages.
    pub fn context(&self) -> String {
        format!("{}/{}/sample#{}", self.beamline, self.period, self.index)
    }

    /// Short sample label: `data`, `ext`, `beam`, `strangeness`, `dirt` or `mc`.
    pub fn label(&self) -> &'static str {
        match self.origin {
            Origin::Data => "data",
            Origin::Ext => "ext",
            Origin::Beam => "beam",
            Origin::Strangeness => "strangeness",
            Origin::Dirt => "dirt",
            Origin::Unknown => "mc",
        }
    }
}

/// A sample in the registry. Immutable once the registry is built.
#[derive(Debug, Clone)]
pub struct Entry {
    info: EntryInfo,
    nominal: Frame,
    detvars: BTreeMap<String, Frame>,
}

impl Entry {
    pub(crate) fn new(info: EntryInfo, nominal: Frame, detvars: BTreeMap<String, Frame>) -> Self {
        Self { info, nominal, detvars }
    }

    /// Sample metadata.
    pub fn info(&self) -> &EntryInfo {
        &self.info
    }

    /// Provenance.
    pub fn source(&self) -> Source {
        self.info.source
    }

    /// Truth slice.
    pub fn slice(&self) -> Slice {
        self.info.slice
    }

    /// Origin marker.
    pub fn origin(&self) -> Origin {
        self.info.origin
    }

    /// Normalisation.
    pub fn exposure(&self) -> &Exposure {
        &self.info.exposure
    }

    /// Nominal input files.
    pub fn files(&self) -> &[String] {
        &self.info.files
    }

    /// See [`EntryInfo::label`].
    pub fn label(&self) -> &'static str {
        self.info.label()
    }

    /// Nominal derived view.
    pub fn nominal(&self) -> &Frame {
        &self.nominal
    }

    /// Detector-variation views by tag.
    pub fn detvars(&self) -> &BTreeMap<String, Frame> {
        &self.detvars
    }

    /// One detector-variation view.
    pub fn detvar(&self, tag: &str) -> Option<&Frame> {
        self.detvars.get(tag)
    }

    pub(crate) fn map_views<F>(self, mut f: F) -> rx_core::Result<Self>
    where
        F: FnMut(&EntryInfo, &Frame) -> rx_core::Result<Frame>,
    {
        let nominal = f(&self.info, &self.nominal)?;
        let detvars = self
            .detvars
            .iter()
            .map(|(tag, frame)| f(&self.info, frame).map(|view| (tag.clone(), view)))
            .collect::<rx_core::Result<BTreeMap<_, _>>>()?;
        Ok(Self { info: self.info, nominal, detvars })
    }
}
