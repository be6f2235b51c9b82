//! Sample manifest: beamline → period → sample descriptors.
//!
//! The JSON layout matches the sample catalogue:
//!
//! ```json
//! { "beamlines": { "numi_fhc": { "run1": { "samples": [
//!     { "kind": "mc", "slice": "beam", "files": ["a.root"], "pot": 1e20, "pot_eff": 5e20,
//!       "detvars": { "cv": { "files": ["a_cv.root"] } } },
//!     { "kind": "ext", "file": "ext.root", "trig": 1000, "trig_eff": 4000 }
//! ] } } } }
//! ```

use std::collections::BTreeMap;

use rx_core::{Error, Exposure, Origin, Result, Slice, Source};
use serde::{Deserialize, Serialize};

/// Parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Beamline → period → samples.
    #[serde(default)]
    pub beamlines: BTreeMap<String, BTreeMap<String, PeriodSamples>>,
}

/// Samples recorded for one (beamline, period).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSamples {
    /// Sample descriptors in catalogue order.
    #[serde(default)]
    pub samples: Vec<SampleDescriptor>,
}

/// One sample as written in the manifest, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleDescriptor {
    /// `data`, `ext`/`external`, `mc`, `beam`, `strangeness` or `dirt`.
    pub kind: String,
    /// Input files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    /// Single input file (used when `files` is absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Truth slice for `kind = "mc"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice: Option<String>,
    /// Target POT (simulation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pot: Option<f64>,
    /// POT equivalent of the simulated sample.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pot_eff: Option<f64>,
    /// Target trigger count (off-beam).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trig: Option<f64>,
    /// Recorded trigger count (off-beam).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trig_eff: Option<f64>,
    /// Detector variations: tag → files.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub detvars: BTreeMap<String, DetVarDescriptor>,
}

/// Files of one detector variation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetVarDescriptor {
    /// Input files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    /// Single input file (used when `files` is absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// A validated sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSpec {
    /// Provenance.
    pub source: Source,
    /// Truth slice.
    pub slice: Slice,
    /// Origin marker.
    pub origin: Origin,
    /// Input files, never empty.
    pub files: Vec<String>,
    /// Normalisation.
    pub exposure: Exposure,
    /// Detector variations in tag order, each with a non-empty file list.
    pub detvars: Vec<(String, Vec<String>)>,
}

impl Manifest {
    /// Empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the catalogue JSON layout.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Append a sample to (beamline, period).
    pub fn add_sample(
        mut self,
        beamline: impl Into<String>,
        period: impl Into<String>,
        sample: SampleDescriptor,
    ) -> Self {
        self.beamlines
            .entry(beamline.into())
            .or_default()
            .entry(period.into())
            .or_default()
            .samples
            .push(sample);
        self
    }

    /// Total number of sample descriptors.
    pub fn n_samples(&self) -> usize {
        self.beamlines.values().flat_map(|p| p.values()).map(|s| s.samples.len()).sum()
    }
}

impl SampleDescriptor {
    /// Create a descriptor of the given kind.
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into(), ..Self::default() }
    }

    /// Set the file list.
    pub fn files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = Some(files.into_iter().map(Into::into).collect());
        self
    }

    /// Set a single file.
    pub fn file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// Set the truth slice tag.
    pub fn slice(mut self, slice: impl Into<String>) -> Self {
        self.slice = Some(slice.into());
        self
    }

    /// Set simulation exposure.
    pub fn pot(mut self, nominal: f64, equivalent: f64) -> Self {
        self.pot = Some(nominal);
        self.pot_eff = Some(equivalent);
        self
    }

    /// Set off-beam exposure.
    pub fn triggers(mut self, nominal: f64, equivalent: f64) -> Self {
        self.trig = Some(nominal);
        self.trig_eff = Some(equivalent);
        self
    }

    /// Add a detector variation.
    pub fn detvar<I, S>(mut self, tag: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files = files.into_iter().map(Into::into).collect();
        self.detvars.insert(tag.into(), DetVarDescriptor { files: Some(files), file: None });
        self
    }

    /// Validate and resolve kind, slice, files and exposure.
    ///
    /// `context` identifies the sample in error messages
    /// (e.g. `numi/run1/sample#2`).
    pub fn resolve(&self, context: &str) -> Result<SampleSpec> {
        let (source, slice, origin) = parse_kind(&self.kind, self.slice.as_deref())
            .map_err(|msg| Error::Configuration(format!("{context}: {msg}")))?;

        let files = collect_files(self.files.as_ref(), self.file.as_ref())
            .map_err(|msg| Error::Configuration(format!("{context}: {msg}")))?;

        let exposure = match source {
            Source::MC => {
                Exposure::pot(self.pot.unwrap_or(0.0), self.pot_eff.unwrap_or(0.0))
            }
            Source::Ext => {
                Exposure::triggers(self.trig.unwrap_or(0.0), self.trig_eff.unwrap_or(0.0))
            }
            Source::Data => Exposure::default(),
        };

        let detvars = self
            .detvars
            .iter()
            .map(|(tag, dv)| {
                collect_files(dv.files.as_ref(), dv.file.as_ref())
                    .map(|files| (tag.clone(), files))
                    .map_err(|msg| {
                        Error::Configuration(format!("{context}: detector variation '{tag}': {msg}"))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SampleSpec { source, slice, origin, files, exposure, detvars })
    }
}

fn collect_files(
    files: Option<&Vec<String>>,
    file: Option<&String>,
) -> std::result::Result<Vec<String>, String> {
    let out: Vec<String> = match (files, file) {
        (Some(files), _) => files.iter().filter(|f| !f.is_empty()).cloned().collect(),
        (None, Some(file)) if !file.is_empty() => vec![file.clone()],
        (None, Some(_)) => Vec::new(),
        (None, None) => return Err("sample missing 'file' or 'files'".into()),
    };
    if out.is_empty() {
        return Err("empty 'files'".into());
    }
    Ok(out)
}

/// Resolve a `kind` tag and optional `slice` tag. Both are case-insensitive.
pub fn parse_kind(
    kind: &str,
    slice: Option<&str>,
) -> std::result::Result<(Source, Slice, Origin), String> {
    let kind = kind.trim().to_ascii_lowercase();
    let (source, fixed_slice) = match kind.as_str() {
        "data" => (Source::Data, Slice::None),
        "ext" | "external" => (Source::Ext, Slice::None),
        "mc" => {
            let slice = match slice {
                Some(tag) => parse_slice(tag)?,
                None => Slice::None,
            };
            let origin = Origin::from_source_slice(Source::MC, slice);
            return Ok((Source::MC, slice, origin));
        }
        "beam" => (Source::MC, Slice::BeamInclusive),
        "strangeness" => (Source::MC, Slice::StrangenessInclusive),
        "dirt" => (Source::MC, Slice::None),
        other => return Err(format!("unknown kind: '{other}'")),
    };

    if let Some(tag) = slice {
        return Err(if source == Source::MC {
            format!("slice '{tag}' not allowed for kind '{kind}' (use kind 'mc')")
        } else {
            format!("slice '{tag}' requested for non-MC sample of kind '{kind}'")
        });
    }

    let origin =
        if kind == "dirt" { Origin::Dirt } else { Origin::from_source_slice(source, fixed_slice) };
    Ok((source, fixed_slice, origin))
}

/// Resolve a slice tag.
pub fn parse_slice(tag: &str) -> std::result::Result<Slice, String> {
    match tag.trim().to_ascii_lowercase().as_str() {
        "beam" | "beaminclusive" => Ok(Slice::BeamInclusive),
        "strange" | "strangeness" | "strangenessinclusive" => Ok(Slice::StrangenessInclusive),
        other => Err(format!("unknown slice: '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_catalogue_json() {
        let text = r#"{
          "beamlines": {
            "numi_fhc": {
              "run1": {
                "samples": [
                  {"kind": "MC", "slice": "Strange", "files": ["s.root"], "pot": 1e20, "pot_eff": 4e20,
                   "detvars": {"wiremod_x": {"file": "s_wx.root"}}},
                  {"kind": "ext", "file": "ext.root", "trig": 100, "trig_eff": 400},
                  {"kind": "data", "files": ["d1.root", "d2.root"], "sample_key": "ignored"}
                ]
              }
            }
          }
        }"#;
        let m = Manifest::from_json_str(text).unwrap();
        assert_eq!(m.n_samples(), 3);
        let samples = &m.beamlines["numi_fhc"]["run1"].samples;

        let mc = samples[0].resolve("numi_fhc/run1/sample#0").unwrap();
        assert_eq!(mc.source, Source::MC);
        assert_eq!(mc.slice, Slice::StrangenessInclusive);
        assert_eq!(mc.origin, Origin::Strangeness);
        assert_eq!(mc.exposure.scale(Source::MC), 0.25);
        assert_eq!(mc.detvars, vec![("wiremod_x".to_string(), vec!["s_wx.root".to_string()])]);

        let ext = samples[1].resolve("ctx").unwrap();
        assert_eq!(ext.source, Source::Ext);
        assert_eq!(ext.exposure.trig_nominal, 100.0);
        assert_eq!(ext.files, vec!["ext.root"]);

        let data = samples[2].resolve("ctx").unwrap();
        assert_eq!(data.origin, Origin::Data);
        assert_eq!(data.files.len(), 2);
    }

    #[test]
    fn kinds() {
        assert_eq!(parse_kind("external", None).unwrap().0, Source::Ext);
        assert_eq!(parse_kind("beam", None).unwrap(), (Source::MC, Slice::BeamInclusive, Origin::Beam));
        assert_eq!(parse_kind("dirt", None).unwrap(), (Source::MC, Slice::None, Origin::Dirt));
        assert_eq!(parse_kind("mc", None).unwrap(), (Source::MC, Slice::None, Origin::Unknown));
        assert_eq!(parse_kind("mc", Some("BeamInclusive")).unwrap().1, Slice::BeamInclusive);
    }

    #[test]
    fn configuration_errors() {
        let err = SampleDescriptor::new("cosmics").file("a.root").resolve("bnb/run2/sample#3");
        let msg = err.unwrap_err().to_string();
        assert!(msg.contains("bnb/run2/sample#3"), "{msg}");
        assert!(msg.contains("unknown kind"), "{msg}");

        let err = SampleDescriptor::new("mc").slice("charm").file("a.root").resolve("ctx");
        assert!(err.unwrap_err().to_string().contains("unknown slice"));

        let err = SampleDescriptor::new("data").slice("beam").file("a.root").resolve("ctx");
        assert!(err.unwrap_err().to_string().contains("non-MC"));

        let err = SampleDescriptor::new("mc").files(Vec::<String>::new()).resolve("ctx");
        assert!(err.unwrap_err().to_string().contains("empty 'files'"));

        let err = SampleDescriptor::new("mc").resolve("ctx");
        assert!(err.unwrap_err().to_string().contains("missing 'file'"));

        let err = SampleDescriptor::new("mc")
            .file("a.root")
            .detvar("cv", Vec::<String>::new())
            .resolve("ctx");
        assert!(matches!(err, Err(Error::Configuration(m)) if m.contains("detector variation 'cv'")));
    }

    #[test]
    fn builder_round_trips_through_json() {
        let m = Manifest::new().add_sample(
            "bnb",
            "run1",
            SampleDescriptor::new("mc").files(["a.root"]).pot(1.0, 2.0).detvar("cv", ["b.root"]),
        );
        let text = serde_json::to_string(&m).unwrap();
        assert_eq!(Manifest::from_json_str(&text).unwrap(), m);
    }
}
