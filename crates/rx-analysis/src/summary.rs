//! Event counts and exposure totals over a set of entries.

use std::fmt;

use crate::entry::Entry;

/// Counts of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleCount {
    /// Sample label (see [`Entry::label`]).
    pub label: &'static str,
    /// Input files, comma separated.
    pub files: String,
    /// Events in the nominal view.
    pub nominal: u64,
    /// Events per detector variation, in tag order.
    pub detvars: Vec<(String, u64)>,
}

/// Totals over a group of entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ExposureSummary {
    /// Group name (e.g. `Data`, `Simulation`).
    pub label: String,
    /// Per-sample counts.
    pub samples: Vec<SampleCount>,
    /// Σ nominal events.
    pub n_events: u64,
    /// Whether exposure totals were accumulated.
    pub include_exposure: bool,
    /// Σ target POT.
    pub pot_nominal: f64,
    /// Σ equivalent POT; samples without one count their target POT.
    pub pot_equivalent: f64,
    /// Σ target triggers.
    pub trig_nominal: f64,
    /// Σ recorded triggers; samples without one count their target.
    pub trig_equivalent: f64,
}

impl ExposureSummary {
    /// Count every view of `entries`. Exposure totals stay zero unless
    /// `include_exposure` is set.
    pub fn from_entries(label: impl Into<String>, entries: &[&Entry], include_exposure: bool) -> Self {
        let mut out = Self {
            label: label.into(),
            samples: Vec::with_capacity(entries.len()),
            n_events: 0,
            include_exposure,
            pot_nominal: 0.0,
            pot_equivalent: 0.0,
            trig_nominal: 0.0,
            trig_equivalent: 0.0,
        };

        for entry in entries {
            let nominal = entry.nominal().count();
            out.n_events += nominal;
            let detvars = entry.detvars().iter().map(|(tag, f)| (tag.clone(), f.count())).collect();
            out.samples.push(SampleCount {
                label: entry.label(),
                files: entry.files().join(", "),
                nominal,
                detvars,
            });

            if include_exposure {
                let e = entry.exposure();
                out.pot_nominal += e.pot_nominal;
                out.pot_equivalent +=
                    if e.pot_equivalent > 0.0 { e.pot_equivalent } else { e.pot_nominal };
                out.trig_nominal += e.trig_nominal;
                out.trig_equivalent +=
                    if e.trig_equivalent > 0.0 { e.trig_equivalent } else { e.trig_nominal };
            }
        }
        out
    }
}

impl fmt::Display for ExposureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} samples: {}", self.label, self.samples.len())?;
        for s in &self.samples {
            writeln!(f, "Sample kind '{}' from {}", s.label, s.files)?;
            writeln!(f, "  Nominal entries: {}", s.nominal)?;
            for (tag, n) in &s.detvars {
                writeln!(f, "  Detector variation '{tag}' entries: {n}")?;
            }
        }
        writeln!(f, "Total {} events: {}", self.label, self.n_events)?;
        if self.include_exposure {
            writeln!(f, "Total POT (nominal): {}", self.pot_nominal)?;
            writeln!(f, "Total POT (equivalent): {}", self.pot_equivalent)?;
            writeln!(f, "Total triggers (nominal): {}", self.trig_nominal)?;
            writeln!(f, "Total triggers (equivalent): {}", self.trig_equivalent)?;
        }
        Ok(())
    }
}
