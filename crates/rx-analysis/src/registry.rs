//! Sample registry: builds every derived view once and answers queries.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rx_core::{Error, Result, Slice, Source};
use rx_frame::Frame;

use crate::classifier::{Classifier, FiducialVolume, SignalDefinition};
use crate::columns::IS_STRANGE;
use crate::entry::{Entry, EntryInfo};
use crate::manifest::Manifest;
use crate::partition::{PartitionBuilder, PartitionConfig, PartitionResult, annotate};
use crate::source::EventSource;

/// Options for [`Registry::build`].
#[derive(Clone)]
pub struct RegistryConfig {
    /// Definition of `is_signal`.
    pub signal: Arc<dyn SignalDefinition>,
    /// Volume for the truth vertex.
    pub truth_volume: FiducialVolume,
    /// Volume for the reconstructed vertex.
    pub reco_volume: FiducialVolume,
    /// Training partition sizes and seed.
    pub partition: PartitionConfig,
}

impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("signal", &self.signal.name())
            .field("truth_volume", &self.truth_volume)
            .field("reco_volume", &self.reco_volume)
            .field("partition", &self.partition)
            .finish()
    }
}

impl RegistryConfig {
    /// Default volumes and partition with the given signal definition.
    pub fn new(signal: Arc<dyn SignalDefinition>) -> Self {
        Self {
            signal,
            truth_volume: FiducialVolume::default(),
            reco_volume: FiducialVolume::default(),
            partition: PartitionConfig::default(),
        }
    }

    /// Set the truth fiducial volume.
    pub fn truth_volume(mut self, volume: FiducialVolume) -> Self {
        self.truth_volume = volume;
        self
    }

    /// Set the reconstruction fiducial volume.
    pub fn reco_volume(mut self, volume: FiducialVolume) -> Self {
        self.reco_volume = volume;
        self
    }

    /// Set the training partition options.
    pub fn partition(mut self, partition: PartitionConfig) -> Self {
        self.partition = partition;
        self
    }

    fn classifier(&self) -> Classifier {
        Classifier::new(Arc::clone(&self.signal))
            .with_truth_volume(self.truth_volume)
            .with_reco_volume(self.reco_volume)
    }
}

type Db = BTreeMap<String, BTreeMap<String, Vec<Entry>>>;

/// All samples of a manifest, classified, sliced and annotated with the
/// training partition.
#[derive(Debug, Clone)]
pub struct Registry {
    db: Db,
    partition: Arc<PartitionResult>,
}

impl Registry {
    /// Resolve, load and classify every sample, then draw the training
    /// partition over all simulation and annotate every view.
    ///
    /// Fails on the first malformed sample or missing column; errors name
    /// the `beamline/period/sample#index` they come from.
    pub fn build(manifest: &Manifest, source: &dyn EventSource, config: &RegistryConfig) -> Result<Self> {
        let classifier = config.classifier();
        let mut db = Db::new();

        for (beamline, periods) in &manifest.beamlines {
            for (period, samples) in periods {
                let entries = db
                    .entry(beamline.clone())
                    .or_default()
                    .entry(period.clone())
                    .or_default();
                for (index, desc) in samples.samples.iter().enumerate() {
                    let context = format!("{beamline}/{period}/sample#{index}");
                    let spec = desc.resolve(&context)?;
                    let info = EntryInfo {
                        beamline: beamline.clone(),
                        period: period.clone(),
                        index,
                        source: spec.source,
                        slice: spec.slice,
                        origin: spec.origin,
                        exposure: spec.exposure,
                        files: spec.files,
                    };

                    let nominal = build_view(source, &classifier, &info, &info.files)?;
                    let mut detvars = BTreeMap::new();
                    for (tag, files) in &spec.detvars {
                        let view = build_view(source, &classifier, &info, files)?;
                        detvars.insert(tag.clone(), view);
                    }

                    log::debug!(
                        "{context}: {} sample '{}' with {} file(s), {} detector variation(s)",
                        info.source,
                        info.label(),
                        info.files.len(),
                        detvars.len()
                    );
                    entries.push(Entry::new(info, nominal, detvars));
                }
            }
        }

        let builder = PartitionBuilder::new(config.partition);
        for entry in db.values().flat_map(|p| p.values()).flatten() {
            builder.add(entry.info(), entry.nominal())?;
        }
        let partition = Arc::new(builder.finish()?);

        let mut annotated = Db::new();
        for (beamline, periods) in db {
            let by_period = annotated.entry(beamline).or_default();
            for (period, entries) in periods {
                let entries = entries
                    .into_iter()
                    .map(|e| e.map_views(|info, f| annotate(f, &partition, info)))
                    .collect::<Result<Vec<_>>>()?;
                by_period.insert(period, entries);
            }
        }

        let registry = Self { db: annotated, partition };
        log::info!(
            "registry: {} beamline(s), {} sample(s) ({} simulation)",
            registry.db.len(),
            registry.entries().len(),
            registry.entries().iter().filter(|e| e.source() == Source::MC).count()
        );
        Ok(registry)
    }

    fn period_entries<'a>(&'a self, beamline: &str, periods: &[&str]) -> Vec<&'a Entry> {
        let Some(by_period) = self.db.get(beamline) else {
            return Vec::new();
        };
        periods.iter().filter_map(|p| by_period.get(*p)).flatten().collect()
    }

    /// Simulation and off-beam entries of the given periods, in the order
    /// the periods are listed.
    pub fn simulation_entries(&self, beamline: &str, periods: &[&str]) -> Vec<&Entry> {
        self.period_entries(beamline, periods)
            .into_iter()
            .filter(|e| e.source() != Source::Data)
            .collect()
    }

    /// Beam-on data entries of the given periods.
    pub fn data_entries(&self, beamline: &str, periods: &[&str]) -> Vec<&Entry> {
        self.period_entries(beamline, periods)
            .into_iter()
            .filter(|e| e.source() == Source::Data)
            .collect()
    }

    /// Every entry, by beamline, then period, then manifest order.
    pub fn entries(&self) -> Vec<&Entry> {
        self.db.values().flat_map(|p| p.values()).flatten().collect()
    }

    /// Beamline keys.
    pub fn beamlines(&self) -> Vec<&str> {
        self.db.keys().map(String::as_str).collect()
    }

    /// Period keys of a beamline.
    pub fn periods(&self, beamline: &str) -> Vec<&str> {
        self.db.get(beamline).map(|p| p.keys().map(String::as_str).collect()).unwrap_or_default()
    }

    /// The training partition shared by every simulation view.
    pub fn partition(&self) -> &Arc<PartitionResult> {
        &self.partition
    }
}

fn build_view(
    source: &dyn EventSource,
    classifier: &Classifier,
    info: &EntryInfo,
    files: &[String],
) -> Result<Frame> {
    let context = info.context();
    let columns = source.load(files).map_err(|e| match e {
        Error::Source(msg) => Error::Source(format!("{context}: {msg}")),
        Error::Schema(msg) => Error::Schema(format!("{context}: {msg}")),
        other => other,
    })?;
    let frame = classifier.run(&Frame::new(columns), info)?;
    apply_slice(&frame, info)
}

/// Keep the events belonging to the entry's truth slice.
pub fn apply_slice(frame: &Frame, info: &EntryInfo) -> Result<Frame> {
    if info.source != Source::MC && info.slice != Slice::None {
        return Err(Error::Configuration(format!(
            "{}: slice '{}' on a {} sample",
            info.context(),
            info.slice,
            info.source
        )));
    }
    let keep_strange = match info.slice {
        Slice::None => return Ok(frame.clone()),
        Slice::StrangenessInclusive => true,
        Slice::BeamInclusive => false,
    };
    frame
        .filter(info.slice.as_str(), &[IS_STRANGE], move |r| r.flag(0) == keep_strange)
        .map_err(|e| Error::Schema(format!("{}: {e}", info.context())))
}
