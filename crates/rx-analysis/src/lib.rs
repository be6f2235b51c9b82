//! # rx-analysis
//!
//! Event classification, selection presets, the sample registry and the
//! weighted training partition.
//!
//! ## Architecture
//!
//! Raw per-event columns come from an [`EventSource`]. The [`Classifier`]
//! derives weights, truth categories and signal flags; the [`Registry`]
//! applies the sample's truth slice, draws the training partition over all
//! simulation and annotates every view with `is_training` / `w_analysis`.
//! Selection presets then filter those views without modifying them.
//!
//! ```
//! use std::sync::Arc;
//! use rx_analysis::{InMemorySource, Manifest, Registry, RegistryConfig, SampleDescriptor};
//! use rx_analysis::classifier::StrangeChannelSignal;
//! use rx_frame::ColumnSet;
//!
//! let events = ColumnSet::new()
//!     .with_column("reco_neutrino_vertex_sce_x", vec![120.0, 300.0])?
//!     .with_column("reco_neutrino_vertex_sce_y", vec![0.0, 0.0])?
//!     .with_column("reco_neutrino_vertex_sce_z", vec![500.0, 500.0])?;
//!
//! let manifest = Manifest::new()
//!     .add_sample("numi", "run1", SampleDescriptor::new("data").file("data.root"));
//! let source = InMemorySource::new().with_file("data.root", events);
//! let config = RegistryConfig::new(Arc::new(StrangeChannelSignal));
//!
//! let registry = Registry::build(&manifest, &source, &config)?;
//! let data = registry.data_entries("numi", &["run1"]);
//! assert_eq!(data.len(), 1);
//! assert_eq!(data[0].nominal().filter_expr("in_reco_fiducial")?.count(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classifier;
pub mod columns;
pub mod entry;
pub mod manifest;
pub mod partition;
pub mod registry;
pub mod selection;
pub mod source;
pub mod summary;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use classifier::{Classifier, FiducialVolume, SignalDefinition};
pub use entry::{Entry, EntryInfo};
pub use manifest::{DetVarDescriptor, Manifest, SampleDescriptor, SampleSpec};
pub use partition::{PartitionBuilder, PartitionConfig, PartitionResult};
pub use registry::{Registry, RegistryConfig};
pub use selection::{CutflowStage, EvalResult, Preset};
pub use source::{EventSource, InMemorySource};
pub use summary::ExposureSummary;
