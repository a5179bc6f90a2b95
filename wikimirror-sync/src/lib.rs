//! # wikimirror-sync
//!
//! Dependency resolution and synchronization engine for mirroring wiki
//! content.
//!
//! Call [`pipeline::run_config`] to mirror one configuration file, or drive a
//! [`SyncOrchestrator`] directly with already-loaded sites and title sets.

pub mod category;
pub mod error;
pub mod file;
pub mod ledger;
pub mod orchestrator;
pub mod outcome;
pub mod page;
pub mod pipeline;
pub mod resolver;
pub mod transform;

pub use error::SyncError;
pub use file::FileMirror;
pub use orchestrator::{Checkpoint, NoCheckpoint, Phase, ResolvedSets, RunReport, SyncOrchestrator};
pub use outcome::{BatchReport, ItemOutcome, SkipReason};
pub use page::{PageSync, PageSynchronizer};
pub use pipeline::ConfigReport;
pub use transform::TextTransformer;
