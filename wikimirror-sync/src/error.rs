//! Error types for wikimirror-sync.

use std::path::PathBuf;

use thiserror::Error;

use wikimirror_core::{ConfigError, ProviderError, Site};

use crate::orchestrator::Phase;

/// All errors that can arise from mirror operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The configuration file could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A content provider call failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Logging in to the destination failed; the run cannot write anything.
    #[error("authentication to {site} failed: {source}")]
    Authentication {
        site: Site,
        #[source]
        source: ProviderError,
    },

    /// A modification rule carries an invalid regular expression.
    #[error("invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (title ledger).
    #[error("title ledger JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A checkpoint between phases refused to let the run continue.
    #[error("run stopped after {phase}: {source}")]
    Checkpoint {
        phase: Phase,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
