//! Error types for wikimirror-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Site, Title};

/// Errors from loading a mirror configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to parse configuration {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error reading configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reported by a [`ContentProvider`](crate::provider::ContentProvider).
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The page or file does not exist where the operation needs it.
    #[error("{title} does not exist on {site}")]
    Missing { site: Site, title: Title },

    /// The wiki answered with an API-level error.
    #[error("{site} rejected the request ({code}): {info}")]
    Api {
        site: Site,
        code: String,
        info: String,
    },

    /// Login was refused or no credentials were available.
    #[error("login to {site} failed: {reason}")]
    Authentication { site: Site, reason: String },

    /// Network or protocol failure below the API layer.
    #[error("transport error talking to {site}: {source}")]
    Transport {
        site: Site,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ProviderError {
    pub fn missing(site: &Site, title: &Title) -> Self {
        Self::Missing {
            site: site.clone(),
            title: title.clone(),
        }
    }
}
