//! Error types for wikimirror-mediawiki.

use thiserror::Error;

use wikimirror_core::{ProviderError, Site};

/// Errors from talking to a MediaWiki Action API endpoint.
#[derive(Debug, Error)]
pub enum MediaWikiError {
    /// HTTP status or transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] Box<ureq::Error>),

    /// Reading the response body failed.
    #[error("response read error: {0}")]
    Io(#[from] std::io::Error),

    /// The body was not the JSON shape the API documents.
    #[error("unexpected response: {0}")]
    Json(#[from] serde_json::Error),

    /// The API reported an error object.
    #[error("API error {code}: {info}")]
    Api { code: String, info: String },

    /// A response lacked a field the protocol requires.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<ureq::Error> for MediaWikiError {
    fn from(err: ureq::Error) -> Self {
        Self::Http(Box::new(err))
    }
}

impl MediaWikiError {
    pub(crate) fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Attach the site and lift into the provider-level error.
    pub fn into_provider(self, site: &Site) -> ProviderError {
        match self {
            MediaWikiError::Api { code, info } => ProviderError::Api {
                site: site.clone(),
                code,
                info,
            },
            other => ProviderError::Transport {
                site: site.clone(),
                source: Box::new(other),
            },
        }
    }
}
