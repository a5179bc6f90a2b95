//! # wikimirror-mediawiki
//!
//! A blocking [`ContentProvider`](wikimirror_core::ContentProvider) that
//! talks to MediaWiki's Action API: page reads and edits, category, template
//! and image listings, upload by URL, and bot-password login.

mod client;
pub mod error;
pub mod provider;
mod response;

pub use error::MediaWikiError;
pub use provider::{Credentials, MediaWikiProvider, DEFAULT_WRITE_INTERVAL, MAX_CATEGORY_DEPTH};
