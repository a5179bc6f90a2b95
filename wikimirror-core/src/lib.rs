//! # wikimirror-core
//!
//! Domain types, the [`ContentProvider`] capability trait, and JSON
//! configuration loading for the wiki mirror.

pub mod config;
pub mod error;
pub mod memory;
pub mod provider;
pub mod types;

pub use config::MirrorConfig;
pub use error::{ConfigError, ProviderError};
pub use memory::MemoryProvider;
pub use provider::{ContentProvider, ProviderResult};
pub use types::{
    CategorySelector, FileMetadata, FileUpload, ModificationRule, NamespaceFilter, PageContent,
    Site, Substitution, SyncOptions, Title, TitleSet,
};
