//! JSON mirror configuration.
//!
//! # File shape
//!
//! ```text
//! {
//!   "sites": { "src": {"fam": "wikipedia", "code": "en"},
//!              "dst": {"fam": "kiwix", "code": "en", "api": "http://wiki.local/api.php"} },
//!   "pages": ["Main Page", "MediaWiki:Common.css"],
//!   "categories": [ {"title": "Category:Physics", "namespace": 0, "recurse": 1} ],
//!   "modifications": [ {"pages": "^Main", "substitutions": [ {"pattern": "a", "repl": "b"} ]} ]
//! }
//! ```
//!
//! `sites` and `pages` are required; `categories` and `modifications` default
//! to empty lists.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{CategorySelector, ModificationRule, Site, Title, TitleSet};

/// Source and destination wikis of one mirror configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitePair {
    pub src: Site,
    pub dst: Site,
}

/// One parsed mirror configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorConfig {
    pub sites: SitePair,
    pub pages: Vec<Title>,
    #[serde(default)]
    pub categories: Vec<CategorySelector>,
    #[serde(default)]
    pub modifications: Vec<ModificationRule>,
}

impl MirrorConfig {
    /// The explicit page list, deduplicated.
    pub fn page_set(&self) -> TitleSet {
        self.pages.iter().cloned().collect()
    }
}

/// Load and parse a configuration file.
///
/// Returns `ConfigError::NotFound` if absent and `ConfigError::Parse`
/// (with path context) for malformed JSON or a missing required key.
pub fn load_at(path: &Path) -> Result<MirrorConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(path, &contents)
}

/// Parse configuration text; `origin` only labels errors.
pub fn parse(origin: impl Into<PathBuf>, contents: &str) -> Result<MirrorConfig, ConfigError> {
    serde_json::from_str(contents).map_err(|source| ConfigError::Parse {
        path: origin.into(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NamespaceFilter;

    const FULL: &str = r#"{
        "sites": {
            "src": {"fam": "wikipedia", "code": "en"},
            "dst": {"fam": "kiwix", "code": "en", "api": "http://wiki.local/api.php"}
        },
        "pages": ["Main_Page", "MediaWiki:Common.css", "Main Page"],
        "categories": [
            {"title": "Category:Physics", "namespace": 0, "recurse": 1},
            {"title": "Category:Help", "namespace": [4, 12], "recurse": false}
        ],
        "modifications": [
            {"pages": "^Main", "substitutions": [
                {"pattern": "foo", "repl": "bar"},
                {"pattern": "bar", "repl": "baz"}
            ]}
        ]
    }"#;

    #[test]
    fn parses_full_document() {
        let cfg = parse("full.json", FULL).unwrap();
        assert_eq!(cfg.sites.src, Site::new("wikipedia", "en"));
        assert_eq!(
            cfg.sites.dst.api.as_deref(),
            Some("http://wiki.local/api.php")
        );
        assert_eq!(cfg.pages.len(), 3);
        assert_eq!(cfg.page_set().len(), 2, "Main_Page and Main Page are one title");
        assert!(cfg.categories[0].recurse);
        assert_eq!(cfg.categories[1].namespaces, NamespaceFilter::only([4, 12]));
        assert_eq!(cfg.modifications[0].substitutions.len(), 2);
        assert_eq!(cfg.modifications[0].substitutions[1].repl, "baz");
    }

    #[test]
    fn optional_sections_default_to_empty() {
        let cfg = parse(
            "min.json",
            r#"{"sites":{"src":{"fam":"a","code":"b"},"dst":{"fam":"c","code":"d"}},"pages":[]}"#,
        )
        .unwrap();
        assert!(cfg.categories.is_empty());
        assert!(cfg.modifications.is_empty());
    }

    #[test]
    fn missing_pages_key_is_a_parse_error() {
        let err = parse(
            "nopages.json",
            r#"{"sites":{"src":{"fam":"a","code":"b"},"dst":{"fam":"c","code":"d"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("pages"));
        assert!(err.to_string().contains("nopages.json"));
    }
}
