//! Domain types shared by the mirror engine and its content providers.
//!
//! Everything here is a transient, per-run value: titles are recomputed from
//! the configuration and the source wiki on every invocation.

use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Namespaces
// ---------------------------------------------------------------------------

/// Well-known MediaWiki namespace numbers.
pub mod ns {
    pub const MAIN: i32 = 0;
    pub const TALK: i32 = 1;
    pub const USER: i32 = 2;
    pub const PROJECT: i32 = 4;
    pub const FILE: i32 = 6;
    pub const MEDIAWIKI: i32 = 8;
    pub const TEMPLATE: i32 = 10;
    pub const HELP: i32 = 12;
    pub const CATEGORY: i32 = 14;
    pub const MODULE: i32 = 828;
}

/// Namespace names recognised without asking the wiki: the canonical
/// English names plus the File, Template and Category names of the larger
/// language editions. A localised name missing here parses as a
/// main-namespace title; such selectors must use the canonical prefix.
const CANONICAL_PREFIXES: &[(&str, i32)] = &[
    ("talk", ns::TALK),
    ("user", ns::USER),
    ("user talk", 3),
    ("project", ns::PROJECT),
    ("wikipedia", ns::PROJECT),
    ("file", ns::FILE),
    ("image", ns::FILE),
    ("mediawiki", ns::MEDIAWIKI),
    ("template", ns::TEMPLATE),
    ("help", ns::HELP),
    ("category", ns::CATEGORY),
    ("module", ns::MODULE),
    // de
    ("datei", ns::FILE),
    ("vorlage", ns::TEMPLATE),
    ("kategorie", ns::CATEGORY),
    // es
    ("archivo", ns::FILE),
    ("plantilla", ns::TEMPLATE),
    ("categoría", ns::CATEGORY),
    // fr
    ("fichier", ns::FILE),
    ("modèle", ns::TEMPLATE),
    ("catégorie", ns::CATEGORY),
    // it, pt
    ("predefinição", ns::TEMPLATE),
    ("categoria", ns::CATEGORY),
    ("ficheiro", ns::FILE),
    ("arquivo", ns::FILE),
    // nl
    ("bestand", ns::FILE),
    ("sjabloon", ns::TEMPLATE),
    ("categorie", ns::CATEGORY),
    // ru
    ("файл", ns::FILE),
    ("шаблон", ns::TEMPLATE),
    ("категория", ns::CATEGORY),
];

// ---------------------------------------------------------------------------
// Title
// ---------------------------------------------------------------------------

/// Namespace-qualified page title, unique within one wiki.
///
/// Underscores are folded to spaces and surrounding whitespace is trimmed, so
/// `Main_Page` and `Main Page` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Title(String);

impl Title {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().replace('_', " ").trim().to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Namespace number derived from a known prefix (see `CANONICAL_PREFIXES`).
    ///
    /// Unknown prefixes (including titles that merely contain a colon) are
    /// treated as main-namespace titles.
    pub fn namespace(&self) -> i32 {
        let Some((prefix, _)) = self.0.split_once(':') else {
            return ns::MAIN;
        };
        let prefix = prefix.trim().to_lowercase();
        CANONICAL_PREFIXES
            .iter()
            .find(|(name, _)| *name == prefix)
            .map_or(ns::MAIN, |(_, number)| *number)
    }
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Title {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for Title {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for Title {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

impl AsRef<str> for Title {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// TitleSet
// ---------------------------------------------------------------------------

/// Deduplicated set of titles with a deterministic (sorted) iteration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TitleSet(BTreeSet<Title>);

impl TitleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the title was not already present.
    pub fn insert(&mut self, title: Title) -> bool {
        self.0.insert(title)
    }

    pub fn contains(&self, title: &Title) -> bool {
        self.0.contains(title)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, Title> {
        self.0.iter()
    }
}

impl FromIterator<Title> for TitleSet {
    fn from_iter<I: IntoIterator<Item = Title>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> FromIterator<&'a str> for TitleSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self(iter.into_iter().map(Title::new).collect())
    }
}

impl Extend<Title> for TitleSet {
    fn extend<I: IntoIterator<Item = Title>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for TitleSet {
    type Item = Title;
    type IntoIter = btree_set::IntoIter<Title>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TitleSet {
    type Item = &'a Title;
    type IntoIter = btree_set::Iter<'a, Title>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// Site
// ---------------------------------------------------------------------------

/// One wiki instance, identified by `(family, code)`.
///
/// `api` optionally pins the Action API endpoint; it does not take part in
/// identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    #[serde(rename = "fam")]
    pub family: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
}

impl Site {
    pub fn new(family: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            code: code.into(),
            api: None,
        }
    }

    pub fn with_api(mut self, api: impl Into<String>) -> Self {
        self.api = Some(api.into());
        self
    }

    /// Action API endpoint: the pinned `api` URL, or the conventional
    /// `https://{code}.{family}.org/w/api.php`.
    pub fn api_url(&self) -> String {
        match &self.api {
            Some(url) => url.clone(),
            None => format!("https://{}.{}.org/w/api.php", self.code, self.family),
        }
    }
}

impl PartialEq for Site {
    fn eq(&self, other: &Self) -> bool {
        self.family == other.family && self.code == other.code
    }
}

impl Eq for Site {}

impl std::hash::Hash for Site {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.family.hash(state);
        self.code.hash(state);
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.family, self.code)
    }
}

// ---------------------------------------------------------------------------
// Content snapshots
// ---------------------------------------------------------------------------

/// Read-only snapshot of a page. Re-read after any write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub title: Title,
    pub text: String,
    pub exists: bool,
    pub is_redirect: bool,
    pub redirect_target: Option<Title>,
    /// The site the provider actually resolved the title on. Differs from
    /// the requested site for interwiki/interlanguage titles.
    pub resolved_site: Site,
}

impl PageContent {
    /// Snapshot of a page that does not exist on `site`.
    pub fn missing(site: &Site, title: &Title) -> Self {
        Self {
            title: title.clone(),
            text: String::new(),
            exists: false,
            is_redirect: false,
            redirect_target: None,
            resolved_site: site.clone(),
        }
    }
}

/// Metadata of a file description page and its media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub title: Title,
    pub exists: bool,
    pub source_url: Option<String>,
    pub description: String,
    pub comment: String,
}

impl FileMetadata {
    pub fn missing(title: &Title) -> Self {
        Self {
            title: title.clone(),
            exists: false,
            source_url: None,
            description: String::new(),
            comment: String::new(),
        }
    }
}

/// A new file to create on a destination wiki.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub source_url: String,
    pub comment: String,
    pub description: String,
}

// ---------------------------------------------------------------------------
// Configuration-level selectors and rules
// ---------------------------------------------------------------------------

/// Namespaces a category expansion is restricted to. Empty means all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NamespaceFilter(Vec<i32>);

impl NamespaceFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only(namespaces: impl IntoIterator<Item = i32>) -> Self {
        Self(namespaces.into_iter().collect())
    }

    pub fn allows(&self, namespace: i32) -> bool {
        self.0.is_empty() || self.0.contains(&namespace)
    }

    pub fn namespaces(&self) -> &[i32] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for NamespaceFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(i32),
            Many(Vec<i32>),
        }
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None => Self::all(),
            Some(Raw::One(n)) => Self(vec![n]),
            Some(Raw::Many(list)) => Self(list),
        })
    }
}

/// Declares which members of a category take part in the mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySelector {
    pub title: Title,
    #[serde(default, rename = "namespace")]
    pub namespaces: NamespaceFilter,
    #[serde(default, deserialize_with = "bool_or_int")]
    pub recurse: bool,
}

impl CategorySelector {
    pub fn new(title: impl Into<Title>, namespaces: NamespaceFilter, recurse: bool) -> Self {
        Self {
            title: title.into(),
            namespaces,
            recurse,
        }
    }
}

/// One regex substitution. `repl` refers to groups as `\1` or `\g<name>`;
/// `$` is literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub pattern: String,
    pub repl: String,
}

impl Substitution {
    pub fn new(pattern: impl Into<String>, repl: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            repl: repl.into(),
        }
    }
}

/// Ordered substitutions applied to destination pages whose title matches
/// `pages`. Patterns are kept as source text and compiled when applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationRule {
    #[serde(rename = "pages")]
    pub page_pattern: String,
    #[serde(default)]
    pub substitutions: Vec<Substitution>,
}

impl ModificationRule {
    pub fn new(page_pattern: impl Into<String>, substitutions: Vec<Substitution>) -> Self {
        Self {
            page_pattern: page_pattern.into(),
            substitutions,
        }
    }
}

fn bool_or_int<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Bool(bool),
        Int(i64),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Bool(b) => b,
        Raw::Int(n) => n != 0,
    })
}

// ---------------------------------------------------------------------------
// SyncOptions
// ---------------------------------------------------------------------------

/// Run options for one mirror invocation.
///
/// Fields are private so the template invariant holds for every value:
/// dependency sync is only ever on while template sync is on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    force: bool,
    sync_templates: bool,
    sync_template_dependencies: bool,
    upload_files: bool,
    dry_run: bool,
    export_dir: PathBuf,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::new(".")
    }
}

impl SyncOptions {
    /// Everything enabled except `force` and `dry_run`.
    pub fn new(export_dir: impl Into<PathBuf>) -> Self {
        Self {
            force: false,
            sync_templates: true,
            sync_template_dependencies: true,
            upload_files: true,
            dry_run: false,
            export_dir: export_dir.into(),
        }
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Turning templates off also turns template dependencies off.
    pub fn with_sync_templates(mut self, enabled: bool) -> Self {
        self.sync_templates = enabled;
        if !enabled {
            self.sync_template_dependencies = false;
        }
        self
    }

    /// Turning dependencies on also turns templates on.
    pub fn with_sync_template_dependencies(mut self, enabled: bool) -> Self {
        self.sync_template_dependencies = enabled;
        if enabled {
            self.sync_templates = true;
        }
        self
    }

    pub fn with_upload_files(mut self, enabled: bool) -> Self {
        self.upload_files = enabled;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn sync_templates(&self) -> bool {
        self.sync_templates
    }

    pub fn sync_template_dependencies(&self) -> bool {
        self.sync_template_dependencies
    }

    pub fn upload_files(&self) -> bool {
        self.upload_files
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
