//! In-memory [`ContentProvider`] holding any number of wikis.
//!
//! Used by the engine's tests and by offline validation. Redirects are
//! recognised from page text (`#REDIRECT [[Target]]`), so copying a redirect
//! page verbatim yields a redirect on the destination as well.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::error::ProviderError;
use crate::provider::{ContentProvider, ProviderResult};
use crate::types::{
    ns, FileMetadata, FileUpload, NamespaceFilter, PageContent, Site, Title, TitleSet,
};

#[derive(Debug, Clone)]
struct StoredFile {
    source_url: String,
    description: String,
    comment: String,
}

#[derive(Debug, Default)]
struct Wiki {
    pages: BTreeMap<Title, String>,
    categories: HashMap<Title, Vec<Title>>,
    templates: HashMap<Title, TitleSet>,
    files_used: HashMap<Title, TitleSet>,
    files: HashMap<Title, StoredFile>,
    foreign: HashMap<Title, Site>,
    failing_writes: HashSet<Title>,
    reject_login: bool,
    logged_in: bool,
    throttled: bool,
    writes: Vec<Title>,
    uploads: Vec<(Title, FileUpload)>,
}

/// Thread-safe, fully in-memory wiki farm.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    wikis: Mutex<HashMap<Site, Wiki>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, HashMap<Site, Wiki>> {
        self.wikis.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn edit(mut self, site: &Site, f: impl FnOnce(&mut Wiki)) -> Self {
        let wikis = self.wikis.get_mut().unwrap_or_else(|p| p.into_inner());
        f(wikis.entry(site.clone()).or_insert_with(new_wiki));
        self
    }

    // -- builders -----------------------------------------------------------

    pub fn with_page(self, site: &Site, title: &str, text: &str) -> Self {
        let (title, text) = (Title::new(title), text.to_owned());
        self.edit(site, |w| {
            w.pages.insert(title, text);
        })
    }

    /// A page whose text is `#REDIRECT [[target]]`.
    pub fn with_redirect(self, site: &Site, title: &str, target: &str) -> Self {
        let text = format!("#REDIRECT [[{target}]]");
        self.with_page(site, title, &text)
    }

    pub fn with_templates(self, site: &Site, title: &str, templates: &[&str]) -> Self {
        let title = Title::new(title);
        let set: TitleSet = templates.iter().copied().collect();
        self.edit(site, |w| {
            w.templates.insert(title, set);
        })
    }

    pub fn with_files_used(self, site: &Site, title: &str, files: &[&str]) -> Self {
        let title = Title::new(title);
        let set: TitleSet = files.iter().copied().collect();
        self.edit(site, |w| {
            w.files_used.insert(title, set);
        })
    }

    /// Direct members of a category; subcategories are listed as
    /// `Category:` titles.
    pub fn with_category(self, site: &Site, category: &str, members: &[&str]) -> Self {
        let category = Title::new(category);
        let members: Vec<Title> = members.iter().map(|m| Title::new(m)).collect();
        self.edit(site, |w| {
            w.categories.insert(category, members);
        })
    }

    /// A file with its description page.
    pub fn with_file(self, site: &Site, title: &str, source_url: &str, description: &str) -> Self {
        let title = Title::new(title);
        let file = StoredFile {
            source_url: source_url.to_owned(),
            description: description.to_owned(),
            comment: format!("Upload of {title}"),
        };
        self.edit(site, |w| {
            w.pages.insert(title.clone(), file.description.clone());
            w.files.insert(title, file);
        })
    }

    /// Make `title` resolve to another wiki, as interlanguage links do.
    pub fn with_foreign_title(self, site: &Site, title: &str, resolved: &Site) -> Self {
        let (title, resolved) = (Title::new(title), resolved.clone());
        self.edit(site, |w| {
            w.foreign.insert(title, resolved);
        })
    }

    pub fn with_failing_write(self, site: &Site, title: &str) -> Self {
        let title = Title::new(title);
        self.edit(site, |w| {
            w.failing_writes.insert(title);
        })
    }

    pub fn with_rejected_login(self, site: &Site) -> Self {
        self.edit(site, |w| w.reject_login = true)
    }

    // -- inspection ---------------------------------------------------------

    pub fn page_text(&self, site: &Site, title: &str) -> Option<String> {
        self.state()
            .get(site)
            .and_then(|w| w.pages.get(&Title::new(title)).cloned())
    }

    /// Titles written on `site`, in write order.
    pub fn writes(&self, site: &Site) -> Vec<Title> {
        self.state()
            .get(site)
            .map(|w| w.writes.clone())
            .unwrap_or_default()
    }

    pub fn uploads(&self, site: &Site) -> Vec<(Title, FileUpload)> {
        self.state()
            .get(site)
            .map(|w| w.uploads.clone())
            .unwrap_or_default()
    }

    pub fn is_logged_in(&self, site: &Site) -> bool {
        self.state().get(site).is_some_and(|w| w.logged_in)
    }

    pub fn is_throttled(&self, site: &Site) -> bool {
        self.state().get(site).map_or(true, |w| w.throttled)
    }
}

fn new_wiki() -> Wiki {
    Wiki {
        throttled: true,
        ..Wiki::default()
    }
}

/// Target of a `#REDIRECT [[Target]]` page, if `text` is one.
pub fn parse_redirect(text: &str) -> Option<Title> {
    let body = text.trim_start();
    let keyword = body.get(..9)?;
    if !keyword.eq_ignore_ascii_case("#redirect") {
        return None;
    }
    let rest = &body[9..];
    let start = rest.find("[[")? + 2;
    let end = rest[start..].find("]]")? + start;
    let target = rest[start..end]
        .split(['|', '#'])
        .next()
        .unwrap_or_default();
    (!target.trim().is_empty()).then(|| Title::new(target))
}

impl ContentProvider for MemoryProvider {
    fn get_page(&self, site: &Site, title: &Title) -> ProviderResult<PageContent> {
        let state = self.state();
        let Some(wiki) = state.get(site) else {
            return Ok(PageContent::missing(site, title));
        };
        if let Some(resolved) = wiki.foreign.get(title) {
            return Ok(PageContent::missing(resolved, title));
        }
        Ok(match wiki.pages.get(title) {
            None => PageContent::missing(site, title),
            Some(text) => {
                let redirect_target = parse_redirect(text);
                PageContent {
                    title: title.clone(),
                    text: text.clone(),
                    exists: true,
                    is_redirect: redirect_target.is_some(),
                    redirect_target,
                    resolved_site: site.clone(),
                }
            }
        })
    }

    fn write_page(
        &self,
        site: &Site,
        title: &Title,
        text: &str,
        _summary: &str,
    ) -> ProviderResult<()> {
        let mut state = self.state();
        let wiki = state.entry(site.clone()).or_insert_with(new_wiki);
        if wiki.failing_writes.contains(title) {
            return Err(ProviderError::Api {
                site: site.clone(),
                code: "protectedpage".to_owned(),
                info: format!("{title} is protected"),
            });
        }
        wiki.pages.insert(title.clone(), text.to_owned());
        wiki.writes.push(title.clone());
        Ok(())
    }

    fn list_category_members(
        &self,
        site: &Site,
        category: &Title,
        namespaces: &NamespaceFilter,
        recurse: bool,
    ) -> ProviderResult<TitleSet> {
        let state = self.state();
        let mut members = TitleSet::new();
        let Some(wiki) = state.get(site) else {
            return Ok(members);
        };

        let mut visited = HashSet::from([category.clone()]);
        let mut queue = VecDeque::from([category.clone()]);
        while let Some(current) = queue.pop_front() {
            for member in wiki.categories.get(&current).into_iter().flatten() {
                if member.namespace() == ns::CATEGORY {
                    if recurse && visited.insert(member.clone()) {
                        queue.push_back(member.clone());
                    }
                } else if namespaces.allows(member.namespace()) {
                    members.insert(member.clone());
                }
            }
        }
        Ok(members)
    }

    fn list_templates_used(&self, site: &Site, title: &Title) -> ProviderResult<TitleSet> {
        Ok(self
            .state()
            .get(site)
            .and_then(|w| w.templates.get(title).cloned())
            .unwrap_or_default())
    }

    fn list_files_used(&self, site: &Site, title: &Title) -> ProviderResult<TitleSet> {
        Ok(self
            .state()
            .get(site)
            .and_then(|w| w.files_used.get(title).cloned())
            .unwrap_or_default())
    }

    fn get_file_metadata(&self, site: &Site, title: &Title) -> ProviderResult<FileMetadata> {
        let state = self.state();
        Ok(match state.get(site).and_then(|w| w.files.get(title)) {
            None => FileMetadata::missing(title),
            Some(file) => FileMetadata {
                title: title.clone(),
                exists: true,
                source_url: Some(file.source_url.clone()),
                description: file.description.clone(),
                comment: file.comment.clone(),
            },
        })
    }

    fn upload_file(&self, site: &Site, title: &Title, upload: &FileUpload) -> ProviderResult<()> {
        let mut state = self.state();
        let wiki = state.entry(site.clone()).or_insert_with(new_wiki);
        if wiki.failing_writes.contains(title) {
            return Err(ProviderError::Api {
                site: site.clone(),
                code: "fileexists-forbidden".to_owned(),
                info: format!("{title} cannot be uploaded"),
            });
        }
        if wiki.files.contains_key(title) {
            return Err(ProviderError::Api {
                site: site.clone(),
                code: "fileexists-no-change".to_owned(),
                info: format!("{title} already exists"),
            });
        }
        wiki.files.insert(
            title.clone(),
            StoredFile {
                source_url: upload.source_url.clone(),
                description: upload.description.clone(),
                comment: upload.comment.clone(),
            },
        );
        wiki.pages.insert(title.clone(), upload.description.clone());
        wiki.uploads.push((title.clone(), upload.clone()));
        Ok(())
    }

    fn login(&self, site: &Site) -> ProviderResult<()> {
        let mut state = self.state();
        let wiki = state.entry(site.clone()).or_insert_with(new_wiki);
        if wiki.reject_login {
            return Err(ProviderError::Authentication {
                site: site.clone(),
                reason: "wrong password".to_owned(),
            });
        }
        wiki.logged_in = true;
        Ok(())
    }

    fn disable_write_throttle(&self, site: &Site) {
        let mut state = self.state();
        state.entry(site.clone()).or_insert_with(new_wiki).throttled = false;
    }
}
