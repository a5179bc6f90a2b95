//! [`ContentProvider`] over the MediaWiki Action API.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use wikimirror_core::types::ns;
use wikimirror_core::{
    ContentProvider, FileMetadata, FileUpload, NamespaceFilter, PageContent, ProviderError,
    ProviderResult, Site, Title, TitleSet,
};

use crate::client::{params, ApiClient, Params};
use crate::error::MediaWikiError;
use crate::response::{self, QueryResponse};

/// Subcategory nesting beyond this depth is not traversed.
pub const MAX_CATEGORY_DEPTH: usize = 20;

/// Default pause between two writes to the same site.
pub const DEFAULT_WRITE_INTERVAL: Duration = Duration::from_secs(10);

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Bot-password credentials used for every site of a run.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Default)]
struct Session {
    csrf_token: Option<String>,
    unthrottled: bool,
    last_write: Option<Instant>,
}

pub struct MediaWikiProvider {
    client: ApiClient,
    credentials: Option<Credentials>,
    write_interval: Duration,
    sessions: Mutex<HashMap<Site, Session>>,
}

impl MediaWikiProvider {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let user_agent = format!("wikimirror/{}", env!("CARGO_PKG_VERSION"));
        Self {
            client: ApiClient::new(&user_agent, timeout),
            credentials: None,
            write_interval: DEFAULT_WRITE_INTERVAL,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_write_interval(mut self, interval: Duration) -> Self {
        self.write_interval = interval;
        self
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<Site, Session>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn query(&self, site: &Site, pairs: &[(&str, &str)]) -> Result<QueryResponse, MediaWikiError> {
        let mut request = params(&[("action", "query")]);
        request.extend(params(pairs));
        QueryResponse::from_value(self.client.get(&site.api_url(), &request)?)
    }

    // -----------------------------------------------------------------------
    // Tokens and pacing
    // -----------------------------------------------------------------------

    fn csrf_token(&self, site: &Site) -> Result<String, MediaWikiError> {
        if let Some(token) = self
            .sessions()
            .get(site)
            .and_then(|s| s.csrf_token.clone())
        {
            return Ok(token);
        }
        let resp = self.query(site, &[("meta", "tokens"), ("type", "csrf")])?;
        let token = resp
            .query
            .tokens
            .csrftoken
            .ok_or_else(|| MediaWikiError::protocol("no csrftoken in response"))?;
        self.sessions().entry(site.clone()).or_default().csrf_token = Some(token.clone());
        Ok(token)
    }

    fn pace(&self, site: &Site) {
        let wait = {
            let mut sessions = self.sessions();
            let session = sessions.entry(site.clone()).or_default();
            let wait = match (session.unthrottled, session.last_write) {
                (false, Some(last)) => self.write_interval.saturating_sub(last.elapsed()),
                _ => Duration::ZERO,
            };
            session.last_write = Some(Instant::now() + wait);
            wait
        };
        if !wait.is_zero() {
            tracing::debug!("Throttling writes to {site} for {wait:?}");
            thread::sleep(wait);
        }
    }

    /// POST a token-bearing write, refreshing the token once on `badtoken`.
    fn post_write(
        &self,
        site: &Site,
        action: &str,
        mut request: Params,
    ) -> Result<response::ActionResult, MediaWikiError> {
        self.pace(site);
        request.insert(0, ("action".to_owned(), action.to_owned()));
        for attempt in 0..2 {
            let mut form = request.clone();
            form.push(("token".to_owned(), self.csrf_token(site)?));
            match self.client.post(&site.api_url(), &form) {
                Err(MediaWikiError::Api { code, .. }) if code == "badtoken" && attempt == 0 => {
                    tracing::debug!("CSRF token for {site} expired, refreshing");
                    if let Some(session) = self.sessions().get_mut(site) {
                        session.csrf_token = None;
                    }
                }
                Err(e) => return Err(e),
                Ok(body) => return response::action_result(&body, action),
            }
        }
        Err(MediaWikiError::protocol("CSRF token rejected twice"))
    }

    // -----------------------------------------------------------------------
    // Listing helpers
    // -----------------------------------------------------------------------

    fn list_prop(
        &self,
        site: &Site,
        title: &Title,
        prop: &str,
        limit_key: &str,
    ) -> Result<TitleSet, MediaWikiError> {
        let base = params(&[
            ("action", "query"),
            ("prop", prop),
            ("titles", title.as_str()),
            (limit_key, "max"),
        ]);
        let mut found = TitleSet::new();
        self.client.get_all(&site.api_url(), &base, |body| {
            let resp = QueryResponse::from_value(body)?;
            for page in resp.query.pages {
                let members = if prop == "templates" {
                    page.templates
                } else {
                    page.images
                };
                found.extend(members.into_iter().map(|m| Title::new(m.title)));
            }
            Ok(())
        })?;
        Ok(found)
    }

    fn category_members(
        &self,
        site: &Site,
        category: &Title,
        namespaces: &NamespaceFilter,
        recurse: bool,
    ) -> Result<TitleSet, MediaWikiError> {
        let mut requested: Vec<i32> = namespaces.namespaces().to_vec();
        if recurse && !requested.is_empty() && !requested.contains(&ns::CATEGORY) {
            requested.push(ns::CATEGORY);
        }
        let ns_param = requested
            .iter()
            .map(i32::to_string)
            .collect::<Vec<_>>()
            .join("|");

        let mut members = TitleSet::new();
        let mut visited: HashSet<Title> = HashSet::from([category.clone()]);
        let mut queue: VecDeque<(Title, usize)> = VecDeque::from([(category.clone(), 0)]);

        while let Some((current, depth)) = queue.pop_front() {
            let mut base = params(&[
                ("action", "query"),
                ("list", "categorymembers"),
                ("cmtitle", current.as_str()),
                ("cmprop", "title"),
                ("cmlimit", "max"),
            ]);
            if !ns_param.is_empty() {
                base.push(("cmnamespace".to_owned(), ns_param.clone()));
            }
            self.client.get_all(&site.api_url(), &base, |body| {
                let resp = QueryResponse::from_value(body)?;
                for member in resp.query.categorymembers {
                    let title = Title::new(&member.title);
                    if member.ns == ns::CATEGORY {
                        if recurse && depth < MAX_CATEGORY_DEPTH && visited.insert(title.clone()) {
                            queue.push_back((title, depth + 1));
                        }
                    } else if namespaces.allows(member.ns) {
                        members.insert(title);
                    }
                }
                Ok(())
            })?;
        }
        Ok(members)
    }
}

impl Default for MediaWikiProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ContentProvider
// ---------------------------------------------------------------------------

impl ContentProvider for MediaWikiProvider {
    fn get_page(&self, site: &Site, title: &Title) -> ProviderResult<PageContent> {
        let run = || -> Result<PageContent, MediaWikiError> {
            let resp = self.query(
                site,
                &[
                    ("prop", "info|revisions"),
                    ("rvprop", "content"),
                    ("rvslots", "main"),
                    ("titles", title.as_str()),
                ],
            )?;
            let is_redirect = resp.first_page().is_some_and(|p| p.redirect);
            let target = if is_redirect {
                let hop = self.query(site, &[("titles", title.as_str()), ("redirects", "1")])?;
                response::redirect_target(&hop)
            } else {
                None
            };
            Ok(response::page_content(site, title, &resp, target))
        };
        run().map_err(|e| e.into_provider(site))
    }

    fn write_page(
        &self,
        site: &Site,
        title: &Title,
        text: &str,
        summary: &str,
    ) -> ProviderResult<()> {
        let request = params(&[
            ("title", title.as_str()),
            ("text", text),
            ("summary", summary),
            ("bot", "1"),
        ]);
        let result = self
            .post_write(site, "edit", request)
            .map_err(|e| e.into_provider(site))?;
        if result.result != "Success" {
            return Err(ProviderError::Api {
                site: site.clone(),
                code: format!("edit-{}", result.result.to_lowercase()),
                info: result.reason.unwrap_or_else(|| format!("edit of {title} not saved")),
            });
        }
        Ok(())
    }

    fn list_category_members(
        &self,
        site: &Site,
        category: &Title,
        namespaces: &NamespaceFilter,
        recurse: bool,
    ) -> ProviderResult<TitleSet> {
        self.category_members(site, category, namespaces, recurse)
            .map_err(|e| e.into_provider(site))
    }

    fn list_templates_used(&self, site: &Site, title: &Title) -> ProviderResult<TitleSet> {
        self.list_prop(site, title, "templates", "tllimit")
            .map_err(|e| e.into_provider(site))
    }

    fn list_files_used(&self, site: &Site, title: &Title) -> ProviderResult<TitleSet> {
        self.list_prop(site, title, "images", "imlimit")
            .map_err(|e| e.into_provider(site))
    }

    fn get_file_metadata(&self, site: &Site, title: &Title) -> ProviderResult<FileMetadata> {
        self.query(
            site,
            &[
                ("prop", "imageinfo|revisions"),
                ("iiprop", "url|comment"),
                ("rvprop", "content"),
                ("rvslots", "main"),
                ("titles", title.as_str()),
            ],
        )
        .map(|resp| response::file_metadata(title, &resp))
        .map_err(|e| e.into_provider(site))
    }

    fn upload_file(&self, site: &Site, title: &Title, upload: &FileUpload) -> ProviderResult<()> {
        let filename = title
            .as_str()
            .split_once(':')
            .map_or(title.as_str(), |(_, name)| name);
        let request = params(&[
            ("filename", filename),
            ("url", upload.source_url.as_str()),
            ("comment", upload.comment.as_str()),
            ("text", upload.description.as_str()),
        ]);
        let result = self
            .post_write(site, "upload", request)
            .map_err(|e| e.into_provider(site))?;
        match result.result.as_str() {
            "Success" => Ok(()),
            other => Err(ProviderError::Api {
                site: site.clone(),
                code: format!("upload-{}", other.to_lowercase()),
                info: result
                    .warnings
                    .map(|w| w.to_string())
                    .unwrap_or_else(|| format!("upload of {title} not accepted")),
            }),
        }
    }

    fn login(&self, site: &Site) -> ProviderResult<()> {
        let Some(creds) = &self.credentials else {
            return Err(ProviderError::Authentication {
                site: site.clone(),
                reason: "no credentials configured".into(),
            });
        };
        let token = self
            .query(site, &[("meta", "tokens"), ("type", "login")])
            .map_err(|e| e.into_provider(site))?
            .query
            .tokens
            .logintoken
            .ok_or_else(|| ProviderError::Authentication {
                site: site.clone(),
                reason: "no login token in response".into(),
            })?;
        let request = params(&[
            ("action", "login"),
            ("lgname", creds.username.as_str()),
            ("lgpassword", creds.password.as_str()),
            ("lgtoken", token.as_str()),
        ]);
        let body = self
            .client
            .post(&site.api_url(), &request)
            .map_err(|e| e.into_provider(site))?;
        let result = response::action_result(&body, "login").map_err(|e| e.into_provider(site))?;
        if result.result != "Success" {
            return Err(ProviderError::Authentication {
                site: site.clone(),
                reason: result.reason.unwrap_or(result.result),
            });
        }
        // A fresh session invalidates any token fetched before login.
        self.sessions().entry(site.clone()).or_default().csrf_token = None;
        tracing::info!("Logged in to {site} as {}", creds.username);
        Ok(())
    }

    fn disable_write_throttle(&self, site: &Site) {
        self.sessions().entry(site.clone()).or_default().unthrottled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("Bot@mirror", "s3cret");
        let shown = format!("{creds:?}");
        assert!(shown.contains("Bot@mirror"));
        assert!(!shown.contains("s3cret"));
    }

    #[test]
    fn login_without_credentials_fails_before_network() {
        let provider = MediaWikiProvider::new();
        let site = Site::new("wikipedia", "en").with_api("http://127.0.0.1:9/api.php");
        assert!(matches!(
            provider.login(&site),
            Err(ProviderError::Authentication { .. })
        ));
    }

    #[test]
    fn unthrottled_site_never_waits() {
        let provider = MediaWikiProvider::new().with_write_interval(Duration::from_secs(3600));
        let site = Site::new("wikipedia", "en");
        provider.disable_write_throttle(&site);
        let started = Instant::now();
        provider.pace(&site);
        provider.pace(&site);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn first_write_is_not_delayed() {
        let provider = MediaWikiProvider::new().with_write_interval(Duration::from_secs(3600));
        let started = Instant::now();
        provider.pace(&Site::new("wikipedia", "fr"));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
