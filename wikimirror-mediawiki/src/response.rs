//! Typed views of Action API responses (`formatversion=2`).
//!
//! Every struct tolerates absent fields; the API omits keys rather than
//! sending `false` or empty arrays.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use wikimirror_core::{FileMetadata, PageContent, Site, Title};

use crate::error::MediaWikiError;

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub info: String,
}

/// Fail with [`MediaWikiError::Api`] when the body carries an `error` object.
pub(crate) fn check_error(body: &Value) -> Result<(), MediaWikiError> {
    match body.get("error") {
        Some(err) => {
            let err: ApiErrorBody = serde_json::from_value(err.clone())?;
            Err(MediaWikiError::Api {
                code: err.code,
                info: err.info,
            })
        }
        None => Ok(()),
    }
}

/// The `continue` object of a list query, flattened to string parameters.
pub(crate) fn continuation(body: &Value) -> Option<Vec<(String, String)>> {
    let cont = body.get("continue")?.as_object()?;
    let params = cont
        .iter()
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect();
    Some(params)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub query: Query,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Query {
    #[serde(default)]
    pub pages: Vec<QueryPage>,
    #[serde(default)]
    pub redirects: Vec<Redirect>,
    #[serde(default)]
    pub interwiki: Vec<Interwiki>,
    #[serde(default)]
    pub categorymembers: Vec<Member>,
    #[serde(default)]
    pub tokens: Tokens,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct QueryPage {
    pub title: String,
    #[serde(default)]
    pub ns: i32,
    #[serde(default)]
    pub missing: bool,
    #[serde(default)]
    pub known: bool,
    #[serde(default)]
    pub invalid: bool,
    #[serde(default)]
    pub redirect: bool,
    #[serde(default)]
    pub revisions: Vec<Revision>,
    #[serde(default)]
    pub templates: Vec<Member>,
    #[serde(default)]
    pub images: Vec<Member>,
    #[serde(default)]
    pub imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Revision {
    #[serde(default)]
    pub slots: BTreeMap<String, Slot>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Slot {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Redirect {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Interwiki {
    pub title: String,
    pub iw: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Member {
    #[serde(default)]
    pub ns: i32,
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ImageInfo {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Tokens {
    #[serde(default)]
    pub logintoken: Option<String>,
    #[serde(default)]
    pub csrftoken: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActionResult {
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub warnings: Option<Value>,
}

impl QueryResponse {
    pub(crate) fn from_value(body: Value) -> Result<Self, MediaWikiError> {
        Ok(serde_json::from_value(body)?)
    }

    pub(crate) fn first_page(&self) -> Option<&QueryPage> {
        self.query.pages.first()
    }
}

impl QueryPage {
    fn main_slot(&self) -> Option<&str> {
        self.revisions
            .first()
            .and_then(|rev| rev.slots.get("main"))
            .map(|slot| slot.content.as_str())
    }
}

/// Result object of an `action=...` write (`edit`, `upload`, `login`).
pub(crate) fn action_result(body: &Value, action: &str) -> Result<ActionResult, MediaWikiError> {
    let obj = body
        .get(action)
        .ok_or_else(|| MediaWikiError::protocol(format!("no '{action}' object in response")))?;
    Ok(serde_json::from_value(obj.clone())?)
}

// ---------------------------------------------------------------------------
// Conversions into domain snapshots
// ---------------------------------------------------------------------------

/// Build a [`PageContent`] from a `prop=info|revisions` query.
///
/// An interwiki title resolves to a sibling site of the same family whose
/// code is the interwiki prefix.
pub(crate) fn page_content(
    site: &Site,
    title: &Title,
    resp: &QueryResponse,
    redirect_target: Option<Title>,
) -> PageContent {
    if let Some(iw) = resp.query.interwiki.first() {
        let mut content = PageContent::missing(site, &Title::new(&iw.title));
        content.resolved_site = Site::new(site.family.clone(), iw.iw.clone());
        return content;
    }
    let Some(page) = resp.first_page() else {
        return PageContent::missing(site, title);
    };
    if page.missing || page.invalid {
        return PageContent::missing(site, &Title::new(&page.title));
    }
    PageContent {
        title: Title::new(&page.title),
        text: page.main_slot().unwrap_or_default().to_owned(),
        exists: true,
        is_redirect: page.redirect,
        redirect_target: if page.redirect { redirect_target } else { None },
        resolved_site: site.clone(),
    }
}

/// Target of the first hop of a `redirects=1` query.
pub(crate) fn redirect_target(resp: &QueryResponse) -> Option<Title> {
    resp.query.redirects.first().map(|r| Title::new(&r.to))
}

/// Build [`FileMetadata`] from a `prop=imageinfo|revisions` query.
///
/// A file served from a shared repository (`missing` but `known`) counts as
/// existing; its description text is empty.
pub(crate) fn file_metadata(title: &Title, resp: &QueryResponse) -> FileMetadata {
    let Some(page) = resp.first_page() else {
        return FileMetadata::missing(title);
    };
    let exists = !page.invalid && (!page.missing || page.known);
    if !exists {
        return FileMetadata::missing(title);
    }
    let info = page.imageinfo.first();
    FileMetadata {
        title: Title::new(&page.title),
        exists,
        source_url: info.and_then(|i| i.url.clone()),
        description: page.main_slot().unwrap_or_default().to_owned(),
        comment: info.map(|i| i.comment.clone()).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn site() -> Site {
        Site::new("wikipedia", "en")
    }

    fn parse(body: Value) -> QueryResponse {
        QueryResponse::from_value(body).unwrap()
    }

    #[test]
    fn error_object_becomes_api_error() {
        let body = json!({"error": {"code": "badtoken", "info": "Invalid CSRF token."}});
        match check_error(&body) {
            Err(MediaWikiError::Api { code, info }) => {
                assert_eq!(code, "badtoken");
                assert_eq!(info, "Invalid CSRF token.");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert!(check_error(&json!({"query": {}})).is_ok());
    }

    #[test]
    fn continuation_flattens_values() {
        let body = json!({"continue": {"cmcontinue": "page|41|12", "continue": "-||"}});
        let mut params = continuation(&body).unwrap();
        params.sort();
        assert_eq!(
            params,
            vec![
                ("cmcontinue".to_owned(), "page|41|12".to_owned()),
                ("continue".to_owned(), "-||".to_owned()),
            ]
        );
        assert!(continuation(&json!({"batchcomplete": true})).is_none());
    }

    #[test]
    fn existing_page_reads_main_slot() {
        let resp = parse(json!({"query": {"pages": [{
            "pageid": 7, "ns": 0, "title": "Paris",
            "revisions": [{"slots": {"main": {"contentmodel": "wikitext", "content": "Capital."}}}]
        }]}}));
        let page = page_content(&site(), &Title::new("Paris"), &resp, None);
        assert!(page.exists);
        assert!(!page.is_redirect);
        assert_eq!(page.text, "Capital.");
        assert_eq!(page.resolved_site, site());
    }

    #[test]
    fn missing_page_is_not_an_error() {
        let resp = parse(json!({"query": {"pages": [{"ns": 0, "title": "Nowhere", "missing": true}]}}));
        let page = page_content(&site(), &Title::new("Nowhere"), &resp, None);
        assert!(!page.exists);
        assert!(page.text.is_empty());
    }

    #[test]
    fn redirect_page_carries_target() {
        let resp = parse(json!({"query": {"pages": [{
            "ns": 0, "title": "Main Page", "redirect": true,
            "revisions": [{"slots": {"main": {"content": "#REDIRECT [[Home]]"}}}]
        }]}}));
        let hop = parse(json!({"query": {"redirects": [{"from": "Main Page", "to": "Home"}]}}));
        let page = page_content(
            &site(),
            &Title::new("Main Page"),
            &resp,
            redirect_target(&hop),
        );
        assert!(page.is_redirect);
        assert_eq!(page.redirect_target, Some(Title::new("Home")));
    }

    #[test]
    fn interwiki_title_resolves_to_sibling_site() {
        let resp = parse(json!({"query": {"interwiki": [{"title": "fr:Accueil", "iw": "fr"}]}}));
        let page = page_content(&site(), &Title::new("fr:Accueil"), &resp, None);
        assert_eq!(page.resolved_site, Site::new("wikipedia", "fr"));
        assert!(!page.exists);
    }

    #[test]
    fn file_metadata_from_local_file() {
        let resp = parse(json!({"query": {"pages": [{
            "ns": 6, "title": "File:Logo.png",
            "imageinfo": [{"url": "https://upload.example.org/Logo.png", "comment": "initial"}],
            "revisions": [{"slots": {"main": {"content": "== Summary =="}}}]
        }]}}));
        let meta = file_metadata(&Title::new("File:Logo.png"), &resp);
        assert!(meta.exists);
        assert_eq!(meta.source_url.as_deref(), Some("https://upload.example.org/Logo.png"));
        assert_eq!(meta.comment, "initial");
        assert_eq!(meta.description, "== Summary ==");
    }

    #[rstest]
    #[case::local(json!({"ns": 6, "title": "File:X.png",
        "imageinfo": [{"url": "https://up.example.org/X.png"}]}), true)]
    #[case::shared_repository(json!({"ns": 6, "title": "File:X.png", "missing": true,
        "known": true, "imagerepository": "shared",
        "imageinfo": [{"url": "https://commons.example.org/X.png"}]}), true)]
    #[case::absent(json!({"ns": 6, "title": "File:X.png", "missing": true}), false)]
    #[case::invalid(json!({"title": "File:<>", "invalid": true}), false)]
    fn file_existence(#[case] page: Value, #[case] exists: bool) {
        let resp = parse(json!({"query": {"pages": [page]}}));
        let meta = file_metadata(&Title::new("File:X.png"), &resp);
        assert_eq!(meta.exists, exists);
        assert_eq!(meta.source_url.is_some(), exists);
        if !exists {
            assert_eq!(meta, FileMetadata::missing(&Title::new("File:X.png")));
        }
    }

    #[test]
    fn action_result_requires_object() {
        let ok = json!({"edit": {"result": "Success", "title": "A"}});
        assert_eq!(action_result(&ok, "edit").unwrap().result, "Success");
        assert!(matches!(
            action_result(&json!({}), "edit"),
            Err(MediaWikiError::Protocol(_))
        ));
    }
}
