//! One-level dependency closure: templates and files used by a title set.
//!
//! Templates used by templates are found by calling [`templates_used_by`]
//! again on the first result; nothing here recurses on its own.

use wikimirror_core::{ContentProvider, ProviderResult, Site, Title, TitleSet};

use crate::error::SyncError;

/// Union of the templates transcluded by every title in `titles`.
pub fn templates_used_by<P: ContentProvider + ?Sized>(
    provider: &P,
    site: &Site,
    titles: &TitleSet,
) -> Result<TitleSet, SyncError> {
    collect(titles, "templates", |title| {
        provider.list_templates_used(site, title)
    })
}

/// Union of the files referenced by every title in `titles`.
pub fn files_used_by<P: ContentProvider + ?Sized>(
    provider: &P,
    site: &Site,
    titles: &TitleSet,
) -> Result<TitleSet, SyncError> {
    collect(titles, "files", |title| provider.list_files_used(site, title))
}

fn collect(
    titles: &TitleSet,
    what: &str,
    mut lookup: impl FnMut(&Title) -> ProviderResult<TitleSet>,
) -> Result<TitleSet, SyncError> {
    let total = titles.len();
    let mut found = TitleSet::new();
    for (i, title) in titles.iter().enumerate() {
        let used = lookup(title)?;
        if !used.is_empty() {
            tracing::info!("{}/{total} Process {title} : {} {what} found", i + 1, used.len());
            found.extend(used);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikimirror_core::MemoryProvider;

    fn src() -> Site {
        Site::new("wikipedia", "en")
    }

    fn provider() -> MemoryProvider {
        MemoryProvider::new()
            .with_templates(&src(), "A", &["Template:Infobox", "Template:Cite"])
            .with_templates(&src(), "B", &["Template:Cite", "Template:Navbox"])
            .with_templates(&src(), "Template:Infobox", &["Template:Infobox/core"])
            .with_files_used(&src(), "A", &["File:A.png"])
            .with_files_used(&src(), "B", &["File:A.png", "File:B.svg"])
    }

    #[test]
    fn templates_are_unioned_without_duplicates() {
        let pages: TitleSet = ["A", "B", "C"].into_iter().collect();
        let templates = templates_used_by(&provider(), &src(), &pages).unwrap();
        assert_eq!(
            templates,
            ["Template:Cite", "Template:Infobox", "Template:Navbox"]
                .into_iter()
                .collect::<TitleSet>()
        );
    }

    #[test]
    fn second_order_templates_come_from_a_second_call() {
        let pages: TitleSet = ["A"].into_iter().collect();
        let first = templates_used_by(&provider(), &src(), &pages).unwrap();
        let second = templates_used_by(&provider(), &src(), &first).unwrap();
        assert_eq!(
            second,
            ["Template:Infobox/core"].into_iter().collect::<TitleSet>()
        );
        assert!(!first.contains(&Title::new("Template:Infobox/core")));
    }

    #[test]
    fn files_are_unioned_without_duplicates() {
        let pages: TitleSet = ["B", "A"].into_iter().collect();
        let files = files_used_by(&provider(), &src(), &pages).unwrap();
        assert_eq!(
            files,
            ["File:A.png", "File:B.svg"].into_iter().collect::<TitleSet>()
        );
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let files = files_used_by(&provider(), &src(), &TitleSet::new()).unwrap();
        assert!(files.is_empty());
    }
}
