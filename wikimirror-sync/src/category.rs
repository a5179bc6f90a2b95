//! Category selectors → concrete page titles.

use wikimirror_core::types::ns;
use wikimirror_core::{CategorySelector, ContentProvider, Site, Title, TitleSet};

use crate::error::SyncError;

/// `Category:`-qualified form of a selector title (`"Physics"` →
/// `"Category:Physics"`). Titles already carrying a known category prefix,
/// localised ones included, are kept as written.
pub fn category_title(title: &Title) -> Title {
    if title.namespace() == ns::CATEGORY {
        title.clone()
    } else {
        Title::new(format!("Category:{title}"))
    }
}

/// Titles selected by one category selector.
///
/// The category page itself is always part of the result. A missing or empty
/// category yields just that title.
pub fn expand<P: ContentProvider + ?Sized>(
    provider: &P,
    site: &Site,
    selector: &CategorySelector,
) -> Result<TitleSet, SyncError> {
    let category = category_title(&selector.title);
    tracing::info!("Retrieve pages from {category}");
    let mut titles =
        provider.list_category_members(site, &category, &selector.namespaces, selector.recurse)?;
    tracing::debug!("{category}: {} members", titles.len());
    titles.insert(category);
    Ok(titles)
}

/// `pages` plus the expansion of every selector.
pub fn expand_all<P: ContentProvider + ?Sized>(
    provider: &P,
    site: &Site,
    pages: TitleSet,
    selectors: &[CategorySelector],
) -> Result<TitleSet, SyncError> {
    let mut all = pages;
    for selector in selectors {
        all.extend(expand(provider, site, selector)?);
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikimirror_core::{MemoryProvider, NamespaceFilter};

    fn src() -> Site {
        Site::new("wikipedia", "en")
    }

    fn provider() -> MemoryProvider {
        MemoryProvider::new()
            .with_category(
                &src(),
                "Category:Physics",
                &["Energy", "Wikipedia:Physics portal", "Category:Optics"],
            )
            .with_category(&src(), "Category:Optics", &["Lens", "Template:Optics"])
    }

    #[test]
    fn bare_title_gets_category_prefix() {
        assert_eq!(
            category_title(&Title::new("Physics")),
            Title::new("Category:Physics")
        );
        assert_eq!(
            category_title(&Title::new("Category:Physics")),
            Title::new("Category:Physics")
        );
    }

    #[test]
    fn localised_category_prefix_is_kept() {
        assert_eq!(
            category_title(&Title::new("Catégorie:Physique")),
            Title::new("Catégorie:Physique")
        );
        assert_eq!(
            category_title(&Title::new("kategorie:Physik")),
            Title::new("kategorie:Physik")
        );
    }

    #[test]
    fn direct_members_restricted_to_namespace() {
        let sel = CategorySelector::new("Physics", NamespaceFilter::only([0]), false);
        let titles = expand(&provider(), &src(), &sel).unwrap();
        assert_eq!(
            titles,
            ["Category:Physics", "Energy"].into_iter().collect::<TitleSet>()
        );
    }

    #[test]
    fn recursion_adds_subcategory_members_with_same_filter() {
        let sel = CategorySelector::new("Category:Physics", NamespaceFilter::only([0]), true);
        let titles = expand(&provider(), &src(), &sel).unwrap();
        assert_eq!(
            titles,
            ["Category:Physics", "Energy", "Lens"]
                .into_iter()
                .collect::<TitleSet>()
        );
    }

    #[test]
    fn missing_category_yields_only_its_own_title() {
        let sel = CategorySelector::new("Nowhere", NamespaceFilter::all(), true);
        let titles = expand(&provider(), &src(), &sel).unwrap();
        assert_eq!(titles, ["Category:Nowhere"].into_iter().collect::<TitleSet>());
    }

    #[test]
    fn expand_all_unions_with_explicit_pages() {
        let selectors = [
            CategorySelector::new("Physics", NamespaceFilter::only([0]), false),
            CategorySelector::new("Optics", NamespaceFilter::all(), false),
        ];
        let pages: TitleSet = ["Energy", "Main Page"].into_iter().collect();
        let all = expand_all(&provider(), &src(), pages, &selectors).unwrap();
        assert_eq!(
            all,
            [
                "Category:Optics",
                "Category:Physics",
                "Energy",
                "Lens",
                "Main Page",
                "Template:Optics"
            ]
            .into_iter()
            .collect::<TitleSet>()
        );
    }
}
