//! The capability set the mirror engine needs from a wiki.
//!
//! One provider serves every [`Site`] of a run; each call names the site it
//! targets. All calls block until the wiki answers. Implementations use
//! interior mutability for session state, so every method takes `&self`.

use crate::error::ProviderError;
use crate::types::{FileMetadata, FileUpload, NamespaceFilter, PageContent, Site, Title, TitleSet};

pub type ProviderResult<T> = Result<T, ProviderError>;

pub trait ContentProvider {
    /// Read a page. A missing page is `Ok` with `exists == false`.
    fn get_page(&self, site: &Site, title: &Title) -> ProviderResult<PageContent>;

    /// Create or replace the text of a page.
    fn write_page(&self, site: &Site, title: &Title, text: &str, summary: &str)
        -> ProviderResult<()>;

    /// Members of `category` whose namespace passes `namespaces`.
    ///
    /// With `recurse`, members of subcategories (at any depth the provider
    /// allows) are included. Subcategory pages themselves are traversed, not
    /// returned. A missing category yields an empty set.
    fn list_category_members(
        &self,
        site: &Site,
        category: &Title,
        namespaces: &NamespaceFilter,
        recurse: bool,
    ) -> ProviderResult<TitleSet>;

    /// Templates transcluded by a page.
    fn list_templates_used(&self, site: &Site, title: &Title) -> ProviderResult<TitleSet>;

    /// Files linked or embedded by a page.
    fn list_files_used(&self, site: &Site, title: &Title) -> ProviderResult<TitleSet>;

    fn get_file_metadata(&self, site: &Site, title: &Title) -> ProviderResult<FileMetadata>;

    /// Create a new file from a remote URL.
    fn upload_file(&self, site: &Site, title: &Title, upload: &FileUpload) -> ProviderResult<()>;

    fn login(&self, site: &Site) -> ProviderResult<()>;

    /// Stop pacing writes to `site`.
    fn disable_write_throttle(&self, site: &Site);
}
