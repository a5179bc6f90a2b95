//! Copying pages from the source wiki to the destination.
//!
//! ## `sync_page` protocol
//!
//! 1. Read the destination page; skip if it exists and `force` is off.
//! 2. Skip if the destination resolved the title on another wiki.
//! 3. Read the source page. A redirect first syncs its target (same
//!    `force`), so the destination chain stays valid.
//! 4. Write the source text verbatim to the destination.
//!
//! Every error is caught at the item boundary and returned as
//! [`ItemOutcome::Failed`]; a batch never stops on one page.

use std::collections::HashSet;

use wikimirror_core::{ContentProvider, ProviderError, Site, Title, TitleSet};

use crate::error::SyncError;
use crate::orchestrator::Phase;
use crate::outcome::{BatchReport, ItemOutcome, SkipReason};

/// Result of syncing one page and any redirect targets it pulled in.
#[derive(Debug)]
pub struct PageSync {
    pub title: Title,
    pub outcome: ItemOutcome,
    /// Redirect targets synced on behalf of this page, in chain order.
    pub redirects: Vec<PageSync>,
}

impl PageSync {
    /// Writes made for this page and its redirect chain.
    pub fn written(&self) -> usize {
        usize::from(self.outcome.is_written())
            + self.redirects.iter().map(PageSync::written).sum::<usize>()
    }

    /// Flattens the page and its redirect chain into `report`.
    pub fn record_into(self, report: &mut BatchReport) {
        report.record(&self.title, self.outcome);
        for redirect in self.redirects {
            redirect.record_into(report);
        }
    }
}

/// Copies pages between two wikis through one provider.
pub struct PageSynchronizer<'a, P: ?Sized> {
    provider: &'a P,
    src: &'a Site,
    dst: &'a Site,
    force: bool,
    dry_run: bool,
}

impl<'a, P: ContentProvider + ?Sized> PageSynchronizer<'a, P> {
    pub fn new(provider: &'a P, src: &'a Site, dst: &'a Site) -> Self {
        Self {
            provider,
            src,
            dst,
            force: false,
            dry_run: false,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sync a single page (and its redirect chain).
    pub fn sync_page(&self, title: &Title) -> PageSync {
        let mut visited = HashSet::new();
        self.sync_tracked(title, &mut visited)
    }

    /// Sync every title in iteration order. Failures never stop the batch.
    ///
    /// A title is handled at most once per batch: a redirect target synced
    /// on behalf of an earlier page is not visited again.
    pub fn sync_pages(&self, phase: Phase, titles: &TitleSet) -> BatchReport {
        let total = titles.len();
        let mut report = BatchReport::new(phase);
        let mut handled = HashSet::new();
        for (i, title) in titles.iter().enumerate() {
            tracing::info!("{}/{total} Sync {title}", i + 1);
            if handled.contains(title) {
                tracing::debug!("skip {title}: already handled in this batch");
                continue;
            }
            self.sync_tracked(title, &mut handled)
                .record_into(&mut report);
        }
        report
    }

    fn sync_tracked(&self, title: &Title, visited: &mut HashSet<Title>) -> PageSync {
        visited.insert(title.clone());
        let mut redirects = Vec::new();
        let outcome = match self.copy(title, visited, &mut redirects) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!("Error on sync page {title} ({err})");
                ItemOutcome::Failed(err)
            }
        };
        PageSync {
            title: title.clone(),
            outcome,
            redirects,
        }
    }

    fn copy(
        &self,
        title: &Title,
        visited: &mut HashSet<Title>,
        redirects: &mut Vec<PageSync>,
    ) -> Result<ItemOutcome, SyncError> {
        let target = self.provider.get_page(self.dst, title)?;
        if target.exists && !self.force {
            tracing::debug!("skip {title}: exists on {}", self.dst);
            return Ok(ItemOutcome::Skipped(SkipReason::AlreadyExists));
        }
        if target.resolved_site != *self.dst {
            tracing::debug!("skip {title}: resolved on {}", target.resolved_site);
            return Ok(ItemOutcome::Skipped(SkipReason::ForeignSite(
                target.resolved_site,
            )));
        }

        let source = self.provider.get_page(self.src, title)?;
        if !source.exists {
            return Err(ProviderError::missing(self.src, title).into());
        }

        if let Some(next) = source.redirect_target.as_ref().filter(|_| source.is_redirect) {
            if visited.contains(next) {
                tracing::debug!("{title}: redirect target {next} already handled");
            } else {
                redirects.push(self.sync_tracked(next, visited));
            }
        }

        if self.dry_run {
            tracing::info!("[dry-run] would write {title}");
            return Ok(ItemOutcome::WouldWrite);
        }
        let summary = format!("Synchronized from {}", self.src);
        self.provider
            .write_page(self.dst, title, &source.text, &summary)?;
        Ok(ItemOutcome::Written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikimirror_core::MemoryProvider;

    fn src() -> Site {
        Site::new("wikipedia", "en")
    }

    fn dst() -> Site {
        Site::new("kiwix", "en")
    }

    fn sync(provider: &MemoryProvider, title: &str, force: bool) -> PageSync {
        let (src, dst) = (src(), dst());
        PageSynchronizer::new(provider, &src, &dst)
            .force(force)
            .sync_page(&Title::new(title))
    }

    #[test]
    fn copies_text_verbatim() {
        let text = "Ünïcode '''bold''' {{Infobox}}\r\n\ttrailing  ";
        let p = MemoryProvider::new().with_page(&src(), "A", text);
        let result = sync(&p, "A", false);
        assert!(matches!(result.outcome, ItemOutcome::Written));
        assert_eq!(p.page_text(&dst(), "A").as_deref(), Some(text));
    }

    #[test]
    fn existing_destination_page_is_skipped_without_force() {
        let p = MemoryProvider::new()
            .with_page(&src(), "A", "new")
            .with_page(&dst(), "A", "old");
        let result = sync(&p, "A", false);
        assert!(matches!(
            result.outcome,
            ItemOutcome::Skipped(SkipReason::AlreadyExists)
        ));
        assert_eq!(p.page_text(&dst(), "A").as_deref(), Some("old"));
    }

    #[test]
    fn force_overwrites_existing_destination_page() {
        let p = MemoryProvider::new()
            .with_page(&src(), "A", "new")
            .with_page(&dst(), "A", "old");
        let result = sync(&p, "A", true);
        assert!(matches!(result.outcome, ItemOutcome::Written));
        assert_eq!(p.page_text(&dst(), "A").as_deref(), Some("new"));
    }

    #[test]
    fn title_resolved_on_another_wiki_is_skipped() {
        let fr = Site::new("kiwix", "fr");
        let p = MemoryProvider::new()
            .with_page(&src(), "fr:Accueil", "x")
            .with_foreign_title(&dst(), "fr:Accueil", &fr);
        let result = sync(&p, "fr:Accueil", true);
        match result.outcome {
            ItemOutcome::Skipped(SkipReason::ForeignSite(site)) => assert_eq!(site, fr),
            other => panic!("expected foreign-site skip, got {other:?}"),
        }
        assert!(p.writes(&dst()).is_empty());
    }

    #[test]
    fn missing_source_page_is_a_failure_not_a_panic() {
        let p = MemoryProvider::new();
        let result = sync(&p, "Ghost", false);
        assert!(matches!(
            result.outcome,
            ItemOutcome::Failed(SyncError::Provider(ProviderError::Missing { .. }))
        ));
    }

    #[test]
    fn redirect_target_is_synced_first() {
        let p = MemoryProvider::new()
            .with_redirect(&src(), "A", "B")
            .with_page(&src(), "B", "B body");
        let result = sync(&p, "A", false);

        assert!(matches!(result.outcome, ItemOutcome::Written));
        assert_eq!(result.redirects.len(), 1);
        assert_eq!(result.redirects[0].title, Title::new("B"));
        assert_eq!(result.written(), 2);
        assert_eq!(p.writes(&dst()), vec![Title::new("B"), Title::new("A")]);
        assert_eq!(p.page_text(&dst(), "B").as_deref(), Some("B body"));
        assert_eq!(p.page_text(&dst(), "A").as_deref(), Some("#REDIRECT [[B]]"));
    }

    #[test]
    fn failed_redirect_target_does_not_fail_the_page() {
        let p = MemoryProvider::new()
            .with_redirect(&src(), "A", "B")
            .with_page(&src(), "B", "B body")
            .with_failing_write(&dst(), "B");
        let result = sync(&p, "A", false);
        assert!(matches!(result.outcome, ItemOutcome::Written));
        assert!(matches!(result.redirects[0].outcome, ItemOutcome::Failed(_)));
        assert_eq!(result.written(), 1);
    }

    #[test]
    fn redirect_loop_terminates() {
        let p = MemoryProvider::new()
            .with_redirect(&src(), "A", "B")
            .with_redirect(&src(), "B", "A");
        let result = sync(&p, "A", true);
        assert_eq!(result.written(), 2);
        assert_eq!(p.writes(&dst()), vec![Title::new("B"), Title::new("A")]);
    }

    #[test]
    fn forced_batch_writes_redirect_target_once() {
        let p = MemoryProvider::new()
            .with_redirect(&src(), "A", "B")
            .with_page(&src(), "B", "B body")
            .with_page(&dst(), "A", "old A")
            .with_page(&dst(), "B", "old B");
        let titles: TitleSet = ["A", "B"].into_iter().collect();
        let (s, d) = (src(), dst());
        let report = PageSynchronizer::new(&p, &s, &d)
            .force(true)
            .sync_pages(Phase::SyncPages, &titles);

        assert_eq!(report.written, 2);
        assert_eq!(report.total(), 2);
        assert_eq!(p.writes(&dst()), vec![Title::new("B"), Title::new("A")]);
        assert_eq!(p.page_text(&dst(), "B").as_deref(), Some("B body"));
    }

    #[test]
    fn dry_run_writes_nothing() {
        let p = MemoryProvider::new()
            .with_redirect(&src(), "A", "B")
            .with_page(&src(), "B", "B body");
        let (s, d) = (src(), dst());
        let result = PageSynchronizer::new(&p, &s, &d)
            .dry_run(true)
            .sync_page(&Title::new("A"));
        assert!(matches!(result.outcome, ItemOutcome::WouldWrite));
        assert_eq!(result.written(), 2);
        assert!(p.writes(&dst()).is_empty());
    }

    #[test]
    fn batch_continues_after_failures_and_is_idempotent() {
        let p = MemoryProvider::new()
            .with_page(&src(), "A", "a")
            .with_page(&src(), "C", "c")
            .with_failing_write(&dst(), "A");
        let titles: TitleSet = ["A", "B", "C"].into_iter().collect();
        let (s, d) = (src(), dst());
        let syncer = PageSynchronizer::new(&p, &s, &d);

        let first = syncer.sync_pages(Phase::SyncPages, &titles);
        assert_eq!(first.written, 1);
        assert_eq!(first.failures.len(), 2);

        let second = syncer.sync_pages(Phase::SyncPages, &titles);
        assert_eq!(second.written, 0);
        assert_eq!(second.skipped, 1);
    }
}
