//! Phase sequencing for one mirror run.
//!
//! ```text
//! categories ─► pages ─► files?        (ledger: pages, files)
//!                     └► templates? ─► dependencies?   (ledger: templates, dependances)
//! sync: dependencies → templates → pages → upload files → modifications
//! ```
//!
//! Dependencies are always written before the pages that use them. A
//! [`Checkpoint`] runs after every phase; transient title sets are dropped as
//! soon as their last phase is done.

use std::fmt;

use wikimirror_core::{
    CategorySelector, ContentProvider, ModificationRule, Site, SyncOptions, TitleSet,
};

use crate::category;
use crate::error::SyncError;
use crate::file::FileMirror;
use crate::ledger::{self, LedgerKind};
use crate::outcome::BatchReport;
use crate::page::PageSynchronizer;
use crate::resolver;
use crate::transform::TextTransformer;

// ---------------------------------------------------------------------------
// Phases and checkpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ExpandCategories,
    ResolveFiles,
    ResolveTemplates,
    ResolveDependencies,
    SyncDependencies,
    SyncTemplates,
    SyncPages,
    UploadFiles,
    Modifications,
}

impl Phase {
    /// `true` for the phases whose writes count as synchronized pages.
    pub fn is_page_sync(self) -> bool {
        matches!(
            self,
            Phase::SyncDependencies | Phase::SyncTemplates | Phase::SyncPages
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::ExpandCategories => "category expansion",
            Phase::ResolveFiles => "file resolution",
            Phase::ResolveTemplates => "template resolution",
            Phase::ResolveDependencies => "template dependency resolution",
            Phase::SyncDependencies => "template dependency sync",
            Phase::SyncTemplates => "template sync",
            Phase::SyncPages => "page sync",
            Phase::UploadFiles => "file upload",
            Phase::Modifications => "modifications",
        };
        f.write_str(name)
    }
}

/// Hook run between phases, e.g. to enforce a memory budget.
pub trait Checkpoint {
    /// Returning an error stops the run after `phase`.
    fn checkpoint(&mut self, phase: Phase) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Checkpoint that never objects.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCheckpoint;

impl Checkpoint for NoCheckpoint {
    fn checkpoint(&mut self, _phase: Phase) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

impl<C: Checkpoint + ?Sized> Checkpoint for &mut C {
    fn checkpoint(&mut self, phase: Phase) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).checkpoint(phase)
    }
}

// ---------------------------------------------------------------------------
// Phase results
// ---------------------------------------------------------------------------

/// Title sets computed before anything is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSets {
    pub pages: TitleSet,
    pub files: Option<TitleSet>,
    pub templates: Option<TitleSet>,
    pub dependencies: Option<TitleSet>,
}

/// Outcome of a whole run.
#[derive(Debug)]
pub struct RunReport {
    pub pages_synced: usize,
    pub pages_modified: usize,
    pub files_uploaded: usize,
    pub batches: Vec<BatchReport>,
}

impl RunReport {
    fn from_batches(batches: Vec<BatchReport>) -> Self {
        let sum = |pick: fn(&BatchReport) -> bool| -> usize {
            batches.iter().filter(|b| pick(b)).map(|b| b.written).sum()
        };
        Self {
            pages_synced: sum(|b| b.phase.is_page_sync()),
            pages_modified: sum(|b| b.phase == Phase::Modifications),
            files_uploaded: sum(|b| b.phase == Phase::UploadFiles),
            batches,
        }
    }

    /// Item failures across every batch.
    pub fn failure_count(&self) -> usize {
        self.batches.iter().map(|b| b.failures.len()).sum()
    }
}

// ---------------------------------------------------------------------------
// SyncOrchestrator
// ---------------------------------------------------------------------------

pub struct SyncOrchestrator<'a, P: ?Sized> {
    provider: &'a P,
    options: SyncOptions,
    checkpoint: Box<dyn Checkpoint + 'a>,
}

impl<'a, P: ContentProvider + ?Sized> SyncOrchestrator<'a, P> {
    pub fn new(provider: &'a P, options: SyncOptions) -> Self {
        Self {
            provider,
            options,
            checkpoint: Box::new(NoCheckpoint),
        }
    }

    pub fn with_checkpoint(mut self, checkpoint: impl Checkpoint + 'a) -> Self {
        self.checkpoint = Box::new(checkpoint);
        self
    }

    /// Mirror `pages` plus the category selections from `src` to `dst`,
    /// then apply `rules` to everything synced.
    pub fn run(
        &mut self,
        src: &Site,
        dst: &Site,
        pages: TitleSet,
        categories: &[CategorySelector],
        rules: &[ModificationRule],
    ) -> Result<RunReport, SyncError> {
        let resolved = self.resolve(src, pages, categories)?;
        self.sync(src, dst, resolved, rules)
    }

    /// Expand categories, compute dependency sets, and export the ledger.
    pub fn resolve(
        &mut self,
        src: &Site,
        pages: TitleSet,
        categories: &[CategorySelector],
    ) -> Result<ResolvedSets, SyncError> {
        let export_dir = self.options.export_dir().to_path_buf();

        let pages = category::expand_all(self.provider, src, pages, categories)?;
        ledger::export_at(&export_dir, LedgerKind::Pages, &pages)?;
        self.checkpoint(Phase::ExpandCategories)?;

        let files = if self.options.upload_files() {
            let files = resolver::files_used_by(self.provider, src, &pages)?;
            ledger::export_at(&export_dir, LedgerKind::Files, &files)?;
            self.checkpoint(Phase::ResolveFiles)?;
            Some(files)
        } else {
            None
        };

        let templates = if self.options.sync_templates() {
            let templates = resolver::templates_used_by(self.provider, src, &pages)?;
            ledger::export_at(&export_dir, LedgerKind::Templates, &templates)?;
            self.checkpoint(Phase::ResolveTemplates)?;
            Some(templates)
        } else {
            None
        };

        let dependencies = match &templates {
            Some(templates) if self.options.sync_template_dependencies() => {
                let deps = resolver::templates_used_by(self.provider, src, templates)?;
                ledger::export_at(&export_dir, LedgerKind::Dependencies, &deps)?;
                self.checkpoint(Phase::ResolveDependencies)?;
                Some(deps)
            }
            _ => None,
        };

        Ok(ResolvedSets {
            pages,
            files,
            templates,
            dependencies,
        })
    }

    /// Write everything in `resolved`, most-depended-on first, then upload
    /// files and apply `rules`.
    pub fn sync(
        &mut self,
        src: &Site,
        dst: &Site,
        resolved: ResolvedSets,
        rules: &[ModificationRule],
    ) -> Result<RunReport, SyncError> {
        let ResolvedSets {
            pages,
            files,
            templates,
            dependencies,
        } = resolved;
        let dry_run = self.options.dry_run();
        let pages_syncer = PageSynchronizer::new(self.provider, src, dst)
            .force(self.options.force())
            .dry_run(dry_run);

        let mut batches = Vec::new();
        let mut synced = TitleSet::new();

        let ordered = [
            (Phase::SyncDependencies, "Sync template dependances", dependencies),
            (Phase::SyncTemplates, "Sync template", templates),
            (Phase::SyncPages, "Sync pages", Some(pages)),
        ];
        for (phase, banner, titles) in ordered {
            let Some(titles) = titles else { continue };
            tracing::info!("====== {banner}");
            batches.push(pages_syncer.sync_pages(phase, &titles));
            synced.extend(titles);
            self.checkpoint(phase)?;
        }

        if let Some(files) = files {
            tracing::info!("====== Upload files");
            let mirror = FileMirror::new(self.provider, src, dst).dry_run(dry_run);
            batches.push(mirror.upload_files(&files));
            drop(files);
            self.checkpoint(Phase::UploadFiles)?;
        }

        if !rules.is_empty() {
            tracing::info!("====== Apply modifications");
            let transformer = TextTransformer::new(self.provider, src, dst).dry_run(dry_run);
            batches.push(transformer.apply_modifications(&synced, rules));
            self.checkpoint(Phase::Modifications)?;
        }

        Ok(RunReport::from_batches(batches))
    }

    fn checkpoint(&mut self, phase: Phase) -> Result<(), SyncError> {
        self.checkpoint
            .checkpoint(phase)
            .map_err(|source| SyncError::Checkpoint { phase, source })
    }
}
