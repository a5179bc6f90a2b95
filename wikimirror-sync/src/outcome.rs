//! Per-item results and their per-batch aggregation.

use wikimirror_core::{Site, Title};

use crate::error::SyncError;
use crate::orchestrator::Phase;

/// Why an item was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Already present on the destination and `force` is off.
    AlreadyExists,
    /// The destination resolved the title on another wiki.
    ForeignSite(Site),
    /// The page to modify does not exist on the destination.
    NotOnDestination,
    /// Substitutions left the text as it was.
    Unchanged,
}

/// Outcome of one page copy, file upload, or page modification.
#[derive(Debug)]
pub enum ItemOutcome {
    /// The destination was written.
    Written,
    /// Dry run: the destination *would* have been written.
    WouldWrite,
    Skipped(SkipReason),
    /// The item failed; the batch carries on.
    Failed(SyncError),
}

impl ItemOutcome {
    /// `true` for [`Written`](Self::Written) and [`WouldWrite`](Self::WouldWrite).
    pub fn is_written(&self) -> bool {
        matches!(self, Self::Written | Self::WouldWrite)
    }
}

/// Counts for one batch, plus the failures with their titles.
#[derive(Debug)]
pub struct BatchReport {
    pub phase: Phase,
    pub written: usize,
    pub skipped: usize,
    pub failures: Vec<(Title, SyncError)>,
}

impl BatchReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            written: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn record(&mut self, title: &Title, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Written | ItemOutcome::WouldWrite => self.written += 1,
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Failed(err) => self.failures.push((title.clone(), err)),
        }
    }

    /// Items attempted, whatever their outcome.
    pub fn total(&self) -> usize {
        self.written + self.skipped + self.failures.len()
    }

    /// Folds `other` into `self`, keeping `self`'s phase.
    pub fn absorb(&mut self, other: BatchReport) {
        self.written += other.written;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }
}
