//! Mirroring file media. Files already on the destination are always left
//! alone, whatever `force` says.

use wikimirror_core::{ContentProvider, FileUpload, ProviderError, Site, Title, TitleSet};

use crate::error::SyncError;
use crate::orchestrator::Phase;
use crate::outcome::{BatchReport, ItemOutcome, SkipReason};

pub struct FileMirror<'a, P: ?Sized> {
    provider: &'a P,
    src: &'a Site,
    dst: &'a Site,
    dry_run: bool,
}

impl<'a, P: ContentProvider + ?Sized> FileMirror<'a, P> {
    pub fn new(provider: &'a P, src: &'a Site, dst: &'a Site) -> Self {
        Self {
            provider,
            src,
            dst,
            dry_run: false,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn upload_file(&self, title: &Title) -> ItemOutcome {
        match self.upload(title) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!("Error on upload file {title} ({err})");
                ItemOutcome::Failed(err)
            }
        }
    }

    pub fn upload_files(&self, titles: &TitleSet) -> BatchReport {
        let total = titles.len();
        let mut report = BatchReport::new(Phase::UploadFiles);
        for (i, title) in titles.iter().enumerate() {
            tracing::info!("{}/{total} Upload file {title}", i + 1);
            report.record(title, self.upload_file(title));
        }
        report
    }

    fn upload(&self, title: &Title) -> Result<ItemOutcome, SyncError> {
        if self.provider.get_file_metadata(self.dst, title)?.exists {
            tracing::debug!("skip {title}: file exists on {}", self.dst);
            return Ok(ItemOutcome::Skipped(SkipReason::AlreadyExists));
        }
        let source = self.provider.get_file_metadata(self.src, title)?;
        let Some(source_url) = source.source_url.filter(|_| source.exists) else {
            return Err(ProviderError::missing(self.src, title).into());
        };
        if self.dry_run {
            tracing::info!("[dry-run] would upload {title}");
            return Ok(ItemOutcome::WouldWrite);
        }
        let upload = FileUpload {
            source_url,
            comment: source.comment,
            description: source.description,
        };
        self.provider.upload_file(self.dst, title, &upload)?;
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

    #[test]
    fn uploads_missing_file_with_source_metadata() {
        let p = MemoryProvider::new().with_file(
            &src(),
            "File:Logo.png",
            "https://upload.example/Logo.png",
            "== Summary ==\nA logo",
        );
        let (s, d) = (src(), dst());
        let outcome = FileMirror::new(&p, &s, &d).upload_file(&Title::new("File:Logo.png"));
        assert!(matches!(outcome, ItemOutcome::Written));

        let uploads = p.uploads(&dst());
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].1.source_url, "https://upload.example/Logo.png");
        assert_eq!(uploads[0].1.description, "== Summary ==\nA logo");
    }

    #[test]
    fn existing_file_is_always_skipped() {
        let p = MemoryProvider::new()
            .with_file(&src(), "File:Logo.png", "https://a/new.png", "new")
            .with_file(&dst(), "File:Logo.png", "https://a/old.png", "old");
        let (s, d) = (src(), dst());
        let outcome = FileMirror::new(&p, &s, &d).upload_file(&Title::new("File:Logo.png"));
        assert!(matches!(
            outcome,
            ItemOutcome::Skipped(SkipReason::AlreadyExists)
        ));
        assert!(p.uploads(&dst()).is_empty());
    }

    #[test]
    fn batch_keeps_going_after_a_missing_source_file() {
        let p = MemoryProvider::new().with_file(&src(), "File:B.svg", "https://a/B.svg", "b");
        let titles: TitleSet = ["File:A.png", "File:B.svg"].into_iter().collect();
        let (s, d) = (src(), dst());
        let report = FileMirror::new(&p, &s, &d).upload_files(&titles);
        assert_eq!(report.written, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, Title::new("File:A.png"));
    }

    #[test]
    fn dry_run_uploads_nothing() {
        let p = MemoryProvider::new().with_file(&src(), "File:B.svg", "https://a/B.svg", "b");
        let (s, d) = (src(), dst());
        let outcome = FileMirror::new(&p, &s, &d)
            .dry_run(true)
            .upload_file(&Title::new("File:B.svg"));
        assert!(matches!(outcome, ItemOutcome::WouldWrite));
        assert!(p.uploads(&dst()).is_empty());
    }
}
