//! Title ledger: audit export of the title set behind each phase.
//!
//! Writes `<export_dir>/mirroring_export_<kind>.json`, a sorted JSON array
//! indented by four spaces, non-ASCII kept as-is. The engine never reads
//! these files back. Writes use the `.tmp` + rename pattern.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use wikimirror_core::TitleSet;

use crate::error::{io_err, SyncError};

/// Which title set a ledger file records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerKind {
    Pages,
    Files,
    Templates,
    Dependencies,
}

impl LedgerKind {
    pub fn file_stem(self) -> &'static str {
        match self {
            LedgerKind::Pages => "pages",
            LedgerKind::Files => "files",
            LedgerKind::Templates => "templates",
            // Spelling is part of the export file name.
            LedgerKind::Dependencies => "dependances",
        }
    }
}

impl fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// `<dir>/mirroring_export_<kind>.json`. Pure, no I/O.
pub fn export_path_at(dir: &Path, kind: LedgerKind) -> PathBuf {
    dir.join(format!("mirroring_export_{}.json", kind.file_stem()))
}

/// Write `titles` to the ledger file for `kind`, creating `dir` if needed.
pub fn export_at(dir: &Path, kind: LedgerKind, titles: &TitleSet) -> Result<PathBuf, SyncError> {
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    titles.serialize(&mut ser)?;

    let path = export_path_at(dir, kind);
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &buf).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    tracing::debug!("exported {} {kind} titles to {}", titles.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn exports_sorted_indented_array() {
        let tmp = TempDir::new().unwrap();
        let titles: TitleSet = ["Zèbre", "Apple", "Apple"].into_iter().collect();
        let path = export_at(tmp.path(), LedgerKind::Pages, &titles).unwrap();

        assert_eq!(path, tmp.path().join("mirroring_export_pages.json"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "[\n    \"Apple\",\n    \"Zèbre\"\n]");
    }

    #[test]
    fn dependencies_keep_historical_file_name() {
        assert_eq!(
            export_path_at(Path::new("/out"), LedgerKind::Dependencies),
            PathBuf::from("/out/mirroring_export_dependances.json")
        );
    }

    #[test]
    fn creates_missing_directory_and_cleans_tmp() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("exports");
        let path = export_at(&dir, LedgerKind::Files, &TitleSet::new()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn overwrites_previous_export() {
        let tmp = TempDir::new().unwrap();
        let first: TitleSet = ["Old"].into_iter().collect();
        let second: TitleSet = ["New"].into_iter().collect();
        export_at(tmp.path(), LedgerKind::Templates, &first).unwrap();
        let path = export_at(tmp.path(), LedgerKind::Templates, &second).unwrap();
        let titles: Vec<String> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(titles, vec!["New".to_string()]);
    }
}
