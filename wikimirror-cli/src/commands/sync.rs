//! `wikimirror sync`: mirror every configuration file in order.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use wikimirror_core::SyncOptions;
use wikimirror_mediawiki::{Credentials, MediaWikiProvider};
use wikimirror_sync::{pipeline, Checkpoint, ConfigReport, NoCheckpoint, SyncError};

use crate::budget::RssBudget;

/// Arguments for `wikimirror sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Mirror configuration files, processed one after another.
    #[arg(required = true, value_name = "CONFIG")]
    pub configs: Vec<PathBuf>,

    /// Overwrite pages that already exist on the destination.
    #[arg(short, long)]
    pub force: bool,

    /// Do not synchronize templates (implies -d).
    #[arg(short = 't', long)]
    pub no_sync_templates: bool,

    /// Do not synchronize templates used by templates.
    #[arg(short = 'd', long, alias = "no-sync-dependances-templates")]
    pub no_sync_dependencies_templates: bool,

    /// Do not upload files.
    #[arg(short = 'u', long)]
    pub no_upload_files: bool,

    /// Directory receiving the `mirroring_export_*.json` title lists.
    #[arg(short = 'e', long, value_name = "DIR", default_value = ".")]
    pub export_dir: PathBuf,

    /// Read and resolve everything but write nothing to the destination.
    #[arg(long)]
    pub dry_run: bool,

    /// Bot-password user name for the destination wikis.
    #[arg(long, env = "WIKIMIRROR_USERNAME")]
    pub username: Option<String>,

    /// Bot password for the destination wikis.
    #[arg(long, env = "WIKIMIRROR_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Minimum pause between writes before the throttle is lifted.
    #[arg(long, value_name = "SECONDS", default_value_t = 10)]
    pub write_interval: u64,

    /// Abort a configuration once resident memory exceeds this many MB.
    #[arg(long, value_name = "MB")]
    pub max_rss_mb: Option<u64>,

    /// Emit a machine-readable JSON summary.
    #[arg(long)]
    pub json: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let options = self.options();
        let provider = self.provider();
        let mut checkpoint: Box<dyn Checkpoint> = match self.max_rss_mb {
            Some(mb) => Box::new(RssBudget::new(mb)),
            None => Box::new(NoCheckpoint),
        };

        let results = pipeline::run_all(&provider, &self.configs, &options, checkpoint.as_mut());
        let rows: Vec<SummaryRow> = results
            .into_iter()
            .map(|(path, result)| SummaryRow::new(path, result))
            .collect();
        let failed = rows.iter().filter(|r| r.error.is_some()).count();

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&rows).context("failed to serialize sync summary")?
            );
        } else {
            print_table(&rows, self.dry_run);
        }

        if failed > 0 {
            bail!("{failed} of {} configuration file(s) failed", rows.len());
        }
        Ok(())
    }

    fn options(&self) -> SyncOptions {
        SyncOptions::new(&self.export_dir)
            .with_force(self.force)
            .with_sync_templates(!self.no_sync_templates)
            .with_sync_template_dependencies(
                !self.no_sync_templates && !self.no_sync_dependencies_templates,
            )
            .with_upload_files(!self.no_upload_files)
            .with_dry_run(self.dry_run)
    }

    fn provider(&self) -> MediaWikiProvider {
        let provider = MediaWikiProvider::new()
            .with_write_interval(Duration::from_secs(self.write_interval));
        match (&self.username, &self.password) {
            (Some(user), Some(password)) => {
                provider.with_credentials(Credentials::new(user.as_str(), password.as_str()))
            }
            _ => provider,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct SummaryRow {
    config: String,
    source: Option<String>,
    destination: Option<String>,
    pages_synced: usize,
    pages_modified: usize,
    files_uploaded: usize,
    item_failures: usize,
    seconds: Option<i64>,
    error: Option<String>,
}

impl SummaryRow {
    fn new(path: PathBuf, result: Result<ConfigReport, SyncError>) -> Self {
        let config = path.display().to_string();
        match result {
            Ok(report) => Self {
                config,
                source: Some(report.src.to_string()),
                destination: Some(report.dst.to_string()),
                pages_synced: report.run.pages_synced,
                pages_modified: report.run.pages_modified,
                files_uploaded: report.run.files_uploaded,
                item_failures: report.run.failure_count(),
                seconds: Some((report.finished_at - report.started_at).num_seconds()),
                error: None,
            },
            Err(err) => Self {
                config,
                source: None,
                destination: None,
                pages_synced: 0,
                pages_modified: 0,
                files_uploaded: 0,
                item_failures: 0,
                seconds: None,
                error: Some(err.to_string()),
            },
        }
    }
}

#[derive(Tabled)]
struct SummaryTableRow {
    #[tabled(rename = "config")]
    config: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "route")]
    route: String,
    #[tabled(rename = "synced")]
    synced: usize,
    #[tabled(rename = "modified")]
    modified: usize,
    #[tabled(rename = "uploaded")]
    uploaded: usize,
    #[tabled(rename = "item failures")]
    item_failures: usize,
}

fn print_table(rows: &[SummaryRow], dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    for row in rows {
        match &row.error {
            None => println!(
                "{prefix}✓ {}: {} pages synchronized and {} pages modified, {} files uploaded",
                row.config, row.pages_synced, row.pages_modified, row.files_uploaded
            ),
            Some(err) => println!("{prefix}{} {}: {err}", "✗".red(), row.config),
        }
    }

    let table_rows: Vec<SummaryTableRow> = rows
        .iter()
        .map(|row| SummaryTableRow {
            config: row.config.clone(),
            status: status_label(row),
            route: match (&row.source, &row.destination) {
                (Some(src), Some(dst)) => format!("{src} → {dst}"),
                _ => "-".to_string(),
            },
            synced: row.pages_synced,
            modified: row.pages_modified,
            uploaded: row.files_uploaded,
            item_failures: row.item_failures,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn status_label(row: &SummaryRow) -> String {
    match (&row.error, row.item_failures) {
        (Some(_), _) => "FAILED".red().bold().to_string(),
        (None, 0) => "OK".green().to_string(),
        (None, _) => "PARTIAL".yellow().to_string(),
    }
}
