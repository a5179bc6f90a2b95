//! Per-configuration pipeline entrypoint used by the CLI.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use wikimirror_core::{config, ContentProvider, MirrorConfig, Site, SyncOptions};

use crate::error::SyncError;
use crate::orchestrator::{Checkpoint, RunReport, SyncOrchestrator};
use crate::transform;

/// Outcome of mirroring one configuration file.
#[derive(Debug)]
pub struct ConfigReport {
    pub config_path: PathBuf,
    pub src: Site,
    pub dst: Site,
    pub run: RunReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Load, log in, and mirror one configuration file.
///
/// A dry run skips the destination login since nothing is written.
pub fn run_config<P: ContentProvider + ?Sized>(
    provider: &P,
    path: &Path,
    options: &SyncOptions,
    checkpoint: impl Checkpoint,
) -> Result<ConfigReport, SyncError> {
    tracing::info!("Process {}", path.display());
    let started_at = Utc::now();
    let cfg = config::load_at(path)?;
    let run = mirror(provider, &cfg, options, checkpoint)?;
    tracing::info!(
        "{} pages synchronized and {} pages modify",
        run.pages_synced,
        run.pages_modified
    );
    Ok(ConfigReport {
        config_path: path.to_path_buf(),
        src: cfg.sites.src,
        dst: cfg.sites.dst,
        run,
        started_at,
        finished_at: Utc::now(),
    })
}

/// Mirror an already-loaded configuration.
pub fn mirror<P: ContentProvider + ?Sized>(
    provider: &P,
    cfg: &MirrorConfig,
    options: &SyncOptions,
    checkpoint: impl Checkpoint,
) -> Result<RunReport, SyncError> {
    let (src, dst) = (&cfg.sites.src, &cfg.sites.dst);
    if !options.dry_run() {
        provider
            .login(dst)
            .map_err(|source| SyncError::Authentication {
                site: dst.clone(),
                source,
            })?;
        provider.disable_write_throttle(dst);
    }
    SyncOrchestrator::new(provider, options.clone())
        .with_checkpoint(checkpoint)
        .run(
            src,
            dst,
            cfg.page_set(),
            &cfg.categories,
            &cfg.modifications,
        )
}

/// Run every configuration file in order. Each file stands alone: a failure
/// is reported in its slot and the next file still runs.
pub fn run_all<P: ContentProvider + ?Sized>(
    provider: &P,
    paths: &[PathBuf],
    options: &SyncOptions,
    checkpoint: &mut dyn Checkpoint,
) -> Vec<(PathBuf, Result<ConfigReport, SyncError>)> {
    paths
        .iter()
        .map(|path| {
            let result = run_config(provider, path, options, &mut *checkpoint);
            if let Err(err) = &result {
                tracing::error!("{}: {err}", path.display());
            }
            (path.clone(), result)
        })
        .collect()
}

/// Load a configuration and compile all of its modification patterns.
pub fn validate(path: &Path) -> Result<MirrorConfig, SyncError> {
    let cfg = config::load_at(path)?;
    for rule in &cfg.modifications {
        transform::validate_rule(rule)?;
    }
    Ok(cfg)
}
