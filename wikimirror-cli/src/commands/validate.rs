//! `wikimirror validate`: parse configurations and compile their patterns.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use wikimirror_sync::pipeline;

/// Arguments for `wikimirror validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Mirror configuration files to check.
    #[arg(required = true, value_name = "CONFIG")]
    pub configs: Vec<PathBuf>,
}

impl ValidateArgs {
    pub fn run(self) -> Result<()> {
        let mut failed = 0;
        for path in &self.configs {
            match pipeline::validate(path) {
                Ok(cfg) => println!(
                    "{} {}: {} → {}, {} pages, {} categories, {} modification rules",
                    "✓".green(),
                    path.display(),
                    cfg.sites.src,
                    cfg.sites.dst,
                    cfg.pages.len(),
                    cfg.categories.len(),
                    cfg.modifications.len()
                ),
                Err(err) => {
                    failed += 1;
                    println!("{} {}: {err}", "✗".red(), path.display());
                }
            }
        }
        if failed > 0 {
            bail!("{failed} of {} configuration file(s) invalid", self.configs.len());
        }
        Ok(())
    }
}
