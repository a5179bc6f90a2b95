//! Resident-memory budget enforced between mirror phases.

use std::error::Error;
use std::fs;

use wikimirror_sync::{Checkpoint, Phase};

/// Stops a run once the process resident set exceeds `limit_mb`.
///
/// Reads `/proc/self/status`; where that is unavailable the budget is not
/// enforced.
#[derive(Debug, Clone, Copy)]
pub struct RssBudget {
    limit_kb: u64,
}

impl RssBudget {
    pub fn new(limit_mb: u64) -> Self {
        Self {
            limit_kb: limit_mb.saturating_mul(1024),
        }
    }
}

impl Checkpoint for RssBudget {
    fn checkpoint(&mut self, phase: Phase) -> Result<(), Box<dyn Error + Send + Sync>> {
        let Some(rss_kb) = resident_kb() else {
            return Ok(());
        };
        tracing::debug!("resident set after {phase}: {} MB", rss_kb / 1024);
        if rss_kb > self.limit_kb {
            return Err(format!(
                "resident set {} MB exceeds budget of {} MB",
                rss_kb / 1024,
                self.limit_kb / 1024
            )
            .into());
        }
        Ok(())
    }
}

fn resident_kb() -> Option<u64> {
    let status = fs::read_to_string("/proc/self/status").ok()?;
    parse_vm_rss(&status)
}

/// `VmRSS:  123456 kB` → `123456`.
fn parse_vm_rss(status: &str) -> Option<u64> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("VmRSS:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse().ok())
}
