//! End-of-run summary payload.

use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use colored::Colorize;
use serde::Serialize;

use icaptest_core::types::Tally;

use crate::output::Render;

/// The single end-of-run summary, renderable as text or JSON.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Unique id for this harness run.
    pub run_id: String,
    /// Run start time (RFC 3339, UTC).
    pub started_at: String,
    /// Wall-clock duration of the run in seconds.
    pub duration_secs: u64,
    /// Total assertions issued.
    pub total: u32,
    /// Assertions that passed.
    pub passed: u32,
    /// Assertions that failed.
    pub failed: u32,
    /// True when every assertion passed.
    pub success: bool,
}

impl RunReport {
    /// Build a report from the final tally.
    pub fn new(tally: Tally, started_at: DateTime<Utc>, duration_secs: u64) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            duration_secs,
            total: tally.total(),
            passed: tally.passed,
            failed: tally.failed,
            success: tally.is_success(),
        }
    }
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w)?;
        writeln!(w, "{}", "######### conclusion ########".cyan().bold())?;
        writeln!(w, "{} {}", "Total:".yellow().bold(), self.total)?;
        writeln!(w, "{} {}", "Passed:".green().bold(), self.passed)?;
        writeln!(w, "{} {}", "Failed:".red().bold(), self.failed)?;
        writeln!(
            w,
            "(run {} started {}, took {}s)",
            self.run_id, self.started_at, self.duration_secs
        )?;
        Ok(())
    }
}
