//! Output formatting: report rendering and styled per-case lines
//!
//! Final payloads (run report, config reports) flow through
//! [`OutputWriter`], which switches between human-readable text and
//! JSON. Per-case progress lines are emitted by [`Reporter`] as the
//! sweep runs; in JSON mode the reporter stays silent so stdout holds
//! nothing but the final document.

use std::io::Write;

use colored::Colorize;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Abstraction for writing CLI output in different formats.
///
/// Subcommand handlers call `writer.render(&payload)` where `payload`
/// implements both `Serialize` (for JSON) and `Render` (for text).
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    /// Create a new output writer with the specified format.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a payload to stdout.
    pub fn render<T: Render + Serialize>(&self, payload: &T) -> Result<(), CliError> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        match self.format {
            OutputFormat::Text => {
                payload.render_text(&mut handle)?;
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut handle, payload)?;
                writeln!(handle)?;
            }
        }
        Ok(())
    }
}

/// Trait for human-readable text rendering.
///
/// Implemented by every CLI output payload alongside `serde::Serialize`.
pub trait Render {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()>;
}

/// Styled per-case console reporting.
///
/// Magenta block headers, yellow sub-headers, green/red result lines.
pub struct Reporter {
    enabled: bool,
}

impl Reporter {
    /// A reporter that prints styled lines to stdout.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            enabled: matches!(format, OutputFormat::Text),
        }
    }

    /// A silent reporter (used by tests driving the orchestrator).
    pub fn silent() -> Self {
        Self { enabled: false }
    }

    /// Print a block header for a group of sweeps.
    pub fn block(&self, title: &str) {
        if self.enabled {
            println!("{}", format!("***** {title} *****").magenta().bold());
        }
    }

    /// Print a sub-header within a block (method label, service name).
    pub fn sub(&self, label: &str) {
        if self.enabled {
            println!("{}", label.yellow().bold());
        }
    }

    /// Print a passed-case line.
    pub fn pass(&self, detail: &str) {
        if self.enabled {
            println!("{}{}", "✅ Test passed".green().bold(), detail);
        }
    }

    /// Print a failed-case line.
    pub fn fail(&self, detail: &str) {
        if self.enabled {
            println!("{}{}", "❌ Test failed".red().bold(), detail);
        }
    }
}
