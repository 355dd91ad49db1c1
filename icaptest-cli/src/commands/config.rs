//! `icaptest config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use icaptest_core::config::HarnessConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load and validate the configuration file, reporting any errors.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let result = HarnessConfig::load(config_path).await;

    let report = match result {
        Ok(_) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: true,
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source: config_path.display().to_string(),
            valid: false,
            errors: vec![e.to_string()],
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Display the effective configuration (file + env overrides + defaults).
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = HarnessConfig::load(config_path).await?;

    let report = match section.as_deref() {
        Some("general") => section_report(config_path, "general", &config.general),
        Some("sut") => section_report(config_path, "sut", &config.sut),
        Some("probe") => section_report(config_path, "probe", &config.probe),
        Some("fixtures") => section_report(config_path, "fixtures", &config.fixtures),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown config section '{other}', expected one of: general, sut, probe, fixtures"
            )));
        }
        None => ConfigReport {
            source: config_path.display().to_string(),
            section: None,
            config_toml: toml::to_string_pretty(&config)
                .unwrap_or_else(|e| format!("(serialization error: {e})")),
        },
    };

    writer.render(&report)?;
    Ok(())
}

fn section_report<T: Serialize>(config_path: &Path, name: &str, section: &T) -> ConfigReport {
    ConfigReport {
        source: config_path.display().to_string(),
        section: Some(name.to_owned()),
        config_toml: toml::to_string_pretty(section)
            .unwrap_or_else(|e| format!("(serialization error: {e})")),
    }
}

/// Result of `config validate`.
#[derive(Debug, Serialize)]
struct ConfigValidationReport {
    source: String,
    valid: bool,
    errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Source: {}", self.source)?;
        if self.valid {
            writeln!(w, "Configuration is valid")?;
        } else {
            writeln!(w, "Configuration is INVALID:")?;
            for error in &self.errors {
                writeln!(w, "  - {error}")?;
            }
        }
        Ok(())
    }
}

/// Result of `config show`.
#[derive(Debug, Serialize)]
struct ConfigReport {
    source: String,
    section: Option<String>,
    config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Source: {}", self.source)?;
        if let Some(section) = &self.section {
            writeln!(w, "Section: [{section}]")?;
        }
        writeln!(w)?;
        writeln!(w, "{}", self.config_toml)?;
        Ok(())
    }
}
