//! SUT config document handling and byte-exact snapshots.

use std::path::{Path, PathBuf};

use tracing::debug;

use icaptest_core::error::{ConfigError, HarnessError};

/// The SUT's own configuration document, loaded untyped.
///
/// Services carry arbitrary vendor-specific keys the harness knows
/// nothing about; backing the document with a [`toml::Table`] keeps a
/// single-key mutation from disturbing any of them. The raw text as
/// read from disk is retained so a [`ConfigSnapshot`] restores the
/// pre-mutation state byte for byte.
#[derive(Debug)]
pub struct SutConfigDoc {
    path: PathBuf,
    raw: String,
    table: toml::Table,
}

impl SutConfigDoc {
    /// Load the document from disk, retaining the raw text.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                HarnessError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                HarnessError::Io(e)
            }
        })?;
        let table = raw.parse::<toml::Table>().map_err(|e| {
            HarnessError::Config(ConfigError::ParseFailed {
                reason: format!("{}: {e}", path.display()),
            })
        })?;
        Ok(Self {
            path: path.to_owned(),
            raw,
            table,
        })
    }

    /// Services listed under `app.services`.
    pub fn services(&self) -> Vec<String> {
        self.table
            .get("app")
            .and_then(toml::Value::as_table)
            .and_then(|app| app.get("services"))
            .and_then(toml::Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(toml::Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The `service_tag` a service advertises as its ISTag.
    pub fn service_tag(&self, service: &str) -> Option<String> {
        self.get(service, "service_tag")
            .and_then(toml::Value::as_str)
            .map(str::to_owned)
    }

    /// Read one key of one service section.
    pub fn get(&self, service: &str, key: &str) -> Option<&toml::Value> {
        self.table
            .get(service)
            .and_then(toml::Value::as_table)
            .and_then(|section| section.get(key))
    }

    /// Mutate one key of one service section.
    ///
    /// The section must already exist — the harness reconfigures known
    /// services, it never invents them.
    pub fn set(
        &mut self,
        service: &str,
        key: &str,
        value: toml::Value,
    ) -> Result<(), HarnessError> {
        let section = self
            .table
            .get_mut(service)
            .and_then(toml::Value::as_table_mut)
            .ok_or_else(|| {
                HarnessError::Config(ConfigError::InvalidValue {
                    field: format!("{service}.{key}"),
                    reason: format!("service section '{service}' not found"),
                })
            })?;
        debug!(service, key, new_value = %value, "overriding SUT config key");
        section.insert(key.to_owned(), value);
        Ok(())
    }

    /// Write the (possibly mutated) document back to its path.
    pub async fn persist(&self) -> Result<(), HarnessError> {
        let rendered = toml::to_string_pretty(&self.table).map_err(|e| {
            HarnessError::Config(ConfigError::WriteFailed {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })
        })?;
        tokio::fs::write(&self.path, rendered).await.map_err(|e| {
            HarnessError::Config(ConfigError::WriteFailed {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })
        })
    }

    /// Capture the pre-mutation state for later restoration.
    ///
    /// Must be taken before the first [`set`](Self::set) of an epoch;
    /// the snapshot holds the text as it was read from disk.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            path: self.path.clone(),
            raw: self.raw.clone(),
        }
    }
}

/// A byte-exact copy of the SUT config taken before mutation.
///
/// Restoring writes the captured text back verbatim, so
/// reconfigure → restore leaves the file byte-identical by
/// construction (comments and formatting included).
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    path: PathBuf,
    raw: String,
}

impl ConfigSnapshot {
    /// Write the captured text back over the live config.
    pub async fn restore(&self) -> Result<(), HarnessError> {
        debug!(path = %self.path.display(), "restoring SUT config snapshot");
        tokio::fs::write(&self.path, &self.raw).await.map_err(|e| {
            HarnessError::Config(ConfigError::WriteFailed {
                path: self.path.display().to_string(),
                reason: format!("restore failed: {e}"),
            })
        })
    }
}
