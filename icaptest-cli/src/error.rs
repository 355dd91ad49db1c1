//! CLI-specific error types and exit code mapping

use icaptest_core::error::HarnessError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to process exit codes; the
/// distinct `TestsFailed` sentinel lets CI distinguish "the harness
/// broke" from "the SUT failed conformance".
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// One or more conformance assertions failed.
    #[error("{failed} conformance test(s) failed")]
    TestsFailed { failed: u32 },

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from icaptest-core.
    #[error("{0}")]
    Harness(#[from] HarnessError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                    |
    /// |------|--------------------------------------------|
    /// | 0    | Success                                    |
    /// | 1    | General / command error                    |
    /// | 2    | Configuration error (harness or SUT)       |
    /// | 3    | SUT lifecycle failure                      |
    /// | 10   | IO error                                   |
    /// | 50   | Conformance tests failed                   |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::TestsFailed { .. } => 50,
            Self::Io(_) => 10,
            Self::Harness(err) => match err {
                HarnessError::Config(_) => 2,
                HarnessError::Lifecycle(_) => 3,
                HarnessError::Io(_) => 10,
                HarnessError::Fixture(_) | HarnessError::Probe(_) => 1,
            },
            Self::JsonSerialize(_) | Self::Command(_) => 1,
        }
    }
}
