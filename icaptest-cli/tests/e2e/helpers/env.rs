//! Test environment builder: fixtures on disk + harness config.

use std::fs;

use tempfile::TempDir;

use icaptest_core::config::HarnessConfig;
use icaptest_core::fixture;
use icaptest_core::sut::AdaptationMode;

use icaptest_cli::orchestrator::{HTTP_METHODS, RunInputs};

/// A small file accepted under the 100-byte size limit.
pub const SMALL_FILE: &str = "sample.txt";
/// A file rejected once `max_filesize` drops to 100 bytes.
pub const BIG_FILE: &str = "book.pdf";

/// Fixture layout in a temp directory plus a matching harness config.
pub struct TestEnv {
    pub dir: TempDir,
    pub config: HarnessConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("should create temp dir");

        fs::write(dir.path().join(SMALL_FILE), vec![b'a'; 50]).expect("write small fixture");
        fs::write(dir.path().join(BIG_FILE), vec![b'b'; 400]).expect("write big fixture");
        fs::write(
            dir.path().join("service_name.csv"),
            "echo,200,OK\nech,404,ICAP Service not found\n",
        )
        .expect("write service fixture");
        fs::write(
            dir.path().join("test_size.csv"),
            format!("{SMALL_FILE},OK\n{BIG_FILE},FAILED\n"),
        )
        .expect("write size manifest");

        let mut config = HarnessConfig::default();
        config.fixtures.dir = dir.path().display().to_string();
        config.fixtures.output_file = dir.path().join("output").display().to_string();
        config.fixtures.service_probe_file = BIG_FILE.to_owned();
        config.validate().expect("test config should validate");

        Self { dir, config }
    }

    /// Load the run inputs through the real fixture loaders.
    pub fn inputs(&self) -> RunInputs {
        RunInputs {
            service_cases: fixture::load_service_cases(&self.config.fixtures.service_cases_path())
                .expect("service fixture should load"),
            size_cases: fixture::load_size_cases(&self.config.fixtures.size_cases_path())
                .expect("size manifest should load"),
            tag_catalog: vec![("echo".to_owned(), "ICAPEG".to_owned())],
        }
    }

    /// Both adaptation modes, the way the run command builds them.
    pub fn both_modes(&self) -> Vec<AdaptationMode> {
        vec![
            AdaptationMode::Respmod,
            AdaptationMode::Reqmod {
                url: self.config.probe.request_url.clone(),
            },
        ]
    }
}

/// Assertions a full matrix run is expected to issue.
///
/// Per mode: one 204-header sweep, one plain sweep, the two
/// config-sensitive sweeps, four client preview variants, and one
/// sweep per HTTP method. Service-name cases run twice (with and
/// without 204); each tag-catalog service runs three variants.
pub fn expected_total(inputs: &RunInputs, mode_count: usize) -> u32 {
    let files = inputs.size_cases.len() as u32;
    let services = inputs.service_cases.len() as u32;
    let sweeps_per_mode = 8 + HTTP_METHODS.len() as u32;
    2 * services
        + mode_count as u32 * sweeps_per_mode * files
        + inputs.tag_catalog.len() as u32 * 3 * files
}
