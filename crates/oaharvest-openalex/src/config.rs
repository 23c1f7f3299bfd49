//! Harvest run configuration

use std::path::PathBuf;
use std::time::Duration;

use oaharvest_core::{DEFAULT_TIMEOUT, StopFlag, stop_flag};

use crate::api::{DEFAULT_BASE_URL, OpenAlexClient};

/// Runtime configuration shared by author and paper runs
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the tabular, backup and cache files
    pub output_dir: PathBuf,
    /// Number of fetch workers
    pub workers: usize,
    /// OpenAlex API root
    pub base_url: String,
    /// Contact address for OpenAlex's polite pool
    pub mailto: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Cap on tasks enqueued this run (after resume filtering)
    pub max_tasks: Option<usize>,
    /// Cooperative stop, usually wired to SIGINT/SIGTERM
    pub stop: StopFlag,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./outputs"),
            workers: 4,
            base_url: DEFAULT_BASE_URL.to_string(),
            mailto: None,
            timeout: DEFAULT_TIMEOUT,
            max_tasks: None,
            stop: stop_flag(),
        }
    }
}

impl Config {
    /// HTTP record source for this configuration
    pub fn client(&self) -> OpenAlexClient {
        OpenAlexClient::new(self.base_url.as_str())
            .with_mailto(self.mailto.clone())
            .with_timeout(self.timeout)
    }
}
