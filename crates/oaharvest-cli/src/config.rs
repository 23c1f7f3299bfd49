//! `oaharvest.toml`: output, worker, OpenAlex and HTTP settings

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for oaharvest
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub output: OutputConfig,
    pub workers: WorkersConfig,
    pub openalex: OpenAlexConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub default_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_dir: PathBuf::from("./outputs"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct WorkersConfig {
    pub default: usize,
    pub max: usize,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            default: cpus.min(8),
            max: 32,
        }
    }
}

impl WorkersConfig {
    /// Requested worker count, clamped to `1..=max`
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default).clamp(1, self.max.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAlexConfig {
    pub base_url: String,
    /// Contact address for the polite pool; `${VAR}` is expanded
    #[serde(deserialize_with = "deserialize_env_var")]
    pub mailto: Option<String>,
}

impl Default for OpenAlexConfig {
    fn default() -> Self {
        Self {
            base_url: oaharvest_openalex::DEFAULT_BASE_URL.to_string(),
            mailto: std::env::var("OPENALEX_MAILTO").ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: oaharvest_core::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// `mailto` values may name an environment variable as `${VAR}`; an unset
/// variable leaves the address unset.
fn deserialize_env_var<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(|raw| expand_env_var(&raw)))
}

fn expand_env_var(raw: &str) -> Option<String> {
    match raw.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        Some(name) => std::env::var(name).ok(),
        None => Some(raw.to_string()),
    }
}

/// Candidate config files, most specific first
fn config_candidates() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("oaharvest.toml")];
    if let Some(dirs) = directories::ProjectDirs::from("", "", "oaharvest") {
        paths.push(dirs.config_dir().join("config.toml"));
    }
    paths
}

impl Config {
    /// First existing file among `./oaharvest.toml` and the user config
    /// dir (`oaharvest/config.toml`), or built-in defaults.
    pub fn load() -> Result<Self> {
        match config_candidates().into_iter().find(|p| p.exists()) {
            Some(path) => Self::from_file(&path),
            None => {
                log::debug!("No oaharvest.toml found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let config: Config =
            toml::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))?;
        log::info!("Using config {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.output.default_dir, PathBuf::from("./outputs"));
        assert_eq!(config.openalex.base_url, "https://api.openalex.org");
        assert_eq!(config.http.timeout_secs, 10);
        assert!(config.workers.default >= 1);
    }

    #[test]
    fn expand_env_var_simple() {
        std::env::set_var("OAHARVEST_TEST_VAR", "me@example.org");
        assert_eq!(
            expand_env_var("${OAHARVEST_TEST_VAR}"),
            Some("me@example.org".to_string())
        );
        std::env::remove_var("OAHARVEST_TEST_VAR");
    }

    #[test]
    fn expand_env_var_literal() {
        assert_eq!(expand_env_var("literal"), Some("literal".to_string()));
    }

    #[test]
    fn expand_env_var_missing() {
        assert_eq!(expand_env_var("${NONEXISTENT_VAR_12345}"), None);
    }

    #[test]
    fn local_file_searched_first() {
        assert_eq!(config_candidates()[0], PathBuf::from("oaharvest.toml"));
    }

    #[test]
    fn from_file_reports_parse_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[http]\ntimeout_secs = \"ten\"\n").unwrap();
        let err = Config::from_file(&path).unwrap_err();
        assert!(format!("{err:#}").contains("bad.toml"));
    }

    #[test]
    fn workers_resolve_clamps() {
        let w = WorkersConfig { default: 4, max: 8 };
        assert_eq!(w.resolve(None), 4);
        assert_eq!(w.resolve(Some(0)), 1);
        assert_eq!(w.resolve(Some(50)), 8);
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[output]
default_dir = "/tmp/oa"

[workers]
default = 4
max = 8

[openalex]
base_url = "http://localhost:8080"
mailto = "me@example.org"

[http]
timeout_secs = 30
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.output.default_dir, PathBuf::from("/tmp/oa"));
        assert_eq!(config.workers.default, 4);
        assert_eq!(config.workers.max, 8);
        assert_eq!(config.openalex.base_url, "http://localhost:8080");
        assert_eq!(config.openalex.mailto.as_deref(), Some("me@example.org"));
        assert_eq!(config.http.timeout_secs, 30);
    }
}
