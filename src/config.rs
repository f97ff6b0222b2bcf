//! Configuration types and loading

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::gateway::{GitGateway, VcsGateway};

/// Main repowatch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the tracked working tree; resolved at startup if absent
    pub repo: Option<PathBuf>,

    /// The single upstream remote
    pub remote: String,

    /// How often automatic checks run
    #[serde(rename = "fetch-interval")]
    pub fetch_interval: IntervalValue,

    /// How often the in-flight fetch subprocess is polled, in milliseconds
    #[serde(rename = "fetch-poll-ms")]
    pub fetch_poll_ms: u64,

    /// Whether `watch` arms the scheduler immediately
    #[serde(rename = "auto-check")]
    pub auto_check: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo: None,
            remote: "origin".to_string(),
            fetch_interval: IntervalValue::Secs(300),
            fetch_poll_ms: 200,
            auto_check: true,
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let local_config = PathBuf::from(".repowatch.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("repowatch").join("repowatch.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Validate configuration before use
    ///
    /// Call early in startup so a bad interval string fails fast instead of
    /// at the first re-arm.
    pub fn validate(&self) -> Result<()> {
        self.fetch_interval.as_duration()?;
        if self.remote.is_empty() {
            return Err(eyre!("remote must not be empty"));
        }
        Ok(())
    }

    pub fn fetch_poll_interval(&self) -> Duration {
        Duration::from_millis(self.fetch_poll_ms)
    }
}

/// Fetch interval accepting either integer seconds or a suffixed string
///
/// `fetch-interval: 300` and `fetch-interval: "5m"` are both valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntervalValue {
    Secs(u64),
    Human(String),
}

impl IntervalValue {
    pub fn as_duration(&self) -> Result<Duration> {
        match self {
            IntervalValue::Secs(s) => Ok(Duration::from_secs(*s)),
            IntervalValue::Human(s) => parse_interval(s),
        }
    }
}

/// Parse a human-readable interval: bare seconds, or `s`/`m`/`h` suffixed.
fn parse_interval(s: &str) -> Result<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return Err(eyre!("interval must not be empty"));
    }

    let (value, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(idx) => s.split_at(idx),
        None => (s, "s"),
    };

    let value: u64 = value.parse().context(format!("Invalid interval value: {s:?}"))?;

    let secs = match unit.trim() {
        "s" | "sec" | "secs" => value,
        "m" | "min" | "mins" => value * 60,
        "h" | "hr" | "hrs" => value * 3600,
        other => return Err(eyre!("Unknown interval unit {other:?} in {s:?}")),
    };

    Ok(Duration::from_secs(secs))
}

/// Working directory of the tracked local clone
///
/// Resolved once at startup and immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct RepoHandle {
    path: PathBuf,
}

impl RepoHandle {
    /// Resolve the handle: explicit config value, else the toplevel of the
    /// working tree containing the current directory, else a logged
    /// best-effort `"."` (later gateway calls will fail if that is wrong).
    pub async fn resolve(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return Self { path: path.to_path_buf() };
        }

        let gateway = GitGateway::new(".");
        match gateway.run(&["rev-parse", "--show-toplevel"]).await {
            Ok(out) => {
                let toplevel = out.trim();
                if toplevel.is_empty() {
                    warn!("Empty toplevel from git; falling back to current directory");
                    Self { path: PathBuf::from(".") }
                } else {
                    Self {
                        path: PathBuf::from(toplevel),
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not resolve repository toplevel; falling back to current directory");
                Self { path: PathBuf::from(".") }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.remote, "origin");
        assert_eq!(config.fetch_interval, IntervalValue::Secs(300));
        assert_eq!(config.fetch_poll_ms, 200);
        assert!(config.auto_check);
        assert!(config.repo.is_none());
        config.validate().expect("defaults must validate");
    }

    #[test]
    fn test_interval_integer_seconds() {
        let config: Config = serde_yaml::from_str("fetch-interval: 90").unwrap();
        assert_eq!(config.fetch_interval.as_duration().unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_interval_human_string() {
        let config: Config = serde_yaml::from_str("fetch-interval: \"5m\"").unwrap();
        assert_eq!(config.fetch_interval.as_duration().unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn test_parse_interval_forms() {
        assert_eq!(parse_interval("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_interval("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_interval("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_interval(" 10 min ").unwrap(), Duration::from_secs(600));
    }

    #[test]
    fn test_parse_interval_rejects_garbage() {
        assert!(parse_interval("").is_err());
        assert!(parse_interval("soon").is_err());
        assert!(parse_interval("5 fortnights").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_interval() {
        let config = Config {
            fetch_interval: IntervalValue::Human("whenever".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = "repo: /tmp/clone\nremote: upstream\nfetch-interval: \"2m\"\nauto-check: false\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.repo, Some(PathBuf::from("/tmp/clone")));
        assert_eq!(config.remote, "upstream");
        assert!(!config.auto_check);
        assert_eq!(config.fetch_interval.as_duration().unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = temp.path().join("repowatch.yml");
        fs::write(&path, "remote: upstream\nfetch-interval: \"90s\"\n").expect("write failed");

        let config = Config::load(Some(&path)).expect("load failed");
        assert_eq!(config.remote, "upstream");
        assert_eq!(config.fetch_interval.as_duration().unwrap(), Duration::from_secs(90));
    }

    #[test]
    fn test_load_explicit_missing_path_errors() {
        let path = PathBuf::from("/nonexistent/repowatch.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[tokio::test]
    async fn test_repo_handle_explicit_path_wins() {
        let handle = RepoHandle::resolve(Some(Path::new("/tmp/somewhere"))).await;
        assert_eq!(handle.path(), Path::new("/tmp/somewhere"));
    }
}
