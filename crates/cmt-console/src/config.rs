//! Console configuration
//!
//! Defaults, then an optional TOML file, then environment overrides:
//!
//! | variable                | field                 |
//! |-------------------------|-----------------------|
//! | `CMTOOL_SERVICE_URL`    | `service_url`         |
//! | `CMTOOL_STATE_DIR`      | `state_dir`           |
//! | `TARGET_REGION_CODE`    | `region`              |
//! | `CMTOOL_PUBLISH_POLICY` | `publish_policy`      |

use cmt_pipeline::{PipelineConfig, PublishPolicy, DEFAULT_MAX_CANDIDATES};
use cmt_store::ACTIVITY_CAPACITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// cmtool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Base URL of the cost-estimator service
    pub service_url: String,
    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,
    /// Directory holding JSON snapshots
    pub state_dir: PathBuf,
    /// Region used for scripts and provisioning
    pub region: String,
    /// Shortlist size taken from the eligible lookup
    pub max_candidates: usize,
    /// Activity log capacity
    pub activity_capacity: usize,
    /// Out-of-order run handling
    pub publish_policy: PublishPolicy,
}

impl ConsoleConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_service_url(mut self, url: impl Into<String>) -> Self {
        self.service_url = url.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_publish_policy(mut self, policy: PublishPolicy) -> Self {
        self.publish_policy = policy;
        self
    }

    /// Defaults, overlaid with `path` (if given) and the process environment
    ///
    /// # Errors
    /// Unreadable or unparsable file, or an invalid environment value.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(|name| std::env::var(name).ok())
    }

    /// Parse a TOML file; missing keys keep their defaults
    ///
    /// # Errors
    /// [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    /// Apply overrides read through `lookup`; empty values are ignored
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] for an unknown publish policy.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("CMTOOL_SERVICE_URL") {
            self.service_url = url;
        }
        if let Some(dir) = get("CMTOOL_STATE_DIR") {
            self.state_dir = PathBuf::from(dir);
        }
        if let Some(region) = get("TARGET_REGION_CODE") {
            self.region = region;
        }
        if let Some(policy) = get("CMTOOL_PUBLISH_POLICY") {
            self.publish_policy = parse_policy(&policy).ok_or(ConfigError::InvalidValue {
                name: "CMTOOL_PUBLISH_POLICY",
                value: policy,
            })?;
        }
        Ok(self)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    #[must_use]
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_max_candidates(self.max_candidates)
            .with_publish_policy(self.publish_policy)
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            service_url: "http://127.0.0.1:5000".to_string(),
            request_timeout_secs: 30,
            state_dir: PathBuf::from(".cmtool"),
            region: "us-east-1".to_string(),
            max_candidates: DEFAULT_MAX_CANDIDATES,
            activity_capacity: ACTIVITY_CAPACITY,
            publish_policy: PublishPolicy::LastWriteWins,
        }
    }
}

fn parse_policy(value: &str) -> Option<PublishPolicy> {
    match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "last_write_wins" => Some(PublishPolicy::LastWriteWins),
        "latest_run_wins" => Some(PublishPolicy::LatestRunWins),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults() {
        let config = ConsoleConfig::default();
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.max_candidates, 10);
        assert_eq!(config.activity_capacity, 100);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.publish_policy, PublishPolicy::LastWriteWins);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ConsoleConfig = toml::from_str(
            r#"
            service_url = "http://estimator:8080"
            publish_policy = "latest_run_wins"
            "#,
        )
        .unwrap();
        assert_eq!(config.service_url, "http://estimator:8080");
        assert_eq!(config.publish_policy, PublishPolicy::LatestRunWins);
        assert_eq!(config.state_dir, PathBuf::from(".cmtool"));
    }

    #[test]
    fn environment_overrides_file_values() {
        let config = ConsoleConfig::new()
            .with_region("eu-west-1")
            .with_overrides(env(&[
                ("TARGET_REGION_CODE", "ap-south-1"),
                ("CMTOOL_STATE_DIR", "/var/lib/cmtool"),
                ("CMTOOL_PUBLISH_POLICY", "Latest-Run-Wins"),
                ("CMTOOL_SERVICE_URL", "  "),
            ]))
            .unwrap();

        assert_eq!(config.region, "ap-south-1");
        assert_eq!(config.state_dir, PathBuf::from("/var/lib/cmtool"));
        assert_eq!(config.publish_policy, PublishPolicy::LatestRunWins);
        assert_eq!(config.service_url, "http://127.0.0.1:5000");
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err = ConsoleConfig::new()
            .with_overrides(env(&[("CMTOOL_PUBLISH_POLICY", "first_wins")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: "CMTOOL_PUBLISH_POLICY", .. }));
    }

    #[test]
    fn pipeline_config_follows_console_config() {
        let mut config = ConsoleConfig::new().with_publish_policy(PublishPolicy::LatestRunWins);
        config.max_candidates = 5;
        let pipeline = config.pipeline();
        assert_eq!(pipeline.max_candidates, 5);
        assert_eq!(pipeline.publish_policy, PublishPolicy::LatestRunWins);
    }
}
