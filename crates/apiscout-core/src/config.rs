use std::fs;
use std::path::Path;
use std::time::Duration;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validate::ValidationOptions;

/// Top-level configuration loaded from `.apiscout.yaml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoutConfig {
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub validation: ValidationOptions,
}

/// TTL store sizing and sweep cadence.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub max_entries: usize,
    /// Independent of the TTL.
    pub cleanup_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 15 * 60,
            max_entries: 100,
            cleanup_interval_secs: 5 * 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs.max(1))
    }
}

/// HTTP client options shared by document fetches and graph queries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
    /// Extra headers sent with every request, e.g. `Authorization`.
    pub headers: IndexMap<String, String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: None,
            headers: IndexMap::new(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".apiscout.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<ScoutConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let config: ScoutConfig =
        serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# apiscout configuration
cache:
  ttl_secs: 900               # how long a fetched document stays fresh
  max_entries: 100            # oldest-expiring entry is evicted beyond this
  cleanup_interval_secs: 300  # background sweep cadence

fetch:
  timeout_secs: 30
  # user_agent: apiscout/0.3
  headers: {}
    # Authorization: Bearer <token>

validation:
  skip_required: false
  skip_constraints: false
  skip_type_checking: false
  allow_coercion: false      # convert "5" to 5 etc. before checking types
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ScoutConfig::default();
        assert_eq!(config.cache.ttl_secs, 900);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.cache.cleanup_interval_secs, 300);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert!(config.fetch.headers.is_empty());
        assert!(!config.validation.allow_coercion);
        assert!(!config.validation.skip_required);
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
cache:
  ttl_secs: 60
  max_entries: 5
fetch:
  timeout_secs: 3
  user_agent: scout-test
  headers:
    Authorization: Bearer abc
validation:
  allow_coercion: true
  skip_constraints: true
"#;
        let config: ScoutConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.max_entries, 5);
        // Defaults applied
        assert_eq!(config.cache.cleanup_interval_secs, 300);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(3));
        assert_eq!(config.fetch.user_agent.as_deref(), Some("scout-test"));
        assert_eq!(config.fetch.headers["Authorization"], "Bearer abc");
        assert!(config.validation.allow_coercion);
        assert!(config.validation.skip_constraints);
        assert!(!config.validation.skip_required);
    }

    #[test]
    fn test_default_content_round_trips() {
        let config: ScoutConfig = serde_yaml_ng::from_str(default_config_content()).unwrap();
        assert_eq!(config.cache.ttl_secs, 900);
        assert_eq!(config.fetch.timeout_secs, 30);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(load_config(&path).unwrap().is_none());

        fs::write(&path, "cache:\n  ttl_secs: 10\n").unwrap();
        let config = load_config(&path).unwrap().unwrap();
        assert_eq!(config.cache.ttl_secs, 10);

        fs::write(&path, "cache: [unterminated").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
