//! Configuration Management
//!
//! Handles persistent configuration storage for cfapi, with environment
//! variable overrides.

use crate::api::http::DEFAULT_BASE_URL;
use crate::engine::pagination::DEFAULT_PER_PAGE;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_ACCOUNT_ID: &str = "CLOUDFLARE_ACCOUNT_ID";
pub const ENV_API_TOKEN: &str = "CLOUDFLARE_API_TOKEN";
pub const ENV_BASE_URL: &str = "CLOUDFLARE_BASE_URL";

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Account that owns D1, R2, members and roles
    #[serde(default)]
    pub account_id: Option<String>,
    /// API token sent as a bearer credential
    #[serde(default)]
    pub api_token: Option<String>,
    /// API root, defaults to the public v4 endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    /// Page size for list operations
    #[serde(default)]
    pub per_page: Option<u32>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cfapi").join("config.json"))
    }

    /// Load configuration from disk, then apply environment overrides
    pub fn load() -> Self {
        let from_file = Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        from_file.with_env()
    }

    /// Load configuration from a specific file, falling back to defaults
    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Overlay values from `CLOUDFLARE_*` environment variables
    pub fn with_env(self) -> Self {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());
        if let Some(account_id) = non_empty(ENV_ACCOUNT_ID) {
            self.account_id = Some(account_id);
        }
        if let Some(token) = non_empty(ENV_API_TOKEN) {
            self.api_token = Some(token);
        }
        if let Some(base_url) = non_empty(ENV_BASE_URL) {
            self.base_url = Some(base_url);
        }
        self
    }

    /// Effective API root
    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Effective page size
    pub fn effective_per_page(&self) -> u32 {
        self.per_page.filter(|n| *n > 0).unwrap_or(DEFAULT_PER_PAGE)
    }

    /// API token, failing before any request is made when it is missing
    pub fn require_token(&self) -> Result<&str, Error> {
        self.api_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "No API token configured. Set {} or use --api-token",
                    ENV_API_TOKEN
                ))
            })
    }

    /// Set account and save
    pub fn set_account(&mut self, account_id: &str) -> anyhow::Result<()> {
        self.account_id = Some(account_id.to_string());
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_env_overrides_file_values() {
        let file = Config {
            account_id: Some("from-file".to_string()),
            api_token: Some("file-token".to_string()),
            ..Default::default()
        };
        let env: HashMap<&str, &str> =
            [(ENV_ACCOUNT_ID, "from-env"), (ENV_BASE_URL, "  ")].into_iter().collect();

        let config = file.with_vars(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.account_id.as_deref(), Some("from-env"));
        assert_eq!(config.api_token.as_deref(), Some("file-token"));
        assert_eq!(config.base_url, None);
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.effective_base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.effective_per_page(), DEFAULT_PER_PAGE);
        assert!(matches!(config.require_token(), Err(Error::Config(_))));
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = std::env::temp_dir().join(format!("cfapi-test-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.json");
        let config = Config {
            account_id: Some("acc".to_string()),
            per_page: Some(25),
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("cfapi-does-not-exist").join("config.json");
        assert_eq!(Config::load_from(&path), Config::default());
    }
}
