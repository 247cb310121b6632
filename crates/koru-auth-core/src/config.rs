//! Provider configuration parsing
//!
//! Options use the platform's camelCase names so the same YAML/JSON that
//! configures a web widget can configure this client.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Behavioral options for one provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KoruOptions {
    /// Use the persisted cache
    #[serde(default = "default_cache")]
    pub cache: bool,

    /// Cache time-to-live in seconds
    #[serde(default = "default_cache_duration")]
    pub cache_duration: u64,

    /// Total attempts per resolution (must be >= 1)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Base backoff delay in milliseconds
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64,

    /// Emit diagnostic logs. No behavioral effect.
    #[serde(default)]
    pub debug: bool,

    /// Per-attempt HTTP timeout in milliseconds (none = client default)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
}

fn default_cache() -> bool {
    true
}

fn default_cache_duration() -> u64 {
    3600
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

impl Default for KoruOptions {
    fn default() -> Self {
        Self {
            cache: default_cache(),
            cache_duration: default_cache_duration(),
            retry_attempts: default_retry_attempts(),
            retry_delay: default_retry_delay(),
            debug: false,
            request_timeout: None,
        }
    }
}

impl KoruOptions {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout.map(Duration::from_millis)
    }
}

/// Identifying tuple of a provider: which installation to authorize and how.
///
/// Two providers with equal params resolve the same way; any change is a new
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthParams {
    pub website_id: String,
    pub app_id: String,
    /// Base URL of the platform (e.g. "https://app.koru.com")
    pub koru_url: String,
    pub options: KoruOptions,
    pub custom_data: Option<String>,
}

impl AuthParams {
    pub fn new(
        website_id: impl Into<String>,
        app_id: impl Into<String>,
        koru_url: impl Into<String>,
    ) -> Self {
        Self {
            website_id: website_id.into(),
            app_id: app_id.into(),
            koru_url: koru_url.into(),
            options: KoruOptions::default(),
            custom_data: None,
        }
    }

    pub fn with_options(mut self, options: KoruOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_custom_data(mut self, custom_data: impl Into<String>) -> Self {
        self.custom_data = Some(custom_data.into());
        self
    }
}

/// On-disk provider configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub website_id: String,
    pub app_id: String,
    pub koru_url: String,
    #[serde(default)]
    pub custom_data: Option<String>,
    #[serde(default)]
    pub options: KoruOptions,
}

impl ProviderConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read provider config from {}", path.display()))?;

        Self::from_yaml(&contents)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: ProviderConfig =
            serde_yaml::from_str(yaml).with_context(|| "Failed to parse provider config YAML")?;

        if config.website_id.trim().is_empty() {
            anyhow::bail!("websiteId must not be empty");
        }
        if config.app_id.trim().is_empty() {
            anyhow::bail!("appId must not be empty");
        }
        if config.koru_url.trim().is_empty() {
            anyhow::bail!("koruUrl must not be empty");
        }
        if config.options.retry_attempts == 0 {
            anyhow::bail!("retryAttempts must be at least 1");
        }

        Ok(config)
    }

    pub fn into_params(self) -> AuthParams {
        AuthParams {
            website_id: self.website_id,
            app_id: self.app_id,
            koru_url: self.koru_url,
            options: self.options,
            custom_data: self.custom_data,
        }
    }
}
