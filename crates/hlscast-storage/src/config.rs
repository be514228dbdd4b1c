//! Provider configuration.

use std::time::Duration;

use crate::error::{StorageError, StorageResult};

/// Default store endpoint (S3-backed container).
pub const DEFAULT_STORE_URL: &str = "https://www.filepicker.io/api/store/S3";

/// Default base URL that provider file handles are served under.
pub const DEFAULT_FILE_BASE_URL: &str = "https://www.filepicker.io/api/file";

/// Default CDN base URL for conversion requests and playlists.
pub const DEFAULT_CDN_BASE_URL: &str = "https://cdn.filestackcontent.com";

/// Default policy expiry (5 minutes — short for security, with some wiggle
/// room for clock skew).
pub const DEFAULT_POLICY_EXPIRY_SECS: u64 = 300;

/// Provider configuration.
///
/// Read once at client construction; there is no runtime reconfiguration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider API key.
    pub api_key: String,
    /// Provider API secret used to sign policies.
    pub api_secret: String,
    /// Destination container (bucket) name.
    pub container: String,
    /// Store endpoint URL.
    pub store_url: String,
    /// Base URL that stored-file handles are served under.
    pub file_base_url: String,
    /// CDN base URL for conversions and playlists.
    pub cdn_base_url: String,
    /// Lifetime of signed policies.
    pub policy_expiry: Duration,
    /// Optional additional root certificate for the provider endpoints.
    /// Standard certificate verification always stays enabled.
    pub provider_cert: Option<reqwest::Certificate>,
}

impl ProviderConfig {
    /// Create a config with the default provider endpoints.
    pub fn new(
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            container: container.into(),
            store_url: DEFAULT_STORE_URL.to_string(),
            file_base_url: DEFAULT_FILE_BASE_URL.to_string(),
            cdn_base_url: DEFAULT_CDN_BASE_URL.to_string(),
            policy_expiry: Duration::from_secs(DEFAULT_POLICY_EXPIRY_SECS),
            provider_cert: None,
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        let api_key = required_env("FILESTACK_API_KEY")?;
        let api_secret = required_env("FILESTACK_SECRET_KEY")?;
        let container = required_env("S3_BUCKET")?;

        let mut config = Self::new(api_key, api_secret, container);

        if let Ok(url) = std::env::var("FILESTACK_STORE_URL") {
            config.store_url = url;
        }
        if let Ok(url) = std::env::var("FILESTACK_FILE_BASE_URL") {
            config.file_base_url = url;
        }
        if let Ok(url) = std::env::var("FILESTACK_CDN_BASE_URL") {
            config.cdn_base_url = url;
        }
        config.policy_expiry = Duration::from_secs(
            std::env::var("FILESTACK_POLICY_EXPIRY_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_POLICY_EXPIRY_SECS),
        );

        Ok(config)
    }

    /// Set the store endpoint URL.
    pub fn with_store_url(mut self, url: impl Into<String>) -> Self {
        self.store_url = url.into();
        self
    }

    /// Set the file base URL.
    pub fn with_file_base_url(mut self, url: impl Into<String>) -> Self {
        self.file_base_url = url.into();
        self
    }

    /// Set the CDN base URL.
    pub fn with_cdn_base_url(mut self, url: impl Into<String>) -> Self {
        self.cdn_base_url = url.into();
        self
    }

    /// Set the policy expiry.
    pub fn with_policy_expiry(mut self, expiry: Duration) -> Self {
        self.policy_expiry = expiry;
        self
    }

    /// Pin an additional root certificate for the provider endpoints.
    pub fn with_provider_cert(mut self, cert: reqwest::Certificate) -> Self {
        self.provider_cert = Some(cert);
        self
    }
}

fn required_env(name: &str) -> StorageResult<String> {
    match std::env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(StorageError::config_error(format!("{} must be set", name))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_default_endpoints() {
        let config = ProviderConfig::new("key", "secret", "bucket");
        assert_eq!(config.store_url, DEFAULT_STORE_URL);
        assert_eq!(config.file_base_url, DEFAULT_FILE_BASE_URL);
        assert_eq!(config.cdn_base_url, DEFAULT_CDN_BASE_URL);
        assert_eq!(config.policy_expiry, Duration::from_secs(300));
        assert!(config.provider_cert.is_none());
    }
}
