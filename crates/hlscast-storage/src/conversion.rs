//! HLS conversion API client.
//!
//! Hitting the conversion endpoint asks the provider to convert stored
//! media to HLS with a variant playlist: a manifest that references the
//! different quality renditions of the same media. The conversion runs
//! asynchronously provider-side; repeating the request returns its
//! current status.

use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{StorageError, StorageResult};

/// Conversion preset: HLS with a variant playlist.
const CONVERT_PRESET: &str = "video_convert=preset:hls.variant.playlist";

/// Coarse conversion state derived from the provider's status string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    /// Conversion finished; the result URL is available.
    Completed,
    /// Conversion still running; poll again later.
    Pending,
    /// Anything else. Terminal: unrecognized statuses are never retried.
    Unknown,
}

/// Parsed conversion status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ConversionData>,
    /// Any additional fields the provider returned, kept for diagnostics.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionData {
    pub url: String,
}

impl ConversionStatus {
    pub fn state(&self) -> ConversionState {
        match self.status.as_str() {
            "completed" => ConversionState::Completed,
            "pending" => ConversionState::Pending,
            _ => ConversionState::Unknown,
        }
    }

    /// The provider's result URL, present once the conversion completed.
    pub fn result_url(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.url.as_str())
    }
}

/// Client for the provider's asynchronous HLS conversion API.
pub struct ConversionClient {
    config: ProviderConfig,
    http: Client,
    handle_pattern: Regex,
}

impl ConversionClient {
    /// Create a new conversion client.
    pub fn new(config: ProviderConfig) -> StorageResult<Self> {
        let handle_pattern = handle_pattern(&config.file_base_url).map_err(|e| {
            StorageError::config_error(format!("Invalid file base URL pattern: {}", e))
        })?;
        let http = Client::builder()
            .user_agent(concat!("hlscast-storage/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            config,
            http,
            handle_pattern,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(ProviderConfig::from_env()?)
    }

    /// Extract the provider file handle from a stored-file URL.
    pub fn file_handle(&self, url: &str) -> StorageResult<String> {
        self.handle_pattern
            .captures(url)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| StorageError::handle_not_found(url))
    }

    /// Conversion-request URL for a stored file.
    ///
    /// Fails with `HandleNotFound` when `url` does not match the provider's
    /// file-serving path; no request is issued in that case.
    pub fn conversion_endpoint(&self, url: &str) -> StorageResult<String> {
        let handle = self.file_handle(url)?;
        Ok(format!(
            "{}/{}/{}/{}",
            self.config.cdn_base_url.trim_end_matches('/'),
            self.config.api_key,
            CONVERT_PRESET,
            handle
        ))
    }

    /// Request the current conversion status for a stored file.
    ///
    /// Transport and parse failures are folded into a single
    /// `ConversionFailed` carrying the source URL; raw transport errors
    /// never reach the caller.
    pub async fn request_conversion(&self, url: &str) -> StorageResult<ConversionStatus> {
        let endpoint = self.conversion_endpoint(url)?;

        debug!(source_url = %url, "Requesting HLS conversion status");
        self.fetch_status(&endpoint)
            .await
            .map_err(|e| StorageError::conversion_failed(e.to_string(), url))
    }

    async fn fetch_status(&self, endpoint: &str) -> Result<ConversionStatus, reqwest::Error> {
        self.http
            .get(endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await?
            .json::<ConversionStatus>()
            .await
    }

    /// Derive the playable CDN playlist URL from the provider's result URL.
    pub fn playlist_url(&self, result_url: &str) -> String {
        let handle = result_url.rsplit('/').next().unwrap_or(result_url);
        format!(
            "{}/video_playlist/{}",
            self.config.cdn_base_url.trim_end_matches('/'),
            handle
        )
    }
}

fn handle_pattern(file_base_url: &str) -> Result<Regex, regex::Error> {
    let base = file_base_url.trim_end_matches('/');
    let rest = base
        .strip_prefix("https://")
        .or_else(|| base.strip_prefix("http://"))
        .unwrap_or(base);
    Regex::new(&format!(r"https?://{}/(\w+)", regex::escape(rest)))
}
