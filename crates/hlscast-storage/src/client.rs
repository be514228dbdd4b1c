//! Signed storage client.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info};
use url::form_urlencoded;

use crate::config::ProviderConfig;
use crate::error::{StorageError, StorageResult};
use crate::policy::{Policy, PolicyCall, PolicyOptions, SignedRequest};

/// Query parameters the client owns; extra params may not override them.
const RESERVED_PARAMS: &[&str] = &["key", "signature", "policy", "container", "path"];

/// A file payload to upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes,
        }
    }

    /// Set the MIME type sent with the upload.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Wire form of the provider's store response.
#[derive(Debug, Deserialize)]
struct StoreResponse {
    #[serde(rename = "type")]
    mimetype: Option<String>,
    size: Option<u64>,
    url: Option<String>,
    key: Option<String>,
    filename: Option<String>,
}

/// Result of a successful store operation.
///
/// Immutable from the client's perspective once created.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub mimetype: Option<String>,
    pub size: Option<u64>,
    /// Opaque provider-assigned id, the trailing path segment of `url`.
    pub handle: Option<String>,
    pub store_key: Option<String>,
    pub filename: Option<String>,
    pub url: Option<String>,
}

impl StoredFile {
    fn from_response(blob: StoreResponse) -> Self {
        let handle = blob.url.as_deref().and_then(handle_from_url);
        Self {
            mimetype: blob.mimetype,
            size: blob.size,
            handle,
            store_key: blob.key,
            filename: blob.filename,
            url: blob.url,
        }
    }
}

fn handle_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let segment = segment.trim();
    (!segment.is_empty()).then(|| segment.to_string())
}

/// Client for the provider's signed REST API.
pub struct StorageClient {
    config: ProviderConfig,
    http: Client,
}

impl StorageClient {
    /// Create a new storage client.
    pub fn new(config: ProviderConfig) -> StorageResult<Self> {
        let mut builder = Client::builder()
            .user_agent(concat!("hlscast-storage/", env!("CARGO_PKG_VERSION")));
        // No overall request timeout: the upload legitimately blocks for the
        // duration of the transfer, so callers bound it externally.
        if let Some(cert) = &config.provider_cert {
            builder = builder.add_root_certificate(cert.clone());
        }
        let http = builder.build()?;

        Ok(Self { config, http })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(ProviderConfig::from_env()?)
    }

    /// The configured destination container.
    pub fn container(&self) -> &str {
        &self.config.container
    }

    /// Create a policy and signature for provider operations.
    ///
    /// Pure function of the options, the API secret, and the clock.
    pub fn sign(&self, options: &PolicyOptions) -> StorageResult<SignedRequest> {
        let policy = Policy::from_options(options, self.config.policy_expiry);
        SignedRequest::new(policy, &self.config.api_secret)
    }

    /// Store a file through the provider.
    ///
    /// The upload is authorized by a fresh `store`-scoped signature; `path`
    /// organizes the file under the destination storage. Extra query
    /// parameters are merged in, reserved keys excluded.
    pub async fn store(
        &self,
        file: UploadFile,
        path: Option<&str>,
        extra_params: &[(String, String)],
    ) -> StorageResult<StoredFile> {
        let mut options = PolicyOptions::new(PolicyCall::Store);
        if let Some(p) = path {
            options = options.with_path(p);
        }
        let signed = self.sign(&options)?;

        let url = format!(
            "{}?{}",
            self.config.store_url,
            self.store_query(&signed, extra_params)
        );

        let mut part = Part::bytes(file.bytes).file_name(file.filename);
        if let Some(content_type) = &file.content_type {
            part = part.mime_str(content_type)?;
        }
        let form = Form::new().part("fileUpload", part);

        debug!(store_url = %self.config.store_url, path = ?path, "Uploading file to provider");
        let response = self.http.post(&url).multipart(form).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(StorageError::StoreFailed {
                status: status.as_u16(),
            });
        }

        let blob: StoreResponse = response.json().await?;
        let stored = StoredFile::from_response(blob);
        info!(handle = ?stored.handle, size = ?stored.size, "Stored file with provider");
        Ok(stored)
    }

    /// Build the store query string.
    ///
    /// All parameters are form-encoded except `signature` and `policy`,
    /// which are appended verbatim: they are already in the exact encoded
    /// form the provider verifies, and re-encoding them would break that
    /// verification.
    fn store_query(&self, signed: &SignedRequest, extra_params: &[(String, String)]) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("key", &self.config.api_key);
        serializer.append_pair("container", &self.config.container);
        if let Some(path) = &signed.policy.path {
            serializer.append_pair("path", path);
        }
        for (key, value) in extra_params {
            if RESERVED_PARAMS.contains(&key.as_str()) {
                continue;
            }
            serializer.append_pair(key, value);
        }

        let mut query = serializer.finish();
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str("signature=");
        query.push_str(&signed.signature);
        query.push_str("&policy=");
        query.push_str(&signed.encoded_policy);
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Policy;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server_uri: &str) -> ProviderConfig {
        ProviderConfig::new("test-key", "test-secret", "test-bucket")
            .with_store_url(format!("{}/api/store/S3", server_uri))
            .with_file_base_url(format!("{}/api/file", server_uri))
            .with_cdn_base_url(server_uri.to_string())
    }

    fn signed_fixture(signature: &str, encoded_policy: &str, path: Option<&str>) -> SignedRequest {
        SignedRequest {
            policy: Policy {
                call: vec![PolicyCall::Store],
                handle: None,
                path: path.map(|p| p.to_string()),
                min_size: None,
                max_size: None,
                expiry: "1700000000".to_string(),
            },
            encoded_policy: encoded_policy.to_string(),
            signature: signature.to_string(),
        }
    }

    #[test]
    fn store_query_form_encodes_all_but_signature_and_policy() {
        let client = StorageClient::new(test_config("https://provider.test")).unwrap();
        let signed = signed_fixture("abc%2F", "eyJj==", None);
        let extras = vec![("other".to_string(), "val with space".to_string())];

        let query = client.store_query(&signed, &extras);

        assert!(query.contains("other=val+with+space"));
        assert!(query.ends_with("signature=abc%2F&policy=eyJj=="));
    }

    #[test]
    fn store_query_excludes_reserved_extra_params() {
        let client = StorageClient::new(test_config("https://provider.test")).unwrap();
        let signed = signed_fixture("sig", "pol", None);
        let extras = vec![
            ("policy".to_string(), "forged".to_string()),
            ("key".to_string(), "forged".to_string()),
            ("kind".to_string(), "audio".to_string()),
        ];

        let query = client.store_query(&signed, &extras);

        assert!(!query.contains("forged"));
        assert!(query.contains("kind=audio"));
        assert!(query.contains("key=test-key"));
    }

    #[test]
    fn store_query_includes_normalized_path() {
        let client = StorageClient::new(test_config("https://provider.test")).unwrap();
        let signed = signed_fixture("sig", "pol", Some("uploads/audio/"));

        let query = client.store_query(&signed, &[]);

        assert!(query.contains("path=uploads%2Faudio%2F"));
    }

    #[test]
    fn handle_is_last_url_segment() {
        assert_eq!(
            handle_from_url("https://www.filepicker.io/api/file/H1").as_deref(),
            Some("H1")
        );
        assert_eq!(
            handle_from_url("https://www.filepicker.io/api/file/H1/").as_deref(),
            Some("H1")
        );
        assert_eq!(handle_from_url("not a url"), None);
    }

    #[tokio::test]
    async fn store_returns_file_reference_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/store/S3"))
            .and(query_param("key", "test-key"))
            .and(query_param("container", "test-bucket"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "type": "audio/mpeg",
                "size": 1024,
                "url": "https://www.filepicker.io/api/file/H1",
                "key": "k",
                "filename": "f.mp3"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = StorageClient::new(test_config(&server.uri())).unwrap();
        let file = UploadFile::new("f.mp3", b"mp3-bytes".to_vec()).with_content_type("audio/mpeg");

        let stored = client.store(file, None, &[]).await.unwrap();

        assert_eq!(stored.handle.as_deref(), Some("H1"));
        assert_eq!(stored.mimetype.as_deref(), Some("audio/mpeg"));
        assert_eq!(stored.size, Some(1024));
        assert_eq!(stored.store_key.as_deref(), Some("k"));
        assert_eq!(stored.filename.as_deref(), Some("f.mp3"));
    }

    #[tokio::test]
    async fn store_fails_with_status_code_on_non_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/store/S3"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = StorageClient::new(test_config(&server.uri())).unwrap();
        let file = UploadFile::new("f.mp3", b"mp3-bytes".to_vec());

        let err = client.store(file, None, &[]).await.unwrap_err();

        assert!(matches!(err, StorageError::StoreFailed { status: 403 }));
        assert!(err.to_string().contains("403"));
    }
}
