//! Policy signing for provider requests.
//!
//! A policy is the set of restrictions (allowed calls, scope, size limits,
//! time window) proposed for a single provider request. The provider
//! accepts its URL-safe base64 JSON encoding together with an HMAC-SHA256
//! hex signature keyed by the API secret.

use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Serialize, Serializer};
use sha2::Sha256;

use crate::error::{StorageError, StorageResult};

/// Provider calls a policy can allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PolicyCall {
    Read,
    Stat,
    Convert,
    Write,
    WriteUrl,
    Pick,
    Store,
    StoreUrl,
}

impl PolicyCall {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyCall::Read => "read",
            PolicyCall::Stat => "stat",
            PolicyCall::Convert => "convert",
            PolicyCall::Write => "write",
            PolicyCall::WriteUrl => "writeUrl",
            PolicyCall::Pick => "pick",
            PolicyCall::Store => "store",
            PolicyCall::StoreUrl => "storeUrl",
        }
    }
}

/// Options for generating a signed policy.
#[derive(Debug, Clone, Default)]
pub struct PolicyOptions {
    /// Calls the policy should allow.
    pub call: Vec<PolicyCall>,
    /// Handle of the specific file to grant permissions for.
    pub handle: Option<String>,
    /// Storage path the operations should be restricted to.
    pub path: Option<String>,
    /// Minimum allowed upload size.
    pub min_size: Option<u64>,
    /// Maximum allowed upload size.
    pub max_size: Option<u64>,
    /// Time from which the expiry should start (defaults to now).
    pub expiration_start: Option<DateTime<Utc>>,
    /// Lifetime of the signature (defaults to the configured policy expiry).
    pub expiry: Option<Duration>,
}

impl PolicyOptions {
    /// Options allowing a single call.
    pub fn new(call: PolicyCall) -> Self {
        Self {
            call: vec![call],
            ..Default::default()
        }
    }

    /// Options allowing several calls.
    pub fn with_calls(calls: Vec<PolicyCall>) -> Self {
        Self {
            call: calls,
            ..Default::default()
        }
    }

    /// Restrict the policy to a specific file handle.
    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = Some(handle.into());
        self
    }

    /// Restrict the policy to a storage path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the minimum allowed upload size.
    pub fn with_min_size(mut self, size: u64) -> Self {
        self.min_size = Some(size);
        self
    }

    /// Set the maximum allowed upload size.
    pub fn with_max_size(mut self, size: u64) -> Self {
        self.max_size = Some(size);
        self
    }

    /// Set the time the expiry window starts from.
    pub fn with_expiration_start(mut self, start: DateTime<Utc>) -> Self {
        self.expiration_start = Some(start);
        self
    }

    /// Set the signature lifetime.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

/// A policy in the provider's wire form.
///
/// Field order matters only for readability; absent restrictions are
/// omitted entirely rather than serialized as null.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Policy {
    #[serde(serialize_with = "serialize_call")]
    pub call: Vec<PolicyCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "minsize", skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    #[serde(rename = "maxsize", skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u64>,
    /// Absolute UNIX timestamp, stringified.
    pub expiry: String,
}

// The provider accepts a bare string when a single call is allowed.
fn serialize_call<S: Serializer>(calls: &[PolicyCall], s: S) -> Result<S::Ok, S::Error> {
    if calls.len() == 1 {
        calls[0].serialize(s)
    } else {
        calls.serialize(s)
    }
}

impl Policy {
    /// Build a policy from options.
    ///
    /// `handle` takes precedence over `path` when both are given; a policy
    /// with neither is simply unscoped. Paths are normalized to a single
    /// trailing `/` with repeated separators collapsed.
    pub fn from_options(options: &PolicyOptions, default_expiry: Duration) -> Self {
        let (handle, path) = match (&options.handle, &options.path) {
            (Some(h), _) => (Some(h.clone()), None),
            (None, Some(p)) => (None, Some(normalize_path(p))),
            (None, None) => (None, None),
        };

        let start = options.expiration_start.unwrap_or_else(Utc::now);
        let ttl = options.expiry.unwrap_or(default_expiry);
        let expiry = (start.timestamp() + ttl.as_secs() as i64).to_string();

        Self {
            call: options.call.clone(),
            handle,
            path,
            min_size: options.min_size,
            max_size: options.max_size,
            expiry,
        }
    }
}

/// Ensure the path has a single trailing `/` and no repeated separators.
fn normalize_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for c in path.chars().chain(std::iter::once('/')) {
        if c == '/' && out.ends_with('/') {
            continue;
        }
        out.push(c);
    }
    out
}

/// A policy plus its encoded form and signature, ready to authorize a
/// provider call.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub policy: Policy,
    /// URL-safe base64 of the policy JSON. Already in the exact form the
    /// provider verifies; never re-encode it.
    pub encoded_policy: String,
    /// Hex HMAC-SHA256 of `encoded_policy`, keyed by the API secret.
    pub signature: String,
}

impl SignedRequest {
    /// Encode and sign a policy with the API secret.
    ///
    /// Deterministic: the same policy bytes and secret always produce the
    /// same encoding and signature.
    pub fn new(policy: Policy, secret: &str) -> StorageResult<Self> {
        type HmacSha256 = Hmac<Sha256>;

        let json = serde_json::to_vec(&policy)?;
        let encoded_policy = URL_SAFE.encode(json);

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| StorageError::config_error(format!("Invalid HMAC key: {}", e)))?;
        mac.update(encoded_policy.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(Self {
            policy,
            encoded_policy,
            signature,
        })
    }
}
