//! Signed, time-limited read references for stored blobs.
//!
//! A reference is a URL of the form
//! `{endpoint}/{bucket}/{key}?X-Cdc-Expires={unix}&X-Cdc-Signature={hex}`,
//! where the signature is a keyed BLAKE3 MAC over the method, bucket, key
//! and expiry. Anyone holding the signing key can verify a reference without
//! contacting the store.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::blob::{to_chrono, SignedUrl};
use crate::error::{StoreError, StoreResult};

/// Shortest lifetime a reference may be issued for.
pub const MIN_EXPIRY: Duration = Duration::from_secs(1);

/// Longest lifetime a reference may be issued for (7 days).
pub const MAX_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const EXPIRES_PARAM: &str = "X-Cdc-Expires";
const SIGNATURE_PARAM: &str = "X-Cdc-Signature";
const KEY_CONTEXT: &str = "cdc-store 2024 signed read reference v1";

/// Issues and verifies signed read references.
#[derive(Clone)]
pub struct UrlSigner {
    key: [u8; 32],
    endpoint: String,
}

impl UrlSigner {
    /// Create a signer from a raw 32-byte key.
    pub fn new(key: [u8; 32], endpoint: impl Into<String>) -> Self {
        Self {
            key,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        }
    }

    /// Derive the signing key from a shared secret string.
    pub fn from_secret(secret: &str, endpoint: impl Into<String>) -> Self {
        Self::new(blake3::derive_key(KEY_CONTEXT, secret.as_bytes()), endpoint)
    }

    /// Create a signer with a fresh random key. References it issues can only
    /// be verified by this process.
    pub fn random(endpoint: impl Into<String>) -> Self {
        Self::new(rand::random::<[u8; 32]>(), endpoint)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Issue a reference to `bucket/key` valid for `expires_in` from `now`.
    pub fn presign(
        &self,
        bucket: &str,
        key: &str,
        expires_in: Duration,
        now: DateTime<Utc>,
    ) -> StoreResult<SignedUrl> {
        if expires_in < MIN_EXPIRY {
            return Err(StoreError::InvalidExpiry(format!(
                "{}s is shorter than the {}s minimum",
                expires_in.as_secs(),
                MIN_EXPIRY.as_secs()
            )));
        }
        if expires_in > MAX_EXPIRY {
            return Err(StoreError::InvalidExpiry(format!(
                "{}s exceeds the {}s maximum",
                expires_in.as_secs(),
                MAX_EXPIRY.as_secs()
            )));
        }

        let expires_at = now + to_chrono(expires_in)?;
        let expires = expires_at.timestamp();
        let signature = self.mac(bucket, key, expires);
        let url = format!(
            "{}/{}/{}?{EXPIRES_PARAM}={expires}&{SIGNATURE_PARAM}={}",
            self.endpoint,
            uri_encode(bucket),
            uri_encode(key),
            signature.to_hex()
        );

        Ok(SignedUrl { url, expires_at })
    }

    /// Verify a reference at `now` and return the `(bucket, key)` it grants.
    pub fn verify(&self, url: &str, now: DateTime<Utc>) -> StoreResult<(String, String)> {
        let rest = url
            .strip_prefix(&self.endpoint)
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(|| StoreError::MalformedUrl("endpoint mismatch".into()))?;
        let (path, query) = rest
            .split_once('?')
            .ok_or_else(|| StoreError::MalformedUrl("missing query string".into()))?;
        let (bucket, key) = path
            .split_once('/')
            .ok_or_else(|| StoreError::MalformedUrl("missing object key".into()))?;
        let bucket = uri_decode(bucket)?;
        let key = uri_decode(key)?;

        let mut expires = None;
        let mut signature = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some((EXPIRES_PARAM, v)) => expires = Some(v),
                Some((SIGNATURE_PARAM, v)) => signature = Some(v),
                _ => {}
            }
        }
        let expires: i64 = expires
            .ok_or_else(|| StoreError::MalformedUrl(format!("missing {EXPIRES_PARAM}")))?
            .parse()
            .map_err(|_| StoreError::MalformedUrl(format!("invalid {EXPIRES_PARAM}")))?;
        let signature = signature
            .ok_or_else(|| StoreError::MalformedUrl(format!("missing {SIGNATURE_PARAM}")))?;
        let provided: [u8; 32] = hex::decode(signature)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(StoreError::InvalidSignature)?;

        // blake3::Hash equality is constant-time.
        if blake3::Hash::from(provided) != self.mac(&bucket, &key, expires) {
            return Err(StoreError::InvalidSignature);
        }
        if now.timestamp() >= expires {
            return Err(StoreError::Expired);
        }
        Ok((bucket, key))
    }

    fn mac(&self, bucket: &str, key: &str, expires: i64) -> blake3::Hash {
        let message = format!("GET\n{bucket}\n{key}\n{expires}");
        blake3::keyed_hash(&self.key, message.as_bytes())
    }
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Percent-encode everything except RFC 3986 unreserved characters.
fn uri_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn uri_decode(input: &str) -> StoreResult<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input
                .get(i + 1..i + 3)
                .ok_or_else(|| StoreError::MalformedUrl("truncated escape".into()))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| StoreError::MalformedUrl(format!("invalid escape %{hex}")))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| StoreError::MalformedUrl("path is not UTF-8".into()))
}
