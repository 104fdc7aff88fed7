use std::time::Duration;

use chrono::{DateTime, Utc};
use hkdf::hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;

use super::{ObjectKey, ObjectStoreError};

type HmacSha256 = Hmac<Sha256>;

/// Path prefix under which signed objects are served.
pub const OBJECTS_PATH: &str = "/objects/";

/// A URL granting time-limited read access to one object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and checks HMAC-SHA256 signed object URLs.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
    public_url: String,
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}

impl UrlSigner {
    pub fn new(secret: impl Into<Vec<u8>>, public_url: &str) -> Self {
        Self {
            secret: secret.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Signer with a random per-process secret. URLs die with the process.
    pub fn ephemeral(public_url: &str) -> Self {
        let secret: [u8; 32] = rand::random();
        Self::new(secret.to_vec(), public_url)
    }

    pub fn presign(
        &self,
        key: &ObjectKey,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<SignedUrl, ObjectStoreError> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| ObjectStoreError::SigningKey(e.to_string()))?;
        let expires_at = now + ttl;
        let expires = expires_at.timestamp();
        let signature = hex::encode(self.mac(key, expires)?.finalize().into_bytes());
        Ok(SignedUrl {
            url: format!(
                "{}{OBJECTS_PATH}{key}?expires={expires}&signature={signature}",
                self.public_url
            ),
            expires_at,
        })
    }

    /// Check a signature presented for `key`. Fails on mismatch or expiry.
    pub fn verify(
        &self,
        key: &ObjectKey,
        expires: i64,
        signature_hex: &str,
        now: DateTime<Utc>,
    ) -> Result<(), ObjectStoreError> {
        if now.timestamp() > expires {
            return Err(ObjectStoreError::BadSignature);
        }
        let signature = hex::decode(signature_hex).map_err(|_| ObjectStoreError::BadSignature)?;
        self.mac(key, expires)?
            .verify_slice(&signature)
            .map_err(|_| ObjectStoreError::BadSignature)
    }

    /// Verify a complete signed URL and return the key it grants.
    pub fn resolve(&self, url: &str, now: DateTime<Utc>) -> Result<ObjectKey, ObjectStoreError> {
        let key = key_from_url(url)?;
        let query = url
            .split_once('?')
            .map(|(_, q)| q.split('#').next().unwrap_or_default())
            .unwrap_or_default();

        let mut expires = None;
        let mut signature = None;
        for pair in query.split('&') {
            match pair.split_once('=') {
                Some(("expires", v)) => expires = v.parse::<i64>().ok(),
                Some(("signature", v)) => signature = Some(v),
                _ => {}
            }
        }
        let (Some(expires), Some(signature)) = (expires, signature) else {
            return Err(ObjectStoreError::BadSignature);
        };
        self.verify(&key, expires, signature, now)?;
        Ok(key)
    }

    fn mac(&self, key: &ObjectKey, expires: i64) -> Result<HmacSha256, ObjectStoreError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| ObjectStoreError::SigningKey(e.to_string()))?;
        mac.update(key.as_str().as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        Ok(mac)
    }
}

/// Recover the object key from a previously issued URL.
///
/// Accepts absolute URLs from any host as well as bare `/objects/...` paths;
/// query string and fragment are ignored.
pub fn key_from_url(url: &str) -> Result<ObjectKey, ObjectStoreError> {
    let not_object = || ObjectStoreError::NotAnObjectUrl(url.to_string());

    let trimmed = url.trim();
    let path = match trimmed.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).ok_or_else(not_object)?,
        None => trimmed,
    };
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    let raw_key = path.strip_prefix(OBJECTS_PATH).ok_or_else(not_object)?;
    ObjectKey::parse(raw_key)
}
