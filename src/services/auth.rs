//! Request signatures for the publish API (Pusher-compatible HMAC).
//!
//! The string to sign is `METHOD\nPATH\nk1=v1&k2=v2...`: the upper-cased
//! method, the request path, and every client parameter except
//! `auth_signature`, keys lower-cased and sorted. The signature is the
//! lowercase hex HMAC-SHA256 of that string under the app secret.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use crate::config::{AppCredential, CredentialStore};
use crate::error::AuthError;

type HmacSha256 = Hmac<Sha256>;

/// Only supported `auth_version`.
pub const AUTH_VERSION: &str = "1.0";

/// Parameters added by routing, never signed by the client.
pub const ROUTE_PARAMS: [&str; 4] = ["app_id", "channel_id", "captures", "splat"];

const SIGNATURE_PARAM: &str = "auth_signature";

/// Client-supplied request parameters, keys lower-cased, route parameters removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(BTreeMap<String, String>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a urlencoded query string or form body.
    pub fn parse(encoded: &[u8]) -> Self {
        let mut params = Self::new();
        params.extend_encoded(encoded);
        params
    }

    /// Merge urlencoded pairs. Later keys overwrite earlier ones.
    pub fn extend_encoded(&mut self, encoded: &[u8]) {
        for (key, value) in url::form_urlencoded::parse(encoded) {
            self.insert(key, value);
        }
    }

    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) {
        let key = key.as_ref().to_ascii_lowercase();
        if ROUTE_PARAMS.contains(&key.as_str()) {
            return;
        }
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Urlencoded form, in key order.
    pub fn to_query(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.insert(key, value);
        }
        params
    }
}

/// What the signature covers.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    method: String,
    path: String,
    params: Params,
}

impl SignedRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>, params: Params) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            params,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn into_params(self) -> Params {
        self.params
    }

    pub fn canonical_string(&self) -> String {
        let pairs = self
            .params
            .iter()
            .filter(|(key, _)| *key != SIGNATURE_PARAM)
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}\n{}\n{}", self.method.to_ascii_uppercase(), self.path, pairs)
    }

    /// Hex HMAC-SHA256 of the canonical string.
    pub fn signature(&self, secret: &str) -> Result<String, AuthError> {
        let mut mac = mac_for(secret)?;
        mac.update(self.canonical_string().as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Add `auth_key`, `auth_timestamp`, `auth_version` and `auth_signature` for `credential`.
    pub fn sign(&mut self, credential: &AppCredential, timestamp: i64) -> Result<(), AuthError> {
        self.params.insert("auth_key", credential.key.as_str());
        self.params.insert("auth_timestamp", timestamp.to_string());
        self.params.insert("auth_version", AUTH_VERSION);
        let signature = self.signature(&credential.secret)?;
        self.params.insert(SIGNATURE_PARAM, signature);
        Ok(())
    }
}

fn mac_for(secret: &str) -> Result<HmacSha256, AuthError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidSecret)
}

/// Verifies publish requests against the configured app credentials.
#[derive(Clone)]
pub struct SignatureAuthenticator {
    credentials: Arc<CredentialStore>,
    grace: Duration,
}

impl SignatureAuthenticator {
    pub fn new(credentials: Arc<CredentialStore>, grace: Duration) -> Self {
        Self { credentials, grace }
    }

    /// Check `request` against the server clock. `app_id` is the routed app, if any.
    pub fn authenticate(
        &self,
        request: &SignedRequest,
        app_id: Option<&str>,
    ) -> Result<&AppCredential, AuthError> {
        self.authenticate_at(request, app_id, Utc::now().timestamp())
    }

    /// Same as [`authenticate`](Self::authenticate) with an explicit clock reading (unix seconds).
    pub fn authenticate_at(
        &self,
        request: &SignedRequest,
        app_id: Option<&str>,
        now: i64,
    ) -> Result<&AppCredential, AuthError> {
        let params = request.params();
        let key = params
            .get("auth_key")
            .ok_or(AuthError::MissingParameter("auth_key"))?;
        let signature = params
            .get(SIGNATURE_PARAM)
            .ok_or(AuthError::MissingParameter(SIGNATURE_PARAM))?;

        if let Some(version) = params.get("auth_version") {
            if version != AUTH_VERSION {
                return Err(AuthError::UnsupportedVersion(version.to_string()));
            }
        }
        self.check_timestamp(params.get("auth_timestamp"), now)?;

        let credential = self
            .credentials
            .find_by_key(key)
            .ok_or_else(|| AuthError::UnknownKey(key.to_string()))?;
        if let Some(app_id) = app_id {
            if credential.app_id != app_id {
                return Err(AuthError::AppMismatch {
                    expected: credential.app_id.clone(),
                    given: app_id.to_string(),
                });
            }
        }

        let declared = hex::decode(signature).map_err(|_| AuthError::MalformedSignature)?;
        let mut mac = mac_for(&credential.secret)?;
        mac.update(request.canonical_string().as_bytes());
        // constant-time
        mac.verify_slice(&declared).map_err(|_| {
            debug!(app_id = %credential.app_id, "signature mismatch");
            AuthError::SignatureMismatch
        })?;

        Ok(credential)
    }

    fn check_timestamp(&self, raw: Option<&str>, now: i64) -> Result<(), AuthError> {
        let raw = raw.ok_or(AuthError::MissingParameter("auth_timestamp"))?;
        let given: i64 = raw
            .parse()
            .map_err(|_| AuthError::InvalidTimestamp(raw.to_string()))?;
        let grace_secs = self.grace.as_secs();
        if now.abs_diff(given) > grace_secs {
            return Err(AuthError::TimestampExpired {
                given,
                now,
                grace_secs,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn credential() -> AppCredential {
        AppCredential::new("1", "key", "secret")
    }

    fn authenticator() -> SignatureAuthenticator {
        let store = CredentialStore::new(vec![credential(), AppCredential::new("2", "k2", "s2")])
            .unwrap();
        SignatureAuthenticator::new(Arc::new(store), Duration::from_secs(600))
    }

    fn signed(params: Params) -> SignedRequest {
        let mut req = SignedRequest::new("POST", "/apps/1/events", params);
        req.sign(&credential(), NOW).unwrap();
        req
    }

    fn with_param(req: &SignedRequest, key: &str, value: &str) -> SignedRequest {
        let mut params = req.params().clone();
        params.insert(key, value);
        SignedRequest::new("POST", "/apps/1/events", params)
    }

    #[test]
    fn test_canonical_string_sorts_lowercased_keys() {
        let params: Params = [("B", "2"), ("a", "1"), ("auth_signature", "x")]
            .into_iter()
            .collect();
        let req = SignedRequest::new("post", "/apps/1/events", params);
        assert_eq!(req.canonical_string(), "POST\n/apps/1/events\na=1&b=2");
    }

    #[test]
    fn test_known_vector_from_pusher_docs() {
        let params = Params::parse(
            b"auth_key=278d425bdf160c739803&auth_timestamp=1353088179&auth_version=1.0&body_md5=ec365a775a4cd0599faeb73354201b6f",
        );
        let req = SignedRequest::new("POST", "/apps/3/events", params);
        assert_eq!(
            req.signature("7ad3773142a6692b25b8").unwrap(),
            "da454824c97ba181a32ccc17a72625ba02771f50b50e1e7430e47a1f3f457e6c"
        );
    }

    #[test]
    fn test_route_params_are_never_signed() {
        let params: Params = [
            ("app_id", "1"),
            ("channel_id", "room"),
            ("splat", "x"),
            ("captures", "y"),
            ("name", "e"),
        ]
        .into_iter()
        .collect();
        let req = SignedRequest::new("POST", "/p", params);
        assert_eq!(req.canonical_string(), "POST\n/p\nname=e");
    }

    #[test]
    fn test_accepts_valid_signature() {
        let req = signed(Params::parse(b"name=foo"));
        let auth = authenticator();
        let app = auth.authenticate_at(&req, Some("1"), NOW + 30).unwrap();
        assert_eq!(app.app_id, "1");
    }

    #[test]
    fn test_rejects_tampered_params() {
        let req = signed(Params::parse(b"name=foo"));
        let tampered = with_param(&req, "name", "bar");
        assert_eq!(
            authenticator().authenticate_at(&tampered, None, NOW),
            Err(AuthError::SignatureMismatch)
        );
        let added = with_param(&req, "extra", "1");
        assert!(authenticator().authenticate_at(&added, None, NOW).is_err());
    }

    #[test]
    fn test_rejects_tampered_path_and_method() {
        let req = signed(Params::new());
        let other_path = SignedRequest::new("POST", "/apps/1/eventz", req.params().clone());
        let other_method = SignedRequest::new("GET", "/apps/1/events", req.params().clone());
        assert!(authenticator().authenticate_at(&other_path, None, NOW).is_err());
        assert!(authenticator().authenticate_at(&other_method, None, NOW).is_err());
    }

    #[test]
    fn test_rejects_signature_from_other_secret() {
        let mut req = SignedRequest::new("POST", "/apps/1/events", Params::new());
        req.sign(&AppCredential::new("1", "key", "secreT"), NOW).unwrap();
        assert_eq!(
            authenticator().authenticate_at(&req, None, NOW),
            Err(AuthError::SignatureMismatch)
        );
    }

    #[test]
    fn test_every_flipped_signature_bit_is_rejected() {
        let req = signed(Params::new());
        let good = hex::decode(req.params().get("auth_signature").unwrap()).unwrap();
        for byte in 0..good.len() {
            for bit in 0..8 {
                let mut bad = good.clone();
                bad[byte] ^= 1 << bit;
                let forged = with_param(&req, "auth_signature", &hex::encode(&bad));
                assert!(authenticator().authenticate_at(&forged, None, NOW).is_err());
            }
        }
    }

    #[test]
    fn test_route_params_do_not_change_outcome() {
        let req = signed(Params::parse(b"name=foo"));
        let mut params = req.params().clone();
        params.insert("app_id", "999");
        params.insert("channel_id", "elsewhere");
        let routed = SignedRequest::new("POST", "/apps/1/events", params);
        assert!(authenticator().authenticate_at(&routed, None, NOW).is_ok());
    }

    #[test]
    fn test_rejects_missing_parts() {
        let auth = authenticator();
        let req = signed(Params::new());

        let mut params = req.params().clone();
        params.0.remove("auth_signature");
        let no_sig = SignedRequest::new("POST", "/apps/1/events", params);
        assert_eq!(
            auth.authenticate_at(&no_sig, None, NOW),
            Err(AuthError::MissingParameter("auth_signature"))
        );

        let mut params = req.params().clone();
        params.0.remove("auth_key");
        let no_key = SignedRequest::new("POST", "/apps/1/events", params);
        assert_eq!(
            auth.authenticate_at(&no_key, None, NOW),
            Err(AuthError::MissingParameter("auth_key"))
        );

        let bad_hex = with_param(&req, "auth_signature", "zz");
        assert_eq!(
            auth.authenticate_at(&bad_hex, None, NOW),
            Err(AuthError::MalformedSignature)
        );
    }

    #[test]
    fn test_rejects_unknown_key_and_wrong_app() {
        let mut req = SignedRequest::new("POST", "/apps/1/events", Params::new());
        req.sign(&AppCredential::new("1", "nope", "secret"), NOW).unwrap();
        assert_eq!(
            authenticator().authenticate_at(&req, None, NOW),
            Err(AuthError::UnknownKey("nope".to_string()))
        );

        let req = signed(Params::new());
        assert!(matches!(
            authenticator().authenticate_at(&req, Some("2"), NOW),
            Err(AuthError::AppMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_stale_or_future_timestamps() {
        let req = signed(Params::new());
        let auth = authenticator();
        assert!(auth.authenticate_at(&req, None, NOW + 600).is_ok());
        assert!(matches!(
            auth.authenticate_at(&req, None, NOW + 601),
            Err(AuthError::TimestampExpired { .. })
        ));
        assert!(matches!(
            auth.authenticate_at(&req, None, NOW - 601),
            Err(AuthError::TimestampExpired { .. })
        ));
    }

    #[test]
    fn test_rejects_unsupported_version() {
        let req = with_param(&signed(Params::new()), "auth_version", "2.0");
        assert_eq!(
            authenticator().authenticate_at(&req, None, NOW),
            Err(AuthError::UnsupportedVersion("2.0".to_string()))
        );
    }

    #[test]
    fn test_to_query_roundtrips_through_parse() {
        let req = signed(Params::parse(b"name=a+b%26c"));
        let parsed = Params::parse(req.params().to_query().as_bytes());
        assert_eq!(&parsed, req.params());
        assert_eq!(parsed.get("name"), Some("a b&c"));
    }
}
