// Credentials module: service-account credentials and the OAuth2 JWT-bearer token exchange.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AdminError, Result};

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Scopes covering the account service, the document store and the object store.
pub const SCOPES: &str = "https://www.googleapis.com/auth/cloud-platform \
                          https://www.googleapis.com/auth/firebase \
                          https://www.googleapis.com/auth/identitytoolkit";

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// The subset of a service-account key file we need.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// A bearer token, optionally with a known expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// A token that never expires from our point of view (emulators, tests).
    pub fn fixed(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => now + Duration::seconds(EXPIRY_MARGIN_SECS) < at,
            None => true,
        }
    }
}

impl ServiceAccountKey {
    /// Read and parse a key file. Any failure here is fatal for the caller,
    /// so everything maps to `CredentialsMissing`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| AdminError::CredentialsMissing {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let key: ServiceAccountKey =
            serde_json::from_str(&raw).map_err(|e| AdminError::CredentialsMissing {
                path: path.to_path_buf(),
                reason: format!("not a service account key: {e}"),
            })?;
        if key.private_key.trim().is_empty() || key.client_email.trim().is_empty() {
            return Err(AdminError::CredentialsMissing {
                path: path.to_path_buf(),
                reason: "private_key or client_email is empty".into(),
            });
        }
        Ok(key)
    }

    /// Build the signed RS256 assertion for the JWT-bearer grant.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: SCOPES,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        };
        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| AdminError::Auth(format!("private_key is not an RSA PEM key: {e}")))?;
        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| AdminError::Auth(format!("signing assertion: {e}")))
    }

    /// Exchange a fresh assertion for an access token.
    pub fn fetch_access_token(&self, client: &Client) -> Result<AccessToken> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;
        tracing::debug!(token_uri = %self.token_uri, "requesting access token");

        let res = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().unwrap_or_default();
            return Err(AdminError::Auth(format!("{status} - {txt}")));
        }
        let body: TokenResponse = res.json()?;
        Ok(AccessToken {
            value: body.access_token,
            expires_at: body.expires_in.map(|secs| now + Duration::seconds(secs)),
        })
    }
}

/// Pick the credentials file: an explicit path wins, otherwise the first
/// existing candidate, otherwise the working-directory default (which will
/// then fail to load with a clear message).
pub fn discover_key_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    let local = PathBuf::from("serviceAccountKey.json");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("storefront-admin").join("serviceAccountKey.json");
        if candidate.exists() {
            return candidate;
        }
    }
    local
}
