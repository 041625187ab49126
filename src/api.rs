// API client module: the one context object every procedure shares. It holds
// the blocking reqwest client, the service endpoints, the project it targets
// and the credentials used to mint bearer tokens.

use std::cell::RefCell;

use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::config::Config;
use crate::credentials::{AccessToken, ServiceAccountKey};
use crate::error::{AdminError, Result};

/// Base URLs of the remote services. Overridable for emulators and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub identity_toolkit: String,
    pub firestore: String,
    pub storage: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            identity_toolkit: "https://identitytoolkit.googleapis.com".into(),
            firestore: "https://firestore.googleapis.com".into(),
            storage: "https://storage.googleapis.com".into(),
        }
    }
}

impl Endpoints {
    /// Point every service at the same base URL.
    pub fn single(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            identity_toolkit: base.clone(),
            firestore: base.clone(),
            storage: base,
        }
    }
}

/// Which project, bucket and collection the procedures operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRefs {
    pub project_id: String,
    pub bucket: String,
    pub collection: String,
}

/// Blocking client shared by the account, catalog and storage adapters.
pub struct ApiClient {
    client: Client,
    endpoints: Endpoints,
    refs: ProjectRefs,
    credentials: Option<ServiceAccountKey>,
    token: RefCell<Option<AccessToken>>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl ApiClient {
    /// Load the credentials named by `config` and build the client.
    ///
    /// Fails with `CredentialsMissing` before any network traffic when the
    /// key file is absent or malformed.
    pub fn connect(config: &Config) -> Result<Self> {
        let key = ServiceAccountKey::load(&config.credentials_path)?;
        let refs = config.project_refs(&key);
        tracing::debug!(project = %refs.project_id, bucket = %refs.bucket, "client configured");
        Ok(ApiClient {
            client: build_client()?,
            endpoints: config.endpoints.clone(),
            refs,
            credentials: Some(key),
            token: RefCell::new(None),
        })
    }

    /// Build a client around a fixed bearer token, for emulators and tests.
    pub fn with_token(refs: ProjectRefs, endpoints: Endpoints, token: &str) -> Result<Self> {
        Ok(ApiClient {
            client: build_client()?,
            endpoints,
            refs,
            credentials: None,
            token: RefCell::new(Some(AccessToken::fixed(token))),
        })
    }

    pub fn refs(&self) -> &ProjectRefs {
        &self.refs
    }

    pub fn project_id(&self) -> &str {
        &self.refs.project_id
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Current bearer token, minting a new one when the cached token is
    /// missing or about to expire.
    fn bearer(&self) -> Result<String> {
        if let Some(token) = self.token.borrow().as_ref() {
            if token.is_fresh(Utc::now()) {
                return Ok(token.value.clone());
            }
        }
        let key = self.credentials.as_ref().ok_or_else(|| {
            AdminError::Auth("access token expired and no credentials to refresh it".into())
        })?;
        let fresh = key.fetch_access_token(&self.client)?;
        let value = fresh.value.clone();
        *self.token.borrow_mut() = Some(fresh);
        Ok(value)
    }

    /// An authorized request against `url`.
    pub(crate) fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        tracing::debug!(method = method.as_str(), url, "api request");
        Ok(self.client.request(method, url).bearer_auth(self.bearer()?))
    }

    /// Send and decode a JSON response, mapping non-2xx into `AdminError::Api`.
    pub(crate) fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T> {
        let res = self.send(req)?;
        Ok(res.json()?)
    }

    /// Send and require a success status, discarding the body.
    pub(crate) fn send(&self, req: RequestBuilder) -> Result<Response> {
        let res = req.send()?;
        if !res.status().is_success() {
            return Err(error_from_response(res));
        }
        Ok(res)
    }
}

fn build_client() -> Result<Client> {
    Ok(Client::builder().build()?)
}

/// Turn a failed response into `AdminError::Api`, preferring the service's
/// own error message over the raw body.
fn error_from_response(res: Response) -> AdminError {
    let status = res.status().as_u16();
    let txt = res.text().unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&txt) {
        Ok(env) if !env.error.message.is_empty() => env.error.message,
        Ok(env) => env.error.status.unwrap_or(txt),
        Err(_) => txt,
    };
    AdminError::Api { status, message }
}
