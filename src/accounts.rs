// Accounts module: account lookup and the admin custom claim.
//
// Claims are written read-merge-write: whatever claims the account already
// carries are kept and only `admin` is set.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::ApiClient;
use crate::error::{AdminError, Result};

pub const ADMIN_CLAIM: &str = "admin";

/// Longest uid the account service accepts.
const MAX_UID_LEN: usize = 128;

pub type Claims = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub uid: String,
    pub email: Option<String>,
    pub custom_claims: Option<Claims>,
}

impl Account {
    /// True only when `admin` is present and exactly boolean `true`.
    pub fn has_admin_claim(&self) -> bool {
        matches!(
            self.custom_claims.as_ref().and_then(|c| c.get(ADMIN_CLAIM)),
            Some(Value::Bool(true))
        )
    }
}

/// How the operator named the account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Uid(String),
    Email(String),
}

impl Identifier {
    /// Anything containing `@` is an email; everything else is a uid.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.contains('@') {
            let (local, domain) = raw.split_once('@').unwrap_or_default();
            if local.is_empty() || domain.is_empty() || domain.contains('@') {
                return Err(AdminError::InvalidIdentifier(
                    raw.to_string(),
                    "not a valid email address".into(),
                ));
            }
            return Ok(Identifier::Email(raw.to_string()));
        }
        validate_uid(raw)?;
        Ok(Identifier::Uid(raw.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Identifier::Uid(_) => "UID",
            Identifier::Email(_) => "Email",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Uid(s) | Identifier::Email(s) => s,
        }
    }
}

fn validate_uid(uid: &str) -> Result<()> {
    if uid.is_empty() {
        return Err(AdminError::InvalidIdentifier(
            uid.to_string(),
            "UID must be a non-empty string".into(),
        ));
    }
    if uid.chars().count() > MAX_UID_LEN {
        return Err(AdminError::InvalidIdentifier(
            uid.to_string(),
            format!("UID must be at most {MAX_UID_LEN} characters"),
        ));
    }
    Ok(())
}

/// The account service, as far as these procedures need it.
pub trait AccountDirectory {
    fn find_by_uid(&self, uid: &str) -> Result<Account>;
    fn find_by_email(&self, email: &str) -> Result<Account>;
    /// Replace the account's whole custom-claims object.
    fn set_custom_claims(&self, uid: &str, claims: &Claims) -> Result<()>;
}

/// Outcome of reading an account's claims back.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimCheck {
    pub account: Account,
    pub granted: bool,
}

impl ClaimCheck {
    fn of(account: Account) -> Self {
        let granted = account.has_admin_claim();
        Self { account, granted }
    }
}

pub fn resolve(dir: &dyn AccountDirectory, id: &Identifier) -> Result<Account> {
    match id {
        Identifier::Uid(uid) => dir.find_by_uid(uid),
        Identifier::Email(email) => dir.find_by_email(email),
    }
}

/// Resolve the account and set `admin = true`, keeping its other claims.
/// Returns the account as it looks after the write.
pub fn grant_admin(dir: &dyn AccountDirectory, id: &Identifier) -> Result<Account> {
    let account = resolve(dir, id)?;
    grant_admin_to(dir, account)
}

/// Set `admin = true` on an already resolved account.
pub fn grant_admin_to(dir: &dyn AccountDirectory, mut account: Account) -> Result<Account> {
    let mut claims = account.custom_claims.clone().unwrap_or_default();
    claims.insert(ADMIN_CLAIM.to_string(), Value::Bool(true));
    dir.set_custom_claims(&account.uid, &claims)?;
    tracing::debug!(uid = %account.uid, "admin claim written");
    account.custom_claims = Some(claims);
    Ok(account)
}

/// Read-only check of the admin claim.
pub fn check_admin(dir: &dyn AccountDirectory, uid: &str) -> Result<ClaimCheck> {
    validate_uid(uid)?;
    Ok(ClaimCheck::of(dir.find_by_uid(uid)?))
}

/// Grant, then immediately read back through a fresh lookup of the
/// resolved account's uid.
pub fn grant_and_verify(dir: &dyn AccountDirectory, target: &str) -> Result<ClaimCheck> {
    let id = Identifier::parse(target)?;
    let account = grant_admin(dir, &id)?;
    check_admin(dir, &account.uid)
}

// Identity Toolkit wire format.

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LookupRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    local_id: Option<[&'a str; 1]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<[&'a str; 1]>,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    /// JSON-encoded claims object, absent when none were ever set.
    #[serde(default)]
    custom_attributes: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateRequest<'a> {
    local_id: &'a str,
    custom_attributes: String,
}

impl TryFrom<UserRecord> for Account {
    type Error = AdminError;

    fn try_from(rec: UserRecord) -> Result<Self> {
        let custom_claims = match rec.custom_attributes.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match serde_json::from_str::<Value>(raw)? {
                Value::Object(map) => Some(map),
                other => {
                    return Err(AdminError::Decode(format!(
                        "customAttributes is not an object: {other}"
                    )))
                }
            },
        };
        Ok(Account {
            uid: rec.local_id,
            email: rec.email,
            custom_claims,
        })
    }
}

impl ApiClient {
    fn accounts_url(&self, action: &str) -> String {
        format!(
            "{}/v1/projects/{}/accounts:{}",
            self.endpoints().identity_toolkit,
            self.project_id(),
            action
        )
    }

    fn lookup(&self, body: &LookupRequest<'_>, wanted: &str) -> Result<Account> {
        let req = self
            .request(Method::POST, &self.accounts_url("lookup"))?
            .json(body);
        let res: LookupResponse = self
            .send_json(req)
            .map_err(|e| account_error(e, wanted))?;
        res.users
            .into_iter()
            .next()
            .ok_or_else(|| AdminError::AccountNotFound(wanted.to_string()))?
            .try_into()
    }
}

/// Translate the account service's error codes into the operator taxonomy.
fn account_error(err: AdminError, wanted: &str) -> AdminError {
    let code = err.api_code().map(str::to_owned);
    match code.as_deref() {
        Some("USER_NOT_FOUND") | Some("EMAIL_NOT_FOUND") => {
            AdminError::AccountNotFound(wanted.to_string())
        }
        Some(code @ ("INVALID_ID" | "INVALID_LOCAL_ID" | "INVALID_EMAIL")) => {
            AdminError::InvalidIdentifier(wanted.to_string(), code.to_string())
        }
        _ => err,
    }
}

impl AccountDirectory for ApiClient {
    fn find_by_uid(&self, uid: &str) -> Result<Account> {
        self.lookup(
            &LookupRequest {
                local_id: Some([uid]),
                email: None,
            },
            uid,
        )
    }

    fn find_by_email(&self, email: &str) -> Result<Account> {
        self.lookup(
            &LookupRequest {
                local_id: None,
                email: Some([email]),
            },
            email,
        )
    }

    fn set_custom_claims(&self, uid: &str, claims: &Claims) -> Result<()> {
        let body = UpdateRequest {
            local_id: uid,
            custom_attributes: serde_json::to_string(claims)?,
        };
        let req = self
            .request(Method::POST, &self.accounts_url("update"))?
            .json(&body);
        self.send(req).map_err(|e| account_error(e, uid))?;
        Ok(())
    }
}
