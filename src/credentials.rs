// Credential loading. The token file is an authorized-user JSON document
// produced by an earlier OAuth consent flow; this program only reads it.
// Refreshing or re-issuing the token happens outside of this tool.

use crate::error::{AppError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::path::Path;

/// A token is treated as expired this long before its recorded expiry.
pub const REFRESH_THRESHOLD_SECS: i64 = 225;

/// The parts of the authorized-user file this tool reads. Refresh fields
/// (`refresh_token`, `client_id`, ...) are ignored since no refresh is
/// ever attempted.
#[derive(Deserialize, Debug)]
struct AuthorizedUserFile {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    scopes: Option<Vec<String>>,
    #[serde(default)]
    expiry: Option<String>,
}

/// Authenticated session handle loaded from the token file.
#[derive(Clone)]
pub struct Credential {
    token: String,
    pub scopes: Vec<String>,
    pub expiry: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish()
    }
}

impl Credential {
    /// Bearer token for the Authorization header.
    pub fn access_token(&self) -> &str {
        &self.token
    }

    /// Whether the token is present and not within the refresh threshold
    /// of its expiry at `now`. A token without expiry never expires.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        if self.token.is_empty() {
            return false;
        }
        match self.expiry {
            Some(expiry) => now < expiry - Duration::seconds(REFRESH_THRESHOLD_SECS),
            None => true,
        }
    }
}

/// Load the credential at `path` and check it is usable at `now`.
///
/// Files that list no scopes inherit `required_scopes`. Files whose scopes
/// do not cover `required_scopes` are accepted with a warning; the API
/// rejects the calls if the grant is really too narrow.
pub fn load_credentials(
    path: &Path,
    required_scopes: &[&str],
    now: DateTime<Utc>,
) -> Result<Credential> {
    if !path.exists() {
        return Err(AppError::CredentialMissing(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path).map_err(|source| AppError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let file: AuthorizedUserFile =
        serde_json::from_str(&raw).map_err(|source| AppError::CredentialParse {
            path: path.to_path_buf(),
            source,
        })?;

    let expiry = match file.expiry.as_deref() {
        Some(s) => Some(parse_expiry(s)?),
        None => None,
    };

    let scopes = match file.scopes {
        Some(granted) if !granted.is_empty() => {
            let missing: Vec<&str> = required_scopes
                .iter()
                .copied()
                .filter(|s| !granted.iter().any(|g| g == s))
                .collect();
            if !missing.is_empty() {
                tracing::warn!(?missing, "token file does not list all required scopes");
            }
            granted
        }
        _ => required_scopes.iter().map(|s| s.to_string()).collect(),
    };

    let cred = Credential {
        token: file.token.unwrap_or_default(),
        scopes,
        expiry,
    };

    if cred.token.is_empty() {
        return Err(AppError::CredentialInvalid("token file holds no access token".into()));
    }
    if !cred.is_valid(now) {
        return Err(AppError::CredentialInvalid(format!(
            "access token expired at {}",
            cred.expiry.map(|e| e.to_rfc3339()).unwrap_or_default()
        )));
    }

    tracing::debug!(path = %path.display(), expiry = ?cred.expiry, "credential loaded");
    Ok(cred)
}

/// Expiry is written as an ISO timestamp, with or without a zone suffix.
/// A naive timestamp is taken as UTC.
fn parse_expiry(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| AppError::CredentialInvalid(format!("unreadable expiry {s:?}: {e}")))
}
