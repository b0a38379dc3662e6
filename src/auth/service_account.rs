//! Service-account keys and JWT assertions.
//!
//! Uses RS256 (RSA-SHA256) for signing. The private key must be PEM encoded,
//! exactly as it appears in the JSON key downloaded from the console.

use super::{ScopeSet, JWT_LIFETIME_SECONDS, TOKEN_URL};
use crate::errors::{AuthenticationError, CredentialError};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a service-account key comes from.
#[derive(Debug, Clone)]
pub enum ServiceAccountKeySource {
    /// Key supplied inline as a JSON object.
    Json(serde_json::Value),
    /// Path to a key file.
    Path(PathBuf),
}

impl ServiceAccountKeySource {
    /// Source backed by a key file.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ServiceAccountKeySource::Path(path.into())
    }
}

impl From<serde_json::Value> for ServiceAccountKeySource {
    fn from(value: serde_json::Value) -> Self {
        ServiceAccountKeySource::Json(value)
    }
}

/// Service-account key fields used for the JWT bearer grant.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Account type, `service_account` for valid keys.
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,

    /// Owning project.
    #[serde(default)]
    pub project_id: Option<String>,

    /// Key id placed in the JWT header.
    #[serde(default)]
    pub private_key_id: Option<String>,

    /// PEM-encoded RSA private key.
    pub private_key: SecretString,

    /// Service-account email, used as the JWT issuer.
    pub client_email: String,

    /// Token endpoint, used as the JWT audience.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    TOKEN_URL.to_string()
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    exp: i64,
    iat: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<&'a str>,
}

impl ServiceAccountKey {
    /// Loads a key from an inline JSON object or from a file.
    pub async fn load(source: &ServiceAccountKeySource) -> Result<Self, CredentialError> {
        match source {
            ServiceAccountKeySource::Json(value) => Self::from_value(value.clone()),
            ServiceAccountKeySource::Path(path) => {
                let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                    CredentialError::InvalidKeyFormat(format!(
                        "cannot read {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                let value: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                    CredentialError::InvalidKeyFormat(format!(
                        "{} is not JSON: {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::from_value(value)
            }
        }
    }

    /// Parses an inline key. The value must be a JSON object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, CredentialError> {
        if !value.is_object() {
            return Err(CredentialError::InvalidKeyFormat(
                "service account key must be a JSON object".to_string(),
            ));
        }

        let key: ServiceAccountKey = serde_json::from_value(value)
            .map_err(|e| CredentialError::InvalidKeyFormat(e.to_string()))?;

        if let Some(kind) = key.key_type.as_deref() {
            if kind != "service_account" {
                return Err(CredentialError::InvalidKeyFormat(format!(
                    "expected type \"service_account\", found \"{}\"",
                    kind
                )));
            }
        }

        Ok(key)
    }

    /// Signs a JWT assertion for `scopes`, optionally impersonating `subject`.
    ///
    /// # Domain-Wide Delegation
    ///
    /// When `subject` is set the service account acts as that user, which
    /// requires delegation to be granted in the Workspace admin console.
    pub fn create_jwt(
        &self,
        scopes: &ScopeSet,
        subject: Option<&str>,
    ) -> Result<String, AuthenticationError> {
        let now = Utc::now().timestamp();

        let claims = Claims {
            iss: &self.client_email,
            scope: scopes.to_space_delimited(),
            aud: &self.token_uri,
            exp: now + JWT_LIFETIME_SECONDS,
            iat: now,
            sub: subject,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(|e| {
                AuthenticationError::JwtEncodingError(format!("Invalid private key: {}", e))
            })?;

        encode(&header, &claims, &key).map_err(|e| {
            AuthenticationError::JwtEncodingError(format!("JWT encoding failed: {}", e))
        })
    }
}
