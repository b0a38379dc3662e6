//! OAuth client secrets as downloaded from the Google Cloud console.

use super::{serialize_secret, AUTH_URL, TOKEN_URL};
use crate::errors::CredentialError;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where to read the client secrets from.
#[derive(Debug, Clone)]
pub enum ClientSecretsSource {
    /// Path to a `client_secrets.json` file.
    Path(PathBuf),
    /// Already-fetched file contents.
    Json(String),
}

impl ClientSecretsSource {
    /// Source backed by a file path.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        ClientSecretsSource::Path(path.into())
    }

    /// Source backed by JSON text.
    pub fn json(text: impl Into<String>) -> Self {
        ClientSecretsSource::Json(text.into())
    }
}

/// The OAuth client section of a client secrets file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthClient {
    /// Client id.
    pub client_id: String,

    /// Client secret.
    #[serde(serialize_with = "serialize_secret")]
    pub client_secret: SecretString,

    /// Consent endpoint.
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,

    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,

    /// Registered redirect URIs.
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

fn default_auth_uri() -> String {
    AUTH_URL.to_string()
}

fn default_token_uri() -> String {
    TOKEN_URL.to_string()
}

/// Parsed client secrets file: either an `installed` or a `web` application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientSecrets {
    /// Desktop ("installed") application.
    Installed(OAuthClient),
    /// Web application.
    Web(OAuthClient),
}

impl ClientSecrets {
    /// Reads and parses the secrets from `source`.
    pub async fn load(source: &ClientSecretsSource) -> Result<Self, CredentialError> {
        match source {
            ClientSecretsSource::Path(path) => {
                let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                    CredentialError::InvalidClientSecrets(format!(
                        "cannot read {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Self::parse(&text)
            }
            ClientSecretsSource::Json(text) => Self::parse(text),
        }
    }

    /// Parses client secrets JSON text.
    pub fn parse(text: &str) -> Result<Self, CredentialError> {
        serde_json::from_str(text).map_err(|e| {
            CredentialError::InvalidClientSecrets(format!(
                "expected an \"installed\" or \"web\" client: {}",
                e
            ))
        })
    }

    /// The OAuth client regardless of application type.
    pub fn client(&self) -> &OAuthClient {
        match self {
            ClientSecrets::Installed(client) | ClientSecrets::Web(client) => client,
        }
    }
}
