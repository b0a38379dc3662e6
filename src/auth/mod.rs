//! Credential building and resolution.
//!
//! Everything needed to turn credential sources into an authorization
//! handle ([`Credentials`]) that the Drive client can attach to requests:
//! - Service accounts (JWT bearer exchange)
//! - OAuth client secrets with a cached authorized-user record and the
//!   installed-app consent flow
//! - Pre-authorized credential files fetched from a URL
//! - Automatic resolution across all of the above, in fixed priority order
//!
//! # Example
//!
//! ```no_run
//! use simple_google_drive::auth::{CredentialResolver, ScopeSet, ServiceAccountKeySource};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = CredentialResolver::new()?;
//! let credentials = resolver
//!     .resolve_from_service_account(
//!         &ServiceAccountKeySource::path("service-account.json"),
//!         &ScopeSet::drive(),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod authorized_user;
mod backend;
mod client_secrets;
mod credentials;
mod installed;
mod resolver;
mod service_account;
mod storage;

pub use authorized_user::AuthorizedUser;
pub use backend::{AuthBackend, HttpAuthBackend, TokenResponse};
pub use client_secrets::{ClientSecrets, ClientSecretsSource, OAuthClient};
pub use credentials::{CredentialOrigin, Credentials};
pub use installed::{CallbackParams, InstalledFlow};
pub use resolver::{check_expiry, next_action, Availability, CredentialResolver, ResolveAction, ResolveState, StepOutcome};
pub use service_account::{ServiceAccountKey, ServiceAccountKeySource};
pub use storage::{CredentialStore, FileCredentialStore, InMemoryCredentialStore};

use crate::errors::AuthenticationError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serializer;

/// Default Google OAuth2 token URL.
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Default Google OAuth2 consent URL.
pub const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Token expiry buffer (5 minutes) - refresh tokens proactively before expiry.
pub const TOKEN_EXPIRY_BUFFER_SECONDS: i64 = 300;

/// JWT lifetime for service account tokens (1 hour).
pub const JWT_LIFETIME_SECONDS: i64 = 3600;

/// OAuth 2.0 scopes used by this crate.
pub mod scopes {
    /// Full access to Drive files.
    pub const DRIVE: &str = "https://www.googleapis.com/auth/drive";

    /// Full access to Google Docs documents.
    pub const DOCUMENTS: &str = "https://www.googleapis.com/auth/documents";
}

/// Ordered, de-duplicated set of scope strings bound to a credential.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopeSet(Vec<String>);

impl ScopeSet {
    /// Drive-only access.
    pub fn drive() -> Self {
        Self(vec![scopes::DRIVE.to_string()])
    }

    /// Drive plus Google Docs access.
    pub fn drive_documents() -> Self {
        Self(vec![scopes::DRIVE.to_string(), scopes::DOCUMENTS.to_string()])
    }

    /// Builds a scope set from arbitrary scope strings, keeping first occurrences.
    pub fn new<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for scope in scopes {
            let scope = scope.into();
            if !scope.is_empty() && !out.contains(&scope) {
                out.push(scope);
            }
        }
        Self(out)
    }

    /// Parses a space-separated scope string as returned by token endpoints.
    pub fn from_space_delimited(value: &str) -> Self {
        Self::new(value.split_whitespace())
    }

    /// Scope strings in order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Space-joined form used in JWT claims and consent URLs.
    pub fn to_space_delimited(&self) -> String {
        self.0.join(" ")
    }

    /// Returns true when no scopes are present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ScopeSet {
    fn default() -> Self {
        Self::drive()
    }
}

/// Authentication provider abstraction.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Get an access token for API requests.
    async fn get_access_token(&self) -> Result<AccessToken, AuthenticationError>;

    /// Force refresh the access token.
    async fn refresh_token(&self) -> Result<AccessToken, AuthenticationError>;

    /// Check if the current token is expired.
    fn is_expired(&self) -> bool;
}

/// Access token with metadata.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The token string.
    pub token: SecretString,

    /// Token type (usually "Bearer").
    pub token_type: String,

    /// Expiration time. `None` means the issuer did not report one.
    pub expires_at: Option<DateTime<Utc>>,

    /// Scopes granted.
    pub scopes: Vec<String>,
}

impl AccessToken {
    /// Creates a new access token.
    pub fn new(
        token: impl Into<String>,
        token_type: impl Into<String>,
        expires_at: Option<DateTime<Utc>>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            token: SecretString::new(token.into()),
            token_type: token_type.into(),
            expires_at,
            scopes,
        }
    }

    /// Checks if the token is expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.map_or(false, |at| Utc::now() >= at)
    }

    /// Checks if the token needs proactive refresh (within 5 minutes of expiry).
    pub fn needs_refresh(&self) -> bool {
        self.expires_at.map_or(false, |at| {
            Utc::now() >= at - Duration::seconds(TOKEN_EXPIRY_BUFFER_SECONDS)
        })
    }

    /// Returns the authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.token.expose_secret())
    }
}

pub(crate) fn serialize_secret<S: Serializer>(
    secret: &SecretString,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

pub(crate) fn serialize_optional_secret<S: Serializer>(
    secret: &Option<SecretString>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serializer.serialize_some(secret.expose_secret()),
        None => serializer.serialize_none(),
    }
}
