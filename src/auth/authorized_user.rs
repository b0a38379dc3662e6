//! Cached authorized-user credential record.

use super::{serialize_optional_secret, serialize_secret, AccessToken, ScopeSet, TokenResponse};
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Persisted authorization record, in Google's "authorized user" JSON shape.
///
/// Older cache files written by PyDrive-style tooling use `access_token`
/// and `token_expiry`; both spellings are accepted when reading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    /// Short-lived access token.
    #[serde(alias = "access_token", serialize_with = "serialize_secret")]
    pub token: SecretString,

    /// Long-lived refresh token.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_secret"
    )]
    pub refresh_token: Option<SecretString>,

    /// Token endpoint the refresh token is redeemed at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,

    /// OAuth client id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth client secret.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_secret"
    )]
    pub client_secret: Option<SecretString>,

    /// Granted scopes.
    #[serde(default)]
    pub scopes: Vec<String>,

    /// Access token expiry.
    #[serde(default, alias = "token_expiry", skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl AuthorizedUser {
    /// Parses a cache file. Returns `None` for anything that is not a usable record.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let user: AuthorizedUser = serde_json::from_slice(bytes).ok()?;
        if user.token.expose_secret().is_empty() {
            return None;
        }
        Some(user)
    }

    /// Serializes the record for the cache file.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Builds a record from a token endpoint response.
    pub fn from_token_response(
        response: TokenResponse,
        token_uri: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
        requested: &ScopeSet,
    ) -> Self {
        let scopes = match response.scope.as_deref() {
            Some(scope) => ScopeSet::from_space_delimited(scope),
            None => requested.clone(),
        };

        Self {
            token: SecretString::new(response.access_token),
            refresh_token: response.refresh_token.map(SecretString::new),
            token_uri: Some(token_uri.into()),
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret),
            scopes: scopes.as_slice().to_vec(),
            expiry: response
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
        }
    }

    /// Applies a refresh response, keeping the old refresh token unless a new one was issued.
    pub fn refreshed(&self, response: TokenResponse) -> Self {
        let mut next = self.clone();
        next.token = SecretString::new(response.access_token);
        next.expiry = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(refresh_token) = response.refresh_token {
            next.refresh_token = Some(SecretString::new(refresh_token));
        }
        if let Some(scope) = response.scope.as_deref() {
            next.scopes = ScopeSet::from_space_delimited(scope).as_slice().to_vec();
        }
        next
    }

    /// True when the recorded expiry has passed. Records without expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expiry.map_or(false, |at| Utc::now() >= at)
    }

    /// True when a silent refresh is possible.
    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Scopes recorded in the file, falling back to `requested` when none were stored.
    pub fn scope_set(&self, requested: &ScopeSet) -> ScopeSet {
        if self.scopes.is_empty() {
            requested.clone()
        } else {
            ScopeSet::new(self.scopes.iter().cloned())
        }
    }

    /// Access token view of this record.
    pub fn access_token(&self) -> AccessToken {
        AccessToken {
            token: self.token.clone(),
            token_type: "Bearer".to_string(),
            expires_at: self.expiry,
            scopes: self.scopes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_google_format() {
        let json = br#"{
            "token": "ya29.token",
            "refresh_token": "1//refresh",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "id.apps.googleusercontent.com",
            "client_secret": "secret",
            "scopes": ["https://www.googleapis.com/auth/drive"],
            "expiry": "2099-01-01T00:00:00Z",
            "type": "authorized_user"
        }"#;

        let user = AuthorizedUser::from_slice(json).unwrap();
        assert_eq!(user.token.expose_secret(), "ya29.token");
        assert!(user.can_refresh());
        assert!(!user.is_expired());
        assert_eq!(user.client_id.as_deref(), Some("id.apps.googleusercontent.com"));
    }

    #[test]
    fn test_parse_legacy_field_names() {
        let json = br#"{"access_token": "old", "token_expiry": "2000-01-01T00:00:00Z"}"#;
        let user = AuthorizedUser::from_slice(json).unwrap();
        assert_eq!(user.token.expose_secret(), "old");
        assert!(user.is_expired());
        assert!(!user.can_refresh());
    }

    #[test]
    fn test_invalid_records_are_rejected() {
        assert!(AuthorizedUser::from_slice(b"not json").is_none());
        assert!(AuthorizedUser::from_slice(br#"{"refresh_token": "r"}"#).is_none());
        assert!(AuthorizedUser::from_slice(br#"{"token": ""}"#).is_none());
    }

    #[test]
    fn test_round_trip_keeps_secrets() {
        let json = br#"{"token": "t", "refresh_token": "r", "client_secret": "s"}"#;
        let user = AuthorizedUser::from_slice(json).unwrap();
        let written = String::from_utf8(user.to_json().unwrap()).unwrap();
        assert!(written.contains("\"refresh_token\": \"r\""));
        assert!(written.contains("\"client_secret\": \"s\""));
        assert!(!written.contains("expiry"));
    }

    #[test]
    fn test_refreshed_keeps_refresh_token() {
        let user = AuthorizedUser::from_slice(br#"{"token": "old", "refresh_token": "r"}"#).unwrap();
        let next = user.refreshed(TokenResponse {
            access_token: "new".to_string(),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(3600),
            refresh_token: None,
            scope: None,
        });

        assert_eq!(next.token.expose_secret(), "new");
        assert_eq!(
            next.refresh_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("r")
        );
        assert!(!next.is_expired());
    }

    #[test]
    fn test_scope_set_falls_back_to_requested() {
        let user = AuthorizedUser::from_slice(br#"{"token": "t"}"#).unwrap();
        assert_eq!(user.scope_set(&ScopeSet::drive_documents()), ScopeSet::drive_documents());
    }
}
