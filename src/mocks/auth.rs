//! Mock auth backend for resolver tests.

use crate::auth::{
    AccessToken, AuthBackend, AuthorizedUser, ClientSecrets, ScopeSet, ServiceAccountKey,
    TokenResponse,
};
use crate::errors::CredentialError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Backend that answers from fixed data and counts every call.
#[derive(Default)]
pub struct MockAuthBackend {
    refresh_fails: bool,
    service_account_fails: bool,
    remote_body: Option<Vec<u8>>,
    refresh_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    service_account_calls: AtomicUsize,
    interactive_calls: AtomicUsize,
}

impl MockAuthBackend {
    /// Access token handed out by successful refreshes.
    pub const REFRESHED_TOKEN: &'static str = "refreshed-token";

    /// Access token handed out by the service-account exchange.
    pub const SERVICE_ACCOUNT_TOKEN: &'static str = "service-account-token";

    /// Backend where every operation succeeds, except fetches (no remote body).
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes refreshes fail.
    pub fn failing_refresh(mut self) -> Self {
        self.refresh_fails = true;
        self
    }

    /// Makes service-account exchanges fail.
    pub fn failing_service_account(mut self) -> Self {
        self.service_account_fails = true;
        self
    }

    /// Serves `body` from every remote fetch.
    pub fn with_remote(mut self, body: Vec<u8>) -> Self {
        self.remote_body = Some(body);
        self
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn service_account_calls(&self) -> usize {
        self.service_account_calls.load(Ordering::SeqCst)
    }

    pub fn interactive_calls(&self) -> usize {
        self.interactive_calls.load(Ordering::SeqCst)
    }

    /// Calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.refresh_calls()
            + self.fetch_calls()
            + self.service_account_calls()
            + self.interactive_calls()
    }
}

#[async_trait]
impl AuthBackend for MockAuthBackend {
    async fn refresh(&self, user: &AuthorizedUser) -> Result<AuthorizedUser, CredentialError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.refresh_fails {
            return Err(CredentialError::AuthProvider("invalid_grant".to_string()));
        }
        Ok(user.refreshed(TokenResponse {
            access_token: Self::REFRESHED_TOKEN.to_string(),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(3600),
            refresh_token: None,
            scope: None,
        }))
    }

    async fn exchange_service_account(
        &self,
        _key: &ServiceAccountKey,
        scopes: &ScopeSet,
        _subject: Option<&str>,
    ) -> Result<AccessToken, CredentialError> {
        self.service_account_calls.fetch_add(1, Ordering::SeqCst);
        if self.service_account_fails {
            return Err(CredentialError::AuthProvider("invalid_client".to_string()));
        }
        Ok(AccessToken::new(
            Self::SERVICE_ACCOUNT_TOKEN,
            "Bearer",
            Some(Utc::now() + Duration::hours(1)),
            scopes.as_slice().to_vec(),
        ))
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, CredentialError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.remote_body
            .clone()
            .ok_or_else(|| CredentialError::AuthProvider(format!("Fetch of {} failed with status 404", url)))
    }

    async fn authorize_interactive(
        &self,
        secrets: &ClientSecrets,
        scopes: &ScopeSet,
    ) -> Result<AuthorizedUser, CredentialError> {
        self.interactive_calls.fetch_add(1, Ordering::SeqCst);
        let client = secrets.client();
        Ok(AuthorizedUser::from_token_response(
            TokenResponse {
                access_token: "interactive-token".to_string(),
                token_type: Some("Bearer".to_string()),
                expires_in: Some(3600),
                refresh_token: Some("interactive-refresh".to_string()),
                scope: None,
            },
            client.token_uri.clone(),
            client.client_id.clone(),
            client.client_secret.clone(),
            scopes,
        ))
    }
}
