//! Network side of credential resolution.

use super::{
    AccessToken, AuthorizedUser, ClientSecrets, InstalledFlow, OAuthClient, ScopeSet,
    ServiceAccountKey,
};
use crate::config::ResolverConfig;
use crate::errors::CredentialError;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Operations that talk to the identity provider.
///
/// The resolver only decides *which* of these to call; keeping them behind a
/// trait lets that decision logic run without a network.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Redeems the record's refresh token for a new access token.
    async fn refresh(&self, user: &AuthorizedUser) -> Result<AuthorizedUser, CredentialError>;

    /// Exchanges a signed JWT assertion for an access token.
    async fn exchange_service_account(
        &self,
        key: &ServiceAccountKey,
        scopes: &ScopeSet,
        subject: Option<&str>,
    ) -> Result<AccessToken, CredentialError>;

    /// Downloads a hosted file (credential cache, client secrets, key).
    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, CredentialError>;

    /// Runs the installed-app consent flow and returns the authorized record.
    async fn authorize_interactive(
        &self,
        secrets: &ClientSecrets,
        scopes: &ScopeSet,
    ) -> Result<AuthorizedUser, CredentialError>;
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    pub access_token: String,
    /// Token type.
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Refresh token, present on code exchange with offline access.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes, space separated.
    #[serde(default)]
    pub scope: Option<String>,
}

/// [`AuthBackend`] over HTTPS using `reqwest`.
pub struct HttpAuthBackend {
    http_client: Client,
    config: ResolverConfig,
}

impl HttpAuthBackend {
    /// Creates a backend with the given resolver configuration.
    pub fn new(config: ResolverConfig) -> Result<Self, CredentialError> {
        let http_client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CredentialError::AuthProvider(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Resolver configuration in use.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Exchanges an authorization code obtained by the consent flow.
    pub async fn exchange_code(
        &self,
        client: &OAuthClient,
        code: &str,
        redirect_uri: &str,
        scopes: &ScopeSet,
    ) -> Result<AuthorizedUser, CredentialError> {
        let response = self
            .token_request(
                &client.token_uri,
                &[
                    ("code", code),
                    ("client_id", &client.client_id),
                    ("client_secret", client.client_secret.expose_secret()),
                    ("redirect_uri", redirect_uri),
                    ("grant_type", "authorization_code"),
                ],
            )
            .await?;

        Ok(AuthorizedUser::from_token_response(
            response,
            client.token_uri.clone(),
            client.client_id.clone(),
            client.client_secret.clone(),
            scopes,
        ))
    }

    async fn token_request(
        &self,
        token_uri: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, CredentialError> {
        debug!(token_uri = %token_uri, "Requesting token");

        let response = self
            .http_client
            .post(token_uri)
            .form(form)
            .send()
            .await
            .map_err(|e| CredentialError::AuthProvider(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(CredentialError::AuthProvider(format!(
                "Token request failed with status {}: {}",
                status, text
            )));
        }

        response.json::<TokenResponse>().await.map_err(|e| {
            CredentialError::AuthProvider(format!("Failed to parse token response: {}", e))
        })
    }
}

#[async_trait]
impl AuthBackend for HttpAuthBackend {
    async fn refresh(&self, user: &AuthorizedUser) -> Result<AuthorizedUser, CredentialError> {
        let refresh_token = user.refresh_token.as_ref().ok_or_else(|| {
            CredentialError::AuthProvider("credential has no refresh token".to_string())
        })?;
        let client_id = user.client_id.as_deref().ok_or_else(|| {
            CredentialError::AuthProvider("credential has no client id".to_string())
        })?;
        let client_secret = user.client_secret.as_ref().ok_or_else(|| {
            CredentialError::AuthProvider("credential has no client secret".to_string())
        })?;
        let token_uri = user
            .token_uri
            .as_deref()
            .unwrap_or(self.config.token_url.as_str());

        let response = self
            .token_request(
                token_uri,
                &[
                    ("client_id", client_id),
                    ("client_secret", client_secret.expose_secret()),
                    ("refresh_token", refresh_token.expose_secret()),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;

        Ok(user.refreshed(response))
    }

    async fn exchange_service_account(
        &self,
        key: &ServiceAccountKey,
        scopes: &ScopeSet,
        subject: Option<&str>,
    ) -> Result<AccessToken, CredentialError> {
        let jwt = key
            .create_jwt(scopes, subject)
            .map_err(|e| CredentialError::InvalidKeyFormat(e.to_string()))?;

        let response = self
            .token_request(
                &key.token_uri,
                &[("grant_type", JWT_BEARER_GRANT), ("assertion", &jwt)],
            )
            .await?;

        let expires_at = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));

        Ok(AccessToken::new(
            response.access_token,
            response.token_type.unwrap_or_else(|| "Bearer".to_string()),
            expires_at,
            scopes.as_slice().to_vec(),
        ))
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, CredentialError> {
        debug!(url = %url, "Fetching remote credential file");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| CredentialError::AuthProvider(format!("Fetch of {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(CredentialError::AuthProvider(format!(
                "Fetch of {} failed with status {}",
                url,
                response.status()
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            CredentialError::AuthProvider(format!("Fetch of {} failed: {}", url, e))
        })?;

        Ok(bytes.to_vec())
    }

    async fn authorize_interactive(
        &self,
        secrets: &ClientSecrets,
        scopes: &ScopeSet,
    ) -> Result<AuthorizedUser, CredentialError> {
        InstalledFlow::new(secrets, scopes, &self.config).run(self).await
    }
}
