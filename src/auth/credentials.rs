//! The resolved authorization handle.

use super::{
    AccessToken, AuthBackend, AuthProvider, AuthorizedUser, CredentialStore, ScopeSet,
    ServiceAccountKey,
};
use crate::errors::AuthenticationError;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// How a [`Credentials`] value was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialOrigin {
    /// Loaded from the cache file and still valid.
    Cache,
    /// Cache (or fetched file) was expired and a refresh token was redeemed.
    Refreshed,
    /// Fetched from a remote URL and still valid.
    Remote,
    /// Produced by the installed-app consent flow.
    Interactive,
    /// Issued for a service account.
    ServiceAccount,
    /// Built directly from an access token.
    Static,
}

/// Cache file a renewed user record is written back to.
pub(crate) struct CacheTarget {
    pub(crate) store: Arc<dyn CredentialStore>,
    pub(crate) location: PathBuf,
}

enum Renewal {
    User {
        backend: Arc<dyn AuthBackend>,
        user: RwLock<AuthorizedUser>,
        cache: Option<CacheTarget>,
    },
    ServiceAccount {
        backend: Arc<dyn AuthBackend>,
        key: ServiceAccountKey,
        subject: Option<String>,
    },
}

struct Inner {
    token: RwLock<AccessToken>,
    scopes: ScopeSet,
    origin: CredentialOrigin,
    renewal: Option<Renewal>,
}

/// A resolved credential with its bound scopes.
///
/// Cheap to clone; clones share the token. When the token approaches expiry
/// and the credential carries a refresh token or service-account key, the
/// next [`AuthProvider::get_access_token`] call renews it. A renewed user
/// record is also written back to the cache file it was resolved with.
#[derive(Clone)]
pub struct Credentials {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("origin", &self.inner.origin)
            .field("scopes", &self.inner.scopes)
            .field("expired", &self.is_expired())
            .finish()
    }
}

impl Credentials {
    /// Wraps a bare access token with no way to renew it.
    pub fn from_access_token(token: AccessToken, scopes: ScopeSet) -> Self {
        Self::build(token, scopes, CredentialOrigin::Static, None)
    }

    pub(crate) fn from_user(
        user: AuthorizedUser,
        scopes: ScopeSet,
        origin: CredentialOrigin,
        backend: Arc<dyn AuthBackend>,
        cache: Option<CacheTarget>,
    ) -> Self {
        let token = user.access_token();
        let renewal = Renewal::User {
            backend,
            user: RwLock::new(user),
            cache,
        };
        Self::build(token, scopes, origin, Some(renewal))
    }

    pub(crate) fn from_service_account(
        token: AccessToken,
        scopes: ScopeSet,
        key: ServiceAccountKey,
        subject: Option<String>,
        backend: Arc<dyn AuthBackend>,
    ) -> Self {
        let renewal = Renewal::ServiceAccount {
            backend,
            key,
            subject,
        };
        Self::build(token, scopes, CredentialOrigin::ServiceAccount, Some(renewal))
    }

    fn build(
        token: AccessToken,
        scopes: ScopeSet,
        origin: CredentialOrigin,
        renewal: Option<Renewal>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                token: RwLock::new(token),
                scopes,
                origin,
                renewal,
            }),
        }
    }

    /// Scopes this credential was resolved for.
    pub fn scopes(&self) -> &ScopeSet {
        &self.inner.scopes
    }

    /// Where the credential came from.
    pub fn origin(&self) -> CredentialOrigin {
        self.inner.origin
    }

    /// Snapshot of the current access token.
    pub fn token(&self) -> AccessToken {
        self.inner
            .token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Current authorized-user record, for credentials backed by one.
    pub fn authorized_user(&self) -> Option<AuthorizedUser> {
        match &self.inner.renewal {
            Some(Renewal::User { user, .. }) => {
                Some(user.read().unwrap_or_else(|e| e.into_inner()).clone())
            }
            _ => None,
        }
    }

    /// True when the token's expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.token().is_expired()
    }

    fn store_token(&self, token: AccessToken) {
        *self.inner.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }
}

#[async_trait]
impl AuthProvider for Credentials {
    async fn get_access_token(&self) -> Result<AccessToken, AuthenticationError> {
        let token = self.token();
        if !token.needs_refresh() {
            return Ok(token);
        }

        if self.inner.renewal.is_some() {
            return self.refresh_token().await;
        }

        if token.is_expired() {
            return Err(AuthenticationError::ExpiredToken(
                "access token expired and cannot be renewed".to_string(),
            ));
        }
        Ok(token)
    }

    async fn refresh_token(&self) -> Result<AccessToken, AuthenticationError> {
        match &self.inner.renewal {
            Some(Renewal::User {
                backend,
                user,
                cache,
            }) => {
                let current = user.read().unwrap_or_else(|e| e.into_inner()).clone();
                let next = backend
                    .refresh(&current)
                    .await
                    .map_err(|e| AuthenticationError::RefreshFailed(e.to_string()))?;
                let token = next.access_token();
                if let Some(cache) = cache {
                    write_back(cache, &next).await;
                }
                *user.write().unwrap_or_else(|e| e.into_inner()) = next;
                self.store_token(token.clone());
                debug!("Renewed user access token");
                Ok(token)
            }
            Some(Renewal::ServiceAccount {
                backend,
                key,
                subject,
            }) => {
                let token = backend
                    .exchange_service_account(key, &self.inner.scopes, subject.as_deref())
                    .await
                    .map_err(|e| AuthenticationError::RefreshFailed(e.to_string()))?;
                self.store_token(token.clone());
                debug!("Renewed service account access token");
                Ok(token)
            }
            None => Err(AuthenticationError::RefreshFailed(
                "credential has no refresh material".to_string(),
            )),
        }
    }

    fn is_expired(&self) -> bool {
        Credentials::is_expired(self)
    }
}

// A failed write keeps the renewed token in memory; the next process refreshes again.
async fn write_back(cache: &CacheTarget, user: &AuthorizedUser) {
    let result = match user.to_json() {
        Ok(json) => cache
            .store
            .write(&cache.location, &json)
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    match result {
        Ok(()) => debug!(path = %cache.location.display(), "Saved renewed credentials"),
        Err(e) => warn!(path = %cache.location.display(), error = %e, "Cannot save renewed credentials"),
    }
}
