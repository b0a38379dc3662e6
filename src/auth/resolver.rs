//! Credential resolution.
//!
//! [`CredentialResolver::resolve_automatic`] walks a fixed priority chain:
//! cached file, then a remote pre-authorized file, then one silent refresh
//! of whichever of those was expired, and finally a service-account key.
//! The chain is driven by two pure functions, [`next_action`] and
//! [`ResolveState::after`], so each step can be tested in isolation. The
//! resolver holds no state between calls; everything is rebuilt from the
//! cache contents at the start of each resolution.

use super::{
    AuthBackend, AuthorizedUser, ClientSecrets, ClientSecretsSource, CredentialOrigin,
    CredentialStore, Credentials, FileCredentialStore, HttpAuthBackend, OAuthClient, ScopeSet,
    ServiceAccountKey, ServiceAccountKeySource,
};
use crate::config::{CredentialSources, ResolverConfig};
use super::credentials::CacheTarget;
use crate::errors::{CredentialError, DriveError, DriveResult};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where automatic resolution currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveState {
    /// No usable cached record.
    NoCache,
    /// Cached record present and valid.
    CacheFresh,
    /// Cached record present but expired.
    CacheExpired,
    /// Record fetched from the remote URL and valid.
    RemoteFetched,
    /// Record fetched from the remote URL but expired.
    RemoteExpired,
    /// Every user-credential source is exhausted.
    ServiceAccountFallback,
    /// A credential was produced.
    Resolved,
    /// Nothing worked.
    Failed,
}

impl ResolveState {
    /// True for `Resolved` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, ResolveState::Resolved | ResolveState::Failed)
    }

    /// Transition taken after running the action chosen for this state.
    pub fn after(self, outcome: StepOutcome) -> ResolveState {
        use ResolveState::*;

        match (self, outcome) {
            (Resolved, _) => Resolved,
            (Failed, _) => Failed,
            (CacheFresh | RemoteFetched, _) => Resolved,
            (CacheExpired | RemoteExpired | ServiceAccountFallback, StepOutcome::Succeeded) => {
                Resolved
            }
            (CacheExpired, _) => NoCache,
            (RemoteExpired, _) => ServiceAccountFallback,
            (NoCache, StepOutcome::Fetched { expired: false }) => RemoteFetched,
            (NoCache, StepOutcome::Fetched { expired: true }) => RemoteExpired,
            (NoCache, _) => ServiceAccountFallback,
            (ServiceAccountFallback, _) => Failed,
        }
    }
}

/// Which sources are still worth trying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Availability {
    /// A remote URL was given and has not been fetched yet.
    pub remote_pending: bool,
    /// A service-account key was given.
    pub service_account: bool,
}

/// What the resolver does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveAction {
    /// Use the current record as is.
    Accept,
    /// Redeem the current record's refresh token once.
    Refresh,
    /// Download the remote record.
    FetchRemote,
    /// Skip to the service-account step.
    FallBack,
    /// Exchange the service-account key.
    ServiceAccount,
    /// Give up.
    Fail,
    /// Terminal state reached.
    Stop,
}

/// Result of running one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The action produced a credential.
    Succeeded,
    /// The action failed, or there was nothing to do.
    Failed,
    /// A remote record was fetched and stored.
    Fetched {
        /// Whether the fetched record is already expired.
        expired: bool,
    },
}

/// Decision table for automatic resolution.
pub fn next_action(state: ResolveState, available: Availability) -> ResolveAction {
    match state {
        ResolveState::CacheFresh | ResolveState::RemoteFetched => ResolveAction::Accept,
        ResolveState::CacheExpired | ResolveState::RemoteExpired => ResolveAction::Refresh,
        ResolveState::NoCache if available.remote_pending => ResolveAction::FetchRemote,
        ResolveState::NoCache => ResolveAction::FallBack,
        ResolveState::ServiceAccountFallback if available.service_account => {
            ResolveAction::ServiceAccount
        }
        ResolveState::ServiceAccountFallback => ResolveAction::Fail,
        ResolveState::Resolved | ResolveState::Failed => ResolveAction::Stop,
    }
}

/// True when the handle's token has expired. Handles without expiry never expire.
pub fn check_expiry(credentials: &Credentials) -> bool {
    credentials.is_expired()
}

/// Turns credential sources into a [`Credentials`] handle.
pub struct CredentialResolver {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn CredentialStore>,
    config: ResolverConfig,
}

impl CredentialResolver {
    /// Resolver with the default configuration, talking to Google over HTTPS
    /// and caching on the local file system.
    pub fn new() -> DriveResult<Self> {
        Self::with_config(ResolverConfig::default())
    }

    /// Resolver with a custom configuration.
    pub fn with_config(config: ResolverConfig) -> DriveResult<Self> {
        let backend = HttpAuthBackend::new(config.clone())?;
        Ok(Self::with_parts(
            Arc::new(backend),
            Arc::new(FileCredentialStore::new()),
            config,
        ))
    }

    /// Resolver over explicit backend and store implementations.
    pub fn with_parts(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn CredentialStore>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            backend,
            store,
            config,
        }
    }

    /// Resolver configuration in use.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Exchanges a service-account key for an access token.
    ///
    /// The returned handle is bound to exactly `scopes`.
    pub async fn resolve_from_service_account(
        &self,
        source: &ServiceAccountKeySource,
        scopes: &ScopeSet,
    ) -> DriveResult<Credentials> {
        let key = ServiceAccountKey::load(source).await?;
        let subject = self.config.service_account_subject.clone();

        let token = self
            .backend
            .exchange_service_account(&key, scopes, subject.as_deref())
            .await?;

        info!(client_email = %key.client_email, "Authenticated with service account");

        Ok(Credentials::from_service_account(
            token,
            scopes.clone(),
            key,
            subject,
            Arc::clone(&self.backend),
        ))
    }

    /// Resolves user credentials for an OAuth client, using the cache at
    /// `cache_location` when possible and the consent flow otherwise.
    ///
    /// The secrets file is read only when the cached record lacks client
    /// fields for a refresh, or when consent is needed.
    ///
    /// The consent flow waits for the browser redirect without a timeout.
    pub async fn resolve_from_client_secrets(
        &self,
        source: &ClientSecretsSource,
        scopes: &ScopeSet,
        cache_location: &Path,
    ) -> DriveResult<Credentials> {
        match self.load_cache(cache_location).await {
            Some(user) if !user.is_expired() => {
                info!(path = %cache_location.display(), "Loaded cached credentials");
                let scopes = user.scope_set(scopes);
                return Ok(self.user_credentials(
                    user,
                    scopes,
                    CredentialOrigin::Cache,
                    Some(cache_location),
                ));
            }
            Some(user) if user.can_refresh() => {
                info!("Cached credentials expired, refreshing");
                // The client secrets only fill in what the record lacks.
                let secrets = if user.client_id.is_none() || user.client_secret.is_none() {
                    Some(ClientSecrets::load(source).await?)
                } else {
                    None
                };
                return self
                    .refresh_user(
                        user,
                        secrets.as_ref().map(ClientSecrets::client),
                        Some(cache_location),
                        scopes,
                    )
                    .await;
            }
            Some(_) => info!("Cached credentials expired and cannot be refreshed"),
            None => info!("No cached credentials found"),
        }

        if !self.config.interactive {
            return Err(CredentialError::InteractiveFlowUnavailable(
                "consent is required but the resolver is non-interactive".to_string(),
            )
            .into());
        }

        let secrets = ClientSecrets::load(source).await?;
        let user = self.backend.authorize_interactive(&secrets, scopes).await?;
        self.persist(cache_location, &user).await?;
        info!(path = %cache_location.display(), "Saved new credentials");

        let scopes = user.scope_set(scopes);
        Ok(self.user_credentials(
            user,
            scopes,
            CredentialOrigin::Interactive,
            Some(cache_location),
        ))
    }

    /// Tries every configured source in priority order.
    ///
    /// Refresh and fetch failures are logged and skipped. A service-account
    /// failure is returned as is; if no service account was given the
    /// result is [`CredentialError::NoCredentialSourceAvailable`].
    pub async fn resolve_automatic(&self, sources: &CredentialSources) -> DriveResult<Credentials> {
        let scopes = &sources.scopes;
        let cache_location = sources.cache_location.as_deref();
        let secrets = self.load_refresh_client(sources).await;
        let client = secrets.as_ref().map(ClientSecrets::client);

        let mut available = Availability {
            remote_pending: sources.remote_cache_url.is_some(),
            service_account: sources.service_account_key.is_some(),
        };

        let mut record: Option<AuthorizedUser> = None;
        let mut state = match cache_location {
            Some(path) => match self.load_cache(path).await {
                Some(user) => {
                    let expired = user.is_expired();
                    record = Some(user);
                    if expired {
                        info!("Cached credentials expired");
                        ResolveState::CacheExpired
                    } else {
                        ResolveState::CacheFresh
                    }
                }
                None => ResolveState::NoCache,
            },
            None => ResolveState::NoCache,
        };

        let mut resolved: Option<Credentials> = None;
        let mut surfaced: Option<DriveError> = None;
        let mut last_error: Option<String> = None;

        loop {
            let action = next_action(state, available);
            debug!(?state, ?action, "Credential resolution step");

            let outcome = match action {
                ResolveAction::Stop => break,
                ResolveAction::Accept => match record.take() {
                    Some(user) => {
                        let origin = if state == ResolveState::CacheFresh {
                            info!("Loaded cached credentials");
                            CredentialOrigin::Cache
                        } else {
                            info!("Using fetched credentials");
                            CredentialOrigin::Remote
                        };
                        let bound = user.scope_set(scopes);
                        resolved = Some(self.user_credentials(user, bound, origin, cache_location));
                        StepOutcome::Succeeded
                    }
                    None => StepOutcome::Failed,
                },
                ResolveAction::Refresh => match record.take() {
                    Some(user) => match self.refresh_user(user, client, cache_location, scopes).await {
                        Ok(credentials) => {
                            resolved = Some(credentials);
                            StepOutcome::Succeeded
                        }
                        Err(e) => {
                            warn!(error = %e, "Silent refresh failed");
                            last_error = Some(e.to_string());
                            StepOutcome::Failed
                        }
                    },
                    None => StepOutcome::Failed,
                },
                ResolveAction::FetchRemote => {
                    available.remote_pending = false;
                    let url = sources.remote_cache_url.as_deref().unwrap_or_default();
                    match self.fetch_remote_record(url, cache_location).await {
                        Ok(user) => {
                            info!(url = %url, "Fetched remote credentials");
                            let expired = user.is_expired();
                            record = Some(user);
                            StepOutcome::Fetched { expired }
                        }
                        Err(e) => {
                            warn!(url = %url, error = %e, "Fetching remote credentials failed");
                            last_error = Some(e.to_string());
                            StepOutcome::Failed
                        }
                    }
                }
                ResolveAction::FallBack => {
                    debug!("No user credential source left");
                    StepOutcome::Failed
                }
                ResolveAction::ServiceAccount => match &sources.service_account_key {
                    Some(key) => {
                        info!("Falling back to service account");
                        match self.resolve_from_service_account(key, scopes).await {
                            Ok(credentials) => {
                                resolved = Some(credentials);
                                StepOutcome::Succeeded
                            }
                            Err(e) => {
                                warn!(error = %e, "Service account resolution failed");
                                surfaced = Some(e);
                                StepOutcome::Failed
                            }
                        }
                    }
                    None => StepOutcome::Failed,
                },
                ResolveAction::Fail => {
                    warn!("No credential source available");
                    StepOutcome::Failed
                }
            };

            state = state.after(outcome);
        }

        match resolved {
            Some(credentials) => Ok(credentials),
            None => Err(surfaced.unwrap_or_else(|| {
                CredentialError::NoCredentialSourceAvailable { last_error }.into()
            })),
        }
    }

    /// Downloads a hosted file (client secrets, credential cache or key) to `destination`.
    pub async fn download_raw(&self, url: &str, destination: &Path) -> DriveResult<()> {
        let bytes = self.backend.fetch_remote(url).await?;
        self.store.write(destination, &bytes).await?;
        info!(url = %url, path = %destination.display(), bytes = bytes.len(), "Downloaded file");
        Ok(())
    }

    fn user_credentials(
        &self,
        user: AuthorizedUser,
        scopes: ScopeSet,
        origin: CredentialOrigin,
        cache_location: Option<&Path>,
    ) -> Credentials {
        let cache = cache_location.map(|location| CacheTarget {
            store: Arc::clone(&self.store),
            location: location.to_path_buf(),
        });
        Credentials::from_user(user, scopes, origin, Arc::clone(&self.backend), cache)
    }

    async fn load_cache(&self, location: &Path) -> Option<AuthorizedUser> {
        let bytes = match self.store.read(location).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Cannot read credential cache");
                return None;
            }
        };

        let user = AuthorizedUser::from_slice(&bytes);
        if user.is_none() {
            warn!(path = %location.display(), "Ignoring invalid credential cache");
        }
        user
    }

    async fn load_refresh_client(&self, sources: &CredentialSources) -> Option<ClientSecrets> {
        let source = sources.client_secrets.as_ref()?;
        match ClientSecrets::load(source).await {
            Ok(secrets) => Some(secrets),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable client secrets");
                None
            }
        }
    }

    async fn persist(&self, location: &Path, user: &AuthorizedUser) -> DriveResult<()> {
        let json = user.to_json()?;
        self.store.write(location, &json).await?;
        Ok(())
    }

    async fn refresh_user(
        &self,
        mut user: AuthorizedUser,
        client: Option<&OAuthClient>,
        cache_location: Option<&Path>,
        scopes: &ScopeSet,
    ) -> DriveResult<Credentials> {
        if !user.can_refresh() {
            return Err(CredentialError::AuthProvider(
                "credential has no refresh token".to_string(),
            )
            .into());
        }

        if let Some(client) = client {
            if user.client_id.is_none() {
                user.client_id = Some(client.client_id.clone());
            }
            if user.client_secret.is_none() {
                user.client_secret = Some(client.client_secret.clone());
            }
            if user.token_uri.is_none() {
                user.token_uri = Some(client.token_uri.clone());
            }
        }

        let refreshed = self.backend.refresh(&user).await?;
        if let Some(path) = cache_location {
            self.persist(path, &refreshed).await?;
        }
        info!("Refreshed credentials");

        let bound = refreshed.scope_set(scopes);
        Ok(self.user_credentials(refreshed, bound, CredentialOrigin::Refreshed, cache_location))
    }

    async fn fetch_remote_record(
        &self,
        url: &str,
        cache_location: Option<&Path>,
    ) -> DriveResult<AuthorizedUser> {
        let mut bytes = self.backend.fetch_remote(url).await?;

        if let Some(path) = cache_location {
            self.store.write(path, &bytes).await?;
            if let Some(stored) = self.store.read(path).await? {
                bytes = stored;
            }
        }

        AuthorizedUser::from_slice(&bytes).ok_or_else(|| {
            CredentialError::InvalidKeyFormat(format!(
                "{} did not return an authorized-user record",
                url
            ))
            .into()
        })
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
