use crate::auth::{ClientSecretsSource, ScopeSet, ServiceAccountKeySource, TOKEN_URL};
use std::path::PathBuf;
use std::time::Duration;

/// Behaviour of the credential resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Token endpoint used when a cached record does not name one.
    pub token_url: String,

    /// Whether the consent step may be launched. Set to `false` on servers.
    pub interactive: bool,

    /// Try to open the consent URL in the default browser.
    pub open_browser: bool,

    /// Loopback host for the consent redirect listener.
    pub callback_host: String,

    /// Port for the listener; `0` picks a free port.
    pub callback_port: u16,

    /// Timeout for token endpoint and remote fetch requests.
    pub request_timeout: Duration,

    /// User to impersonate with service accounts (domain-wide delegation).
    pub service_account_subject: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            token_url: TOKEN_URL.to_string(),
            interactive: true,
            open_browser: true,
            callback_host: "127.0.0.1".to_string(),
            callback_port: 0,
            request_timeout: Duration::from_secs(30),
            service_account_subject: None,
        }
    }
}

impl ResolverConfig {
    /// Reads overrides from `SIMPLE_DRIVE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(token_url) = lookup("SIMPLE_DRIVE_TOKEN_URL") {
            config.token_url = token_url;
        }
        if let Some(flag) = lookup("SIMPLE_DRIVE_INTERACTIVE").and_then(|v| parse_bool(&v)) {
            config.interactive = flag;
        }
        if let Some(flag) = lookup("SIMPLE_DRIVE_OPEN_BROWSER").and_then(|v| parse_bool(&v)) {
            config.open_browser = flag;
        }
        if let Some(port) = lookup("SIMPLE_DRIVE_CALLBACK_PORT").and_then(|v| v.parse().ok()) {
            config.callback_port = port;
        }
        if let Some(secs) = lookup("SIMPLE_DRIVE_TIMEOUT").and_then(|v| v.parse::<u64>().ok()) {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(subject) = lookup("SIMPLE_DRIVE_SUBJECT") {
            config.service_account_subject = Some(subject);
        }

        config
    }

    /// Disables the consent step.
    pub fn non_interactive(mut self) -> Self {
        self.interactive = false;
        self
    }

    /// Sets the fallback token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Sets the delegated subject for service accounts.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.service_account_subject = Some(subject.into());
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Inputs for automatic resolution. Every source is optional.
#[derive(Debug, Clone, Default)]
pub struct CredentialSources {
    /// OAuth client secrets, used to fill in client fields missing from the cache.
    pub client_secrets: Option<ClientSecretsSource>,

    /// Where the authorized-user record is cached.
    pub cache_location: Option<PathBuf>,

    /// URL of a pre-authorized credential file.
    pub remote_cache_url: Option<String>,

    /// Last-resort service-account key.
    pub service_account_key: Option<ServiceAccountKeySource>,

    /// Scopes to request.
    pub scopes: ScopeSet,
}

impl CredentialSources {
    /// Creates a new builder.
    pub fn builder() -> CredentialSourcesBuilder {
        CredentialSourcesBuilder::default()
    }

    /// Reads sources from environment variables:
    /// `SIMPLE_DRIVE_CLIENT_SECRETS`, `SIMPLE_DRIVE_CREDENTIALS_FILE`,
    /// `SIMPLE_DRIVE_CREDENTIALS_URL`, `SIMPLE_DRIVE_SERVICE_ACCOUNT` and
    /// `SIMPLE_DRIVE_SCOPES` (`drive`, `drive+documents`, or a space separated list).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let scopes = match present("SIMPLE_DRIVE_SCOPES").as_deref().map(str::trim) {
            None | Some("drive") => ScopeSet::drive(),
            Some("drive+documents") => ScopeSet::drive_documents(),
            Some(other) => ScopeSet::from_space_delimited(other),
        };

        Self {
            client_secrets: present("SIMPLE_DRIVE_CLIENT_SECRETS").map(ClientSecretsSource::path),
            cache_location: present("SIMPLE_DRIVE_CREDENTIALS_FILE").map(PathBuf::from),
            remote_cache_url: present("SIMPLE_DRIVE_CREDENTIALS_URL"),
            service_account_key: present("SIMPLE_DRIVE_SERVICE_ACCOUNT")
                .map(ServiceAccountKeySource::path),
            scopes,
        }
    }
}

/// Builder for CredentialSources.
#[derive(Debug, Default)]
pub struct CredentialSourcesBuilder {
    sources: CredentialSources,
}

impl CredentialSourcesBuilder {
    /// Sets the client secrets.
    pub fn client_secrets(mut self, source: ClientSecretsSource) -> Self {
        self.sources.client_secrets = Some(source);
        self
    }

    /// Sets the cache file location.
    pub fn cache_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.cache_location = Some(path.into());
        self
    }

    /// Sets the remote credential URL.
    pub fn remote_cache_url(mut self, url: impl Into<String>) -> Self {
        self.sources.remote_cache_url = Some(url.into());
        self
    }

    /// Sets the service-account key.
    pub fn service_account_key(mut self, key: impl Into<ServiceAccountKeySource>) -> Self {
        self.sources.service_account_key = Some(key.into());
        self
    }

    /// Sets the scopes.
    pub fn scopes(mut self, scopes: ScopeSet) -> Self {
        self.sources.scopes = scopes;
        self
    }

    /// Builds the sources.
    pub fn build(self) -> CredentialSources {
        self.sources
    }
}
