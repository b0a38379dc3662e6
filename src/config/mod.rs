//! Configuration for the Drive client and the credential resolver.

mod credentials;

pub use credentials::{CredentialSources, CredentialSourcesBuilder, ResolverConfig};

use crate::auth::AuthProvider;
use crate::errors::{ConfigurationError, DriveError, DriveResult};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default Drive API base URL.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3/";

/// Default Drive upload base URL.
pub const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/";

/// Granularity required by the resumable upload protocol.
pub const UPLOAD_CHUNK_GRANULARITY: usize = 256 * 1024;

/// Configuration for the Drive client.
#[derive(Clone)]
pub struct DriveConfig {
    /// Authentication provider.
    pub auth_provider: Arc<dyn AuthProvider>,

    /// Base URL for the API. Always ends with `/`.
    pub base_url: Url,

    /// Upload URL for the API. Always ends with `/`.
    pub upload_url: Url,

    /// Default timeout for requests.
    pub timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Chunk size for resumable uploads (must be multiple of 256KB).
    pub upload_chunk_size: usize,

    /// Files up to this size use a single multipart request.
    pub multipart_threshold: u64,

    /// User agent string.
    pub user_agent: String,

    /// Accept plain-HTTP endpoints (local test servers only).
    pub allow_insecure: bool,
}

impl std::fmt::Debug for DriveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveConfig")
            .field("base_url", &self.base_url.as_str())
            .field("upload_url", &self.upload_url.as_str())
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("upload_chunk_size", &self.upload_chunk_size)
            .field("multipart_threshold", &self.multipart_threshold)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl DriveConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> DriveConfigBuilder {
        DriveConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DriveResult<()> {
        if self.upload_chunk_size == 0 || self.upload_chunk_size % UPLOAD_CHUNK_GRANULARITY != 0 {
            return Err(DriveError::Configuration(
                ConfigurationError::InvalidConfiguration(
                    "Upload chunk size must be a positive multiple of 256KB".to_string(),
                ),
            ));
        }

        if self.allow_insecure {
            return Ok(());
        }

        if self.base_url.scheme() != "https" {
            return Err(DriveError::Configuration(
                ConfigurationError::InvalidConfiguration("Base URL must use HTTPS".to_string()),
            ));
        }

        if self.upload_url.scheme() != "https" {
            return Err(DriveError::Configuration(
                ConfigurationError::InvalidConfiguration("Upload URL must use HTTPS".to_string()),
            ));
        }

        Ok(())
    }
}

/// Builder for DriveConfig.
pub struct DriveConfigBuilder {
    auth_provider: Option<Arc<dyn AuthProvider>>,
    base_url: Option<String>,
    upload_url: Option<String>,
    timeout: Duration,
    connect_timeout: Duration,
    upload_chunk_size: usize,
    multipart_threshold: u64,
    user_agent: Option<String>,
    allow_insecure: bool,
}

impl DriveConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            auth_provider: None,
            base_url: None,
            upload_url: None,
            timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(30),
            upload_chunk_size: 8 * 1024 * 1024, // 8MB
            multipart_threshold: 5 * 1024 * 1024,
            user_agent: None,
            allow_insecure: false,
        }
    }

    /// Sets the authentication provider.
    pub fn auth_provider<A: AuthProvider + 'static>(mut self, provider: A) -> Self {
        self.auth_provider = Some(Arc::new(provider));
        self
    }

    /// Sets the authentication provider from an Arc.
    pub fn auth_provider_arc(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth_provider = Some(provider);
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the upload URL.
    pub fn upload_url(mut self, url: impl Into<String>) -> Self {
        self.upload_url = Some(url.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the upload chunk size (must be multiple of 256KB).
    pub fn upload_chunk_size(mut self, size: usize) -> Self {
        self.upload_chunk_size = size;
        self
    }

    /// Sets the size above which uploads switch to a resumable session.
    pub fn multipart_threshold(mut self, bytes: u64) -> Self {
        self.multipart_threshold = bytes;
        self
    }

    /// Sets the user agent string.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Permits plain-HTTP endpoints. Only meant for local test servers.
    pub fn allow_insecure(mut self, allow: bool) -> Self {
        self.allow_insecure = allow;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> DriveResult<DriveConfig> {
        let auth_provider = self.auth_provider.ok_or_else(|| {
            DriveError::Configuration(ConfigurationError::MissingCredentials(
                "Authentication provider is required".to_string(),
            ))
        })?;

        let base_url = parse_base(self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL))?;
        let upload_url = parse_base(self.upload_url.as_deref().unwrap_or(DEFAULT_UPLOAD_URL))?;

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("simple-google-drive/{}", env!("CARGO_PKG_VERSION")));

        let config = DriveConfig {
            auth_provider,
            base_url,
            upload_url,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
            upload_chunk_size: self.upload_chunk_size,
            multipart_threshold: self.multipart_threshold,
            user_agent,
            allow_insecure: self.allow_insecure,
        };

        config.validate()?;

        Ok(config)
    }
}

impl Default for DriveConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses a base URL and makes sure relative joins keep its last path segment.
fn parse_base(raw: &str) -> DriveResult<Url> {
    let mut url = Url::parse(raw).map_err(|e| {
        DriveError::Configuration(ConfigurationError::InvalidConfiguration(format!(
            "Invalid URL {}: {}",
            raw, e
        )))
    })?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
