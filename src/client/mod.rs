//! Google Drive API client.

use crate::auth::AuthProvider;
use crate::config::{DriveConfig, DriveConfigBuilder};
use crate::errors::{DriveError, DriveResult};
use crate::services::{AboutService, FilesService, PermissionsService};
use crate::transport::{HttpTransport, ReqwestTransport};
use std::sync::Arc;

mod executor;
pub use executor::{map_error_response, RequestExecutor};
pub(crate) use executor::path_segment;

/// Typed Drive v3 client.
///
/// Cheap to clone; clones share the transport and the auth provider.
///
/// # Example
///
/// ```no_run
/// use simple_google_drive::auth::CredentialResolver;
/// use simple_google_drive::config::CredentialSources;
/// use simple_google_drive::DriveClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = CredentialResolver::new()?
///     .resolve_automatic(&CredentialSources::from_env())
///     .await?;
///
/// let client = DriveClient::builder().auth_provider(credentials).build()?;
/// let quota = client.about().get_storage_quota().await?;
/// println!("{:?}", quota.usage);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DriveClient {
    executor: Arc<RequestExecutor>,
}

impl DriveClient {
    /// Creates a client that talks HTTPS through `reqwest`.
    pub fn new(config: DriveConfig) -> DriveResult<Self> {
        config.validate()?;

        let transport = ReqwestTransport::with_timeouts(config.timeout, config.connect_timeout)
            .map_err(|e| DriveError::configuration(format!("Failed to create transport: {}", e)))?;

        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client over a custom transport.
    pub fn with_transport(config: DriveConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            executor: Arc::new(RequestExecutor::new(config, transport)),
        }
    }

    /// Creates a new client builder.
    pub fn builder() -> DriveClientBuilder {
        DriveClientBuilder::new()
    }

    /// Files, folders and uploads.
    pub fn files(&self) -> FilesService {
        FilesService::new(Arc::clone(&self.executor))
    }

    /// Sharing.
    pub fn permissions(&self) -> PermissionsService {
        PermissionsService::new(Arc::clone(&self.executor))
    }

    /// Account and quota information.
    pub fn about(&self) -> AboutService {
        AboutService::new(Arc::clone(&self.executor))
    }

    /// Gets the configuration.
    pub fn config(&self) -> &DriveConfig {
        self.executor.config()
    }

    /// Gets the request executor.
    pub fn executor(&self) -> &Arc<RequestExecutor> {
        &self.executor
    }
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("config", self.config())
            .finish()
    }
}

/// Builder for DriveClient.
pub struct DriveClientBuilder {
    config_builder: DriveConfigBuilder,
}

impl DriveClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: DriveConfig::builder(),
        }
    }

    /// Sets the authentication provider.
    pub fn auth_provider<A: AuthProvider + 'static>(mut self, provider: A) -> Self {
        self.config_builder = self.config_builder.auth_provider(provider);
        self
    }

    /// Sets the authentication provider from an Arc.
    pub fn auth_provider_arc(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.config_builder = self.config_builder.auth_provider_arc(provider);
        self
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets the upload URL.
    pub fn upload_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.upload_url(url);
        self
    }

    /// Sets the timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.connect_timeout(timeout);
        self
    }

    /// Sets the user agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Sets the upload chunk size.
    pub fn upload_chunk_size(mut self, size: usize) -> Self {
        self.config_builder = self.config_builder.upload_chunk_size(size);
        self
    }

    /// Sets the size above which uploads are resumable.
    pub fn multipart_threshold(mut self, bytes: u64) -> Self {
        self.config_builder = self.config_builder.multipart_threshold(bytes);
        self
    }

    /// Permits plain-HTTP endpoints.
    pub fn allow_insecure(mut self, allow: bool) -> Self {
        self.config_builder = self.config_builder.allow_insecure(allow);
        self
    }

    /// Builds the client.
    pub fn build(self) -> DriveResult<DriveClient> {
        let config = self.config_builder.build()?;
        DriveClient::new(config)
    }
}

impl Default for DriveClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
