//! Simplified Google Drive operations with automatic credential resolution.
//!
//! Two layers:
//!
//! - **Credential resolution** ([`auth::CredentialResolver`]): builds a
//!   usable [`Credentials`] handle from a cached token file, a remotely hosted
//!   token file, an OAuth client-secrets file (installed-app consent flow) or
//!   a service-account key, falling back between them in a fixed order.
//! - **Drive operations** ([`SimpleDrive`]): create folders, upload, list,
//!   copy, move, rename, delete, share, check quota and hand files to another
//!   account, each behind one short call. [`DriveClient`] exposes the typed
//!   Drive v3 services underneath.
//!
//! A small [`chat::ChatWebhook`] posts text to Google Chat incoming webhooks.
//!
//! # Example
//!
//! ```no_run
//! use simple_google_drive::auth::{ClientSecretsSource, CredentialResolver, ServiceAccountKeySource};
//! use simple_google_drive::config::CredentialSources;
//! use simple_google_drive::{CopyOptions, SimpleDrive};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sources = CredentialSources::builder()
//!     .client_secrets(ClientSecretsSource::path("client_secrets.json"))
//!     .cache_location("token.json")
//!     .service_account_key(ServiceAccountKeySource::path("service_account.json"))
//!     .build();
//!
//! let credentials = CredentialResolver::new()?.resolve_automatic(&sources).await?;
//! let drive = SimpleDrive::new(credentials)?;
//!
//! let folder = drive.create_folder("Reports", None).await?;
//! let file = drive.upload_file("q3.pdf", Some(&folder), None).await?;
//! drive
//!     .copy_file(&file.id, &CopyOptions::default().prefix("Archived"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod chat;
pub mod client;
pub mod config;
pub mod drive;
pub mod errors;
pub mod observability;
pub mod services;
pub mod transport;
pub mod types;

#[cfg(test)]
mod mocks;

pub use auth::{AccessToken, AuthProvider, CredentialResolver, Credentials, ScopeSet};
pub use client::{DriveClient, DriveClientBuilder};
pub use config::{CredentialSources, DriveConfig, DriveConfigBuilder, ResolverConfig};
pub use drive::{CopyOptions, PermissionTarget, SimpleDrive, TransferRecord};
pub use errors::{DriveError, DriveResult};
pub use types::{DriveFile, FileList, Permission, PermissionList, ShareRole, StorageQuota};

/// Commonly used types in one import.
///
/// ```no_run
/// use simple_google_drive::prelude::*;
/// ```
pub mod prelude {
    pub use crate::auth::{
        AccessToken, AuthProvider, CredentialResolver, Credentials, ScopeSet,
    };
    pub use crate::chat::ChatWebhook;
    pub use crate::client::DriveClient;
    pub use crate::config::{CredentialSources, DriveConfig, ResolverConfig};
    pub use crate::drive::{CopyOptions, PermissionTarget, SimpleDrive, TransferRecord};
    pub use crate::errors::{DriveError, DriveResult};
    pub use crate::services::{AboutService, FilesService, PermissionsService, ResumableUploadSession};
    pub use crate::types::{
        CopyFileRequest, CreateFileRequest, CreatePermissionRequest, DriveFile, FileList,
        ListFilesParams, Permission, ShareRole, StorageQuota, UpdateFileParams, UpdateFileRequest,
    };
}
