//! Simplified Drive operations.
//!
//! [`SimpleDrive`] wraps a [`DriveClient`] with one method per everyday task.
//! Every method performs a fixed, small number of round trips in sequence and
//! returns Drive's resource as-is. Nothing is retried or cached.

use crate::auth::AuthProvider;
use crate::client::DriveClient;
use crate::errors::{DriveError, DriveResult};
use crate::types::{
    CopyFileRequest, CreateFileRequest, CreatePermissionRequest, DriveFile, ListFilesParams,
    ShareRole, StorageQuota, UpdateFileParams, UpdateFileRequest,
};
use bytes::Bytes;
use mime::Mime;
use serde::Serialize;
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::info;

/// Fields requested for every file returned by the facade.
const FILE_FIELDS: &str = "id, name, mimeType, parents, owners";

const LIST_FIELDS: &str = "nextPageToken, files(id, name, mimeType, parents, owners)";

const LIST_PAGE_SIZE: u32 = 1000;

/// How [`SimpleDrive::copy_file`] names and places the copy.
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Keep the source name (with optional prefix and suffix). When false the
    /// copy is named `Copy of <name>` and prefix/suffix are ignored.
    pub same_name: bool,

    /// Prepended to the name, separated by a space.
    pub prefix: Option<String>,

    /// Appended to the name, separated by a space.
    pub suffix: Option<String>,

    /// Folder to place the copy in. The copy stays beside the source when absent.
    pub to_folder: Option<String>,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            same_name: true,
            prefix: None,
            suffix: None,
            to_folder: None,
        }
    }
}

impl CopyOptions {
    /// Names the copy `Copy of <name>`.
    pub fn copy_of() -> Self {
        Self {
            same_name: false,
            ..Default::default()
        }
    }

    /// Sets the prefix.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the suffix.
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Sets the destination folder.
    pub fn to_folder(mut self, folder_id: impl Into<String>) -> Self {
        self.to_folder = Some(folder_id.into());
        self
    }

    /// Name of the copy of a file called `source_name`.
    pub fn copy_name(&self, source_name: &str) -> String {
        if !self.same_name {
            return format!("Copy of {}", source_name);
        }

        let mut name = String::new();
        if let Some(prefix) = &self.prefix {
            name.push_str(prefix);
            name.push(' ');
        }
        name.push_str(source_name);
        if let Some(suffix) = &self.suffix {
            name.push(' ');
            name.push_str(suffix);
        }
        name
    }
}

/// Which permission [`SimpleDrive::remove_permission`] revokes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionTarget {
    /// A known permission ID.
    Id(String),

    /// The permission granted to this address, found by listing.
    ByEmail(String),

    /// Both were supplied; the ID wins and the address is ignored.
    Both {
        /// Permission ID.
        id: String,
        /// Grantee address.
        email: String,
    },
}

/// Result of [`SimpleDrive::transfer_owner_by_copy`]. Serializes as the copy's
/// fields plus `deleted_file`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferRecord {
    /// The copy, owned by the receiving account.
    #[serde(flatten)]
    pub file: DriveFile,

    /// ID of the original, now deleted.
    pub deleted_file: String,
}

/// Everyday Drive operations behind short signatures.
#[derive(Clone, Debug)]
pub struct SimpleDrive {
    client: DriveClient,
}

impl SimpleDrive {
    /// Creates a facade over the public Drive endpoints.
    pub fn new<A: AuthProvider + 'static>(provider: A) -> DriveResult<Self> {
        let client = DriveClient::builder().auth_provider(provider).build()?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn from_client(client: DriveClient) -> Self {
        Self { client }
    }

    /// The underlying typed client.
    pub fn client(&self) -> &DriveClient {
        &self.client
    }

    /// Creates a folder and returns its ID. Without `parent` the folder lands
    /// in My Drive.
    pub async fn create_folder(&self, name: &str, parent: Option<&str>) -> DriveResult<String> {
        let folder = self.client.files().create_folder(name, parent).await?;
        info!(folder_id = %folder.id, name, "Folder created");
        Ok(folder.id)
    }

    /// Uploads a local file. The Drive name is `rename_to` or the file's own
    /// name; files above the multipart threshold go through a resumable session.
    pub async fn upload_file(
        &self,
        local_path: impl AsRef<Path>,
        folder: Option<&str>,
        rename_to: Option<&str>,
    ) -> DriveResult<DriveFile> {
        let path = local_path.as_ref();
        let name = match rename_to {
            Some(name) => name.to_string(),
            None => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    DriveError::invalid_argument(format!("{} has no file name", path.display()))
                })?,
        };

        let mime_type: Mime = mime_guess::from_path(path).first_or(mime::APPLICATION_OCTET_STREAM);
        let mut metadata = CreateFileRequest::named(&name).mime_type(mime_type.essence_str());
        if let Some(folder) = folder {
            metadata = metadata.parent(folder);
        }

        let size = tokio::fs::metadata(path).await?.len();
        let files = self.client.files();

        let file = if size <= self.client.config().multipart_threshold {
            let content = Bytes::from(tokio::fs::read(path).await?);
            files
                .upload_multipart(&metadata, content, mime_type.essence_str())
                .await?
        } else {
            let mut session = files
                .create_resumable(&metadata, size, mime_type.essence_str())
                .await?;
            let reader = tokio::fs::File::open(path).await?;
            let capacity = session.chunk_size();
            session
                .upload_stream(ReaderStream::with_capacity(reader, capacity))
                .await?
        };

        info!(
            file_id = %file.id,
            path = %path.display(),
            name = %name,
            folder = folder.unwrap_or("My Drive"),
            size,
            "File uploaded"
        );
        Ok(file)
    }

    /// Lists files whose name contains `title_contains` and/or that are owned
    /// by `owner_email`. With neither filter, lists everything visible.
    pub async fn list_files(
        &self,
        title_contains: Option<&str>,
        owner_email: Option<&str>,
    ) -> DriveResult<Vec<DriveFile>> {
        let params = ListFilesParams {
            q: build_list_query(title_contains, owner_email),
            page_size: Some(LIST_PAGE_SIZE),
            fields: Some(LIST_FIELDS.to_string()),
            ..Default::default()
        };

        let files = self.client.files().list_all(params).await?;
        info!(count = files.len(), "Files listed");
        Ok(files)
    }

    /// Deletes a file permanently.
    pub async fn delete_file(&self, file_id: &str) -> DriveResult<()> {
        self.client.files().delete(file_id).await?;
        info!(file_id, "File deleted");
        Ok(())
    }

    /// Copies a file, naming and placing the copy per `options`.
    pub async fn copy_file(&self, file_id: &str, options: &CopyOptions) -> DriveResult<DriveFile> {
        let files = self.client.files();
        let source = files.get(file_id, Some(FILE_FIELDS)).await?;
        let new_name = options.copy_name(&source.name);

        let request = CopyFileRequest {
            name: Some(new_name.clone()),
            ..Default::default()
        };
        let mut copied = files.copy(file_id, &request, Some(FILE_FIELDS)).await?;

        if let Some(folder) = &options.to_folder {
            // A copy lands in the source's parent unless Drive says otherwise.
            let current_parent = copied.first_parent().or_else(|| source.first_parent());
            let mut params = UpdateFileParams::reparent(folder.as_str(), current_parent);
            params.fields = Some(FILE_FIELDS.to_string());
            let copy_id = copied.id.clone();
            copied = files
                .update(&copy_id, &UpdateFileRequest::default(), &params)
                .await?;
        }

        info!(
            source_id = file_id,
            source_name = %source.name,
            copy_id = %copied.id,
            copy_name = %new_name,
            folder = options.to_folder.as_deref().unwrap_or("unchanged"),
            "File copied"
        );
        Ok(copied)
    }

    /// Moves a file out of its current parent into `to_folder`.
    pub async fn move_file(&self, file_id: &str, to_folder: &str) -> DriveResult<DriveFile> {
        let files = self.client.files();
        let file = files.get(file_id, Some("id, name, parents")).await?;

        let mut params = UpdateFileParams::reparent(to_folder, file.first_parent());
        params.fields = Some(FILE_FIELDS.to_string());
        let moved = files
            .update(file_id, &UpdateFileRequest::default(), &params)
            .await?;

        info!(file_id, name = %file.name, to_folder, "File moved");
        Ok(moved)
    }

    /// Renames a file.
    pub async fn rename_file(&self, file_id: &str, new_name: &str) -> DriveResult<DriveFile> {
        if new_name.trim().is_empty() {
            return Err(DriveError::invalid_argument("new name must not be empty"));
        }

        let request = UpdateFileRequest {
            name: Some(new_name.to_string()),
            ..Default::default()
        };
        let params = UpdateFileParams {
            fields: Some(FILE_FIELDS.to_string()),
            ..Default::default()
        };
        let renamed = self.client.files().update(file_id, &request, &params).await?;

        info!(file_id, new_name, "File renamed");
        Ok(renamed)
    }

    /// Shares a file with one user.
    pub async fn add_permission(&self, file_id: &str, email: &str, role: ShareRole) -> DriveResult<()> {
        let request = CreatePermissionRequest::user(email, role.into());
        self.client.permissions().create(file_id, &request).await?;
        info!(file_id, email, role = ?role, "Permission added");
        Ok(())
    }

    /// Revokes a permission. Returns false when `ByEmail` matches nobody.
    pub async fn remove_permission(&self, file_id: &str, target: &PermissionTarget) -> DriveResult<bool> {
        let permissions = self.client.permissions();

        let permission_id = match target {
            PermissionTarget::Id(id) | PermissionTarget::Both { id, .. } => id.clone(),
            PermissionTarget::ByEmail(email) => {
                let all = permissions.list_all(file_id).await?;
                match all.into_iter().find(|p| p.matches_email(email)) {
                    Some(permission) => permission.id,
                    None => {
                        info!(file_id, email = %email, "No permission for address");
                        return Ok(false);
                    }
                }
            }
        };

        permissions.delete(file_id, &permission_id).await?;
        info!(file_id, permission_id = %permission_id, "Permission removed");
        Ok(true)
    }

    /// Storage quota of the authenticated account.
    pub async fn check_usage(&self) -> DriveResult<StorageQuota> {
        self.client.about().get_storage_quota().await
    }

    /// Hands a file to another account: `to` copies it, then `from` deletes
    /// the original.
    ///
    /// Not atomic. If the delete fails the copy stays and the error is
    /// returned; the caller decides whether to retry the delete.
    pub async fn transfer_owner_by_copy(
        from: &SimpleDrive,
        to: &SimpleDrive,
        file_id: &str,
        same_name: bool,
    ) -> DriveResult<TransferRecord> {
        let options = CopyOptions {
            same_name,
            ..Default::default()
        };
        let file = to.copy_file(file_id, &options).await?;
        from.delete_file(file_id).await?;

        info!(source_id = file_id, copy_id = %file.id, "Ownership transferred by copy");
        Ok(TransferRecord {
            file,
            deleted_file: file_id.to_string(),
        })
    }
}

/// Drive search expression ANDing the present filters, or `None` to list all.
pub fn build_list_query(title_contains: Option<&str>, owner_email: Option<&str>) -> Option<String> {
    let mut filters = Vec::new();
    if let Some(title) = title_contains {
        filters.push(format!("name contains '{}'", escape_query(title)));
    }
    if let Some(owner) = owner_email {
        filters.push(format!("'{}' in owners", escape_query(owner)));
    }

    if filters.is_empty() {
        None
    } else {
        Some(filters.join(" and "))
    }
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
