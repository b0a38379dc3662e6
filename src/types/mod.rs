//! Drive v3 resource types.
//!
//! Only the fields the facade reads are modelled. Every field is optional
//! or defaulted because Drive returns a partial resource unless `fields=*`
//! is requested.

mod requests;

pub use requests::{
    CopyFileRequest, CreateFileRequest, CreatePermissionRequest, ListFilesParams,
    UpdateFileParams, UpdateFileRequest,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// MIME type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Google Drive file representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriveFile {
    /// Resource kind (always "drive#file").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// File ID.
    pub id: String,

    /// File name.
    pub name: String,

    /// MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// File description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the file is in trash.
    pub trashed: bool,

    /// Parent folder IDs.
    pub parents: Vec<String>,

    /// File owners.
    pub owners: Vec<User>,

    /// Custom properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, String>>,

    /// Link to view in Drive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_view_link: Option<String>,

    /// Link to download content.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_content_link: Option<String>,

    /// Creation time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_time: Option<DateTime<Utc>>,

    /// Last modification time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,

    /// File size in bytes (decimal string, as Drive sends it).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// MD5 checksum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md5_checksum: Option<String>,
}

impl DriveFile {
    /// True for folders.
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    /// First parent, which is the only parent for files outside shared drives.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    /// Size parsed as a number.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }
}

/// One page of a files listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileList {
    /// Resource kind (always "drive#fileList").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Token for the next page; absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    /// Whether the search was incomplete.
    pub incomplete_search: bool,

    /// Files on this page.
    pub files: Vec<DriveFile>,
}

/// Drive user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    /// Display name.
    pub display_name: String,

    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,

    /// Whether this is the requesting user.
    pub me: bool,

    /// Permission ID of the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permission_id: Option<String>,
}

/// Permission grantee type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionType {
    /// Individual user.
    #[default]
    User,
    /// Google group.
    Group,
    /// Whole domain.
    Domain,
    /// Anyone with the link.
    Anyone,
}

/// Permission role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionRole {
    /// Full ownership.
    Owner,
    /// Shared drive organizer.
    Organizer,
    /// File organizer.
    FileOrganizer,
    /// Can edit.
    Writer,
    /// Can comment.
    Commenter,
    /// Can view.
    #[default]
    Reader,
}

/// Roles that can be granted when sharing with a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareRole {
    /// Can view.
    Reader,
    /// Can comment.
    Commenter,
    /// Can edit.
    Writer,
}

impl From<ShareRole> for PermissionRole {
    fn from(role: ShareRole) -> Self {
        match role {
            ShareRole::Reader => PermissionRole::Reader,
            ShareRole::Commenter => PermissionRole::Commenter,
            ShareRole::Writer => PermissionRole::Writer,
        }
    }
}

impl std::str::FromStr for ShareRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reader" => Ok(ShareRole::Reader),
            "commenter" => Ok(ShareRole::Commenter),
            "writer" => Ok(ShareRole::Writer),
            other => Err(format!(
                "unsupported role {:?}, expected reader, commenter or writer",
                other
            )),
        }
    }
}

/// A permission on a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permission {
    /// Resource kind (always "drive#permission").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Permission ID.
    pub id: String,

    /// Grantee type.
    #[serde(rename = "type")]
    pub permission_type: PermissionType,

    /// Granted role.
    pub role: PermissionRole,

    /// Email address (for user/group type).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,

    /// Domain (for domain type).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Whether the account was deleted.
    pub deleted: bool,
}

impl Permission {
    /// Case-insensitive match on the grantee address.
    pub fn matches_email(&self, email: &str) -> bool {
        self.email_address
            .as_deref()
            .map_or(false, |address| address.eq_ignore_ascii_case(email))
    }
}

/// One page of a permissions listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PermissionList {
    /// Token for the next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    /// Permissions on this page.
    pub permissions: Vec<Permission>,
}

/// Storage quota, in bytes. Drive sends decimal strings; `limit` is absent
/// for unlimited accounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageQuota {
    /// Total storage limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,

    /// Usage across all Google services.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Usage in Drive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_in_drive: Option<String>,

    /// Usage by trashed Drive files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_in_drive_trash: Option<String>,
}

impl StorageQuota {
    /// Limit parsed as a number; `None` when unlimited.
    pub fn limit_bytes(&self) -> Option<u64> {
        self.limit.as_deref().and_then(|s| s.parse().ok())
    }

    /// Total usage parsed as a number.
    pub fn usage_bytes(&self) -> Option<u64> {
        self.usage.as_deref().and_then(|s| s.parse().ok())
    }
}

/// About resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct About {
    /// Authenticated user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,

    /// Storage quota.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_quota: Option<StorageQuota>,

    /// Maximum upload size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_upload_size: Option<String>,
}
