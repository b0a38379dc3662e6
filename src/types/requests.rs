//! Request bodies and query parameters.

use super::{PermissionRole, PermissionType};
use serde::Serialize;
use std::collections::HashMap;

/// Metadata for a new file or folder.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileRequest {
    /// File name.
    pub name: String,

    /// MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Parent folder IDs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,

    /// Custom properties.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, String>>,
}

impl CreateFileRequest {
    /// Metadata with just a name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the MIME type.
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Places the file in `parent`.
    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parents = Some(vec![parent.into()]);
        self
    }
}

/// Metadata changes for an existing file. Parents are changed through
/// [`UpdateFileParams`], not here.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileRequest {
    /// New name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// New MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Move to or restore from trash.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trashed: Option<bool>,
}

/// Query parameters for `files.update`.
#[derive(Debug, Clone, Default)]
pub struct UpdateFileParams {
    /// Parent IDs to add.
    pub add_parents: Vec<String>,

    /// Parent IDs to remove.
    pub remove_parents: Vec<String>,

    /// Fields to return.
    pub fields: Option<String>,
}

impl UpdateFileParams {
    /// Replaces `from` with `to` as parent.
    pub fn reparent(to: impl Into<String>, from: Option<&str>) -> Self {
        Self {
            add_parents: vec![to.into()],
            remove_parents: from.map(|p| vec![p.to_string()]).unwrap_or_default(),
            fields: None,
        }
    }

    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if !self.add_parents.is_empty() {
            query.push(("addParents", self.add_parents.join(",")));
        }
        if !self.remove_parents.is_empty() {
            query.push(("removeParents", self.remove_parents.join(",")));
        }
        if let Some(fields) = &self.fields {
            query.push(("fields", fields.clone()));
        }
        query
    }
}

/// Metadata for a copy.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyFileRequest {
    /// Name of the copy. Drive uses "Copy of <name>" when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Parents of the copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,

    /// Description of the copy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// New permission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePermissionRequest {
    /// Grantee type.
    #[serde(rename = "type")]
    pub permission_type: PermissionType,

    /// Role to grant.
    pub role: PermissionRole,

    /// Grantee address for user or group permissions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,

    /// Domain for domain permissions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl CreatePermissionRequest {
    /// Grants `role` to a single user.
    pub fn user(email: impl Into<String>, role: PermissionRole) -> Self {
        Self {
            permission_type: PermissionType::User,
            role,
            email_address: Some(email.into()),
            domain: None,
        }
    }
}

/// Query parameters for `files.list`.
#[derive(Debug, Clone, Default)]
pub struct ListFilesParams {
    /// Search query.
    pub q: Option<String>,

    /// Page size.
    pub page_size: Option<u32>,

    /// Page token.
    pub page_token: Option<String>,

    /// Order by clause.
    pub order_by: Option<String>,

    /// Fields to return.
    pub fields: Option<String>,
}

impl ListFilesParams {
    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(q) = &self.q {
            query.push(("q", q.clone()));
        }
        if let Some(size) = self.page_size {
            query.push(("pageSize", size.to_string()));
        }
        if let Some(token) = &self.page_token {
            query.push(("pageToken", token.clone()));
        }
        if let Some(order_by) = &self.order_by {
            query.push(("orderBy", order_by.clone()));
        }
        if let Some(fields) = &self.fields {
            query.push(("fields", fields.clone()));
        }
        query
    }
}
