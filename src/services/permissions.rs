//! Permission operations service.

use crate::client::{path_segment, RequestExecutor};
use crate::errors::{DriveError, DriveResult};
use crate::transport::{HttpMethod, RequestBody};
use crate::types::{CreatePermissionRequest, Permission, PermissionList};
use std::sync::Arc;

/// Service for permission operations.
#[derive(Clone)]
pub struct PermissionsService {
    executor: Arc<RequestExecutor>,
}

impl PermissionsService {
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Grants a permission. Drive sends its usual notification email.
    pub async fn create(
        &self,
        file_id: &str,
        request: &CreatePermissionRequest,
    ) -> DriveResult<Permission> {
        let body = RequestBody::json(request)?;
        self.executor
            .execute_request(HttpMethod::Post, &permissions_path(file_id)?, &[], Some(body))
            .await
    }

    /// Lists one page of permissions.
    pub async fn list(&self, file_id: &str, page_token: Option<&str>) -> DriveResult<PermissionList> {
        let mut query = vec![(
            "fields",
            "nextPageToken, permissions(id, type, role, emailAddress, domain, displayName)"
                .to_string(),
        )];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        self.executor
            .execute_request(HttpMethod::Get, &permissions_path(file_id)?, &query, None)
            .await
    }

    /// Lists every permission on a file.
    pub async fn list_all(&self, file_id: &str) -> DriveResult<Vec<Permission>> {
        let mut permissions = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self.list(file_id, token.as_deref()).await?;
            permissions.extend(page.permissions);

            match page.next_page_token {
                Some(next) if !next.is_empty() => token = Some(next),
                _ => return Ok(permissions),
            }
        }
    }

    /// Revokes a permission.
    pub async fn delete(&self, file_id: &str, permission_id: &str) -> DriveResult<()> {
        if permission_id.trim().is_empty() {
            return Err(DriveError::invalid_argument("permission id must not be empty"));
        }

        let path = format!("{}/{}", permissions_path(file_id)?, path_segment(permission_id));
        self.executor
            .execute_empty(HttpMethod::Delete, &path, &[])
            .await
    }
}

fn permissions_path(file_id: &str) -> DriveResult<String> {
    if file_id.trim().is_empty() {
        return Err(DriveError::invalid_argument("file id must not be empty"));
    }
    Ok(format!("files/{}/permissions", path_segment(file_id)))
}
