//! About API service.

use crate::client::RequestExecutor;
use crate::errors::DriveResult;
use crate::transport::HttpMethod;
use crate::types::{About, StorageQuota};
use std::sync::Arc;

/// Service for account and quota information.
#[derive(Clone)]
pub struct AboutService {
    executor: Arc<RequestExecutor>,
}

impl AboutService {
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Gets account information. Drive requires a field mask here; the
    /// default is `storageQuota,user`.
    pub async fn get(&self, fields: Option<&str>) -> DriveResult<About> {
        let fields = fields.unwrap_or("storageQuota,user").to_string();
        self.executor
            .execute_request(HttpMethod::Get, "about", &[("fields", fields)], None)
            .await
    }

    /// Gets storage quota information. A response without a quota yields
    /// an empty one.
    pub async fn get_storage_quota(&self) -> DriveResult<StorageQuota> {
        let about = self.get(Some("storageQuota")).await?;
        Ok(about.storage_quota.unwrap_or_default())
    }
}
