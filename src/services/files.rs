//! File operations service.

use super::upload::ResumableUploadSession;
use crate::client::{path_segment, RequestExecutor};
use crate::errors::{DriveError, DriveResult, UploadError};
use crate::transport::{HttpMethod, HttpRequest, MultipartBody, RequestBody};
use crate::types::{
    CopyFileRequest, CreateFileRequest, DriveFile, FileList, ListFilesParams, UpdateFileParams,
    UpdateFileRequest, FOLDER_MIME_TYPE,
};
use bytes::Bytes;
use reqwest::header::{HeaderName, HeaderValue};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Service for file operations.
#[derive(Clone)]
pub struct FilesService {
    executor: Arc<RequestExecutor>,
}

impl FilesService {
    pub(crate) fn new(executor: Arc<RequestExecutor>) -> Self {
        Self { executor }
    }

    /// Gets file metadata. `fields` narrows the returned resource.
    pub async fn get(&self, file_id: &str, fields: Option<&str>) -> DriveResult<DriveFile> {
        require("file id", file_id)?;

        let query = fields_query(fields);
        self.executor
            .execute_request(HttpMethod::Get, &file_path(file_id), &query, None)
            .await
    }

    /// Lists one page of files.
    pub async fn list(&self, params: &ListFilesParams) -> DriveResult<FileList> {
        self.executor
            .execute_request(HttpMethod::Get, "files", &params.query(), None)
            .await
    }

    /// Lists every file matching `params`, following page tokens.
    pub async fn list_all(&self, params: ListFilesParams) -> DriveResult<Vec<DriveFile>> {
        let mut params = params;
        let mut files = Vec::new();

        loop {
            let page = self.list(&params).await?;
            files.extend(page.files);

            match page.next_page_token {
                Some(token) if !token.is_empty() => params.page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = files.len(), "Listed files");
        Ok(files)
    }

    /// Creates a file with metadata only.
    pub async fn create(&self, request: &CreateFileRequest) -> DriveResult<DriveFile> {
        require("name", &request.name)?;

        let body = RequestBody::json(request)?;
        self.executor
            .execute_request(HttpMethod::Post, "files", &[], Some(body))
            .await
    }

    /// Creates a folder, optionally inside `parent`.
    pub async fn create_folder(&self, name: &str, parent: Option<&str>) -> DriveResult<DriveFile> {
        let mut request = CreateFileRequest::named(name).mime_type(FOLDER_MIME_TYPE);
        if let Some(parent) = parent {
            request = request.parent(parent);
        }
        self.create(&request).await
    }

    /// Updates metadata and, through `params`, parents.
    pub async fn update(
        &self,
        file_id: &str,
        request: &UpdateFileRequest,
        params: &UpdateFileParams,
    ) -> DriveResult<DriveFile> {
        require("file id", file_id)?;

        let body = RequestBody::json(request)?;
        self.executor
            .execute_request(HttpMethod::Patch, &file_path(file_id), &params.query(), Some(body))
            .await
    }

    /// Copies a file. Without `fields` Drive returns only the id, name and
    /// MIME type of the copy.
    pub async fn copy(
        &self,
        file_id: &str,
        request: &CopyFileRequest,
        fields: Option<&str>,
    ) -> DriveResult<DriveFile> {
        require("file id", file_id)?;

        let path = format!("{}/copy", file_path(file_id));
        let body = RequestBody::json(request)?;
        self.executor
            .execute_request(HttpMethod::Post, &path, &fields_query(fields), Some(body))
            .await
    }

    /// Permanently deletes a file, skipping the trash.
    pub async fn delete(&self, file_id: &str) -> DriveResult<()> {
        require("file id", file_id)?;

        self.executor
            .execute_empty(HttpMethod::Delete, &file_path(file_id), &[])
            .await
    }

    /// Adds and removes parents in one call.
    pub async fn move_file(
        &self,
        file_id: &str,
        add_parents: &[&str],
        remove_parents: &[&str],
    ) -> DriveResult<DriveFile> {
        let params = UpdateFileParams {
            add_parents: add_parents.iter().map(|p| p.to_string()).collect(),
            remove_parents: remove_parents.iter().map(|p| p.to_string()).collect(),
            fields: None,
        };
        self.update(file_id, &UpdateFileRequest::default(), &params)
            .await
    }

    /// Uploads metadata and content in a single `multipart/related` request.
    pub async fn upload_multipart(
        &self,
        metadata: &CreateFileRequest,
        content: Bytes,
        mime_type: &str,
    ) -> DriveResult<DriveFile> {
        require("name", &metadata.name)?;

        let metadata = Bytes::from(serde_json::to_vec(metadata)?);
        let body = RequestBody::Multipart(MultipartBody::new(metadata, content, mime_type));
        self.executor
            .execute_upload(
                HttpMethod::Post,
                "files",
                &[("uploadType", "multipart".to_string())],
                body,
            )
            .await
    }

    /// Opens a resumable upload session for `content_length` bytes.
    pub async fn create_resumable(
        &self,
        metadata: &CreateFileRequest,
        content_length: u64,
        mime_type: &str,
    ) -> DriveResult<ResumableUploadSession> {
        require("name", &metadata.name)?;

        let url = self
            .executor
            .build_upload_url("files", &[("uploadType", "resumable".to_string())])?;
        let mut request = HttpRequest::new(HttpMethod::Post, url);
        request.headers.insert(
            HeaderName::from_static("x-upload-content-type"),
            header_value(mime_type)?,
        );
        request.headers.insert(
            HeaderName::from_static("x-upload-content-length"),
            header_value(&content_length.to_string())?,
        );
        request.body = Some(RequestBody::json(metadata)?);

        let response = self.executor.execute_raw(request).await?;
        let location = response.header("location").ok_or_else(|| {
            UploadError::UploadFailed("Missing Location header in resumable upload response".to_string())
        })?;
        let upload_uri = Url::parse(location)
            .map_err(|e| UploadError::UploadFailed(format!("Invalid session URI: {}", e)))?;

        debug!(content_length, "Opened resumable upload session");
        ResumableUploadSession::new(
            Arc::clone(&self.executor),
            upload_uri,
            content_length,
            self.executor.config().upload_chunk_size,
        )
    }
}

fn file_path(file_id: &str) -> String {
    format!("files/{}", path_segment(file_id))
}

fn fields_query(fields: Option<&str>) -> Vec<(&'static str, String)> {
    fields
        .map(|f| vec![("fields", f.to_string())])
        .unwrap_or_default()
}

fn require(what: &str, value: &str) -> DriveResult<()> {
    if value.trim().is_empty() {
        return Err(DriveError::invalid_argument(format!("{} must not be empty", what)));
    }
    Ok(())
}

fn header_value(value: &str) -> DriveResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| DriveError::invalid_argument(format!("Invalid header value {:?}: {}", value, e)))
}
