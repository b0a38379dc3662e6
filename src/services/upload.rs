//! Resumable upload sessions.
//!
//! Protocol:
//! 1. Initiate: POST metadata with `uploadType=resumable`, receive the session URI
//!    in `Location` (see [`FilesService::create_resumable`](super::FilesService::create_resumable)).
//! 2. Upload: PUT chunks to the session URI with `Content-Range: bytes a-b/total`.
//!    `308` means "keep going" and its `Range: bytes=0-N` header says N+1 bytes
//!    are stored; `200`/`201` carries the finished file.
//! 3. On interruption: PUT with `Content-Range: bytes */total` to ask how much
//!    the server has, then continue from there.
//!
//! Sessions expire after about a week; an expired session answers `404`.

use crate::client::{map_error_response, RequestExecutor};
use crate::config::UPLOAD_CHUNK_GRANULARITY;
use crate::errors::{DriveError, DriveResult, UploadError};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
use crate::types::DriveFile;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::header::{HeaderValue, CONTENT_RANGE};
use reqwest::StatusCode;
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Default chunk size for resumable uploads (8MB).
pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Resumable upload session.
pub struct ResumableUploadSession {
    executor: Arc<RequestExecutor>,
    upload_uri: Url,
    total_size: u64,
    bytes_uploaded: u64,
    chunk_size: usize,
}

impl std::fmt::Debug for ResumableUploadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumableUploadSession")
            .field("upload_uri", &self.upload_uri.as_str())
            .field("total_size", &self.total_size)
            .field("bytes_uploaded", &self.bytes_uploaded)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl ResumableUploadSession {
    /// Wraps an initiated session.
    ///
    /// Fails with [`UploadError::ChunkSizeMismatch`] unless `chunk_size` is a
    /// positive multiple of 256KB.
    pub fn new(
        executor: Arc<RequestExecutor>,
        upload_uri: Url,
        total_size: u64,
        chunk_size: usize,
    ) -> DriveResult<Self> {
        if chunk_size == 0 || chunk_size % UPLOAD_CHUNK_GRANULARITY != 0 {
            return Err(UploadError::ChunkSizeMismatch(format!(
                "Chunk size {} is not a positive multiple of {} bytes",
                chunk_size, UPLOAD_CHUNK_GRANULARITY
            ))
            .into());
        }

        Ok(Self {
            executor,
            upload_uri,
            total_size,
            bytes_uploaded: 0,
            chunk_size,
        })
    }

    /// Session URI.
    pub fn upload_uri(&self) -> &Url {
        &self.upload_uri
    }

    /// Declared total size.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Bytes the server has acknowledged.
    pub fn bytes_uploaded(&self) -> u64 {
        self.bytes_uploaded
    }

    /// Chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Uploads one chunk starting at `offset`.
    pub async fn upload_chunk(&mut self, chunk: Bytes, offset: u64) -> DriveResult<UploadChunkResult> {
        if chunk.is_empty() {
            return Err(UploadError::InvalidUploadRequest("Cannot upload empty chunk".to_string()).into());
        }

        let end = offset + chunk.len() as u64 - 1;
        if end >= self.total_size {
            return Err(UploadError::InvalidUploadRequest(format!(
                "Chunk ending at byte {} exceeds declared size {}",
                end, self.total_size
            ))
            .into());
        }

        debug!(offset, chunk_size = chunk.len(), total_size = self.total_size, "Uploading chunk");

        let range = format!("bytes {}-{}/{}", offset, end, self.total_size);
        let response = self.put(range, Some(RequestBody::Bytes(chunk))).await?;

        match response.status {
            StatusCode::OK | StatusCode::CREATED => {
                let file: DriveFile = serde_json::from_slice(&response.body)?;
                self.bytes_uploaded = self.total_size;
                info!(file_id = %file.id, total_size = self.total_size, "Resumable upload complete");
                Ok(UploadChunkResult::Complete(file))
            }
            StatusCode::PERMANENT_REDIRECT => {
                let bytes_received = parse_range(&response)?;
                self.bytes_uploaded = bytes_received;
                debug!(bytes_received, total_size = self.total_size, "Upload in progress");
                Ok(UploadChunkResult::InProgress { bytes_received })
            }
            status => Err(self.failure(status, &response)),
        }
    }

    /// Uploads everything a byte stream yields, starting at the acknowledged offset.
    ///
    /// The stream must produce exactly the bytes from that offset to the end.
    pub async fn upload_stream<S>(&mut self, stream: S) -> DriveResult<DriveFile>
    where
        S: Stream<Item = Result<Bytes, io::Error>> + Send,
    {
        let mut stream = Box::pin(stream);
        let mut buffer: Vec<u8> = Vec::with_capacity(self.chunk_size);
        let mut offset = self.bytes_uploaded;

        info!(total_size = self.total_size, chunk_size = self.chunk_size, "Starting stream upload");

        while let Some(item) = stream.next().await {
            buffer.extend_from_slice(&item?);

            while buffer.len() >= self.chunk_size {
                let chunk = Bytes::copy_from_slice(&buffer[..self.chunk_size]);
                match self.upload_chunk(chunk, offset).await? {
                    UploadChunkResult::Complete(file) => return Ok(file),
                    UploadChunkResult::InProgress { bytes_received } => {
                        offset = advance(&mut buffer, offset, bytes_received)?;
                    }
                }
            }
        }

        while !buffer.is_empty() {
            let chunk = Bytes::copy_from_slice(&buffer);
            match self.upload_chunk(chunk, offset).await? {
                UploadChunkResult::Complete(file) => return Ok(file),
                UploadChunkResult::InProgress { bytes_received } => {
                    offset = advance(&mut buffer, offset, bytes_received)?;
                }
            }
        }

        Err(UploadError::UploadFailed("Upload incomplete after all data sent".to_string()).into())
    }

    /// Uploads content already in memory.
    pub async fn upload_bytes(&mut self, content: Bytes) -> DriveResult<DriveFile> {
        if content.len() as u64 != self.total_size {
            return Err(UploadError::InvalidUploadRequest(format!(
                "Content size {} does not match declared total size {}",
                content.len(),
                self.total_size
            ))
            .into());
        }

        let mut pos = self.bytes_uploaded as usize;
        while pos < content.len() {
            let end = std::cmp::min(pos + self.chunk_size, content.len());
            match self.upload_chunk(content.slice(pos..end), pos as u64).await? {
                UploadChunkResult::Complete(file) => return Ok(file),
                UploadChunkResult::InProgress { bytes_received } => {
                    if bytes_received as usize <= pos {
                        return Err(UploadError::UploadInterrupted(format!(
                            "Server made no progress at byte {}",
                            pos
                        ))
                        .into());
                    }
                    pos = bytes_received as usize;
                }
            }
        }

        Err(UploadError::UploadFailed("Upload loop ended without completion".to_string()).into())
    }

    /// Asks the server how many bytes it holds.
    pub async fn query_status(&self) -> DriveResult<UploadStatus> {
        let response = self.put(format!("bytes */{}", self.total_size), None).await?;

        match response.status {
            StatusCode::OK | StatusCode::CREATED => Ok(UploadStatus {
                bytes_received: self.total_size,
                total_size: self.total_size,
                is_complete: true,
            }),
            StatusCode::PERMANENT_REDIRECT => Ok(UploadStatus {
                bytes_received: parse_range(&response).unwrap_or(0),
                total_size: self.total_size,
                is_complete: false,
            }),
            status => Err(self.failure(status, &response)),
        }
    }

    /// Re-synchronizes the acknowledged offset after an interruption.
    pub async fn resume(&mut self) -> DriveResult<UploadStatus> {
        let status = self.query_status().await?;
        self.bytes_uploaded = status.bytes_received;
        info!(bytes_received = status.bytes_received, total_size = status.total_size, "Resumed upload");
        Ok(status)
    }

    async fn put(&self, content_range: String, body: Option<RequestBody>) -> DriveResult<HttpResponse> {
        let mut request = HttpRequest::new(HttpMethod::Put, self.upload_uri.clone());
        let value = HeaderValue::from_str(&content_range)
            .map_err(|e| DriveError::invalid_argument(format!("Invalid Content-Range: {}", e)))?;
        request.headers.insert(CONTENT_RANGE, value);
        request.body = body.or(Some(RequestBody::Empty));

        self.executor.send_unchecked(request).await.map_err(|e| match e {
            DriveError::Network(inner) => {
                warn!(error = %inner, "Upload request failed");
                UploadError::UploadInterrupted(inner.to_string()).into()
            }
            other => other,
        })
    }

    fn failure(&self, status: StatusCode, response: &HttpResponse) -> DriveError {
        if status == StatusCode::NOT_FOUND {
            warn!("Resumable upload session expired");
            return UploadError::ResumableUploadExpired(
                "Upload session expired. Please initiate a new upload.".to_string(),
            )
            .into();
        }
        warn!(status = status.as_u16(), "Upload request rejected");
        map_error_response(response)
    }
}

fn advance(buffer: &mut Vec<u8>, offset: u64, bytes_received: u64) -> DriveResult<u64> {
    let consumed = bytes_received.saturating_sub(offset) as usize;
    if consumed == 0 {
        return Err(UploadError::UploadInterrupted(format!(
            "Server made no progress at byte {}",
            offset
        ))
        .into());
    }
    buffer.drain(..consumed.min(buffer.len()));
    Ok(bytes_received)
}

/// Parses `Range: bytes=0-N` into the count of stored bytes. A 308 without a
/// `Range` header means nothing was stored yet.
fn parse_range(response: &HttpResponse) -> DriveResult<u64> {
    let Some(range) = response.header("range") else {
        return Ok(0);
    };

    range
        .strip_prefix("bytes=0-")
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(|last| last + 1)
        .ok_or_else(|| {
            UploadError::InvalidUploadRequest(format!("Invalid Range header format: {}", range)).into()
        })
}

/// Result of uploading a chunk.
#[derive(Debug)]
pub enum UploadChunkResult {
    /// More chunks are needed.
    InProgress {
        /// Bytes stored by the server so far.
        bytes_received: u64,
    },

    /// Upload is complete.
    Complete(DriveFile),
}

/// Status of a resumable upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadStatus {
    /// Bytes stored by the server.
    pub bytes_received: u64,

    /// Declared total size.
    pub total_size: u64,

    /// Whether the upload is complete.
    pub is_complete: bool,
}

impl UploadStatus {
    /// Returns the number of bytes remaining to upload.
    pub fn bytes_remaining(&self) -> u64 {
        self.total_size.saturating_sub(self.bytes_received)
    }
}
