//! Error types for the simplified Google Drive client.

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Result type for Drive and credential operations.
pub type DriveResult<T> = Result<T, DriveError>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum DriveError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Credential resolution error.
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Authentication error while attaching a token to a request.
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthenticationError),

    /// The remote API rejected a request.
    #[error("Remote API error: {0}")]
    Api(#[from] ApiError),

    /// Upload error.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Network error.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Response error.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// Local I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriveError {
    /// Creates a configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        DriveError::Configuration(ConfigurationError::InvalidConfiguration(msg.into()))
    }

    /// Creates a request validation error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        DriveError::Configuration(ConfigurationError::InvalidArgument(msg.into()))
    }

    /// Creates a network error.
    pub fn network(msg: impl Into<String>) -> Self {
        DriveError::Network(NetworkError::ConnectionFailed(msg.into()))
    }

    /// Creates a deserialization error.
    pub fn deserialization(msg: impl Into<String>) -> Self {
        DriveError::Response(ResponseError::DeserializationError(msg.into()))
    }

    /// Returns true when the remote API reported the target as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DriveError::Api(ApiError::NotFound(_)))
    }

    /// Returns the retry delay hint if the server sent one.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            DriveError::Api(ApiError::RateLimited { retry_after, .. })
            | DriveError::Api(ApiError::ServiceUnavailable { retry_after, .. }) => *retry_after,
            _ => None,
        }
    }

    /// Returns the HTTP status code if applicable.
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            DriveError::Api(err) => Some(err.status_code()),
            DriveError::Authentication(_) => Some(StatusCode::UNAUTHORIZED),
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Missing credentials.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Invalid argument passed to an operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors raised while resolving an authorization handle.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The service-account key is neither a JSON object nor a loadable file.
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// The OAuth client secrets could not be read or parsed.
    #[error("Invalid client secrets: {0}")]
    InvalidClientSecrets(String),

    /// The identity provider rejected the request or could not be reached.
    #[error("Auth provider error: {0}")]
    AuthProvider(String),

    /// A consent step is required but interactive authorization is disabled.
    #[error("Interactive flow unavailable: {0}")]
    InteractiveFlowUnavailable(String),

    /// Automatic resolution exhausted every configured source.
    #[error("No credential source available{}", .last_error.as_ref().map(|e| format!(" (last error: {})", e)).unwrap_or_default())]
    NoCredentialSourceAvailable {
        /// Failure of the last source that was attempted, if any.
        last_error: Option<String>,
    },

    /// The credential cache could not be read or written.
    #[error("Credential storage error: {0}")]
    Storage(String),
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthenticationError {
    /// Invalid token.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Expired token with no way to renew it.
    #[error("Expired token: {0}")]
    ExpiredToken(String),

    /// Refresh failed.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// JWT encoding error.
    #[error("JWT encoding error: {0}")]
    JwtEncodingError(String),
}

/// Failure reported by a Google API for a file, permission or chat call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 with the first error reason, if any.
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message.
        message: String,
        /// Google error reason.
        reason: Option<String>,
    },

    /// 401.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 403 other than quota failures.
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Error message.
        message: String,
        /// Google error reason.
        reason: Option<String>,
    },

    /// 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// 429 or a rate-limit reason on 403.
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        /// Error message.
        message: String,
        /// Retry after duration.
        retry_after: Option<Duration>,
    },

    /// Storage quota exhausted.
    #[error("Storage quota exceeded: {0}")]
    StorageQuotaExceeded(String),

    /// 5xx other than 503.
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status.
        status: u16,
        /// Error message.
        message: String,
    },

    /// 503.
    #[error("Service unavailable: {message}")]
    ServiceUnavailable {
        /// Error message.
        message: String,
        /// Retry after duration.
        retry_after: Option<Duration>,
    },

    /// Any other non-success status.
    #[error("HTTP {status}: {message}")]
    Other {
        /// HTTP status.
        status: u16,
        /// Error message.
        message: String,
    },
}

impl ApiError {
    /// Returns the HTTP status this error was mapped from.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } | ApiError::StorageQuotaExceeded(_) => {
                StatusCode::FORBIDDEN
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Server { status, .. } | ApiError::Other { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Upload interrupted.
    #[error("Upload interrupted: {0}")]
    UploadInterrupted(String),

    /// Upload failed.
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Invalid upload request.
    #[error("Invalid upload request: {0}")]
    InvalidUploadRequest(String),

    /// Resumable upload expired.
    #[error("Resumable upload expired: {0}")]
    ResumableUploadExpired(String),

    /// Chunk size mismatch.
    #[error("Chunk size mismatch: {0}")]
    ChunkSizeMismatch(String),
}

/// Network errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Timeout.
    #[error("Request timeout: {0}")]
    Timeout(String),
}

/// Response errors.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Deserialization error.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// Unexpected format.
    #[error("Unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network error.
    #[error("Network error: {0}")]
    Network(String),

    /// Timeout error.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// HTTP error.
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err.to_string())
        } else if err.is_connect() {
            TransportError::Network(err.to_string())
        } else {
            TransportError::Http(err.to_string())
        }
    }
}

impl From<TransportError> for DriveError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout(msg) => DriveError::Network(NetworkError::Timeout(msg)),
            TransportError::Network(msg) => {
                DriveError::Network(NetworkError::ConnectionFailed(msg))
            }
            TransportError::Http(msg) => {
                DriveError::Response(ResponseError::UnexpectedFormat(msg))
            }
        }
    }
}

impl From<serde_json::Error> for DriveError {
    fn from(err: serde_json::Error) -> Self {
        DriveError::Response(ResponseError::DeserializationError(err.to_string()))
    }
}
