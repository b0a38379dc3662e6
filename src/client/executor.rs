//! Request executor with auth and error handling.

use crate::auth::AuthProvider;
use crate::config::DriveConfig;
use crate::errors::{ApiError, DriveError, DriveResult};
use crate::transport::{HttpMethod, HttpRequest, HttpResponse, HttpTransport, RequestBody};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encodes an ID for use as a single path segment.
pub(crate) fn path_segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Sends requests with the bearer token and user agent attached and maps
/// failures to [`DriveError`].
pub struct RequestExecutor {
    config: DriveConfig,
    transport: Arc<dyn HttpTransport>,
    auth: Arc<dyn AuthProvider>,
}

impl RequestExecutor {
    /// Creates a new request executor.
    pub fn new(config: DriveConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let auth = Arc::clone(&config.auth_provider);
        Self {
            config,
            transport,
            auth,
        }
    }

    /// Client configuration.
    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// Executes a request against the API base URL and deserializes the JSON response.
    pub async fn execute_request<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, String)],
        body: Option<RequestBody>,
    ) -> DriveResult<T> {
        let url = self.build_url(path, query)?;
        let response = self.execute(HttpRequest::new(method, url), body).await?;
        decode(&response)
    }

    /// Executes a request whose successful response has no body, such as DELETE.
    pub async fn execute_empty(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, String)],
    ) -> DriveResult<()> {
        let url = self.build_url(path, query)?;
        self.execute(HttpRequest::new(method, url), None).await?;
        Ok(())
    }

    /// Executes a request against the upload base URL and deserializes the JSON response.
    pub async fn execute_upload<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        query: &[(&str, String)],
        body: RequestBody,
    ) -> DriveResult<T> {
        let url = self.build_upload_url(path, query)?;
        let response = self.execute(HttpRequest::new(method, url), Some(body)).await?;
        decode(&response)
    }

    /// Executes a prepared request and returns the raw response if it succeeded.
    pub async fn execute_raw(&self, request: HttpRequest) -> DriveResult<HttpResponse> {
        let response = self.send_unchecked(request).await?;
        if !response.status.is_success() {
            return Err(map_error_response(&response));
        }
        Ok(response)
    }

    /// Sends a request with auth and user agent but leaves status handling to
    /// the caller. Resumable uploads need this for `308 Resume Incomplete`.
    pub async fn send_unchecked(&self, mut request: HttpRequest) -> DriveResult<HttpResponse> {
        let token = self.auth.get_access_token().await?;

        let auth_value = HeaderValue::from_str(&token.authorization_header())
            .map_err(|e| DriveError::invalid_argument(format!("Invalid auth header: {}", e)))?;
        let agent = HeaderValue::from_str(&self.config.user_agent)
            .map_err(|e| DriveError::invalid_argument(format!("Invalid user agent: {}", e)))?;
        request.headers.insert(AUTHORIZATION, auth_value);
        request.headers.insert(USER_AGENT, agent);
        if request.timeout.is_none() {
            request.timeout = Some(self.config.timeout);
        }

        debug!(method = ?request.method, url = %request.url, "Sending request");
        let response = self.transport.send(request).await?;
        debug!(status = response.status.as_u16(), "Received response");

        Ok(response)
    }

    async fn execute(&self, mut request: HttpRequest, body: Option<RequestBody>) -> DriveResult<HttpResponse> {
        request.body = body;
        self.execute_raw(request).await
    }

    /// Builds a full URL from a path relative to the API base URL.
    pub fn build_url(&self, path: &str, query: &[(&str, String)]) -> DriveResult<Url> {
        join(&self.config.base_url, path, query)
    }

    /// Builds a full URL from a path relative to the upload base URL.
    pub fn build_upload_url(&self, path: &str, query: &[(&str, String)]) -> DriveResult<Url> {
        join(&self.config.upload_url, path, query)
    }
}

fn join(base: &Url, path: &str, query: &[(&str, String)]) -> DriveResult<Url> {
    let mut url = base
        .join(path.trim_start_matches('/'))
        .map_err(|e| DriveError::invalid_argument(format!("Invalid URL: {}", e)))?;

    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }

    Ok(url)
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> DriveResult<T> {
    serde_json::from_slice(&response.body).map_err(|e| {
        DriveError::deserialization(format!("Failed to deserialize response: {}", e))
    })
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorItem>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct ErrorItem {
    #[serde(default)]
    reason: Option<String>,
}

/// Maps a non-success response to a domain error, using the status code and
/// the first `reason` in Google's error body.
pub fn map_error_response(response: &HttpResponse) -> DriveError {
    let status = response.status;
    let detail = serde_json::from_slice::<ErrorResponse>(&response.body)
        .ok()
        .map(|r| r.error);

    let (message, reason) = match detail {
        Some(detail) => {
            let reason = detail
                .errors
                .into_iter()
                .find_map(|item| item.reason)
                .or(detail.status);
            (detail.message, reason)
        }
        None => (
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&response.body)
            ),
            None,
        ),
    };

    let retry_after = response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);

    let error = match status {
        StatusCode::BAD_REQUEST => ApiError::BadRequest { message, reason },
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
        StatusCode::FORBIDDEN => match reason.as_deref() {
            Some("userRateLimitExceeded") | Some("rateLimitExceeded") => ApiError::RateLimited {
                message,
                retry_after,
            },
            Some("storageQuotaExceeded") => ApiError::StorageQuotaExceeded(message),
            _ => ApiError::Forbidden { message, reason },
        },
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited {
            message,
            retry_after,
        },
        StatusCode::SERVICE_UNAVAILABLE => ApiError::ServiceUnavailable {
            message,
            retry_after,
        },
        s if s.is_server_error() => ApiError::Server {
            status: s.as_u16(),
            message,
        },
        s => ApiError::Other {
            status: s.as_u16(),
            message,
        },
    };

    DriveError::Api(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AccessToken, Credentials, ScopeSet};
    use crate::mocks::{MockResponse, MockTransport};
    use bytes::Bytes;
    use reqwest::header::HeaderMap;

    fn executor(transport: Arc<MockTransport>) -> RequestExecutor {
        let creds = Credentials::from_access_token(
            AccessToken::new("tok", "Bearer", None, vec![]),
            ScopeSet::drive(),
        );
        let config = DriveConfig::builder().auth_provider(creds).build().unwrap();
        RequestExecutor::new(config, transport)
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse::new(
            StatusCode::from_u16(status).unwrap(),
            HeaderMap::new(),
            Bytes::from(body.to_string()),
        )
    }

    #[test]
    fn test_build_url() {
        let executor = executor(Arc::new(MockTransport::new()));

        let url = executor.build_url("/files", &[]).unwrap();
        assert_eq!(url.as_str(), "https://www.googleapis.com/drive/v3/files");

        let url = executor
            .build_url("files/123", &[("q", "name contains 'a b'".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/drive/v3/files/123?q=name+contains+%27a+b%27"
        );

        let url = executor
            .build_upload_url("files", &[("uploadType", "multipart".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart"
        );
    }

    #[test]
    fn test_path_segment_escapes_separators() {
        assert_eq!(path_segment("abc-DEF_1.2~"), "abc-DEF_1.2~");
        assert_eq!(path_segment("a/b?c"), "a%2Fb%3Fc");
    }

    #[test]
    fn test_error_mapping() {
        let body = r#"{"error":{"code":404,"message":"File not found: x.","errors":[{"reason":"notFound"}]}}"#;
        let err = map_error_response(&response(404, body));
        assert!(err.is_not_found());

        let body = r#"{"error":{"code":403,"message":"slow","errors":[{"reason":"userRateLimitExceeded"}]}}"#;
        assert!(matches!(
            map_error_response(&response(403, body)),
            DriveError::Api(ApiError::RateLimited { .. })
        ));

        let body = r#"{"error":{"code":403,"message":"full","errors":[{"reason":"storageQuotaExceeded"}]}}"#;
        assert!(matches!(
            map_error_response(&response(403, body)),
            DriveError::Api(ApiError::StorageQuotaExceeded(_))
        ));

        let body = r#"{"error":{"code":403,"message":"no","errors":[{"reason":"insufficientPermissions"}]}}"#;
        match map_error_response(&response(403, body)) {
            DriveError::Api(ApiError::Forbidden { reason, .. }) => {
                assert_eq!(reason.as_deref(), Some("insufficientPermissions"))
            }
            other => panic!("unexpected: {:?}", other),
        }

        assert!(matches!(
            map_error_response(&response(502, "bad gateway")),
            DriveError::Api(ApiError::Server { status: 502, .. })
        ));
        assert!(matches!(
            map_error_response(&response(409, "")),
            DriveError::Api(ApiError::Other { status: 409, .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_attaches_auth_and_maps_errors() {
        let transport = Arc::new(MockTransport::new());
        transport.enqueue(MockResponse::json(serde_json::json!({"id": "1", "name": "a"})));
        transport.enqueue(MockResponse::error(404, "notFound", "File not found"));
        let executor = executor(transport.clone());

        let file: crate::types::DriveFile = executor
            .execute_request(HttpMethod::Get, "files/1", &[], None)
            .await
            .unwrap();
        assert_eq!(file.name, "a");

        let err = executor
            .execute_empty(HttpMethod::Delete, "files/2", &[])
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].headers.get(AUTHORIZATION).unwrap(),
            "Bearer tok"
        );
        assert!(requests[0].headers.get(USER_AGENT).is_some());
    }

    #[tokio::test]
    async fn test_delete_accepts_empty_body() {
        let transport = Arc::new(MockTransport::new());
        transport.enqueue(MockResponse::no_content());
        let executor = executor(transport);

        tokio_test::assert_ok!(
            executor
                .execute_empty(HttpMethod::Delete, "files/1", &[])
                .await
        );
    }
}
