//! Integration tests against a WireMock server standing in for Google's
//! token endpoint and the Drive v3 API.

mod credentials;
mod drive;

use simple_google_drive::{AccessToken, Credentials, DriveClient, ScopeSet, SimpleDrive};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "test-access-token";

/// Facade whose API and upload base URLs point at `server`.
pub fn drive_for(server: &MockServer) -> SimpleDrive {
    let credentials = Credentials::from_access_token(
        AccessToken::new(TEST_TOKEN, "Bearer", None, vec![]),
        ScopeSet::drive(),
    );

    let client = DriveClient::builder()
        .auth_provider(credentials)
        .base_url(format!("{}/drive/v3/", server.uri()))
        .upload_url(format!("{}/upload/drive/v3/", server.uri()))
        .allow_insecure(true)
        .build()
        .expect("client builds");

    SimpleDrive::from_client(client)
}

/// Mock that only matches requests carrying the test bearer token.
pub fn authed(method_matcher: &str, path_matcher: &str) -> wiremock::MockBuilder {
    Mock::given(method(method_matcher))
        .and(path(path_matcher))
        .and(header("authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
}

/// Google-style error body.
pub fn google_error(status: u16, reason: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(serde_json::json!({
        "error": {
            "code": status,
            "message": message,
            "errors": [{"reason": reason, "message": message}]
        }
    }))
}
