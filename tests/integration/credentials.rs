use chrono::{Duration, Utc};
use secrecy::ExposeSecret;
use serde_json::json;
use simple_google_drive::auth::{
    ClientSecretsSource, CredentialOrigin, CredentialResolver, ServiceAccountKeySource,
};
use simple_google_drive::errors::CredentialError;
use simple_google_drive::{CredentialSources, DriveError, ResolverConfig, ScopeSet};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRIVATE_KEY: &str = include_str!("../fixtures/service_account_key.pem");

fn resolver(server: &MockServer) -> CredentialResolver {
    let config = ResolverConfig::default()
        .non_interactive()
        .with_token_url(format!("{}/token", server.uri()));
    CredentialResolver::with_config(config).unwrap()
}

fn cached_record(server: &MockServer, expiry: chrono::DateTime<Utc>) -> serde_json::Value {
    json!({
        "token": "cached-token",
        "refresh_token": "refresh-1",
        "token_uri": format!("{}/token", server.uri()),
        "client_id": "client-1.apps.googleusercontent.com",
        "client_secret": "shh",
        "scopes": ["https://www.googleapis.com/auth/drive"],
        "expiry": expiry.to_rfc3339()
    })
}

fn service_account_key(server: &MockServer) -> serde_json::Value {
    json!({
        "type": "service_account",
        "project_id": "demo",
        "private_key_id": "kid-1",
        "private_key": PRIVATE_KEY,
        "client_email": "robot@demo.iam.gserviceaccount.com",
        "token_uri": format!("{}/token", server.uri())
    })
}

#[tokio::test]
async fn test_expired_cache_is_refreshed_and_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=refresh-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh-token",
            "expires_in": 3599,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("token.json");
    let record = cached_record(&server, Utc::now() - Duration::hours(1));
    std::fs::write(&cache, serde_json::to_vec(&record).unwrap()).unwrap();

    let sources = CredentialSources::builder().cache_location(&cache).build();
    let credentials = resolver(&server).resolve_automatic(&sources).await.unwrap();

    assert_eq!(credentials.origin(), CredentialOrigin::Refreshed);
    assert!(!credentials.is_expired());

    let saved: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&cache).unwrap()).unwrap();
    assert_eq!(saved["token"], "fresh-token");
    assert_eq!(saved["refresh_token"], "refresh-1");
}

#[tokio::test]
async fn test_fresh_cache_makes_no_network_calls() {
    let server = MockServer::start().await;

    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("token.json");
    let record = cached_record(&server, Utc::now() + Duration::hours(1));
    std::fs::write(&cache, serde_json::to_vec(&record).unwrap()).unwrap();

    let sources = CredentialSources::builder().cache_location(&cache).build();
    let credentials = resolver(&server).resolve_automatic(&sources).await.unwrap();

    assert_eq!(credentials.origin(), CredentialOrigin::Cache);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remote_credentials_seed_the_cache() {
    let server = MockServer::start().await;
    let record = cached_record(&server, Utc::now() + Duration::hours(1));
    Mock::given(method("GET"))
        .and(path("/shared/credentials.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("credentials.json");
    let sources = CredentialSources::builder()
        .cache_location(&cache)
        .remote_cache_url(format!("{}/shared/credentials.json", server.uri()))
        .build();

    let credentials = resolver(&server).resolve_automatic(&sources).await.unwrap();
    assert_eq!(credentials.origin(), CredentialOrigin::Remote);
    assert!(cache.exists());
}

#[tokio::test]
async fn test_service_account_fallback_binds_requested_scopes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
        .and(body_string_contains("assertion="))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "robot-token",
            "expires_in": 3600,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let scopes = ScopeSet::drive_documents();
    let sources = CredentialSources::builder()
        .service_account_key(service_account_key(&server))
        .scopes(scopes.clone())
        .build();

    let credentials = resolver(&server).resolve_automatic(&sources).await.unwrap();
    assert_eq!(credentials.origin(), CredentialOrigin::ServiceAccount);
    assert_eq!(credentials.scopes(), &scopes);
    assert_eq!(credentials.token().token.expose_secret(), "robot-token");
}

#[tokio::test]
async fn test_rejected_service_account_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})))
        .mount(&server)
        .await;

    let sources = CredentialSources::builder()
        .service_account_key(service_account_key(&server))
        .build();

    let err = resolver(&server).resolve_automatic(&sources).await.unwrap_err();
    assert!(matches!(err, DriveError::Credential(CredentialError::AuthProvider(_))));
}

#[tokio::test]
async fn test_nothing_configured() {
    let server = MockServer::start().await;

    let err = resolver(&server)
        .resolve_automatic(&CredentialSources::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DriveError::Credential(CredentialError::NoCredentialSourceAvailable { .. })
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_client_secrets_without_cache_needs_consent() {
    let server = MockServer::start().await;
    let secrets = json!({
        "installed": {
            "client_id": "client-1.apps.googleusercontent.com",
            "client_secret": "shh",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": format!("{}/token", server.uri()),
            "redirect_uris": ["http://localhost"]
        }
    });

    let dir = tempfile::tempdir().unwrap();
    let err = resolver(&server)
        .resolve_from_client_secrets(
            &ClientSecretsSource::json(secrets.to_string()),
            &ScopeSet::drive(),
            &dir.path().join("token.json"),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DriveError::Credential(CredentialError::InteractiveFlowUnavailable(_))
    ));
}

#[tokio::test]
async fn test_malformed_key_file() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let key_path = dir.path().join("key.json");
    std::fs::write(&key_path, "[1, 2, 3]").unwrap();

    let err = resolver(&server)
        .resolve_from_service_account(&ServiceAccountKeySource::path(&key_path), &ScopeSet::drive())
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Credential(CredentialError::InvalidKeyFormat(_))));
}

#[tokio::test]
async fn test_unparsable_private_key_is_a_key_format_error() {
    let server = MockServer::start().await;
    let mut key = service_account_key(&server);
    key["private_key"] = json!("not a pem");

    let err = resolver(&server)
        .resolve_from_service_account(&ServiceAccountKeySource::Json(key), &ScopeSet::drive())
        .await
        .unwrap_err();
    assert!(matches!(err, DriveError::Credential(CredentialError::InvalidKeyFormat(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_download_raw() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/client_secrets.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"installed\":{}}"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let destination = dir.path().join("client_secrets.json");
    resolver(&server)
        .download_raw(&format!("{}/files/client_secrets.json", server.uri()), &destination)
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&destination).unwrap(), "{\"installed\":{}}");
}
