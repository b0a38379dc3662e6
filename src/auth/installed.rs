//! Installed-app (loopback redirect) consent flow.
//!
//! Binds a listener on the loopback interface, sends the user to Google's
//! consent page with `redirect_uri` pointing at that listener, and waits for
//! the single redirect that carries the authorization code. The wait has no
//! timeout; wrap [`InstalledFlow::run`] in `tokio::time::timeout` if needed.

use super::{AuthorizedUser, ClientSecrets, HttpAuthBackend, OAuthClient, ScopeSet};
use crate::config::ResolverConfig;
use crate::errors::CredentialError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::Rng;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;

const MAX_REQUEST_HEAD: usize = 8 * 1024;

const SUCCESS_PAGE: &str = "<html><body><h3>Authorization complete.</h3>\
<p>You may close this window.</p></body></html>";

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    /// Authorization code.
    #[serde(default)]
    pub code: Option<String>,
    /// Echoed state value.
    #[serde(default)]
    pub state: Option<String>,
    /// Error code when the user denied access.
    #[serde(default)]
    pub error: Option<String>,
}

impl CallbackParams {
    /// Parses the request line of an HTTP request, e.g. `GET /?code=x&state=y HTTP/1.1`.
    ///
    /// Returns `None` for requests that carry neither a code nor an error,
    /// such as the browser asking for `/favicon.ico`.
    pub fn from_request_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        if parts.next()? != "GET" {
            return None;
        }
        let target = parts.next()?;
        let query = target.split_once('?').map(|(_, q)| q).unwrap_or("");
        let params: CallbackParams = serde_urlencoded::from_str(query).ok()?;

        if params.code.is_none() && params.error.is_none() {
            return None;
        }
        Some(params)
    }
}

/// One run of the installed-app consent flow.
pub struct InstalledFlow<'a> {
    client: &'a OAuthClient,
    scopes: &'a ScopeSet,
    config: &'a ResolverConfig,
}

impl<'a> InstalledFlow<'a> {
    /// Creates a flow for the given client and scopes.
    pub fn new(secrets: &'a ClientSecrets, scopes: &'a ScopeSet, config: &'a ResolverConfig) -> Self {
        Self {
            client: secrets.client(),
            scopes,
            config,
        }
    }

    /// Builds the consent URL. Offline access and a forced consent prompt
    /// make Google issue a refresh token every time.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<Url, CredentialError> {
        let mut url = Url::parse(&self.client.auth_uri).map_err(|e| {
            CredentialError::InvalidClientSecrets(format!(
                "invalid auth_uri {}: {}",
                self.client.auth_uri, e
            ))
        })?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &self.scopes.to_space_delimited())
            .append_pair("state", state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");

        Ok(url)
    }

    /// Runs the flow to completion and exchanges the returned code.
    pub async fn run(&self, backend: &HttpAuthBackend) -> Result<AuthorizedUser, CredentialError> {
        let listener = TcpListener::bind((self.config.callback_host.as_str(), self.config.callback_port))
            .await
            .map_err(|e| {
                CredentialError::InteractiveFlowUnavailable(format!(
                    "cannot listen on {}:{}: {}",
                    self.config.callback_host, self.config.callback_port, e
                ))
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| CredentialError::InteractiveFlowUnavailable(e.to_string()))?
            .port();

        let redirect_uri = format!("http://{}:{}/", self.config.callback_host, port);
        let state = generate_state();
        let url = self.authorization_url(&redirect_uri, &state)?;

        info!(url = %url, "Please visit this URL to authorize this application");
        if self.config.open_browser {
            if let Err(e) = open::that(url.as_str()) {
                warn!(error = %e, "Could not open a browser; open the URL manually");
            }
        }

        let params = accept_callback(&listener).await?;

        if let Some(error) = params.error {
            return Err(CredentialError::AuthProvider(format!(
                "authorization denied: {}",
                error
            )));
        }
        if params.state.as_deref() != Some(state.as_str()) {
            return Err(CredentialError::AuthProvider(
                "authorization response state mismatch".to_string(),
            ));
        }
        let code = params.code.ok_or_else(|| {
            CredentialError::AuthProvider("authorization response had no code".to_string())
        })?;

        info!("Authentication successful");
        backend
            .exchange_code(self.client, &code, &redirect_uri, self.scopes)
            .await
    }
}

fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

async fn accept_callback(listener: &TcpListener) -> Result<CallbackParams, CredentialError> {
    loop {
        let (mut stream, peer) = listener
            .accept()
            .await
            .map_err(|e| CredentialError::InteractiveFlowUnavailable(e.to_string()))?;
        debug!(peer = %peer, "Accepted callback connection");

        let head = match read_request_head(&mut stream).await {
            Ok(head) => head,
            Err(e) => {
                debug!(error = %e, "Dropping unreadable callback connection");
                continue;
            }
        };

        let request_line = head.lines().next().unwrap_or_default();
        match CallbackParams::from_request_line(request_line) {
            Some(params) => {
                respond(&mut stream, "200 OK", SUCCESS_PAGE).await;
                return Ok(params);
            }
            None => respond(&mut stream, "404 Not Found", "").await,
        }
    }
}

async fn read_request_head(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];

    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() >= MAX_REQUEST_HEAD {
            break;
        }
    }

    Ok(String::from_utf8_lossy(&buf).into_owned())
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        debug!(error = %e, "Failed to write callback response");
    }
    let _ = stream.shutdown().await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> ClientSecrets {
        ClientSecrets::parse(
            r#"{"installed": {"client_id": "cid", "client_secret": "cs"}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_authorization_url_params() {
        let secrets = secrets();
        let scopes = ScopeSet::drive_documents();
        let config = ResolverConfig::default();
        let flow = InstalledFlow::new(&secrets, &scopes, &config);

        let url = flow
            .authorization_url("http://127.0.0.1:8085/", "xyz")
            .unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert!(url.as_str().starts_with(super::super::AUTH_URL));
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "cid");
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:8085/");
        assert_eq!(pairs["scope"], scopes.to_space_delimited());
        assert_eq!(pairs["state"], "xyz");
        assert_eq!(pairs["access_type"], "offline");
        assert_eq!(pairs["prompt"], "consent");
    }

    #[test]
    fn test_callback_parsing() {
        let params = CallbackParams::from_request_line("GET /?code=4%2Fabc&state=s1 HTTP/1.1").unwrap();
        assert_eq!(params.code.as_deref(), Some("4/abc"));
        assert_eq!(params.state.as_deref(), Some("s1"));

        let params = CallbackParams::from_request_line("GET /?error=access_denied&state=s1 HTTP/1.1").unwrap();
        assert_eq!(params.error.as_deref(), Some("access_denied"));

        assert!(CallbackParams::from_request_line("GET /favicon.ico HTTP/1.1").is_none());
        assert!(CallbackParams::from_request_line("POST /?code=x HTTP/1.1").is_none());
        assert!(CallbackParams::from_request_line("").is_none());
    }

    #[test]
    fn test_state_is_random() {
        let a = generate_state();
        let b = generate_state();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
    }

    #[tokio::test]
    async fn test_accept_callback_skips_unrelated_requests() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut favicon = TcpStream::connect(addr).await.unwrap();
            favicon
                .write_all(b"GET /favicon.ico HTTP/1.1\r\nHost: x\r\n\r\n")
                .await
                .unwrap();
            let mut sink = Vec::new();
            let _ = favicon.read_to_end(&mut sink).await;

            let mut redirect = TcpStream::connect(addr).await.unwrap();
            redirect
                .write_all(b"GET /?code=c0de&state=st HTTP/1.1\r\nHost: x\r\n\r\n")
                .await
                .unwrap();
            let mut body = Vec::new();
            let _ = redirect.read_to_end(&mut body).await;
            String::from_utf8_lossy(&body).into_owned()
        });

        let params = accept_callback(&listener).await.unwrap();
        assert_eq!(params.code.as_deref(), Some("c0de"));
        assert_eq!(params.state.as_deref(), Some("st"));

        let page = client.await.unwrap();
        assert!(page.starts_with("HTTP/1.1 200 OK"));
    }
}
