//! HTTP Client implementation using reqwest.
//!
//! This adapter implements the `HttpClient` port for calls against the
//! identity graph. Only GET is needed: the profile document and the photo
//! bytes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;
use warden_application::ports::{HttpClient, HttpRequest, HttpResponse, ResponseType};
use warden_domain::{AuthError, AuthResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client implementation using reqwest.
///
/// Non-success status codes are reported as
/// [`AuthError::NetworkError`] so callers see one failure kind for the
/// remote call.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Creates a new HTTP client with default settings.
    ///
    /// Default configuration:
    /// - Request timeout: 30 seconds
    /// - Follow redirects: up to 10
    /// - User-Agent: "Warden/<version>"
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new() -> AuthResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("Warden/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| AuthError::network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Creates a new HTTP client with a custom reqwest client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Parses the request URL and appends its query parameters.
    fn build_url(request: &HttpRequest) -> AuthResult<Url> {
        let mut url = Url::parse(&request.url)
            .map_err(|e| AuthError::invalid_argument(format!("{e}: {}", request.url)))?;
        if !request.params.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.params);
        }
        Ok(url)
    }

    /// Maps reqwest errors to [`AuthError::NetworkError`].
    fn map_error(error: &reqwest::Error) -> AuthError {
        if error.is_timeout() {
            return AuthError::network(format!("request timed out: {error}"));
        }
        if error.is_connect() {
            return AuthError::network(format!("connection failed: {error}"));
        }
        AuthError::network(error.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, request: HttpRequest) -> AuthResult<HttpResponse> {
        let url = Self::build_url(&request)?;

        let mut builder = self.client.get(url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if request.response_type == ResponseType::Json
            && !request
                .headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("accept"))
        {
            builder = builder.header(ACCEPT, "application/json");
        }

        let response = builder.send().await.map_err(|e| Self::map_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::network(format!(
                "GET {} returned {}",
                url.path(),
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::network(format!("failed to read body: {e}")))?
            .to_vec();

        tracing::debug!(path = url.path(), status = status.as_u16(), bytes = body.len(), "graph response");
        Ok(HttpResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}
