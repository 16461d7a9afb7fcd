//! HTTP Client port

use async_trait::async_trait;
use warden_domain::AuthResult;

/// How the caller wants the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// A JSON document.
    #[default]
    Json,
    /// Raw bytes, e.g. an image.
    Bytes,
}

/// An outgoing GET request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpRequest {
    /// Absolute URL without query string.
    pub url: String,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Query parameters appended to the URL.
    pub params: Vec<(String, String)>,
    /// Expected body kind.
    pub response_type: ResponseType,
}

impl HttpRequest {
    /// Creates a JSON request for `url`.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Sets the expected body kind.
    #[must_use]
    pub const fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }
}

/// A successful response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Value of the `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Response body.
    pub body: Vec<u8>,
}

/// Port for issuing HTTP requests against the identity graph.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends the request and returns the response.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NetworkError`](warden_domain::AuthError::NetworkError)
    /// on transport failures and non-success status codes.
    async fn send(&self, request: HttpRequest) -> AuthResult<HttpResponse>;
}
