//! Profile gateway: authenticated reads of the user's profile and photo.
//!
//! Both resources go through the [`PersistentCache`] so repeat reads are
//! served locally and refreshed in the background once stale.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use warden_domain::{AcquireTokenOptions, AuthError, AuthResult, PhotoSize, UserProfile};

use crate::auth::AuthService;
use crate::cache::{CacheOptions, PersistentCache};
use crate::ports::{HttpClient, HttpRequest, HttpResponse, ResponseType};

const DEFAULT_PHOTO_CONTENT_TYPE: &str = "image/jpeg";

/// Fetches profile data from the identity graph with a token from [`AuthService`].
#[derive(Clone)]
pub struct ProfileGateway {
    auth: AuthService,
    http: Arc<dyn HttpClient>,
    cache: PersistentCache,
}

impl ProfileGateway {
    /// Creates a gateway over an auth context, an HTTP client and a cache.
    pub fn new(auth: AuthService, http: Arc<dyn HttpClient>, cache: PersistentCache) -> Self {
        Self { auth, http, cache }
    }

    /// Cache key of the profile of `account_id`.
    #[must_use]
    pub fn profile_key(&self, account_id: &str) -> String {
        format!("{}.{account_id}.info", self.auth.config().cache_namespace)
    }

    /// Cache key of the photo of `account_id` at `size`.
    #[must_use]
    pub fn avatar_key(&self, account_id: &str, size: &PhotoSize) -> String {
        format!(
            "{}.{account_id}.photo.{size}",
            self.auth.config().cache_namespace
        )
    }

    /// The signed-in user's profile (`GET me`).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] for an empty account id, or the
    /// token or network error when nothing usable is cached.
    pub async fn fetch_profile(&self, account_id: &str) -> AuthResult<UserProfile> {
        require_account(account_id)?;
        let url = format!("{}/me", self.graph_base_url());
        let fetcher = self.clone();
        let options = CacheOptions::expiring_in_days(self.auth.config().info_cache_duration_in_days);

        self.cache
            .cached_call(
                &self.profile_key(account_id),
                move || async move {
                    let response = fetcher.get(HttpRequest::get(url)).await?;
                    serde_json::from_slice::<UserProfile>(&response.body).map_err(|e| {
                        AuthError::network(format!("invalid profile response: {e}"))
                    })
                },
                options,
            )
            .await
    }

    /// The signed-in user's photo as a `data:` URL (`GET me/photos/{size}/$value`).
    ///
    /// Sizes outside [`PhotoSize::SUPPORTED`] are sent as given.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] for an empty account id, or the
    /// token or network error when nothing usable is cached.
    pub async fn fetch_avatar(&self, account_id: &str, size: &PhotoSize) -> AuthResult<String> {
        require_account(account_id)?;
        if !size.is_supported() {
            tracing::debug!(%size, "requesting photo size outside the documented set");
        }
        let url = format!("{}/me/photos/{size}/$value", self.graph_base_url());
        let fetcher = self.clone();
        let options =
            CacheOptions::expiring_in_days(self.auth.config().photo_cache_duration_in_days);

        self.cache
            .cached_call(
                &self.avatar_key(account_id, size),
                move || async move {
                    let request = HttpRequest::get(url).response_type(ResponseType::Bytes);
                    let response = fetcher.get(request).await?;
                    let content_type = response
                        .content_type
                        .as_deref()
                        .unwrap_or(DEFAULT_PHOTO_CONTENT_TYPE);
                    Ok(data_url(content_type, &response.body))
                },
                options,
            )
            .await
    }

    async fn get(&self, mut request: HttpRequest) -> AuthResult<HttpResponse> {
        let scopes = self.auth.config().profile_scopes.clone();
        if let Some(token) = self
            .auth
            .acquire_token(AcquireTokenOptions::for_scopes(scopes))
            .await?
        {
            request = request.header("Authorization", token.authorization_header());
        }
        tracing::debug!(url = %request.url, "fetching from identity graph");
        self.http.send(request).await
    }

    fn graph_base_url(&self) -> &str {
        self.auth.config().graph_base_url.trim_end_matches('/')
    }
}

impl fmt::Debug for ProfileGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileGateway")
            .field("graph_base_url", &self.graph_base_url())
            .finish_non_exhaustive()
    }
}

fn require_account(account_id: &str) -> AuthResult<()> {
    if account_id.trim().is_empty() {
        return Err(AuthError::invalid_argument("account id is required"));
    }
    Ok(())
}

/// Encodes `bytes` as a self-contained `data:` URL.
fn data_url(content_type: &str, bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{content_type};base64,{encoded}")
}
