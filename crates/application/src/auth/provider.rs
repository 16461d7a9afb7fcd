//! Identity provider port.
//!
//! The provider SDK owns the protocol: redirects, hidden frames, token
//! formats and its own token cache. The session manager only drives it
//! through this trait.

use async_trait::async_trait;
use warden_domain::{Account, AuthResult, InteractiveRequest, SilentRequest, TokenResult};

/// Callback invoked once when a redirect flow completes.
pub type RedirectCallback = Box<dyn FnOnce(AuthResult<TokenResult>) + Send>;

/// Capability surface of the identity provider SDK.
///
/// Implementations must be cheap to call concurrently; the session manager
/// guarantees it never overlaps two silent acquisitions or two logins.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The account currently known to the provider, if any.
    fn get_account(&self) -> Option<Account>;

    /// Acquire a token without user interaction (cache or hidden refresh).
    ///
    /// # Errors
    ///
    /// Any error means the caller should fall back to an interactive flow.
    async fn acquire_token_silent(&self, request: &SilentRequest) -> AuthResult<TokenResult>;

    /// Attempt single-sign-on without user interaction.
    ///
    /// # Errors
    ///
    /// Any error means the caller should fall back to an interactive flow.
    async fn sso_silent(&self, request: &SilentRequest) -> AuthResult<TokenResult>;

    /// Start a redirect login. Completion is reported through the callback
    /// registered with [`handle_redirect_callback`](Self::handle_redirect_callback).
    ///
    /// # Errors
    ///
    /// Returns an error if the redirect could not be started.
    async fn login_redirect(&self, request: &InteractiveRequest) -> AuthResult<()>;

    /// Run a popup login to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the popup was blocked, closed or rejected.
    async fn login_popup(&self, request: &InteractiveRequest) -> AuthResult<TokenResult>;

    /// Register the callback invoked when a redirect flow completes.
    /// A later registration replaces an earlier one.
    fn handle_redirect_callback(&self, callback: RedirectCallback);

    /// Sign the user out, returning to `post_logout_redirect` afterwards.
    /// `None` means the current origin.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider could not end the session.
    async fn logout(&self, post_logout_redirect: Option<&str>) -> AuthResult<()>;

    /// Drop the provider's in-memory and persisted token cache.
    fn clear_cache(&self);

    /// Look up a token in the provider's own cache without any network access.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CacheCorrupted`](warden_domain::AuthError::CacheCorrupted)
    /// if the persisted cache cannot be parsed.
    fn get_cached_token(&self, request: &SilentRequest) -> AuthResult<Option<TokenResult>>;

    /// True while the provider is processing a login (e.g. returning from a redirect).
    fn login_in_progress(&self) -> bool;

    /// True while the provider is processing a token acquisition.
    fn acquire_token_in_progress(&self) -> bool;

    /// Mark a token acquisition as started or finished.
    fn set_acquire_token_in_progress(&self, in_progress: bool);
}

/// Get a preview of a token for logging (first 8 chars + ...).
#[must_use]
pub fn token_preview(token: &str) -> String {
    if token.len() > 12 {
        format!("{}...", token.get(..8).unwrap_or_default())
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_preview() {
        assert_eq!(token_preview("abcdefghijklmnop"), "abcdefgh...");
        assert_eq!(token_preview("short"), "***");
    }
}
