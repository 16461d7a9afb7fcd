//! Authentication orchestrator.
//!
//! [`AuthService`] owns the identity provider handle, the session state and
//! the in-flight handles for silent acquisition and login. It is the only
//! writer of all three. Clones share the same underlying context.

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::oneshot;
use warden_domain::{
    AcquireTokenOptions, Account, AuthError, AuthResult, AuthorityConfig, IdTokenClaims,
    InteractiveRequest, LoginOptions, LoginType, SessionChanges, SessionState, SilentRequest,
    SsoOptions, TokenResult,
};

use super::provider::{IdentityProvider, token_preview};
use super::single_flight::{SharedResult, SingleFlight};
use crate::ports::{Clock, KeyValueStore};
use crate::session_store::SessionStore;

/// Explicitly constructed authentication context.
///
/// When built disabled, every operation short-circuits before touching the
/// provider and the user is always reported as authenticated.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<Inner>,
}

struct Inner {
    config: AuthorityConfig,
    disabled: bool,
    provider: Arc<dyn IdentityProvider>,
    auth_storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    session: SessionStore,
    silent_flight: SingleFlight<TokenResult>,
    login_flight: SingleFlight<SessionState>,
}

impl AuthService {
    /// Builds the authentication context.
    ///
    /// The initial state is derived from the provider: an existing account
    /// means authenticated, a login already being processed (for example a
    /// redirect returning) means authenticating. A redirect completion
    /// callback is armed so that such a login settles the state.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] if an enabled configuration
    /// lacks a tenant or client id.
    pub fn init(
        config: AuthorityConfig,
        provider: Arc<dyn IdentityProvider>,
        auth_storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        disabled: bool,
    ) -> AuthResult<Self> {
        if disabled {
            tracing::info!("authentication disabled, reporting every user as authenticated");
            return Ok(Self::from_parts(
                config,
                provider,
                auth_storage,
                clock,
                true,
                SessionState::disabled(),
            ));
        }

        config.validate()?;

        let authenticated = provider.get_account().is_some();
        let initial = SessionState {
            authenticated,
            authenticating: !authenticated && provider.login_in_progress(),
            error: None,
        };
        tracing::info!(
            authority = %config.authority(),
            authenticated = initial.authenticated,
            authenticating = initial.authenticating,
            "authentication initialized"
        );

        let service = Self::from_parts(config, provider, auth_storage, clock, false, initial);
        service.arm_redirect_callback();
        Ok(service)
    }

    fn from_parts(
        config: AuthorityConfig,
        provider: Arc<dyn IdentityProvider>,
        auth_storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        disabled: bool,
        initial: SessionState,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                disabled,
                provider,
                auth_storage,
                clock,
                session: SessionStore::new(initial),
                silent_flight: SingleFlight::new(),
                login_flight: SingleFlight::new(),
            }),
        }
    }

    fn arm_redirect_callback(&self) {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner
            .provider
            .handle_redirect_callback(Box::new(move |result| {
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                match result {
                    Ok(_) => {
                        tracing::info!("redirect login completed");
                        inner.session.reconcile(SessionChanges::succeeded());
                    }
                    Err(error) => {
                        tracing::warn!(%error, "redirect login failed");
                        inner.session.reconcile(SessionChanges::failed(error));
                    }
                }
            }));
    }

    /// The configuration this context was built with.
    #[must_use]
    pub fn config(&self) -> &AuthorityConfig {
        &self.inner.config
    }

    /// A copy of the current session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.session.state()
    }

    /// Registers a listener for session state changes.
    pub fn subscribe<F>(&self, callback: F) -> String
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.inner.session.subscribe(callback)
    }

    /// Removes a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: &str) -> bool {
        self.inner.session.unsubscribe(id)
    }

    /// True if authentication was disabled at init.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.inner.disabled
    }

    /// True if the user is signed in. Always true when disabled.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.disabled || self.state().authenticated
    }

    /// True while a login is in progress.
    #[must_use]
    pub fn is_authenticating(&self) -> bool {
        !self.inner.disabled && self.state().authenticating
    }

    /// Looks up a token in the provider's cache without network access.
    ///
    /// On a corrupted cache the whole auth storage is cleared before the
    /// error is returned, since corruption can affect every key in it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::CacheCorrupted`] if the provider cache cannot be parsed.
    pub fn acquire_token_in_cache(&self, scopes: &[String]) -> AuthResult<Option<TokenResult>> {
        if self.inner.disabled {
            return Ok(None);
        }

        let scopes = self.inner.config.scopes_or_default(scopes);
        let request = self.silent_request(scopes, None, false);
        match self.inner.provider.get_cached_token(&request) {
            Ok(token) => Ok(token),
            Err(error) if error.is_cache_corrupted() => {
                tracing::warn!(%error, "token cache corrupted, clearing auth storage");
                if let Err(clear_error) = self.inner.auth_storage.clear() {
                    tracing::warn!(error = %clear_error, "failed to clear auth storage");
                }
                Err(error)
            }
            Err(error) => Err(error),
        }
    }

    /// Acquires a token without user interaction.
    ///
    /// Concurrent calls share one provider request; every caller receives
    /// the same outcome. Returns `None` when disabled.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if silent acquisition fails.
    pub async fn acquire_token_silent(
        &self,
        request: SilentRequest,
    ) -> AuthResult<Option<TokenResult>> {
        if self.inner.disabled {
            return Ok(None);
        }
        self.silent(request).await.map(Some)
    }

    fn silent_request(
        &self,
        scopes: Vec<String>,
        login_hint: Option<String>,
        force_refresh: bool,
    ) -> SilentRequest {
        SilentRequest {
            scopes,
            login_hint,
            force_refresh,
            redirect_uri: Some(self.inner.config.token_refresh_uri.clone()),
        }
    }

    fn silent(&self, mut request: SilentRequest) -> SharedResult<TokenResult> {
        request.scopes = self.inner.config.scopes_or_default(&request.scopes);
        if request.redirect_uri.is_none() {
            request.redirect_uri = Some(self.inner.config.token_refresh_uri.clone());
        }
        let provider = Arc::clone(&self.inner.provider);
        self.inner.silent_flight.run(move || async move {
            let _progress = AcquireProgress::start(Arc::clone(&provider));
            tracing::debug!(scopes = ?request.scopes, force = request.force_refresh, "acquiring token silently");
            let result = provider.acquire_token_silent(&request).await;
            match &result {
                Ok(token) => tracing::debug!(
                    token = %token_preview(&token.access_token),
                    "silent token acquisition succeeded"
                ),
                Err(error) => tracing::debug!(%error, "silent token acquisition failed"),
            }
            result
        })
    }

    /// The high-level token getter.
    ///
    /// Unless a refresh is forced, a usable token from the provider cache is
    /// returned directly. Otherwise a silent acquisition runs; if that fails
    /// and interactive fallback is enabled, a login is started and silent
    /// acquisition is retried once after it succeeds. Returns `None` when
    /// disabled.
    ///
    /// # Errors
    ///
    /// Returns the login error, or the silent error when fallback is off.
    /// Errors are also recorded in the session state.
    pub async fn acquire_token(
        &self,
        options: AcquireTokenOptions,
    ) -> AuthResult<Option<TokenResult>> {
        if self.inner.disabled {
            return Ok(None);
        }

        let scopes = self.inner.config.scopes_or_default(&options.scopes);
        if !options.force_token_refresh {
            match self.acquire_token_in_cache(&scopes) {
                Ok(Some(token)) if self.is_usable(&token) => {
                    tracing::debug!("token served from provider cache");
                    return Ok(Some(token));
                }
                Ok(_) => {}
                Err(error) => tracing::debug!(%error, "cache lookup failed, acquiring silently"),
            }
        }

        let request = self.silent_request(
            scopes.clone(),
            options.login_hint.clone(),
            options.force_token_refresh,
        );
        let error = match self.silent(request.clone()).await {
            Ok(token) => return Ok(Some(token)),
            Err(error) => error,
        };

        let fallback = options
            .interactive_fallback
            .unwrap_or(self.inner.config.interactive_fallback);
        if !fallback {
            return Err(self.record_failure(error));
        }

        tracing::info!(%error, "silent token acquisition failed, starting interactive login");
        self.login(LoginOptions {
            scopes,
            login_hint: options.login_hint,
            force_token_refresh: true,
            ..LoginOptions::default()
        })
        .await?;

        match self.silent(request).await {
            Ok(token) => Ok(Some(token)),
            Err(error) => Err(self.record_failure(error)),
        }
    }

    fn is_usable(&self, token: &TokenResult) -> bool {
        token.has_tokens()
            && !token.is_expired_or_expiring(
                self.inner.clock.now(),
                self.inner.config.token_renewal_offset(),
            )
    }

    /// Signs the user in.
    ///
    /// Resolves immediately with the current state if already signed in and
    /// no refresh is forced. Otherwise a silent acquisition is tried first
    /// and the interactive flow selected by `login_type` runs only if that
    /// fails. Concurrent callers share one login and its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::AuthenticationFailed`] or the provider's error
    /// when the interactive flow fails.
    pub async fn login(&self, options: LoginOptions) -> AuthResult<SessionState> {
        if self.inner.disabled {
            return Ok(self.state());
        }
        if !options.force_token_refresh && self.state().authenticated {
            return Ok(self.state());
        }

        let service = self.clone();
        self.inner
            .login_flight
            .run(move || async move { service.run_login(options).await })
            .await
    }

    async fn run_login(&self, options: LoginOptions) -> AuthResult<SessionState> {
        let scopes = self.inner.config.scopes_or_default(&options.scopes);
        tracing::info!(login_type = ?options.login_type, "login started");
        self.inner.session.reconcile(SessionChanges::started());

        let silent = self
            .silent(self.silent_request(
                scopes.clone(),
                options.login_hint.clone(),
                options.force_token_refresh,
            ))
            .await;

        let outcome = match silent {
            Ok(_) => Ok(()),
            Err(error) => {
                tracing::debug!(%error, "silent login failed, starting interactive flow");
                let request = InteractiveRequest {
                    scopes,
                    login_hint: options.login_hint,
                    redirect_uri: Some(self.inner.config.login_action_redirect.clone()),
                    navigate_to_request: self.inner.config.navigate_to_request_after_login,
                };
                self.interactive(options.login_type, &request).await
            }
        };

        match outcome {
            Ok(()) => {
                tracing::info!("login succeeded");
                Ok(self.inner.session.reconcile(SessionChanges::succeeded()))
            }
            Err(error) => {
                tracing::warn!(%error, "login failed");
                self.inner
                    .session
                    .reconcile(SessionChanges::failed(error.clone()));
                Err(error)
            }
        }
    }

    async fn interactive(
        &self,
        login_type: LoginType,
        request: &InteractiveRequest,
    ) -> AuthResult<()> {
        let provider = &self.inner.provider;
        match login_type {
            LoginType::Popup => provider.login_popup(request).await.map(|_| ()),
            LoginType::Redirect => {
                // armed before the redirect starts so an immediate return is not lost
                let (tx, rx) = oneshot::channel();
                provider.handle_redirect_callback(Box::new(move |result| {
                    let _ = tx.send(result);
                }));
                provider.login_redirect(request).await?;
                rx.await
                    .map_err(|_| AuthError::authentication_failed("redirect flow was abandoned"))?
                    .map(|_| ())
            }
        }
    }

    /// Attempts silent single-sign-on, falling back to a forced login.
    ///
    /// # Errors
    ///
    /// Returns the login error if the fallback login fails.
    pub async fn sso(&self, options: SsoOptions) -> AuthResult<SessionState> {
        if self.inner.disabled {
            return Ok(self.state());
        }

        let scopes = self.inner.config.scopes_or_default(&options.scopes);
        self.inner.session.reconcile(SessionChanges::started());
        let request = self.silent_request(scopes.clone(), options.login_hint.clone(), false);
        match self.inner.provider.sso_silent(&request).await {
            Ok(_) => {
                tracing::info!("single sign-on succeeded");
                Ok(self.inner.session.reconcile(SessionChanges::succeeded()))
            }
            Err(error) => {
                tracing::debug!(%error, "single sign-on failed, falling back to login");
                self.login(LoginOptions {
                    scopes,
                    login_hint: options.login_hint,
                    force_token_refresh: true,
                    ..LoginOptions::default()
                })
                .await
            }
        }
    }

    /// Signs the user out and resets the session state.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if logout fails.
    pub async fn logout(&self) -> AuthResult<()> {
        if self.inner.disabled {
            return Ok(());
        }
        let post_logout_redirect = self.inner.config.logout_action_redirect.as_deref();
        if let Err(error) = self.inner.provider.logout(post_logout_redirect).await {
            return Err(self.record_failure(error));
        }
        tracing::info!("logged out");
        self.inner.session.reconcile(
            SessionChanges::new()
                .authenticated(false)
                .authenticating(false)
                .clear_error(),
        );
        Ok(())
    }

    /// Drops the provider's token cache and the persisted auth storage.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the auth storage cannot be cleared.
    pub fn clear_cache(&self) -> AuthResult<()> {
        if self.inner.disabled {
            return Ok(());
        }
        self.inner.provider.clear_cache();
        self.inner.auth_storage.clear()
    }

    /// The signed-in account. `None` when disabled or signed out.
    #[must_use]
    pub fn get_account(&self) -> Option<Account> {
        if self.inner.disabled {
            return None;
        }
        self.inner.provider.get_account()
    }

    /// Object id of the signed-in user.
    #[must_use]
    pub fn get_id(&self) -> Option<String> {
        self.get_account().map(|account| account.local_account_id)
    }

    /// Sign-in name of the signed-in user.
    #[must_use]
    pub fn get_user_name(&self) -> Option<String> {
        self.get_account().map(|account| account.username)
    }

    /// Display name, from the account or the `name` claim.
    #[must_use]
    pub fn get_name(&self) -> Option<String> {
        let account = self.get_account()?;
        account.name.or_else(|| {
            account
                .id_token_claims
                .as_ref()
                .and_then(|claims| claims.get_str("name"))
                .map(String::from)
        })
    }

    /// E-mail address from the `email` or `preferred_username` claim.
    #[must_use]
    pub fn get_email(&self) -> Option<String> {
        let claims = self.get_claims()?;
        claims
            .get_str("email")
            .or_else(|| claims.get_str("preferred_username"))
            .map(String::from)
    }

    /// Identity token claims of the signed-in user.
    #[must_use]
    pub fn get_claims(&self) -> Option<IdTokenClaims> {
        self.get_account()
            .and_then(|account| account.id_token_claims)
    }

    /// Roles assigned to the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingClaim`] if the token has no `roles`
    /// entry. Callers should read that as "no roles assigned".
    pub fn get_roles(&self) -> AuthResult<Vec<String>> {
        self.get_claims()
            .and_then(|claims| claims.roles())
            .ok_or_else(|| AuthError::missing_claim("roles"))
    }

    fn record_failure(&self, error: AuthError) -> AuthError {
        self.inner
            .session
            .reconcile(SessionChanges::new().error(error.clone()));
        error
    }
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("authority", &self.inner.config.authority())
            .field("disabled", &self.inner.disabled)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Keeps the provider's acquire-in-progress flag set for its lifetime.
struct AcquireProgress {
    provider: Arc<dyn IdentityProvider>,
}

impl AcquireProgress {
    fn start(provider: Arc<dyn IdentityProvider>) -> Self {
        // acquisitions never overlap here, so a set flag was left behind by an earlier flow
        if provider.acquire_token_in_progress() {
            tracing::warn!("provider reports a stale token acquisition, taking it over");
        }
        provider.set_acquire_token_in_progress(true);
        Self { provider }
    }
}

impl Drop for AcquireProgress {
    fn drop(&mut self) {
        self.provider.set_acquire_token_in_progress(false);
    }
}
