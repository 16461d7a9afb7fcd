//! UI-facing bindings.
//!
//! [`AuthBindings`] is the surface a view layer talks to: it is created empty,
//! initialized once, and then forwards to the [`AuthService`] and
//! [`ProfileGateway`] it built. Every call before [`AuthBindings::init`]
//! fails with [`AuthError::NotInitialized`].

use std::fmt;
use std::sync::{Arc, OnceLock};

use warden_domain::{
    AcquireTokenOptions, AuthError, AuthResult, AuthorityConfig, LoginOptions, PhotoSize,
    SessionState, TokenResult, UserProfile,
};

use crate::auth::{AuthService, IdentityProvider};
use crate::cache::PersistentCache;
use crate::ports::{Clock, HttpClient, KeyValueStore};
use crate::profile::ProfileGateway;

/// External collaborators the bindings wire together at init.
#[derive(Clone)]
pub struct Collaborators {
    /// Identity provider SDK.
    pub provider: Arc<dyn IdentityProvider>,
    /// HTTP client for the identity graph.
    pub http: Arc<dyn HttpClient>,
    /// Storage backing the provider's token cache; wiped on corruption.
    pub auth_storage: Arc<dyn KeyValueStore>,
    /// Storage backing profile and photo caching.
    pub cache_storage: Arc<dyn KeyValueStore>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

struct Bound {
    auth: AuthService,
    profiles: ProfileGateway,
}

/// Lazily initialized facade over the session manager.
#[derive(Default)]
pub struct AuthBindings {
    bound: OnceLock<Bound>,
}

impl AuthBindings {
    /// Creates uninitialized bindings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bound: OnceLock::new(),
        }
    }

    /// Builds the auth context and profile gateway.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] if already initialized or if
    /// the configuration is invalid.
    pub fn init(
        &self,
        config: AuthorityConfig,
        disabled: bool,
        collaborators: Collaborators,
    ) -> AuthResult<()> {
        if self.bound.get().is_some() {
            return Err(AuthError::invalid_argument("auth bindings already initialized"));
        }

        let auth = AuthService::init(
            config,
            collaborators.provider,
            collaborators.auth_storage,
            Arc::clone(&collaborators.clock),
            disabled,
        )?;
        let cache = PersistentCache::new(collaborators.cache_storage, collaborators.clock);
        let profiles = ProfileGateway::new(auth.clone(), collaborators.http, cache);

        self.bound
            .set(Bound { auth, profiles })
            .map_err(|_| AuthError::invalid_argument("auth bindings already initialized"))
    }

    /// True once [`init`](Self::init) has succeeded.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.bound.get().is_some()
    }

    fn bound(&self) -> AuthResult<&Bound> {
        self.bound.get().ok_or(AuthError::NotInitialized)
    }

    /// The underlying auth context.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotInitialized`] before init.
    pub fn service(&self) -> AuthResult<&AuthService> {
        self.bound().map(|bound| &bound.auth)
    }

    /// The current session state.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotInitialized`] before init.
    pub fn state(&self) -> AuthResult<SessionState> {
        self.service().map(AuthService::state)
    }

    /// Registers a state listener and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotInitialized`] before init.
    pub fn subscribe<F>(&self, callback: F) -> AuthResult<String>
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        Ok(self.service()?.subscribe(callback))
    }

    /// Removes a state listener. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotInitialized`] before init.
    pub fn unsubscribe(&self, id: &str) -> AuthResult<bool> {
        Ok(self.service()?.unsubscribe(id))
    }

    /// Registers a state listener that is removed when the guard drops.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotInitialized`] before init.
    pub fn watch<F>(&self, callback: F) -> AuthResult<SubscriptionGuard>
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        let service = self.service()?;
        let id = service.subscribe(callback);
        Ok(SubscriptionGuard {
            service: service.clone(),
            id,
        })
    }

    /// See [`AuthService::login`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotInitialized`] before init, or the login error.
    pub async fn login(&self, options: LoginOptions) -> AuthResult<SessionState> {
        self.service()?.login(options).await
    }

    /// See [`AuthService::logout`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotInitialized`] before init, or the provider error.
    pub async fn logout(&self) -> AuthResult<()> {
        self.service()?.logout().await
    }

    /// See [`AuthService::acquire_token`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotInitialized`] before init, or the token error.
    pub async fn acquire_token(
        &self,
        options: AcquireTokenOptions,
    ) -> AuthResult<Option<TokenResult>> {
        self.service()?.acquire_token(options).await
    }

    /// See [`ProfileGateway::fetch_profile`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotInitialized`] before init, or the fetch error.
    pub async fn fetch_profile(&self, account_id: &str) -> AuthResult<UserProfile> {
        self.bound()?.profiles.fetch_profile(account_id).await
    }

    /// See [`ProfileGateway::fetch_avatar`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotInitialized`] before init, or the fetch error.
    pub async fn fetch_avatar(&self, account_id: &str, size: &PhotoSize) -> AuthResult<String> {
        self.bound()?.profiles.fetch_avatar(account_id, size).await
    }
}

impl fmt::Debug for AuthBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthBindings")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Unsubscribes its listener on drop.
#[must_use = "dropping the guard unsubscribes immediately"]
pub struct SubscriptionGuard {
    service: AuthService,
    id: String,
}

impl SubscriptionGuard {
    /// Subscription id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("id", &self.id)
            .finish()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.service.unsubscribe(&self.id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::testing::{FakeHttp, FakeProvider, FixedClock, MapStore, token};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use warden_domain::Account;

    fn collaborators(provider: Arc<FakeProvider>) -> Collaborators {
        Collaborators {
            provider,
            http: Arc::new(FakeHttp::default()),
            auth_storage: Arc::new(MapStore::default()),
            cache_storage: Arc::new(MapStore::default()),
            clock: Arc::new(FixedClock::new(Utc::now())),
        }
    }

    #[tokio::test]
    async fn test_every_call_fails_before_init() {
        let bindings = AuthBindings::new();

        assert!(!bindings.is_initialized());
        assert_eq!(bindings.state(), Err(AuthError::NotInitialized));
        assert_eq!(bindings.subscribe(|_| {}), Err(AuthError::NotInitialized));
        assert_eq!(bindings.unsubscribe("x"), Err(AuthError::NotInitialized));
        assert!(matches!(bindings.watch(|_| {}), Err(AuthError::NotInitialized)));
        assert_eq!(
            bindings.login(LoginOptions::default()).await,
            Err(AuthError::NotInitialized)
        );
        assert_eq!(bindings.logout().await, Err(AuthError::NotInitialized));
        assert_eq!(
            bindings.acquire_token(AcquireTokenOptions::default()).await,
            Err(AuthError::NotInitialized)
        );
        assert_eq!(
            bindings.fetch_avatar("user-1", &PhotoSize::S48).await,
            Err(AuthError::NotInitialized)
        );
    }

    #[test]
    fn test_second_init_rejected() {
        let bindings = AuthBindings::new();
        let config = AuthorityConfig::new("tenant", "client");
        bindings
            .init(config.clone(), false, collaborators(FakeProvider::new()))
            .unwrap();

        let again = bindings.init(config, false, collaborators(FakeProvider::new()));
        assert!(matches!(again, Err(AuthError::InvalidArgument { .. })));
        assert!(bindings.is_initialized());
    }

    #[tokio::test]
    async fn test_watch_guard_unsubscribes_on_drop() {
        let provider = FakeProvider::new();
        provider.push_popup(Ok(token("popup").with_account(Account::new("u", "t", "n"))));
        let bindings = AuthBindings::new();
        bindings
            .init(
                AuthorityConfig::new("tenant", "client"),
                false,
                collaborators(provider),
            )
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&calls);
        let guard = bindings
            .watch(move |_| {
                sink.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let last = Arc::new(Mutex::new(None));
        let last_sink = Arc::clone(&last);
        bindings
            .subscribe(move |state| *last_sink.lock().unwrap() = Some(state.clone()))
            .unwrap();

        bindings.login(LoginOptions::popup()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        drop(guard);
        bindings.logout().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            last.lock().unwrap().as_ref().map(|s| s.authenticated),
            Some(false)
        );
    }
}
