//! In-crate fakes for the ports, used by unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Notify;
use warden_domain::{
    Account, AuthError, AuthResult, InteractiveRequest, SilentRequest, TokenResult,
};

use crate::auth::{IdentityProvider, RedirectCallback};
use crate::ports::{Clock, HttpClient, HttpRequest, HttpResponse, KeyValueStore};

#[derive(Debug, Default)]
pub struct MapStore {
    entries: Mutex<HashMap<String, String>>,
    clears: AtomicUsize,
}

impl MapStore {
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for MapStore {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        Ok(self.raw(key))
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> AuthResult<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    fn clear(&self) -> AuthResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

pub fn token(access: &str) -> TokenResult {
    TokenResult::new(access).with_id_token(format!("id-{access}"))
}

/// Scripted identity provider. Unscripted silent and interactive calls fail.
#[derive(Default)]
pub struct FakeProvider {
    pub account: Mutex<Option<Account>>,
    pub cached: Mutex<Option<AuthResult<Option<TokenResult>>>>,
    pub silent_results: Mutex<VecDeque<AuthResult<TokenResult>>>,
    pub sso_results: Mutex<VecDeque<AuthResult<TokenResult>>>,
    pub popup_results: Mutex<VecDeque<AuthResult<TokenResult>>>,
    pub redirect_result: Mutex<Option<AuthResult<TokenResult>>>,
    pub redirect_callback: Mutex<Option<RedirectCallback>>,
    pub silent_gate: Mutex<Option<Arc<Notify>>>,
    pub popup_gate: Mutex<Option<Arc<Notify>>>,
    pub silent_calls: AtomicUsize,
    pub sso_calls: AtomicUsize,
    pub popup_calls: AtomicUsize,
    pub redirect_calls: AtomicUsize,
    pub cache_lookups: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub clear_cache_calls: AtomicUsize,
    pub login_in_progress: AtomicBool,
    pub acquire_in_progress: AtomicBool,
    pub callback_armed_before_redirect: AtomicBool,
    pub silent_requests: Mutex<Vec<SilentRequest>>,
    pub logout_redirects: Mutex<Vec<Option<String>>>,
}

impl FakeProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_account(self: Arc<Self>, account: Account) -> Arc<Self> {
        *self.account.lock().unwrap() = Some(account);
        self
    }

    pub fn push_silent(&self, result: AuthResult<TokenResult>) {
        self.silent_results.lock().unwrap().push_back(result);
    }

    pub fn push_sso(&self, result: AuthResult<TokenResult>) {
        self.sso_results.lock().unwrap().push_back(result);
    }

    pub fn push_popup(&self, result: AuthResult<TokenResult>) {
        self.popup_results.lock().unwrap().push_back(result);
    }

    pub fn set_cached(&self, result: AuthResult<Option<TokenResult>>) {
        *self.cached.lock().unwrap() = Some(result);
    }

    pub fn gate_silent(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.silent_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn gate_popup(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.popup_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn complete_redirect(&self, result: AuthResult<TokenResult>) {
        let callback = self.redirect_callback.lock().unwrap().take();
        if let Some(callback) = callback {
            callback(result);
        }
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    fn interaction_required() -> AuthError {
        AuthError::InteractionRequired {
            message: "no scripted result".to_string(),
        }
    }

    fn remember_account(&self, result: &AuthResult<TokenResult>) {
        if let Ok(token) = result
            && let Some(account) = &token.account
        {
            *self.account.lock().unwrap() = Some(account.clone());
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn get_account(&self) -> Option<Account> {
        self.account.lock().unwrap().clone()
    }

    async fn acquire_token_silent(&self, request: &SilentRequest) -> AuthResult<TokenResult> {
        self.silent_calls.fetch_add(1, Ordering::SeqCst);
        self.silent_requests.lock().unwrap().push(request.clone());
        let gate = self.silent_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let result = self
            .silent_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::interaction_required()));
        self.remember_account(&result);
        result
    }

    async fn sso_silent(&self, request: &SilentRequest) -> AuthResult<TokenResult> {
        self.sso_calls.fetch_add(1, Ordering::SeqCst);
        self.silent_requests.lock().unwrap().push(request.clone());
        let result = self
            .sso_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Self::interaction_required()));
        self.remember_account(&result);
        result
    }

    async fn login_redirect(&self, _request: &InteractiveRequest) -> AuthResult<()> {
        self.redirect_calls.fetch_add(1, Ordering::SeqCst);
        self.callback_armed_before_redirect.store(
            self.redirect_callback.lock().unwrap().is_some(),
            Ordering::SeqCst,
        );
        let scripted = self.redirect_result.lock().unwrap().take();
        if let Some(result) = scripted {
            self.remember_account(&result);
            self.complete_redirect(result);
        }
        Ok(())
    }

    async fn login_popup(&self, _request: &InteractiveRequest) -> AuthResult<TokenResult> {
        self.popup_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.popup_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let result = self
            .popup_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::authentication_failed("popup closed")));
        self.remember_account(&result);
        result
    }

    fn handle_redirect_callback(&self, callback: RedirectCallback) {
        *self.redirect_callback.lock().unwrap() = Some(callback);
    }

    async fn logout(&self, post_logout_redirect: Option<&str>) -> AuthResult<()> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.logout_redirects
            .lock()
            .unwrap()
            .push(post_logout_redirect.map(String::from));
        *self.account.lock().unwrap() = None;
        Ok(())
    }

    fn clear_cache(&self) {
        self.clear_cache_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn get_cached_token(&self, _request: &SilentRequest) -> AuthResult<Option<TokenResult>> {
        self.cache_lookups.fetch_add(1, Ordering::SeqCst);
        self.cached.lock().unwrap().clone().unwrap_or(Ok(None))
    }

    fn login_in_progress(&self) -> bool {
        self.login_in_progress.load(Ordering::SeqCst)
    }

    fn acquire_token_in_progress(&self) -> bool {
        self.acquire_in_progress.load(Ordering::SeqCst)
    }

    fn set_acquire_token_in_progress(&self, in_progress: bool) {
        self.acquire_in_progress.store(in_progress, Ordering::SeqCst);
    }
}

/// HTTP fake answering by URL prefix; records every request.
#[derive(Default)]
pub struct FakeHttp {
    pub responses: Mutex<Vec<(String, AuthResult<HttpResponse>)>>,
    pub requests: Mutex<Vec<HttpRequest>>,
}

impl FakeHttp {
    pub fn respond(&self, url_prefix: &str, response: AuthResult<HttpResponse>) {
        self.responses
            .lock()
            .unwrap()
            .push((url_prefix.to_string(), response));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn send(&self, request: HttpRequest) -> AuthResult<HttpResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .iter()
            .find(|(prefix, _)| request.url.starts_with(prefix))
            .map_or_else(
                || Err(AuthError::network(format!("no route for {}", request.url))),
                |(_, response)| response.clone(),
            )
    }
}
