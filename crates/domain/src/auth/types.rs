//! Account, token and request types exchanged with the identity provider.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Claims embedded in an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdTokenClaims(BTreeMap<String, Value>);

impl IdTokenClaims {
    /// Creates claims from a map of claim names to values.
    #[must_use]
    pub const fn new(claims: BTreeMap<String, Value>) -> Self {
        Self(claims)
    }

    /// Builder-style insertion of a single claim.
    #[must_use]
    pub fn with_claim(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// Returns the raw claim value, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Returns a claim as a string slice, if present and a string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Returns the `roles` claim, or `None` when the token carries no roles entry.
    #[must_use]
    pub fn roles(&self) -> Option<Vec<String>> {
        let roles = self.0.get("roles")?.as_array()?;
        Some(
            roles
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect(),
        )
    }

    /// Returns true if no claims are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying claim map.
    #[must_use]
    pub const fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.0
    }
}

/// The signed-in account as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account identifier across tenants.
    pub home_account_id: String,
    /// Object identifier of the user within the tenant.
    pub local_account_id: String,
    /// Tenant the account signed into.
    pub tenant_id: String,
    /// Sign-in name, usually the UPN or e-mail.
    pub username: String,
    /// Display name, if the provider reported one.
    #[serde(default)]
    pub name: Option<String>,
    /// Claims of the identity token that established the session.
    #[serde(default)]
    pub id_token_claims: Option<IdTokenClaims>,
}

impl Account {
    /// Creates an account with no display name or claims.
    #[must_use]
    pub fn new(
        local_account_id: impl Into<String>,
        tenant_id: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        let local_account_id = local_account_id.into();
        let tenant_id = tenant_id.into();
        Self {
            home_account_id: format!("{local_account_id}.{tenant_id}"),
            local_account_id,
            tenant_id,
            username: username.into(),
            name: None,
            id_token_claims: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the identity token claims.
    #[must_use]
    pub fn with_claims(mut self, claims: IdTokenClaims) -> Self {
        self.id_token_claims = Some(claims);
        self
    }
}

/// Outcome of a successful token acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResult {
    /// The access token.
    pub access_token: String,
    /// The raw identity token, when one was issued or cached.
    #[serde(default)]
    pub id_token: Option<String>,
    /// Scopes granted to the access token.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// When the access token expires, if known.
    #[serde(default)]
    pub expires_on: Option<DateTime<Utc>>,
    /// The account the token was issued for.
    #[serde(default)]
    pub account: Option<Account>,
    /// True if the token was served from the provider cache.
    #[serde(default)]
    pub from_cache: bool,
}

impl TokenResult {
    /// Creates a result carrying only an access token.
    #[must_use]
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            id_token: None,
            scopes: Vec::new(),
            expires_on: None,
            account: None,
            from_cache: false,
        }
    }

    /// Sets the identity token.
    #[must_use]
    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    /// Sets the expiry.
    #[must_use]
    pub const fn with_expires_on(mut self, expires_on: DateTime<Utc>) -> Self {
        self.expires_on = Some(expires_on);
        self
    }

    /// Sets the account.
    #[must_use]
    pub fn with_account(mut self, account: Account) -> Self {
        self.account = Some(account);
        self
    }

    /// True if both an access token and an identity token are present.
    #[must_use]
    pub fn has_tokens(&self) -> bool {
        !self.access_token.is_empty() && self.id_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Check if the token is expired or will expire within `renewal_offset` of `now`.
    #[must_use]
    pub fn is_expired_or_expiring(&self, now: DateTime<Utc>, renewal_offset: Duration) -> bool {
        self.expires_on
            .is_some_and(|expires_on| now + renewal_offset >= expires_on)
    }

    /// Returns the Authorization header value.
    #[must_use]
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

/// Interactive flow variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginType {
    /// Full-page redirect to the identity provider.
    #[default]
    Redirect,
    /// Popup window.
    Popup,
}

/// Request passed to the provider's silent and cache lookups.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SilentRequest {
    /// Scopes requested for the access token.
    pub scopes: Vec<String>,
    /// Account hint for the provider.
    pub login_hint: Option<String>,
    /// Skip the provider cache and go to the network.
    pub force_refresh: bool,
    /// Redirect URI for hidden-frame renewal.
    pub redirect_uri: Option<String>,
}

/// Request passed to the provider's interactive flows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InteractiveRequest {
    /// Scopes requested for the access token.
    pub scopes: Vec<String>,
    /// Account hint for the provider.
    pub login_hint: Option<String>,
    /// Where the provider returns after a redirect flow.
    pub redirect_uri: Option<String>,
    /// Whether to navigate back to the original request URL after login.
    pub navigate_to_request: bool,
}

/// Options for an interactive login.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginOptions {
    /// Interactive flow variant.
    pub login_type: LoginType,
    /// Scopes requested; empty means the configured profile scopes.
    pub scopes: Vec<String>,
    /// Account hint for the provider.
    pub login_hint: Option<String>,
    /// Run the flow even if a session already exists.
    pub force_token_refresh: bool,
}

impl LoginOptions {
    /// Popup login with default scopes.
    #[must_use]
    pub fn popup() -> Self {
        Self {
            login_type: LoginType::Popup,
            ..Self::default()
        }
    }
}

/// Options for token acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AcquireTokenOptions {
    /// Scopes requested; empty means the configured profile scopes.
    pub scopes: Vec<String>,
    /// Account hint for the provider.
    pub login_hint: Option<String>,
    /// Bypass the cache lookup and force a network refresh.
    pub force_token_refresh: bool,
    /// Start an interactive login when silent acquisition fails.
    /// `None` defers to the configured default.
    pub interactive_fallback: Option<bool>,
}

impl AcquireTokenOptions {
    /// Options for the given scopes.
    #[must_use]
    pub fn for_scopes<I, S>(scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scopes: scopes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Options for silent single-sign-on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SsoOptions {
    /// Scopes requested; empty means the configured profile scopes.
    pub scopes: Vec<String>,
    /// Account hint for the provider.
    pub login_hint: Option<String>,
}
