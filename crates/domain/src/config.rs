//! Authority configuration.
//!
//! Built once at start-up and held unchanged for the lifetime of the
//! session manager. Field names accept both `snake_case` and the `camelCase`
//! spelling used by browser-side configuration files.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Identity provider and cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityConfig {
    /// Directory tenant. Required; see [`AuthorityConfig::validate`].
    #[serde(default, alias = "tenantId")]
    pub tenant_id: String,

    /// Application (client) id registered with the provider. Required.
    #[serde(default, alias = "clientId")]
    pub client_id: String,

    /// Where the provider returns after login.
    #[serde(default = "default_login_action_redirect", alias = "loginActionRedirect")]
    pub login_action_redirect: String,

    /// Where the provider returns after logout. `None` means the current origin.
    #[serde(default, alias = "logoutActionRedirect")]
    pub logout_action_redirect: Option<String>,

    /// Redirect URI used by hidden-frame token renewal.
    #[serde(default = "default_token_refresh_uri", alias = "tokenRefreshUri")]
    pub token_refresh_uri: String,

    /// Seconds before expiry at which a cached token is treated as stale.
    #[serde(
        default = "default_token_renewal_offset_seconds",
        alias = "tokenRenewalOffset",
        alias = "tokenRenewalOffsetSeconds"
    )]
    pub token_renewal_offset_seconds: u32,

    /// Return to the originally requested URL after a redirect login.
    #[serde(
        default = "default_navigate_to_request_after_login",
        alias = "navigateToRequestAfterLogin"
    )]
    pub navigate_to_request_after_login: bool,

    /// Days a cached profile stays fresh.
    #[serde(
        default = "default_info_cache_duration_in_days",
        alias = "infoCacheDurationInDays"
    )]
    pub info_cache_duration_in_days: u32,

    /// Days a cached avatar stays fresh.
    #[serde(
        default = "default_photo_cache_duration_in_days",
        alias = "photoCacheDurationInDays"
    )]
    pub photo_cache_duration_in_days: u32,

    /// Login host; the authority is `<host>/<tenant_id>`.
    #[serde(default = "default_authority_host", alias = "authorityHost")]
    pub authority_host: String,

    /// Base URL of the identity graph REST surface.
    #[serde(default = "default_graph_base_url", alias = "graphBaseUrl")]
    pub graph_base_url: String,

    /// Scopes requested when the caller gives none.
    #[serde(default = "default_profile_scopes", alias = "profileScopes")]
    pub profile_scopes: Vec<String>,

    /// Prefix of every persistent cache key.
    #[serde(default = "default_cache_namespace", alias = "cacheNamespace")]
    pub cache_namespace: String,

    /// Start an interactive login when silent token acquisition fails.
    #[serde(default = "default_interactive_fallback", alias = "interactiveFallback")]
    pub interactive_fallback: bool,
}

fn default_login_action_redirect() -> String {
    "/".to_string()
}

fn default_token_refresh_uri() -> String {
    "/auth".to_string()
}

const fn default_token_renewal_offset_seconds() -> u32 {
    120
}

const fn default_navigate_to_request_after_login() -> bool {
    true
}

const fn default_info_cache_duration_in_days() -> u32 {
    1
}

const fn default_photo_cache_duration_in_days() -> u32 {
    3
}

fn default_authority_host() -> String {
    "https://login.microsoftonline.com".to_string()
}

fn default_graph_base_url() -> String {
    "https://graph.microsoft.com/v1.0".to_string()
}

fn default_profile_scopes() -> Vec<String> {
    vec!["User.Read".to_string()]
}

fn default_cache_namespace() -> String {
    "warden".to_string()
}

const fn default_interactive_fallback() -> bool {
    true
}

impl AuthorityConfig {
    /// Creates a configuration with defaults for everything but the identifiers.
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            login_action_redirect: default_login_action_redirect(),
            logout_action_redirect: None,
            token_refresh_uri: default_token_refresh_uri(),
            token_renewal_offset_seconds: default_token_renewal_offset_seconds(),
            navigate_to_request_after_login: default_navigate_to_request_after_login(),
            info_cache_duration_in_days: default_info_cache_duration_in_days(),
            photo_cache_duration_in_days: default_photo_cache_duration_in_days(),
            authority_host: default_authority_host(),
            graph_base_url: default_graph_base_url(),
            profile_scopes: default_profile_scopes(),
            cache_namespace: default_cache_namespace(),
            interactive_fallback: default_interactive_fallback(),
        }
    }

    /// The authority URL, `<authority_host>/<tenant_id>`.
    #[must_use]
    pub fn authority(&self) -> String {
        format!(
            "{}/{}",
            self.authority_host.trim_end_matches('/'),
            self.tenant_id
        )
    }

    /// Token renewal offset as a duration.
    #[must_use]
    pub fn token_renewal_offset(&self) -> Duration {
        Duration::seconds(i64::from(self.token_renewal_offset_seconds))
    }

    /// Returns `scopes` unless empty, in which case the configured profile scopes.
    #[must_use]
    pub fn scopes_or_default(&self, scopes: &[String]) -> Vec<String> {
        if scopes.is_empty() {
            self.profile_scopes.clone()
        } else {
            scopes.to_vec()
        }
    }

    /// Checks that the identifiers are present.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidArgument`] if `tenant_id` or `client_id` is blank.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.tenant_id.trim().is_empty() {
            return Err(AuthError::invalid_argument("tenant_id is required"));
        }
        if self.client_id.trim().is_empty() {
            return Err(AuthError::invalid_argument("client_id is required"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_config() {
        let config = AuthorityConfig::new("contoso", "app-id");
        assert_eq!(config.login_action_redirect, "/");
        assert_eq!(config.logout_action_redirect, None);
        assert_eq!(config.token_refresh_uri, "/auth");
        assert_eq!(config.token_renewal_offset(), Duration::seconds(120));
        assert!(config.navigate_to_request_after_login);
        assert_eq!(config.info_cache_duration_in_days, 1);
        assert_eq!(config.photo_cache_duration_in_days, 3);
        assert_eq!(
            config.authority(),
            "https://login.microsoftonline.com/contoso"
        );
    }

    #[test]
    fn deserializes_camel_case_with_defaults() {
        let config: AuthorityConfig = serde_json::from_str(
            r#"{"tenantId": "t", "clientId": "c", "photoCacheDurationInDays": 7}"#,
        )
        .unwrap();
        assert_eq!(config.tenant_id, "t");
        assert_eq!(config.photo_cache_duration_in_days, 7);
        assert_eq!(config, {
            let mut expected = AuthorityConfig::new("t", "c");
            expected.photo_cache_duration_in_days = 7;
            expected
        });
    }

    #[test]
    fn validate_rejects_blank_identifiers() {
        assert!(AuthorityConfig::new("t", "c").validate().is_ok());
        assert!(matches!(
            AuthorityConfig::new("t", " ").validate(),
            Err(AuthError::InvalidArgument { .. })
        ));
        assert!(AuthorityConfig::new("", "c").validate().is_err());
    }

    #[test]
    fn scopes_fall_back_to_profile_scopes() {
        let config = AuthorityConfig::new("t", "c");
        assert_eq!(config.scopes_or_default(&[]), vec!["User.Read".to_string()]);
        let custom = vec!["Mail.Read".to_string()];
        assert_eq!(config.scopes_or_default(&custom), custom);
    }
}
