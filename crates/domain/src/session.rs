//! Session state shared with every observer.
//!
//! The state is a small fixed record. Partial updates are expressed as a
//! [`SessionChanges`] and merged field by field so that a no-op update can be
//! detected and its broadcast suppressed.

use serde::{Deserialize, Serialize};

use crate::AuthError;

/// Authentication status as seen by the UI.
///
/// - `authenticating`: show a loading affordance
/// - `authenticated`: the user is signed in
/// - `error` with `authenticated == false`: show a failure or retry affordance
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// The user has a valid session.
    pub authenticated: bool,
    /// A login or silent acquisition is in progress.
    pub authenticating: bool,
    /// The last failure, kept until a transition clears it.
    #[serde(skip)]
    pub error: Option<AuthError>,
}

impl SessionState {
    /// State reported while authentication is disabled.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            authenticated: true,
            authenticating: false,
            error: None,
        }
    }

    /// Merges `changes` into a copy of this state.
    ///
    /// Returns `None` when no field differs, so callers can skip notifying.
    #[must_use]
    pub fn merge(&self, changes: &SessionChanges) -> Option<Self> {
        let mut next = self.clone();
        let mut changed = false;

        if let Some(authenticated) = changes.authenticated
            && authenticated != next.authenticated
        {
            next.authenticated = authenticated;
            changed = true;
        }
        if let Some(authenticating) = changes.authenticating
            && authenticating != next.authenticating
        {
            next.authenticating = authenticating;
            changed = true;
        }
        if let Some(error) = &changes.error
            && *error != next.error
        {
            next.error.clone_from(error);
            changed = true;
        }

        changed.then_some(next)
    }
}

/// A partial update to [`SessionState`]. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionChanges {
    /// New value for `authenticated`.
    pub authenticated: Option<bool>,
    /// New value for `authenticating`.
    pub authenticating: Option<bool>,
    /// New value for `error`; `Some(None)` clears it.
    pub error: Option<Option<AuthError>>,
}

impl SessionChanges {
    /// An empty change set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            authenticated: None,
            authenticating: None,
            error: None,
        }
    }

    /// Sets `authenticated`.
    #[must_use]
    pub const fn authenticated(mut self, value: bool) -> Self {
        self.authenticated = Some(value);
        self
    }

    /// Sets `authenticating`.
    #[must_use]
    pub const fn authenticating(mut self, value: bool) -> Self {
        self.authenticating = Some(value);
        self
    }

    /// Records a failure.
    #[must_use]
    pub fn error(mut self, error: AuthError) -> Self {
        self.error = Some(Some(error));
        self
    }

    /// Clears any recorded failure.
    #[must_use]
    pub fn clear_error(mut self) -> Self {
        self.error = Some(None);
        self
    }

    /// A login started.
    #[must_use]
    pub fn started() -> Self {
        Self::new().authenticating(true).clear_error()
    }

    /// A login completed successfully.
    #[must_use]
    pub fn succeeded() -> Self {
        Self::new()
            .authenticating(false)
            .authenticated(true)
            .clear_error()
    }

    /// A login failed.
    #[must_use]
    pub fn failed(error: AuthError) -> Self {
        Self::new().authenticating(false).error(error)
    }
}
