//! Session state store.

use std::sync::{Mutex, PoisonError, RwLock};

use warden_domain::{SessionChanges, SessionState};

use crate::observer::Observer;

/// Holds the current [`SessionState`] and broadcasts every real change.
///
/// [`reconcile`](Self::reconcile) is the only mutation path. Commits and
/// their broadcasts are serialized, so listeners see states in commit
/// order. A listener must not call `reconcile` itself.
#[derive(Debug, Default)]
pub struct SessionStore {
    state: RwLock<SessionState>,
    broadcast: Mutex<()>,
    observer: Observer<SessionState>,
}

impl SessionStore {
    /// Creates a store holding `initial`.
    #[must_use]
    pub fn new(initial: SessionState) -> Self {
        Self {
            state: RwLock::new(initial),
            broadcast: Mutex::new(()),
            observer: Observer::new(),
        }
    }

    /// A copy of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merges `changes` into the current state.
    ///
    /// Observers are notified with the full new state if and only if at
    /// least one field changed. Returns the resulting state either way.
    pub fn reconcile(&self, changes: SessionChanges) -> SessionState {
        let _broadcast = self.broadcast.lock().unwrap_or_else(PoisonError::into_inner);
        let next = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            match state.merge(&changes) {
                Some(next) => {
                    state.clone_from(&next);
                    next
                }
                None => return state.clone(),
            }
        };

        tracing::debug!(
            authenticated = next.authenticated,
            authenticating = next.authenticating,
            error = ?next.error,
            "session state changed"
        );
        self.observer.trigger(&next);
        next
    }

    /// Registers a listener for state changes and returns its id.
    pub fn subscribe<F>(&self, callback: F) -> String
    where
        F: Fn(&SessionState) + Send + Sync + 'static,
    {
        self.observer.subscribe(callback)
    }

    /// Removes a listener. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: &str) -> bool {
        self.observer.unsubscribe(id)
    }
}
