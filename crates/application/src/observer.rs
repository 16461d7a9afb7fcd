//! Minimal publish/subscribe primitive.

use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use warden_domain::generate_id;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Registry of listeners that receive every broadcast payload.
///
/// `trigger` works on a snapshot of the registry, so listeners may subscribe
/// or unsubscribe from inside a callback. A listener added during a
/// broadcast is not invoked for that broadcast. There is no ordering
/// guarantee between listeners.
pub struct Observer<T> {
    subscribers: RwLock<HashMap<String, Callback<T>>>,
}

impl<T> Observer<T> {
    /// Creates an observer with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `callback` and returns its subscription id.
    pub fn subscribe<F>(&self, callback: F) -> String
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = generate_id();
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), Arc::new(callback));
        id
    }

    /// Removes the listener with `id`. Unknown ids are ignored.
    ///
    /// Returns true if a listener was removed.
    pub fn unsubscribe(&self, id: &str) -> bool {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Invokes every registered listener once with `payload`.
    ///
    /// A panicking listener is logged and skipped; the others still run.
    /// Returns the number of listeners invoked.
    pub fn trigger(&self, payload: &T) -> usize {
        let snapshot: Vec<(String, Callback<T>)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, callback)| (id.clone(), Arc::clone(callback)))
            .collect();

        for (id, callback) in &snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
                tracing::warn!(subscription = %id, "observer callback panicked");
            }
        }
        snapshot.len()
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for Observer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Observer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("subscribers", &self.len())
            .finish()
    }
}
