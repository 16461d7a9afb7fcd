//! At-most-one in-flight operation per operation class.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use warden_domain::{AuthError, AuthResult};

/// A pending result every concurrent caller can await.
pub type SharedResult<T> = Shared<BoxFuture<'static, AuthResult<T>>>;

type Slot<T> = Arc<Mutex<Option<(u64, SharedResult<T>)>>>;

/// De-duplicates concurrent calls of one operation class.
///
/// While an operation is pending, [`run`](Self::run) hands every caller a
/// clone of the same shared future instead of starting another one. The
/// slot is cleared when the operation settles, success or failure, so the
/// next call after settlement starts fresh.
///
/// The operation runs on its own task: it settles even if every caller
/// stops awaiting it.
pub struct SingleFlight<T: Clone> {
    slot: Slot<T>,
    generation: AtomicU64,
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Creates an idle single-flight slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    /// Joins the pending operation, or starts `operation` if none is pending.
    ///
    /// `operation` is only called when a new operation starts. Must be
    /// called from within a tokio runtime.
    pub fn run<F, Fut>(&self, operation: F) -> SharedResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AuthResult<T>> + Send + 'static,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((generation, pending)) = slot.as_ref() {
            tracing::debug!(generation, "joining in-flight operation");
            return pending.clone();
        }

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let guard = SettleGuard {
            slot: Arc::clone(&self.slot),
            generation,
        };
        let future = operation();
        // the slot lock is still held, so the guard cannot clear it before it is filled
        let task = tokio::spawn(async move {
            let _guard = guard;
            future.await
        });
        let shared = async move {
            task.await.unwrap_or_else(|error| {
                tracing::warn!(generation, %error, "in-flight operation aborted");
                Err(AuthError::authentication_failed(format!(
                    "operation aborted: {error}"
                )))
            })
        }
        .boxed()
        .shared();

        *slot = Some((generation, shared.clone()));
        shared
    }

    /// True while an operation is pending.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl<T> Default for SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> fmt::Debug for SingleFlight<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let in_flight = self
            .slot
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or_default();
        f.debug_struct("SingleFlight")
            .field("in_flight", &in_flight)
            .finish()
    }
}

/// Clears the slot when the operation finishes or is dropped.
struct SettleGuard<T: Clone> {
    slot: Slot<T>,
    generation: u64,
}

impl<T: Clone> Drop for SettleGuard<T> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|(generation, _)| *generation == self.generation)
        {
            *slot = None;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_operation() {
        let flight: SingleFlight<u32> = SingleFlight::new();
        let starts = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(Notify::new());

        let make = || {
            let starts = Arc::clone(&starts);
            let gate = Arc::clone(&gate);
            move || async move {
                starts.fetch_add(1, Ordering::SeqCst);
                gate.notified().await;
                Ok(7)
            }
        };

        let a = flight.run(make());
        let b = flight.run(make());
        let c = flight.run(make());
        assert!(flight.is_in_flight());

        gate.notify_one();
        let (a, b, c) = tokio::join!(a, b, c);
        assert_eq!((a, b, c), (Ok(7), Ok(7), Ok(7)));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert!(!flight.is_in_flight());
    }

    #[tokio::test]
    async fn test_failure_shared_and_slot_cleared() {
        let flight: SingleFlight<u32> = SingleFlight::new();
        let a = flight.run(|| async { Err(AuthError::network("down")) });
        let b = flight.run(|| async { Ok(1) });

        assert_eq!(a.await, Err(AuthError::network("down")));
        assert_eq!(b.await, Err(AuthError::network("down")));
        assert!(!flight.is_in_flight());

        // settled: the next call starts a new operation
        assert_eq!(flight.run(|| async { Ok(2) }).await, Ok(2));
    }

    #[tokio::test]
    async fn test_operation_settles_after_caller_dropped() {
        let flight: SingleFlight<u32> = SingleFlight::new();
        let gate = Arc::new(Notify::new());
        let finished = Arc::new(AtomicUsize::new(0));

        let pending = {
            let gate = Arc::clone(&gate);
            let finished = Arc::clone(&finished);
            flight.run(move || async move {
                gate.notified().await;
                finished.fetch_add(1, Ordering::SeqCst);
                Ok(3)
            })
        };
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(20), pending).await;
        assert!(timed_out.is_err());
        assert!(flight.is_in_flight());

        gate.notify_one();
        for _ in 0..50 {
            if !flight.is_in_flight() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert_eq!(finished.load(Ordering::SeqCst), 1);
        assert!(!flight.is_in_flight());
        assert_eq!(flight.run(|| async { Ok(4) }).await, Ok(4));
    }

    #[tokio::test]
    async fn test_panicking_operation_reported_as_error() {
        let flight: SingleFlight<u32> = SingleFlight::new();
        let result = flight
            .run(|| async {
                if true {
                    panic!("provider bug");
                }
                Ok(0)
            })
            .await;

        assert!(matches!(result, Err(AuthError::AuthenticationFailed { .. })));
        assert!(!flight.is_in_flight());
    }
}
