//! Warden Application - Session management core
//!
//! This crate contains the authentication orchestrator and the pieces it is
//! built from: an observer, a session state store with change suppression,
//! a stale-while-revalidate cache and single-flight de-duplication. It
//! depends only on the domain crate and on port traits that adapters
//! implement.

pub mod auth;
pub mod bindings;
pub mod cache;
pub mod observer;
pub mod ports;
pub mod profile;
pub mod session_store;

#[cfg(test)]
mod testing;

pub use auth::{AuthService, IdentityProvider, RedirectCallback, SingleFlight, token_preview};
pub use bindings::{AuthBindings, Collaborators, SubscriptionGuard};
pub use cache::{CacheOptions, CacheSource, CachedCall, PersistentCache};
pub use observer::Observer;
pub use ports::{Clock, HttpClient, HttpRequest, HttpResponse, KeyValueStore, ResponseType};
pub use profile::ProfileGateway;
pub use session_store::SessionStore;
