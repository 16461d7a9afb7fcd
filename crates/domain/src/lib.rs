//! Warden Domain - Core session types
//!
//! This crate defines the data model of the authentication session manager.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod cache;
pub mod config;
pub mod id;
pub mod profile;
pub mod session;

pub use auth::{
    AcquireTokenOptions, Account, AuthError, AuthResult, IdTokenClaims, InteractiveRequest,
    LoginOptions, LoginType, SilentRequest, SsoOptions, TokenResult,
};
pub use cache::CachedEntry;
pub use config::AuthorityConfig;
pub use id::generate_id;
pub use profile::{PhotoSize, UserProfile};
pub use session::{SessionChanges, SessionState};
