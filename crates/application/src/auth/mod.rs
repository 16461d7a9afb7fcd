//! Authentication orchestration.
//!
//! This module provides:
//! - The identity provider port the orchestrator drives
//! - Single-flight de-duplication of concurrent token and login calls
//! - [`AuthService`], the owner of session state and in-flight handles

mod provider;
mod service;
mod single_flight;

pub use provider::{IdentityProvider, RedirectCallback, token_preview};
pub use service::AuthService;
pub use single_flight::{SharedResult, SingleFlight};
