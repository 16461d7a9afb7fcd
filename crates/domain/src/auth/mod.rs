//! Authentication domain types

mod error;
mod types;

pub use error::{AuthError, AuthResult};
pub use types::{
    AcquireTokenOptions, Account, IdTokenClaims, InteractiveRequest, LoginOptions, LoginType,
    SilentRequest, SsoOptions, TokenResult,
};
