//! Layered loading of [`AuthorityConfig`].
//!
//! Sources, later ones overriding earlier ones:
//! 1. built-in defaults
//! 2. an optional JSON file
//! 3. `WARDEN_*` environment variables (`WARDEN_TENANT_ID`,
//!    `WARDEN_CLIENT_ID`, `WARDEN_PROFILE_SCOPES=User.Read,Mail.Read`, ...)

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use warden_domain::{AuthError, AuthorityConfig};

/// Prefix of recognized environment variables.
pub const ENV_PREFIX: &str = "WARDEN";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the expected shape.
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// The merged configuration is incomplete.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] AuthError),
}

impl From<ConfigError> for AuthError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Invalid(inner) => inner,
            ConfigError::Load(inner) => Self::invalid_argument(inner.to_string()),
        }
    }
}

/// Default location of the config file: `<config dir>/warden/authority.json`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("warden").join("authority.json"))
}

/// Loads and validates the configuration from `path` and the environment.
///
/// A missing file is not an error; the environment alone may supply the
/// identifiers.
///
/// # Errors
///
/// Returns [`ConfigError::Load`] for unreadable or malformed sources and
/// [`ConfigError::Invalid`] if the tenant or client id is missing.
pub fn load_authority_config(path: Option<&Path>) -> Result<AuthorityConfig, ConfigError> {
    load_with_environment(path, environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("profile_scopes")
}

fn load_with_environment(
    path: Option<&Path>,
    environment: Environment,
) -> Result<AuthorityConfig, ConfigError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Json).required(false));
    }
    let config: AuthorityConfig = builder.add_source(environment).build()?.try_deserialize()?;
    config.validate()?;

    tracing::debug!(authority = %config.authority(), "authority configuration loaded");
    Ok(config)
}
