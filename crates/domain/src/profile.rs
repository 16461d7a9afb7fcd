//! User profile and avatar types returned by the identity graph.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Profile of the signed-in user (`GET /me`).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Object id.
    #[serde(default)]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Given name.
    #[serde(default)]
    pub given_name: Option<String>,
    /// Surname.
    #[serde(default)]
    pub surname: Option<String>,
    /// Primary e-mail address.
    #[serde(default)]
    pub mail: Option<String>,
    /// User principal name.
    #[serde(default)]
    pub user_principal_name: Option<String>,
    /// Job title.
    #[serde(default)]
    pub job_title: Option<String>,
    /// Office location.
    #[serde(default)]
    pub office_location: Option<String>,
    /// Preferred language tag.
    #[serde(default)]
    pub preferred_language: Option<String>,
    /// Mobile phone number.
    #[serde(default)]
    pub mobile_phone: Option<String>,
    /// Business phone numbers.
    #[serde(default)]
    pub business_phones: Vec<String>,
}

/// Avatar dimensions supported by the identity graph.
///
/// Unknown sizes are kept verbatim in [`PhotoSize::Other`]; the remote API
/// decides whether they are valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum PhotoSize {
    /// 48x48
    #[default]
    S48,
    /// 64x64
    S64,
    /// 96x96
    S96,
    /// 120x120
    S120,
    /// 240x240
    S240,
    /// 360x360
    S360,
    /// 432x432
    S432,
    /// 504x504
    S504,
    /// 648x648
    S648,
    /// Any other size string, passed through unchanged.
    Other(String),
}

impl PhotoSize {
    /// All sizes the graph documents.
    pub const SUPPORTED: [Self; 9] = [
        Self::S48,
        Self::S64,
        Self::S96,
        Self::S120,
        Self::S240,
        Self::S360,
        Self::S432,
        Self::S504,
        Self::S648,
    ];

    /// Path segment used by the photo endpoint, e.g. `"48x48"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::S48 => "48x48",
            Self::S64 => "64x64",
            Self::S96 => "96x96",
            Self::S120 => "120x120",
            Self::S240 => "240x240",
            Self::S360 => "360x360",
            Self::S432 => "432x432",
            Self::S504 => "504x504",
            Self::S648 => "648x648",
            Self::Other(size) => size,
        }
    }

    /// True if this is one of the documented sizes.
    #[must_use]
    pub const fn is_supported(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl From<&str> for PhotoSize {
    fn from(value: &str) -> Self {
        Self::SUPPORTED
            .into_iter()
            .find(|size| size.as_str() == value)
            .unwrap_or_else(|| Self::Other(value.to_string()))
    }
}

impl fmt::Display for PhotoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
