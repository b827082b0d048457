//! Application configuration.
//!
//! Centralizes all configuration constants used throughout the application.
//! The API origin is baked in at compile time from `GARDENLINK_API_URL`.

use url::Url;

// =============================================================================
// Application Metadata
// =============================================================================

/// Application name.
pub const APP_NAME: &str = "gardenlink";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Network Configuration
// =============================================================================

/// API origin used when `GARDENLINK_API_URL` is not set at build time.
pub const DEFAULT_API_URL: &str = "http://localhost:1337";

/// API origin for this build.
pub const API_URL: &str = match option_env!("GARDENLINK_API_URL") {
    Some(url) => url,
    None => DEFAULT_API_URL,
};

/// Path prefix of every CMS collection endpoint.
pub const API_PREFIX: &str = "/api";

/// Multipart upload endpoint (relative to the API origin).
pub const UPLOAD_PATH: &str = "/api/upload";

// =============================================================================
// Session Configuration
// =============================================================================

/// localStorage key holding the bearer token.
pub const TOKEN_STORAGE_KEY: &str = "gardenlink_jwt";

/// localStorage key holding the JSON-serialized user record.
pub const USER_STORAGE_KEY: &str = "user";

/// Route the app navigates to when the session ends.
pub const LOGIN_ROUTE: &str = "/login";

/// Route used after login when no return URL was recorded.
pub const HOME_ROUTE: &str = "/";

// =============================================================================
// Pagination Defaults
// =============================================================================

/// Pagination defaults for paged collections.
pub mod pagination {
    /// Page size for event listings.
    pub const EVENTS_PAGE_SIZE: u32 = 15;
    /// Page size for recurring template listings.
    pub const TEMPLATES_PAGE_SIZE: u32 = 25;
    /// Page size for location tracking (the garden filter is applied locally).
    pub const LOCATION_PAGE_SIZE: u32 = 100;
    /// Number of upcoming occurrences requested by a template preview.
    pub const PREVIEW_COUNT: u32 = 6;
}

// =============================================================================
// Geo Configuration
// =============================================================================

/// Mean Earth radius used by the haversine distance, in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default radius for "near this garden" location filtering, in kilometres.
pub const DEFAULT_GARDEN_RADIUS_KM: f64 = 0.5;

// =============================================================================
// Badge Colors
// =============================================================================

/// Palette for identifier-derived badge colours.
pub const BADGE_COLORS: &[&str] = &[
    "red", "green", "blue", "orange", "purple", "fuchsia", "emerald", "violet", "indigo", "yellow",
    "lime", "slate",
];

/// Colour used when an entity has no identifier.
pub const DEFAULT_BADGE_COLOR: &str = "green";

// =============================================================================
// Runtime Configuration
// =============================================================================

/// Runtime view of the API configuration.
///
/// Built once from [`API_URL`] in the browser; tests construct their own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: Url,
}

impl ApiConfig {
    /// Parse an API origin such as `https://cms.example.org`.
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
        })
    }

    /// Configuration for this build.
    pub fn from_env() -> Result<Self, url::ParseError> {
        Self::new(API_URL)
    }

    /// The configured API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of an API path such as `/api/gardens`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Absolute URL of a collection under [`API_PREFIX`], e.g. `collection("gardens")`.
    pub fn collection(&self, name: &str) -> String {
        self.endpoint(&format!("{}/{}", API_PREFIX, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let config = ApiConfig::new("https://cms.example.org/").unwrap();
        assert_eq!(
            config.collection("gardens"),
            "https://cms.example.org/api/gardens"
        );
        assert_eq!(
            config.endpoint(UPLOAD_PATH),
            "https://cms.example.org/api/upload"
        );
    }

    #[test]
    fn test_default_config_parses() {
        assert!(ApiConfig::from_env().is_ok());
    }
}
