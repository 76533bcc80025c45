//! # Application configuration — `membership.toml`
//!
//! Settings for the backend connection, the session bootstrap and the query
//! cache. Every section and field has a default, so a missing or partial file
//! is equivalent to the defaults for whatever it leaves out.
//!
//! ## Structure
//!
//! ```toml
//! [backend]
//! url = "https://project.example.co"
//! anon_key = "public-anon-key"
//!
//! [session]
//! timeout_ms = 5000                  # bootstrap gives up after this long
//! force_reset_on_first_load = false  # one-time credential wipe (recovery only)
//!
//! [cache]
//! stale_time_secs = 300
//! ```
//!
//! ## Types
//!
//! | Struct | Purpose |
//! |--------|---------|
//! | [`AppConfig`] | Top-level config. TOML (de)serialisation, env overrides, canonical filename. |
//! | [`BackendConfig`] | Base URL and public API key of the hosted backend. |
//! | [`SessionConfig`] | Bootstrap timeout (default **5 seconds**) and the recovery flag. |
//! | [`CacheConfig`] | Freshness window for cached reads (default **5 minutes**). |

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding [`BackendConfig::url`].
pub const BACKEND_URL_ENV: &str = "MEMBERSHIP_BACKEND_URL";
/// Environment variable overriding [`BackendConfig::anon_key`].
pub const ANON_KEY_ENV: &str = "MEMBERSHIP_ANON_KEY";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level configuration stored in `membership.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Connection settings for the hosted backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, without a trailing slash.
    #[serde(default)]
    pub url: String,
    /// Public (anonymous) API key sent with every request.
    #[serde(default)]
    pub anon_key: String,
}

impl BackendConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.anon_key.is_empty()
    }
}

/// Session bootstrap settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Upper bound on session bootstrap, in milliseconds.
    #[serde(default = "default_session_timeout_ms")]
    pub timeout_ms: u64,
    /// Wipe stored credentials once on first load. Recovery switch for
    /// corrupted local sessions; leave off otherwise.
    #[serde(default)]
    pub force_reset_on_first_load: bool,
}

fn default_session_timeout_ms() -> u64 {
    5_000
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_session_timeout_ms(),
            force_reset_on_first_load: false,
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Query cache settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_stale_time_secs")]
    pub stale_time_secs: u64,
}

fn default_stale_time_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time_secs: default_stale_time_secs(),
        }
    }
}

impl CacheConfig {
    pub fn stale_time(&self) -> Duration {
        Duration::from_secs(self.stale_time_secs)
    }
}

impl AppConfig {
    /// Create a config pointing at the given backend.
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            backend: BackendConfig {
                url: url.into(),
                anon_key: anon_key.into(),
            },
            ..Self::default()
        }
    }

    /// Builder method to set the session bootstrap timeout.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Builder method to enable the one-time credential wipe.
    pub fn with_force_reset(mut self, enabled: bool) -> Self {
        self.session.force_reset_on_first_load = enabled;
        self
    }

    /// Replace backend settings with values found through `lookup`
    /// (normally the process environment).
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(BACKEND_URL_ENV).filter(|v| !v.is_empty()) {
            self.backend.url = url.trim_end_matches('/').to_string();
        }
        if let Some(key) = lookup(ANON_KEY_ENV).filter(|v| !v.is_empty()) {
            self.backend.anon_key = key;
        }
        self
    }

    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "membership.toml"
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
