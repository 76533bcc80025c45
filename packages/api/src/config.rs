//! Configuration loading.
//!
//! Native builds read `membership.toml` from the working directory (when
//! present), load `.env` through `dotenvy`, and let the process environment
//! override the backend settings. Web builds have neither a filesystem nor an
//! environment at runtime, so the same variables are baked in at compile time.

use store::config::{AppConfig, ANON_KEY_ENV, BACKEND_URL_ENV};
#[cfg(not(target_arch = "wasm32"))]
use tracing::{debug, warn};

#[cfg(not(target_arch = "wasm32"))]
pub fn load_config() -> AppConfig {
    if let Err(err) = dotenvy::dotenv() {
        debug!("no .env loaded: {err}");
    }
    let base = match std::fs::read_to_string(AppConfig::filename()) {
        Ok(contents) => AppConfig::from_toml(&contents).unwrap_or_else(|err| {
            warn!("ignoring {}: {err}", AppConfig::filename());
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    };
    base.with_env_overrides(|name| std::env::var(name).ok())
}

#[cfg(target_arch = "wasm32")]
pub fn load_config() -> AppConfig {
    AppConfig::default().with_env_overrides(compiled_env)
}

#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn compiled_env(name: &str) -> Option<String> {
    match name {
        BACKEND_URL_ENV => option_env!("MEMBERSHIP_BACKEND_URL").map(String::from),
        ANON_KEY_ENV => option_env!("MEMBERSHIP_ANON_KEY").map(String::from),
        _ => None,
    }
}
