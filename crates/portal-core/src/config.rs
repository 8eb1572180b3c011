//! ============================================================================
//! Portal Config - Endpoint, timing and storage settings
//! ============================================================================
//! Defaults match the production account page. Every field can be overridden
//! through `PORTAL_*` environment variables.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

/// Default backend origin
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Default key of the one-time "payment verified" notice flag
pub const DEFAULT_TOAST_FLAG_KEY: &str = "payment_toast_shown";

/// Wait after returning from the payment provider before re-checking status
pub const DEFAULT_CALLBACK_DELAY_MS: u64 = 1500;

/// Fixed re-check interval while the user is still unpaid
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Upper bound on re-checks for one polling session
pub const DEFAULT_POLL_MAX_CHECKS: u32 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Backend origin, e.g. https://portal.example.com
    pub base_url: String,
    /// Raw `Cookie` header carrying the authenticated session
    pub session_cookie: Option<String>,
    pub callback_delay_ms: u64,
    pub poll_interval_ms: u64,
    /// None polls until unlocked
    pub poll_max_checks: Option<u32>,
    pub toast_flag_key: String,
    /// Location of the persisted flag database
    pub state_path: Option<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            session_cookie: None,
            callback_delay_ms: DEFAULT_CALLBACK_DELAY_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            poll_max_checks: Some(DEFAULT_POLL_MAX_CHECKS),
            toast_flag_key: DEFAULT_TOAST_FLAG_KEY.to_string(),
            state_path: None,
        }
    }
}

impl PortalConfig {
    /// Build a config from `PORTAL_*` environment variables over the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_string("PORTAL_BASE_URL").unwrap_or(defaults.base_url),
            session_cookie: env_string("PORTAL_SESSION_COOKIE"),
            callback_delay_ms: env_parse("PORTAL_CALLBACK_DELAY_MS", defaults.callback_delay_ms),
            poll_interval_ms: env_parse("PORTAL_POLL_INTERVAL_MS", defaults.poll_interval_ms),
            poll_max_checks: match env_string("PORTAL_POLL_MAX_CHECKS").as_deref() {
                Some("0") | Some("none") => None,
                _ => Some(env_parse(
                    "PORTAL_POLL_MAX_CHECKS",
                    defaults.poll_max_checks.unwrap_or(DEFAULT_POLL_MAX_CHECKS),
                )),
            },
            toast_flag_key: env_string("PORTAL_TOAST_FLAG_KEY").unwrap_or(defaults.toast_flag_key),
            state_path: env_string("PORTAL_STATE_PATH"),
        }
    }

    pub fn callback_delay(&self) -> Duration {
        Duration::from_millis(self.callback_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        // A zero period would make tokio's interval panic
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Join an API path onto the base URL without doubling slashes
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match env_string(key) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default");
            default
        }),
        None => {
            debug!("{key} not set, using default");
            default
        }
    }
}
