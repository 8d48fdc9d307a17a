//! Ban policy configuration.
//!
//! A [`PolicyConfig`] holds the three tunables of the engine: how many failures are
//! tolerated, the window they must cluster in, and how long a ban lasts. Values are
//! validated when the policy is built, so a decision can never observe a zero or
//! negative setting.
//!
//! Policies are read through a [`PolicySource`]. Services take one snapshot per
//! decision, which keeps concurrent updates through [`SharedPolicy`] race-free.
//!
//! # Example
//!
//! ```rust
//! use fail2ban_core::{PolicyConfig, PolicySource, SharedPolicy};
//! use fail2ban_core::config::PolicySettings;
//!
//! let shared = SharedPolicy::new(PolicyConfig::default());
//! shared
//!     .update(PolicySettings { max_retry: 5, find_time: 300, ban_time: 3600 })
//!     .unwrap();
//! assert_eq!(shared.current().max_retry(), 5);
//!
//! // Zero values are rejected and the previous policy stays in force
//! let zero = PolicySettings { max_retry: 0, find_time: 300, ban_time: 3600 };
//! assert!(shared.update(zero).is_err());
//! assert_eq!(shared.current().max_retry(), 5);
//! ```

use std::sync::{Arc, RwLock};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_MAX_RETRY: u32 = 3;
pub const DEFAULT_FIND_TIME_SECS: u64 = 600;
pub const DEFAULT_BAN_TIME_SECS: u64 = 1800;

pub const ENV_MAX_RETRY: &str = "FAIL2BAN_MAX_RETRY";
pub const ENV_FIND_TIME: &str = "FAIL2BAN_FIND_TIME";
pub const ENV_BAN_TIME: &str = "FAIL2BAN_BAN_TIME";

/// Validated ban policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicySettings", into = "PolicySettings")]
pub struct PolicyConfig {
    max_retry: u32,
    find_time: Duration,
    ban_time: Duration,
}

/// Raw policy values as they appear in configuration files and update requests.
///
/// Times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySettings {
    pub max_retry: u32,
    pub find_time: u64,
    pub ban_time: u64,
}

/// One configurable setting, with the label and hint shown to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingDescription {
    pub key: &'static str,
    pub label: &'static str,
    pub hint: &'static str,
    pub value: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_retry: DEFAULT_MAX_RETRY,
            find_time: Duration::seconds(DEFAULT_FIND_TIME_SECS as i64),
            ban_time: Duration::seconds(DEFAULT_BAN_TIME_SECS as i64),
        }
    }
}

impl PolicyConfig {
    /// Create a policy from a retry count and two durations in seconds.
    pub fn new(
        max_retry: u32,
        find_time_secs: u64,
        ban_time_secs: u64,
    ) -> Result<Self, ConfigError> {
        if max_retry == 0 {
            return Err(ConfigError::NonPositive { field: "max_retry" });
        }

        Ok(Self {
            max_retry,
            find_time: seconds("find_time", find_time_secs)?,
            ban_time: seconds("ban_time", ban_time_secs)?,
        })
    }

    /// Load the policy from `FAIL2BAN_MAX_RETRY`, `FAIL2BAN_FIND_TIME` and
    /// `FAIL2BAN_BAN_TIME`, falling back to the defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(
            env_or(ENV_MAX_RETRY, "max_retry", DEFAULT_MAX_RETRY)?,
            env_or(ENV_FIND_TIME, "find_time", DEFAULT_FIND_TIME_SECS)?,
            env_or(ENV_BAN_TIME, "ban_time", DEFAULT_BAN_TIME_SECS)?,
        )
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    pub fn find_time(&self) -> Duration {
        self.find_time
    }

    pub fn ban_time(&self) -> Duration {
        self.ban_time
    }

    pub fn with_max_retry(self, max_retry: u32) -> Result<Self, ConfigError> {
        Self::new(max_retry, self.find_time_secs(), self.ban_time_secs())
    }

    pub fn with_find_time(self, find_time_secs: u64) -> Result<Self, ConfigError> {
        Self::new(self.max_retry, find_time_secs, self.ban_time_secs())
    }

    pub fn with_ban_time(self, ban_time_secs: u64) -> Result<Self, ConfigError> {
        Self::new(self.max_retry, self.find_time_secs(), ban_time_secs)
    }

    pub fn settings(&self) -> PolicySettings {
        PolicySettings {
            max_retry: self.max_retry,
            find_time: self.find_time_secs(),
            ban_time: self.ban_time_secs(),
        }
    }

    /// Describe every setting with its configuration key, for admin tooling.
    pub fn describe(&self) -> Vec<SettingDescription> {
        vec![
            SettingDescription {
                key: "fail2ban_max_retry",
                label: "Max retry",
                hint: "Failed logins tolerated before the identity is banned",
                value: self.max_retry.to_string(),
            },
            SettingDescription {
                key: "fail2ban_find_time",
                label: "Find time",
                hint: "Time (in seconds) over which failed logins are counted",
                value: self.find_time_secs().to_string(),
            },
            SettingDescription {
                key: "fail2ban_ban_time",
                label: "Ban time",
                hint: "Time (in seconds) a banned identity has to wait to login again, even with the right password",
                value: self.ban_time_secs().to_string(),
            },
        ]
    }

    fn find_time_secs(&self) -> u64 {
        self.find_time.num_seconds().unsigned_abs()
    }

    fn ban_time_secs(&self) -> u64 {
        self.ban_time.num_seconds().unsigned_abs()
    }
}

impl TryFrom<PolicySettings> for PolicyConfig {
    type Error = ConfigError;

    fn try_from(settings: PolicySettings) -> Result<Self, Self::Error> {
        Self::new(settings.max_retry, settings.find_time, settings.ban_time)
    }
}

impl From<PolicyConfig> for PolicySettings {
    fn from(config: PolicyConfig) -> Self {
        config.settings()
    }
}

fn seconds(field: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::NonPositive { field });
    }

    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| ConfigError::Invalid {
            field,
            value: secs.to_string(),
        })
}

fn env_or<T: std::str::FromStr>(
    var: &str,
    field: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { field, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Anything that can hand out the policy in force right now.
pub trait PolicySource: Send + Sync + 'static {
    fn current(&self) -> PolicyConfig;
}

impl PolicySource for PolicyConfig {
    fn current(&self) -> PolicyConfig {
        *self
    }
}

/// A policy that administrators can change while the engine is running.
#[derive(Debug, Clone)]
pub struct SharedPolicy {
    inner: Arc<RwLock<PolicyConfig>>,
}

impl SharedPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Validate and apply new settings. On error the current policy is left untouched.
    pub fn update(&self, settings: PolicySettings) -> Result<PolicyConfig, ConfigError> {
        let config = PolicyConfig::try_from(settings)?;
        self.replace(config);
        Ok(config)
    }

    pub fn replace(&self, config: PolicyConfig) {
        *self.inner.write().unwrap_or_else(|e| e.into_inner()) = config;
        tracing::info!(
            max_retry = config.max_retry,
            find_time = config.find_time.num_seconds(),
            ban_time = config.ban_time.num_seconds(),
            "Ban policy updated"
        );
    }
}

impl PolicySource for SharedPolicy {
    fn current(&self) -> PolicyConfig {
        *self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}
