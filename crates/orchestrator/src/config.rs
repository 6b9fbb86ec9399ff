//! Service configuration loaded from TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! in-memory configuration.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandupConfig {
    pub store: StoreSettings,
    pub schedule: ScheduleSettings,
    pub work_log: Option<WorkLogSettings>,
    pub api: ApiSettings,
}

/// Where actor state and meetings live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            url: "mem://".to_string(),
            namespace: "standup".to_string(),
            database: "standup".to_string(),
            username: None,
            password: None,
        }
    }
}

/// Timing knobs of the actor triad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    /// How long before the stand-up the nudge goes out.
    pub reminder_lead_minutes: u32,
    /// Retry delay while the participant is in another conversation.
    pub busy_backoff_minutes: u32,
    /// How long an unanswered nudge stays up.
    pub escalation_hours: u32,
    /// How long after publishing the brief late responses post standalone.
    pub brief_grace_hours: u32,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            reminder_lead_minutes: 30,
            busy_backoff_minutes: 5,
            escalation_hours: 3,
            brief_grace_hours: 8,
        }
    }
}

impl ScheduleSettings {
    #[must_use]
    pub fn reminder_lead(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.reminder_lead_minutes))
    }

    #[must_use]
    pub fn busy_backoff(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.busy_backoff_minutes))
    }

    #[must_use]
    pub fn escalation(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.escalation_hours))
    }

    #[must_use]
    pub fn brief_grace(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.brief_grace_hours))
    }
}

/// Issue-tracker work-log endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLogSettings {
    pub endpoint: String,
    #[serde(default = "default_work_log_timeout")]
    pub timeout_secs: u64,
}

fn default_work_log_timeout() -> u64 {
    10
}

/// HTTP surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub bind: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
        }
    }
}

impl StandupConfig {
    /// Parse configuration from TOML text and validate it.
    ///
    /// # Errors
    ///
    /// Returns `TomlParseFailed` for syntax errors and `InvalidConfig` for
    /// values that parse but cannot be used.
    pub fn from_toml_str(raw: &str) -> standup_core::Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| standup_core::Error::toml_parse_failed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigReadFailed` if the file cannot be read, otherwise the
    /// errors of [`StandupConfig::from_toml_str`].
    pub fn load(path: &Path) -> standup_core::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| standup_core::Error::config_read_failed(path, e.to_string()))?;
        Self::from_toml_str(&raw)
    }

    /// Parsed bind address of the HTTP surface.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `api.bind` is not a socket address.
    pub fn bind_addr(&self) -> standup_core::Result<SocketAddr> {
        self.api.bind.parse().map_err(|e| {
            standup_core::Error::invalid_config(format!("api.bind '{}': {e}", self.api.bind))
        })
    }

    fn validate(&self) -> standup_core::Result<()> {
        self.bind_addr()?;
        if self.store.username.is_some() != self.store.password.is_some() {
            return Err(standup_core::Error::invalid_config(
                "store.username and store.password must be set together",
            ));
        }
        if self.schedule.busy_backoff_minutes == 0 {
            return Err(standup_core::Error::invalid_config(
                "schedule.busy_backoff_minutes must be positive",
            ));
        }
        if self.schedule.escalation_hours == 0 {
            return Err(standup_core::Error::invalid_config(
                "schedule.escalation_hours must be positive",
            ));
        }
        if self.schedule.reminder_lead_minutes >= 24 * 60 {
            return Err(standup_core::Error::invalid_config(
                "schedule.reminder_lead_minutes must be under a day",
            ));
        }
        if let Some(work_log) = &self.work_log {
            if work_log.endpoint.trim().is_empty() {
                return Err(standup_core::Error::invalid_config(
                    "work_log.endpoint must not be empty",
                ));
            }
        }
        Ok(())
    }
}
