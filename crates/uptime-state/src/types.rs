//! Domain types for UptimeShield.
//!
//! Field names serialize in camelCase and statuses in upper case so an
//! exported registry matches the dashboard's `services.config.json`
//! layout byte for byte.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Opaque identifier assigned to a service when it is created.
pub type ServiceId = String;

/// Identifier of a log entry; strictly increasing in append order.
pub type LogEntryId = u64;

// ── Service ───────────────────────────────────────────────────────

/// Operational state of a monitored service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Running,
    /// Never configured to run. Inert during ticks.
    Stopped,
    Restarting,
    /// Restart budget exhausted; only an operator action leaves this state.
    Failed,
    /// Monitoring suspended by an operator. Inert during ticks.
    Paused,
}

impl ServiceStatus {
    /// Whether ticks leave a service in this state untouched.
    pub fn is_inert(self) -> bool {
        matches!(
            self,
            ServiceStatus::Stopped | ServiceStatus::Paused | ServiceStatus::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceStatus::Running => "RUNNING",
            ServiceStatus::Stopped => "STOPPED",
            ServiceStatus::Restarting => "RESTARTING",
            ServiceStatus::Failed => "FAILED",
            ServiceStatus::Paused => "PAUSED",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One monitored unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    pub description: String,
    pub status: ServiceStatus,
    /// Presentational health signal in `[0, 100]`.
    pub uptime: f64,
    /// Time of the most recent successful restart.
    pub last_restart: Option<DateTime<Utc>>,
    /// Consecutive failure/retry events since the last manual activation.
    pub fail_count: u32,
}

impl Service {
    /// Clamp `uptime` back into `[0, 100]`. NaN collapses to zero.
    pub fn normalize(&mut self) {
        self.uptime = if self.uptime.is_nan() {
            0.0
        } else {
            self.uptime.clamp(0.0, 100.0)
        };
    }
}

/// Operator-supplied fields for a new service; everything else defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ServiceDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ServiceDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A service found by an inventory scan, ready to be merged into the
/// registry with its observed status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscoveredService {
    pub draft: ServiceDraft,
    pub status: ServiceStatus,
}

// ── Log ───────────────────────────────────────────────────────────

/// Severity of an event log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Success => "SUCCESS",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One immutable observation in the event log.
///
/// `service_id`/`service_name` are a lookup-only back-reference; the
/// service may have been removed since.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: LogEntryId,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub service_id: Option<ServiceId>,
    pub service_name: Option<String>,
}

// ── Settings ──────────────────────────────────────────────────────

/// The recognized option set. SMTP fields are carried for round-tripping
/// only; nothing sends mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub email_notifications: bool,
    pub recipient_email: String,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    /// Tick period in seconds, 1–60.
    pub check_interval: u32,
    pub auto_restart: bool,
    pub max_retries: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            email_notifications: true,
            recipient_email: "admin@uptimeshield.local".to_string(),
            smtp_server: "smtp.local".to_string(),
            smtp_port: 587,
            smtp_user: String::new(),
            smtp_password: String::new(),
            check_interval: 3,
            auto_restart: true,
            max_retries: 3,
        }
    }
}

impl Settings {
    pub const MIN_CHECK_INTERVAL: u32 = 1;
    pub const MAX_CHECK_INTERVAL: u32 = 60;

    /// Reject values outside their recognized ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(Self::MIN_CHECK_INTERVAL..=Self::MAX_CHECK_INTERVAL).contains(&self.check_interval) {
            return Err(ConfigError::CheckInterval(self.check_interval));
        }
        if self.smtp_port == 0 {
            return Err(ConfigError::SmtpPort);
        }
        if self.email_notifications && self.recipient_email.trim().is_empty() {
            return Err(ConfigError::MissingRecipient);
        }
        Ok(())
    }

    /// The tick period.
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.check_interval))
    }
}

// ── View ──────────────────────────────────────────────────────────

/// Which dashboard view the operator last had open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ActiveView {
    #[default]
    Overview,
    Services,
    Logs,
    Configuration,
    AiAnalysis,
}
