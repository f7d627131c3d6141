//! Configuration management for the occupancy engine.
//!
//! Loads configuration from environment variables with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// `PostgreSQL` configuration for the event journal
    pub postgres: PostgresConfig,
    /// Journal configuration
    pub journal: JournalConfig,
    /// Notification configuration
    pub notifications: NotificationConfig,
    /// Log filter directive (`RUST_LOG` syntax)
    pub log_filter: String,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Connection URL; without one the journal is kept in memory
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// Event journal configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Persist committed events
    pub enabled: bool,
    /// Stream the engine appends to and replays from
    pub stream: String,
}

/// Notification configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Send booking notifications
    pub enabled: bool,
    /// Sender address on outgoing messages
    pub sender: String,
}

impl Config {
    /// Load configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Missing or
    /// unparsable values fall back to defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            postgres: PostgresConfig {
                url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
                max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            journal: JournalConfig {
                enabled: lookup("JOURNAL_ENABLED")
                    .and_then(|s| parse_bool(&s))
                    .unwrap_or(true),
                stream: lookup("JOURNAL_STREAM").unwrap_or_else(|| "occupancy".to_string()),
            },
            notifications: NotificationConfig {
                enabled: lookup("NOTIFICATIONS_ENABLED")
                    .and_then(|s| parse_bool(&s))
                    .unwrap_or(true),
                sender: lookup("NOTIFICATION_SENDER")
                    .unwrap_or_else(|| "no-reply@bedspace.local".to_string()),
            },
            log_filter: lookup("RUST_LOG").unwrap_or_else(|| "info,bedspace_occupancy=debug".to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
