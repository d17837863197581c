//! Courier configuration

use anyhow::Context;
use libnyx_mq::{QueueAttributes, Signal};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierConfig {
    /// Defaults for newly created queues
    #[serde(default)]
    pub queue: QueueDefaults,

    /// Notification settings for `watch`
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            queue: QueueDefaults::default(),
            notify: NotifyConfig::default(),
            log_level: default_log_level(),
        }
    }
}

/// Defaults applied when `create` is not given explicit values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueDefaults {
    /// Maximum queued messages
    #[serde(default = "default_max_messages")]
    pub max_messages: i64,

    /// Maximum message size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: i64,

    /// Permission bits for new queues
    #[serde(default = "default_mode")]
    pub mode: u32,
}

impl Default for QueueDefaults {
    fn default() -> Self {
        Self {
            max_messages: default_max_messages(),
            max_message_size: default_max_message_size(),
            mode: default_mode(),
        }
    }
}

impl QueueDefaults {
    pub fn attributes(&self) -> QueueAttributes {
        QueueAttributes::new(self.max_messages, self.max_message_size)
    }
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Signal name (e.g., "SIGUSR1")
    #[serde(default = "default_signal")]
    pub signal: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            signal: default_signal(),
        }
    }
}

impl NotifyConfig {
    pub fn signal(&self) -> anyhow::Result<Signal> {
        parse_signal(&self.signal)
    }
}

/// Parse a signal name, with or without the `SIG` prefix
pub fn parse_signal(name: &str) -> anyhow::Result<Signal> {
    let upper = name.to_ascii_uppercase();
    let full = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{}", upper)
    };
    Signal::from_str(&full).with_context(|| format!("Unknown signal: {}", name))
}

// Default value functions
fn default_max_messages() -> i64 {
    10 // fs.mqueue.msg_default
}

fn default_max_message_size() -> i64 {
    8192 // fs.mqueue.msgsize_default
}

fn default_mode() -> u32 {
    libnyx_mq::DEFAULT_MODE
}

fn default_signal() -> String {
    "SIGUSR1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CourierConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)
                .with_context(|| format!("Invalid configuration in {:?}", path))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CourierConfig::default();
        assert_eq!(config.queue.max_messages, 10);
        assert_eq!(config.queue.max_message_size, 8192);
        assert_eq!(config.queue.mode, 0o600);
        assert_eq!(config.notify.signal().unwrap(), Signal::SIGUSR1);
    }

    #[test]
    fn test_partial_toml() {
        let config: CourierConfig = toml::from_str(
            r#"
            [queue]
            max_message_size = 256

            [notify]
            signal = "usr2"
            "#,
        )
        .unwrap();
        assert_eq!(config.queue.max_messages, 10);
        assert_eq!(config.queue.attributes(), QueueAttributes::new(10, 256));
        assert_eq!(config.notify.signal().unwrap(), Signal::SIGUSR2);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_parse_signal() {
        assert_eq!(parse_signal("term").unwrap(), Signal::SIGTERM);
        assert!(parse_signal("SIGNOPE").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = CourierConfig::load(Path::new("/nonexistent/courier.toml")).unwrap();
        assert_eq!(config.log_level, "info");
    }
}
