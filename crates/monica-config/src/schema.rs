//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::loader::ConfigLoader;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub host: HostConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Base directory for bridge data (`~/.monica-bridge`).
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".monica-bridge"))
        .unwrap_or_else(|| PathBuf::from(".monica-bridge"))
}

/// Context storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend: "file" or "memory".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Directory holding one JSON file per project.
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl StorageConfig {
    /// Storage directory with `~` expanded.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(ConfigLoader::expand_path(&self.path))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_storage_path(),
        }
    }
}

fn default_backend() -> String {
    "file".to_string()
}

fn default_storage_path() -> String {
    data_dir().join("contexts").to_string_lossy().into_owned()
}

/// Action dispatch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How long GET_PREVIEW_STATE listens for preview console errors.
    #[serde(default = "default_preview_error_window_ms")]
    pub preview_error_window_ms: u64,

    /// Frame hosting the preview. One-indexed, as the browser reports frames.
    #[serde(default = "default_preview_frame_id")]
    pub preview_frame_id: u32,

    /// Minimum gap between two preview errors forwarded to the chat while
    /// automation is on.
    #[serde(default = "default_automation_cooldown_ms")]
    pub automation_cooldown_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            preview_error_window_ms: default_preview_error_window_ms(),
            preview_frame_id: default_preview_frame_id(),
            automation_cooldown_ms: default_automation_cooldown_ms(),
        }
    }
}

fn default_preview_error_window_ms() -> u64 {
    2000
}

fn default_preview_frame_id() -> u32 {
    1
}

fn default_automation_cooldown_ms() -> u64 {
    10_000
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Whether action markers are executed automatically.
    #[serde(default = "default_true")]
    pub automation_enabled: bool,

    /// Sender role recorded in the message log for scanned turns.
    #[serde(default = "default_sender_role")]
    pub sender_role: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            automation_enabled: true,
            sender_role: default_sender_role(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sender_role() -> String {
    "ai".to_string()
}

/// Native messaging host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Largest incoming frame accepted from the browser.
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

fn default_max_message_bytes() -> usize {
    8 * 1024 * 1024
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Write a daily-rotated log file as well as stderr.
    #[serde(default = "default_true")]
    pub file: bool,

    /// Log directory (defaults to `~/.monica-bridge/logs`).
    #[serde(default)]
    pub dir: Option<String>,
}

impl LoggingConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        match &self.dir {
            Some(dir) => PathBuf::from(ConfigLoader::expand_path(dir)),
            None => data_dir().join("logs"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: true,
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
