//! Configuration validation.

use crate::schema::BridgeConfig;

/// Window above which GET_PREVIEW_STATE noticeably stalls the chat.
const LONG_WINDOW_MS: u64 = 30_000;

const KNOWN_BACKENDS: [&str; 2] = ["file", "memory"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &BridgeConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_storage(config, &mut result);
        Self::validate_dispatch(config, &mut result);
        Self::validate_host(config, &mut result);

        result
    }

    fn validate_storage(config: &BridgeConfig, result: &mut ValidationResult) {
        if !KNOWN_BACKENDS.contains(&config.storage.backend.as_str()) {
            result.add_error(ValidationError::new(
                "storage.backend",
                format!(
                    "Unknown backend '{}', expected one of: {}",
                    config.storage.backend,
                    KNOWN_BACKENDS.join(", ")
                ),
            ));
        }

        if config.storage.backend == "file" && config.storage.path.trim().is_empty() {
            result.add_error(ValidationError::new(
                "storage.path",
                "File backend requires a storage path",
            ));
        }

        if config.storage.backend == "memory" {
            result.add_warning(ValidationWarning::new(
                "storage.backend",
                "Memory backend discards all context when the process exits",
            ));
        }
    }

    fn validate_dispatch(config: &BridgeConfig, result: &mut ValidationResult) {
        if config.dispatch.preview_error_window_ms == 0 {
            result.add_error(ValidationError::new(
                "dispatch.preview_error_window_ms",
                "Window must be greater than 0",
            ));
        } else if config.dispatch.preview_error_window_ms > LONG_WINDOW_MS {
            result.add_warning(ValidationWarning::new(
                "dispatch.preview_error_window_ms",
                format!(
                    "Window of {}ms blocks the next command for a long time",
                    config.dispatch.preview_error_window_ms
                ),
            ));
        }

        if config.dispatch.preview_frame_id == 0 {
            result.add_error(ValidationError::new(
                "dispatch.preview_frame_id",
                "Frame ids are one-indexed",
            ));
        }

        if config.dispatch.automation_cooldown_ms == 0 {
            result.add_warning(ValidationWarning::new(
                "dispatch.automation_cooldown_ms",
                "Without a cooldown every detected preview error is sent to the chat",
            ));
        }
    }

    fn validate_host(config: &BridgeConfig, result: &mut ValidationResult) {
        if config.host.max_message_bytes == 0 {
            result.add_error(ValidationError::new(
                "host.max_message_bytes",
                "Limit must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
