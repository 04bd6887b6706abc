//! Monica Bridge
//!
//! Main entry point for the Monica bridge CLI and native messaging host.

mod adapters;
mod cli;
mod cmd_context;
mod cmd_host;

use clap::Parser;
use tracing::{info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use monica_config::{BridgeConfig, ConfigError, ConfigLoader, ConfigValidator, LoggingConfig};

use adapters::default_config_path;
use cli::{Cli, Commands};
use cmd_context::handle_context_command;
use cmd_host::run_host;

fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // Stdout carries native messaging frames, so console logs go to stderr.
    let console_layer = fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .with_writer(std::io::stderr);

    let file_layer = if logging.file {
        let log_dir = logging.resolved_dir();
        std::fs::create_dir_all(&log_dir)?;

        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix("monica-bridge")
            .filename_suffix("log")
            .max_log_files(30)
            .build(&log_dir)?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        // Keep the worker alive for the program duration.
        static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
            std::sync::OnceLock::new();
        let _ = GUARD.set(guard);

        Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

/// Load and validate the configuration.
fn load_config(cli: &Cli) -> Result<BridgeConfig, ConfigError> {
    let config = match &cli.config {
        Some(path) => ConfigLoader::load(path)?,
        None => ConfigLoader::load_or_default(&default_config_path())?,
    };

    let result = ConfigValidator::validate(&config);
    if let Some(error) = result.errors.into_iter().next() {
        return Err(ConfigError::InvalidValue {
            field: error.path,
            message: error.message,
        });
    }
    for warning in result.warnings {
        eprintln!("config warning: {}: {}", warning.path, warning.message);
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    init_tracing(&config.logging)?;
    info!("monica-bridge {} starting", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Host => run_host(&config).await,
        command => handle_context_command(command, &config).await,
    };

    if let Err(e) = &result {
        warn!("Command failed: {}", e);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli_with_config(path: &std::path::Path) -> Cli {
        Cli::try_parse_from([
            "monica-bridge",
            "--config",
            path.to_str().unwrap(),
            "show",
            "-p",
            "a",
        ])
        .unwrap()
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dispatch]\npreview_error_window_ms = 750").unwrap();

        let config = load_config(&cli_with_config(file.path())).unwrap();
        assert_eq!(config.dispatch.preview_error_window_ms, 750);
    }

    #[test]
    fn test_load_config_rejects_invalid_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dispatch]\npreview_frame_id = 0").unwrap();

        let err = load_config(&cli_with_config(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_explicit_missing_config_is_an_error() {
        let cli = cli_with_config(std::path::Path::new("/nonexistent/monica/config.toml"));
        assert!(matches!(load_config(&cli), Err(ConfigError::NotFound(_))));
    }
}
