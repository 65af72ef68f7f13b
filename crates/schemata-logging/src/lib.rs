//! JSONL logging with per-cycle correlation ids for schemata
//!
//! The reconciler runs unattended in the background, so its logs are the
//! only place its outcomes surface. This crate sets up the process-wide
//! `tracing` subscriber and provides the correlation ids that tie the log
//! lines of one reconciliation cycle together.
//!
//! # Output
//!
//! Output is JSON lines on stdout by default. [`LogConfig::pretty`] switches
//! the console to human-readable text and [`LogConfig::service`] writes
//! rotated files through `tracing-appender` instead.
//!
//! ```ignore
//! use schemata_logging::{LogConfig, SubscriberBuilder};
//!
//! let _guard = SubscriberBuilder::new()
//!     .with_config(LogConfig::service("/var/log/schemata"))
//!     .with_target_level("schemata_storage", "warn")
//!     .init()?;
//! ```
//!
//! # Correlation IDs
//!
//! ```ignore
//! use schemata_logging::CorrelationContext;
//!
//! let ctx = CorrelationContext::new_root();
//! tracing::info!(rid = %ctx.rid(), "start sync table and index");
//! ```

pub mod config;
pub mod correlation;
pub mod layers;

pub use config::{ConsoleFormat, FileConfig, FileRotation, JsonFormat, LogConfig};
pub use correlation::{CorrelationContext, CorrelationExt, fields, spans};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the global subscriber
#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("Invalid log filter directive '{directive}': {reason}")]
    Directive { directive: String, reason: String },

    #[error("Failed to create log file appender: {0}")]
    Appender(String),

    #[error("Failed to install global subscriber: {0}")]
    Install(String),
}

/// Installs the process-wide subscriber from a [`LogConfig`]
pub struct SubscriberBuilder {
    config: LogConfig,
}

impl Default for SubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberBuilder {
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.level = level.into();
        self
    }

    pub fn with_console(mut self, console: ConsoleFormat) -> Self {
        self.config.console = console;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// Override the level of one target
    pub fn with_target_level(
        mut self,
        target: impl Into<String>,
        level: impl Into<String>,
    ) -> Self {
        self.config.targets.insert(target.into(), level.into());
        self
    }

    /// Build the level filter: RUST_LOG if set, else the default level, plus target overrides
    pub fn build_filter(&self) -> Result<EnvFilter, LogInitError> {
        let mut filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.level));

        for (target, level) in &self.config.targets {
            let directive = format!("{target}={level}");
            let parsed = directive
                .parse()
                .map_err(|e: tracing_subscriber::filter::ParseError| LogInitError::Directive {
                    directive: directive.clone(),
                    reason: e.to_string(),
                })?;
            filter = filter.add_directive(parsed);
        }

        Ok(filter)
    }

    /// Install the subscriber globally
    ///
    /// The returned guard flushes file output on drop; keep it alive for as
    /// long as the process logs.
    pub fn init(self) -> Result<Option<WorkerGuard>, LogInitError> {
        let filter = self.build_filter()?;
        let config = &self.config;

        let json_console = (config.console == ConsoleFormat::Json)
            .then(|| layers::json_layer(std::io::stdout, &config.json));
        let pretty_console = (config.console == ConsoleFormat::Pretty)
            .then(|| tracing_subscriber::fmt::layer().with_ansi(config.ansi).with_target(true));

        let (file_layer, guard) = match &config.file {
            Some(file_config) => {
                let (writer, guard) = file_writer(file_config)?;
                (Some(layers::json_layer(writer, &config.json)), Some(guard))
            }
            None => (None, None),
        };

        Registry::default()
            .with(filter)
            .with(json_console)
            .with(pretty_console)
            .with(file_layer)
            .try_init()
            .map_err(|e| LogInitError::Install(e.to_string()))?;

        Ok(guard)
    }
}

/// Non-blocking rolling writer for file output
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LogInitError> {
    let rotation = match config.rotation {
        FileRotation::Daily => Rotation::DAILY,
        FileRotation::Hourly => Rotation::HOURLY,
        FileRotation::Never => Rotation::NEVER,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(config.prefix.as_str())
        .filename_suffix("log");
    if let Some(keep) = config.keep {
        builder = builder.max_log_files(keep);
    }

    let appender = builder
        .build(&config.directory)
        .map_err(|e| LogInitError::Appender(e.to_string()))?;

    Ok(tracing_appender::non_blocking(appender))
}
