//! Logging configuration
//!
//! Deserializable from the `[logging]` table of the service config. Every
//! field has a default, so an empty table yields JSON lines on stdout at
//! `info`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Base level, used when `RUST_LOG` is unset
    pub level: String,

    pub console: ConsoleFormat,

    /// Colors in pretty console output
    pub ansi: bool,

    /// Rolling JSONL file output, off when absent
    pub file: Option<FileConfig>,

    /// Shape of every JSON record, console and file alike
    pub json: JsonFormat,

    /// Per-target level overrides, e.g. `schemata_sync = "debug"`
    pub targets: BTreeMap<String, String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: ConsoleFormat::Json,
            ansi: false,
            file: None,
            json: JsonFormat::default(),
            targets: BTreeMap::new(),
        }
    }
}

impl LogConfig {
    /// Human-readable console output at `debug`, for running by hand
    pub fn pretty() -> Self {
        Self {
            level: "debug".to_string(),
            console: ConsoleFormat::Pretty,
            ansi: true,
            ..Default::default()
        }
    }

    /// Unattended deployment: rotated JSONL files under `log_dir`, no console
    pub fn service(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            console: ConsoleFormat::Off,
            file: Some(FileConfig {
                directory: log_dir.into(),
                keep: Some(14),
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

/// What goes to stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleFormat {
    #[default]
    Json,
    Pretty,
    Off,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub directory: PathBuf,
    /// File name prefix; the suffix is always `log`
    pub prefix: String,
    pub rotation: FileRotation,
    /// Rotated files kept on disk, unbounded when absent
    pub keep: Option<usize>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./logs"),
            prefix: "schemata-sync".to_string(),
            rotation: FileRotation::Daily,
            keep: Some(7),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileRotation {
    #[default]
    Daily,
    Hourly,
    /// One file, never rotated
    Never,
}

/// Optional parts of a JSON record
///
/// The current span is always included since that is where `rid` lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonFormat {
    /// Event fields at the top level instead of under `fields`
    pub flatten: bool,
    /// Full list of entered spans, outermost first
    pub span_list: bool,
    /// Source file and line
    pub location: bool,
    /// Thread id and name
    pub thread: bool,
}

impl Default for JsonFormat {
    fn default() -> Self {
        Self {
            flatten: true,
            span_list: true,
            location: false,
            thread: false,
        }
    }
}
