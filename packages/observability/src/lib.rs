//! # Observability
//!
//! Logging setup shared by every mall console binary.
//!
//! Components are **log producers** only. They call [`init`] or
//! [`init_with_config`] once at startup and use plain `tracing` macros
//! everywhere else. Where the lines end up is decided here:
//!
//! - a JSONL file (one object per line) when a log path is configured,
//!   defaulting to `~/.mall-console/logs/console.jsonl`;
//! - a compact human-readable stream on stderr when `also_stderr` is set.
//!
//! Credential-bearing fields are redacted before anything is written, so a
//! stray `token = %value` in a call site never lands on disk.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "console".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod json_layer;
mod redact;
mod sink;

use std::path::PathBuf;

pub use json_layer::{JsonLayer, LogEntry};
pub use redact::{redact_fields, REDACTED};
pub use sink::LogFileWriter;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the emitting service, included in every JSON line.
    pub service_name: String,

    /// Default filter (e.g. "debug", "info,auth_engine=trace").
    /// `RUST_LOG` takes precedence when set.
    pub default_level: String,

    /// JSONL output file. `None` uses the default location.
    pub log_path: Option<PathBuf>,

    /// Disable the JSONL file entirely (stderr only).
    pub file_output: bool,

    /// Also emit compact logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            file_output: true,
            also_stderr: false,
        }
    }
}

/// Default JSONL location: `~/.mall-console/logs/console.jsonl`.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".mall-console")
            .join("logs")
            .join("console.jsonl")
    })
}

/// Initialize logging with defaults for the given service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with a custom configuration.
///
/// Falls back to stderr-only output when the log file cannot be opened.
/// Calling this twice is harmless; the second global subscriber is ignored.
pub fn init_with_config(config: LogConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let log_path = config.log_path.clone().or_else(default_log_path);

    let mut file_error = None;
    let json_layer = match (config.file_output, log_path.as_ref()) {
        (true, Some(path)) => match LogFileWriter::new(path) {
            Ok(writer) => Some(
                JsonLayer::new(config.service_name.clone(), writer).with_filter(filter()),
            ),
            Err(e) => {
                file_error = Some(format!("{}: {}", path.display(), e));
                None
            }
        },
        _ => None,
    };

    // Without a file there must be some output, so stderr is forced on.
    let want_stderr = config.also_stderr || json_layer.is_none();
    let stderr_layer = want_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(std::io::stderr)
            .with_filter(filter())
    });

    let installed = tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok();

    if installed {
        if let Some(err) = file_error {
            tracing::warn!(error = %err, "log file unavailable, logging to stderr only");
        }
        tracing::debug!(service = %config.service_name, "observability initialized");
    }
}

pub use tracing::{debug, error, info, instrument, trace, warn};
