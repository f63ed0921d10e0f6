//! Logging initialization for the console.
//!
//! Thin wrapper over the observability package: JSONL lines go to
//! `<base>/logs/console.jsonl`, and stderr output is opt-in.

use crate::Paths;
use observability::LogConfig;

/// Initialize the logging system.
///
/// # Arguments
///
/// * `level` - Default filter (overridden by `RUST_LOG`)
/// * `paths` - Console paths; the JSONL file lives in its logs directory
/// * `verbose` - Mirror log lines to stderr
pub fn init_logging(level: &str, paths: &Paths, verbose: bool) {
    observability::init_with_config(LogConfig {
        service_name: "mall-console".into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        file_output: true,
        also_stderr: verbose,
    });
}
