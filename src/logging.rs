//! Tracing setup.
//!
//! Traces go to stderr so they never interleave with the session transcript
//! on stdout. An optional daily-rolling file lands in `.testpilot/logs/`.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Clone, Default)]
pub struct LogOptions<'a> {
    /// Fallback filter when `RUST_LOG` is unset
    pub filter: &'a str,
    /// Force debug level for this crate
    pub verbose: bool,
    pub json: bool,
    /// Directory for the rolling file, if file logging is on
    pub log_dir: Option<&'a Path>,
}

fn env_filter(opts: &LogOptions<'_>) -> EnvFilter {
    if opts.verbose {
        return EnvFilter::new("testpilot=debug");
    }
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(opts.filter))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// lifetime of the process or buffered file output is lost.
///
/// A second call is a no-op apart from the returned guard.
pub fn init_tracing(opts: &LogOptions<'_>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match opts.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "testpilot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let json_layer = opts
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let plain_layer = (!opts.json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let _ = tracing_subscriber::registry()
        .with(env_filter(opts))
        .with(json_layer)
        .with(plain_layer)
        .with(file_layer)
        .try_init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_filter() {
        let filter = env_filter(&LogOptions {
            filter: "testpilot=warn",
            verbose: true,
            ..Default::default()
        });
        assert_eq!(filter.to_string(), "testpilot=debug");
    }

    #[test]
    fn test_file_logging_returns_guard() {
        let dir = tempfile::tempdir().unwrap();
        let guard = init_tracing(&LogOptions {
            filter: "testpilot=warn",
            log_dir: Some(dir.path()),
            ..Default::default()
        });
        assert!(guard.is_some());
    }
}
