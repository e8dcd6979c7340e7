use std::path::Path;

use anyhow::Context;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const STDERR_DEFAULT: &str = "warn";
const FILE_DEFAULT: &str = "info";

/// Stderr filter: `RUST_LOG` when it parses, `warn` otherwise.
fn stderr_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(STDERR_DEFAULT))
}

/// Each layer carries its own filter so the log file keeps per-file `info`
/// lines while the terminal stays quiet.
fn subscriber<E, F>(stderr: E, file: Option<F>, filter: EnvFilter) -> impl Subscriber + Send + Sync
where
    E: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    F: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let file_layer = file.map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(EnvFilter::new(FILE_DEFAULT))
    });

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(stderr)
                .with_target(false)
                .without_time()
                .with_filter(filter),
        )
        .with(file_layer)
}

/// Install the global subscriber: stderr filtered by `RUST_LOG` (default
/// `warn`), plus a plain-text `info` file layer when `log_file` is set.
///
/// Keep the returned guard alive until exit or buffered file lines are lost.
pub fn init_logger(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let (file_writer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("log file has no name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;

            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(non_blocking), Some(guard))
        }
        None => (None, None),
    };

    subscriber(std::io::stderr, file_writer, stderr_filter(rust_log.as_deref())).init();

    Ok(guard)
}
