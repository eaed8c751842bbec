//! Tracing subscriber setup: console layer plus an optional rolling JSON file.

use std::path::Path;

use eyre::WrapErr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::cli::FILE_GUARD;

/// Install the global subscriber. `RUST_LOG` overrides `level` on the console.
pub fn init_tracing(json: bool, level: &str, logging: &autoz_config::Logging) -> eyre::Result<()> {
    let console_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| eyre::eyre!("invalid log level {level:?}: {e}"))?;

    // stdout carries reports; logs go to stderr
    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file = match logging.file.as_deref() {
        Some(path) => Some(file_layer(path, logging, level)?),
        None => None,
    };

    Registry::default()
        .with(console.with_filter(console_filter))
        .with(file)
        .try_init()
        .map_err(|e| eyre::eyre!("install tracing subscriber: {e}"))
}

fn file_layer<S>(
    path: &str,
    logging: &autoz_config::Logging,
    fallback_level: &str,
) -> eyre::Result<Box<dyn Layer<S> + Send + Sync>>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let rotation = match logging.rotation.as_deref().unwrap_or("never") {
        "never" => Rotation::NEVER,
        "daily" => Rotation::DAILY,
        "hourly" => Rotation::HOURLY,
        other => eyre::bail!("logging.rotation must be never|daily|hourly, got {other:?}"),
    };

    let p = Path::new(path);
    let dir = p
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = p
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file {path:?} has no file name"))?
        .to_string_lossy()
        .into_owned();

    let appender = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(name)
        .build(dir)
        .wrap_err_with(|| format!("open log file {path:?}"))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = FILE_GUARD.set(guard);

    let level = logging.level.as_deref().unwrap_or(fallback_level);
    let filter =
        EnvFilter::try_new(level).map_err(|e| eyre::eyre!("invalid logging.level {level:?}: {e}"))?;

    Ok(fmt::layer()
        .json()
        .with_ansi(false)
        .with_writer(writer)
        .with_filter(filter)
        .boxed())
}
