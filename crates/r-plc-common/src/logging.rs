//! ---
//! plc_section: "01-core-functionality"
//! plc_subsection: "module"
//! plc_type: "source"
//! plc_scope: "code"
//! plc_description: "Tracing subscriber setup for the daemon."
//! plc_version: "v0.0.0-prealpha"
//! plc_owner: "tbd"
//! ---
use std::io;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Filter override checked before `RUST_LOG`.
pub const LOG_ENV: &str = "R_PLC_LOG";
const DEFAULT_DIRECTIVE: &str = "debug";

// Writer guards live for the whole process so buffered lines are flushed.
static GUARDS: OnceCell<Vec<WorkerGuard>> = OnceCell::new();

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Stream that receives console log output.
///
/// Dry runs print line protocol on stdout, so their logs go to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

/// Pick the filter directive: `R_PLC_LOG`, then `RUST_LOG`, then `debug`.
/// Blank values count as unset.
pub fn resolve_directive(custom: Option<&str>, rust_log: Option<&str>) -> String {
    [custom, rust_log]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|directive| !directive.is_empty())
        .unwrap_or(DEFAULT_DIRECTIVE)
        .to_owned()
}

fn env_filter() -> EnvFilter {
    let custom = std::env::var(LOG_ENV).ok();
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = resolve_directive(custom.as_deref(), rust_log.as_deref());
    EnvFilter::try_new(&directive).unwrap_or_else(|err| {
        eprintln!("invalid log directive {directive:?} ({err}); using {DEFAULT_DIRECTIVE}");
        EnvFilter::new(DEFAULT_DIRECTIVE)
    })
}

fn console_layer<S>(
    format: LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::layer().with_timer(fmt::time::UtcTime::rfc_3339());
    match format {
        LogFormat::StructuredJson => layer.with_target(false).json().with_writer(writer).boxed(),
        LogFormat::Pretty => layer.with_target(true).with_writer(writer).boxed(),
    }
}

/// Install the global subscriber.
///
/// Console output follows [`LogFormat`] on the chosen stream. When
/// `config.file` is set a daily rolling JSON file is added under
/// `config.directory`. A second call is a no-op.
pub fn init_tracing(service_name: &str, config: &LoggingConfig, console: ConsoleTarget) -> Result<()> {
    let mut guards = Vec::with_capacity(2);

    let (console_writer, guard) = match console {
        ConsoleTarget::Stdout => tracing_appender::non_blocking(io::stdout()),
        ConsoleTarget::Stderr => tracing_appender::non_blocking(io::stderr()),
    };
    guards.push(guard);

    let file_layer = if config.file {
        std::fs::create_dir_all(&config.directory).with_context(|| {
            format!("failed to create log directory {}", config.directory.display())
        })?;
        let prefix = config.file_prefix.as_deref().unwrap_or(service_name);
        let (writer, guard) =
            tracing_appender::non_blocking(daily(&config.directory, format!("{prefix}.log")));
        guards.push(guard);
        Some(
            fmt::layer()
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .json()
                .with_writer(writer),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(console_layer(config.format, console_writer))
        .with(file_layer)
        .try_init()
        .is_ok();
    if installed {
        let _ = GUARDS.set(guards);
        info!(
            service = %service_name,
            format = ?config.format,
            console = ?console,
            log_file = config.file,
            log_dir = %config.directory.display(),
            "tracing initialised"
        );
    }
    Ok(())
}
