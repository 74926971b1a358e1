use crate::config::LoggingConfig;
use crate::error::{EtlError, Result};
use std::fmt;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{warn, Event, Subscriber};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{prelude::*, EnvFilter};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";

/// Formats every event as `timestamp - LEVEL - message`.
pub struct LogLineFormat;

impl<S, N> FormatEvent<S, N> for LogLineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let now = chrono::Local::now().format(TIMESTAMP_FORMAT);
        write!(writer, "{} - {} - ", now, event.metadata().level())?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Handle on the process log, passed to whoever needs to read it back.
#[derive(Debug, Clone)]
pub struct LogHandle {
    path: PathBuf,
}

impl LogHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read(&self) -> Result<String> {
        Ok(fs::read_to_string(&self.path)?)
    }
}

fn split_log_path(path: &Path) -> Result<(PathBuf, String)> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| EtlError::Logging(format!("invalid log file path: {}", path.display())))?
        .to_string();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    Ok((dir, file_name))
}

/// Initializes logging with console output and an append-only log file.
///
/// The file is never rotated or truncated, so the log verifier sees every
/// line written since the file was created.
pub fn init_logging(config: &LoggingConfig) -> Result<LogHandle> {
    let (dir, file_name) = split_log_path(&config.file)?;
    fs::create_dir_all(&dir)?;

    // Written synchronously so the verifier can read the file back mid-run.
    let file_appender = tracing_appender::rolling::never(&dir, &file_name);
    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(LogLineFormat)
        .with_ansi(false)
        .with_writer(file_appender);

    let console_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    let directive: Directive = "banks_etl=info"
        .parse()
        .map_err(|e| EtlError::Logging(format!("bad filter directive: {}", e)))?;

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(directive))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| EtlError::Logging(e.to_string()))?;

    Ok(LogHandle::new(dir.join(file_name)))
}

/// Prints the whole process log. Returns false when it cannot be read.
pub fn verify_logs(handle: &LogHandle) -> bool {
    match handle.read() {
        Ok(contents) => {
            println!("\nLog file contents:");
            println!("{}", contents);
            true
        }
        Err(e) => {
            warn!("Error reading log file {}: {}", handle.path().display(), e);
            println!("Error reading log file: {}", e);
            false
        }
    }
}
