//! Logging setup.
//!
//! Call [`init`] once at startup. Under systemd, events go to the journal;
//! anywhere else they are written to stdout, filtered by `RUST_LOG`
//! (default `info`). Wire traffic is logged at `trace`, so
//! `RUST_LOG=moonshot_miner::stratum_v1=trace` shows every frame.
//!
//! The rest of the crate uses `use crate::tracing::prelude::*` for the level
//! macros.

use std::fmt;

use time::OffsetDateTime;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{
        FmtContext, FormatEvent, FormatFields,
        format::Writer as FmtWriter,
        time::FormatTime,
    },
    prelude::*,
    registry::LookupSpan,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Prefix stripped from our own targets.
const CRATE_TARGET: &str = "moonshot_miner::";

/// Whether stderr is the stream systemd set up for this service.
///
/// systemd exports `JOURNAL_STREAM=<device>:<inode>` for the stream it
/// connected; a match against stderr rules out inherited variables after
/// redirection.
#[cfg(target_os = "linux")]
fn stderr_is_journal_stream() -> bool {
    use std::os::unix::io::AsRawFd;

    let Ok(value) = std::env::var("JOURNAL_STREAM") else {
        return false;
    };
    let Some((dev, ino)) = parse_journal_stream(&value) else {
        return false;
    };

    match nix::sys::stat::fstat(std::io::stderr().as_raw_fd()) {
        Ok(stat) => stat.st_dev as u64 == dev && stat.st_ino as u64 == ino,
        Err(_) => false,
    }
}

#[cfg(not(target_os = "linux"))]
fn stderr_is_journal_stream() -> bool {
    false
}

fn parse_journal_stream(value: &str) -> Option<(u64, u64)> {
    let (dev, ino) = value.split_once(':')?;
    Some((dev.parse().ok()?, ino.parse().ok()?))
}

/// Install the global subscriber.
pub fn init() {
    if stderr_is_journal_stream() {
        match tracing_journald::layer() {
            Ok(layer) => {
                tracing_subscriber::registry().with(layer).init();
                return;
            }
            Err(e) => eprintln!("journald unavailable ({}), logging to stdout", e),
        }
    }

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().event_format(LineFormatter))
        .init();
}

/// One line per event: `HH:MM:SS LEVEL target: message key=value ...`.
struct LineFormatter;

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: String,
}

impl Visit for FieldCollector {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.push(field, format_args!("{}", value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.push(field, format_args!("{:?}", value));
        }
    }
}

impl FieldCollector {
    fn push(&mut self, field: &Field, value: fmt::Arguments<'_>) {
        if field.name().starts_with("log.") {
            return;
        }
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        self.fields.push_str(&format!("{}={}", field.name(), value));
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: FmtWriter<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        LocalTimer.format_time(&mut writer)?;

        let level = *event.metadata().level();
        let ansi = writer.has_ansi_escapes();
        if ansi {
            let color = match level {
                Level::ERROR => "31",
                Level::WARN => "33",
                Level::INFO => "32",
                Level::DEBUG => "34",
                Level::TRACE => "35",
            };
            write!(writer, " \x1b[{}m{:<5}\x1b[0m ", color, level)?;
        } else {
            write!(writer, " {:<5} ", level)?;
        }

        let target = event.metadata().target();
        write!(writer, "{}: {}", short_target(target), visitor.message)?;

        if !visitor.fields.is_empty() {
            if ansi {
                write!(writer, " \x1b[90m{}\x1b[0m", visitor.fields)?;
            } else {
                write!(writer, " {}", visitor.fields)?;
            }
        }

        writeln!(writer)
    }
}

fn short_target(target: &str) -> &str {
    target.strip_prefix(CRATE_TARGET).unwrap_or(target)
}

/// Local wall-clock time to the second.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut FmtWriter<'_>) -> fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let formatted = now
            .format(time::macros::format_description!("[hour]:[minute]:[second]"))
            .map_err(|_| fmt::Error)?;
        write!(w, "{}", formatted)
    }
}
