//! Process-local tracing formatter.
//!
//! The fan-out layer reports its own health (drops, retries, shutdown)
//! through `tracing`. This formatter prefixes every diagnostic line with
//! `LOGFAN` so operators can separate the pipeline's own chatter from the
//! application's log output on the same stderr.
//!
//! Output shape:
//!
//! ```text
//! LOGFAN | LEVEL | [span_name{span_fields}:] message {event_fields}
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let subscriber = tracing_subscriber::fmt::Subscriber::builder()
//!     .event_format(logfan::logger::Formatter)
//!     .finish();
//! tracing::subscriber::set_global_default(subscriber)?;
//! ```

use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;

/// Event formatter prefixing every line with `LOGFAN | LEVEL |`.
#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        write!(&mut writer, "LOGFAN | {} | ", metadata.level())?;

        // Include the active span hierarchy, root first.
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                let fields = &ext
                    .get::<FormattedFields<N>>()
                    .expect("will never be `None`");
                if !fields.is_empty() {
                    write!(writer, "{{{fields}}}")?;
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
