//! # logfan
//!
//! Per-stream structured log fan-out: events are tagged with a logical
//! stream, wrapped in a canonical envelope, mirrored synchronously to a
//! local sink, and delivered in batches to a remote aggregation endpoint.
//!
//! ## Architecture
//!
//! ```text
//!    caller
//!      │  log(stream, ctx, action, ...)
//!      v
//!    ┌──────────────────┐
//!    │  StreamRegistry  │  (one StreamLogger per StreamId)
//!    └────────┬─────────┘
//!             │ enqueue
//!      ┌──────┴───────┐
//!      v              v
//!  ┌────────┐   ┌────────────┐
//!  │  Sink  │   │  Dispatch  │  (bounded buffer, flush timer,
//!  │ (sync) │   │   (async)  │   retry with backoff)
//!  └────────┘   └─────┬──────┘
//!                     v
//!              remote aggregation endpoint
//! ```
//!
//! Delivery to the remote endpoint is best-effort: nothing in this crate is
//! allowed to fail or block a caller. Ordering is preserved within a stream
//! (at most one in-flight send per stream), never across streams.

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![deny(unused_extern_crates)]

/// Env-driven configuration with startup validation.
pub mod config;

/// Batching dispatcher: bounded buffers, flush scheduling, retry.
pub mod dispatch;

/// The canonical log envelope and its builder.
pub mod envelope;

/// Error taxonomy shared across the crate.
pub mod error;

/// Request instrumentation boundary adapter.
pub mod hook;

/// Process-local tracing formatter.
pub mod logger;

/// Stream registry: logger construction, routing, shutdown.
pub mod registry;

/// Local synchronous sink.
pub mod sink;

/// The closed set of logical streams.
pub mod stream;

/// Remote transport seam and HTTP implementation.
pub mod transport;

pub use config::Config;
pub use dispatch::{OverflowPolicy, StreamLogger};
pub use envelope::{EntryStatus, LogEntry, RequestContext, UNKNOWN_AGENT};
pub use error::{ConfigError, SendError};
pub use hook::{RequestHook, RequestSpan};
pub use registry::StreamRegistry;
pub use sink::{ConsoleSink, Sink, SinkLevel};
pub use stream::StreamId;
pub use transport::{HttpTransport, Transport};
