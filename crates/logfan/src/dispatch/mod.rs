//! Batching dispatcher: the asynchronous half of the fan-out.
//!
//! Each stream owns a bounded buffer and a single dispatcher task:
//!
//! ```text
//!    callers (any task)
//!        │ enqueue            (sink write + buffered append, non-blocking)
//!        v
//!   ┌───────────────┐  swap   ┌────────────────┐
//!   │  EntryBuffer  │ ──────> │ DispatchService│  (one task per stream)
//!   │  (mutex, C)   │         │ timer / notify │
//!   └───────────────┘         └───────┬────────┘
//!                                     │ send batch, retry w/ backoff
//!                                     v
//!                             remote transport
//! ```
//!
//! The per-stream task is the only sender for its stream, so batch N is
//! fully resolved (delivered or dropped) before batch N+1 goes out. The
//! buffer mutex is held only for the append or the swap, never across I/O,
//! so enqueues are never blocked by an in-flight send.

pub mod buffer;
pub mod service;

pub use buffer::{EntryBuffer, OverflowPolicy};
pub use service::StreamLogger;

pub(crate) use service::{DispatchService, DispatchShared};
