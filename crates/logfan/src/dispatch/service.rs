//! Per-stream dispatcher: enqueue front-end and flush/send task.
//!
//! [`StreamLogger`] is the handle callers reach through the registry; its
//! `enqueue` writes the local sink first (synchronous, guaranteed) and then
//! appends to the stream's bounded buffer. [`DispatchService`] is the
//! single task that drains the buffer — on a timer, when the buffer reaches
//! capacity, or once at shutdown — and drives the remote send with bounded
//! retry. Failed batches are dropped and recorded through the local sink
//! directly, never re-enqueued, so a broken transport cannot feed itself.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::dispatch::buffer::EntryBuffer;
use crate::envelope::{EntryStatus, LogEntry, RequestContext};
use crate::error::SendError;
use crate::sink::{Sink, SinkLevel};
use crate::stream::StreamId;
use crate::transport::Transport;

/// State shared between a stream's enqueue front-end and its dispatcher
/// task. The mutex is held only for the append or the swap.
pub(crate) struct DispatchShared {
    buffer: Mutex<EntryBuffer>,
    dropped: AtomicU64,
    capacity_notify: Notify,
}

impl DispatchShared {
    pub(crate) fn new(buffer: EntryBuffer) -> DispatchShared {
        DispatchShared {
            buffer: Mutex::new(buffer),
            dropped: AtomicU64::new(0),
            capacity_notify: Notify::new(),
        }
    }
}

/// Per-stream logger handle. One per [`StreamId`], owned by the registry,
/// alive for the whole process.
pub struct StreamLogger {
    stream: StreamId,
    shared: Arc<DispatchShared>,
    sink: Arc<dyn Sink>,
}

impl StreamLogger {
    pub(crate) fn new(
        stream: StreamId,
        shared: Arc<DispatchShared>,
        sink: Arc<dyn Sink>,
    ) -> StreamLogger {
        StreamLogger {
            stream,
            shared,
            sink,
        }
    }

    /// The stream this logger feeds.
    #[must_use]
    pub fn stream(&self) -> StreamId {
        self.stream
    }

    /// Accepts an entry: local sink first, then the bounded buffer.
    ///
    /// Never blocks on network I/O and never fails. A full buffer is
    /// resolved by the configured overflow policy; the drop is counted and
    /// reported by the dispatcher once per flush cycle.
    pub fn enqueue(&self, entry: LogEntry) {
        self.sink.write(&entry, SinkLevel::for_entry(&entry));

        let (dropped, full) = {
            #[allow(clippy::expect_used)]
            let mut buffer = self.shared.buffer.lock().expect("lock poisoned");
            let dropped = buffer.push(entry);
            (dropped, buffer.is_full())
        };

        if dropped {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
        }
        if full {
            self.shared.capacity_notify.notify_one();
        }
    }
}

/// The flush/send task for one stream. Spawned once by the registry;
/// runs until the cancellation token fires, then performs a final flush.
pub(crate) struct DispatchService {
    stream: StreamId,
    shared: Arc<DispatchShared>,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn Sink>,
    flush_interval: std::time::Duration,
    retry_attempts: u32,
    retry_base_delay: std::time::Duration,
    cancel: CancellationToken,
}

impl DispatchService {
    pub(crate) fn new(
        stream: StreamId,
        shared: Arc<DispatchShared>,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn Sink>,
        config: &Config,
        cancel: CancellationToken,
    ) -> DispatchService {
        DispatchService {
            stream,
            shared,
            transport,
            sink,
            flush_interval: config.flush_interval,
            retry_attempts: config.retry_attempts,
            retry_base_delay: config.retry_base_delay,
            cancel,
        }
    }

    /// Runs the flush loop until cancellation.
    ///
    /// Flush triggers, whichever fires first: the interval timer, or the
    /// buffer reaching capacity. Entry content never triggers a flush.
    pub(crate) async fn run(self) {
        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // discard first tick, which is instantaneous

        debug!("DISPATCH | {} | dispatcher started", self.stream);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush_once().await;
                }
                () = self.shared.capacity_notify.notified() => {
                    self.flush_once().await;
                    ticker.reset();
                }
                () = self.cancel.cancelled() => {
                    debug!("DISPATCH | {} | shutdown, final flush", self.stream);
                    self.flush_once().await;
                    break;
                }
            }
        }
    }

    /// Swaps the active buffer and resolves the resulting batch: delivered,
    /// or dropped with a local record. At most one batch is in flight per
    /// stream at any time.
    async fn flush_once(&self) {
        self.report_overflow();

        let batch: Vec<LogEntry> = {
            #[allow(clippy::expect_used)]
            let mut buffer = self.shared.buffer.lock().expect("lock poisoned");
            buffer.drain()
        };
        if batch.is_empty() {
            return;
        }

        debug!(
            "DISPATCH | {} | flushing batch of {}",
            self.stream,
            batch.len()
        );

        if let Err(e) = self.send_with_retry(&batch).await {
            error!(
                "DISPATCH | {} | dropping batch of {}: {}",
                self.stream,
                batch.len(),
                e
            );
            self.record_batch_drop(batch.len(), &e);
        }
    }

    /// Sends one batch, retrying transient failures with exponential
    /// backoff up to the configured attempt budget.
    async fn send_with_retry(&self, batch: &[LogEntry]) -> Result<(), SendError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.transport.send(self.stream, batch).await {
                Ok(()) => return Ok(()),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) => {
                    if attempt >= self.retry_attempts {
                        return Err(e);
                    }
                    let backoff = self.retry_base_delay * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        "DISPATCH | {} | send attempt {}/{} failed ({}), retrying in {:?}",
                        self.stream, attempt, self.retry_attempts, e, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Emits one `system-errors` record for any overflow drops accumulated
    /// since the last flush cycle. One record per cycle, not per entry.
    fn report_overflow(&self) {
        let count = self.shared.dropped.swap(0, Ordering::Relaxed);
        if count == 0 {
            return;
        }
        warn!(
            "DISPATCH | {} | buffer overflow, {} entries dropped",
            self.stream, count
        );
        self.sink.write(
            &drop_record(self.stream, "log-buffer-overflow", count, None),
            SinkLevel::Error,
        );
    }

    /// Records an irrecoverably lost batch. Written through the local sink
    /// directly rather than re-enqueued, to avoid a failure feedback loop.
    fn record_batch_drop(&self, count: usize, cause: &SendError) {
        self.sink.write(
            &drop_record(
                self.stream,
                "log-batch-dropped",
                count as u64,
                Some(cause.to_string()),
            ),
            SinkLevel::Error,
        );
    }
}

/// Synthesizes the `system-errors` entry documenting dropped data.
fn drop_record(stream: StreamId, action: &str, count: u64, cause: Option<String>) -> LogEntry {
    let mut extra = Map::new();
    extra.insert(
        "droppedStream".to_string(),
        Value::String(stream.as_str().to_string()),
    );
    extra.insert("droppedCount".to_string(), Value::from(count));
    if let Some(cause) = cause {
        extra.insert("cause".to_string(), Value::String(cause));
    }

    LogEntry::build(
        StreamId::SystemErrors,
        &RequestContext::default(),
        action,
        stream.as_str(),
        Some(EntryStatus::Failure),
        Some(extra),
    )
}
