//! Stream registry: owns every per-stream logger and its dispatcher task.
//!
//! Built once at startup and passed by reference (or `Arc`) to consumers —
//! there is no global logger map. `resolve` is a total function over the
//! closed [`StreamId`] set, so routing can never fail after `init_all`
//! has succeeded.

use std::sync::{Arc, Mutex};

use futures::future::join_all;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::dispatch::{DispatchService, DispatchShared, EntryBuffer, StreamLogger};
use crate::envelope::{EntryStatus, LogEntry, RequestContext};
use crate::error::ConfigError;
use crate::sink::{ConsoleSink, Sink};
use crate::stream::StreamId;
use crate::transport::{HttpTransport, Transport};

/// Owner of one [`StreamLogger`] per [`StreamId`] and of the dispatcher
/// tasks behind them. Lifetime equals process lifetime.
pub struct StreamRegistry {
    /// Loggers in [`StreamId::ALL`] order; indexed by `StreamId::index`.
    loggers: Vec<StreamLogger>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    shutdown_deadline: std::time::Duration,
}

impl StreamRegistry {
    /// Constructs the registry with the default console sink and HTTP
    /// transport. Fails fatally on missing or malformed transport
    /// configuration.
    ///
    /// Must be called within a tokio runtime: one dispatcher task is
    /// spawned per stream.
    pub fn init_all(config: Arc<Config>) -> Result<StreamRegistry, ConfigError> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        StreamRegistry::init_with(config, Arc::new(ConsoleSink::new()), transport)
    }

    /// Constructs the registry with explicit sink and transport
    /// implementations. This is the seam used by tests.
    pub fn init_with(
        config: Arc<Config>,
        sink: Arc<dyn Sink>,
        transport: Arc<dyn Transport>,
    ) -> Result<StreamRegistry, ConfigError> {
        if config.buffer_capacity == 0 {
            return Err(ConfigError::Invalid(
                "buffer capacity must be greater than 0".to_string(),
            ));
        }

        let cancel = CancellationToken::new();
        let mut loggers = Vec::with_capacity(StreamId::ALL.len());
        let mut tasks = Vec::with_capacity(StreamId::ALL.len());

        for stream in StreamId::ALL {
            let shared = Arc::new(DispatchShared::new(EntryBuffer::new(
                config.buffer_capacity,
                config.overflow_policy,
            )));
            let service = DispatchService::new(
                stream,
                Arc::clone(&shared),
                Arc::clone(&transport),
                Arc::clone(&sink),
                &config,
                cancel.child_token(),
            );
            tasks.push(tokio::spawn(service.run()));
            loggers.push(StreamLogger::new(stream, shared, Arc::clone(&sink)));
        }

        debug!("REGISTRY | started {} stream loggers", loggers.len());

        Ok(StreamRegistry {
            loggers,
            cancel,
            tasks: Mutex::new(tasks),
            shutdown_deadline: config.shutdown_deadline,
        })
    }

    /// Resolves the logger for a stream. Total over the closed enum.
    #[must_use]
    pub fn resolve(&self, stream: StreamId) -> &StreamLogger {
        &self.loggers[stream.index()]
    }

    /// Fire-and-forget inbound contract: builds the envelope and enqueues
    /// it. Callers observe no return value and must not depend on delivery.
    pub fn log(
        &self,
        stream: StreamId,
        ctx: &RequestContext,
        action: &str,
        subject_id: &str,
        status: Option<EntryStatus>,
        extra: Option<Map<String, Value>>,
    ) {
        let entry = LogEntry::build(stream, ctx, action, subject_id, status, extra);
        self.resolve(stream).enqueue(entry);
    }

    /// Best-effort final flush of every stream, bounded by the shutdown
    /// deadline. Entries not flushed within the deadline are dropped
    /// without error.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = {
            #[allow(clippy::expect_used)]
            let mut guard = self.tasks.lock().expect("lock poisoned");
            std::mem::take(&mut *guard)
        };
        if handles.is_empty() {
            return;
        }

        if tokio::time::timeout(self.shutdown_deadline, join_all(handles))
            .await
            .is_err()
        {
            warn!("REGISTRY | shutdown deadline exceeded, pending entries dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkLevel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn send(
            &self,
            _stream: StreamId,
            _batch: &[LogEntry],
        ) -> Result<(), crate::error::SendError> {
            Ok(())
        }
    }

    struct CountingSink {
        writes: AtomicUsize,
    }

    impl Sink for CountingSink {
        fn write(&self, _entry: &LogEntry, _level: SinkLevel) {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn test_config() -> Arc<Config> {
        Arc::new(Config {
            endpoint: "https://ingest.example.com".to_string(),
            api_key: "test-key".to_string(),
            group: "core-banking".to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_init_with_builds_one_logger_per_stream() {
        let registry = StreamRegistry::init_with(
            test_config(),
            Arc::new(CountingSink {
                writes: AtomicUsize::new(0),
            }),
            Arc::new(NullTransport),
        )
        .unwrap();

        for stream in StreamId::ALL {
            assert_eq!(registry.resolve(stream).stream(), stream);
        }
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_init_all_rejects_missing_config() {
        let config = Arc::new(Config::default());
        assert!(StreamRegistry::init_all(config).is_err());
    }

    #[tokio::test]
    async fn test_log_writes_local_sink_synchronously() {
        let sink = Arc::new(CountingSink {
            writes: AtomicUsize::new(0),
        });
        let registry =
            StreamRegistry::init_with(test_config(), sink.clone(), Arc::new(NullTransport))
                .unwrap();

        for i in 0..4 {
            registry.log(
                StreamId::AuditLog,
                &RequestContext::default(),
                "login",
                &format!("user-{i}"),
                None,
                None,
            );
        }

        assert_eq!(sink.writes.load(Ordering::SeqCst), 4);
        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let registry = StreamRegistry::init_with(
            test_config(),
            Arc::new(CountingSink {
                writes: AtomicUsize::new(0),
            }),
            Arc::new(NullTransport),
        )
        .unwrap();

        registry.shutdown().await;
        registry.shutdown().await;
    }
}
