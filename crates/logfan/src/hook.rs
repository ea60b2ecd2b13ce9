//! Request instrumentation boundary adapter.
//!
//! Invoked once per inbound unit of work: an ingress entry when the work is
//! received, and an `api-performance` entry with elapsed latency when it
//! completes. The hook owns no state beyond its registry handle, never
//! alters the outcome of the instrumented work, and fails open — both
//! emissions are fire-and-forget.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::{Map, Value};

use crate::envelope::{EntryStatus, RequestContext};
use crate::registry::StreamRegistry;
use crate::stream::StreamId;

/// Timing handle returned by [`RequestHook::started`], consumed by
/// [`RequestHook::completed`].
#[derive(Debug)]
pub struct RequestSpan {
    method: String,
    path: String,
    started_at: Instant,
}

impl RequestSpan {
    /// Elapsed time since the work was received.
    #[must_use]
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Boundary adapter emitting one ingress and one completion entry per unit
/// of inbound work.
pub struct RequestHook {
    registry: Arc<StreamRegistry>,
}

impl RequestHook {
    #[must_use]
    pub fn new(registry: Arc<StreamRegistry>) -> RequestHook {
        RequestHook { registry }
    }

    /// Emits the request-received entry and starts the latency clock.
    ///
    /// The closed stream set has no dedicated ingress stream, so ingress
    /// records go to `system-errors`.
    #[must_use]
    pub fn started(
        &self,
        ctx: &RequestContext,
        method: &str,
        path: &str,
        headers: &HashMap<String, String>,
    ) -> RequestSpan {
        let mut extra = Map::new();
        extra.insert("method".to_string(), Value::String(method.to_string()));
        extra.insert("path".to_string(), Value::String(path.to_string()));
        extra.insert(
            "headers".to_string(),
            Value::Object(
                headers
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        );

        self.registry.log(
            StreamId::SystemErrors,
            ctx,
            "request-received",
            path,
            Some(EntryStatus::Success),
            Some(extra),
        );

        RequestSpan {
            method: method.to_string(),
            path: path.to_string(),
            started_at: Instant::now(),
        }
    }

    /// Emits the request-completed entry with elapsed latency and the final
    /// status code.
    pub fn completed(&self, ctx: &RequestContext, span: &RequestSpan, status_code: u16) {
        let mut extra = Map::new();
        extra.insert("method".to_string(), Value::String(span.method.clone()));
        extra.insert("path".to_string(), Value::String(span.path.clone()));
        extra.insert("statusCode".to_string(), Value::from(status_code));
        extra.insert("latencyMs".to_string(), Value::from(span.elapsed_ms()));

        let status = if status_code >= 500 {
            EntryStatus::Failure
        } else {
            EntryStatus::Success
        };

        self.registry.log(
            StreamId::ApiPerformance,
            ctx,
            "request-completed",
            &span.path,
            Some(status),
            Some(extra),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::envelope::LogEntry;
    use crate::error::SendError;
    use crate::sink::{Sink, SinkLevel};
    use crate::transport::Transport;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct NullTransport;

    #[async_trait]
    impl Transport for NullTransport {
        async fn send(&self, _stream: StreamId, _batch: &[LogEntry]) -> Result<(), SendError> {
            Ok(())
        }
    }

    struct RecordingSink {
        entries: Mutex<Vec<LogEntry>>,
    }

    impl Sink for RecordingSink {
        fn write(&self, entry: &LogEntry, _level: SinkLevel) {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }

    fn test_registry(sink: Arc<RecordingSink>) -> Arc<StreamRegistry> {
        let config = Arc::new(Config {
            endpoint: "https://ingest.example.com".to_string(),
            api_key: "test-key".to_string(),
            group: "core-banking".to_string(),
            ..Default::default()
        });
        Arc::new(StreamRegistry::init_with(config, sink, Arc::new(NullTransport)).unwrap())
    }

    #[tokio::test]
    async fn test_hook_emits_ingress_and_completion() {
        let sink = Arc::new(RecordingSink {
            entries: Mutex::new(Vec::new()),
        });
        let registry = test_registry(sink.clone());
        let hook = RequestHook::new(Arc::clone(&registry));

        let ctx = RequestContext {
            actor_id: Some("agent-1".to_string()),
            ..Default::default()
        };
        let headers = HashMap::from([("user-agent".to_string(), "curl/8".to_string())]);

        let span = hook.started(&ctx, "POST", "/v1/transfer", &headers);
        hook.completed(&ctx, &span, 201);

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 2);

        let ingress = &entries[0];
        assert_eq!(ingress.stream, StreamId::SystemErrors);
        assert_eq!(ingress.action, "request-received");
        assert_eq!(ingress.extra["method"], "POST");
        assert_eq!(ingress.extra["headers"]["user-agent"], "curl/8");

        let completion = &entries[1];
        assert_eq!(completion.stream, StreamId::ApiPerformance);
        assert_eq!(completion.action, "request-completed");
        assert_eq!(completion.status, EntryStatus::Success);
        assert_eq!(completion.extra["statusCode"], 201);
        assert!(completion.extra.get("latencyMs").is_some());
        drop(entries);

        registry.shutdown().await;
    }

    #[tokio::test]
    async fn test_server_error_marks_failure() {
        let sink = Arc::new(RecordingSink {
            entries: Mutex::new(Vec::new()),
        });
        let registry = test_registry(sink.clone());
        let hook = RequestHook::new(Arc::clone(&registry));

        let ctx = RequestContext::default();
        let span = hook.started(&ctx, "GET", "/v1/balance", &HashMap::new());
        hook.completed(&ctx, &span, 503);

        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries[1].status, EntryStatus::Failure);
        drop(entries);

        registry.shutdown().await;
    }
}
