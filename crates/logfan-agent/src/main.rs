//! Line-oriented local agent for the logfan pipeline.
//!
//! Reads one JSON log request per stdin line, runs it through the request
//! instrumentation hook and the stream registry, and shuts down with a
//! bounded final flush on ctrl-c or end of input. The HTTP server that
//! would normally sit in front of this pipeline is out of scope; this
//! binary is the local wiring that exercises the whole fan-out.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use logfan::{
    logger, Config, EntryStatus, RequestContext, RequestHook, StreamId, StreamRegistry,
};

/// One inbound log request, parsed from a stdin line.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogRequest {
    stream: StreamId,
    action: String,
    subject_id: String,
    #[serde(default)]
    status: Option<EntryStatus>,
    #[serde(default)]
    extra: Option<Map<String, Value>>,
    #[serde(default)]
    context: ContextFields,
}

/// Ambient context supplied by the caller alongside the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextFields {
    actor_id: Option<String>,
    source_ip: Option<String>,
    endpoint: Option<String>,
    role: Option<String>,
}

impl From<ContextFields> for RequestContext {
    fn from(fields: ContextFields) -> RequestContext {
        RequestContext {
            actor_id: fields.actor_id,
            source_ip: fields.source_ip,
            endpoint: fields.endpoint,
            role: fields.role,
        }
    }
}

#[tokio::main]
async fn main() {
    let log_level = std::env::var("LOGFAN_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("hyper=off,reqwest=off,{log_level}");

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .event_format(logger::Formatter)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match Config::from_env() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Error loading configuration on agent startup: {e}");
            return;
        }
    };

    let registry = match StreamRegistry::init_all(Arc::clone(&config)) {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            error!("Error initializing stream registry: {e}");
            return;
        }
    };
    let hook = RequestHook::new(Arc::clone(&registry));

    info!("logfan-agent started, reading log requests from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => handle_line(&registry, &hook, &line),
                    Ok(None) => {
                        debug!("stdin closed, shutting down");
                        break;
                    }
                    Err(e) => {
                        error!("Error reading stdin: {e}");
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("received shutdown signal");
                break;
            }
        }
    }

    registry.shutdown().await;
    info!("logfan-agent stopped");
}

/// Processes one intake line: instruments it as a unit of work and routes
/// the request through the registry. A malformed line is reported and
/// skipped; nothing here can fail the intake loop.
fn handle_line(registry: &StreamRegistry, hook: &RequestHook, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    let headers = HashMap::new();
    match serde_json::from_str::<LogRequest>(line) {
        Ok(request) => {
            let ctx: RequestContext = request.context.into();
            let span = hook.started(&ctx, "INGEST", "/stdin", &headers);
            registry.log(
                request.stream,
                &ctx,
                &request.action,
                &request.subject_id,
                request.status,
                request.extra,
            );
            hook.completed(&ctx, &span, 200);
        }
        Err(e) => {
            error!("Skipping malformed log request: {e}");
            let ctx = RequestContext::default();
            let span = hook.started(&ctx, "INGEST", "/stdin", &headers);
            hook.completed(&ctx, &span, 400);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_request_parses_full_payload() {
        let line = r#"{
            "stream": "account-transactions",
            "action": "account-credit",
            "subjectId": "acct-42",
            "status": "FAILURE",
            "extra": {"amount": 250},
            "context": {"actorId": "agent-7", "sourceIp": "10.0.0.1", "role": "teller"}
        }"#;

        let request: LogRequest = serde_json::from_str(line).unwrap();
        assert_eq!(request.stream, StreamId::AccountTransactions);
        assert_eq!(request.action, "account-credit");
        assert_eq!(request.subject_id, "acct-42");
        assert_eq!(request.status, Some(EntryStatus::Failure));
        assert_eq!(
            request.context.actor_id.as_deref(),
            Some("agent-7")
        );
    }

    #[test]
    fn test_log_request_minimal_payload() {
        let line = r#"{"stream": "audit-log", "action": "login", "subjectId": "user-1"}"#;

        let request: LogRequest = serde_json::from_str(line).unwrap();
        assert_eq!(request.stream, StreamId::AuditLog);
        assert!(request.status.is_none());
        assert!(request.extra.is_none());
        assert!(request.context.actor_id.is_none());
    }

    #[test]
    fn test_unknown_stream_is_rejected() {
        let line = r#"{"stream": "not-a-stream", "action": "x", "subjectId": "y"}"#;
        assert!(serde_json::from_str::<LogRequest>(line).is_err());
    }
}
