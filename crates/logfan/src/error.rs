//! Error taxonomy for the fan-out layer.
//!
//! `ConfigError` is the only fatal error and can only occur at startup.
//! Everything after startup is absorbed: send failures are retried and then
//! dropped with a local drop record, buffer overflow is resolved by the
//! configured policy. No error from this subsystem ever reaches a caller of
//! `log`/`enqueue`.

/// Fatal startup error: required remote-transport configuration is missing
/// or malformed. The process must not start serving traffic with a
/// half-configured registry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Failure reported by the remote transport for one batch send attempt.
///
/// The dispatcher retries `Transient` failures with backoff up to the
/// configured attempt budget; `Permanent` failures drop the batch
/// immediately.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    #[error("transient send failure: {0}")]
    Transient(String),

    #[error("permanent send failure: {0}")]
    Permanent(String),
}

impl SendError {
    /// Whether the dispatcher should retry the batch after this failure.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, SendError::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Missing("LOGFAN_ENDPOINT");
        assert_eq!(
            err.to_string(),
            "missing required configuration: LOGFAN_ENDPOINT"
        );
    }

    #[test]
    fn test_send_error_classification() {
        assert!(SendError::Transient("503".into()).is_transient());
        assert!(!SendError::Permanent("400".into()).is_transient());
    }
}
