//! The closed set of logical log streams.
//!
//! Streams are fixed at compile time; there is no dynamic stream creation.
//! Each stream is routed independently and owns its own buffer, flush timer
//! and delivery ordering.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a logical log stream.
///
/// The set is closed: `resolve` over this enum is a total function and the
/// registry builds exactly one logger per variant at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StreamId {
    ClientProfileManagement,
    CommunicationTransactions,
    AccountTransactions,
    IdentityVerification,
    AuditLog,
    SystemErrors,
    ApiPerformance,
}

impl StreamId {
    /// Every stream, in registry construction order.
    pub const ALL: [StreamId; 7] = [
        StreamId::ClientProfileManagement,
        StreamId::CommunicationTransactions,
        StreamId::AccountTransactions,
        StreamId::IdentityVerification,
        StreamId::AuditLog,
        StreamId::SystemErrors,
        StreamId::ApiPerformance,
    ];

    /// Wire name of the stream, as sent to the aggregation endpoint.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StreamId::ClientProfileManagement => "client-profile-management",
            StreamId::CommunicationTransactions => "communication-transactions",
            StreamId::AccountTransactions => "account-transactions",
            StreamId::IdentityVerification => "identity-verification",
            StreamId::AuditLog => "audit-log",
            StreamId::SystemErrors => "system-errors",
            StreamId::ApiPerformance => "api-performance",
        }
    }

    /// Position of this stream in [`StreamId::ALL`].
    ///
    /// The registry stores loggers in `ALL` order, so this index is always
    /// in bounds there.
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
