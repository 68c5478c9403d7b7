// Copyright 2025 Tallyflow (https://github.com/tallyflow)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Store failure taxonomy and retry classification.
//!
//! Backing stores report failures as named conditions plus an optional
//! transport status code. The classifier folds those into three outcomes:
//! transient and unclassified failures are retried, permanent ones dropped.
//! Unknown shapes retry because losing data silently is worse than a
//! redundant delivery, which the dedup marker absorbs anyway.

use std::fmt;

use thiserror::Error;

/// Named failure conditions a keyed store can report.
///
/// A closed set: transports mapping a backend's error shapes pick the nearest
/// variant and fall back to [`ServiceErrorKind::Unrecognized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceErrorKind {
    ThroughputExceeded,
    Throttling,
    RequestLimitExceeded,
    InternalServerError,
    ServiceUnavailable,
    TransactionConflict,
    Timeout,
    Network,
    AccessDenied,
    ResourceNotFound,
    ValidationRejected,
    SerializationFailed,
    Unrecognized,
}

impl ServiceErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThroughputExceeded => "throughput exceeded",
            Self::Throttling => "throttling",
            Self::RequestLimitExceeded => "request limit exceeded",
            Self::InternalServerError => "internal server error",
            Self::ServiceUnavailable => "service unavailable",
            Self::TransactionConflict => "transaction conflict",
            Self::Timeout => "timeout",
            Self::Network => "network failure",
            Self::AccessDenied => "access denied",
            Self::ResourceNotFound => "resource not found",
            Self::ValidationRejected => "validation rejected",
            Self::SerializationFailed => "serialization failed",
            Self::Unrecognized => "unrecognized failure",
        }
    }
}

impl fmt::Display for ServiceErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a store operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional operation inside a transaction failed its existence
    /// condition; the whole transaction was rolled back. For the increment
    /// protocol, `op_index == 0` means the dedup marker already exists.
    #[error("transaction canceled: condition failed for operation {op_index}")]
    ConditionFailed { op_index: usize },

    /// The store rejected or failed the call.
    #[error("store error ({kind}): {message}")]
    Service {
        kind: ServiceErrorKind,
        status_code: Option<u16>,
        message: String,
    },
}

impl StoreError {
    pub fn service(kind: ServiceErrorKind, message: impl Into<String>) -> Self {
        Self::Service {
            kind,
            status_code: None,
            message: message.into(),
        }
    }
}

/// Retry decision for one failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Transient,
    Permanent,
    Unclassified,
}

impl FailureClass {
    /// Permanent failures are dropped; transient and unclassified ones go
    /// back to the delivery channel.
    pub fn should_retry(&self) -> bool {
        !matches!(self, Self::Permanent)
    }
}

const TRANSIENT_KINDS: [ServiceErrorKind; 8] = [
    ServiceErrorKind::ThroughputExceeded,
    ServiceErrorKind::Throttling,
    ServiceErrorKind::RequestLimitExceeded,
    ServiceErrorKind::InternalServerError,
    ServiceErrorKind::ServiceUnavailable,
    ServiceErrorKind::TransactionConflict,
    ServiceErrorKind::Timeout,
    ServiceErrorKind::Network,
];

const PERMANENT_KINDS: [ServiceErrorKind; 4] = [
    ServiceErrorKind::AccessDenied,
    ServiceErrorKind::ResourceNotFound,
    ServiceErrorKind::ValidationRejected,
    ServiceErrorKind::SerializationFailed,
];

/// Classify a store failure for retry purposes.
///
/// A 5xx status code marks a failure transient even when its named kind would
/// otherwise read as permanent; the named permanent set only applies below
/// that. Anything that matches neither table is unclassified.
pub fn classify(error: &StoreError) -> FailureClass {
    let StoreError::Service {
        kind, status_code, ..
    } = error
    else {
        return FailureClass::Unclassified;
    };

    if TRANSIENT_KINDS.contains(kind) {
        return FailureClass::Transient;
    }

    if matches!(status_code, Some(code) if *code >= 500) {
        return FailureClass::Transient;
    }

    if PERMANENT_KINDS.contains(kind) {
        return FailureClass::Permanent;
    }

    FailureClass::Unclassified
}
