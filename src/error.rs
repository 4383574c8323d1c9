//! Error types for trace decoding.
//!
//! Errors fall into two groups: stream-fatal errors ([`TraceError`]) that end
//! the decode loop because byte alignment can no longer be trusted, and
//! record-scoped errors ([`ClassificationError`], [`NotifyError`]) that only
//! concern the offending record.

use thiserror::Error;

use crate::trace::TraceRecord;

/// Stream-fatal decoding errors.
#[derive(Debug, Error)]
pub enum TraceError {
    /// Bad magic or version in a record header.
    #[error("bad {field}: found {found:#x}, expected {expected:#x}")]
    Format {
        field: &'static str,
        found: u32,
        expected: u32,
    },

    /// Input ended inside a header or payload.
    #[error("truncated {what} at offset {offset}: needed {needed} bytes, got {available}")]
    Truncated {
        what: &'static str,
        offset: u64,
        needed: usize,
        available: usize,
    },

    /// Payload handed to a record constructor disagrees with `pdu_len`.
    #[error("payload is {found} bytes but pdu_len is {declared}")]
    PayloadLength { declared: usize, found: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The subtype bits of an action code are outside the known vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("unknown action subtype {subtype} in action code {code:#010x}")]
    UnknownAction { code: u32, subtype: u32 },

    #[error("unknown notify subtype {subtype} in action code {code:#010x}")]
    UnknownNotify { code: u32, subtype: u32 },
}

/// A notify record could not be applied to the session state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("malformed notify payload: expected {expected} bytes, found {found}")]
    MalformedPayload { expected: usize, found: usize },

    #[error("notify payload is not valid UTF-8: {0}")]
    InvalidText(#[from] std::str::Utf8Error),
}

/// Any error surfaced by a decoding [`Session`](crate::session::Session).
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Trace(#[from] TraceError),

    #[error("record {sequence} at offset {offset}: {source}")]
    Classification {
        sequence: u32,
        offset: u64,
        record: Box<TraceRecord>,
        #[source]
        source: ClassificationError,
    },

    #[error("record {sequence} at offset {offset}: {source}")]
    Notify {
        sequence: u32,
        offset: u64,
        record: Box<TraceRecord>,
        #[source]
        source: NotifyError,
    },
}

impl SessionError {
    /// Whether the error terminates the decode loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionError::Trace(_))
    }

    /// The offending record, for record-scoped errors.
    pub fn record(&self) -> Option<&TraceRecord> {
        match self {
            SessionError::Trace(_) => None,
            SessionError::Classification { record, .. } | SessionError::Notify { record, .. } => {
                Some(record)
            }
        }
    }
}
