//! blkflux: blktrace stream decoding library
//!
//! This library decodes the binary stream written by the kernel block I/O
//! tracer into structured records, classifies each record's packed action
//! code, and keeps the session state carried by notify records.
//!
//! # Features
//!
//! - **Record decoding**: fixed 48-byte little-endian header plus payload, with
//!   magic/version validation and strict truncation detection
//! - **Action classification**: category flags, subtype and cgroup flag
//! - **Session state**: pid to process name table and the wall-clock anchor
//!
//! # Usage
//!
//! ```rust,no_run
//! use blkflux::{RecordErrorPolicy, Session};
//!
//! let mut session = Session::open("sda.blktrace.0", RecordErrorPolicy::Skip)?;
//! for item in session.by_ref() {
//!     match item {
//!         Ok(decoded) => println!("{} {}", decoded.record, decoded.classification),
//!         Err(e) if e.is_fatal() => return Err(e.into()),
//!         Err(e) => eprintln!("skipped: {}", e),
//!     }
//! }
//! println!("{:?}", session.process_table().name_of(42));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod session;
pub mod trace;

// Re-export main types for convenience
pub use error::{ClassificationError, NotifyError, SessionError, TraceError};
pub use session::{
    handle_notify, DecodedRecord, NotifyOutcome, NotifyProcessor, ProcessTable,
    RecordErrorPolicy, Session, SessionStats, TimestampAnchor,
};
pub use trace::{
    classify, compose, Action, CategorySet, Classification, NotifySubtype, RecordHeader,
    RecordReader, Subtype, TimePair, TraceRecord,
};
