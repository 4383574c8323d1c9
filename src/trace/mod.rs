//! Binary blktrace record decoding.
//!
//! This module provides:
//! - `record`: the fixed 48-byte header, payload and wire constants
//! - `action`: classification of packed action codes
//! - `reader`: sequential decoding from a byte stream

pub mod action;
pub mod reader;
pub mod record;

// Re-export commonly used types
pub use action::{classify, compose, Action, CategorySet, Classification, NotifySubtype, Subtype};
pub use reader::RecordReader;
pub use record::{RecordHeader, TimePair, TraceRecord, HEADER_SIZE, MAGIC, VERSION};
