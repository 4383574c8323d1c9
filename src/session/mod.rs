//! Decoding session: the record loop plus the state notify records build.
//!
//! This module provides:
//! - `process_table`: pid to process name mapping
//! - `anchor`: relative to wall-clock time anchor
//! - `notify`: [`NotifyProcessor`], which applies notify records to both
//!
//! [`Session`] owns the table and anchor, lends them to the processor, and
//! ties it to a [`RecordReader`] and yields every record with
//! its classification, in stream order.

pub mod anchor;
pub mod notify;
pub mod process_table;

pub use anchor::TimestampAnchor;
pub use notify::{handle_notify, NotifyOutcome, NotifyProcessor};
pub use process_table::ProcessTable;

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::error::{SessionError, TraceError};
use crate::trace::{classify, Classification, RecordReader, TraceRecord};

/// What to do with a record-scoped error (unknown subtype, bad notify payload).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordErrorPolicy {
    /// Report the error and keep decoding.
    #[default]
    Skip,
    /// Report the error and end the session.
    Abort,
}

/// One record as seen by the caller.
#[derive(Debug, Clone, Serialize)]
pub struct DecodedRecord {
    /// Stream offset of the record header.
    pub offset: u64,
    pub record: TraceRecord,
    pub classification: Classification,
    /// Set for notify records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify: Option<NotifyOutcome>,
}

/// Counters for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub records: u64,
    pub notify: u64,
    pub skipped: u64,
    pub messages: u64,
}

/// Lazy decode loop over one stream.
///
/// Iterating yields `Ok` for each decoded record and `Err` for each
/// record-scoped error, in stream order. A stream-fatal error is yielded
/// once and ends the iteration, as does a record-scoped error under
/// [`RecordErrorPolicy::Abort`].
pub struct Session<R> {
    reader: RecordReader<R>,
    table: ProcessTable,
    anchor: TimestampAnchor,
    policy: RecordErrorPolicy,
    stats: SessionStats,
    messages: VecDeque<NotifyOutcome>,
    done: bool,
}

impl Session<BufReader<File>> {
    /// Opens a trace file as a new session.
    pub fn open(path: impl AsRef<Path>, policy: RecordErrorPolicy) -> Result<Self, TraceError> {
        Ok(Self::new(RecordReader::open(path)?, policy))
    }
}

impl<R: Read> Session<R> {
    pub fn new(reader: RecordReader<R>, policy: RecordErrorPolicy) -> Self {
        Self {
            reader,
            table: ProcessTable::new(),
            anchor: TimestampAnchor::new(),
            policy,
            stats: SessionStats::default(),
            messages: VecDeque::new(),
            done: false,
        }
    }

    pub fn from_stream(stream: R, policy: RecordErrorPolicy) -> Self {
        Self::new(RecordReader::new(stream), policy)
    }

    pub fn process_table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn anchor(&self) -> &TimestampAnchor {
        &self.anchor
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Bytes consumed from the stream so far.
    pub fn offset(&self) -> u64 {
        self.reader.offset()
    }

    /// Drains the MESSAGE notifications collected so far.
    pub fn take_messages(&mut self) -> Vec<NotifyOutcome> {
        self.messages.drain(..).collect()
    }

    /// Ends the session, handing back the state it built.
    pub fn into_parts(self) -> (ProcessTable, TimestampAnchor) {
        (self.table, self.anchor)
    }

    fn record_error(&mut self, err: SessionError) -> Option<Result<DecodedRecord, SessionError>> {
        self.stats.skipped += 1;
        match self.policy {
            RecordErrorPolicy::Skip => warn!("Skipping {}", err),
            RecordErrorPolicy::Abort => {
                error!("Aborting on {}", err);
                self.done = true;
            }
        }
        Some(Err(err))
    }

    fn decode_next(&mut self) -> Option<Result<DecodedRecord, SessionError>> {
        let record = match self.reader.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.done = true;
                info!(
                    "End of stream after {} records ({} skipped)",
                    self.stats.records, self.stats.skipped
                );
                return None;
            }
            Err(e) => {
                self.done = true;
                error!("Stream error at offset {}: {}", self.reader.record_offset(), e);
                return Some(Err(e.into()));
            }
        };

        let offset = self.reader.record_offset();
        self.stats.records += 1;

        let classification = match classify(record.action()) {
            Ok(c) => c,
            Err(source) => {
                return self.record_error(SessionError::Classification {
                    sequence: record.sequence(),
                    offset,
                    record: Box::new(record),
                    source,
                });
            }
        };
        debug!("{} {}", record, classification);

        let notify = match classification.notify() {
            Some(subtype) => {
                self.stats.notify += 1;
                let result = NotifyProcessor::new(&mut self.table, &mut self.anchor)
                    .handle(&record, subtype);
                match result {
                    Ok(outcome) => Some(outcome),
                    Err(source) => {
                        return self.record_error(SessionError::Notify {
                            sequence: record.sequence(),
                            offset,
                            record: Box::new(record),
                            source,
                        });
                    }
                }
            }
            None => None,
        };

        if let Some(NotifyOutcome::Message { pid, text }) = &notify {
            warn!("Trace message from pid {}: {}", pid, text.trim_end());
            self.stats.messages += 1;
            self.messages.push_back(NotifyOutcome::Message {
                pid: *pid,
                text: text.clone(),
            });
        }

        Some(Ok(DecodedRecord {
            offset,
            record,
            classification,
            notify,
        }))
    }
}

impl<R: Read> Iterator for Session<R> {
    type Item = Result<DecodedRecord, SessionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.decode_next()
    }
}
