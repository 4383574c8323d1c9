//! Application of notify records to session state.

use serde::Serialize;
use std::str;
use tracing::{debug, info};

use crate::error::NotifyError;
use crate::session::anchor::TimestampAnchor;
use crate::session::process_table::ProcessTable;
use crate::trace::action::NotifySubtype;
use crate::trace::record::{TimePair, TraceRecord, NANOS_PER_SEC};

/// Payload length of a TIMESTAMP notify record: two signed 32-bit integers.
pub const TIMESTAMP_PAYLOAD_LEN: usize = 8;

/// What a notify record did to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notify", rename_all = "snake_case")]
pub enum NotifyOutcome {
    Process { pid: u32, name: String },
    Timestamp { start: TimePair, absolute: TimePair },
    Message { pid: u32, text: String },
}

/// Applies notify records to state owned by the caller.
///
/// The table and anchor stay with the session; the processor only borrows
/// them for as long as records are dispatched.
#[derive(Debug)]
pub struct NotifyProcessor<'a> {
    table: &'a mut ProcessTable,
    anchor: &'a mut TimestampAnchor,
}

impl<'a> NotifyProcessor<'a> {
    pub fn new(table: &'a mut ProcessTable, anchor: &'a mut TimestampAnchor) -> Self {
        Self { table, anchor }
    }

    pub fn handle(
        &mut self,
        record: &TraceRecord,
        subtype: NotifySubtype,
    ) -> Result<NotifyOutcome, NotifyError> {
        handle_notify(record, subtype, self.table, self.anchor)
    }
}

/// Applies one notify record to the process table or timestamp anchor.
///
/// MESSAGE records change no state; their text is returned as written,
/// for the caller to surface.
pub fn handle_notify(
    record: &TraceRecord,
    subtype: NotifySubtype,
    table: &mut ProcessTable,
    anchor: &mut TimestampAnchor,
) -> Result<NotifyOutcome, NotifyError> {
    match subtype {
        NotifySubtype::Process => {
            let name = c_string(record.payload())?.to_string();
            if let Some(previous) = table.insert(record.pid(), name.clone()) {
                debug!("pid {} renamed from {} to {}", record.pid(), previous, name);
            } else {
                debug!("pid {} is {}", record.pid(), name);
            }
            Ok(NotifyOutcome::Process {
                pid: record.pid(),
                name,
            })
        }
        NotifySubtype::Timestamp => {
            let (start, absolute) = parse_timestamp(record)?;
            anchor.set(start, absolute);
            info!("Timestamp anchor: trace time {} = wall clock {}", start, absolute);
            Ok(NotifyOutcome::Timestamp { start, absolute })
        }
        NotifySubtype::Message => {
            let text = c_string(record.payload())?.to_string();
            Ok(NotifyOutcome::Message {
                pid: record.pid(),
                text,
            })
        }
    }
}

/// Text up to the first NUL byte, or the whole payload if there is none.
fn c_string(payload: &[u8]) -> Result<&str, NotifyError> {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    Ok(str::from_utf8(&payload[..end])?)
}

fn parse_timestamp(record: &TraceRecord) -> Result<(TimePair, TimePair), NotifyError> {
    let payload = record.payload();
    if payload.len() != TIMESTAMP_PAYLOAD_LEN {
        return Err(NotifyError::MalformedPayload {
            expected: TIMESTAMP_PAYLOAD_LEN,
            found: payload.len(),
        });
    }

    let mut seconds = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]) as i64;
    let mut nanoseconds =
        i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]) as i64;
    if nanoseconds < 0 {
        seconds -= 1;
        nanoseconds += NANOS_PER_SEC;
    }

    Ok((record.as_timepair(), TimePair::new(seconds, nanoseconds)))
}
