//! Anchor between trace-relative time and wall-clock time.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::trace::record::TimePair;

/// Relative and absolute time references from a TIMESTAMP notify record.
///
/// `start` is the notify record's own header time, `absolute` the wall-clock
/// time it carried. Both are `None` until the first TIMESTAMP record; later
/// ones overwrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimestampAnchor {
    pub start: Option<TimePair>,
    pub absolute: Option<TimePair>,
}

impl TimestampAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, start: TimePair, absolute: TimePair) {
        self.start = Some(start);
        self.absolute = Some(absolute);
    }

    pub fn is_set(&self) -> bool {
        self.start.is_some() && self.absolute.is_some()
    }

    /// Converts a record time (ns since trace start) to wall-clock time.
    pub fn wall_clock(&self, time_ns: i64) -> Option<DateTime<Utc>> {
        let (start, absolute) = (self.start?, self.absolute?);
        let nanos = absolute.as_nanos() + (time_ns as i128 - start.as_nanos());
        let pair = TimePair::from_nanos(i64::try_from(nanos).ok()?);
        DateTime::from_timestamp(pair.seconds, pair.nanoseconds as u32)
    }
}
