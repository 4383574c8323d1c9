//! Sequential record reader over any byte stream.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use tracing::{debug, trace};

use crate::error::TraceError;
use crate::trace::record::{RecordHeader, TraceRecord, HEADER_SIZE};

/// Decodes records one at a time from a byte stream.
///
/// The reader owns the stream; dropping it releases the underlying handle.
/// After a fatal error the reader is exhausted and yields nothing further.
pub struct RecordReader<R> {
    inner: R,
    offset: u64,
    record_offset: u64,
    failed: bool,
}

impl RecordReader<BufReader<File>> {
    /// Opens a trace file for buffered reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TraceError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        debug!("Opened trace file {}", path.display());
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            record_offset: 0,
            failed: false,
        }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Stream offset of the most recently started record.
    pub fn record_offset(&self) -> u64 {
        self.record_offset
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads the next record.
    ///
    /// Returns `Ok(None)` only when the stream ends exactly at a record
    /// boundary. A partial header or payload is a [`TraceError::Truncated`].
    pub fn next_record(&mut self) -> Result<Option<TraceRecord>, TraceError> {
        if self.failed {
            return Ok(None);
        }
        let result = self.read_record();
        if result.is_err() {
            self.failed = true;
        }
        result
    }

    fn read_record(&mut self) -> Result<Option<TraceRecord>, TraceError> {
        self.record_offset = self.offset;

        let mut buf = [0u8; HEADER_SIZE];
        let got = self.fill(&mut buf)?;
        if got == 0 {
            trace!("End of stream at offset {}", self.offset);
            return Ok(None);
        }
        if got < HEADER_SIZE {
            return Err(TraceError::Truncated {
                what: "header",
                offset: self.record_offset,
                needed: HEADER_SIZE,
                available: got,
            });
        }

        // Alignment cannot be trusted past a bad header, so check before
        // using pdu_len.
        let header = RecordHeader::parse(&buf);
        header.verify_trace()?;

        let mut payload = vec![0u8; header.pdu_len as usize];
        let got = self.fill(&mut payload)?;
        if got < payload.len() {
            return Err(TraceError::Truncated {
                what: "payload",
                offset: self.record_offset + HEADER_SIZE as u64,
                needed: payload.len(),
                available: got,
            });
        }

        TraceRecord::new(header, payload).map(Some)
    }

    /// Reads until `buf` is full or the stream ends; returns bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> Result<usize, TraceError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(TraceError::Io(e)),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<TraceRecord, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::record::{MAGIC, VERSION};
    use std::io::Cursor;

    fn header(sequence: u32, pdu_len: u16) -> RecordHeader {
        RecordHeader {
            magic: MAGIC | VERSION,
            sequence,
            time: 1_000 * sequence as i64,
            sector: 8,
            bytes: 512,
            action: 0x0040_0007,
            pid: 7,
            device: (8 << 20) | 1,
            cpu: 0,
            error: 0,
            pdu_len,
        }
    }

    #[test]
    fn test_empty_stream_is_end_of_stream() {
        let mut reader = RecordReader::new(Cursor::new(Vec::new()));
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_reads_records_in_order() {
        let mut bytes = header(1, 0).encode().to_vec();
        bytes.extend_from_slice(&header(2, 3).encode());
        bytes.extend_from_slice(b"abc");

        let records: Vec<_> = RecordReader::new(Cursor::new(bytes))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sequence(), 1);
        assert_eq!(records[1].sequence(), 2);
        assert_eq!(records[1].payload(), b"abc");
    }

    #[test]
    fn test_partial_header_is_truncation() {
        let bytes = header(1, 0).encode()[..20].to_vec();
        let mut reader = RecordReader::new(Cursor::new(bytes));
        match reader.next_record() {
            Err(TraceError::Truncated {
                what,
                needed,
                available,
                ..
            }) => {
                assert_eq!(what, "header");
                assert_eq!(needed, HEADER_SIZE);
                assert_eq!(available, 20);
            }
            other => panic!("expected truncation, got {:?}", other),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_short_payload_is_truncation() {
        let mut bytes = header(1, 10).encode().to_vec();
        bytes.extend_from_slice(&[1, 2, 3, 4]);
        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.next_record(),
            Err(TraceError::Truncated {
                what: "payload",
                offset: 48,
                needed: 10,
                available: 4
            })
        ));
    }

    #[test]
    fn test_bad_magic_stops_stream() {
        let mut bad = header(1, 0);
        bad.magic = 0x1234_5607;
        let mut bytes = bad.encode().to_vec();
        bytes.extend_from_slice(&header(2, 0).encode());

        let mut reader = RecordReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.next_record(),
            Err(TraceError::Format { field: "magic", .. })
        ));
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_offsets_track_records() {
        let mut bytes = header(1, 2).encode().to_vec();
        bytes.extend_from_slice(b"xy");
        bytes.extend_from_slice(&header(2, 0).encode());

        let mut reader = RecordReader::new(Cursor::new(bytes));
        reader.next_record().unwrap();
        assert_eq!(reader.record_offset(), 0);
        reader.next_record().unwrap();
        assert_eq!(reader.record_offset(), 50);
        assert_eq!(reader.offset(), 98);
    }
}
