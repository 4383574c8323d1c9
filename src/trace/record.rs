//! Fixed-size blktrace record header and its trailing payload.
//!
//! Wire layout (48 bytes, little-endian, no padding):
//!
//! | offset | width | field |
//! |---|---|---|
//! | 0 | 4 | magic and version |
//! | 4 | 4 | sequence |
//! | 8 | 8 | time (ns) |
//! | 16 | 8 | sector |
//! | 24 | 4 | bytes |
//! | 28 | 4 | action |
//! | 32 | 4 | pid |
//! | 36 | 4 | device |
//! | 40 | 4 | cpu |
//! | 44 | 2 | error |
//! | 46 | 2 | pdu_len |
//!
//! Field widths are fixed and never depend on the host platform.

use serde::Serialize;
use std::fmt;

use crate::error::TraceError;

/// Size of an encoded record header in bytes.
pub const HEADER_SIZE: usize = 48;

pub const MAGIC_MASK: u32 = 0xffff_ff00;
pub const MAGIC: u32 = 0x6561_7400;
pub const VERSION_MASK: u32 = 0x0000_00ff;
pub const VERSION: u32 = 7;

pub const NANOS_PER_SEC: i64 = 1_000_000_000;

const MINOR_BITS: u32 = 20;
const MINOR_MASK: u32 = 0x000f_ffff;
const MAJOR_MASK: u32 = 0x0fff;

/// A (seconds, nanoseconds) pair with `0 <= nanoseconds < 1_000_000_000`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct TimePair {
    pub seconds: i64,
    pub nanoseconds: i64,
}

impl TimePair {
    pub fn new(seconds: i64, nanoseconds: i64) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// Splits a nanosecond count with floor semantics, so negative inputs
    /// still yield a non-negative nanosecond part.
    pub fn from_nanos(nanos: i64) -> Self {
        Self {
            seconds: nanos.div_euclid(NANOS_PER_SEC),
            nanoseconds: nanos.rem_euclid(NANOS_PER_SEC),
        }
    }

    pub fn as_nanos(&self) -> i128 {
        self.seconds as i128 * NANOS_PER_SEC as i128 + self.nanoseconds as i128
    }
}

impl fmt::Display for TimePair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanoseconds)
    }
}

/// Decoded fixed-size header of one trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecordHeader {
    /// Upper 24 bits: format magic, lower 8 bits: format version.
    pub magic: u32,
    pub sequence: u32,
    /// Nanoseconds since trace start.
    pub time: i64,
    pub sector: i64,
    /// Transfer length in bytes.
    pub bytes: u32,
    pub action: u32,
    pub pid: u32,
    pub device: u32,
    pub cpu: u32,
    pub error: i16,
    pub pdu_len: u16,
}

impl RecordHeader {
    /// Decodes a header from its wire form. Performs no validation.
    pub fn parse(buf: &[u8; HEADER_SIZE]) -> Self {
        let u32_at = |off: usize| u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]]);
        let i64_at = |off: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&buf[off..off + 8]);
            i64::from_le_bytes(raw)
        };

        Self {
            magic: u32_at(0),
            sequence: u32_at(4),
            time: i64_at(8),
            sector: i64_at(16),
            bytes: u32_at(24),
            action: u32_at(28),
            pid: u32_at(32),
            device: u32_at(36),
            cpu: u32_at(40),
            error: i16::from_le_bytes([buf[44], buf[45]]),
            pdu_len: u16::from_le_bytes([buf[46], buf[47]]),
        }
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&self.sequence.to_le_bytes());
        buf[8..16].copy_from_slice(&self.time.to_le_bytes());
        buf[16..24].copy_from_slice(&self.sector.to_le_bytes());
        buf[24..28].copy_from_slice(&self.bytes.to_le_bytes());
        buf[28..32].copy_from_slice(&self.action.to_le_bytes());
        buf[32..36].copy_from_slice(&self.pid.to_le_bytes());
        buf[36..40].copy_from_slice(&self.device.to_le_bytes());
        buf[40..44].copy_from_slice(&self.cpu.to_le_bytes());
        buf[44..46].copy_from_slice(&self.error.to_le_bytes());
        buf[46..48].copy_from_slice(&self.pdu_len.to_le_bytes());
        buf
    }

    /// Checks the magic constant and the format version.
    pub fn verify_trace(&self) -> Result<(), TraceError> {
        let magic = self.magic & MAGIC_MASK;
        if magic != MAGIC {
            return Err(TraceError::Format {
                field: "magic",
                found: magic,
                expected: MAGIC,
            });
        }

        let version = self.magic & VERSION_MASK;
        if version != VERSION {
            return Err(TraceError::Format {
                field: "version",
                found: version,
                expected: VERSION,
            });
        }

        Ok(())
    }
}

/// One validated trace record: header plus exactly `pdu_len` payload bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceRecord {
    #[serde(flatten)]
    header: RecordHeader,
    payload: Vec<u8>,
}

impl TraceRecord {
    /// Builds a record, validating magic, version and payload length.
    ///
    /// A length mismatch is a [`TraceError::PayloadLength`]; stream
    /// truncation is reported by the reader, which knows the offset.
    pub fn new(header: RecordHeader, payload: Vec<u8>) -> Result<Self, TraceError> {
        header.verify_trace()?;
        if payload.len() != header.pdu_len as usize {
            return Err(TraceError::PayloadLength {
                declared: header.pdu_len as usize,
                found: payload.len(),
            });
        }
        Ok(Self { header, payload })
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    pub fn sequence(&self) -> u32 {
        self.header.sequence
    }

    pub fn time(&self) -> i64 {
        self.header.time
    }

    pub fn action(&self) -> u32 {
        self.header.action
    }

    pub fn pid(&self) -> u32 {
        self.header.pid
    }

    pub fn pdu_len(&self) -> u16 {
        self.header.pdu_len
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Record time as (seconds, nanoseconds).
    pub fn as_timepair(&self) -> TimePair {
        TimePair::from_nanos(self.header.time)
    }

    /// Device number split into (major, minor): 12 bits major, 20 bits minor.
    pub fn major_minor(&self) -> (u32, u32) {
        let device = self.header.device;
        ((device >> MINOR_BITS) & MAJOR_MASK, device & MINOR_MASK)
    }

    /// Wire form of the whole record.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        out.extend_from_slice(&self.header.encode());
        out.extend_from_slice(&self.payload);
        out
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let h = &self.header;
        let (major, minor) = self.major_minor();
        write!(
            f,
            "#{} {:>3},{:<3} cpu={} t={} pid={} action={:#010x} sector={} bytes={} error={} pdu_len={}",
            h.sequence,
            major,
            minor,
            h.cpu,
            self.as_timepair(),
            h.pid,
            h.action,
            h.sector,
            h.bytes,
            h.error,
            h.pdu_len
        )
    }
}
