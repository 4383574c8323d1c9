//! Dumpfile command implementation.
//!
//! Decodes one trace file and prints every record with its classification,
//! followed by a summary of the session state.

use anyhow::{bail, Context};
use blkflux::{DecodedRecord, NotifyOutcome, RecordErrorPolicy, Session, SessionError};
use serde_json::json;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::config::Config;

/// Decodes `filename` (relative to the configured directory) and prints it.
pub fn command_dumpfile(filename: &Path, config: &Config) -> anyhow::Result<()> {
    let full_path = match &config.directory {
        Some(dir) => dir.join(filename),
        None => filename.to_path_buf(),
    };
    let policy = config.record_error_policy.unwrap_or_default();

    let session = Session::open(&full_path, policy)
        .with_context(|| format!("Error reading file {}", full_path.display()))?;
    info!("Decoding {} (policy: {:?})", full_path.display(), policy);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = dump_session(session, config, &mut out);
    out.flush()?;
    result.with_context(|| format!("Error decoding file {}", full_path.display()))
}

/// Prints every item of `session` to `out`, then the summary.
///
/// Record-level errors are printed with the offending record and skipped
/// unless the policy aborts; stream-fatal errors end the dump with an error.
/// `max_records` counts decoded records only.
pub fn dump_session<R: Read, W: Write>(
    mut session: Session<R>,
    config: &Config,
    out: &mut W,
) -> anyhow::Result<()> {
    let format = config.output_format();
    let show_payload = config.show_payload.unwrap_or(false);
    let limit = config.max_records.unwrap_or(u64::MAX);
    let strict = config.record_error_policy == Some(RecordErrorPolicy::Abort);

    let mut printed = 0u64;
    let mut failure: Option<SessionError> = None;

    while printed < limit {
        let Some(item) = session.next() else {
            break;
        };
        match item {
            Ok(decoded) => {
                printed += 1;
                match format {
                    OutputFormat::Text => write_text(out, &decoded, &session, show_payload)?,
                    OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&decoded)?)?,
                }
            }
            Err(e) if e.is_fatal() || strict => {
                failure = Some(e);
                break;
            }
            Err(e) => write_skipped(out, &e, format, show_payload)?,
        }
    }

    if printed >= limit {
        debug!("Stopped after {} records", printed);
    }

    write_summary(out, &session, format)?;

    if let Some(e) = failure {
        bail!("{} (stream offset {})", e, session.offset());
    }
    Ok(())
}

fn write_text<R: Read, W: Write>(
    out: &mut W,
    decoded: &DecodedRecord,
    session: &Session<R>,
    show_payload: bool,
) -> io::Result<()> {
    let record = &decoded.record;
    writeln!(out, "{}", record)?;
    writeln!(out, "  {}", decoded.classification)?;

    if let Some(name) = session.process_table().name_of(record.pid()) {
        writeln!(out, "  process: {}", name)?;
    }
    if let Some(wall) = session.anchor().wall_clock(record.time()) {
        writeln!(out, "  wall clock: {}", wall.to_rfc3339())?;
    }

    match &decoded.notify {
        Some(NotifyOutcome::Process { pid, name }) => writeln!(out, "  add_program(pid={}, name={})", pid, name)?,
        Some(NotifyOutcome::Timestamp { start, absolute }) => {
            writeln!(out, "  timestamp anchor: start={} absolute={}", start, absolute)?
        }
        Some(NotifyOutcome::Message { text, .. }) => {
            writeln!(out, "  message: {}", text.trim_end())?
        }
        None => {}
    }

    if show_payload && !record.payload().is_empty() {
        writeln!(out, "  payload: {}", hex(record.payload()))?;
    }
    writeln!(out)
}

fn write_skipped<W: Write>(
    out: &mut W,
    err: &SessionError,
    format: OutputFormat,
    show_payload: bool,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "skipped: {}", err)?;
            if let Some(record) = err.record() {
                writeln!(out, "  {}", record)?;
                if show_payload && !record.payload().is_empty() {
                    writeln!(out, "  payload: {}", hex(record.payload()))?;
                }
            }
            writeln!(out)?;
        }
        OutputFormat::Json => {
            let line = json!({ "skipped": err.to_string(), "record": err.record() });
            writeln!(out, "{}", line)?;
        }
    }
    Ok(())
}

fn write_summary<R: Read, W: Write>(
    out: &mut W,
    session: &Session<R>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let stats = session.stats();
    let table = session.process_table().sorted();
    let anchor = session.anchor();

    match format {
        OutputFormat::Json => {
            let summary = json!({
                "summary": {
                    "stats": stats,
                    "processes": table,
                    "anchor": anchor,
                }
            });
            writeln!(out, "{}", summary)?;
        }
        OutputFormat::Text => {
            writeln!(out, "📊 Summary")?;
            writeln!(out, "   ├─ Records: {}", stats.records)?;
            writeln!(out, "   ├─ Notify records: {}", stats.notify)?;
            writeln!(out, "   ├─ Skipped: {}", stats.skipped)?;
            writeln!(out, "   ├─ Messages: {}", stats.messages)?;
            match (anchor.start, anchor.absolute) {
                (Some(start), Some(absolute)) => {
                    writeln!(out, "   ├─ Timestamp anchor: {} = {}", start, absolute)?
                }
                _ => writeln!(out, "   ├─ Timestamp anchor: not set")?,
            }
            writeln!(out, "   └─ Processes: {}", table.len())?;
            for (pid, name) in table {
                writeln!(out, "      {:>7} {}", pid, name)?;
            }
        }
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use blkflux::{compose, Action, CategorySet, NotifySubtype, RecordHeader, Subtype};
    use blkflux::trace::{MAGIC, VERSION};
    use std::io::Cursor;

    fn encode(sequence: u32, action: u32, pid: u32, payload: &[u8]) -> Vec<u8> {
        let header = RecordHeader {
            magic: MAGIC | VERSION,
            sequence,
            time: 1_000_000_000 + sequence as i64,
            sector: 128,
            bytes: 4096,
            action,
            pid,
            device: 8 << 20,
            cpu: 1,
            error: 0,
            pdu_len: payload.len() as u16,
        };
        let mut out = header.encode().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn sample_stream() -> Vec<u8> {
        let process = compose(CategorySet::NOTIFY, Subtype::Notify(NotifySubtype::Process), false);
        let issue = compose(CategorySet::ISSUE | CategorySet::WRITE, Subtype::Ordinary(Action::Issue), false);
        let mut bytes = encode(1, process, 42, b"fio\0");
        bytes.extend(encode(2, issue, 42, b""));
        bytes.extend(encode(3, CategorySet::QUEUE.bits() | 0x70, 42, b""));
        bytes
    }

    #[test]
    fn test_text_dump_skips_bad_records() {
        let session = Session::from_stream(Cursor::new(sample_stream()), RecordErrorPolicy::Skip);
        let mut out = Vec::new();
        dump_session(session, &Config::default(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("add_program(pid=42, name=fio)"));
        assert!(text.contains("category=WRITE|ISSUE subtype=ISSUE"));
        assert!(text.contains("process: fio"));
        assert!(text.contains("skipped: record 3"));
        let skipped = text.lines().skip_while(|l| !l.starts_with("skipped:")).nth(1).unwrap();
        assert!(skipped.contains("pid=42"), "skipped record not printed: {}", skipped);
        assert!(text.contains("Records: 3"));
    }

    #[test]
    fn test_json_dump_includes_skipped_record() {
        let session = Session::from_stream(Cursor::new(sample_stream()), RecordErrorPolicy::Skip);
        let config = Config {
            output_format: Some("json".into()),
            ..Config::default()
        };
        let mut out = Vec::new();
        dump_session(session, &config, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let skipped: serde_json::Value = text
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap())
            .find(|v| v.get("skipped").is_some())
            .unwrap();
        assert_eq!(skipped["record"]["sequence"], 3);
        assert_eq!(skipped["record"]["pid"], 42);
        assert_eq!(skipped["record"]["action"], CategorySet::QUEUE.bits() | 0x70);
    }

    #[test]
    fn test_max_records_ignores_skipped_items() {
        let issue = compose(CategorySet::ISSUE, Subtype::Ordinary(Action::Issue), false);
        let mut bytes = encode(1, CategorySet::QUEUE.bits() | 0x7f, 99, b"");
        bytes.extend(encode(2, issue, 7, b""));
        bytes.extend(encode(3, issue, 7, b""));

        let session = Session::from_stream(Cursor::new(bytes), RecordErrorPolicy::Skip);
        let config = Config {
            max_records: Some(1),
            ..Config::default()
        };
        let mut out = Vec::new();
        dump_session(session, &config, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("skipped: record 1"));
        assert!(text.contains("category=ISSUE subtype=ISSUE"));
        assert!(text.contains("Records: 2"));
        assert!(text.contains("Skipped: 1"));
    }

    #[test]
    fn test_message_trimmed_when_printed() {
        let message = compose(CategorySet::NOTIFY, Subtype::Notify(NotifySubtype::Message), false);
        let bytes = encode(1, message, 5, b"buffer overrun\n\0");
        let session = Session::from_stream(Cursor::new(bytes), RecordErrorPolicy::Skip);
        let mut out = Vec::new();
        dump_session(session, &Config::default(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("  message: buffer overrun\n\n"));
    }

    #[test]
    fn test_strict_dump_fails_on_bad_record() {
        let session = Session::from_stream(Cursor::new(sample_stream()), RecordErrorPolicy::Abort);
        let config = Config {
            record_error_policy: Some(RecordErrorPolicy::Abort),
            ..Config::default()
        };
        let mut out = Vec::new();
        assert!(dump_session(session, &config, &mut out).is_err());
    }

    #[test]
    fn test_json_dump_respects_max_records() {
        let session = Session::from_stream(Cursor::new(sample_stream()), RecordErrorPolicy::Skip);
        let config = Config {
            output_format: Some("json".into()),
            max_records: Some(1),
            ..Config::default()
        };
        let mut out = Vec::new();
        dump_session(session, &config, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["record"]["pid"], 42);
        assert_eq!(first["notify"]["notify"], "process");
        let summary: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(summary["summary"]["processes"]["42"], "fio");
    }

    #[test]
    fn test_truncated_stream_fails() {
        let mut bytes = sample_stream();
        bytes.truncate(bytes.len() - 5);
        let session = Session::from_stream(Cursor::new(bytes), RecordErrorPolicy::Skip);
        let mut out = Vec::new();
        let err = dump_session(session, &Config::default(), &mut out).unwrap_err();
        assert!(err.to_string().contains("truncated header"));
    }

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0x00, 0xab, 0x10]), "00 ab 10");
    }
}
