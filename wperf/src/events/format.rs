//! Decoding and text rendering of [`TraceRecord`]s

use std::fmt::Write as _;

use wperf_common::TraceRecord;

/// Tag at the start of every relayed line, so captures can be filtered
pub const LINE_PREFIX: &str = "wperf:";

/// Copy a record out of raw ring-buffer bytes
///
/// Returns `None` if the buffer is too short to hold a record.
#[must_use]
pub fn decode_record(bytes: &[u8]) -> Option<TraceRecord> {
    if bytes.len() < TraceRecord::SIZE {
        return None;
    }
    // SAFETY: length checked above; TraceRecord is repr(C) plain data and any
    // bit pattern is valid for its integer fields
    #[allow(unsafe_code)]
    let record = unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast::<TraceRecord>()) };
    Some(record)
}

/// Render one record as a single `trace_marker` line
///
/// ```text
/// wperf: tcp_sendmsg cpu=3 ts=1234 phase=NET_RX flag=1 subject=0xffff888004a1c000 object=0x0 arg=1448 elapsed_ns=0
/// ```
#[must_use]
pub fn format_record(record: &TraceRecord) -> String {
    let mut line = String::with_capacity(160);
    line.push_str(LINE_PREFIX);
    match record.event_kind() {
        Some(kind) => {
            let _ = write!(line, " {}", kind.name());
        }
        None => {
            let _ = write!(line, " unknown({})", record.kind);
        }
    }
    let phase = record.phase().map_or("?", |p| p.name());
    let _ = writeln!(
        line,
        " cpu={} ts={} phase={} flag={} subject={:#x} object={:#x} arg={} elapsed_ns={}",
        record.cpu,
        record.timestamp_ns,
        phase,
        record.flag,
        record.subject,
        record.object,
        record.arg,
        record.elapsed_ns,
    );
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use wperf_common::{EventKind, Phase};

    fn record(kind: u32) -> TraceRecord {
        TraceRecord {
            kind,
            cpu: 2,
            timestamp_ns: 1_000,
            subject: 0xdead_beef,
            object: 0,
            arg: 64,
            elapsed_ns: 0,
            phase: Phase::NetRxSoftirq.as_raw(),
            flag: 1,
            _padding: [0; 6],
        }
    }

    fn as_bytes(record: &TraceRecord) -> Vec<u8> {
        #[allow(unsafe_code)]
        let bytes = unsafe {
            std::slice::from_raw_parts(
                std::ptr::from_ref(record).cast::<u8>(),
                TraceRecord::SIZE,
            )
        };
        bytes.to_vec()
    }

    #[test]
    fn test_decode_rejects_short_buffer() {
        let bytes = as_bytes(&record(EventKind::TcpSendmsg.as_raw()));
        assert!(decode_record(&bytes[..TraceRecord::SIZE - 1]).is_none());
    }

    #[test]
    fn test_decode_reads_unaligned() {
        let original = record(EventKind::TcpSendmsg.as_raw());
        let mut bytes = vec![0u8];
        bytes.extend(as_bytes(&original));
        assert_eq!(decode_record(&bytes[1..]), Some(original));
    }

    #[test]
    fn test_format_known_kind() {
        let line = format_record(&record(EventKind::TcpSendmsg.as_raw()));
        assert_eq!(
            line,
            "wperf: tcp_sendmsg cpu=2 ts=1000 phase=NET_RX flag=1 subject=0xdeadbeef object=0x0 arg=64 elapsed_ns=0\n"
        );
    }

    #[test]
    fn test_format_unknown_kind() {
        let mut rec = record(99);
        rec.phase = 200;
        let line = format_record(&rec);
        assert!(line.starts_with("wperf: unknown(99) cpu=2"));
        assert!(line.contains("phase=?"));
    }
}
