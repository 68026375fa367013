//! # Event Relay
//!
//! Moves [`TraceRecord`](wperf_common::TraceRecord)s from the `EVENTS` ring
//! buffer into a tracefs instance's `trace_marker`. Every record becomes one
//! text line in that instance's `trace_pipe`, where a capture instance picks
//! it up.
//!
//! The relay waits on ring-buffer readiness through `AsyncFd`, drains
//! everything available, and stops once the session ends. Records still in
//! the ring at that point are drained one last time before returning.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use aya::maps::{MapData, RingBuf};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::io::unix::AsyncFd;

use super::format::{decode_record, format_record};
use crate::capture::SessionEnd;
use crate::domain::RelayError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Records written to the marker
    pub relayed: u64,
    /// Ring entries too short to hold a record
    pub malformed: u64,
    /// Records the marker refused
    pub write_errors: u64,
}

pub struct EventRelay {
    ring: AsyncFd<RingBuf<MapData>>,
    marker: File,
}

impl EventRelay {
    /// # Errors
    /// Fails if the marker cannot be opened for writing or the ring buffer
    /// cannot be registered with the reactor
    pub fn new(ring: RingBuf<MapData>, marker_path: &Path) -> Result<Self, RelayError> {
        let marker = OpenOptions::new()
            .write(true)
            .open(marker_path)
            .map_err(|source| RelayError::MarkerOpen { path: marker_path.to_path_buf(), source })?;
        let ring = AsyncFd::new(ring)?;
        Ok(Self { ring, marker })
    }

    /// Relay until `end` fires
    ///
    /// # Errors
    /// Returns an error only if waiting on the ring buffer fails
    pub async fn run(self, end: SessionEnd) -> Result<RelayStats, RelayError> {
        let Self { mut ring, mut marker } = self;
        let mut stats = RelayStats::default();

        loop {
            tokio::select! {
                biased;
                () = end.ended() => break,
                guard = ring.readable_mut() => {
                    let mut guard = guard?;
                    drain(guard.get_inner_mut(), &mut marker, &mut stats);
                    guard.clear_ready();
                }
            }
        }

        drain(ring.get_mut(), &mut marker, &mut stats);
        info!(
            "✓ Relayed {} events ({} malformed, {} dropped by marker)",
            stats.relayed, stats.malformed, stats.write_errors
        );
        Ok(stats)
    }
}

fn drain(ring: &mut RingBuf<MapData>, marker: &mut impl Write, stats: &mut RelayStats) {
    while let Some(item) = ring.next() {
        relay_record(&item, marker, stats);
    }
}

/// Decode one ring entry and write it to `marker` as a single line
pub fn relay_record(bytes: &[u8], marker: &mut impl Write, stats: &mut RelayStats) {
    let Some(record) = decode_record(bytes) else {
        stats.malformed += 1;
        debug!("skipping {}-byte ring entry", bytes.len());
        return;
    };
    // each marker write becomes its own trace entry, so write the line whole
    match marker.write_all(format_record(&record).as_bytes()) {
        Ok(()) => stats.relayed += 1,
        Err(e) => {
            if stats.write_errors == 0 {
                warn!("⚠️  trace_marker write failed: {e}");
            }
            stats.write_errors += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use wperf_common::{EventKind, Phase, TraceRecord};

    fn record_bytes(kind: EventKind) -> Vec<u8> {
        let record = TraceRecord {
            kind: kind.as_raw(),
            cpu: 0,
            timestamp_ns: 42,
            subject: 0x1000,
            object: 0,
            arg: 0,
            elapsed_ns: 0,
            phase: Phase::Idle.as_raw(),
            flag: 0,
            _padding: [0; 6],
        };
        #[allow(unsafe_code)]
        let bytes = unsafe {
            std::slice::from_raw_parts(std::ptr::from_ref(&record).cast::<u8>(), TraceRecord::SIZE)
        };
        bytes.to_vec()
    }

    struct Refusing;

    impl Write for Refusing {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::InvalidInput.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_relay_writes_one_line_per_record() {
        let mut marker = Vec::new();
        let mut stats = RelayStats::default();

        relay_record(&record_bytes(EventKind::LockSock), &mut marker, &mut stats);
        relay_record(&record_bytes(EventKind::DoExit), &mut marker, &mut stats);

        let text = String::from_utf8(marker).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("wperf: __lock_sock "));
        assert!(lines[1].starts_with("wperf: do_exit "));
        assert_eq!(stats.relayed, 2);
    }

    #[test]
    fn test_short_entry_is_counted_and_skipped() {
        let mut marker = Vec::new();
        let mut stats = RelayStats::default();

        relay_record(&[0u8; 8], &mut marker, &mut stats);

        assert!(marker.is_empty());
        assert_eq!(stats, RelayStats { relayed: 0, malformed: 1, write_errors: 0 });
    }

    #[test]
    fn test_marker_errors_are_counted() {
        let mut stats = RelayStats::default();
        relay_record(&record_bytes(EventKind::SwitchTo), &mut Refusing, &mut stats);
        relay_record(&record_bytes(EventKind::SwitchTo), &mut Refusing, &mut stats);
        assert_eq!(stats.write_errors, 2);
        assert_eq!(stats.relayed, 0);
    }
}
