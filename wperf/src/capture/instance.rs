//! # Capture Instance
//!
//! One (source, sink) copy session as an explicit state machine:
//!
//! ```text
//! Opening ──▶ Reading ◀──▶ Writing{len}
//!    │           │              │
//!    ▼           └──────┬───────┘
//!  Failed                ▼
//!                     Cleanup
//! ```
//!
//! Exactly one I/O operation is in flight at a time. The session-ended flag is
//! observed at the read/write boundary: after a write completes, after an
//! empty or would-block read, and while waiting for the source to become
//! readable (no bytes have been taken at that point, so nothing is lost). An
//! in-flight write is never abandoned.

use std::io;
use std::path::PathBuf;

use log::{debug, warn};
use serde::Serialize;

use super::endpoint::{EndpointOpener, TraceSink, TraceSource};
use super::session::SessionEnd;
use crate::domain::{CaptureError, InstanceId, IoOp};

/// Bytes moved per read/write cycle
pub const TRANSFER_BUFFER_SIZE: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum PipelineState {
    Opening,
    Reading,
    Writing { len: usize },
    Cleanup,
    Failed,
}

impl PipelineState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cleanup | Self::Failed)
    }
}

/// Source and sink paths for one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSession {
    pub source: PathBuf,
    pub sink: PathBuf,
}

impl CaptureSession {
    pub fn new(source: impl Into<PathBuf>, sink: impl Into<PathBuf>) -> Self {
        Self { source: source.into(), sink: sink.into() }
    }
}

/// Outcome of one instance, for the run report
#[derive(Debug, Serialize)]
pub struct InstanceReport {
    pub id: InstanceId,
    pub source: PathBuf,
    pub sink: PathBuf,
    pub final_state: PipelineState,
    pub bytes_copied: u64,
    pub reads: u64,
    /// First error the instance hit, if any
    pub error: Option<String>,
}

pub struct CaptureInstance<'a, O: EndpointOpener> {
    id: InstanceId,
    session: CaptureSession,
    opener: &'a O,
    end: SessionEnd,
    source: Option<O::Source>,
    sink: Option<O::Sink>,
    buffer: Vec<u8>,
    state: PipelineState,
    bytes_copied: u64,
    reads: u64,
    error: Option<CaptureError>,
}

impl<'a, O: EndpointOpener> CaptureInstance<'a, O> {
    pub fn new(id: InstanceId, session: CaptureSession, opener: &'a O, end: SessionEnd) -> Self {
        Self {
            id,
            session,
            opener,
            end,
            source: None,
            sink: None,
            buffer: vec![0; TRANSFER_BUFFER_SIZE],
            state: PipelineState::Opening,
            bytes_copied: 0,
            reads: 0,
            error: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Drive the instance until it reaches a terminal state
    pub async fn run(mut self) -> InstanceReport {
        while !self.state.is_terminal() {
            self.step().await;
        }
        InstanceReport {
            id: self.id,
            source: self.session.source,
            sink: self.session.sink,
            final_state: self.state,
            bytes_copied: self.bytes_copied,
            reads: self.reads,
            error: self.error.map(|e| e.to_string()),
        }
    }

    /// Advance by one transition; no-op once terminal
    pub async fn step(&mut self) {
        let next = match self.state {
            PipelineState::Opening => self.open().await,
            PipelineState::Reading => self.read().await,
            PipelineState::Writing { len } => self.write(len).await,
            PipelineState::Cleanup | PipelineState::Failed => return,
        };
        if next == PipelineState::Cleanup {
            self.cleanup().await;
        }
        self.state = next;
    }

    async fn open(&mut self) -> PipelineState {
        let sink = match self.opener.open_sink(&self.session.sink).await {
            Ok(sink) => sink,
            Err(source) => {
                return self.fail(CaptureError::SinkOpen {
                    instance: self.id,
                    path: self.session.sink.clone(),
                    source,
                });
            }
        };
        let source = match self.opener.open_source(&self.session.source).await {
            Ok(source) => source,
            Err(source) => {
                drop(sink);
                return self.fail(CaptureError::SourceOpen {
                    instance: self.id,
                    path: self.session.source.clone(),
                    source,
                });
            }
        };
        debug!(
            "{}: capturing {} -> {}",
            self.id,
            self.session.source.display(),
            self.session.sink.display()
        );
        self.sink = Some(sink);
        self.source = Some(source);
        PipelineState::Reading
    }

    async fn read(&mut self) -> PipelineState {
        let Some(source) = self.source.as_mut() else {
            return PipelineState::Cleanup;
        };

        let result = tokio::select! {
            biased;
            () = self.end.ended() => return PipelineState::Cleanup,
            result = source.read(&mut self.buffer) => result,
        };
        self.reads += 1;

        match result {
            Ok(0) => self.retry_read().await,
            Ok(len) => PipelineState::Writing { len },
            Err(e) if is_transient(&e) => self.retry_read().await,
            Err(source) => {
                self.record(CaptureError::Io { instance: self.id, op: IoOp::Read, source });
                PipelineState::Cleanup
            }
        }
    }

    /// Hand control back to the scheduler before the next read attempt
    async fn retry_read(&self) -> PipelineState {
        tokio::task::yield_now().await;
        if self.end.is_ended() {
            PipelineState::Cleanup
        } else {
            PipelineState::Reading
        }
    }

    async fn write(&mut self, len: usize) -> PipelineState {
        let Some(sink) = self.sink.as_mut() else {
            return PipelineState::Cleanup;
        };
        match sink.write(&self.buffer[..len]).await {
            Ok(()) => {
                self.bytes_copied += len as u64;
                if self.end.is_ended() {
                    PipelineState::Cleanup
                } else {
                    PipelineState::Reading
                }
            }
            Err(source) => {
                self.record(CaptureError::Io { instance: self.id, op: IoOp::Write, source });
                PipelineState::Cleanup
            }
        }
    }

    /// Close source, fsync sink, close sink, release the buffer
    ///
    /// Handles are taken out of the instance, so they cannot be closed twice.
    async fn cleanup(&mut self) {
        if let Some(source) = self.source.take() {
            if let Err(source) = source.close().await {
                self.record(CaptureError::Io { instance: self.id, op: IoOp::Close, source });
            }
        }
        if let Some(mut sink) = self.sink.take() {
            if let Err(source) = sink.sync().await {
                self.record(CaptureError::Io { instance: self.id, op: IoOp::Sync, source });
            }
            if let Err(source) = sink.close().await {
                self.record(CaptureError::Io { instance: self.id, op: IoOp::Close, source });
            }
        }
        self.buffer = Vec::new();
        debug!("{}: closed after {} bytes", self.id, self.bytes_copied);
    }

    fn fail(&mut self, err: CaptureError) -> PipelineState {
        self.record(err);
        self.buffer = Vec::new();
        PipelineState::Failed
    }

    fn record(&mut self, err: CaptureError) {
        warn!("⚠️  {err}");
        self.error.get_or_insert(err);
    }
}

fn is_transient(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
}
