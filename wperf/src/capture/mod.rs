//! # Capture Pipeline
//!
//! Copies bytes from N live tracefs pipes into N capture files on a single
//! scheduler thread.
//!
//! - [`CaptureEngine`]: runs one [`CaptureInstance`] per session
//! - [`CaptureInstance`]: the per-session state machine
//! - [`SessionController`] / [`SessionEnd`]: the shared `ended` signal
//! - [`CaptureLayout`]: tracefs instances and output paths
//! - [`endpoint`]: source/sink traits and their filesystem implementations

pub mod endpoint;
mod engine;
mod instance;
mod layout;
mod session;

pub use endpoint::{EndpointOpener, FileSink, FsEndpoints, PipeSource, TraceSink, TraceSource};
pub use engine::CaptureEngine;
pub use instance::{
    CaptureInstance, CaptureSession, InstanceReport, PipelineState, TRANSFER_BUFFER_SIZE,
};
pub use layout::CaptureLayout;
pub use session::{SessionController, SessionEnd};
