//! Structured error types for wperf
//!
//! Using thiserror for automatic Display implementation and error chaining.

use super::types::{InstanceId, IoOp};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A hook could not be installed
///
/// Fatal to the whole activation. By the time the caller sees it, every hook
/// installed earlier in the same activation has been removed again.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("No program {program} for hook {symbol}")]
    ProgramMissing { symbol: String, program: String },

    #[error("Failed to load {program} for hook {symbol}: {error}")]
    Load { symbol: String, program: String, error: String },

    #[error("Failed to attach {program} to {symbol}: {error}")]
    Attach { symbol: String, program: String, error: String },
}

impl RegistrationError {
    /// Kernel symbol of the hook that failed
    #[must_use]
    pub fn symbol(&self) -> &str {
        match self {
            Self::ProgramMissing { symbol, .. }
            | Self::Load { symbol, .. }
            | Self::Attach { symbol, .. } => symbol,
        }
    }
}

/// Failure local to one capture instance
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("{instance}: failed to open source {}: {source}", path.display())]
    SourceOpen { instance: InstanceId, path: PathBuf, source: io::Error },

    #[error("{instance}: failed to open sink {}: {source}", path.display())]
    SinkOpen { instance: InstanceId, path: PathBuf, source: io::Error },

    #[error("{instance}: {op} failed: {source}")]
    Io { instance: InstanceId, op: IoOp, source: io::Error },
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to open trace marker {}: {source}", path.display())]
    MarkerOpen { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid instance name {0:?}: must be non-empty and contain no '/'")]
    InvalidInstanceName(String),

    #[error("Instance {0} given more than once")]
    DuplicateInstance(String),

    #[error("Relay instance {0} is not one of the capture instances")]
    UnknownRelayInstance(String),

    #[error("Unknown hook symbol {0} (see --list-hooks)")]
    UnknownHook(String),
}
