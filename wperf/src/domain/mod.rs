//! Domain model for wperf
//!
//! Core identifiers and the structured error taxonomy shared by the
//! instrumentation and capture sides.

pub mod errors;
pub mod types;

pub use types::{InstanceId, IoOp};

pub use errors::{CaptureError, ConfigError, RegistrationError, RelayError};
