//! Event channel plumbing between the probe programs and tracefs
//!
//! - [`format`]: decode ring-buffer entries and render them as text
//! - [`EventRelay`]: ring buffer to `trace_marker`

pub mod format;
mod relay;

pub use format::{decode_record, format_record};
pub use relay::{relay_record, EventRelay, RelayStats};
