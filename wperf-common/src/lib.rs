//! # Shared Data Structures (eBPF ↔ Userspace)
//!
//! Defines data structures and constants shared between the kernel-side probe
//! programs and userspace. All types crossing the boundary use `#[repr(C)]` for
//! a consistent memory layout.
//!
//! ## Key Types
//!
//! - [`Phase`] - What kind of work a core is currently correlating
//! - [`EventKind`] - Tag carried by every [`TraceRecord`]
//! - [`TraceRecord`] - Event structure passed via the `EVENTS` ring buffer
//! - [`CoreCorrelation`] - One per-core slot of cross-event state (`CORE_STATE`)
//! - [`handle`] - The transition applied by every hook handler
//! - [`PerCoreStore`] - Fixed-size, core-indexed store used off-kernel
//!
//! Handlers are written as a pure function of (slot, hit) so the probe programs
//! and the userspace model share exactly one implementation.

#![cfg_attr(not(test), no_std)]

mod correlation;
mod handler;
mod phase;
mod record;

pub use correlation::{CoreCorrelation, CoreId, PerCoreStore, TimestampSource};
pub use handler::{handle, HookAction, HookArgs, HookHit, HookSite};
pub use phase::{Phase, NR_SOFTIRQS};
pub use record::{EventKind, TraceRecord};

/// Size of the `EVENTS` ring buffer shared with userspace
pub const EVENTS_BYTE_SIZE: u32 = 1024 * 1024;

#[cfg(feature = "user")]
use aya::Pod;

// Pod lets userspace read and write these types as plain bytes through maps
#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for TraceRecord {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for CoreCorrelation {}
