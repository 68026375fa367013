//! # Instrumentation
//!
//! The hook catalog and the transactional protocol that attaches it.
//!
//! - [`catalog`]: which kernel functions are hooked, and how
//! - [`InstrumentationManager`]: all-or-nothing activation over a [`HookHost`]
//! - [`EbpfHookHost`]: the aya kprobe implementation of [`HookHost`]
//! - [`ebpf_setup`]: loading the probe object and preparing its maps

pub mod catalog;
mod ebpf_host;
pub mod ebpf_setup;
mod manager;

pub use catalog::{Batch, HookDefinition, HookKind, CATALOG};
pub use ebpf_host::{EbpfHookHost, HookLinks};
pub use ebpf_setup::{
    init_ebpf_logger, load_ebpf_program, prime_core_state, take_event_ring, DEFAULT_BPF_OBJECT,
};
pub use manager::{HookHost, InstrumentationManager};
