//! # wperf - Kernel Wakeup Event Recorder
//!
//! wperf attaches kprobes to a fixed set of scheduler, futex, block and
//! socket functions, correlates softirq phases per CPU, and records the
//! resulting events together with any other tracefs output into durable
//! per-instance capture files.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     eBPF Programs (Kernel)                      │
//! │  • kprobes: __switch_to, try_to_wake_up, do_futex, tcp_sendmsg… │
//! │  • kprobe/kretprobe pairs: softirq actions, __do_softirq        │
//! │  • CORE_STATE: per-CPU phase slot, no locks                     │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ EVENTS ring buffer
//!                         ▼
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────────────────┐
//! │ EventRelay   │──▶│ trace_marker │──▶│ tracefs instance ring   │
//! └──────────────┘   └──────────────┘   └────────────┬────────────┘
//!                                                    │ trace_pipe
//!                                                    ▼
//!                         ┌─────────────────────────────────────────┐
//!                         │ CaptureEngine (one scheduler thread)    │
//!                         │   CaptureInstance × N ──▶ <output>/<n>  │
//!                         └─────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`instrumentation`]: hook catalog, transactional activation, aya host
//! - [`capture`]: the capture engine, its instances and the session signal
//! - [`events`]: ring-buffer decoding and the relay into tracefs
//! - [`config`]: validated run configuration built from [`cli::Args`]
//! - [`preflight`]: privilege, kernel and tracefs checks
//! - [`report`]: JSON run report
//! - [`domain`]: identifiers and error types
//!
//! ## Known Coarsening
//!
//! Each CPU holds a single phase slot. A softirq action that starts while
//! another phase is armed on the same CPU overwrites it, and its return resets
//! the slot to idle. Events emitted in between report the newer phase only.
//!
//! ## Typical Usage
//!
//! ```bash
//! # Build the probe object, then record until Ctrl-C
//! cargo xtask build-ebpf --release
//! sudo ./wperf
//!
//! # Two capture instances, hook events go to "sched"
//! sudo ./wperf -i sched -i net --relay-instance sched --duration 60
//! ```

pub mod capture;
pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod instrumentation;
pub mod preflight;
pub mod report;
