//! # eBPF Kernel-Side Instrumentation
//!
//! kprobe / kretprobe programs attached to a fixed, curated set of kernel
//! functions. Each program is a thin shim: read the arguments it needs, fetch
//! this core's correlation slot and run [`wperf_common::handle`].
//!
//! ## Programs
//!
//! - **Entry only** (`<symbol>_entry`): scheduler, futex, block, socket and lock
//!   notification points, plus `wakeup_softirqd` which only arms a phase
//! - **Entry + return** (`<symbol>_entry` / `<symbol>_return`): one pair per
//!   softirq action, and the timed `__do_softirq` pair
//!
//! ## Maps (Shared with Userspace)
//!
//! - `EVENTS` - Ring buffer carrying [`TraceRecord`]s
//! - `CORE_STATE` - One [`CoreCorrelation`] slot per CPU
//!
//! ## Build
//!
//! ```bash
//! cargo xtask build-ebpf --release
//! ```

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

use aya_ebpf::{
    helpers::{bpf_ktime_get_ns, generated::bpf_get_smp_processor_id},
    macros::{kprobe, kretprobe, map},
    maps::{PerCpuArray, RingBuf},
    programs::{ProbeContext, RetProbeContext},
    EbpfContext,
};
use aya_log_ebpf::warn;
use wperf_common::{
    handle, CoreCorrelation, EventKind, HookAction, HookArgs, HookHit, HookSite, Phase,
    TimestampSource, EVENTS_BYTE_SIZE,
};

#[link_section = "license"]
#[used]
pub static LICENSE: [u8; 4] = *b"GPL\0";

// ============================================================================
// eBPF Maps
// ============================================================================

/// Event channel to userspace
#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(EVENTS_BYTE_SIZE, 0);

/// Per-CPU correlation slot (single entry, index 0)
///
/// Userspace primes every CPU's copy to `Idle` before any probe is attached.
#[map]
static CORE_STATE: PerCpuArray<CoreCorrelation> = PerCpuArray::with_max_entries(1, 0);

// ============================================================================
// Handler plumbing
// ============================================================================

struct Ktime;

impl TimestampSource for Ktime {
    #[inline(always)]
    fn now(&self) -> u64 {
        unsafe { bpf_ktime_get_ns() }
    }
}

#[inline(always)]
fn fire<C: EbpfContext>(ctx: &C, action: HookAction, site: HookSite, args: HookArgs) -> u32 {
    let Some(slot) = CORE_STATE.get_ptr_mut(0) else {
        return 1;
    };

    let hit = HookHit {
        action,
        site,
        cpu: unsafe { bpf_get_smp_processor_id() },
        timestamp_ns: Ktime.now(),
        args,
    };

    // SAFETY: per-CPU slot, program runs with migration disabled
    let (next, record) = handle(unsafe { *slot }, &hit);
    unsafe { *slot = next };

    if let Some(record) = record {
        if EVENTS.output(&record, 0).is_err() {
            warn!(ctx, "EVENTS full, dropped kind {}", record.kind);
            return 1;
        }
    }
    0
}

#[inline(always)]
fn arg(ctx: &ProbeContext, n: usize) -> u64 {
    ctx.arg::<u64>(n).unwrap_or(0)
}

/// Entry-only notification; `subject`, `object` and `arg` name argument indices
macro_rules! notify_hook {
    ($prog:ident, $kind:expr, arg = $a:literal) => {
        #[kprobe]
        pub fn $prog(ctx: ProbeContext) -> u32 {
            let args = HookArgs { subject: 0, object: 0, arg: arg(&ctx, $a) };
            fire(&ctx, HookAction::Notify($kind), HookSite::Entry, args)
        }
    };
    ($prog:ident, $kind:expr, subject = $s:literal) => {
        #[kprobe]
        pub fn $prog(ctx: ProbeContext) -> u32 {
            let args = HookArgs { subject: arg(&ctx, $s), object: 0, arg: 0 };
            fire(&ctx, HookAction::Notify($kind), HookSite::Entry, args)
        }
    };
    ($prog:ident, $kind:expr, subject = $s:literal, arg = $a:literal) => {
        #[kprobe]
        pub fn $prog(ctx: ProbeContext) -> u32 {
            let args = HookArgs { subject: arg(&ctx, $s), object: 0, arg: arg(&ctx, $a) };
            fire(&ctx, HookAction::Notify($kind), HookSite::Entry, args)
        }
    };
    ($prog:ident, $kind:expr, subject = $s:literal, object = $o:literal) => {
        #[kprobe]
        pub fn $prog(ctx: ProbeContext) -> u32 {
            let args = HookArgs { subject: arg(&ctx, $s), object: arg(&ctx, $o), arg: 0 };
            fire(&ctx, HookAction::Notify($kind), HookSite::Entry, args)
        }
    };
    ($prog:ident, $kind:expr, subject = $s:literal, object = $o:literal, arg = $a:literal) => {
        #[kprobe]
        pub fn $prog(ctx: ProbeContext) -> u32 {
            let args =
                HookArgs { subject: arg(&ctx, $s), object: arg(&ctx, $o), arg: arg(&ctx, $a) };
            fire(&ctx, HookAction::Notify($kind), HookSite::Entry, args)
        }
    };
}

/// Entry + return pair bracketing one phase
macro_rules! phase_hook {
    ($entry:ident, $ret:ident, $action:expr) => {
        #[kprobe]
        pub fn $entry(ctx: ProbeContext) -> u32 {
            fire(&ctx, $action, HookSite::Entry, HookArgs::default())
        }

        #[kretprobe]
        pub fn $ret(ctx: RetProbeContext) -> u32 {
            fire(&ctx, $action, HookSite::Return, HookArgs::default())
        }
    };
}

// ============================================================================
// Batch A: entry-only hooks
// ============================================================================

// Kprobes are refused on __switch_to on some architectures; skip it with
// `--skip __switch_to` there.
notify_hook!(__switch_to_entry, EventKind::SwitchTo, subject = 0, object = 1);

notify_hook!(try_to_wake_up_entry, EventKind::TryToWakeUp, subject = 0, arg = 1);

/// `wakeup_softirqd` only arms the dispatcher phase.
#[kprobe]
pub fn wakeup_softirqd_entry(ctx: ProbeContext) -> u32 {
    fire(&ctx, HookAction::MarkPhase(Phase::SoftDispatch), HookSite::Entry, HookArgs::default())
}

notify_hook!(part_round_stats_entry, EventKind::PartRoundStats, subject = 1, arg = 0);
notify_hook!(futex_wait_queue_me_entry, EventKind::FutexWaitQueue, subject = 0, object = 1);
notify_hook!(do_futex_entry, EventKind::DoFutex, subject = 0, arg = 1);
notify_hook!(journal_end_buffer_io_sync_entry, EventKind::JournalIoSync, subject = 0, arg = 1);
notify_hook!(wake_up_new_task_entry, EventKind::WakeUpNewTask, subject = 0);
notify_hook!(do_exit_entry, EventKind::DoExit, arg = 0);
notify_hook!(tcp_sendmsg_entry, EventKind::TcpSendmsg, subject = 0, arg = 2);
notify_hook!(udp_sendmsg_entry, EventKind::UdpSendmsg, subject = 0, arg = 2);
notify_hook!(tcp_sendpage_entry, EventKind::TcpSendpage, subject = 0, object = 1, arg = 3);
notify_hook!(udp_sendpage_entry, EventKind::UdpSendpage, subject = 0, object = 1, arg = 3);
notify_hook!(sock_sendmsg_entry, EventKind::SockSendmsg, subject = 0);
notify_hook!(__lock_sock_entry, EventKind::LockSock, subject = 0);

// ============================================================================
// Batch B: entry + return hooks, by softirq priority
// ============================================================================

phase_hook!(tasklet_hi_action_entry, tasklet_hi_action_return, HookAction::Phase(Phase::HiSoftirq));
phase_hook!(run_timer_softirq_entry, run_timer_softirq_return, HookAction::Phase(Phase::TimerSoftirq));
phase_hook!(net_tx_action_entry, net_tx_action_return, HookAction::Phase(Phase::NetTxSoftirq));
phase_hook!(net_rx_action_entry, net_rx_action_return, HookAction::Phase(Phase::NetRxSoftirq));
phase_hook!(blk_done_softirq_entry, blk_done_softirq_return, HookAction::Phase(Phase::BlockSoftirq));
phase_hook!(irq_poll_softirq_entry, irq_poll_softirq_return, HookAction::Phase(Phase::IrqPollSoftirq));
phase_hook!(tasklet_action_entry, tasklet_action_return, HookAction::Phase(Phase::TaskletSoftirq));
phase_hook!(
    run_rebalance_domains_entry,
    run_rebalance_domains_return,
    HookAction::Phase(Phase::SchedSoftirq)
);
// level 8 (HRTIMER) has no action of its own
phase_hook!(
    rcu_process_callbacks_entry,
    rcu_process_callbacks_return,
    HookAction::Phase(Phase::RcuSoftirq)
);
phase_hook!(
    __do_softirq_entry,
    __do_softirq_return,
    HookAction::TimedPhase { phase: Phase::Kernel, kind: EventKind::SoftirqDispatch }
);

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
