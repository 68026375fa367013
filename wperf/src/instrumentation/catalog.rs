//! # Hook Catalog
//!
//! The fixed, priority-ordered table of kernel functions wperf instruments.
//! It has to match the running kernel's internal symbols, so treat it as a
//! versioned artifact tied to the kernels you deploy on. Targets that a given
//! kernel lacks are excluded at runtime with `--skip`.
//!
//! Program names follow `<symbol>_entry` / `<symbol>_return`, matching the
//! functions in `wperf-ebpf`.

use wperf_common::{EventKind, HookAction, Phase};

use crate::domain::ConfigError;

/// Which probe sites a hook needs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookKind {
    EntryOnly,
    ReturnOnly,
    EntryAndReturn,
}

/// Installation batch
///
/// Batch A hooks run to completion on entry; batch B hooks need a return
/// probe. Batch B is installed only after all of batch A succeeded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Batch {
    A,
    B,
}

/// One instrumented kernel function
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HookDefinition {
    pub symbol: &'static str,
    pub kind: HookKind,
    /// Per-invocation scratch bytes the host must reserve (0 for every
    /// current hook)
    pub scratch_size: u32,
    /// What the probe program does when it fires
    pub action: HookAction,
}

impl HookDefinition {
    #[must_use]
    pub const fn entry(symbol: &'static str, action: HookAction) -> Self {
        Self { symbol, kind: HookKind::EntryOnly, scratch_size: 0, action }
    }

    #[must_use]
    pub const fn paired(symbol: &'static str, action: HookAction) -> Self {
        Self { symbol, kind: HookKind::EntryAndReturn, scratch_size: 0, action }
    }

    #[must_use]
    pub const fn batch(&self) -> Batch {
        match self.kind {
            HookKind::EntryOnly => Batch::A,
            HookKind::ReturnOnly | HookKind::EntryAndReturn => Batch::B,
        }
    }

    /// eBPF program names for this hook, entry first
    #[must_use]
    pub fn programs(&self) -> Vec<String> {
        let entry = format!("{}_entry", self.symbol);
        let ret = format!("{}_return", self.symbol);
        match self.kind {
            HookKind::EntryOnly => vec![entry],
            HookKind::ReturnOnly => vec![ret],
            HookKind::EntryAndReturn => vec![entry, ret],
        }
    }
}

const fn notify(symbol: &'static str, kind: EventKind) -> HookDefinition {
    HookDefinition::entry(symbol, HookAction::Notify(kind))
}

const fn softirq(symbol: &'static str, phase: Phase) -> HookDefinition {
    HookDefinition::paired(symbol, HookAction::Phase(phase))
}

/// Every hook, in installation order
pub static CATALOG: &[HookDefinition] = &[
    // Batch A
    notify("__switch_to", EventKind::SwitchTo),
    notify("try_to_wake_up", EventKind::TryToWakeUp),
    HookDefinition::entry("wakeup_softirqd", HookAction::MarkPhase(Phase::SoftDispatch)),
    notify("part_round_stats", EventKind::PartRoundStats),
    notify("futex_wait_queue_me", EventKind::FutexWaitQueue),
    notify("do_futex", EventKind::DoFutex),
    notify("journal_end_buffer_io_sync", EventKind::JournalIoSync),
    notify("wake_up_new_task", EventKind::WakeUpNewTask),
    notify("do_exit", EventKind::DoExit),
    notify("tcp_sendmsg", EventKind::TcpSendmsg),
    notify("udp_sendmsg", EventKind::UdpSendmsg),
    notify("tcp_sendpage", EventKind::TcpSendpage),
    notify("udp_sendpage", EventKind::UdpSendpage),
    notify("sock_sendmsg", EventKind::SockSendmsg),
    notify("__lock_sock", EventKind::LockSock),
    // Batch B, by softirq priority (8 = HRTIMER has no action)
    softirq("tasklet_hi_action", Phase::HiSoftirq),
    softirq("run_timer_softirq", Phase::TimerSoftirq),
    softirq("net_tx_action", Phase::NetTxSoftirq),
    softirq("net_rx_action", Phase::NetRxSoftirq),
    softirq("blk_done_softirq", Phase::BlockSoftirq),
    softirq("irq_poll_softirq", Phase::IrqPollSoftirq),
    softirq("tasklet_action", Phase::TaskletSoftirq),
    softirq("run_rebalance_domains", Phase::SchedSoftirq),
    softirq("rcu_process_callbacks", Phase::RcuSoftirq),
    HookDefinition::paired(
        "__do_softirq",
        HookAction::TimedPhase { phase: Phase::Kernel, kind: EventKind::SoftirqDispatch },
    ),
];

/// Look up a catalog entry by kernel symbol
#[must_use]
pub fn find(symbol: &str) -> Option<&'static HookDefinition> {
    CATALOG.iter().find(|hook| hook.symbol == symbol)
}

/// Catalog minus the skipped symbols, order preserved
///
/// # Errors
/// Returns `ConfigError::UnknownHook` if a skipped symbol is not in the catalog
pub fn select(skip: &[String]) -> Result<Vec<HookDefinition>, ConfigError> {
    if let Some(unknown) = skip.iter().find(|s| find(s).is_none()) {
        return Err(ConfigError::UnknownHook(unknown.clone()));
    }
    Ok(CATALOG.iter().filter(|hook| !skip.iter().any(|s| s == hook.symbol)).copied().collect())
}

/// Human-readable description of a hook's action for `--list-hooks`
#[must_use]
pub fn describe(hook: &HookDefinition) -> String {
    match hook.action {
        HookAction::Notify(kind) => format!("notify {}", kind.name()),
        HookAction::MarkPhase(phase) => format!("mark {}", phase.name()),
        HookAction::Phase(phase) => format!("phase {} ({})", phase.name(), phase.as_raw()),
        HookAction::TimedPhase { phase, kind } => {
            format!("timed {} -> {} elapsed", phase.name(), kind.name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_a_precedes_batch_b() {
        let first_b = CATALOG.iter().position(|h| h.batch() == Batch::B).unwrap();
        assert!(CATALOG[..first_b].iter().all(|h| h.batch() == Batch::A));
        assert!(CATALOG[first_b..].iter().all(|h| h.batch() == Batch::B));
    }

    #[test]
    fn test_softirq_hooks_follow_dispatch_priority() {
        let levels: Vec<u8> = CATALOG
            .iter()
            .filter_map(|h| match h.action {
                HookAction::Phase(phase) => Some(phase.as_raw()),
                _ => None,
            })
            .collect();
        assert_eq!(levels, vec![0, 1, 2, 3, 4, 5, 6, 7, 9]);
    }

    #[test]
    fn test_symbols_are_unique() {
        for (i, hook) in CATALOG.iter().enumerate() {
            assert!(CATALOG[i + 1..].iter().all(|other| other.symbol != hook.symbol));
        }
    }

    #[test]
    fn test_program_names() {
        let hook = find("__do_softirq").unwrap();
        assert_eq!(hook.programs(), vec!["__do_softirq_entry", "__do_softirq_return"]);
        assert_eq!(find("do_exit").unwrap().programs(), vec!["do_exit_entry"]);
    }

    #[test]
    fn test_select_skips_symbols() {
        let hooks = select(&["tcp_sendpage".to_string(), "udp_sendpage".to_string()]).unwrap();
        assert_eq!(hooks.len(), CATALOG.len() - 2);
        assert!(hooks.iter().all(|h| !h.symbol.ends_with("sendpage")));
    }

    #[test]
    fn test_select_rejects_unknown_symbol() {
        let err = select(&["tcp_sendmsgg".to_string()]).unwrap_err();
        assert_eq!(err, ConfigError::UnknownHook("tcp_sendmsgg".to_string()));
    }

    #[test]
    fn test_describe() {
        assert_eq!(describe(find("wakeup_softirqd").unwrap()), "mark KSOFTIRQ");
        assert_eq!(describe(find("net_rx_action").unwrap()), "phase NET_RX (3)");
    }
}
