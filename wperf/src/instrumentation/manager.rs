//! # Instrumentation Manager
//!
//! Activates and deactivates the hook catalog as one transaction.
//!
//! Hooks are installed batch A first, then batch B. Every hook installed so
//! far is remembered; if any install fails, exactly those hooks are removed
//! (newest first) before the error is returned, so a failed activation never
//! leaves probes attached. The host primitive is not assumed to roll back on
//! its own.

use log::{debug, info, warn};

use super::catalog::{Batch, HookDefinition};
use crate::domain::RegistrationError;

/// The environment primitive that attaches and detaches one hook
pub trait HookHost {
    /// Whatever is needed to undo one successful install
    type Link;

    /// Install every probe site of `hook`, or none of them
    ///
    /// # Errors
    /// Returns a `RegistrationError` if the hook cannot be installed
    fn install(&mut self, hook: &HookDefinition) -> Result<Self::Link, RegistrationError>;

    fn remove(&mut self, hook: &HookDefinition, link: Self::Link);
}

pub struct InstrumentationManager<H: HookHost> {
    host: H,
    active: Vec<(HookDefinition, H::Link)>,
}

impl<H: HookHost> InstrumentationManager<H> {
    pub fn new(host: H) -> Self {
        Self { host, active: Vec::new() }
    }

    /// Install all `hooks`, batch A before batch B
    ///
    /// Hooks already active, or listed more than once, are installed once.
    ///
    /// # Errors
    /// Returns the first `RegistrationError`; hooks installed by this call are
    /// removed again before returning.
    pub fn activate(&mut self, hooks: &[HookDefinition]) -> Result<(), RegistrationError> {
        let mut installed: Vec<(HookDefinition, H::Link)> = Vec::with_capacity(hooks.len());

        for batch in [Batch::A, Batch::B] {
            for hook in hooks.iter().filter(|h| h.batch() == batch) {
                if self.is_active(hook.symbol)
                    || installed.iter().any(|(done, _)| done.symbol == hook.symbol)
                {
                    continue;
                }
                match self.host.install(hook) {
                    Ok(link) => {
                        debug!("attached {} ({:?})", hook.symbol, hook.kind);
                        installed.push((*hook, link));
                    }
                    Err(e) => {
                        warn!("⚠️  {e}; rolling back {} hooks", installed.len());
                        self.rollback(installed);
                        return Err(e);
                    }
                }
            }
        }

        info!("✓ Attached {} hooks", installed.len());
        self.active.extend(installed);
        Ok(())
    }

    /// Remove the given hooks if active; hooks that never attached are ignored
    pub fn deactivate(&mut self, hooks: &[HookDefinition]) {
        let mut idx = self.active.len();
        while idx > 0 {
            idx -= 1;
            if hooks.iter().any(|h| h.symbol == self.active[idx].0.symbol) {
                let (hook, link) = self.active.remove(idx);
                self.host.remove(&hook, link);
            }
        }
    }

    /// Remove every active hook, newest first
    pub fn deactivate_all(&mut self) {
        let count = self.active.len();
        while let Some((hook, link)) = self.active.pop() {
            self.host.remove(&hook, link);
        }
        if count > 0 {
            info!("✓ Detached {count} hooks");
        }
    }

    #[must_use]
    pub fn is_active(&self, symbol: &str) -> bool {
        self.active.iter().any(|(hook, _)| hook.symbol == symbol)
    }

    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    fn rollback(&mut self, mut installed: Vec<(HookDefinition, H::Link)>) {
        while let Some((hook, link)) = installed.pop() {
            self.host.remove(&hook, link);
        }
    }
}

impl<H: HookHost> Drop for InstrumentationManager<H> {
    fn drop(&mut self) {
        self.deactivate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrumentation::catalog::HookKind;
    use wperf_common::{EventKind, HookAction, Phase};

    /// Records attach order; fails hooks whose symbol is in `missing`
    #[derive(Default)]
    struct RecordingHost {
        attached: Vec<&'static str>,
        log: Vec<String>,
        missing: Vec<&'static str>,
    }

    impl HookHost for RecordingHost {
        type Link = &'static str;

        fn install(&mut self, hook: &HookDefinition) -> Result<Self::Link, RegistrationError> {
            if self.missing.contains(&hook.symbol) {
                return Err(RegistrationError::Attach {
                    symbol: hook.symbol.to_string(),
                    program: format!("{}_entry", hook.symbol),
                    error: "symbol not found".to_string(),
                });
            }
            self.attached.push(hook.symbol);
            self.log.push(format!("+{}", hook.symbol));
            Ok(hook.symbol)
        }

        fn remove(&mut self, _hook: &HookDefinition, link: Self::Link) {
            self.attached.retain(|s| *s != link);
            self.log.push(format!("-{link}"));
        }
    }

    fn notify(symbol: &'static str) -> HookDefinition {
        HookDefinition::entry(symbol, HookAction::Notify(EventKind::DoExit))
    }

    fn paired(symbol: &'static str) -> HookDefinition {
        HookDefinition::paired(symbol, HookAction::Phase(Phase::NetRxSoftirq))
    }

    #[test]
    fn test_batch_a_installs_before_batch_b() {
        let hooks = [paired("net_rx_action"), notify("do_exit"), paired("net_tx_action")];
        let mut manager = InstrumentationManager::new(RecordingHost::default());
        manager.activate(&hooks).unwrap();
        assert_eq!(manager.host().log, vec!["+do_exit", "+net_rx_action", "+net_tx_action"]);
    }

    #[test]
    fn test_batch_b_failure_rolls_back_batch_a() {
        let hooks = [notify("do_exit"), notify("__lock_sock"), paired("net_rx_action")];
        let host = RecordingHost { missing: vec!["net_rx_action"], ..Default::default() };
        let mut manager = InstrumentationManager::new(host);

        let err = manager.activate(&hooks).unwrap_err();

        assert_eq!(err.symbol(), "net_rx_action");
        assert_eq!(manager.active_count(), 0);
        assert!(manager.host().attached.is_empty());
        assert_eq!(
            manager.host().log,
            vec!["+do_exit", "+__lock_sock", "-__lock_sock", "-do_exit"]
        );
    }

    #[test]
    fn test_duplicate_hook_is_installed_once() {
        let hooks = [notify("do_exit"), notify("do_exit"), paired("net_rx_action")];
        let mut manager = InstrumentationManager::new(RecordingHost::default());

        manager.activate(&hooks).unwrap();
        manager.activate(&hooks[..1]).unwrap();

        assert_eq!(manager.host().log, vec!["+do_exit", "+net_rx_action"]);
        assert_eq!(manager.active_count(), 2);
    }

    #[test]
    fn test_deactivate_tolerates_partial_set() {
        let hooks = [notify("do_exit"), notify("__lock_sock")];
        let mut manager = InstrumentationManager::new(RecordingHost::default());
        manager.activate(&hooks[..1]).unwrap();

        manager.deactivate(&hooks);
        manager.deactivate(&hooks);

        assert_eq!(manager.active_count(), 0);
        assert_eq!(manager.host().log, vec!["+do_exit", "-do_exit"]);
    }

    #[test]
    fn test_activate_skips_already_active() {
        let hooks = [notify("do_exit")];
        let mut manager = InstrumentationManager::new(RecordingHost::default());
        manager.activate(&hooks).unwrap();
        manager.activate(&hooks).unwrap();
        assert_eq!(manager.active_count(), 1);
        assert_eq!(manager.host().log, vec!["+do_exit"]);
    }

    #[test]
    fn test_return_only_goes_to_batch_b() {
        let ret_only = HookDefinition { kind: HookKind::ReturnOnly, ..notify("do_futex") };
        let hooks = [ret_only, notify("do_exit")];
        let mut manager = InstrumentationManager::new(RecordingHost::default());
        manager.activate(&hooks).unwrap();
        assert_eq!(manager.host().log, vec!["+do_exit", "+do_futex"]);
    }
}
