use wperf::domain::RegistrationError;
use wperf::instrumentation::catalog::{self, find};
use wperf::instrumentation::{HookDefinition, HookHost, InstrumentationManager};

/// Host that tracks attached symbols and refuses the ones listed in `absent`
#[derive(Default)]
struct FakeHost {
    absent: Vec<&'static str>,
    attached: Vec<&'static str>,
    removed: Vec<&'static str>,
    next_link: u32,
}

impl HookHost for FakeHost {
    type Link = u32;

    fn install(&mut self, hook: &HookDefinition) -> Result<u32, RegistrationError> {
        if self.absent.contains(&hook.symbol) {
            return Err(RegistrationError::Attach {
                symbol: hook.symbol.to_string(),
                program: hook.programs()[0].clone(),
                error: "No such file or directory".to_string(),
            });
        }
        self.attached.push(hook.symbol);
        self.next_link += 1;
        Ok(self.next_link)
    }

    fn remove(&mut self, hook: &HookDefinition, _link: u32) {
        self.attached.retain(|s| *s != hook.symbol);
        self.removed.push(hook.symbol);
    }
}

fn three_hooks() -> Vec<HookDefinition> {
    ["do_exit", "try_to_wake_up", "__lock_sock"]
        .iter()
        .map(|s| *find(s).expect("catalog entry"))
        .collect()
}

#[test]
fn test_all_valid_hooks_activate_and_deactivate() {
    let hooks = three_hooks();
    let mut manager = InstrumentationManager::new(FakeHost::default());

    manager.activate(&hooks).expect("activation succeeds");

    assert_eq!(manager.active_count(), 3);
    for hook in &hooks {
        assert!(manager.is_active(hook.symbol), "{} should be active", hook.symbol);
    }

    manager.deactivate(&hooks);

    assert_eq!(manager.active_count(), 0);
    assert!(manager.host().attached.is_empty());
    assert_eq!(manager.host().removed.len(), 3);
}

#[test]
fn test_invalid_second_hook_leaves_nothing_active() {
    let hooks = three_hooks();
    let host = FakeHost { absent: vec!["try_to_wake_up"], ..Default::default() };
    let mut manager = InstrumentationManager::new(host);

    let err = manager.activate(&hooks).expect_err("activation fails");

    assert_eq!(err.symbol(), "try_to_wake_up");
    assert!(!manager.is_active("do_exit"));
    assert!(manager.host().attached.is_empty());
    assert_eq!(manager.host().removed, vec!["do_exit"]);
    // the third hook was never attempted
    assert!(!manager.host().removed.contains(&"__lock_sock"));
}

#[test]
fn test_batch_b_failure_rolls_back_full_catalog() {
    let hooks = catalog::select(&[]).unwrap();
    let batch_a = hooks.iter().filter(|h| h.batch() == catalog::Batch::A).count();
    let host = FakeHost { absent: vec!["rcu_process_callbacks"], ..Default::default() };
    let mut manager = InstrumentationManager::new(host);

    let err = manager.activate(&hooks).expect_err("activation fails");

    assert_eq!(err.symbol(), "rcu_process_callbacks");
    assert_eq!(manager.active_count(), 0);
    assert!(manager.host().attached.is_empty());
    // every batch-A hook plus the eight batch-B hooks before the failure
    assert_eq!(manager.host().removed.len(), batch_a + 8);
    // newest first
    assert_eq!(manager.host().removed.first(), Some(&"run_rebalance_domains"));
    assert_eq!(manager.host().removed.last(), Some(&"__switch_to"));
}

#[test]
fn test_deactivate_after_failed_activation_is_safe() {
    let hooks = three_hooks();
    let host = FakeHost { absent: vec!["__lock_sock"], ..Default::default() };
    let mut manager = InstrumentationManager::new(host);

    assert!(manager.activate(&hooks).is_err());
    manager.deactivate(&hooks);
    manager.deactivate_all();

    assert_eq!(manager.host().removed, vec!["try_to_wake_up", "do_exit"]);
}

#[test]
fn test_dropping_manager_detaches_hooks() {
    struct Counting<'a>(&'a mut u32);

    impl HookHost for Counting<'_> {
        type Link = ();

        fn install(&mut self, _hook: &HookDefinition) -> Result<(), RegistrationError> {
            *self.0 += 1;
            Ok(())
        }

        fn remove(&mut self, _hook: &HookDefinition, _link: ()) {
            *self.0 -= 1;
        }
    }

    let mut attached = 0;
    {
        let mut manager = InstrumentationManager::new(Counting(&mut attached));
        manager.activate(&three_hooks()).unwrap();
    }
    assert_eq!(attached, 0);
}
