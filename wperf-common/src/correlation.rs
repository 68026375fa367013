use crate::{handle, HookAction, HookArgs, HookHit, HookSite, Phase, TraceRecord};

/// Per-core correlation slot
///
/// One instance per CPU, stored in the `CORE_STATE` per-CPU array. Only the
/// owning core ever reads or writes its slot; probe programs run with
/// migration disabled, so no lock is taken.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoreCorrelation {
    /// Raw [`Phase`] currently armed on this core
    pub phase: u8,

    #[allow(clippy::pub_underscore_fields)]
    pub _padding: [u8; 7],

    /// Timestamp recorded by a timed begin hook, 0 when not armed
    pub phase_begin_ns: u64,
}

impl CoreCorrelation {
    #[must_use]
    pub const fn idle() -> Self {
        Self { phase: Phase::Idle.as_raw(), _padding: [0; 7], phase_begin_ns: 0 }
    }

    #[must_use]
    pub const fn begin(phase: Phase, now: u64) -> Self {
        Self { phase: phase.as_raw(), _padding: [0; 7], phase_begin_ns: now }
    }

    /// Current phase; an unknown raw value reads as `Idle`
    #[must_use]
    pub const fn phase(&self) -> Phase {
        match Phase::from_raw(self.phase) {
            Some(phase) => phase,
            None => Phase::Idle,
        }
    }

    #[must_use]
    pub const fn with_phase(self, phase: Phase) -> Self {
        Self { phase: phase.as_raw(), ..self }
    }
}

impl Default for CoreCorrelation {
    fn default() -> Self {
        Self::idle()
    }
}

/// Monotonic, ordered time source used to stamp events
pub trait TimestampSource {
    fn now(&self) -> u64;
}

/// Core index proven to be in bounds for a [`PerCoreStore`] of `N` cores
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoreId<const N: usize>(u32);

impl<const N: usize> CoreId<N> {
    #[must_use]
    pub const fn new(index: u32) -> Option<Self> {
        if (index as usize) < N {
            Some(Self(index))
        } else {
            None
        }
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Fixed array of correlation slots indexed by core
///
/// The kernel side gets this shape from a per-CPU map. This store gives the
/// same guarantee off-kernel: a hook fired on core `i` can only reach slot
/// `i`, because [`PerCoreStore::fire`] takes the core as a bounded [`CoreId`]
/// and hands [`handle`] that one slot.
#[derive(Clone, Debug)]
pub struct PerCoreStore<const N: usize> {
    slots: [CoreCorrelation; N],
}

impl<const N: usize> PerCoreStore<N> {
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: [CoreCorrelation::idle(); N] }
    }

    #[must_use]
    pub fn slot(&self, core: CoreId<N>) -> &CoreCorrelation {
        &self.slots[core.0 as usize]
    }

    /// Run one hook invocation on `core`, stamping it with `clock`
    pub fn fire(
        &mut self,
        core: CoreId<N>,
        action: HookAction,
        site: HookSite,
        args: HookArgs,
        clock: &impl TimestampSource,
    ) -> Option<TraceRecord> {
        let hit = HookHit { action, site, cpu: core.0, timestamp_ns: clock.now(), args };
        let slot = &mut self.slots[core.0 as usize];
        let (next, record) = handle(*slot, &hit);
        *slot = next;
        record
    }
}

impl<const N: usize> Default for PerCoreStore<N> {
    fn default() -> Self {
        Self::new()
    }
}
