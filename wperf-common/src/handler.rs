//! Hook handler transitions
//!
//! Every probe program reduces to one call of [`handle`] with its static
//! [`HookAction`]. The function is O(1), allocation-free and touches only the
//! slot it is given.
//!
//! A core holds a single phase slot, so a nested begin on the same core
//! overwrites the outer phase and the matching return resets to `Idle`. This
//! is an accepted coarsening; a fixed-depth stack per core would be needed to
//! keep nested phases.

use crate::{CoreCorrelation, EventKind, Phase, TraceRecord};

/// What a hook does when it fires
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookAction {
    /// Emit one event on entry, leave correlation state alone
    Notify(EventKind),
    /// Arm the core's phase on entry without emitting
    MarkPhase(Phase),
    /// Set the phase on entry, restore `Idle` on return
    Phase(Phase),
    /// Like `Phase`, but also stamps entry and emits `kind` with the elapsed
    /// time on return
    TimedPhase { phase: Phase, kind: EventKind },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookSite {
    Entry,
    Return,
}

/// Participant identifiers and scalar argument captured by a hook
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HookArgs {
    pub subject: u64,
    pub object: u64,
    pub arg: u64,
}

/// One hook invocation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HookHit {
    pub action: HookAction,
    pub site: HookSite,
    pub cpu: u32,
    pub timestamp_ns: u64,
    pub args: HookArgs,
}

/// Apply one hook invocation to a core's correlation slot
///
/// Returns the new slot value and the event to hand to the event channel, if
/// any. Return handlers reset the phase to `Idle` unconditionally.
#[allow(clippy::inline_always)]
#[inline(always)]
#[must_use]
pub fn handle(state: CoreCorrelation, hit: &HookHit) -> (CoreCorrelation, Option<TraceRecord>) {
    match (hit.action, hit.site) {
        (HookAction::Notify(kind), HookSite::Entry) => {
            let phase = state.phase();
            let record = TraceRecord {
                kind: kind.as_raw(),
                cpu: hit.cpu,
                timestamp_ns: hit.timestamp_ns,
                subject: hit.args.subject,
                object: hit.args.object,
                arg: hit.args.arg,
                elapsed_ns: 0,
                phase: phase.as_raw(),
                flag: u8::from(phase.is_bottom_half()),
                _padding: [0; 6],
            };
            (state, Some(record))
        }
        (HookAction::MarkPhase(phase) | HookAction::Phase(phase), HookSite::Entry) => {
            (state.with_phase(phase), None)
        }
        (HookAction::Phase(_), HookSite::Return) => (state.with_phase(Phase::Idle), None),
        (HookAction::TimedPhase { phase, .. }, HookSite::Entry) => {
            (CoreCorrelation::begin(phase, hit.timestamp_ns), None)
        }
        (HookAction::TimedPhase { kind, .. }, HookSite::Return) => {
            let begin = state.phase_begin_ns;
            let armed = begin != 0 && hit.timestamp_ns >= begin;
            let record = TraceRecord {
                kind: kind.as_raw(),
                cpu: hit.cpu,
                timestamp_ns: hit.timestamp_ns,
                subject: hit.args.subject,
                object: hit.args.object,
                arg: hit.args.arg,
                elapsed_ns: if armed { hit.timestamp_ns - begin } else { 0 },
                phase: state.phase().as_raw(),
                flag: u8::from(armed),
                _padding: [0; 6],
            };
            (CoreCorrelation::idle(), Some(record))
        }
        (HookAction::Notify(_) | HookAction::MarkPhase(_), HookSite::Return) => (state, None),
    }
}
