//! Hook host backed by aya kprobes
//!
//! Each hook maps to one or two programs in the loaded object
//! (`<symbol>_entry`, `<symbol>_return`). A hook is installed all or nothing:
//! if its return probe fails to attach, its entry probe is detached again.

use aya::programs::{kprobe::KProbeLinkId, KProbe, ProgramError};
use aya::Ebpf;
use log::warn;

use super::catalog::HookDefinition;
use super::manager::HookHost;
use crate::domain::RegistrationError;

/// Attached links of one hook, by program name
pub type HookLinks = Vec<(String, KProbeLinkId)>;

pub struct EbpfHookHost<'a> {
    bpf: &'a mut Ebpf,
}

impl<'a> EbpfHookHost<'a> {
    pub fn new(bpf: &'a mut Ebpf) -> Self {
        Self { bpf }
    }

    fn kprobe(&mut self, hook: &HookDefinition, program: &str) -> Result<&mut KProbe, RegistrationError> {
        let missing = || RegistrationError::ProgramMissing {
            symbol: hook.symbol.to_string(),
            program: program.to_string(),
        };
        let prog = self.bpf.program_mut(program).ok_or_else(missing)?;
        prog.try_into().map_err(|_| missing())
    }

    fn attach(&mut self, hook: &HookDefinition, program: &str) -> Result<KProbeLinkId, RegistrationError> {
        let probe = self.kprobe(hook, program)?;
        match probe.load() {
            Ok(()) | Err(ProgramError::AlreadyLoaded) => {}
            Err(e) => {
                return Err(RegistrationError::Load {
                    symbol: hook.symbol.to_string(),
                    program: program.to_string(),
                    error: e.to_string(),
                });
            }
        }
        probe.attach(hook.symbol, 0).map_err(|e| RegistrationError::Attach {
            symbol: hook.symbol.to_string(),
            program: program.to_string(),
            error: e.to_string(),
        })
    }

    fn detach(&mut self, hook: &HookDefinition, program: &str, link: KProbeLinkId) {
        let result = self.kprobe(hook, program).map(|probe| probe.detach(link));
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("⚠️  Failed to detach {program}: {e}"),
            Err(e) => warn!("⚠️  {e}"),
        }
    }
}

impl HookHost for EbpfHookHost<'_> {
    type Link = HookLinks;

    fn install(&mut self, hook: &HookDefinition) -> Result<HookLinks, RegistrationError> {
        let mut links = HookLinks::new();
        for program in hook.programs() {
            match self.attach(hook, &program) {
                Ok(link) => links.push((program, link)),
                Err(e) => {
                    self.remove(hook, links);
                    return Err(e);
                }
            }
        }
        Ok(links)
    }

    fn remove(&mut self, hook: &HookDefinition, mut links: HookLinks) {
        while let Some((program, link)) = links.pop() {
            self.detach(hook, &program, link);
        }
    }
}
