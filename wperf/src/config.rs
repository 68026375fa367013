//! Validated run configuration
//!
//! [`RecorderConfig`] is what the binary actually runs with: CLI arguments
//! after defaults are applied and names are checked.

use std::path::PathBuf;
use std::time::Duration;

use crate::capture::CaptureLayout;
use crate::cli::Args;
use crate::domain::ConfigError;
use crate::instrumentation::catalog::{self, HookDefinition};

/// Instance used when none is given
pub const DEFAULT_INSTANCE: &str = "wperf";

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub tracefs: PathBuf,
    pub output_dir: PathBuf,
    pub instances: Vec<String>,
    /// Instance receiving hook events; `None` when hooks are disabled
    pub relay_instance: Option<String>,
    /// Hooks to attach, in catalog order; empty when hooks are disabled
    pub hooks: Vec<HookDefinition>,
    pub bpf_object: PathBuf,
    pub duration: Option<Duration>,
    pub report: Option<PathBuf>,
    pub quiet: bool,
}

impl RecorderConfig {
    /// # Errors
    /// Returns a `ConfigError` for bad instance names, duplicate instances, a
    /// relay instance that is not captured, or an unknown `--skip` symbol
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let instances = if args.instances.is_empty() {
            vec![DEFAULT_INSTANCE.to_string()]
        } else {
            args.instances.clone()
        };

        for (idx, name) in instances.iter().enumerate() {
            if name.is_empty() || name.contains('/') || name == "." || name == ".." {
                return Err(ConfigError::InvalidInstanceName(name.clone()));
            }
            if instances[..idx].contains(name) {
                return Err(ConfigError::DuplicateInstance(name.clone()));
            }
        }

        let hooks = catalog::select(&args.skip)?;

        let relay_instance = if args.no_hooks {
            None
        } else {
            match &args.relay_instance {
                Some(name) if !instances.contains(name) => {
                    return Err(ConfigError::UnknownRelayInstance(name.clone()));
                }
                Some(name) => Some(name.clone()),
                None => instances.first().cloned(),
            }
        };

        Ok(Self {
            tracefs: args.tracefs.clone(),
            output_dir: args.output_dir.clone(),
            instances,
            relay_instance,
            hooks: if args.no_hooks { Vec::new() } else { hooks },
            bpf_object: args.bpf_object.clone(),
            duration: (args.duration > 0).then(|| Duration::from_secs(args.duration)),
            report: args.report.clone(),
            quiet: args.quiet,
        })
    }

    #[must_use]
    pub fn hooks_enabled(&self) -> bool {
        self.relay_instance.is_some()
    }

    #[must_use]
    pub fn layout(&self) -> CaptureLayout {
        CaptureLayout::new(&self.tracefs, &self.output_dir, self.instances.clone())
    }
}
