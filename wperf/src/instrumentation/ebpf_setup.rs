//! # eBPF Object Loading
//!
//! Loads the compiled probe object and prepares its maps before any probe is
//! attached.
//!
//! ## Functions
//!
//! - [`load_ebpf_program()`] - Load the object built by `cargo xtask build-ebpf`
//! - [`init_ebpf_logger()`] - Forward `aya-log` messages to the `log` facade
//! - [`prime_core_state()`] - Set every CPU's correlation slot to `Idle`
//! - [`take_event_ring()`] - Hand the `EVENTS` ring buffer to the relay

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use aya::maps::{MapData, PerCpuArray, PerCpuValues, RingBuf};
use aya::Ebpf;
use aya_log::EbpfLogger;
use log::{info, warn};
use wperf_common::CoreCorrelation;

/// Default location of the release build of `wperf-ebpf`
///
/// Always the release build: debug builds of the probe object pull in
/// formatting code the verifier rejects.
pub const DEFAULT_BPF_OBJECT: &str = "target/bpfel-unknown-none/release/wperf";

/// Load the eBPF object from `path`
///
/// # Errors
/// Returns an error if the object cannot be read or parsed, or its maps
/// cannot be created
pub fn load_ebpf_program(path: &Path) -> Result<Ebpf> {
    Ebpf::load_file(path).with_context(|| {
        format!(
            "Failed to load eBPF object {}\n\n\
             Build it with: cargo xtask build-ebpf --release",
            path.display()
        )
    })
}

/// Initialize eBPF logger
pub fn init_ebpf_logger(bpf: &mut Ebpf) {
    if let Err(e) = EbpfLogger::init(bpf) {
        warn!("Failed to initialize eBPF logger: {e}");
    }
}

/// Write an idle slot for every possible CPU into `CORE_STATE`
///
/// A zeroed slot would read as the highest-priority softirq phase.
///
/// # Errors
/// Returns an error if the map is missing or the CPU count is unavailable
pub fn prime_core_state(bpf: &mut Ebpf) -> Result<usize> {
    let mut slots: PerCpuArray<_, CoreCorrelation> =
        PerCpuArray::try_from(bpf.map_mut("CORE_STATE").context("CORE_STATE map not found")?)?;
    let cpus = possible_cpus()?;
    let idle = PerCpuValues::try_from(vec![CoreCorrelation::idle(); cpus])?;
    slots.set(0, idle, 0)?;
    info!("✓ Primed correlation slots for {cpus} CPUs");
    Ok(cpus)
}

/// Number of possible CPUs, the length of every per-CPU map value
///
/// The format in /sys is like "0-3" or "0-3,8-11".
fn possible_cpus() -> Result<usize> {
    let content = fs::read_to_string("/sys/devices/system/cpu/possible")
        .context("Failed to read /sys/devices/system/cpu/possible")?;
    count_cpu_list(&content)
}

fn count_cpu_list(list: &str) -> Result<usize> {
    let mut count = 0;
    for range in list.trim().split(',') {
        if let Some((start, end)) = range.split_once('-') {
            let start: usize = start.parse().with_context(|| format!("bad CPU range {range:?}"))?;
            let end: usize = end.parse().with_context(|| format!("bad CPU range {range:?}"))?;
            count += end.saturating_sub(start) + 1;
        } else {
            range.parse::<usize>().with_context(|| format!("bad CPU id {range:?}"))?;
            count += 1;
        }
    }
    Ok(count)
}

/// # Errors
/// Returns an error if the `EVENTS` map is missing or is not a ring buffer
pub fn take_event_ring(bpf: &mut Ebpf) -> Result<RingBuf<MapData>> {
    let ring = RingBuf::try_from(bpf.take_map("EVENTS").context("EVENTS map not found")?)?;
    Ok(ring)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_cpu_list() {
        assert_eq!(count_cpu_list("0\n").unwrap(), 1);
        assert_eq!(count_cpu_list("0-7\n").unwrap(), 8);
        assert_eq!(count_cpu_list("0-3,8-11").unwrap(), 8);
        assert_eq!(count_cpu_list("0-1,4").unwrap(), 3);
        assert!(count_cpu_list("").is_err());
        assert!(count_cpu_list("0-x").is_err());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_possible_cpus() {
        assert!(possible_cpus().unwrap() >= 1);
    }
}
