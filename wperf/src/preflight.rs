//! Pre-flight checks for wperf
//!
//! Validates system requirements before attempting to load eBPF programs or
//! touch tracefs. Provides clear, actionable error messages when requirements
//! aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Minimum kernel version for the BPF ring buffer
const MIN_KERNEL_VERSION: (u32, u32) = (5, 8);

/// Run all pre-flight checks
///
/// Privileges are needed either way (tracefs is root-only); the kernel
/// version only matters when probes are loaded.
pub fn run_preflight_checks(tracefs: &Path, hooks: bool) -> Result<()> {
    check_privileges()?;
    if hooks {
        check_kernel_version()?;
    }
    check_tracefs(tracefs)?;
    Ok(())
}

fn check_privileges() -> Result<()> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    bail!(
        "Permission denied: wperf requires root privileges to load eBPF programs \
         and create tracefs instances.\n\n\
         Run with: sudo wperf ..."
    );
}

fn check_kernel_version() -> Result<()> {
    let version_str = std::fs::read_to_string("/proc/version")
        .context("Failed to read kernel version from /proc/version")?;
    let release = version_str.split_whitespace().nth(2).unwrap_or("unknown");

    let Some((major, minor)) = parse_kernel_release(release) else {
        // Can't parse, assume it's fine
        return Ok(());
    };

    if (major, minor) < MIN_KERNEL_VERSION {
        bail!(
            "Kernel version {}.{} is too old.\n\n\
             wperf requires Linux {}.{} or newer for eBPF ring buffer support.\n\
             Current kernel: {}",
            major,
            minor,
            MIN_KERNEL_VERSION.0,
            MIN_KERNEL_VERSION.1,
            release
        );
    }
    Ok(())
}

/// Parse `major.minor` from a release string like `6.1.0-arch1-1`
fn parse_kernel_release(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor: String = parts.next()?.chars().take_while(char::is_ascii_digit).collect();
    Some((major, minor.parse().ok()?))
}

/// Check that tracefs is mounted and supports instances
fn check_tracefs(tracefs: &Path) -> Result<()> {
    let instances = tracefs.join("instances");
    if !instances.is_dir() {
        bail!(
            "tracefs not found at {}\n\n\
             Mount it with: mount -t tracefs nodev {}\n\
             or point --tracefs at the mount point (often /sys/kernel/debug/tracing)",
            tracefs.display(),
            tracefs.display()
        );
    }
    Ok(())
}
