use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::Command;

/// Package holding the probe programs
const EBPF_PACKAGE: &str = "wperf-ebpf";
/// Binary name of the probe object inside that package
const EBPF_BIN: &str = "wperf";

#[derive(Parser)]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Parser)]
enum Cmd {
    /// Build the kprobe object loaded by `wperf --bpf-object`
    BuildEbpf {
        #[arg(long, default_value = "bpfel-unknown-none")]
        target: String,
        #[arg(long)]
        release: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Cmd::BuildEbpf { target, release } => build_ebpf(&target, release)?,
    }

    Ok(())
}

fn build_ebpf(target: &str, _release: bool) -> Result<()> {
    // Debug builds pull in formatting code (LowerHex) the BPF linker rejects,
    // so the object is always built in release mode.
    let status = Command::new("cargo")
        .args(["+nightly", "build", "--package", EBPF_PACKAGE, "--target", target])
        .args(["-Z", "build-std=core", "--release"])
        .status()
        .context("Failed to run cargo for the eBPF build")?;

    if !status.success() {
        bail!("Failed to build {EBPF_PACKAGE}");
    }

    let object: PathBuf = ["target", target, "release", EBPF_BIN].iter().collect();
    if !object.is_file() {
        bail!("Build succeeded but {} is missing", object.display());
    }

    println!("✓ eBPF object built: {}", object.display());
    println!("  Load it with: sudo wperf --bpf-object {}", object.display());

    Ok(())
}
