//! # wperf - Main Entry Point
//!
//! 1. Validate arguments, run preflight checks, create tracefs instances
//! 2. Load the probe object, prime per-CPU state, start the event relay
//! 3. Attach every hook (all or nothing)
//! 4. Capture until Ctrl-C or `--duration`, then detach and report

#![allow(clippy::too_many_lines, clippy::cast_precision_loss)]

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use std::fs::File;
use std::io::BufWriter;
use std::time::{Duration, Instant};

use wperf::capture::{CaptureEngine, FsEndpoints, PipelineState, SessionController};
use wperf::cli::Args;
use wperf::config::RecorderConfig;
use wperf::domain::ConfigError;
use wperf::events::EventRelay;
use wperf::instrumentation::{
    catalog, init_ebpf_logger, load_ebpf_program, prime_core_state, take_event_ring,
    EbpfHookHost, InstrumentationManager, CATALOG,
};
use wperf::preflight::run_preflight_checks;
use wperf::report::RunReport;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<ConfigError>().is_some() {
        return EXIT_USAGE;
    }
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else {
        EXIT_ERROR
    }
}

fn print_catalog() {
    println!("{:<28} {:<15} {:<6} ACTION", "SYMBOL", "KIND", "BATCH");
    for hook in CATALOG {
        let kind = format!("{:?}", hook.kind);
        let batch = format!("{:?}", hook.batch());
        println!("{:<28} {kind:<15} {batch:<6} {}", hook.symbol, catalog::describe(hook));
    }
}

/// Resolves when the session should end: Ctrl-C or the duration limit
async fn stop_signal(duration: Option<Duration>) -> &'static str {
    let limit = async {
        match duration {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "interrupted",
        () = limit => "duration limit reached",
    }
}

#[tokio::main(flavor = "current_thread")]
async fn run() -> Result<()> {
    let args = Args::parse();

    if args.list_hooks {
        print_catalog();
        return Ok(());
    }

    let config = RecorderConfig::from_args(&args)?;
    let quiet = config.quiet;

    run_preflight_checks(&config.tracefs, config.hooks_enabled())?;

    let layout = config.layout();
    layout.prepare().context("Failed to create capture directories")?;

    if !quiet {
        println!("wperf v{}", env!("CARGO_PKG_VERSION"));
        println!("instances: {}", config.instances.join(", "));
        println!("output: {}", config.output_dir.display());
    }

    // ── Instrumentation: load, prime, relay, attach ─────────────────────
    let mut bpf = if config.hooks_enabled() {
        Some(load_ebpf_program(&config.bpf_object)?)
    } else {
        None
    };

    let mut relay = None;
    if let (Some(bpf), Some(name)) = (bpf.as_mut(), config.relay_instance.as_deref()) {
        init_ebpf_logger(bpf);
        prime_core_state(bpf)?;
        let ring = take_event_ring(bpf)?;
        relay = Some(EventRelay::new(ring, &layout.marker_path(name))?);
        info!("✓ Relaying hook events into instance {name}");
    }

    let mut manager = bpf.as_mut().map(|bpf| InstrumentationManager::new(EbpfHookHost::new(bpf)));
    if let Some(manager) = manager.as_mut() {
        manager.activate(&config.hooks).context("Hook activation failed, nothing left attached")?;
    }
    let hooks_active = manager.as_ref().map_or(0, InstrumentationManager::active_count);

    if !quiet {
        println!("hooks: {hooks_active}");
    }

    // ── Capture until stopped ───────────────────────────────────────────
    let (controller, end) = SessionController::new();
    let engine = CaptureEngine::new(FsEndpoints);
    let started = Instant::now();

    let relay_end = end.clone();
    let work = async {
        let relay = async {
            match relay {
                Some(relay) => relay.run(relay_end).await.map(Some),
                None => Ok(None),
            }
        };
        tokio::join!(engine.start(layout.sessions(), &end), relay)
    };
    tokio::pin!(work);

    let (exit_reason, (reports, relay_stats)) = tokio::select! {
        out = &mut work => ("capture finished", out),
        reason = stop_signal(config.duration) => {
            controller.end();
            (reason, work.await)
        }
    };
    controller.end();

    // ── Teardown ────────────────────────────────────────────────────────
    if let Some(mut manager) = manager.take() {
        manager.deactivate_all();
    }

    let relay_stats = relay_stats.unwrap_or_else(|e| {
        warn!("⚠️  Event relay stopped: {e}");
        None
    });

    let elapsed = started.elapsed();
    if !quiet {
        let bytes: u64 = reports.iter().map(|r| r.bytes_copied).sum();
        let failed = reports.iter().filter(|r| r.final_state == PipelineState::Failed).count();
        eprintln!(
            "\n{}: {:.1}s, {} bytes captured from {} instances ({} failed), {} events relayed",
            exit_reason,
            elapsed.as_secs_f64(),
            bytes,
            reports.len(),
            failed,
            relay_stats.map_or(0, |s| s.relayed),
        );
    }

    if let Some(path) = &config.report {
        let report = RunReport {
            version: env!("CARGO_PKG_VERSION"),
            exit_reason,
            elapsed_secs: elapsed.as_secs_f64(),
            hooks_active,
            instances: reports,
            relay: relay_stats,
        };
        let file = File::create(path).context("Failed to create report file")?;
        report.write_json(BufWriter::new(file)).context("Failed to write report")?;
        if !quiet {
            println!("saved: {}", path.display());
        }
    }

    Ok(())
}
