//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

use crate::instrumentation::DEFAULT_BPF_OBJECT;

#[derive(Parser, Debug)]
#[command(
    name = "wperf",
    about = "Record scheduler, I/O and network wakeup events into per-instance trace captures",
    after_help = "\
EXAMPLES:
    sudo wperf                                  Hook everything, capture into ./wperf-out/wperf
    sudo wperf --duration 30 --report run.json  Stop after 30s and write a JSON run report
    sudo wperf --skip tcp_sendpage --skip udp_sendpage
                                                Leave out hooks the running kernel lacks
    sudo wperf --no-hooks --instance sched      Capture an existing tracefs instance only
    wperf --list-hooks                          Print the hook catalog"
)]
pub struct Args {
    /// tracefs mount point
    #[arg(long, value_name = "DIR", default_value = "/sys/kernel/tracing")]
    pub tracefs: PathBuf,

    /// Directory capture files are written to (one file per instance)
    #[arg(short, long, value_name = "DIR", default_value = "wperf-out")]
    pub output_dir: PathBuf,

    /// tracefs instance to capture; repeat for several
    #[arg(short, long = "instance", value_name = "NAME")]
    pub instances: Vec<String>,

    /// Instance that receives hook events (defaults to the first instance)
    #[arg(long, value_name = "NAME")]
    pub relay_instance: Option<String>,

    /// Kernel symbol to leave unhooked; repeat for several
    #[arg(long, value_name = "SYMBOL")]
    pub skip: Vec<String>,

    /// Capture only; do not load or attach any probes
    #[arg(long)]
    pub no_hooks: bool,

    /// Compiled probe object
    #[arg(long, value_name = "PATH", default_value = DEFAULT_BPF_OBJECT)]
    pub bpf_object: PathBuf,

    /// Stop after N seconds (0 = until Ctrl-C)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Write a JSON run report to FILE on exit
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Print the hook catalog and exit
    #[arg(long)]
    pub list_hooks: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["wperf"]).unwrap();
        assert_eq!(args.tracefs, PathBuf::from("/sys/kernel/tracing"));
        assert_eq!(args.output_dir, PathBuf::from("wperf-out"));
        assert!(args.instances.is_empty());
        assert_eq!(args.bpf_object, PathBuf::from(DEFAULT_BPF_OBJECT));
        assert_eq!(args.duration, 0);
    }

    #[test]
    fn test_repeated_flags_collect() {
        let args = Args::try_parse_from([
            "wperf", "-i", "sched", "-i", "net", "--skip", "do_exit", "--skip", "__lock_sock",
        ])
        .unwrap();
        assert_eq!(args.instances, vec!["sched", "net"]);
        assert_eq!(args.skip, vec!["do_exit", "__lock_sock"]);
    }
}
