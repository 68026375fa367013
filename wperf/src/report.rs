//! JSON run report written with `--report`

use std::io::Write;

use serde::Serialize;

use crate::capture::InstanceReport;
use crate::events::RelayStats;

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub version: &'static str,
    /// Why the session ended
    pub exit_reason: &'static str,
    pub elapsed_secs: f64,
    pub hooks_active: usize,
    pub instances: Vec<InstanceReport>,
    pub relay: Option<RelayStats>,
}

impl RunReport {
    /// # Errors
    /// Returns an error if serialization or the write fails
    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PipelineState;
    use crate::domain::InstanceId;
    use std::path::PathBuf;

    #[test]
    fn test_report_json_shape() {
        let report = RunReport {
            version: "0.1.0",
            exit_reason: "interrupted",
            elapsed_secs: 1.5,
            hooks_active: 25,
            instances: vec![InstanceReport {
                id: InstanceId(0),
                source: PathBuf::from("/sys/kernel/tracing/instances/wperf/trace_pipe"),
                sink: PathBuf::from("wperf-out/wperf"),
                final_state: PipelineState::Cleanup,
                bytes_copied: 4096,
                reads: 3,
                error: None,
            }],
            relay: Some(RelayStats { relayed: 10, malformed: 0, write_errors: 1 }),
        };

        let mut buffer = Vec::new();
        report.write_json(&mut buffer).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        assert_eq!(parsed["hooks_active"], 25);
        assert_eq!(parsed["instances"][0]["id"], 0);
        assert_eq!(parsed["instances"][0]["final_state"]["state"], "cleanup");
        assert_eq!(parsed["instances"][0]["bytes_copied"], 4096);
        assert!(parsed["instances"][0]["error"].is_null());
        assert_eq!(parsed["relay"]["write_errors"], 1);
    }
}
