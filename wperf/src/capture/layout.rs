//! Tracefs instance provisioning
//!
//! Each named instance gets its own tracefs ring buffer at
//! `<tracefs>/instances/<name>` and one capture file at `<output_dir>/<name>`.

use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use log::debug;

use super::instance::CaptureSession;

const OUTPUT_DIR_MODE: u32 = 0o755;

#[derive(Debug, Clone)]
pub struct CaptureLayout {
    tracefs: PathBuf,
    output_dir: PathBuf,
    instances: Vec<String>,
}

impl CaptureLayout {
    pub fn new(tracefs: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, instances: Vec<String>) -> Self {
        Self { tracefs: tracefs.into(), output_dir: output_dir.into(), instances }
    }

    #[must_use]
    pub fn instances(&self) -> &[String] {
        &self.instances
    }

    #[must_use]
    pub fn instance_dir(&self, name: &str) -> PathBuf {
        self.tracefs.join("instances").join(name)
    }

    /// `trace_marker` of an instance; writes there show up in its `trace_pipe`
    #[must_use]
    pub fn marker_path(&self, name: &str) -> PathBuf {
        self.instance_dir(name).join("trace_marker")
    }

    /// Create the output directory and every tracefs instance
    ///
    /// Idempotent: existing directories are left as they are.
    ///
    /// # Errors
    /// Returns the first directory that could not be created
    pub fn prepare(&self) -> io::Result<()> {
        DirBuilder::new().recursive(true).mode(OUTPUT_DIR_MODE).create(&self.output_dir)?;
        for name in &self.instances {
            create_if_absent(&self.instance_dir(name))?;
        }
        Ok(())
    }

    /// One capture session per instance, in configuration order
    #[must_use]
    pub fn sessions(&self) -> Vec<CaptureSession> {
        self.instances
            .iter()
            .map(|name| {
                CaptureSession::new(self.instance_dir(name).join("trace_pipe"), self.output_dir.join(name))
            })
            .collect()
    }
}

fn create_if_absent(dir: &Path) -> io::Result<()> {
    match fs::create_dir(dir) {
        Ok(()) => {
            debug!("created {}", dir.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sessions_pair_pipe_with_output_file() {
        let layout = CaptureLayout::new(
            "/sys/kernel/tracing",
            "out",
            vec!["sched".to_string(), "net".to_string()],
        );
        let sessions = layout.sessions();
        assert_eq!(
            sessions,
            vec![
                CaptureSession::new("/sys/kernel/tracing/instances/sched/trace_pipe", "out/sched"),
                CaptureSession::new("/sys/kernel/tracing/instances/net/trace_pipe", "out/net"),
            ]
        );
        assert_eq!(
            layout.marker_path("net"),
            PathBuf::from("/sys/kernel/tracing/instances/net/trace_marker")
        );
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let tracefs = root.path().join("tracing");
        fs::create_dir_all(tracefs.join("instances")).unwrap();
        let layout =
            CaptureLayout::new(&tracefs, root.path().join("out/nested"), vec!["a".to_string()]);

        layout.prepare().unwrap();
        layout.prepare().unwrap();

        assert!(tracefs.join("instances/a").is_dir());
        assert!(root.path().join("out/nested").is_dir());
    }

    #[test]
    fn test_prepare_fails_without_tracefs() {
        let root = tempfile::tempdir().unwrap();
        let layout = CaptureLayout::new(
            root.path().join("missing"),
            root.path().join("out"),
            vec!["a".to_string()],
        );
        assert!(layout.prepare().is_err());
    }
}
