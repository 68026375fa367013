//! # Capture Endpoints
//!
//! The source and sink a capture instance copies between, behind traits so
//! the state machine can be driven by scripted endpoints in tests.
//!
//! - [`PipeSource`]: a tracefs `trace_pipe` opened `O_NONBLOCK` and registered
//!   with the reactor through `AsyncFd`. A read waits for readiness and then
//!   performs exactly one `read(2)`.
//! - [`FileSink`]: a regular file opened create + append, mode `0644`. Missing
//!   parent directories are created with mode `0755`.

#![allow(async_fn_in_trait)]

use std::io::{self, Read};
use std::path::Path;

use tokio::fs::{DirBuilder, File, OpenOptions};
use tokio::io::unix::AsyncFd;
use tokio::io::{AsyncWriteExt, Interest};

/// Permission bits for newly created sink files
pub const SINK_MODE: u32 = 0o644;

/// Permission bits for sink directories created on open
pub const SINK_DIR_MODE: u32 = 0o755;

/// A live, non-blocking byte stream
pub trait TraceSource {
    /// One read of up to `buf.len()` bytes
    ///
    /// Must be cancel-safe while no bytes have been taken from the source.
    /// `ErrorKind::WouldBlock` means nothing was available.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    async fn close(self) -> io::Result<()>;
}

pub trait TraceSink {
    /// Write all of `buf` at the end of the sink
    async fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    async fn sync(&mut self) -> io::Result<()>;

    async fn close(self) -> io::Result<()>;
}

/// Opens the endpoints for one capture session
pub trait EndpointOpener {
    type Source: TraceSource;
    type Sink: TraceSink;

    async fn open_source(&self, path: &Path) -> io::Result<Self::Source>;

    async fn open_sink(&self, path: &Path) -> io::Result<Self::Sink>;
}

pub struct PipeSource {
    fd: AsyncFd<std::fs::File>,
}

impl PipeSource {
    /// Open `path` for non-blocking reads
    ///
    /// # Errors
    /// Fails if the path cannot be opened or cannot be polled for readiness
    /// (regular files, for instance).
    pub async fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .await?
            .into_std()
            .await;
        let fd = AsyncFd::with_interest(file, Interest::READABLE)?;
        Ok(Self { fd })
    }
}

impl TraceSource for PipeSource {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut guard = self.fd.readable().await?;
        match guard.try_io(|inner| inner.get_ref().read(buf)) {
            Ok(result) => result,
            // readiness was stale; try_io already cleared it
            Err(_would_block) => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    async fn close(self) -> io::Result<()> {
        drop(self.fd.into_inner());
        Ok(())
    }
}

pub struct FileSink {
    file: File,
}

impl FileSink {
    /// # Errors
    /// Fails if the parent directory or the file cannot be created, or the
    /// file cannot be opened for append
    pub async fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            DirBuilder::new().recursive(true).mode(SINK_DIR_MODE).create(parent).await?;
        }
        let file =
            OpenOptions::new().create(true).append(true).mode(SINK_MODE).open(path).await?;
        Ok(Self { file })
    }
}

impl TraceSink for FileSink {
    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf).await?;
        self.file.flush().await
    }

    async fn sync(&mut self) -> io::Result<()> {
        self.file.sync_all().await
    }

    async fn close(mut self) -> io::Result<()> {
        self.file.flush().await
    }
}

/// Real filesystem endpoints
#[derive(Debug, Clone, Copy, Default)]
pub struct FsEndpoints;

impl EndpointOpener for FsEndpoints {
    type Source = PipeSource;
    type Sink = FileSink;

    async fn open_source(&self, path: &Path) -> io::Result<PipeSource> {
        PipeSource::open(path).await
    }

    async fn open_sink(&self, path: &Path) -> io::Result<FileSink> {
        FileSink::open(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    #[tokio::test]
    async fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture");
        std::fs::write(&path, b"old:").unwrap();

        let mut sink = FileSink::open(&path).await.unwrap();
        sink.write(b"new").await.unwrap();
        sink.sync().await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"old:new");
    }

    #[tokio::test]
    async fn test_file_sink_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture");
        FileSink::open(&path).await.unwrap().close().await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        // umask can only clear bits
        assert_eq!(mode & !SINK_MODE, 0);
    }

    #[tokio::test]
    async fn test_file_sink_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs/today/capture");

        FileSink::open(&path).await.unwrap().close().await.unwrap();

        assert!(path.is_file());
    }

    #[tokio::test]
    async fn test_file_sink_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blocker"), b"").unwrap();

        assert!(FileSink::open(&dir.path().join("blocker/sub/out")).await.is_err());
    }

    #[tokio::test]
    async fn test_regular_file_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-a-pipe");
        std::fs::write(&path, b"data").unwrap();

        assert!(PipeSource::open(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsEndpoints.open_source(&dir.path().join("absent")).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_pipe_source_reads_after_readiness() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fifo");
        let c_path = std::ffi::CString::new(path.to_str().unwrap()).unwrap();
        #[allow(unsafe_code)]
        let rc = unsafe { libc::mkfifo(c_path.as_ptr(), 0o600) };
        assert_eq!(rc, 0);

        let mut source = PipeSource::open(&path).await.unwrap();
        let mut writer = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        std::io::Write::write_all(&mut writer, b"trace").unwrap();

        let mut buf = [0u8; 16];
        let n = source.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"trace");
        source.close().await.unwrap();
    }
}
