//! # Capture Engine
//!
//! Drives every capture instance on the current task. Instances are polled
//! together by `join_all`, so they share one scheduler thread and never run in
//! parallel; a failure in one instance ends only that instance.

use futures::future::join_all;
use log::info;

use super::endpoint::EndpointOpener;
use super::instance::{CaptureInstance, CaptureSession, InstanceReport, PipelineState};
use super::session::SessionEnd;
use crate::domain::InstanceId;

pub struct CaptureEngine<O: EndpointOpener> {
    opener: O,
}

impl<O: EndpointOpener> CaptureEngine<O> {
    pub fn new(opener: O) -> Self {
        Self { opener }
    }

    #[must_use]
    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Run one instance per session until each reaches a terminal state
    ///
    /// Returns one report per session, in session order. Errors stay with
    /// the instance that hit them and are carried in its report.
    pub async fn start(
        &self,
        sessions: Vec<CaptureSession>,
        end: &SessionEnd,
    ) -> Vec<InstanceReport> {
        info!("✓ Capturing {} sessions", sessions.len());
        let instances = sessions.into_iter().enumerate().map(|(idx, session)| {
            CaptureInstance::new(InstanceId(idx), session, &self.opener, end.clone()).run()
        });
        let reports = join_all(instances).await;

        let failed = reports.iter().filter(|r| r.final_state == PipelineState::Failed).count();
        let bytes: u64 = reports.iter().map(|r| r.bytes_copied).sum();
        info!("✓ Capture finished: {bytes} bytes, {failed} of {} sessions failed", reports.len());
        reports
    }
}
