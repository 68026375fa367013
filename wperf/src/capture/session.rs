//! Session lifecycle signal
//!
//! One `ended` flag shared by every capture instance and the event relay.
//! It only ever goes from `false` to `true`.

use tokio::sync::watch;

/// Owning side: sets the flag
#[derive(Debug)]
pub struct SessionController {
    tx: watch::Sender<bool>,
}

/// Observing side, cloned into every instance
#[derive(Debug, Clone)]
pub struct SessionEnd {
    rx: watch::Receiver<bool>,
}

impl SessionController {
    #[must_use]
    pub fn new() -> (Self, SessionEnd) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, SessionEnd { rx })
    }

    /// Mark the session ended; later calls are no-ops
    pub fn end(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_ended(&self) -> bool {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> SessionEnd {
        SessionEnd { rx: self.tx.subscribe() }
    }
}

impl SessionEnd {
    /// Synchronous check used at scheduling points
    ///
    /// A dropped controller counts as ended.
    #[must_use]
    pub fn is_ended(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the session has ended
    pub async fn ended(&self) {
        let mut rx = self.rx.clone();
        // Err means the controller is gone, which also ends the session
        let _ = rx.wait_for(|ended| *ended).await;
    }
}
