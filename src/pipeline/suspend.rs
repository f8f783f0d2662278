use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};

/// Pipeline gate state. Paused means an anti-bot challenge needs operator
/// intervention; no pipeline work proceeds until an external resume.
#[derive(Debug, Clone, PartialEq, Eq)]
enum GateState {
    Active,
    Paused { reason: String },
}

/// Explicit suspension point for the pipeline.
///
/// The collector pauses the gate when it detects a challenge; an external
/// caller (the binary's stdin listener, or any holder of a clone) resumes it.
/// `wait_until_active` is the single place pipeline code blocks — there is no
/// synchronous console read anywhere in the library.
#[derive(Clone)]
pub struct SuspendGate {
    tx: Arc<watch::Sender<GateState>>,
    rx: watch::Receiver<GateState>,
}

impl Default for SuspendGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspendGate {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(GateState::Active);
        Self { tx: Arc::new(tx), rx }
    }

    /// Suspend the pipeline. Idempotent; a second pause overwrites the reason.
    pub fn pause(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Pipeline suspended: {}", reason);
        let _ = self.tx.send(GateState::Paused { reason });
    }

    /// External resume signal.
    pub fn resume(&self) {
        info!("Pipeline resumed");
        let _ = self.tx.send(GateState::Active);
    }

    pub fn is_paused(&self) -> bool {
        matches!(*self.rx.borrow(), GateState::Paused { .. })
    }

    pub fn pause_reason(&self) -> Option<String> {
        match &*self.rx.borrow() {
            GateState::Active => None,
            GateState::Paused { reason } => Some(reason.clone()),
        }
    }

    /// Wait for the next pause and return its reason. Used by resume
    /// listeners (e.g. the binary's operator prompt).
    pub async fn wait_until_paused(&self) -> String {
        let mut rx = self.rx.clone();
        loop {
            if let GateState::Paused { reason } = &*rx.borrow_and_update() {
                return reason.clone();
            }
            if rx.changed().await.is_err() {
                // Sender gone — report a synthetic reason so callers can exit.
                return "gate closed".to_string();
            }
        }
    }

    /// Wait until the gate is active. Returns immediately when not paused.
    pub async fn wait_until_active(&self) {
        let mut rx = self.rx.clone();
        // watch yields the current value first, so a live pause is never missed.
        while matches!(*rx.borrow_and_update(), GateState::Paused { .. }) {
            if rx.changed().await.is_err() {
                return; // sender gone — nothing can resume us, don't hang
            }
        }
    }
}
