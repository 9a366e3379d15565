//! Status notices for the user-triggered flows.
//!
//! Each flow (create, decrypt, availability check) publishes exactly one
//! pending notice followed by exactly one terminal notice. Terminal
//! notices auto-clear after a fixed display window.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Which user-triggered flow a notice belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Create,
    Decrypt,
    Availability,
}

/// Notice phase. `AlreadyVerified` races are reported as `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowPhase {
    Pending,
    Success,
    Error,
}

/// A single status notice shown at the presentation boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotice {
    pub flow: FlowKind,
    pub phase: FlowPhase,
    pub message: String,
}

impl StatusNotice {
    pub fn pending(flow: FlowKind, message: impl Into<String>) -> Self {
        Self {
            flow,
            phase: FlowPhase::Pending,
            message: message.into(),
        }
    }

    pub fn success(flow: FlowKind, message: impl Into<String>) -> Self {
        Self {
            flow,
            phase: FlowPhase::Success,
            message: message.into(),
        }
    }

    pub fn error(flow: FlowKind, message: impl Into<String>) -> Self {
        Self {
            flow,
            phase: FlowPhase::Error,
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase != FlowPhase::Pending
    }

    /// How long a terminal notice stays visible before auto-clearing.
    pub fn display_window(&self) -> Duration {
        match self.phase {
            FlowPhase::Pending => Duration::ZERO,
            FlowPhase::Success => Duration::from_secs(2),
            FlowPhase::Error => Duration::from_secs(3),
        }
    }
}

/// Broadcast channel for status notices with generation-guarded auto-clear.
///
/// Terminal notices schedule their own dismissal; the generation counter
/// ensures a late clear task never wipes a newer notice.
#[derive(Clone)]
pub struct StatusChannel {
    tx: watch::Sender<Option<StatusNotice>>,
    generation: Arc<AtomicU64>,
}

impl StatusChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<StatusNotice>> {
        self.tx.subscribe()
    }

    /// Latest notice, if one is currently displayed.
    pub fn current(&self) -> Option<StatusNotice> {
        self.tx.borrow().clone()
    }

    /// Publish a notice. Terminal notices auto-clear after their display
    /// window unless superseded in the meantime.
    pub fn publish(&self, notice: StatusNotice) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let window = notice.display_window();
        let _ = self.tx.send(Some(notice.clone()));

        if notice.is_terminal() {
            let tx = self.tx.clone();
            let gen_counter = self.generation.clone();
            tokio::spawn(async move {
                tokio::time::sleep(window).await;
                if gen_counter.load(Ordering::SeqCst) == generation {
                    let _ = tx.send(None);
                }
            });
        }
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_terminal_notice_auto_clears() {
        let channel = StatusChannel::new();
        channel.publish(StatusNotice::success(FlowKind::Create, "record created"));
        assert!(channel.current().is_some());

        tokio::time::sleep(Duration::from_secs(3)).await;
        // Let the clear task run.
        tokio::task::yield_now().await;
        assert!(channel.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_notice_survives_stale_clear() {
        let channel = StatusChannel::new();
        channel.publish(StatusNotice::success(FlowKind::Create, "first"));
        tokio::time::sleep(Duration::from_secs(1)).await;
        channel.publish(StatusNotice::error(FlowKind::Decrypt, "second"));

        // The first notice's clear fires now but must not wipe the second.
        tokio::time::sleep(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        let current = channel.current().expect("second notice still visible");
        assert_eq!(current.message, "second");
    }

    #[tokio::test]
    async fn test_pending_notice_does_not_auto_clear() {
        let notice = StatusNotice::pending(FlowKind::Decrypt, "verifying on-chain");
        assert!(!notice.is_terminal());
        assert_eq!(notice.display_window(), Duration::ZERO);
    }
}
