//! Cooperative cancellation
//!
//! A `CancelHandle` is held by whoever can stop a run (the CLI's ctrl-c
//! handler); `CancelSignal` clones travel with every job and step. Built on
//! `tokio::sync::watch` so a signal raised before a receiver starts waiting
//! is still observed.

use tokio::sync::watch;

/// Sender side; raising the signal is idempotent
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

/// Receiver side, cheap to clone into each task
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

/// Create a linked handle/signal pair
pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

impl CancelHandle {
    pub fn cancel(&self) {
        // Receivers may all have dropped already; that is fine.
        let _ = self.tx.send(true);
    }
}

impl CancelSignal {
    /// A signal that never fires, for callers without a cancel source
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        // Sender drops immediately; `cancelled()` treats a closed channel
        // holding `false` as never-cancelled.
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested. If the handle is dropped
    /// without cancelling, this pends forever, which is the behavior callers
    /// racing it against real work want.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender gone without ever cancelling
                std::future::pending::<()>().await;
            }
        }
    }
}
