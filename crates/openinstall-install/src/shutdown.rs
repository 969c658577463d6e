//! Run-wide cancellation
//!
//! One signal (SIGINT in the binary) propagates through discovery,
//! execution, and validation. Consumers hold a cheap cloneable
//! [`ShutdownSignal`]; the binary holds the [`ShutdownHandle`].

use tokio::sync::watch;

/// Trigger side of the shutdown channel
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Signal every listener. Idempotent.
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }
}

/// Listener side of the shutdown channel
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves when the signal fires; never resolves if it never does.
    pub async fn triggered(&mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                // Handle dropped without triggering: cancellation can no
                // longer happen
                std::future::pending::<()>().await;
            }
        }
    }

    /// A signal that can never fire, for callers that opt out of
    /// cancellation (tests, one-shot tools).
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        std::mem::forget(tx);
        Self { rx }
    }
}

/// Create a connected handle/signal pair
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}
