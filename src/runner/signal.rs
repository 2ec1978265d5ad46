//! Cross-thread stop signal for the event loop.
//!
//! Raising the signal is level-triggered: a raise that happens before the
//! loop starts waiting is still observed, so there is no missed wakeup
//! between spawning the worker and stopping it.

use std::sync::Arc;

use tokio::sync::watch;

/// Wake-up primitive used to ask the loop to exit its run phase.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the signal. Idempotent, callable from any thread.
    pub fn raise(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_raised(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver that observes the signal, including a raise that already happened
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once `rx` observes a raised signal or the signal is dropped.
pub async fn raised(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|raised| *raised).await;
}
