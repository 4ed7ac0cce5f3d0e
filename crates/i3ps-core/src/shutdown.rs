//! Interrupt flag shared between the signal listener and the line channels.
//!
//! A [`ShutdownSignal`] is a cloneable receiver over a `watch` channel. Once
//! the flag is raised, every pending or future [`ShutdownSignal::interrupted`]
//! call resolves, which the line channels turn into end-of-stream.

use tokio::sync::watch;
use tracing::info;

/// Raising side of the interrupt flag.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Raise the flag. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

/// Listening side of the interrupt flag.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Create a connected trigger/signal pair.
    pub fn new() -> (ShutdownTrigger, Self) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Self { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (_trigger, signal) = Self::new();
        signal
    }

    /// A signal raised by the first Ctrl-C delivered to the process.
    ///
    /// Must be called from within a tokio runtime.
    pub fn ctrl_c() -> Self {
        let (trigger, signal) = Self::new();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                trigger.trigger();
            }
        });
        signal
    }

    /// Returns `true` once the flag has been raised.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the flag is raised. Pends forever if the trigger was
    /// dropped without firing.
    pub async fn interrupted(&mut self) {
        let raised = self.rx.wait_for(|raised| *raised).await.is_ok();
        if !raised {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn trigger_wakes_waiter() {
        let (trigger, mut signal) = ShutdownSignal::new();
        assert!(!signal.is_triggered());
        let waiter = tokio::spawn(async move { signal.interrupted().await });
        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn already_raised_resolves_immediately() {
        let (trigger, mut signal) = ShutdownSignal::new();
        trigger.trigger();
        assert!(signal.is_triggered());
        tokio::time::timeout(Duration::from_millis(100), signal.interrupted())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn never_does_not_resolve() {
        let mut signal = ShutdownSignal::never();
        let res = tokio::time::timeout(Duration::from_millis(20), signal.interrupted()).await;
        assert!(res.is_err());
    }
}
