//! Per-request cancellation scope.
//!
//! A `RequestContext` carries an optional deadline and an explicit cancel
//! signal. Gateway selection and the outbound retry loop race their work
//! against it; event publication does not.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("operation cancelled")]
pub struct Cancelled;

#[derive(Clone, Debug)]
pub struct RequestContext {
    deadline: Option<Instant>,
    signal: watch::Receiver<bool>,
}

/// Triggers cancellation of every context cloned from the one it was created with.
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl RequestContext {
    /// A context that is never cancelled.
    pub fn background() -> Self {
        let (_sender, signal) = watch::channel(false);
        Self {
            deadline: None,
            signal,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::background().deadline_at(Instant::now() + timeout)
    }

    /// Returns a cancellable context that keeps this one's deadline.
    pub fn cancellable(&self) -> (Self, CancelHandle) {
        let (sender, signal) = watch::channel(false);
        let ctx = Self {
            deadline: self.deadline,
            signal,
        };
        (ctx, CancelHandle { sender })
    }

    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow() || self.deadline.map_or(false, |d| Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        let mut signal = self.signal.clone();
        let explicit = async move {
            loop {
                if *signal.borrow_and_update() {
                    return;
                }
                if signal.changed().await.is_err() {
                    // sender gone without cancelling
                    std::future::pending::<()>().await;
                }
            }
        };

        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = explicit => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => explicit.await,
        }
    }

    /// Runs `fut` unless the context is cancelled first.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Cancelled>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return Err(Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled),
            output = fut => Ok(output),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::background()
    }
}
