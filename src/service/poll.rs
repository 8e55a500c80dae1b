// Copyright (c) 2025 - Cowboy AI, Inc.
//! Bounded Polling
//!
//! Every suspension point of a convergence pass is a [`Poller::wait`]: probe
//! the provider, sleep for the interval, probe again, until the probe yields
//! a value, returns an error, the deadline passes or the pass is cancelled.
//!
//! The deadline also covers the probe itself, so a provider call that hangs
//! past it is cut off.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::errors::{ConvergenceError, InfraResult};

/// Create a linked cancellation handle and signal
pub fn cancellation() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelSignal { rx })
}

/// Requests cancellation of every pass holding the matching [`CancelSignal`]
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Observes cancellation requested through a [`CancelHandle`]
///
/// Dropping the handle without cancelling leaves the signal pending forever.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Interval, deadline and cancellation shared by the waits of one pass
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    timeout: Duration,
    cancel: Option<CancelSignal>,
}

impl Poller {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, signal: CancelSignal) -> Self {
        self.cancel = Some(signal);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe until it yields `Some`
    ///
    /// `Ok(None)` from the probe means "not yet". A probe error ends the wait
    /// immediately. `waiting_for` names the condition in logs and errors.
    pub async fn wait<T, F, Fut>(&self, waiting_for: &str, mut probe: F) -> InfraResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = InfraResult<Option<T>>>,
    {
        // A timeout past the clock's range means no deadline.
        let deadline = Instant::now().checked_add(self.timeout);
        let interval = self.interval;

        let polling = async {
            let mut attempt: u32 = 0;
            loop {
                attempt += 1;
                if let Some(value) = probe().await? {
                    debug!(waiting_for, attempt, "Wait satisfied");
                    return Ok(value);
                }
                debug!(waiting_for, attempt, "Still waiting");
                tokio::time::sleep(interval).await;
            }
        };
        let bounded = async {
            match deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, polling).await,
                None => Ok(polling.await),
            }
        };

        let outcome = match self.cancel.clone() {
            Some(mut signal) => {
                tokio::select! {
                    biased;
                    _ = signal.cancelled() => {
                        warn!(waiting_for, "Wait cancelled");
                        return Err(ConvergenceError::Cancelled {
                            waiting_for: waiting_for.to_string(),
                        });
                    }
                    outcome = bounded => outcome,
                }
            }
            None => bounded.await,
        };

        match outcome {
            Ok(result) => result,
            Err(_elapsed) => {
                warn!(waiting_for, timeout = ?self.timeout, "Wait timed out");
                Err(ConvergenceError::Timeout {
                    waiting_for: waiting_for.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }
}
