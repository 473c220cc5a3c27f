//! Fan-in of independent producers into one bounded outbound channel.
//!
//! Every producer is a task with its own [`Emitter`]. Shutdown is a single
//! [`CancellationToken`]: producers stop, queued values stay readable, and
//! the receiver sees the end of the stream once the last sender is gone.

use std::future::Future;

use deskstat_core::StatusValue;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Outbound channel capacity.
pub const OUTBOUND_CAPACITY: usize = 32;

/// A producer's handle on the outbound channel.
#[derive(Clone)]
pub struct Emitter {
    tx: mpsc::Sender<StatusValue>,
    cancel: CancellationToken,
}

impl Emitter {
    /// Queue one value. Waits while the channel is full; returns false once
    /// shutdown has started or the receiver is gone, and the producer should
    /// stop.
    pub async fn emit(&self, value: StatusValue) -> bool {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => false,
            sent = self.tx.send(value) => sent.is_ok(),
        }
    }
}

pub struct FanIn {
    tx: mpsc::Sender<StatusValue>,
    cancel: CancellationToken,
    tracker: TaskTracker,
}

impl FanIn {
    pub fn new() -> (Self, mpsc::Receiver<StatusValue>) {
        Self::with_capacity(OUTBOUND_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, mpsc::Receiver<StatusValue>) {
        let (tx, rx) = mpsc::channel(capacity);
        let fanin = Self {
            tx,
            cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
        };
        (fanin, rx)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Start a producer task. It receives its emitter and the shutdown token
    /// and must return once the token is cancelled.
    pub fn spawn<F, Fut>(&self, name: &'static str, producer: F)
    where
        F: FnOnce(Emitter, CancellationToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let emitter = Emitter {
            tx: self.tx.clone(),
            cancel: self.cancel.clone(),
        };
        let task = producer(emitter, self.cancel.clone());
        self.tracker.spawn(async move {
            task.await;
            tracing::debug!(producer = name, "producer stopped");
        });
        tracing::debug!(producer = name, "producer started");
    }

    /// Cancel every producer and wait for all of them. The outbound channel
    /// closes when the last producer drops its emitter.
    pub async fn shutdown(self) {
        let Self {
            tx,
            cancel,
            tracker,
        } = self;
        cancel.cancel();
        drop(tx);
        tracker.close();
        tracker.wait().await;
        tracing::debug!("all producers stopped");
    }
}
