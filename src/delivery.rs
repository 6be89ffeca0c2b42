//! Delivery Module
//!
//! Where callback-style results are executed.
//!
//! Sinks must run jobs in the order they were submitted; fan-out relies on
//! that to run its final callback after every per-URL callback.

use std::fmt;

use tokio::sync::mpsc;
use tracing::debug;

/// A unit of result-handling work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

// == Delivery Sink ==
/// Executes result callbacks on whatever context the host considers safe.
pub trait DeliverySink: Send + Sync + 'static {
    fn deliver(&self, job: Job);
}

// == Inline Delivery ==
/// Runs each job immediately on the task that produced the result.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDelivery;

impl DeliverySink for InlineDelivery {
    fn deliver(&self, job: Job) {
        job();
    }
}

// == Channel Delivery ==
/// Queues jobs for a host-owned [`DeliveryQueue`], like a main-thread run loop.
#[derive(Debug, Clone)]
pub struct ChannelDelivery {
    tx: mpsc::UnboundedSender<Job>,
}

impl ChannelDelivery {
    /// Creates the sink and the queue the host drains.
    pub fn new() -> (Self, DeliveryQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, DeliveryQueue { rx })
    }
}

impl DeliverySink for ChannelDelivery {
    fn deliver(&self, job: Job) {
        if self.tx.send(job).is_err() {
            debug!("delivery queue closed, dropping result");
        }
    }
}

/// Receiving end of a [`ChannelDelivery`].
pub struct DeliveryQueue {
    rx: mpsc::UnboundedReceiver<Job>,
}

impl DeliveryQueue {
    /// Waits for the next job and runs it. Returns false once every sink is gone.
    pub async fn run_next(&mut self) -> bool {
        match self.rx.recv().await {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Runs every job already queued without waiting. Returns how many ran.
    pub fn drain(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Runs jobs until every sink has been dropped.
    pub async fn run(mut self) {
        while self.run_next().await {}
    }
}

impl fmt::Debug for DeliveryQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryQueue").finish_non_exhaustive()
    }
}
