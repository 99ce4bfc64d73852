//! Activation job queue
//!
//! In-process queue between admission and the worker. Delivery is at least
//! once from the job's point of view (the worker retries on error); the
//! orchestrator's CAS transitions make re-delivery harmless.

use tokio::sync::mpsc;
use tracing::{debug, error};

use super::types::TransactionId;

/// Sending half handed to admission (and anything else that enqueues jobs)
#[derive(Clone)]
pub struct ActivationQueue {
    tx: mpsc::UnboundedSender<TransactionId>,
}

impl ActivationQueue {
    /// Create the queue; the receiver goes to the worker.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TransactionId>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Enqueue an activation job keyed by transaction id.
    ///
    /// No return value for the caller; a closed queue (worker gone during
    /// shutdown) is logged, and the stale sweep picks the job up later.
    pub fn enqueue(&self, transaction_id: TransactionId) {
        debug!(transaction_id = %transaction_id, "Enqueueing activation job");
        if self.tx.send(transaction_id).is_err() {
            error!(
                transaction_id = %transaction_id,
                "Activation queue closed, job will be recovered by the stale sweep"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_delivers_in_order() {
        let (queue, mut rx) = ActivationQueue::new();
        let a = TransactionId::new();
        let b = TransactionId::new();

        queue.enqueue(a);
        queue.enqueue(b);

        assert_eq!(rx.recv().await, Some(a));
        assert_eq!(rx.recv().await, Some(b));
    }

    #[tokio::test]
    async fn test_enqueue_after_receiver_drop_does_not_panic() {
        let (queue, rx) = ActivationQueue::new();
        drop(rx);
        queue.enqueue(TransactionId::new());
    }
}
