use common::error::{AppError, Res};
use log::{error, info, warn};
use tokio::{
    sync::mpsc::{self, error::TrySendError},
    task::JoinHandle,
};

use super::reconcile::Reconciler;

/// A reconcile requested by a verified webhook event.
#[derive(Debug, Clone)]
pub struct ReconcileJob {
    pub event_id: String,
    pub event_type: String,
    pub customer_id: String,
}

/// Hands webhook-triggered reconciles to a background worker so the webhook
/// can be acknowledged before Stripe's delivery timeout.
///
/// Jobs are processed one at a time in arrival order. Every outcome is logged.
/// The webhook has already been acknowledged when a job runs, so Stripe does
/// not redeliver a failed one; the customer's state is corrected by the next
/// event or on-demand sync for that customer, since both re-fetch it. A retry
/// or dead-letter path belongs in `run_worker` and leaves the webhook contract
/// unchanged.
#[derive(Clone)]
pub struct WebhookQueue {
    sender: mpsc::Sender<ReconcileJob>,
}

impl WebhookQueue {
    /// Spawns the worker on the current tokio runtime.
    pub fn start(reconciler: Reconciler, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_worker(reconciler, receiver));
        (WebhookQueue { sender }, handle)
    }

    /// Enqueues without waiting. A full queue is reported as retryable.
    pub fn submit(&self, job: ReconcileJob) -> Res<()> {
        self.sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) => {
                warn!(
                    "Webhook queue full, rejecting event {} for customer {}",
                    job.event_id, job.customer_id
                );
                AppError::ServiceUnavailable("Webhook queue is full".to_string())
            }
            TrySendError::Closed(job) => AppError::Internal(format!(
                "Webhook worker stopped, event {} not processed",
                job.event_id
            )),
        })
    }
}

async fn run_worker(reconciler: Reconciler, mut receiver: mpsc::Receiver<ReconcileJob>) {
    while let Some(job) = receiver.recv().await {
        match reconciler.reconcile(&job.customer_id, None).await {
            Ok(outcome) => info!(
                "Webhook {} ({}) reconciled customer {} to tier {}",
                job.event_id, job.event_type, job.customer_id, outcome.tier
            ),
            Err(e) => error!(
                "Webhook {} ({}) failed to reconcile customer {}: {}",
                job.event_id, job.event_type, job.customer_id, e
            ),
        }
    }
    warn!("Webhook queue closed, worker exiting");
}
