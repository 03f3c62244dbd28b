// Dead-Letter Queue replay worker (C6). A single background task polls
// the row-store-backed queue and replays entries with exponential
// backoff, grounded in durable::worker::poller::TaskPoller's
// shutdown-aware sleep/backoff loop (tokio::select! racing the interval
// sleep against a watch::Receiver<bool>).

use std::sync::Arc;

use chrono::Utc;
use gateway_core::RetryPolicy;
use gateway_storage::Database;
use tokio::sync::watch;
use tokio::time::sleep;

pub struct DlqReplayWorker {
    db: Database,
    policy: RetryPolicy,
    batch_size: i64,
    shutdown_rx: watch::Receiver<bool>,
}

/// Replays one DLQ entry back into its origin table. Each payload_kind
/// owns its own replay logic; unknown kinds are left for operator
/// inspection rather than dropped.
#[async_trait::async_trait]
pub trait DlqReplayer: Send + Sync {
    async fn replay(&self, payload_kind: &str, payload: &serde_json::Value) -> anyhow::Result<()>;
}

impl DlqReplayWorker {
    pub fn new(
        db: Database,
        policy: RetryPolicy,
        batch_size: i64,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            db,
            policy,
            batch_size,
            shutdown_rx,
        }
    }

    pub async fn run(mut self, replayer: Arc<dyn DlqReplayer>) {
        loop {
            if *self.shutdown_rx.borrow() {
                tracing::info!("dlq replay worker stopping, shutdown signalled");
                return;
            }

            if let Err(e) = self.replay_once(replayer.as_ref()).await {
                tracing::error!(error = %e, "dlq replay pass failed");
            }

            let idle = self.policy.initial_interval;
            tokio::select! {
                _ = sleep(idle) => {}
                changed = self.shutdown_rx.changed() => {
                    if changed.is_ok() && *self.shutdown_rx.borrow() {
                        tracing::info!("dlq replay worker stopping mid-wait, shutdown signalled");
                        return;
                    }
                }
            }
        }
    }

    async fn replay_once(&self, replayer: &dyn DlqReplayer) -> anyhow::Result<()> {
        let entries = self.db.list_unsurfaced_dlq_entries(self.batch_size).await?;

        for entry in entries {
            match replayer.replay(&entry.payload_kind, &entry.payload).await {
                Ok(()) => {
                    self.db.record_dlq_replay_success(entry.id).await?;
                    metrics::counter!("dlq_replay_success_total").increment(1);
                }
                Err(e) => {
                    let attempt_count = entry.attempt_count + 1;
                    let surfaced = !self.policy.has_attempts_remaining(attempt_count as u32);
                    tracing::warn!(
                        error = %e,
                        dlq_id = %entry.id,
                        attempt_count,
                        surfaced,
                        "dlq replay attempt failed"
                    );
                    self.db
                        .record_dlq_replay_failure(entry.id, attempt_count, surfaced, Utc::now())
                        .await?;
                    metrics::counter!("dlq_replay_failure_total").increment(1);
                    if surfaced {
                        metrics::counter!("dlq_surfaced_total").increment(1);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_surfaces_after_ten_failed_attempts() {
        let policy = RetryPolicy::dlq_default();
        assert!(policy.has_attempts_remaining(9));
        assert!(!policy.has_attempts_remaining(10));
    }
}
