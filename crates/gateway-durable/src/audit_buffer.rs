// Audit Event Buffer (C7): a bounded, non-blocking intake queue in front
// of the Internal Audit Writer (C8). Submission never blocks the calling
// request path; a full buffer spills straight to the dead-letter queue.
// The request-path half is a bounded mpsc channel (the closest stdlib/tokio
// analogue to the "bounded ring buffer" contract); the drain-in-batches
// worker loop is grounded in durable::worker::poller's shutdown-aware
// select! pattern.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gateway_core::domain::AuditEvent;
use gateway_core::traits::{AuditSink, SubmitOutcome};
use gateway_storage::models::CreateDlqEntryRow;
use gateway_storage::Database;
use tokio::sync::mpsc;
use tokio::time::Instant;
use uuid::Uuid;

use crate::internal_writer::InternalAuditWriter;

#[derive(Debug, Clone)]
pub struct AuditBufferConfig {
    pub capacity: usize,
    pub batch_size: usize,
    pub batch_interval: Duration,
}

impl Default for AuditBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 10_000,
            batch_size: 100,
            batch_interval: Duration::from_millis(250),
        }
    }
}

pub struct AuditEventBuffer {
    tx: mpsc::Sender<AuditEvent>,
    accepting: Arc<AtomicBool>,
    db: Database,
}

impl AuditEventBuffer {
    /// Returns the buffer handle (cloneable, used by request handlers) and
    /// the worker future that must be spawned once onto a background task.
    pub fn new(
        db: Database,
        writer: InternalAuditWriter,
        config: AuditBufferConfig,
    ) -> (Self, impl std::future::Future<Output = ()>) {
        let (tx, rx) = mpsc::channel(config.capacity);
        let accepting = Arc::new(AtomicBool::new(true));

        let worker = drain_loop(rx, writer, db.clone(), config, accepting.clone());

        (
            Self {
                tx,
                accepting,
                db,
            },
            worker,
        )
    }

    /// Instructs the buffer to stop accepting new submissions; used by the
    /// shutdown coordinator when entering FLUSHING.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl AuditSink for AuditEventBuffer {
    async fn submit(&self, event: AuditEvent) -> SubmitOutcome {
        if !self.accepting.load(Ordering::SeqCst) {
            spill_to_dlq(&self.db, &event).await;
            return SubmitOutcome::Full;
        }

        match self.tx.try_send(event) {
            Ok(()) => SubmitOutcome::Ok,
            Err(mpsc::error::TrySendError::Full(event)) => {
                metrics::counter!("audit_buffer_dropped_total").increment(1);
                spill_to_dlq(&self.db, &event).await;
                SubmitOutcome::Full
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                spill_to_dlq(&self.db, &event).await;
                SubmitOutcome::Full
            }
        }
    }
}

async fn spill_to_dlq(db: &Database, event: &AuditEvent) {
    let payload = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
    if let Err(e) = db
        .enqueue_dlq(CreateDlqEntryRow {
            id: Uuid::now_v7(),
            payload_kind: "audit_event".to_string(),
            payload,
        })
        .await
    {
        tracing::error!(error = %e, event_id = %event.event_id, "failed to spill audit event to dlq");
    } else {
        metrics::counter!("dlq_enqueued_total").increment(1);
    }
}

async fn drain_loop(
    mut rx: mpsc::Receiver<AuditEvent>,
    writer: InternalAuditWriter,
    db: Database,
    config: AuditBufferConfig,
    accepting: Arc<AtomicBool>,
) {
    let mut batch = Vec::with_capacity(config.batch_size);

    loop {
        batch.clear();
        let deadline = Instant::now() + config.batch_interval;

        while batch.len() < config.batch_size {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            tokio::select! {
                maybe_event = rx.recv() => {
                    match maybe_event {
                        Some(event) => batch.push(event),
                        None => break,
                    }
                }
                _ = tokio::time::sleep(remaining) => break,
            }
        }

        if !batch.is_empty() {
            flush_batch(&writer, &db, &batch).await;
        }

        if rx.is_closed() && rx.is_empty() {
            if !accepting.load(Ordering::SeqCst) {
                tracing::info!("audit buffer drained, worker stopping");
            }
            return;
        }
    }
}

async fn flush_batch(writer: &InternalAuditWriter, db: &Database, batch: &[AuditEvent]) {
    for event in batch {
        if let Err(e) = writer.write(event).await {
            tracing::warn!(error = %e, event_id = %event.event_id, "internal audit write failed, spilling to dlq");
            spill_to_dlq(db, event).await;
        }
    }
}
