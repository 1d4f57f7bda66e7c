//! Post-execution audit pipeline.
//!
//! Interceptors hand [`AuditEvent`]s to an [`AuditDispatcher`], which
//! forwards them to the configured [`AuditSink`] on a background thread
//! through a bounded channel. The hand-off never blocks the SQL caller:
//! a full buffer drops the event and counts the drop, and sink failures
//! are swallowed and counted.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
        mpsc::{SyncSender, TrySendError, sync_channel}
    },
    thread::JoinHandle
};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::{context::CommandKind, rules::ValidationResult};

/// Post-execution record for one SQL attempt.
///
/// Exact serialization is sink-defined; the event itself is `Serialize` so
/// JSON sinks can emit it directly.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub timestamp:         DateTime<Utc>,
    pub sql:               String,
    pub command_kind:      CommandKind,
    pub statement_id:      String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datasource:        Option<String>,
    pub execution_time_ms: u64,
    /// Rows affected, or -1 when unknown
    pub rows_affected:     i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message:     Option<String>,
    /// Whether the BLOCK strategy stopped the execution
    pub blocked:           bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_validation:    Option<ValidationResult>
}

/// Trait for audit event consumers.
pub trait AuditSink: Send + Sync {
    fn publish(&self, event: &AuditEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Sink that logs events through `tracing` at INFO.
#[derive(Debug, Default)]
pub struct LogAuditSink;

impl AuditSink for LogAuditSink {
    fn publish(&self, event: &AuditEvent) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(
            statement_id = %event.statement_id,
            kind = %event.command_kind,
            execution_time_ms = event.execution_time_ms,
            rows_affected = event.rows_affected,
            blocked = event.blocked,
            "sql audit"
        );
        Ok(())
    }
}

/// Fire-and-forget dispatcher in front of an [`AuditSink`].
///
/// Events flow through a bounded channel to a background thread. Dropped
/// events (full buffer or stopped worker) and sink failures are counted
/// but never surfaced to the SQL caller.
pub struct AuditDispatcher {
    tx:       Mutex<Option<SyncSender<AuditEvent>>>,
    worker:   Mutex<Option<JoinHandle<()>>>,
    dropped:  AtomicU64,
    failures: Arc<AtomicU64>
}

impl AuditDispatcher {
    /// Spawn the dispatcher with the given sink and buffer size.
    pub fn new(sink: Arc<dyn AuditSink>, buffer_size: usize) -> Self {
        let (tx, rx) = sync_channel::<AuditEvent>(buffer_size.max(1));
        let failures = Arc::new(AtomicU64::new(0));
        let worker_failures = failures.clone();
        let worker = std::thread::Builder::new()
            .name(String::from("sql-safety-audit"))
            .spawn(move || {
                for event in rx {
                    if let Err(err) = sink.publish(&event) {
                        worker_failures.fetch_add(1, Ordering::Relaxed);
                        tracing::debug!(error = %err, "audit sink failed; event discarded");
                    }
                }
            })
            .ok();
        if worker.is_none() {
            tracing::warn!("failed to spawn audit worker; audit events will be dropped");
        }
        Self {
            tx: Mutex::new(worker.as_ref().map(|_| tx)),
            worker: Mutex::new(worker),
            dropped: AtomicU64::new(0),
            failures
        }
    }

    /// Dispatcher that discards every event (audit disabled).
    pub fn disabled() -> Self {
        Self {
            tx:       Mutex::new(None),
            worker:   Mutex::new(None),
            dropped:  AtomicU64::new(0),
            failures: Arc::new(AtomicU64::new(0))
        }
    }

    /// Enqueue an event without blocking; drops on overflow.
    pub fn publish(&self, event: AuditEvent) {
        let guard = self.tx.lock();
        let Some(tx) = guard.as_ref() else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Number of events dropped due to a full buffer or stopped worker.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of events the sink failed to consume.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Close the channel and wait for the worker to drain (tests and
    /// orderly shutdown).
    pub fn shutdown(&self) {
        self.tx.lock().take();
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for AuditDispatcher {
    fn drop(&mut self) {
        self.tx.get_mut().take();
        if let Some(handle) = self.worker.get_mut().take() {
            let _ = handle.join();
        }
    }
}
