//! Bounded-queue audit dispatcher.
//!
//! `enqueue` never blocks: a full queue drops the record and counts the
//! drop. Workers drain in arrival order and keep retries as an explicit
//! scheduled state (attempt count + next-eligible time) in a local heap,
//! so pending retries cost no dedicated task and compose with one worker
//! or many. Retries of an earlier record may land after later records'
//! first attempts; there is no total order across retried items.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::record::LogRecord;
use super::sink::LogSink;
use crate::health::HealthReporter;

/// Backoff schedule for transient sink failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt after `attempt` (1-based) failed.
    ///
    /// Jitter is added before the cap so delays stay monotonically
    /// non-decreasing even once the cap is reached; config validation
    /// keeps jitter at or below the base delay for the same reason.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        let exp = self.base_delay.saturating_mul(1u32 << shift);
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
        };
        (exp + jitter).min(self.max_delay)
    }
}

/// Delivery counters. `active` covers Enqueued + Delivering + Retrying.
#[derive(Debug, Default)]
pub struct AuditCounters {
    active: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl AuditCounters {
    pub fn active(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Cheap clone handed to the request path: enqueue plus counter reads.
#[derive(Clone)]
pub struct AuditHandle {
    tx: Sender<LogRecord>,
    counters: Arc<AuditCounters>,
}

impl AuditHandle {
    /// Non-blocking enqueue. A full or closed queue drops the record.
    pub fn enqueue(&self, record: LogRecord) {
        self.counters.active.fetch_add(1, Ordering::Relaxed);
        if let Err(err) = self.tx.try_send(record) {
            self.counters.active.fetch_sub(1, Ordering::Relaxed);
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            match err {
                TrySendError::Full(_) => {
                    tracing::warn!("audit queue full; record dropped");
                }
                TrySendError::Closed(_) => {
                    tracing::error!("audit queue closed; record dropped");
                }
            }
        }
    }

    pub fn counters(&self) -> &AuditCounters {
        &self.counters
    }

    pub fn reporter(&self) -> HealthReporter {
        HealthReporter::new(self.counters.clone())
    }
}

/// Owns the worker tasks; the request path only ever sees [`AuditHandle`]s.
pub struct AuditDispatcher {
    handle: AuditHandle,
    workers: Vec<JoinHandle<()>>,
}

impl AuditDispatcher {
    /// Spawn `worker_count` drain tasks over a queue of `queue_depth`.
    pub fn spawn(
        sink: Arc<dyn LogSink>,
        queue_depth: usize,
        worker_count: usize,
        retry: RetryPolicy,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth);
        let counters = Arc::new(AuditCounters::default());
        let queue = Arc::new(Mutex::new(rx));

        let workers = (0..worker_count.max(1))
            .map(|_| {
                let worker = Worker {
                    queue: queue.clone(),
                    sink: sink.clone(),
                    retry: retry.clone(),
                    counters: counters.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        Self {
            handle: AuditHandle { tx, counters },
            workers,
        }
    }

    pub fn handle(&self) -> AuditHandle {
        self.handle.clone()
    }

    /// Close the queue and give pending records a bounded drain window.
    pub async fn shutdown(self, drain: Duration) {
        let Self { handle, workers } = self;
        // Workers exit once the channel closes and their retry heaps empty
        drop(handle);

        let join_all = async {
            for worker in workers {
                let _ = worker.await;
            }
        };
        if tokio::time::timeout(drain, join_all).await.is_err() {
            tracing::warn!("audit drain window elapsed with records still pending");
        }
    }
}

/// A retry waiting for its next-eligible time.
struct PendingRetry {
    eligible_at: Instant,
    attempt: u32,
    record: LogRecord,
}

// Min-heap on eligible_at
impl PartialEq for PendingRetry {
    fn eq(&self, other: &Self) -> bool {
        self.eligible_at == other.eligible_at
    }
}

impl Eq for PendingRetry {}

impl PartialOrd for PendingRetry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingRetry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other.eligible_at.cmp(&self.eligible_at)
    }
}

struct Worker {
    queue: Arc<Mutex<Receiver<LogRecord>>>,
    sink: Arc<dyn LogSink>,
    retry: RetryPolicy,
    counters: Arc<AuditCounters>,
}

impl Worker {
    async fn run(self) {
        let mut retries: BinaryHeap<PendingRetry> = BinaryHeap::new();

        loop {
            match retries.peek().map(|p| p.eligible_at) {
                Some(deadline) => {
                    tokio::select! {
                        maybe = Self::next_record(&self.queue) => match maybe {
                            Some(record) => self.attempt(record, 1, &mut retries).await,
                            None => break,
                        },
                        _ = tokio::time::sleep_until(deadline) => {
                            self.run_due_retries(&mut retries).await;
                        }
                    }
                }
                None => match Self::next_record(&self.queue).await {
                    Some(record) => self.attempt(record, 1, &mut retries).await,
                    None => break,
                },
            }
        }

        // Queue closed: pending retries still get their scheduled attempts
        while let Some(pending) = retries.pop() {
            tokio::time::sleep_until(pending.eligible_at).await;
            self.attempt(pending.record, pending.attempt, &mut retries)
                .await;
        }
    }

    // recv() is cancel-safe, so losing the select race drops no record
    async fn next_record(queue: &Mutex<Receiver<LogRecord>>) -> Option<LogRecord> {
        queue.lock().await.recv().await
    }

    async fn run_due_retries(&self, retries: &mut BinaryHeap<PendingRetry>) {
        loop {
            let due = matches!(retries.peek(), Some(p) if p.eligible_at <= Instant::now());
            if !due {
                return;
            }
            if let Some(pending) = retries.pop() {
                self.attempt(pending.record, pending.attempt, retries).await;
            }
        }
    }

    /// One delivery attempt; reschedules or finalizes the record.
    async fn attempt(
        &self,
        record: LogRecord,
        attempt: u32,
        retries: &mut BinaryHeap<PendingRetry>,
    ) {
        match self.sink.append(&record).await {
            Ok(()) => {
                self.counters.active.fetch_sub(1, Ordering::Relaxed);
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
            }
            Err(err) if err.is_transient() && attempt < self.retry.max_attempts => {
                let delay = self.retry.backoff(attempt);
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "audit delivery failed; retry scheduled"
                );
                retries.push(PendingRetry {
                    eligible_at: Instant::now() + delay,
                    attempt: attempt + 1,
                    record,
                });
            }
            Err(err) => {
                self.counters.active.fetch_sub(1, Ordering::Relaxed);
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::error!(attempt, error = %err, "audit record dropped");
            }
        }
    }
}
