//! Retry and backoff behavior of the audit dispatcher, driven on paused
//! time so delays are asserted deterministically.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use sqlgate_core::audit::{AuditDispatcher, LogRecord, LogSink, RetryPolicy, SinkError};

/// Fails its first `failures` attempts, then succeeds; records the
/// virtual time of every attempt.
struct FlakySink {
    failures: u32,
    permanent: bool,
    attempts: AtomicU32,
    attempt_times: Mutex<Vec<Instant>>,
}

impl FlakySink {
    fn transient(failures: u32) -> Self {
        Self {
            failures,
            permanent: false,
            attempts: AtomicU32::new(0),
            attempt_times: Mutex::new(Vec::new()),
        }
    }

    fn permanent() -> Self {
        Self {
            failures: u32::MAX,
            permanent: true,
            attempts: AtomicU32::new(0),
            attempt_times: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LogSink for FlakySink {
    async fn append(&self, _record: &LogRecord) -> Result<(), SinkError> {
        self.attempt_times.lock().await.push(Instant::now());
        let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if n > self.failures {
            Ok(())
        } else if self.permanent {
            Err(SinkError::Permanent("bad credentials".into()))
        } else {
            Err(SinkError::Transient("rate limited".into()))
        }
    }
}

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_millis(400),
        jitter: Duration::ZERO,
    }
}

fn record() -> LogRecord {
    LogRecord::new("u1", "get_user_by_id", "SELECT 1", vec![])
}

#[tokio::test(start_paused = true)]
async fn fails_n_minus_1_then_delivers_exactly_once() {
    let sink = Arc::new(FlakySink::transient(3));
    let dispatcher = AuditDispatcher::spawn(sink.clone(), 8, 1, policy(5));
    let handle = dispatcher.handle();

    handle.enqueue(record());
    let reporter = handle.reporter();
    drop(handle);
    dispatcher.shutdown(Duration::from_secs(60)).await;

    let status = reporter.status();
    assert_eq!(status.delivered, 1);
    assert_eq!(status.dropped, 0);
    assert_eq!(status.active_logs, 0);
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 4);

    // Backoff gaps: 100ms, 200ms, 400ms, monotonically non-decreasing
    let times = sink.attempt_times.lock().await;
    let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
    assert_eq!(gaps, vec![
        Duration::from_millis(100),
        Duration::from_millis(200),
        Duration::from_millis(400),
    ]);
}

#[tokio::test(start_paused = true)]
async fn backoff_delay_is_capped() {
    let sink = Arc::new(FlakySink::transient(4));
    let dispatcher = AuditDispatcher::spawn(sink.clone(), 8, 1, policy(6));
    let handle = dispatcher.handle();

    handle.enqueue(record());
    drop(handle);
    dispatcher.shutdown(Duration::from_secs(60)).await;

    let times = sink.attempt_times.lock().await;
    let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
    // Fourth gap would be 800ms uncapped; the cap holds it at 400ms
    assert_eq!(gaps.last(), Some(&Duration::from_millis(400)));
    for pair in gaps.windows(2) {
        assert!(pair[1] >= pair[0]);
    }
}

#[tokio::test(start_paused = true)]
async fn retry_budget_exhaustion_drops_the_record() {
    let sink = Arc::new(FlakySink::transient(u32::MAX));
    let dispatcher = AuditDispatcher::spawn(sink.clone(), 8, 1, policy(3));
    let handle = dispatcher.handle();

    handle.enqueue(record());
    let reporter = handle.reporter();
    drop(handle);
    dispatcher.shutdown(Duration::from_secs(60)).await;

    let status = reporter.status();
    assert_eq!(status.delivered, 0);
    assert_eq!(status.dropped, 1);
    assert_eq!(status.active_logs, 0);
    // Exactly the budget, no more
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_is_never_retried() {
    let sink = Arc::new(FlakySink::permanent());
    let dispatcher = AuditDispatcher::spawn(sink.clone(), 8, 1, policy(5));
    let handle = dispatcher.handle();

    handle.enqueue(record());
    let reporter = handle.reporter();
    drop(handle);
    dispatcher.shutdown(Duration::from_secs(60)).await;

    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
    assert_eq!(reporter.status().dropped, 1);
}

#[tokio::test(start_paused = true)]
async fn later_records_are_not_held_behind_a_retrying_one() {
    // One worker: the first record's retries must not stall the second
    // record's first attempt.
    struct FirstFails {
        attempts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LogSink for FirstFails {
        async fn append(&self, record: &LogRecord) -> Result<(), SinkError> {
            let mut attempts = self.attempts.lock().await;
            attempts.push(record.query_code.clone());
            if record.query_code == "first" && attempts.iter().filter(|c| *c == "first").count() == 1
            {
                return Err(SinkError::Transient("rate limited".into()));
            }
            Ok(())
        }
    }

    let sink = Arc::new(FirstFails {
        attempts: Mutex::new(Vec::new()),
    });
    let dispatcher = AuditDispatcher::spawn(sink.clone(), 8, 1, policy(5));
    let handle = dispatcher.handle();

    handle.enqueue(LogRecord::new("u1", "first", "SELECT 1", vec![]));
    handle.enqueue(LogRecord::new("u2", "second", "SELECT 1", vec![]));
    let reporter = handle.reporter();
    drop(handle);
    dispatcher.shutdown(Duration::from_secs(60)).await;

    assert_eq!(reporter.status().delivered, 2);
    // "second"'s first attempt lands before "first"'s retry
    let attempts = sink.attempts.lock().await;
    assert_eq!(*attempts, vec!["first", "second", "first"]);
}
