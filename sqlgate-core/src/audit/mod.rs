//! Non-blocking audit logging.
//!
//! Accepted requests enqueue one [`LogRecord`]; background workers drain
//! the bounded queue and append rows to the configured sink with capped
//! exponential backoff on transient failures. Nothing here ever applies
//! backpressure to the request path: audit completeness is best-effort,
//! response latency is not negotiable.

pub mod dispatcher;
pub mod record;
pub mod sink;

pub use dispatcher::{AuditCounters, AuditDispatcher, AuditHandle, RetryPolicy};
pub use record::LogRecord;
pub use sink::{LogSink, SheetsSink, SinkError, TracingSink};
