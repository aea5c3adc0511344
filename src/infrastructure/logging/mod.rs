//! Logging infrastructure: structured `tracing` output, bearer-token
//! scrubbing, and an append-only audit trail for operator-visible
//! mutations (comments, labels, merges).

pub mod audit;
pub mod logger;
pub mod secret_scrubbing;

pub use audit::{AuditEvent, AuditEventType, AuditLogger, AuditOutcome};
pub use secret_scrubbing::scrub;
