//! Infrastructure layer: stateful engines (rate limiter, retry, sandbox),
//! configuration loading, and logging. Depends on the domain layer;
//! depended on by adapters and application.

pub mod config;
pub mod logging;
pub mod rate_limiter;
pub mod retry;
pub mod sandbox;
