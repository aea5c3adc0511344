//! swarmctl — coordination fabric for a multi-agent software
//! engineering platform.
//!
//! Hexagonal layering, innermost first:
//! - [`domain`]: entities and pure business rules (issue triage,
//!   planning, scheduling scoring, merge/conflict decisions). No I/O.
//! - [`application`]: stateful orchestrators built from domain rules and
//!   ports — the coordinator gateway (C6), planner (C7), scheduler (C9),
//!   escalator (C10), review engine (C11), and PR workflow (C13).
//! - [`adapters`]: concrete forge (GitHub), LLM, and persistence
//!   (SQLite/JSON) implementations of the domain's ports.
//! - [`infrastructure`]: stateful engines that aren't domain-specific —
//!   the rate limiter (C1), shell sandbox (C4), retry policy (C3),
//!   config loading, and logging.
//! - [`cli`]: the `swarmctl` binary's command surface.

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
