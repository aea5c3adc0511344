//! Filesystem adapters: the one-file-per-plan JSON store.

pub mod plan_store;

pub use plan_store::JsonPlanStore;
