//! Configuration loading: YAML + environment overrides via `figment`.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
