//! Engine Configuration Module
//!
//! All tunable thresholds, cooldown intervals, and cadences load from a
//! TOML file, with built-in defaults when no file is present.
//!
//! ## Loading Order
//!
//! 1. `FOREMAN_CONFIG` environment variable (path to TOML file)
//! 2. `foreman.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded `EngineConfig` is a field of the engine context, passed by
//! reference into every evaluation function; there is no global config.

mod engine_config;
pub mod defaults;

pub use engine_config::*;
