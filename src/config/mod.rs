// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] is the TOML-backed data model with defaults.
//! - [`loader`] reads an optional file and layers the `LXBOT_*` environment
//!   variables on top.
//! - [`validate`] checks the few invariants serde cannot.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load, load_from_path, load_with_env};
pub use model::{
    CommandSection, ConfigFile, LimitsSection, MAX_EXEC_DURATION_SEC, OutputSection,
    RuntimeSection,
};
pub use validate::validate_config;
