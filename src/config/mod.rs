//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/sitepulse/config.toml)
//! 3. Project config (.sitepulse/config.toml)
//! 4. Environment variables (SITEPULSE_*)
//!
//! Loaded once at startup; read-only for the rest of the run.

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
