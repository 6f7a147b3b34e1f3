//! Configuration management for Strata
//!
//! Strata keeps a single user-wide TOML file; see [`global`] for its location
//! and schema. Commands receive a loaded [`GlobalConfig`] instead of reading the
//! file themselves so tests can inject configuration directly.

pub mod global;

pub use global::GlobalConfig;
