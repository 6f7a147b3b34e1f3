//! Core types for Strata
//!
//! Currently this is the error layer shared by every command:
//! - [`StrataError`] - enumerated failure modes
//! - [`ErrorContext`] - user-friendly wrapper with details and suggestions
//! - [`user_friendly_error`] - convert any [`anyhow::Error`] for CLI display

pub mod error;

pub use error::{ErrorContext, StrataError, create_error_context, user_friendly_error};
