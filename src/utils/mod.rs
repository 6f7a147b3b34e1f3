//! Cross-platform utilities and helpers
//!
//! # Modules
//!
//! - [`platform`] - Host OS/architecture tokens and platform helpers
//! - [`progress`] - Progress bars and the byte-counting [`ProgressWriter`]

pub mod platform;
pub mod progress;

pub use platform::{binary_file_name, is_windows, target_arch, target_os};
pub use progress::{ProgressBar, ProgressWriter};
