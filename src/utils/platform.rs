//! Platform-specific utilities and cross-platform compatibility helpers
//!
//! Release assets are named with Go-style platform tokens (`linux`, `darwin`,
//! `windows`; `amd64`, `arm64`, `386`). This module translates Rust's
//! [`std::env::consts`] values into those tokens and wraps the few other
//! platform differences the updater cares about.
//!
//! # Examples
//!
//! ```rust,no_run
//! use strata_cli::utils::platform::{target_arch, target_os, binary_file_name};
//!
//! println!("Looking for a {}/{} build of {}", target_os(), target_arch(), binary_file_name("strata"));
//! ```

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Release-asset token for the host operating system.
///
/// | Rust `OS` | token     |
/// |-----------|-----------|
/// | `linux`   | `linux`   |
/// | `macos`   | `darwin`  |
/// | `windows` | `windows` |
///
/// Any other OS is returned unchanged.
#[must_use]
pub fn target_os() -> &'static str {
    os_token(std::env::consts::OS)
}

/// Release-asset token for the host CPU architecture.
///
/// | Rust `ARCH` | token   |
/// |-------------|---------|
/// | `x86_64`    | `amd64` |
/// | `aarch64`   | `arm64` |
/// | `x86`       | `386`   |
///
/// Any other architecture is returned unchanged.
#[must_use]
pub fn target_arch() -> &'static str {
    arch_token(std::env::consts::ARCH)
}

fn os_token(os: &'static str) -> &'static str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn arch_token(arch: &'static str) -> &'static str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

/// File name of an executable on the host platform (`name.exe` on Windows).
#[must_use]
pub fn binary_file_name(name: &str) -> String {
    if is_windows() {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Checks if a command is available on `PATH`.
#[must_use]
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}
