//! Progress indicators for long-running transfers
//!
//! This module wraps `indicatif` with Strata styling. The main entry point is
//! [`ProgressWriter`], an [`io::Write`] decorator that counts bytes flowing into
//! any writer and reflects them on a progress bar, so download code only has to
//! copy bytes.
//!
//! # Environment Variables
//!
//! - `STRATA_NO_PROGRESS`: set to any value to disable all progress indicators
//!
//! Bars also stay invisible when stderr is not a terminal (pipes, CI logs).
//!
//! # Examples
//!
//! ```rust,no_run
//! use strata_cli::utils::progress::{ProgressBar, ProgressWriter};
//! use std::io::Write;
//!
//! # fn example() -> std::io::Result<()> {
//! let bar = ProgressBar::download(Some(1024), "strata-linux-amd64.tar.gz");
//! let mut writer = ProgressWriter::new(Vec::new(), bar.clone());
//! writer.write_all(&[0u8; 1024])?;
//! bar.finish_and_clear();
//! # Ok(())
//! # }
//! ```

use indicatif::{ProgressBar as IndicatifBar, ProgressDrawTarget, ProgressStyle as IndicatifStyle};
use std::io::{self, Write};

use crate::constants::{NO_PROGRESS_ENV, PROGRESS_REFRESH_HZ};

/// Checks if progress bars should be disabled.
///
/// Progress bars are disabled when the `STRATA_NO_PROGRESS` environment
/// variable is set to any value.
fn is_progress_disabled() -> bool {
    std::env::var_os(NO_PROGRESS_ENV).is_some()
}

/// A progress bar with Strata styling.
///
/// Cloning is cheap and yields a handle to the same bar.
#[derive(Clone)]
pub struct ProgressBar {
    inner: IndicatifBar,
}

impl ProgressBar {
    /// Creates a transfer bar.
    ///
    /// With a known `total` the bar shows a percentage; without one it shows
    /// the bytes transferred so far. Redraws are capped at
    /// [`PROGRESS_REFRESH_HZ`] per second.
    pub fn download(total: Option<u64>, label: impl Into<String>) -> Self {
        let target = if is_progress_disabled() {
            ProgressDrawTarget::hidden()
        } else {
            ProgressDrawTarget::stderr_with_hz(PROGRESS_REFRESH_HZ)
        };

        let bar = IndicatifBar::with_draw_target(total, target);
        bar.set_style(match total {
            Some(_) => ProgressStyle::download(),
            None => ProgressStyle::download_unknown_length(),
        });
        bar.set_prefix(label.into());
        Self { inner: bar }
    }

    /// A bar that never draws. Used by tests and non-interactive callers.
    pub fn hidden() -> Self {
        Self {
            inner: IndicatifBar::hidden(),
        }
    }

    /// Advances the bar by `delta` bytes.
    pub fn inc(&self, delta: u64) {
        self.inner.inc(delta);
    }

    /// Bytes recorded so far.
    pub fn position(&self) -> u64 {
        self.inner.position()
    }

    /// Finishes the bar and removes it from the terminal.
    pub fn finish_and_clear(&self) {
        self.inner.finish_and_clear();
    }
}

/// Styles used by Strata progress indicators.
pub struct ProgressStyle;

impl ProgressStyle {
    /// Transfer with a known size.
    ///
    /// ```text
    /// strata-linux-amd64.tar.gz [━━━━━━━━━━━━━━━╸━━━━━━━━━━━━━━━━━━━━━━━━] 38% 2.1 MiB/5.5 MiB
    /// ```
    pub fn download() -> IndicatifStyle {
        IndicatifStyle::default_bar()
            .template(
                "{prefix:.bold.cyan} [{bar:40.cyan/blue}] {percent:>3}% {binary_bytes}/{binary_total_bytes}",
            )
            .unwrap_or_else(|_| IndicatifStyle::default_bar())
            .progress_chars("━╸━")
    }

    /// Transfer without a `Content-Length`.
    ///
    /// ```text
    /// checksums.txt ⠹ 1.2 KiB
    /// ```
    pub fn download_unknown_length() -> IndicatifStyle {
        IndicatifStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.cyan} {binary_bytes}")
            .unwrap_or_else(|_| IndicatifStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
    }
}

/// [`Write`] decorator that reports every byte written to a [`ProgressBar`].
pub struct ProgressWriter<W> {
    inner: W,
    bar: ProgressBar,
}

impl<W: Write> ProgressWriter<W> {
    /// Wraps `inner`, reporting to `bar`.
    pub fn new(inner: W, bar: ProgressBar) -> Self {
        Self { inner, bar }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.bar.inc(written as u64);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_writer_counts_bytes() {
        let bar = ProgressBar::hidden();
        let mut writer = ProgressWriter::new(Vec::new(), bar.clone());

        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();
        writer.flush().unwrap();

        assert_eq!(bar.position(), 11);
        assert_eq!(writer.into_inner(), b"hello world");
    }

    #[test]
    fn test_download_bar_without_length() {
        let bar = ProgressBar::download(None, "checksums.txt");
        bar.inc(42);
        assert_eq!(bar.position(), 42);
        bar.finish_and_clear();
    }
}
