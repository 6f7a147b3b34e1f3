//! Integration test suite for Strata
//!
//! End-to-end tests that drive the public API and the `strata` binary.
//! The releases API is served by `wiremock`; release assets come from an
//! in-memory downloader since the production one only accepts HTTPS.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **release_api**: Release lookup, rate limiting and API error mapping
//! - **upgrade**: Full self-update runs and the `strata upgrade` command

mod release_api;
mod upgrade;
