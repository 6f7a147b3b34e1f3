//! Strata CLI entry point.

use anyhow::Result;
use clap::Parser;
use strata_cli::cli;
use strata_cli::core::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    // A staged update from the previous run must land before anything else
    // touches the executable.
    #[cfg(feature = "self-update")]
    finish_staged_update();

    let cli = cli::Cli::parse();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            user_friendly_error(e).display();
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "self-update")]
fn finish_staged_update() {
    use strata_cli::upgrade::{CurrentExecutable, apply_staged_update};

    if let Err(e) = apply_staged_update(&CurrentExecutable) {
        eprintln!("warning: {e:#}");
    }
}
