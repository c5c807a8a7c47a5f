//! checkpass - privilege-separated password checker
//!
//! Authenticates a user's password on behalf of an unprivileged caller,
//! either interactively on the controlling terminal or over the binary
//! conversation protocol on an inherited descriptor (`-S`).

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkpass::cli::Cli;
use checkpass::config::Config;
use checkpass::driver;

fn main() {
    // Diagnostics go to stderr; detached callers are expected to journal
    // it. Nothing is ever written to the conversation peer from here.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "checkpass=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli);
    std::process::exit(driver::run(&config));
}
