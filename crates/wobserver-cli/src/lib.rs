//! # Wobserver CLI
//!
//! Terminal client for wobserver services. Every invocation opens a
//! [`Session`](wobserver_client::Session), so it goes through the same
//! WebSocket-first, polling-fallback selection as the dashboard.
//!
//! ## Usage
//!
//! ```bash
//! # Print one response
//! wobserver --host localhost:4001 request system
//!
//! # List nodes, then query a remote one
//! wobserver nodes
//! wobserver --node worker@10.0.0.2 request memory
//!
//! # Refresh every two seconds, as JSON lines
//! wobserver -f json watch processes --interval 2
//! ```
//!
//! Settings are read from `wobserver.toml` (or `--config`), overridden by
//! `WOBSERVER_*` environment variables and then by flags.

#![warn(missing_docs, rust_2018_idioms, clippy::all)]
#![deny(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod settings;

use std::process::ExitCode;

use clap::Parser;
use owo_colors::OwoColorize as _;
use tracing::info;

pub use cli::{Cli, Commands, OutputFormat};
pub use commands::CommandExecutor;
pub use error::{CliError, CliResult};
pub use output::Formatter;
pub use settings::Settings;

/// Parse arguments, run the subcommand and report errors
pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    let formatter = Formatter::new(cli.format, !cli.no_color);

    match execute(cli, formatter).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            formatter.display_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: Cli, formatter: Formatter) -> CliResult<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_cli(&cli);

    let _guard = match settings.logging.init(cli.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{}: logging disabled: {}", "Warning".yellow(), e);
            None
        }
    };

    let session = settings.session_builder().build();
    let transport = session.connect().await?;
    info!("Connected to {} over {}", settings.host, transport);
    formatter.print_status(&output::connection_status(&settings.host, transport));

    let result = CommandExecutor::new(formatter)
        .execute(&session, cli.command)
        .await;

    session.close().await?;
    result
}
