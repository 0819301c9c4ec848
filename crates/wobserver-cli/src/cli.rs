//! CLI argument parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line dashboard client for wobserver services
#[derive(Parser, Debug)]
#[command(
    name = "wobserver",
    version,
    about = "Query a wobserver service from the terminal",
    long_about = "Connects to a wobserver service over its WebSocket channel, falling back to\n\
                  HTTP polling when the socket is unavailable, and issues dashboard commands\n\
                  (system, memory, processes, ...) against the local or a proxied node."
)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Service host, optionally with a path prefix (e.g. localhost:4001/wobserver)
    #[arg(long, short = 'H', global = true, env = "WOBSERVER_HOST")]
    pub host: Option<String>,

    /// Connect with wss:// and https://
    #[arg(long, global = true)]
    pub secure: bool,

    /// Node to route commands to ("local" for the service's own node)
    #[arg(long, short = 'n', global = true, env = "WOBSERVER_NODE")]
    pub node: Option<String>,

    /// Configuration file (defaults to ./wobserver.toml or the user config dir)
    #[arg(long, short = 'c', global = true, env = "WOBSERVER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, value_enum, default_value = "pretty")]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Issue a command and print the response envelope
    Request {
        /// Command name, e.g. `system` or `table/#Port<0.7.0>`
        command: String,

        /// JSON payload
        #[arg(long, short = 'p')]
        payload: Option<String>,
    },

    /// Issue a command without waiting for a response
    Send {
        /// Command name
        command: String,

        /// JSON payload
        #[arg(long, short = 'p')]
        payload: Option<String>,
    },

    /// List the nodes the service can observe
    Nodes,

    /// Issue a command repeatedly, printing responses and connectivity events
    Watch {
        /// Command name
        command: String,

        /// JSON payload
        #[arg(long, short = 'p')]
        payload: Option<String>,

        /// Seconds between requests
        #[arg(long, short = 'i', default_value_t = 1)]
        interval: u64,

        /// Stop after this many responses
        #[arg(long)]
        count: Option<u64>,
    },
}

/// How envelopes and tables are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable with colors
    Pretty,
    /// One JSON document per line
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_request() {
        let cli = Cli::try_parse_from([
            "wobserver",
            "--host",
            "example.com:4001",
            "request",
            "table/#Port<0.7.0>",
            "--payload",
            r#"{"limit": 5}"#,
        ])
        .unwrap();

        assert_eq!(cli.host.as_deref(), Some("example.com:4001"));
        assert_eq!(cli.format, OutputFormat::Pretty);
        assert_eq!(
            cli.command,
            Commands::Request {
                command: "table/#Port<0.7.0>".to_string(),
                payload: Some(r#"{"limit": 5}"#.to_string()),
            }
        );
    }

    #[test]
    fn test_parse_watch_defaults() {
        let cli = Cli::try_parse_from(["wobserver", "watch", "memory", "-f", "json", "-vv"])
            .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
        assert_eq!(
            cli.command,
            Commands::Watch {
                command: "memory".to_string(),
                payload: None,
                interval: 1,
                count: None,
            }
        );
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["wobserver"]).is_err());
    }
}
