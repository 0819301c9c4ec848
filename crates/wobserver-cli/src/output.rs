//! Output formatting
//!
//! Results go to stdout, status lines and errors to stderr, so `--format
//! json` output can be piped.

use chrono::{DateTime, Local};
use comfy_table::{Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;
use wobserver_client::{Envelope, NodeAddress, NodeInfo, SessionEvent, TransportType};

use crate::cli::OutputFormat;
use crate::error::{CliError, CliResult};

/// Formats results according to the selected output format
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    format: OutputFormat,
    colored: bool,
}

impl Formatter {
    /// Create a formatter; `colored` enables ANSI styling
    #[must_use]
    pub fn new(format: OutputFormat, colored: bool) -> Self {
        Self { format, colored }
    }

    /// Print one response envelope
    pub fn display_envelope(&self, envelope: &Envelope) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => self.display_json(envelope),
            OutputFormat::Pretty => {
                let header = format!("{} @ {}", envelope.kind, format_timestamp(envelope.timestamp));
                if self.colored {
                    println!("{}", header.bright_cyan().bold());
                } else {
                    println!("{header}");
                }
                println!("{}", serde_json::to_string_pretty(&envelope.data)?);
                Ok(())
            }
        }
    }

    /// Print the node list, marking the active node
    pub fn display_nodes(&self, nodes: &[NodeInfo], active: &NodeAddress) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => {
                let rows: Vec<_> = nodes
                    .iter()
                    .map(|node| {
                        json!({
                            "name": node.name,
                            "host": node.host,
                            "port": node.port,
                            "local?": node.local,
                            "active": node.is_active(active),
                        })
                    })
                    .collect();
                self.display_json(&rows)
            }
            OutputFormat::Pretty => {
                if nodes.is_empty() {
                    self.print_info("No nodes reported");
                    return Ok(());
                }

                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .apply_modifier(UTF8_ROUND_CORNERS)
                    .set_header(vec!["", "Name", "Address", "Local"]);
                for row in node_rows(nodes, active) {
                    table.add_row(row);
                }

                println!("{table}");
                Ok(())
            }
        }
    }

    /// Print a connectivity event
    pub fn display_event(&self, event: &SessionEvent) -> CliResult<()> {
        match self.format {
            OutputFormat::Json => self.display_json(&event_json(event)),
            OutputFormat::Pretty => {
                let text = describe_event(event);
                if self.colored {
                    match event {
                        SessionEvent::Disconnected { .. } => {
                            eprintln!("{}", text.bright_red().bold());
                        }
                        SessionEvent::Reconnected { .. } | SessionEvent::Connected { .. } => {
                            eprintln!("{}", text.bright_green().bold());
                        }
                        SessionEvent::NodeChanged(_) => eprintln!("{}", text.bright_yellow()),
                    }
                } else {
                    eprintln!("{text}");
                }
                Ok(())
            }
        }
    }

    /// Print a status line to stderr
    pub fn print_status(&self, text: &str) {
        if self.colored {
            eprintln!("{}", text.bright_black());
        } else {
            eprintln!("{text}");
        }
    }

    /// Display error with suggestions
    pub fn display_error(&self, error: &CliError) {
        if self.colored {
            eprintln!(
                "{} [{}]: {}",
                "Error".bright_red().bold(),
                error.category(),
                error
            );

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\n{}", "Suggestions:".bright_yellow().bold());
                for suggestion in suggestions {
                    eprintln!("  {} {}", "•".bright_blue(), suggestion);
                }
            }
        } else {
            eprintln!("Error [{}]: {error}", error.category());

            let suggestions = error.suggestions();
            if !suggestions.is_empty() {
                eprintln!("\nSuggestions:");
                for suggestion in suggestions {
                    eprintln!("  • {suggestion}");
                }
            }
        }
    }

    fn display_json<T: Serialize + ?Sized>(&self, value: &T) -> CliResult<()> {
        println!("{}", serde_json::to_string(value)?);
        Ok(())
    }

    fn print_info(&self, text: &str) {
        if self.colored {
            println!("{}", text.bright_blue());
        } else {
            println!("{text}");
        }
    }
}

/// Local wall-clock rendering of an envelope timestamp
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|utc| utc.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Status line printed once connected.
///
/// The node is left out: on the stream transport it is only known once the
/// service announces or confirms it, which happens after connecting.
pub fn connection_status(host: &str, transport: TransportType) -> String {
    format!("{host} via {transport}")
}

/// Human description of a session event
pub fn describe_event(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Connected { transport } => format!("connected ({transport})"),
        SessionEvent::Disconnected { transport, reason } => {
            format!("disconnected ({transport}): {reason}")
        }
        SessionEvent::Reconnected { transport } => format!("reconnected ({transport})"),
        SessionEvent::NodeChanged(node) => format!("observing node {node}"),
    }
}

fn event_json(event: &SessionEvent) -> serde_json::Value {
    match event {
        SessionEvent::Connected { transport } => {
            json!({"event": "connected", "transport": transport})
        }
        SessionEvent::Disconnected { transport, reason } => {
            json!({"event": "disconnected", "transport": transport, "reason": reason})
        }
        SessionEvent::Reconnected { transport } => {
            json!({"event": "reconnected", "transport": transport})
        }
        SessionEvent::NodeChanged(node) => json!({"event": "node_changed", "node": node}),
    }
}

fn node_rows(nodes: &[NodeInfo], active: &NodeAddress) -> Vec<Vec<String>> {
    nodes
        .iter()
        .map(|node| {
            vec![
                if node.is_active(active) { "*" } else { "" }.to_string(),
                node.name.clone(),
                format!("{}:{}", node.host, node.port),
                if node.local { "yes" } else { "" }.to_string(),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_node_rows_mark_active() {
        let nodes = vec![
            NodeInfo {
                name: "main@10.0.0.1".into(),
                host: "10.0.0.1".into(),
                port: 4001,
                local: true,
            },
            NodeInfo {
                name: "worker@10.0.0.2".into(),
                host: "10.0.0.2".into(),
                port: 4001,
                local: false,
            },
        ];

        let rows = node_rows(&nodes, &NodeAddress::new("worker@10.0.0.2"));
        assert_eq!(rows[0], vec!["", "main@10.0.0.1", "10.0.0.1:4001", "yes"]);
        assert_eq!(rows[1], vec!["*", "worker@10.0.0.2", "10.0.0.2:4001", ""]);
    }

    #[test]
    fn test_describe_event() {
        assert_eq!(
            describe_event(&SessionEvent::Disconnected {
                transport: TransportType::Polling,
                reason: "HTTP 500".into(),
            }),
            "disconnected (polling): HTTP 500"
        );
        assert_eq!(
            describe_event(&SessionEvent::NodeChanged(NodeAddress::new("nodeB"))),
            "observing node nodeB"
        );
    }

    #[test]
    fn test_connection_status_omits_node() {
        assert_eq!(
            connection_status("localhost:4001", TransportType::Stream),
            "localhost:4001 via stream"
        );
    }

    #[test]
    fn test_event_json() {
        let value = event_json(&SessionEvent::Reconnected {
            transport: TransportType::Stream,
        });
        assert_eq!(value, json!({"event": "reconnected", "transport": "stream"}));
    }

    #[test]
    fn test_format_timestamp_out_of_range() {
        assert_eq!(format_timestamp(i64::MAX), i64::MAX.to_string());
    }
}
