//! Command execution against a connected session

use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use wobserver_client::Session;

use crate::cli::Commands;
use crate::error::{CliError, CliResult};
use crate::output::Formatter;

/// Runs subcommands and prints their results
#[derive(Debug)]
pub struct CommandExecutor {
    /// Output formatter
    pub formatter: Formatter,
}

impl CommandExecutor {
    /// Create an executor printing through `formatter`
    #[must_use]
    pub fn new(formatter: Formatter) -> Self {
        Self { formatter }
    }

    /// Execute a subcommand
    pub async fn execute(&self, session: &Session, command: Commands) -> CliResult<()> {
        match command {
            Commands::Request { command, payload } => {
                let payload = parse_payload(payload.as_deref())?;
                let envelope = session.command_request(&command, payload).await?;
                self.formatter.display_envelope(&envelope)
            }

            Commands::Send { command, payload } => {
                let payload = parse_payload(payload.as_deref())?;
                session.command(&command, payload).await?;
                self.formatter.print_status(&format!("sent {command}"));
                Ok(())
            }

            Commands::Nodes => {
                let nodes = session.nodes().await?;
                self.formatter.display_nodes(&nodes, &session.node())
            }

            Commands::Watch {
                command,
                payload,
                interval,
                count,
            } => {
                let payload = parse_payload(payload.as_deref())?;
                self.watch(session, &command, payload, interval, count).await
            }
        }
    }

    /// The dashboard refresh loop: request `command` every `interval`
    /// seconds until `count` responses arrived or Ctrl-C is pressed.
    async fn watch(
        &self,
        session: &Session,
        command: &str,
        payload: Option<Value>,
        interval: u64,
        count: Option<u64>,
    ) -> CliResult<()> {
        if interval == 0 {
            return Err(CliError::InvalidArguments(
                "--interval must be at least 1 second".to_string(),
            ));
        }

        let mut events = session.subscribe();
        let mut ticker = tokio::time::interval(Duration::from_secs(interval));
        let mut received = 0u64;
        let interrupted = tokio::signal::ctrl_c();
        tokio::pin!(interrupted);

        loop {
            tokio::select! {
                _ = &mut interrupted => {
                    debug!("Interrupted after {} responses", received);
                    break;
                }
                event = events.recv() => match event {
                    Ok(event) => self.formatter.display_event(&event)?,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Skipped {} connectivity events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = ticker.tick() => {
                    match session.command_request(command, payload.clone()).await {
                        Ok(envelope) => {
                            self.formatter.display_envelope(&envelope)?;
                            received += 1;
                            if count.is_some_and(|count| received >= count) {
                                break;
                            }
                        }
                        // Outages are reported through events; keep polling
                        Err(e) if e.is_connectivity() => debug!("'{}' failed: {}", command, e),
                        Err(e) => return Err(e.into()),
                    }
                }
            }
        }

        Ok(())
    }
}

/// Parse an optional `--payload` argument
pub fn parse_payload(payload: Option<&str>) -> CliResult<Option<Value>> {
    payload
        .map(|raw| {
            serde_json::from_str(raw).map_err(|e| {
                CliError::InvalidArguments(format!("Invalid JSON payload: {}", e))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_payload() {
        assert_eq!(parse_payload(None).unwrap(), None);
        assert_eq!(
            parse_payload(Some(r#"{"limit": 10}"#)).unwrap(),
            Some(json!({"limit": 10}))
        );
        assert_eq!(parse_payload(Some("\"<0.42.0>\"")).unwrap(), Some(json!("<0.42.0>")));
    }

    #[test]
    fn test_parse_payload_rejects_invalid_json() {
        let err = parse_payload(Some("{limit: 10")).unwrap_err();
        assert!(matches!(err, CliError::InvalidArguments(_)));
    }
}
