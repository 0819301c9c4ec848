//! # Wobserver WebSocket Transport
//!
//! Stream transport for the wobserver dashboard client: one persistent
//! WebSocket to the service's `/ws` endpoint, carrying `{command, data}`
//! frames out and `{type, data}` envelopes back.
//!
//! ## Features
//!
//! - **Correlation**: responses are matched to callers by command name, FIFO per name
//! - **Node addressing**: `ehlo` and `setup_proxy` envelopes update the shared active node
//! - **Keep-Alive**: periodic `ping` commands while the channel is open
//! - **Automatic Reconnection**: fixed-delay retries without bound, `hello` re-sent on success
//! - **Fail fast**: requests issued while the channel is down are rejected, never queued
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wobserver_transport_traits::{ActiveNode, Command, SessionEventEmitter, Transport};
//! use wobserver_websocket::{StreamConfig, StreamTransport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StreamConfig::for_host("localhost:4001", false);
//! let transport =
//!     StreamTransport::open(config, ActiveNode::default(), SessionEventEmitter::new()).await?;
//!
//! let memory = transport.send_and_await(Command::new("memory")).await?;
//! println!("{}", memory.data);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! wobserver-websocket/
//! ├── config.rs       # StreamConfig and builders
//! ├── correlator.rs   # Per-name FIFO waiter queues
//! ├── types.rs        # Transport handle, shared state, stream aliases
//! ├── connection.rs   # Open, activate, close
//! ├── tasks.rs        # Reader, keepalive, disconnect and reconnection
//! └── transport.rs    # Transport trait implementation
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

pub mod config;
mod connection;
pub mod correlator;
mod tasks;
mod transport;
pub mod types;

// Re-export main types for convenience
pub use config::{STREAM_PATH, StreamConfig, stream_url};
pub use correlator::{Correlator, PendingReply};
pub use types::{StreamTransport, WsSink, WsSource, WsStream};

// Re-export transport traits for convenience
pub use wobserver_transport_traits::{
    ActiveNode, Command, Envelope, NodeAddress, SessionEvent, SessionEventEmitter, Transport,
    TransportCapabilities, TransportError, TransportMetrics, TransportResult, TransportState,
    TransportType,
};
