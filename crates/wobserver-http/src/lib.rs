//! # Wobserver HTTP Transport
//!
//! Polling transport for the wobserver dashboard client. Used when the
//! WebSocket channel cannot be opened: each command becomes one
//! `GET /api/[<node>/]<command>` whose JSON body is wrapped into an
//! [`Envelope`] client-side.
//!
//! The transport never retries. A failed exchange marks it disconnected
//! (one `Disconnected` event), the next successful one marks it recovered
//! (one `Reconnected` event).
//!
//! ```rust,ignore
//! use wobserver_http::{PollingConfig, PollingTransport};
//! use wobserver_transport_traits::{ActiveNode, Command, SessionEventEmitter, Transport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = PollingTransport::new(
//!     PollingConfig::for_host("localhost:4001", false),
//!     ActiveNode::default(),
//!     SessionEventEmitter::new(),
//! )?;
//! let system = transport.send_and_await(Command::new("system")).await?;
//! # Ok(())
//! # }
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

pub mod config;
pub mod transport;

pub use config::{API_PATH, PollingConfig, command_url, encode_segment};
pub use transport::PollingTransport;

pub use wobserver_transport_traits::{
    ActiveNode, Command, Envelope, NodeAddress, SessionEvent, SessionEventEmitter, Transport,
    TransportError, TransportResult, TransportState, TransportType,
};
