//! # Wobserver Client
//!
//! Session layer of the wobserver dashboard client. A [`Session`] connects
//! to a wobserver service over a persistent WebSocket when it can and over
//! plain HTTP polling when it cannot, routes commands to the selected
//! observed node and reports connectivity changes as [`SessionEvent`]s.
//!
//! ```rust,no_run
//! use wobserver_client::{Session, SessionEvent};
//!
//! # async fn example() -> wobserver_client::SessionResult<()> {
//! let session = Session::builder("localhost:4001").connect().await?;
//! let mut events = session.subscribe();
//!
//! for node in session.nodes().await? {
//!     println!("{} ({}:{})", node.name, node.host, node.port);
//! }
//!
//! session.set_node("worker@10.0.0.2").await?;
//! while let Ok(event) = events.recv().await {
//!     if let SessionEvent::NodeChanged(node) = event {
//!         println!("now observing {}", node);
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! wobserver-client/
//! ├── config.rs    # SessionConfig, endpoint derivation from the host
//! ├── builder.rs   # SessionBuilder
//! ├── session.rs   # Session: transport selection, fallback, requests
//! ├── nodes.rs     # NodeInfo and the `nodes` helper
//! └── error.rs     # SessionError
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]

pub mod builder;
pub mod config;
pub mod error;
pub mod nodes;
pub mod session;

pub use builder::SessionBuilder;
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use nodes::{NODES_COMMAND, NodeInfo};
pub use session::Session;

pub use wobserver_http::{PollingConfig, PollingTransport};
pub use wobserver_transport_traits::{
    Command, Envelope, NodeAddress, SessionEvent, TransportError, TransportMetrics,
    TransportState, TransportType,
};
pub use wobserver_websocket::{StreamConfig, StreamTransport};
