//! # Wobserver Transport Traits
//!
//! Core transport traits and types for the wobserver dashboard client.
//! This crate provides the foundational abstractions that both transport
//! implementations and the session layer depend on.
//!
//! ## Overview
//!
//! This crate defines:
//! - **Messages**: [`Command`] (client -> node) and [`Envelope`] (node -> client)
//! - **Addressing**: [`NodeAddress`] and the shared [`ActiveNode`] cell
//! - **Traits**: [`Transport`], the capability set both transports implement
//! - **Types**: [`TransportType`], [`TransportState`], [`TransportCapabilities`]
//! - **Errors**: [`TransportError`], [`TransportResult`]
//! - **Events**: [`SessionEvent`], [`SessionEventEmitter`]
//! - **Config**: [`LimitsConfig`]
//! - **Metrics**: [`TransportMetrics`], [`AtomicMetrics`]
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wobserver_transport_traits::{Command, Envelope, Transport, TransportResult};
//!
//! async fn memory(transport: &dyn Transport) -> TransportResult<Envelope> {
//!     transport.send_and_await(Command::new("memory")).await
//! }
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

mod config;
mod error;
mod events;
mod message;
mod metrics;
mod node;
mod traits;
mod types;

// Re-export all public items
pub use config::LimitsConfig;
pub use error::{TransportError, TransportResult};
pub use events::{SessionEvent, SessionEventEmitter};
pub use message::{Command, Envelope, WireCommand, reserved};
pub use metrics::{AtomicMetrics, TransportMetrics};
pub use node::{ActiveNode, NodeAddress};
pub use traits::Transport;
pub use types::{TransportCapabilities, TransportState, TransportType};

// Re-export validation functions
pub use error::{validate_request_size, validate_response_size};
