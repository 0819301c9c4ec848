//! Request correlation for the stream transport
//!
//! Responses on the stream channel carry no request id: an envelope answers
//! the command whose name equals its `type`. The [`Correlator`] keeps one FIFO
//! queue of waiters per command name and hands each matching envelope to the
//! oldest waiter still listening.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace};

use wobserver_transport_traits::{Envelope, TransportError, TransportResult};

/// A caller waiting for the next envelope of one command name.
#[derive(Debug)]
struct PendingRequest {
    id: u64,
    response_tx: oneshot::Sender<TransportResult<Envelope>>,
}

/// Matches inbound envelopes to the callers that issued the commands.
#[derive(Debug, Default)]
pub struct Correlator {
    pending: DashMap<String, VecDeque<PendingRequest>>,
    next_id: AtomicU64,
}

impl Correlator {
    /// Create an empty correlator
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a waiter for the next envelope whose `type` is `name`.
    pub fn register(&self, name: &str) -> PendingReply {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (response_tx, response_rx) = oneshot::channel();

        self.pending
            .entry(name.to_string())
            .or_default()
            .push_back(PendingRequest { id, response_tx });

        trace!("Registered waiter {} for '{}'", id, name);
        PendingReply {
            name: name.to_string(),
            id,
            response_rx,
        }
    }

    /// Deliver `envelope` to the oldest live waiter for its type.
    ///
    /// Waiters whose reply future was dropped are discarded on the way.
    /// Returns `false` when nobody was waiting, in which case the envelope is
    /// dropped.
    pub fn resolve(&self, envelope: Envelope) -> bool {
        let kind = envelope.kind.clone();
        let mut outcome = Ok(envelope);
        let mut delivered = false;

        if let Some(mut queue) = self.pending.get_mut(&kind) {
            while let Some(waiter) = queue.pop_front() {
                match waiter.response_tx.send(outcome) {
                    Ok(()) => {
                        trace!("Resolved waiter {} for '{}'", waiter.id, kind);
                        delivered = true;
                        break;
                    }
                    Err(returned) => {
                        trace!("Skipping dropped waiter {} for '{}'", waiter.id, kind);
                        outcome = returned;
                    }
                }
            }
        }

        // The shard guard is released above; now drop the key if drained
        self.pending.remove_if(&kind, |_, queue| queue.is_empty());
        delivered
    }

    /// Fail every outstanding waiter with [`TransportError::ConnectionLost`].
    ///
    /// Returns the number of callers that were still listening.
    pub fn abandon_all(&self, reason: &str) -> usize {
        let mut abandoned = 0;
        self.pending.retain(|_, queue| {
            for waiter in queue.drain(..) {
                let error = TransportError::ConnectionLost(reason.to_string());
                if waiter.response_tx.send(Err(error)).is_ok() {
                    abandoned += 1;
                }
            }
            false
        });

        if abandoned > 0 {
            debug!("Abandoned {} pending requests: {}", abandoned, reason);
        }
        abandoned
    }

    /// Remove one specific waiter. Returns `true` if it was still queued.
    pub fn cancel(&self, name: &str, id: u64) -> bool {
        let removed = match self.pending.get_mut(name) {
            Some(mut queue) => match queue.iter().position(|waiter| waiter.id == id) {
                Some(index) => queue.remove(index).is_some(),
                None => false,
            },
            None => false,
        };

        self.pending.remove_if(name, |_, queue| queue.is_empty());
        removed
    }

    /// Total number of queued waiters across all names.
    pub fn pending_count(&self) -> usize {
        self.pending.iter().map(|entry| entry.value().len()).sum()
    }

    /// Number of queued waiters for `name`.
    pub fn pending_for(&self, name: &str) -> usize {
        self.pending.get(name).map_or(0, |queue| queue.len())
    }
}

/// Future resolving to the envelope that answered a registered command.
///
/// Dropping it cancels the wait; the correlator skips the slot when the
/// matching envelope arrives.
#[derive(Debug)]
pub struct PendingReply {
    name: String,
    id: u64,
    response_rx: oneshot::Receiver<TransportResult<Envelope>>,
}

impl PendingReply {
    /// The command name this reply is keyed by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the waiter inside its queue.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Future for PendingReply {
    type Output = TransportResult<Envelope>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.response_rx).poll(cx).map(|result| {
            result.unwrap_or_else(|_| {
                Err(TransportError::ConnectionLost(
                    "correlator dropped the request".to_string(),
                ))
            })
        })
    }
}
