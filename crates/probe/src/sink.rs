//! Message sinks: where envelopes go once built.

use std::sync::Mutex;

use conan_protocol::Envelope;
use tokio::sync::mpsc;

use crate::lock;

/// Receives every envelope the observers produce.
///
/// Called inline with host code, so implementations must return quickly.
pub trait MessageSink: Send + Sync {
    fn send(&self, envelope: Envelope);
}

impl<F> MessageSink for F
where
    F: Fn(Envelope) + Send + Sync,
{
    fn send(&self, envelope: Envelope) {
        self(envelope)
    }
}

/// Forwards envelopes into an unbounded tokio channel.
///
/// Lets an async transport drain envelopes without blocking the observers.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl ChannelSink {
    /// Creates the sink and the receiving half of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Envelope>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl MessageSink for ChannelSink {
    fn send(&self, envelope: Envelope) {
        if self.tx.send(envelope).is_err() {
            tracing::debug!("envelope receiver dropped, discarding envelope");
        }
    }
}

/// Keeps envelopes in memory until taken.
#[derive(Debug, Default)]
pub struct MemorySink {
    envelopes: Mutex<Vec<Envelope>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies of all envelopes received so far, oldest first.
    pub fn envelopes(&self) -> Vec<Envelope> {
        lock(&self.envelopes).clone()
    }

    /// Removes and returns all envelopes received so far.
    pub fn take(&self) -> Vec<Envelope> {
        std::mem::take(&mut *lock(&self.envelopes))
    }

    pub fn len(&self) -> usize {
        lock(&self.envelopes).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.envelopes).is_empty()
    }
}

impl MessageSink for MemorySink {
    fn send(&self, envelope: Envelope) {
        lock(&self.envelopes).push(envelope);
    }
}
