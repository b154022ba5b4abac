//! Channel-backed [`Connection`] for tests.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Connection, ConnectionEvent, Outbound, OutboundMessage};

/// Connection half handed to the code under test
pub struct MemoryConnection {
    events: mpsc::UnboundedReceiver<ConnectionEvent>,
    outbound: Outbound,
    closed: Arc<AtomicBool>,
}

/// Test-side half: inject events, inspect what was sent
pub struct RemoteEnd {
    events: mpsc::UnboundedSender<ConnectionEvent>,
    sent: mpsc::UnboundedReceiver<OutboundMessage>,
    closed: Arc<AtomicBool>,
}

/// Create a connected pair
pub fn pair() -> (MemoryConnection, RemoteEnd) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let closed = Arc::new(AtomicBool::new(false));

    let connection = MemoryConnection {
        events: events_rx,
        outbound: Outbound::new(sent_tx),
        closed: closed.clone(),
    };
    let remote = RemoteEnd {
        events: events_tx,
        sent: sent_rx,
        closed,
    };
    (connection, remote)
}

impl RemoteEnd {
    /// Deliver an inbound event; ignored if the connection is gone
    pub fn push(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }

    /// Everything sent so far
    pub fn drain_sent(&mut self) -> Vec<OutboundMessage> {
        let mut sent = Vec::new();
        while let Ok(message) = self.sent.try_recv() {
            sent.push(message);
        }
        sent
    }

    /// Whether `close()` was called on the connection half
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    fn outbound(&self) -> Outbound {
        self.outbound.clone()
    }

    async fn next_event(&mut self) -> Option<ConnectionEvent> {
        if self.closed.load(Ordering::SeqCst) {
            return None;
        }
        self.events.recv().await
    }

    async fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.events.close();
    }
}
