//! Bidirectional event transport
//!
//! The concrete socket lives in [`websocket`]. Everything it observes is
//! forwarded as [`TransportEvent`] messages into a single queue, and replies
//! travel back through a per-connection [`Outbox`].

pub mod websocket;

use std::collections::HashMap;
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};

use tokio::sync::mpsc;

use crate::protocol::{
    ClientEvent,
    ServerEvent,
};
use crate::registry::ConnectionId;

/// Something observed by the transport
#[derive(Debug)]
pub enum TransportEvent {
    /// A client completed the handshake
    Connected {
        /// Assigned connection id
        connection: ConnectionId,
        /// Queue feeding the connection's writer
        outbox: Outbox,
    },
    /// A client sent an event
    Received {
        /// Originating connection
        connection: ConnectionId,
        /// Decoded event
        event: ClientEvent,
    },
    /// The connection is gone
    Disconnected {
        /// Closed connection
        connection: ConnectionId,
    },
}

/// Sends server events to one specific connection
pub trait Emitter {
    /// Queue `event` for `connection`
    ///
    /// Returns `false` when the connection no longer exists; the event is dropped.
    fn emit(&self, connection: ConnectionId, event: ServerEvent) -> bool;
}

/// Outbound FIFO queue of one connection
#[derive(Debug, Clone)]
pub struct Outbox {
    /// Sender half; the receiver is drained by the connection writer
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl Outbox {
    /// Create an outbox and the receiver its writer drains
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Queue an event; `false` if the writer has gone away
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Outboxes of all live connections
#[derive(Debug, Default)]
pub struct Outboxes {
    /// Connection id → outbox
    outboxes: HashMap<ConnectionId, Outbox>,
}

impl Outboxes {
    /// Register the outbox of a new connection
    pub fn insert(&mut self, connection: ConnectionId, outbox: Outbox) {
        self.outboxes.insert(connection, outbox);
    }

    /// Drop the outbox of a closed connection
    pub fn remove(&mut self, connection: ConnectionId) -> Option<Outbox> {
        self.outboxes.remove(&connection)
    }

    /// Number of registered outboxes
    #[must_use]
    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    /// Whether no outbox is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }
}

impl Emitter for Outboxes {
    fn emit(&self, connection: ConnectionId, event: ServerEvent) -> bool {
        let Some(outbox) = self.outboxes.get(&connection) else {
            tracing::debug!(connection = %connection, "Dropping event for disconnected client");
            return false;
        };
        if !outbox.send(event) {
            tracing::debug!(connection = %connection, "Dropping event, writer already closed");
            return false;
        }
        true
    }
}

/// Hands out process-unique connection ids
#[derive(Debug, Default)]
pub struct ConnectionIds {
    /// Next id to hand out
    next: AtomicU64,
}

impl ConnectionIds {
    /// Allocate the next id
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId::new(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;
    use rstest::*;

    use super::*;
    use crate::protocol::{
        TranslationResult,
        TranslationStatus,
    };

    fn reply(text: &str) -> ServerEvent {
        ServerEvent::Translation(TranslationResult {
            original: text.to_string(),
            translated: text.to_string(),
            target_language: "spanish".to_string(),
            status: TranslationStatus::Success,
        })
    }

    #[rstest]
    fn connection_ids_are_unique_and_increasing() {
        let ids = ConnectionIds::default();

        let first = ids.next_id();
        let second = ids.next_id();

        assert_that!(first.get(), eq(1));
        assert_that!(second.get(), eq(2));
    }

    #[rstest]
    fn emit_preserves_order_per_connection() {
        let mut outboxes = Outboxes::default();
        let (outbox, mut receiver) = Outbox::channel();
        let id = ConnectionId::new(1);
        outboxes.insert(id, outbox);

        for text in ["one", "two", "three"] {
            assert!(outboxes.emit(id, reply(text)));
        }

        for text in ["one", "two", "three"] {
            assert_that!(receiver.try_recv().unwrap(), eq(&reply(text)));
        }
        assert!(receiver.try_recv().is_err());
    }

    #[rstest]
    fn emit_only_reaches_target_connection() {
        let mut outboxes = Outboxes::default();
        let (a_outbox, mut a_receiver) = Outbox::channel();
        let (b_outbox, mut b_receiver) = Outbox::channel();
        outboxes.insert(ConnectionId::new(1), a_outbox);
        outboxes.insert(ConnectionId::new(2), b_outbox);

        outboxes.emit(ConnectionId::new(1), reply("for a"));

        assert_that!(a_receiver.try_recv().unwrap(), eq(&reply("for a")));
        assert!(b_receiver.try_recv().is_err());
    }

    #[rstest]
    fn emit_to_removed_connection_is_noop() {
        let mut outboxes = Outboxes::default();
        let (outbox, _receiver) = Outbox::channel();
        let id = ConnectionId::new(1);
        outboxes.insert(id, outbox);
        outboxes.remove(id);

        assert!(!outboxes.emit(id, reply("late")));
        assert!(outboxes.is_empty());
    }

    #[rstest]
    fn emit_after_writer_closed_is_noop() {
        let mut outboxes = Outboxes::default();
        let (outbox, receiver) = Outbox::channel();
        let id = ConnectionId::new(1);
        outboxes.insert(id, outbox);
        drop(receiver);

        assert!(!outboxes.emit(id, reply("late")));
        assert_that!(outboxes.len(), eq(1));
    }
}
