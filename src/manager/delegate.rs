//! Delivery callbacks.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::{MeshMessage, SendError};
use crate::network::Address;

/// Receives decoded messages and delivery outcomes.
///
/// Callbacks run on the manager's tasks; keep them short and hand heavy work
/// to another task.
pub trait MeshNetworkDelegate: Send + Sync {
    /// A message addressed to this node was decoded.
    fn on_message_received(
        &self,
        message: Arc<dyn MeshMessage>,
        source: Address,
        destination: Address,
    );

    /// Every segment of a message reached the destination (or, for group
    /// destinations, the bearer).
    fn on_message_sent(
        &self,
        _message: Arc<dyn MeshMessage>,
        _source: Address,
        _destination: Address,
    ) {
    }

    /// A message could not be delivered, or its response never came.
    fn on_send_failed(
        &self,
        _message: Arc<dyn MeshMessage>,
        _source: Address,
        _destination: Address,
        _error: SendError,
    ) {
    }
}

/// Event emitted by [`ChannelDelegate`].
#[derive(Debug, Clone)]
pub enum MeshEvent {
    /// A message was received.
    Received {
        /// Decoded message.
        message: Arc<dyn MeshMessage>,
        /// Source element.
        source: Address,
        /// Destination address.
        destination: Address,
    },

    /// A message was delivered.
    Sent {
        /// The message.
        message: Arc<dyn MeshMessage>,
        /// Local source address.
        source: Address,
        /// Destination address.
        destination: Address,
    },

    /// A message failed.
    SendFailed {
        /// The message.
        message: Arc<dyn MeshMessage>,
        /// Local source address.
        source: Address,
        /// Destination address.
        destination: Address,
        /// Reason.
        error: SendError,
    },
}

/// Delegate forwarding every callback as a [`MeshEvent`].
#[derive(Debug, Clone)]
pub struct ChannelDelegate {
    tx: mpsc::UnboundedSender<MeshEvent>,
}

impl ChannelDelegate {
    /// New delegate and the receiver of its events.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MeshEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: MeshEvent) {
        // A dropped receiver only means nobody listens any more.
        let _ = self.tx.send(event);
    }
}

impl MeshNetworkDelegate for ChannelDelegate {
    fn on_message_received(
        &self,
        message: Arc<dyn MeshMessage>,
        source: Address,
        destination: Address,
    ) {
        self.emit(MeshEvent::Received {
            message,
            source,
            destination,
        });
    }

    fn on_message_sent(&self, message: Arc<dyn MeshMessage>, source: Address, destination: Address) {
        self.emit(MeshEvent::Sent {
            message,
            source,
            destination,
        });
    }

    fn on_send_failed(
        &self,
        message: Arc<dyn MeshMessage>,
        source: Address,
        destination: Address,
        error: SendError,
    ) {
        self.emit(MeshEvent::SendFailed {
            message,
            source,
            destination,
            error,
        });
    }
}
