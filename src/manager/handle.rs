//! Caller side of an outgoing exchange.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};

use crate::core::{MeshMessage, SendError};
use crate::network::Address;
use crate::transport::{ExchangeState, SegmentAck};

/// Input to a running exchange task.
#[derive(Debug)]
pub(crate) enum Signal {
    SegmentAck(SegmentAck),
    Response(Arc<dyn MeshMessage>),
    Cancel,
}

/// Outcome of an exchange: the response for acknowledged messages.
pub type ExchangeResult = Result<Option<Arc<dyn MeshMessage>>, SendError>;

/// Handle to one outgoing message.
///
/// Dropping the handle does not cancel the exchange.
#[derive(Debug)]
pub struct MessageHandle {
    id: u64,
    destination: Address,
    signals: mpsc::UnboundedSender<Signal>,
    state: watch::Receiver<ExchangeState>,
    result: oneshot::Receiver<ExchangeResult>,
}

impl MessageHandle {
    pub(crate) fn new(
        id: u64,
        destination: Address,
        signals: mpsc::UnboundedSender<Signal>,
        state: watch::Receiver<ExchangeState>,
        result: oneshot::Receiver<ExchangeResult>,
    ) -> Self {
        Self {
            id,
            destination,
            signals,
            state,
            result,
        }
    }

    /// Identifier of the exchange.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Destination address.
    pub fn destination(&self) -> Address {
        self.destination
    }

    /// Current state of the exchange.
    pub fn state(&self) -> ExchangeState {
        *self.state.borrow()
    }

    /// Stop the exchange; [`MessageHandle::wait`] then yields
    /// [`SendError::Cancelled`] unless it already finished.
    pub fn cancel(&self) {
        let _ = self.signals.send(Signal::Cancel);
    }

    /// Wait for the exchange to finish.
    ///
    /// Returns the response of an acknowledged message, `None` otherwise.
    pub async fn wait(self) -> ExchangeResult {
        self.result.await.unwrap_or(Err(SendError::Cancelled))
    }
}
