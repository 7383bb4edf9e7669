//! Bearer abstraction.
//!
//! A bearer moves complete network PDUs between this stack and the radio
//! (or any other medium). Inbound PDUs are handed to
//! `MeshNetworkManager::bearer_did_deliver` by whoever owns the bearer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;

use crate::core::BearerError;

/// Outbound half of a bearer.
pub trait Bearer: Send + Sync {
    /// Queue one network PDU for transmission.
    fn send(&self, pdu: &[u8]) -> Result<(), BearerError>;

    /// Largest PDU the bearer accepts.
    ///
    /// Segment sizes are fixed, so the manager refuses a bearer whose MTU
    /// is below [`MAX_NETWORK_PDU_SIZE`](super::MAX_NETWORK_PDU_SIZE).
    fn mtu(&self) -> usize {
        usize::MAX
    }

    /// Whether the bearer can currently send.
    fn is_open(&self) -> bool {
        true
    }
}

impl<B: Bearer + ?Sized> Bearer for Arc<B> {
    fn send(&self, pdu: &[u8]) -> Result<(), BearerError> {
        (**self).send(pdu)
    }

    fn mtu(&self) -> usize {
        (**self).mtu()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// In-process bearer backed by an unbounded tokio channel.
///
/// Useful for tests and for bridging to a radio task: the receiving half
/// yields every PDU passed to [`Bearer::send`].
#[derive(Debug, Clone)]
pub struct ChannelBearer {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    mtu: usize,
    closed: Arc<AtomicBool>,
}

impl ChannelBearer {
    /// New bearer and the receiver of everything sent through it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        ChannelBearerBuilder::new().build()
    }

    /// Create a builder.
    pub fn builder() -> ChannelBearerBuilder {
        ChannelBearerBuilder::new()
    }

    /// Refuse every further PDU with [`BearerError::Closed`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// Accept PDUs again after [`ChannelBearer::close`].
    pub fn reopen(&self) {
        self.closed.store(false, Ordering::Release);
    }
}

impl Bearer for ChannelBearer {
    fn send(&self, pdu: &[u8]) -> Result<(), BearerError> {
        if !self.is_open() {
            return Err(BearerError::Closed);
        }
        if pdu.len() > self.mtu {
            return Err(BearerError::PduTooLarge {
                size: pdu.len(),
                mtu: self.mtu,
            });
        }
        self.tx.send(pdu.to_vec()).map_err(|_| BearerError::Closed)
    }

    fn mtu(&self) -> usize {
        self.mtu
    }

    fn is_open(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && !self.tx.is_closed()
    }
}

/// Builder for [`ChannelBearer`].
#[derive(Debug, Clone)]
pub struct ChannelBearerBuilder {
    mtu: usize,
    closed: bool,
}

impl Default for ChannelBearerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelBearerBuilder {
    /// Create a builder with an unlimited MTU.
    pub fn new() -> Self {
        Self {
            mtu: usize::MAX,
            closed: false,
        }
    }

    /// Set the MTU.
    pub fn mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    /// Start closed.
    pub fn closed(mut self, closed: bool) -> Self {
        self.closed = closed;
        self
    }

    /// Build the bearer and its receiving half.
    pub fn build(self) -> (ChannelBearer, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let bearer = ChannelBearer {
            tx,
            mtu: self.mtu,
            closed: Arc::new(AtomicBool::new(self.closed)),
        };
        (bearer, rx)
    }
}
