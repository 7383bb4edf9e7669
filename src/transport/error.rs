//! Transport layer error types.
//!
//! Inbound PDUs failing with any of these are dropped without a reply.

use thiserror::Error;

use crate::core::{BearerError, CryptoError};

/// Transport layer errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// PDU is shorter than its fixed fields.
    #[error("pdu too short: {len} bytes, need at least {min}")]
    PduTooShort {
        /// Received length.
        len: usize,
        /// Minimum length.
        min: usize,
    },

    /// A header field holds a value the layer does not accept.
    #[error("invalid {0} field")]
    InvalidField(&'static str),

    /// Access PDU does not fit the largest segmented message.
    #[error("payload of {size} bytes exceeds {max}")]
    PayloadTooLarge {
        /// Payload size.
        size: usize,
        /// Maximum size.
        max: usize,
    },

    /// Segment header is inconsistent with the message it belongs to.
    #[error("invalid segment {seg_o} of {seg_n}")]
    InvalidSegment {
        /// Segment offset.
        seg_o: u8,
        /// Last segment number.
        seg_n: u8,
    },

    /// The 24-bit sequence space is used up; the IV index must change.
    #[error("sequence numbers exhausted")]
    SequenceExhausted,

    /// No local key decrypts the PDU.
    #[error("no matching key")]
    NoMatchingKey,

    /// Security layer failure.
    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// Bearer failure.
    #[error("bearer: {0}")]
    Bearer(#[from] BearerError),
}

impl TransportError {
    /// Whether the PDU was authentic but a repeat.
    pub fn is_replay(&self) -> bool {
        matches!(self, Self::Crypto(CryptoError::ReplayDetected))
    }
}
