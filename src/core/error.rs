//! Error types for the mesh stack.

use thiserror::Error;
use uuid::Uuid;

/// Violations of the network model invariants.
///
/// Every mutating call that returns one of these leaves the model unchanged.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// Lower bound is greater than the upper bound.
    #[error("invalid range 0x{lower:04X}..=0x{upper:04X}")]
    InvalidRange {
        /// Lower bound.
        lower: u16,
        /// Upper bound.
        upper: u16,
    },

    /// Range does not fit the address space of its kind.
    #[error("{kind} range 0x{lower:04X}..=0x{upper:04X} is out of bounds")]
    RangeOutOfBounds {
        /// Range kind.
        kind: &'static str,
        /// Lower bound.
        lower: u16,
        /// Upper bound.
        upper: u16,
    },

    /// Range overlaps a range of the same kind owned by another provisioner.
    #[error("{kind} range 0x{lower:04X}..=0x{upper:04X} overlaps another provisioner")]
    RangeOverlap {
        /// Range kind.
        kind: &'static str,
        /// Lower bound.
        lower: u16,
        /// Upper bound.
        upper: u16,
    },

    /// Address is not a unicast address.
    #[error("0x{0:04X} is not a unicast address")]
    NotUnicast(u16),

    /// Address is not a group address.
    #[error("0x{0:04X} is not a group address")]
    NotGroup(u16),

    /// Node has no elements.
    #[error("node must have at least one element")]
    NoElements,

    /// Element indexes are a single byte.
    #[error("node has {0} elements, at most 255 are addressable")]
    TooManyElements(usize),

    /// Node's element span leaves the unicast address space.
    #[error("node at 0x{address:04X} with {element_count} elements leaves the unicast space")]
    SpanOutOfBounds {
        /// Primary element address.
        address: u16,
        /// Number of elements.
        element_count: usize,
    },

    /// Node's element span overlaps an existing node.
    #[error("node at 0x{address:04X} overlaps node at 0x{existing:04X}")]
    NodeSpanOverlap {
        /// Primary element address of the rejected node.
        address: u16,
        /// Primary element address of the existing node.
        existing: u16,
    },

    /// A node with this UUID already exists.
    #[error("duplicate node {0}")]
    DuplicateNode(Uuid),

    /// A provisioner with this UUID already exists.
    #[error("duplicate provisioner {0}")]
    DuplicateProvisioner(Uuid),

    /// A group with this address already exists.
    #[error("duplicate group 0x{0:04X}")]
    DuplicateGroup(u16),

    /// A key with this index already exists.
    #[error("duplicate key index {0}")]
    DuplicateKeyIndex(u16),

    /// Key index exceeds 12 bits.
    #[error("invalid key index {0}")]
    InvalidKeyIndex(u16),

    /// No network key with this index.
    #[error("unknown network key {0}")]
    UnknownNetworkKey(u16),

    /// No application key with this index.
    #[error("unknown application key {0}")]
    UnknownApplicationKey(u16),

    /// Application key is already bound to a different network key.
    #[error("application key {app_key} is already bound to network key {bound_to}")]
    KeyAlreadyBound {
        /// Application key index.
        app_key: u16,
        /// Network key the application key is bound to.
        bound_to: u16,
    },

    /// Node does not know the network key.
    #[error("node 0x{node:04X} does not know network key {net_key}")]
    NetworkKeyNotKnown {
        /// Node's primary address.
        node: u16,
        /// Network key index.
        net_key: u16,
    },

    /// Node does not know the application key.
    #[error("node 0x{node:04X} does not know application key {app_key}")]
    ApplicationKeyNotKnown {
        /// Node's primary address.
        node: u16,
        /// Application key index.
        app_key: u16,
    },

    /// Node already knows the application key.
    #[error("node 0x{node:04X} already knows application key {app_key}")]
    ApplicationKeyAlreadyKnown {
        /// Node's primary address.
        node: u16,
        /// Application key index.
        app_key: u16,
    },

    /// Model is already bound to the application key.
    #[error("model on 0x{element:04X} is already bound to application key {app_key}")]
    ModelAlreadyBound {
        /// Element address.
        element: u16,
        /// Application key index.
        app_key: u16,
    },

    /// Key is still referenced and cannot be removed.
    #[error("key {0} is in use")]
    KeyInUse(u16),

    /// No node occupies this address.
    #[error("unknown node 0x{0:04X}")]
    UnknownNode(u16),

    /// No element has this address.
    #[error("unknown element 0x{0:04X}")]
    UnknownElement(u16),

    /// Element has no such model.
    #[error("unknown model {0}")]
    UnknownModel(String),

    /// No provisioner with this UUID.
    #[error("unknown provisioner {0}")]
    UnknownProvisioner(Uuid),

    /// No free unicast span fits the node in the provisioner's ranges.
    #[error("no unicast address available for {element_count} elements")]
    NoAddressAvailable {
        /// Number of elements requested.
        element_count: usize,
    },

    /// Export or import failed.
    #[error("serialization: {0}")]
    Serialization(String),
}

/// Errors from encoding or decoding access messages.
///
/// A message failing to decode is dropped and never reaches a callback.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// Access PDU has no opcode.
    #[error("empty access pdu")]
    Empty,

    /// Opcode uses the reserved 0x7F value.
    #[error("reserved opcode 0x{0:02X}")]
    ReservedOpcode(u8),

    /// Opcode is longer than the PDU.
    #[error("truncated opcode")]
    TruncatedOpcode,

    /// Opcode does not fit its width class.
    #[error("invalid opcode 0x{0:06X}")]
    InvalidOpcode(u32),

    /// Parameters have a length the message does not accept.
    #[error("opcode 0x{opcode:04X}: invalid parameter length {length}")]
    InvalidLength {
        /// Message opcode.
        opcode: u32,
        /// Received parameter length.
        length: usize,
    },

    /// A parameter field is out of range.
    #[error("opcode 0x{opcode:04X}: invalid value for {field}")]
    InvalidValue {
        /// Message opcode.
        opcode: u32,
        /// Field name.
        field: &'static str,
    },

    /// Decoder registered for one opcode received another.
    #[error("expected opcode 0x{expected:04X}, got 0x{actual:04X}")]
    UnexpectedOpcode {
        /// Expected opcode.
        expected: u32,
        /// Received opcode.
        actual: u32,
    },
}

/// Errors in the crypto layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (invalid MIC or corrupted).
    #[error("AEAD decryption failed (invalid MIC or corrupted)")]
    DecryptionFailed,

    /// Sequence number already seen for this source and IV index.
    #[error("replay detected")]
    ReplayDetected,

    /// Key derivation failed.
    #[error("key derivation failed")]
    KeyDerivationFailed,

    /// No local key matches the PDU.
    #[error("no matching key")]
    NoMatchingKey,
}

/// Errors reported by a bearer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BearerError {
    /// The bearer is not connected or was closed.
    #[error("bearer closed")]
    Closed,

    /// PDU exceeds the bearer MTU.
    #[error("pdu of {size} bytes exceeds bearer mtu {mtu}")]
    PduTooLarge {
        /// PDU size.
        size: usize,
        /// Bearer MTU.
        mtu: usize,
    },

    /// Platform specific failure.
    #[error("bearer i/o: {0}")]
    Io(String),
}

/// Reasons an outgoing message was not delivered.
///
/// Each of these releases every resource held by the exchange.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    /// The bearer refused the PDU.
    #[error("bearer unavailable: {0}")]
    BearerUnavailable(#[from] BearerError),

    /// Segments were not acknowledged within the retransmission limit.
    #[error("retransmission limit exceeded for 0x{destination:04X}")]
    RetransmissionLimitExceeded {
        /// Destination address.
        destination: u16,
    },

    /// The target node is busy and cannot accept the message now.
    #[error("0x{destination:04X} is busy")]
    RemoteBusy {
        /// Destination address.
        destination: u16,
    },

    /// No response for an acknowledged message arrived in time.
    #[error("no response 0x{response_opcode:04X} from 0x{destination:04X}")]
    ResponseTimeout {
        /// Destination address.
        destination: u16,
        /// Expected response opcode.
        response_opcode: u32,
    },

    /// The exchange was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// No sequence numbers are left under the current IV index.
    #[error("sequence numbers exhausted")]
    SequenceExhausted,

    /// Sealing a PDU failed.
    #[error("crypto: {0}")]
    Crypto(#[from] CryptoError),

    /// A PDU could not be built from the message.
    #[error("encoding: {0}")]
    Encoding(String),
}

impl SendError {
    /// Whether retrying later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RemoteBusy { .. } | Self::BearerUnavailable(_))
    }
}

/// Top-level mesh errors.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Network model invariant violation.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Access layer error.
    #[error("access error: {0}")]
    Access(#[from] AccessError),

    /// Crypto error.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Transport error.
    #[cfg(feature = "transport")]
    #[error("transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    /// Delivery failure.
    #[error("send error: {0}")]
    Send(#[from] SendError),

    /// Source address is not a local element.
    #[error("0x{0:04X} is not a local element")]
    InvalidSource(u16),

    /// Destination address cannot receive messages.
    #[error("invalid destination 0x{0:04X}")]
    InvalidDestination(u16),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The manager has been shut down.
    #[error("manager shut down")]
    Shutdown,
}
