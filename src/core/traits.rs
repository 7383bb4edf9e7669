//! Core traits for mesh messages.
//!
//! Every message type implements [`MeshMessage`]. Types that can be decoded
//! from a registry additionally implement [`StaticMeshMessage`]; the
//! acknowledged and transactional capabilities are separate traits so a
//! message opts into exactly what it supports.

use std::any::Any;
use std::fmt;

use super::error::AccessError;

/// A message carried in an access PDU.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug)]
/// struct Ping;
///
/// impl MeshMessage for Ping {
///     fn opcode(&self) -> u32 { 0x8201 }
///     fn parameters(&self) -> Vec<u8> { Vec::new() }
///     fn as_any(&self) -> &dyn Any { self }
/// }
/// ```
pub trait MeshMessage: fmt::Debug + Send + Sync + 'static {
    /// Opcode of this message.
    fn opcode(&self) -> u32;

    /// Encoded parameters (everything after the opcode).
    fn parameters(&self) -> Vec<u8>;

    /// Opcode of the response that completes this message, if any.
    fn response_opcode(&self) -> Option<u32> {
        None
    }

    /// Transaction identifier, for transactional messages.
    fn tid(&self) -> Option<u8> {
        None
    }

    /// Whether this message is secured with the target's device key.
    fn uses_device_key(&self) -> bool {
        false
    }

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

impl dyn MeshMessage {
    /// Downcast to a concrete message type.
    pub fn downcast_ref<T: MeshMessage>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Whether this message expects a response.
    pub fn is_acknowledged(&self) -> bool {
        self.response_opcode().is_some()
    }
}

/// A message type with a fixed opcode that can be decoded from parameters.
pub trait StaticMeshMessage: MeshMessage + Sized {
    /// Opcode of every message of this type.
    const OPCODE: u32;

    /// Decode from parameters.
    ///
    /// Returns `AccessError::InvalidLength` or `AccessError::InvalidValue`
    /// on malformed input; never panics.
    fn decode(parameters: &[u8]) -> Result<Self, AccessError>;
}

/// A message type that expects a response with a statically known opcode.
pub trait AcknowledgedMessage: StaticMeshMessage {
    /// Opcode of the response.
    const RESPONSE_OPCODE: u32;
}

/// A message carrying a transaction identifier.
///
/// Callers increment the tid for every new logical action and keep it
/// constant across retransmissions of the same action.
pub trait TransactionMessage: MeshMessage {
    /// Set the transaction identifier.
    fn set_tid(&mut self, tid: u8);
}
