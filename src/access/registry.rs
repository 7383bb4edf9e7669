//! Opcode to decoder registry.

use std::any::Any;
use std::collections::HashMap;

use super::config::{
    ConfigAppKeyAdd, ConfigAppKeyStatus, ConfigModelAppBind, ConfigModelAppStatus,
    ConfigNodeReset, ConfigNodeResetStatus,
};
use super::generic::{
    GenericHslSet, GenericHslSetUnacknowledged, GenericHslStatus, GenericOnOffGet,
    GenericOnOffSet, GenericOnOffSetUnacknowledged, GenericOnOffStatus,
};
use super::opcode::{decode_opcode, encode_access_pdu};
use crate::core::{AccessError, MeshMessage, StaticMeshMessage};

type Decoder = fn(&[u8]) -> Result<Box<dyn MeshMessage>, AccessError>;

fn decode_boxed<T: StaticMeshMessage>(parameters: &[u8]) -> Result<Box<dyn MeshMessage>, AccessError> {
    Ok(Box::new(T::decode(parameters)?))
}

/// A message whose opcode has no registered decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMessage {
    /// Received opcode.
    pub opcode: u32,
    /// Raw parameters.
    pub parameters: Vec<u8>,
}

impl MeshMessage for UnknownMessage {
    fn opcode(&self) -> u32 {
        self.opcode
    }

    fn parameters(&self) -> Vec<u8> {
        self.parameters.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Maps opcodes to decoders.
///
/// ```ignore
/// let registry = MessageRegistry::with_defaults();
/// let message = registry.decode(&[0x82, 0x04, 0x01])?;
/// let status = message.downcast_ref::<GenericOnOffStatus>();
/// ```
#[derive(Clone, Default)]
pub struct MessageRegistry {
    decoders: HashMap<u32, Decoder>,
}

impl MessageRegistry {
    /// Empty registry; everything decodes to [`UnknownMessage`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every message type shipped in this crate.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register::<GenericOnOffGet>();
        registry.register::<GenericOnOffSet>();
        registry.register::<GenericOnOffSetUnacknowledged>();
        registry.register::<GenericOnOffStatus>();
        registry.register::<GenericHslSet>();
        registry.register::<GenericHslSetUnacknowledged>();
        registry.register::<GenericHslStatus>();
        registry.register::<ConfigAppKeyAdd>();
        registry.register::<ConfigAppKeyStatus>();
        registry.register::<ConfigModelAppBind>();
        registry.register::<ConfigModelAppStatus>();
        registry.register::<ConfigNodeReset>();
        registry.register::<ConfigNodeResetStatus>();
        registry
    }

    /// Register `T` under its opcode, replacing any previous decoder.
    pub fn register<T: StaticMeshMessage>(&mut self) -> &mut Self {
        self.decoders.insert(T::OPCODE, decode_boxed::<T>);
        self
    }

    /// Whether a decoder is registered for `opcode`.
    pub fn is_registered(&self, opcode: u32) -> bool {
        self.decoders.contains_key(&opcode)
    }

    /// Decode an access PDU.
    pub fn decode(&self, pdu: &[u8]) -> Result<Box<dyn MeshMessage>, AccessError> {
        let (opcode, parameters) = decode_opcode(pdu)?;
        match self.decoders.get(&opcode) {
            Some(decoder) => decoder(parameters),
            None => Ok(Box::new(UnknownMessage {
                opcode,
                parameters: parameters.to_vec(),
            })),
        }
    }

    /// Encode a message as an access PDU.
    pub fn encode(&self, message: &dyn MeshMessage) -> Result<Vec<u8>, AccessError> {
        encode_access_pdu(message)
    }
}

impl std::fmt::Debug for MessageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut opcodes: Vec<_> = self.decoders.keys().collect();
        opcodes.sort();
        f.debug_struct("MessageRegistry")
            .field("opcodes", &opcodes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::generic::{GENERIC_ON_OFF_STATUS, Hsl};

    #[test]
    fn test_decode_registered() {
        let registry = MessageRegistry::with_defaults();
        let message = registry.decode(&[0x82, 0x04, 0x01]).unwrap();
        assert_eq!(message.opcode(), GENERIC_ON_OFF_STATUS);
        let status = message.downcast_ref::<GenericOnOffStatus>().unwrap();
        assert!(status.present);
    }

    #[test]
    fn test_unknown_opcode() {
        let registry = MessageRegistry::new();
        let message = registry.decode(&[0x82, 0x04, 0x01]).unwrap();
        let unknown = message.downcast_ref::<UnknownMessage>().unwrap();
        assert_eq!(unknown.opcode, 0x8204);
        assert_eq!(unknown.parameters, vec![0x01]);
    }

    #[test]
    fn test_malformed_registered_message_is_error() {
        let registry = MessageRegistry::with_defaults();
        assert!(registry.decode(&[0x82, 0x04]).is_err());
        assert!(registry.decode(&[0x82, 0x04, 0x05]).is_err());
    }

    #[test]
    fn test_encode_then_decode_via_registry() {
        let registry = MessageRegistry::with_defaults();
        let message = GenericHslSetUnacknowledged {
            hsl: Hsl {
                lightness: 100,
                hue: 200,
                saturation: 300,
            },
            tid: 3,
            transition: None,
        };
        let pdu = registry.encode(&message).unwrap();
        assert_eq!(&pdu[..2], &[0x82, 0x77]);
        let decoded = registry.decode(&pdu).unwrap();
        assert_eq!(decoded.downcast_ref::<GenericHslSetUnacknowledged>(), Some(&message));
    }

    #[test]
    fn test_config_app_key_add_uses_one_byte_opcode() {
        let registry = MessageRegistry::with_defaults();
        let message = ConfigAppKeyAdd {
            net_key_index: 0,
            app_key_index: 0,
            key: crate::network::Key::new([1; 16]),
        };
        let pdu = registry.encode(&message).unwrap();
        assert_eq!(pdu.len(), 20);
        assert_eq!(pdu[0], 0x00);
        assert!(registry.decode(&pdu).unwrap().uses_device_key());
    }
}
