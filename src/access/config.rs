//! Configuration messages.
//!
//! These are secured with the target node's device key. Key indexes are
//! packed as two 12-bit values in three little-endian bytes.

use std::any::Any;

use super::expect_length;
use crate::core::{AccessError, AcknowledgedMessage, MeshMessage, StaticMeshMessage};
use crate::network::{Address, ApplicationKey, Key, KeyIndex, ModelId};

/// Config AppKey Add opcode.
pub const CONFIG_APP_KEY_ADD: u32 = 0x00;
/// Config AppKey Status opcode.
pub const CONFIG_APP_KEY_STATUS: u32 = 0x8003;
/// Config Model App Bind opcode.
pub const CONFIG_MODEL_APP_BIND: u32 = 0x803D;
/// Config Model App Status opcode.
pub const CONFIG_MODEL_APP_STATUS: u32 = 0x803E;
/// Config Node Reset opcode.
pub const CONFIG_NODE_RESET: u32 = 0x8049;
/// Config Node Reset Status opcode.
pub const CONFIG_NODE_RESET_STATUS: u32 = 0x804A;

/// Status code of a configuration response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConfigStatus {
    /// 0x00
    Success = 0x00,
    /// 0x01
    InvalidAddress = 0x01,
    /// 0x02
    InvalidModel = 0x02,
    /// 0x03
    InvalidAppKeyIndex = 0x03,
    /// 0x04
    InvalidNetKeyIndex = 0x04,
    /// 0x05
    InsufficientResources = 0x05,
    /// 0x06
    KeyIndexAlreadyStored = 0x06,
    /// 0x07
    InvalidPublishParameters = 0x07,
    /// 0x08
    NotASubscribeModel = 0x08,
    /// 0x09
    StorageFailure = 0x09,
    /// 0x0A
    FeatureNotSupported = 0x0A,
    /// 0x0B
    CannotUpdate = 0x0B,
    /// 0x0C
    CannotRemove = 0x0C,
    /// 0x0D
    CannotBind = 0x0D,
    /// 0x0E
    TemporarilyUnableToChangeState = 0x0E,
    /// 0x0F
    CannotSet = 0x0F,
    /// 0x10
    UnspecifiedError = 0x10,
    /// 0x11
    InvalidBinding = 0x11,
}

impl ConfigStatus {
    /// Whether the request succeeded.
    pub fn is_success(self) -> bool {
        self == ConfigStatus::Success
    }

    fn decode(opcode: u32, byte: u8) -> Result<Self, AccessError> {
        use ConfigStatus::*;
        Ok(match byte {
            0x00 => Success,
            0x01 => InvalidAddress,
            0x02 => InvalidModel,
            0x03 => InvalidAppKeyIndex,
            0x04 => InvalidNetKeyIndex,
            0x05 => InsufficientResources,
            0x06 => KeyIndexAlreadyStored,
            0x07 => InvalidPublishParameters,
            0x08 => NotASubscribeModel,
            0x09 => StorageFailure,
            0x0A => FeatureNotSupported,
            0x0B => CannotUpdate,
            0x0C => CannotRemove,
            0x0D => CannotBind,
            0x0E => TemporarilyUnableToChangeState,
            0x0F => CannotSet,
            0x10 => UnspecifiedError,
            0x11 => InvalidBinding,
            _ => {
                return Err(AccessError::InvalidValue {
                    opcode,
                    field: "status",
                });
            }
        })
    }
}

fn encode_key_indexes(first: KeyIndex, second: KeyIndex, out: &mut Vec<u8>) {
    let packed = u32::from(first & 0x0FFF) | (u32::from(second & 0x0FFF) << 12);
    out.extend_from_slice(&packed.to_le_bytes()[..3]);
}

fn decode_key_indexes(bytes: &[u8]) -> (KeyIndex, KeyIndex) {
    let packed = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]);
    ((packed & 0x0FFF) as u16, ((packed >> 12) & 0x0FFF) as u16)
}

fn encode_model_id(id: ModelId, out: &mut Vec<u8>) {
    match id {
        ModelId::Sig(model) => out.extend_from_slice(&model.to_le_bytes()),
        ModelId::Vendor {
            company_id,
            model_id,
        } => {
            out.extend_from_slice(&company_id.to_le_bytes());
            out.extend_from_slice(&model_id.to_le_bytes());
        }
    }
}

fn decode_model_id(bytes: &[u8]) -> ModelId {
    let first = u16::from_le_bytes([bytes[0], bytes[1]]);
    match bytes.get(2..4) {
        Some(rest) => ModelId::Vendor {
            company_id: first,
            model_id: u16::from_le_bytes([rest[0], rest[1]]),
        },
        None => ModelId::Sig(first),
    }
}

fn model_id_len(id: ModelId) -> usize {
    match id {
        ModelId::Sig(_) => 2,
        ModelId::Vendor { .. } => 4,
    }
}

// ---------------------------------------------------------------------------
// AppKey Add / Status
// ---------------------------------------------------------------------------

/// Sends an application key to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigAppKeyAdd {
    /// Network key the application key is bound to.
    pub net_key_index: KeyIndex,
    /// Application key index.
    pub app_key_index: KeyIndex,
    /// Key value.
    pub key: Key,
}

impl ConfigAppKeyAdd {
    /// Add `key` to a node.
    pub fn new(key: &ApplicationKey) -> Self {
        Self {
            net_key_index: key.bound_network_key(),
            app_key_index: key.index(),
            key: key.key().clone(),
        }
    }
}

impl MeshMessage for ConfigAppKeyAdd {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(19);
        encode_key_indexes(self.net_key_index, self.app_key_index, &mut out);
        out.extend_from_slice(self.key.as_bytes());
        out
    }

    fn response_opcode(&self) -> Option<u32> {
        Some(Self::RESPONSE_OPCODE)
    }

    fn uses_device_key(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for ConfigAppKeyAdd {
    const OPCODE: u32 = CONFIG_APP_KEY_ADD;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        expect_length(Self::OPCODE, parameters, &[19])?;
        let (net_key_index, app_key_index) = decode_key_indexes(parameters);
        let mut key = [0u8; 16];
        key.copy_from_slice(&parameters[3..]);
        Ok(Self {
            net_key_index,
            app_key_index,
            key: Key::new(key),
        })
    }
}

impl AcknowledgedMessage for ConfigAppKeyAdd {
    const RESPONSE_OPCODE: u32 = CONFIG_APP_KEY_STATUS;
}

/// Result of an AppKey Add.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigAppKeyStatus {
    /// Status code.
    pub status: ConfigStatus,
    /// Network key index.
    pub net_key_index: KeyIndex,
    /// Application key index.
    pub app_key_index: KeyIndex,
}

impl MeshMessage for ConfigAppKeyStatus {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        let mut out = vec![self.status as u8];
        encode_key_indexes(self.net_key_index, self.app_key_index, &mut out);
        out
    }

    fn uses_device_key(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for ConfigAppKeyStatus {
    const OPCODE: u32 = CONFIG_APP_KEY_STATUS;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        expect_length(Self::OPCODE, parameters, &[4])?;
        let status = ConfigStatus::decode(Self::OPCODE, parameters[0])?;
        let (net_key_index, app_key_index) = decode_key_indexes(&parameters[1..]);
        Ok(Self {
            status,
            net_key_index,
            app_key_index,
        })
    }
}

// ---------------------------------------------------------------------------
// Model App Bind / Status
// ---------------------------------------------------------------------------

/// Binds an application key to a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigModelAppBind {
    /// Address of the element holding the model.
    pub element_address: Address,
    /// Application key index.
    pub app_key_index: KeyIndex,
    /// Target model.
    pub model_id: ModelId,
}

fn encode_model_app(element: Address, app: KeyIndex, model: ModelId, out: &mut Vec<u8>) {
    out.extend_from_slice(&element.value().to_le_bytes());
    out.extend_from_slice(&app.to_le_bytes());
    encode_model_id(model, out);
}

fn decode_model_app(opcode: u32, bytes: &[u8]) -> Result<(Address, KeyIndex, ModelId), AccessError> {
    let element = Address::new(u16::from_le_bytes([bytes[0], bytes[1]]));
    if !element.is_unicast() {
        return Err(AccessError::InvalidValue {
            opcode,
            field: "elementAddress",
        });
    }
    let app = u16::from_le_bytes([bytes[2], bytes[3]]) & 0x0FFF;
    Ok((element, app, decode_model_id(&bytes[4..])))
}

impl MeshMessage for ConfigModelAppBind {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(4 + model_id_len(self.model_id));
        encode_model_app(self.element_address, self.app_key_index, self.model_id, &mut out);
        out
    }

    fn response_opcode(&self) -> Option<u32> {
        Some(Self::RESPONSE_OPCODE)
    }

    fn uses_device_key(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for ConfigModelAppBind {
    const OPCODE: u32 = CONFIG_MODEL_APP_BIND;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        expect_length(Self::OPCODE, parameters, &[6, 8])?;
        let (element_address, app_key_index, model_id) = decode_model_app(Self::OPCODE, parameters)?;
        Ok(Self {
            element_address,
            app_key_index,
            model_id,
        })
    }
}

impl AcknowledgedMessage for ConfigModelAppBind {
    const RESPONSE_OPCODE: u32 = CONFIG_MODEL_APP_STATUS;
}

/// Result of a Model App Bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigModelAppStatus {
    /// Status code.
    pub status: ConfigStatus,
    /// Address of the element holding the model.
    pub element_address: Address,
    /// Application key index.
    pub app_key_index: KeyIndex,
    /// Target model.
    pub model_id: ModelId,
}

impl MeshMessage for ConfigModelAppStatus {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        let mut out = vec![self.status as u8];
        encode_model_app(self.element_address, self.app_key_index, self.model_id, &mut out);
        out
    }

    fn uses_device_key(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for ConfigModelAppStatus {
    const OPCODE: u32 = CONFIG_MODEL_APP_STATUS;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        expect_length(Self::OPCODE, parameters, &[7, 9])?;
        let status = ConfigStatus::decode(Self::OPCODE, parameters[0])?;
        let (element_address, app_key_index, model_id) =
            decode_model_app(Self::OPCODE, &parameters[1..])?;
        Ok(Self {
            status,
            element_address,
            app_key_index,
            model_id,
        })
    }
}

// ---------------------------------------------------------------------------
// Node Reset / Status
// ---------------------------------------------------------------------------

/// Asks a node to leave the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigNodeReset;

impl MeshMessage for ConfigNodeReset {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        Vec::new()
    }

    fn response_opcode(&self) -> Option<u32> {
        Some(Self::RESPONSE_OPCODE)
    }

    fn uses_device_key(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for ConfigNodeReset {
    const OPCODE: u32 = CONFIG_NODE_RESET;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        expect_length(Self::OPCODE, parameters, &[0])?;
        Ok(Self)
    }
}

impl AcknowledgedMessage for ConfigNodeReset {
    const RESPONSE_OPCODE: u32 = CONFIG_NODE_RESET_STATUS;
}

/// Confirms that a node was reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigNodeResetStatus;

impl MeshMessage for ConfigNodeResetStatus {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        Vec::new()
    }

    fn uses_device_key(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for ConfigNodeResetStatus {
    const OPCODE: u32 = CONFIG_NODE_RESET_STATUS;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        expect_length(Self::OPCODE, parameters, &[0])?;
        Ok(Self)
    }
}
