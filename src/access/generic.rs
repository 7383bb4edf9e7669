//! Generic OnOff and Generic HSL messages.
//!
//! Multi-byte fields are little-endian. Set messages carry a tid and an
//! optional transition; status messages carry an optional target and
//! remaining time.

use std::any::Any;

use super::transition::{Transition, TransitionTime};
use super::expect_length;
use crate::core::{
    AccessError, AcknowledgedMessage, MeshMessage, StaticMeshMessage, TransactionMessage,
};

/// Generic OnOff Get opcode.
pub const GENERIC_ON_OFF_GET: u32 = 0x8201;
/// Generic OnOff Set opcode.
pub const GENERIC_ON_OFF_SET: u32 = 0x8202;
/// Generic OnOff Set Unacknowledged opcode.
pub const GENERIC_ON_OFF_SET_UNACKNOWLEDGED: u32 = 0x8203;
/// Generic OnOff Status opcode.
pub const GENERIC_ON_OFF_STATUS: u32 = 0x8204;
/// Light HSL Set opcode.
pub const GENERIC_HSL_SET: u32 = 0x8276;
/// Light HSL Set Unacknowledged opcode.
pub const GENERIC_HSL_SET_UNACKNOWLEDGED: u32 = 0x8277;
/// Light HSL Status opcode.
pub const GENERIC_HSL_STATUS: u32 = 0x8278;

fn decode_on_off(opcode: u32, byte: u8) -> Result<bool, AccessError> {
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(AccessError::InvalidValue {
            opcode,
            field: "onOff",
        }),
    }
}

fn u16_at(parameters: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([parameters[offset], parameters[offset + 1]])
}

// ---------------------------------------------------------------------------
// Generic OnOff
// ---------------------------------------------------------------------------

/// Reads the OnOff state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenericOnOffGet;

impl MeshMessage for GenericOnOffGet {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        Vec::new()
    }

    fn response_opcode(&self) -> Option<u32> {
        Some(Self::RESPONSE_OPCODE)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for GenericOnOffGet {
    const OPCODE: u32 = GENERIC_ON_OFF_GET;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        expect_length(Self::OPCODE, parameters, &[0])?;
        Ok(Self)
    }
}

impl AcknowledgedMessage for GenericOnOffGet {
    const RESPONSE_OPCODE: u32 = GENERIC_ON_OFF_STATUS;
}

/// Sets the OnOff state and expects a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericOnOffSet {
    /// Target state.
    pub on: bool,
    /// Transaction identifier.
    pub tid: u8,
    /// Optional transition.
    pub transition: Option<Transition>,
}

/// Sets the OnOff state without a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericOnOffSetUnacknowledged {
    /// Target state.
    pub on: bool,
    /// Transaction identifier.
    pub tid: u8,
    /// Optional transition.
    pub transition: Option<Transition>,
}

fn encode_on_off_set(on: bool, tid: u8, transition: Option<Transition>) -> Vec<u8> {
    let mut out = vec![u8::from(on), tid];
    Transition::encode(transition, &mut out);
    out
}

fn decode_on_off_set(
    opcode: u32,
    parameters: &[u8],
) -> Result<(bool, u8, Option<Transition>), AccessError> {
    expect_length(opcode, parameters, &[2, 4])?;
    let on = decode_on_off(opcode, parameters[0])?;
    let transition = Transition::decode(opcode, &parameters[2..])?;
    Ok((on, parameters[1], transition))
}

impl GenericOnOffSet {
    /// Immediate set.
    pub fn new(on: bool, tid: u8) -> Self {
        Self {
            on,
            tid,
            transition: None,
        }
    }
}

impl MeshMessage for GenericOnOffSet {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        encode_on_off_set(self.on, self.tid, self.transition)
    }

    fn response_opcode(&self) -> Option<u32> {
        Some(Self::RESPONSE_OPCODE)
    }

    fn tid(&self) -> Option<u8> {
        Some(self.tid)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for GenericOnOffSet {
    const OPCODE: u32 = GENERIC_ON_OFF_SET;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        let (on, tid, transition) = decode_on_off_set(Self::OPCODE, parameters)?;
        Ok(Self {
            on,
            tid,
            transition,
        })
    }
}

impl AcknowledgedMessage for GenericOnOffSet {
    const RESPONSE_OPCODE: u32 = GENERIC_ON_OFF_STATUS;
}

impl TransactionMessage for GenericOnOffSet {
    fn set_tid(&mut self, tid: u8) {
        self.tid = tid;
    }
}

impl GenericOnOffSetUnacknowledged {
    /// Immediate set.
    pub fn new(on: bool, tid: u8) -> Self {
        Self {
            on,
            tid,
            transition: None,
        }
    }
}

impl MeshMessage for GenericOnOffSetUnacknowledged {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        encode_on_off_set(self.on, self.tid, self.transition)
    }

    fn tid(&self) -> Option<u8> {
        Some(self.tid)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for GenericOnOffSetUnacknowledged {
    const OPCODE: u32 = GENERIC_ON_OFF_SET_UNACKNOWLEDGED;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        let (on, tid, transition) = decode_on_off_set(Self::OPCODE, parameters)?;
        Ok(Self {
            on,
            tid,
            transition,
        })
    }
}

impl TransactionMessage for GenericOnOffSetUnacknowledged {
    fn set_tid(&mut self, tid: u8) {
        self.tid = tid;
    }
}

/// Current OnOff state, with the target while a transition runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericOnOffStatus {
    /// Present state.
    pub present: bool,
    /// Target state and remaining time.
    pub target: Option<(bool, TransitionTime)>,
}

impl GenericOnOffStatus {
    /// Status without a running transition.
    pub fn new(present: bool) -> Self {
        Self {
            present,
            target: None,
        }
    }
}

impl MeshMessage for GenericOnOffStatus {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        let mut out = vec![u8::from(self.present)];
        if let Some((target, remaining)) = self.target {
            out.push(u8::from(target));
            out.push(remaining.to_byte());
        }
        out
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for GenericOnOffStatus {
    const OPCODE: u32 = GENERIC_ON_OFF_STATUS;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        expect_length(Self::OPCODE, parameters, &[1, 3])?;
        let present = decode_on_off(Self::OPCODE, parameters[0])?;
        let target = match parameters.len() {
            3 => Some((
                decode_on_off(Self::OPCODE, parameters[1])?,
                TransitionTime::from_byte(parameters[2]),
            )),
            _ => None,
        };
        Ok(Self { present, target })
    }
}

// ---------------------------------------------------------------------------
// Generic HSL
// ---------------------------------------------------------------------------

/// HSL state: lightness, hue and saturation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hsl {
    /// Lightness.
    pub lightness: u16,
    /// Hue.
    pub hue: u16,
    /// Saturation.
    pub saturation: u16,
}

impl Hsl {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.lightness.to_le_bytes());
        out.extend_from_slice(&self.hue.to_le_bytes());
        out.extend_from_slice(&self.saturation.to_le_bytes());
    }

    fn decode(parameters: &[u8]) -> Self {
        Self {
            lightness: u16_at(parameters, 0),
            hue: u16_at(parameters, 2),
            saturation: u16_at(parameters, 4),
        }
    }
}

/// Sets the HSL state and expects a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericHslSet {
    /// Target state.
    pub hsl: Hsl,
    /// Transaction identifier.
    pub tid: u8,
    /// Optional transition.
    pub transition: Option<Transition>,
}

/// Sets the HSL state without a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericHslSetUnacknowledged {
    /// Target state.
    pub hsl: Hsl,
    /// Transaction identifier.
    pub tid: u8,
    /// Optional transition.
    pub transition: Option<Transition>,
}

fn encode_hsl_set(hsl: &Hsl, tid: u8, transition: Option<Transition>) -> Vec<u8> {
    let mut out = Vec::with_capacity(9);
    hsl.encode(&mut out);
    out.push(tid);
    Transition::encode(transition, &mut out);
    out
}

fn decode_hsl_set(
    opcode: u32,
    parameters: &[u8],
) -> Result<(Hsl, u8, Option<Transition>), AccessError> {
    expect_length(opcode, parameters, &[7, 9])?;
    let transition = Transition::decode(opcode, &parameters[7..])?;
    Ok((Hsl::decode(parameters), parameters[6], transition))
}

impl MeshMessage for GenericHslSet {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        encode_hsl_set(&self.hsl, self.tid, self.transition)
    }

    fn response_opcode(&self) -> Option<u32> {
        Some(Self::RESPONSE_OPCODE)
    }

    fn tid(&self) -> Option<u8> {
        Some(self.tid)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for GenericHslSet {
    const OPCODE: u32 = GENERIC_HSL_SET;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        let (hsl, tid, transition) = decode_hsl_set(Self::OPCODE, parameters)?;
        Ok(Self {
            hsl,
            tid,
            transition,
        })
    }
}

impl AcknowledgedMessage for GenericHslSet {
    const RESPONSE_OPCODE: u32 = GENERIC_HSL_STATUS;
}

impl TransactionMessage for GenericHslSet {
    fn set_tid(&mut self, tid: u8) {
        self.tid = tid;
    }
}

impl MeshMessage for GenericHslSetUnacknowledged {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        encode_hsl_set(&self.hsl, self.tid, self.transition)
    }

    fn tid(&self) -> Option<u8> {
        Some(self.tid)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for GenericHslSetUnacknowledged {
    const OPCODE: u32 = GENERIC_HSL_SET_UNACKNOWLEDGED;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        let (hsl, tid, transition) = decode_hsl_set(Self::OPCODE, parameters)?;
        Ok(Self {
            hsl,
            tid,
            transition,
        })
    }
}

impl TransactionMessage for GenericHslSetUnacknowledged {
    fn set_tid(&mut self, tid: u8) {
        self.tid = tid;
    }
}

/// Current HSL state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenericHslStatus {
    /// Present state.
    pub hsl: Hsl,
    /// Remaining transition time.
    pub remaining: Option<TransitionTime>,
}

impl MeshMessage for GenericHslStatus {
    fn opcode(&self) -> u32 {
        Self::OPCODE
    }

    fn parameters(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(7);
        self.hsl.encode(&mut out);
        if let Some(remaining) = self.remaining {
            out.push(remaining.to_byte());
        }
        out
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl StaticMeshMessage for GenericHslStatus {
    const OPCODE: u32 = GENERIC_HSL_STATUS;

    fn decode(parameters: &[u8]) -> Result<Self, AccessError> {
        expect_length(Self::OPCODE, parameters, &[6, 7])?;
        Ok(Self {
            hsl: Hsl::decode(parameters),
            remaining: parameters.get(6).map(|&b| TransitionTime::from_byte(b)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::transition::StepResolution;

    fn transition() -> Option<Transition> {
        Some(Transition {
            time: TransitionTime::new(5, StepResolution::Seconds).unwrap(),
            delay: 10,
        })
    }

    #[test]
    fn test_on_off_set_short_and_long_forms() {
        let short = GenericOnOffSet::new(true, 7);
        assert_eq!(short.parameters(), vec![0x01, 0x07]);
        assert_eq!(GenericOnOffSet::decode(&short.parameters()), Ok(short));

        let long = GenericOnOffSet {
            transition: transition(),
            ..short
        };
        assert_eq!(long.parameters(), vec![0x01, 0x07, 0x45, 0x0A]);
        assert_eq!(GenericOnOffSet::decode(&long.parameters()), Ok(long));
    }

    #[test]
    fn test_on_off_set_rejects_bad_input() {
        assert_eq!(
            GenericOnOffSet::decode(&[0x01, 0x07, 0x45]),
            Err(AccessError::InvalidLength {
                opcode: GENERIC_ON_OFF_SET,
                length: 3
            })
        );
        assert_eq!(
            GenericOnOffSetUnacknowledged::decode(&[0x02, 0x07]),
            Err(AccessError::InvalidValue {
                opcode: GENERIC_ON_OFF_SET_UNACKNOWLEDGED,
                field: "onOff"
            })
        );
        assert!(GenericOnOffGet::decode(&[0x00]).is_err());
    }

    #[test]
    fn test_on_off_capabilities() {
        let set = GenericOnOffSet::new(false, 1);
        assert_eq!(set.response_opcode(), Some(GENERIC_ON_OFF_STATUS));
        assert_eq!(set.tid(), Some(1));

        let unack = GenericOnOffSetUnacknowledged::new(false, 1);
        assert_eq!(unack.response_opcode(), None);
        assert_eq!(GenericOnOffGet.tid(), None);
    }

    #[test]
    fn test_on_off_status_forms() {
        let status = GenericOnOffStatus::new(true);
        assert_eq!(GenericOnOffStatus::decode(&status.parameters()), Ok(status));

        let transitioning = GenericOnOffStatus {
            present: false,
            target: Some((true, TransitionTime::from_byte(0x45))),
        };
        assert_eq!(transitioning.parameters(), vec![0x00, 0x01, 0x45]);
        assert_eq!(GenericOnOffStatus::decode(&transitioning.parameters()), Ok(transitioning));
        assert!(GenericOnOffStatus::decode(&[0x00, 0x01]).is_err());
    }

    #[test]
    fn test_hsl_set_unacknowledged_layout() {
        let message = GenericHslSetUnacknowledged {
            hsl: Hsl {
                lightness: 0x1234,
                hue: 0xABCD,
                saturation: 0x0001,
            },
            tid: 9,
            transition: None,
        };
        assert_eq!(
            message.parameters(),
            vec![0x34, 0x12, 0xCD, 0xAB, 0x01, 0x00, 0x09]
        );
        assert_eq!(GenericHslSetUnacknowledged::decode(&message.parameters()), Ok(message));

        let long = GenericHslSetUnacknowledged {
            transition: transition(),
            ..message
        };
        assert_eq!(long.parameters().len(), 9);
        assert_eq!(GenericHslSetUnacknowledged::decode(&long.parameters()), Ok(long));

        for bad in [6usize, 8, 10] {
            assert!(GenericHslSetUnacknowledged::decode(&vec![0; bad]).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_hsl_set_and_status() {
        let set = GenericHslSet {
            hsl: Hsl::default(),
            tid: 1,
            transition: None,
        };
        assert_eq!(set.response_opcode(), Some(GENERIC_HSL_STATUS));

        let status = GenericHslStatus {
            hsl: Hsl {
                lightness: 1,
                hue: 2,
                saturation: 3,
            },
            remaining: Some(TransitionTime::IMMEDIATE),
        };
        assert_eq!(GenericHslStatus::decode(&status.parameters()), Ok(status));
        assert!(GenericHslStatus::decode(&[0; 5]).is_err());
    }
}
