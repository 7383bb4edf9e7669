//! Variable-width access opcodes.
//!
//! The leading byte selects the width:
//!
//! ```text
//! 0xxxxxxx                      1 byte  (0x7F reserved)
//! 10xxxxxx xxxxxxxx             2 bytes
//! 11xxxxxx cccccccc cccccccc    3 bytes, 6-bit opcode + company id (LE)
//! ```
//!
//! Opcodes are held as `u32` whose low bytes are the wire bytes in order,
//! so `0x8201` is sent as `[0x82, 0x01]`.

use crate::core::{AccessError, MeshMessage};

const RESERVED_OPCODE: u8 = 0x7F;

/// Width of an opcode on the wire.
pub fn opcode_len(opcode: u32) -> Result<usize, AccessError> {
    match opcode {
        0x00..=0x7E => Ok(1),
        0x7F => Err(AccessError::ReservedOpcode(RESERVED_OPCODE)),
        0x8000..=0xBFFF => Ok(2),
        0xC0_0000..=0xFF_FFFF => Ok(3),
        _ => Err(AccessError::InvalidOpcode(opcode)),
    }
}

/// Build a vendor opcode from its 6-bit opcode and company id.
pub fn vendor_opcode(opcode: u8, company_id: u16) -> u32 {
    let [low, high] = company_id.to_le_bytes();
    (u32::from(0xC0 | (opcode & 0x3F)) << 16) | (u32::from(low) << 8) | u32::from(high)
}

/// Company id of a vendor opcode.
pub fn company_id(opcode: u32) -> Option<u16> {
    (opcode_len(opcode).ok()? == 3).then(|| u16::from_le_bytes([(opcode >> 8) as u8, opcode as u8]))
}

/// Append the wire bytes of `opcode` to `out`.
pub fn encode_opcode(opcode: u32, out: &mut Vec<u8>) -> Result<(), AccessError> {
    let len = opcode_len(opcode)?;
    let bytes = opcode.to_be_bytes();
    out.extend_from_slice(&bytes[4 - len..]);
    Ok(())
}

/// Split an access PDU into opcode and parameters.
pub fn decode_opcode(pdu: &[u8]) -> Result<(u32, &[u8]), AccessError> {
    let first = *pdu.first().ok_or(AccessError::Empty)?;
    let len = match first {
        RESERVED_OPCODE => return Err(AccessError::ReservedOpcode(first)),
        b if b & 0x80 == 0 => 1,
        b if b & 0xC0 == 0x80 => 2,
        _ => 3,
    };
    if pdu.len() < len {
        return Err(AccessError::TruncatedOpcode);
    }
    let opcode = pdu[..len]
        .iter()
        .fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
    Ok((opcode, &pdu[len..]))
}

/// Encode a message as an access PDU: opcode followed by parameters.
pub fn encode_access_pdu(message: &dyn MeshMessage) -> Result<Vec<u8>, AccessError> {
    let parameters = message.parameters();
    let mut pdu = Vec::with_capacity(3 + parameters.len());
    encode_opcode(message.opcode(), &mut pdu)?;
    pdu.extend_from_slice(&parameters);
    Ok(pdu)
}
