//! Access layer: opcodes, message encoding and the message registry.

pub mod config;
pub mod generic;
mod opcode;
mod registry;
mod transition;

pub use opcode::{company_id, decode_opcode, encode_access_pdu, encode_opcode, opcode_len, vendor_opcode};
pub use registry::{MessageRegistry, UnknownMessage};
pub use transition::{StepResolution, TidCounter, Transition, TransitionTime};

use crate::core::AccessError;

/// Accept only the listed parameter lengths.
pub(crate) fn expect_length(
    opcode: u32,
    parameters: &[u8],
    allowed: &[usize],
) -> Result<(), AccessError> {
    if allowed.contains(&parameters.len()) {
        Ok(())
    } else {
        Err(AccessError::InvalidLength {
            opcode,
            length: parameters.len(),
        })
    }
}
