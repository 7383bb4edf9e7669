//! Transport layer: network PDUs, lower transport segmentation and upper
//! transport encryption.
//!
//! - **Network PDUs**: [`NetworkPdu`] encryption and header obfuscation
//! - **Lower transport**: [`LowerTransportPdu`], segmentation and SeqAuth
//! - **Upper transport**: [`encrypt_access`] / [`decrypt_access`]
//! - **Exchanges**: [`SegmentedExchange`] retransmission state machine
//! - **Reassembly**: [`Reassembler`] with block acks and a busy limit
//! - **Bearers**: the [`Bearer`] trait and an in-process [`ChannelBearer`]
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            Access Layer                 │
//! ├─────────────────────────────────────────┤
//! │       Upper Transport (TransMIC)        │
//! ├─────────────────────────────────────────┤
//! │   Lower Transport (segments, acks)      │  ← This module
//! ├─────────────────────────────────────────┤
//! │       Network (NetMIC, privacy)         │
//! ├─────────────────────────────────────────┤
//! │              Bearer                     │
//! └─────────────────────────────────────────┘
//! ```

mod bearer;
mod error;
mod exchange;
mod lower;
mod network_pdu;
mod reassembly;
mod sequence;
mod upper;

pub use bearer::{Bearer, ChannelBearer, ChannelBearerBuilder};
pub use error::TransportError;
pub use exchange::{AckOutcome, ExchangeState, RetransmitPolicy, SegmentedExchange, TimerOutcome};
pub use lower::{LowerTransportPdu, Segment, SegmentAck, full_block_ack, seq_auth, seq_zero, segment};
pub use network_pdu::{
    MAX_NETWORK_PDU_SIZE, MIN_NETWORK_PDU_SIZE, NetworkHeader, NetworkPdu, peek_ivi_nid,
};
pub use reassembly::{ReassemblyLimits, Reassembler, SegmentOutcome};
pub use sequence::SequenceCounter;
pub use upper::{AccessKey, UpperContext, decrypt_access, encrypt_access};

use crate::core::MAX_UNSEGMENTED_ACCESS_PAYLOAD;

/// Whether an access PDU of `len` bytes must be segmented.
pub fn requires_segmentation(len: usize) -> bool {
    len > MAX_UNSEGMENTED_ACCESS_PAYLOAD
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{ApplicationKeyMaterial, NetworkKeyMaterial};
    use crate::network::{Address, IvIndex, Key};

    #[test]
    fn test_segmentation_threshold() {
        assert!(!requires_segmentation(MAX_UNSEGMENTED_ACCESS_PAYLOAD));
        assert!(requires_segmentation(MAX_UNSEGMENTED_ACCESS_PAYLOAD + 1));
    }

    /// Access PDU through every layer and back.
    #[test]
    fn test_full_stack_segmented() {
        let net = NetworkKeyMaterial::derive(&Key::new([1; 16])).unwrap();
        let app = AccessKey::application(&ApplicationKeyMaterial::derive(&Key::new([2; 16])).unwrap());
        let iv = IvIndex::new(3);
        let src = Address::new(0x0001);
        let dst = Address::new(0x0010);
        let access: Vec<u8> = (0..40).collect();
        let first_seq = 0x0100;

        let ctx = UpperContext {
            seq_auth: first_seq,
            src,
            dst,
            iv_index: iv.transmit_index(),
            label: None,
        };
        let upper = encrypt_access(&access, &app, &ctx).unwrap();
        let segments = segment(app.akf(), app.aid(), first_seq, &upper).unwrap();

        let mut reassembler = Reassembler::default();
        let now = tokio::time::Instant::now();
        let mut result = None;
        for (i, seg) in segments.into_iter().enumerate().rev() {
            let seq = first_seq + i as u32;
            let raw = NetworkPdu {
                ctl: false,
                ttl: 5,
                seq,
                src,
                dst,
                transport_pdu: LowerTransportPdu::SegmentedAccess(seg).encode(),
            }
            .encode(&net, iv.transmit_index())
            .unwrap();

            let header = NetworkHeader::deobfuscate(&raw, &net, iv).unwrap();
            let pdu = header.open(&raw, &net).unwrap();
            let LowerTransportPdu::SegmentedAccess(seg) =
                LowerTransportPdu::decode(pdu.ctl, &pdu.transport_pdu).unwrap()
            else {
                panic!("expected a segment");
            };
            let auth = seq_auth(pdu.seq, seg.seq_zero);
            if let SegmentOutcome::Complete { upper_pdu, .. } =
                reassembler.on_segment(pdu.src, auth, &seg, now)
            {
                result = Some(decrypt_access(&upper_pdu, &app, &UpperContext { seq_auth: auth, ..ctx }).unwrap());
            }
        }
        assert_eq!(result, Some(access));
    }
}
