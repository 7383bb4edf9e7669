//! Lower transport PDUs: unsegmented access, access segments and segment
//! acknowledgments.
//!
//! ```text
//! unsegmented access  | 0 | AKF | AID(6) | upper transport PDU         |
//! segmented access    | 1 | AKF | AID(6) | SZMIC | SeqZero(13) | SegO(5) | SegN(5) | segment |
//! segment ack (CTL=1) | 0 | opcode 0x00  | OBO | SeqZero(13) | RFU(2) | BlockAck(32) |
//! ```

use crate::core::{
    MAX_SEGMENTED_PAYLOAD, MAX_SEGMENTS, MAX_SEQUENCE_NUMBER, MIC_SIZE, SEGMENT_ACK_OPCODE,
    SEGMENT_PAYLOAD_SIZE, SEQ_ZERO_MASK,
};

use super::TransportError;

const SEGMENTED_HEADER_SIZE: usize = 4;
const SEGMENT_ACK_SIZE: usize = 7;

/// One segment of a segmented access message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Application key flag; clear for device key messages.
    pub akf: bool,
    /// Application key identifier, zero when `akf` is clear.
    pub aid: u8,
    /// Low 13 bits of SeqAuth.
    pub seq_zero: u16,
    /// Segment offset.
    pub seg_o: u8,
    /// Number of the last segment.
    pub seg_n: u8,
    /// Slice of the upper transport PDU.
    pub payload: Vec<u8>,
}

/// Acknowledgment of received segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentAck {
    /// Sent by a friend on behalf of a low power node.
    pub obo: bool,
    /// SeqZero of the acknowledged message.
    pub seq_zero: u16,
    /// Bit `n` set when segment `n` was received; zero means busy.
    pub block_ack: u32,
}

/// A lower transport PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LowerTransportPdu {
    /// Upper transport PDU that fits a single network PDU.
    UnsegmentedAccess {
        /// Application key flag.
        akf: bool,
        /// Application key identifier.
        aid: u8,
        /// Encrypted access payload with TransMIC.
        upper_pdu: Vec<u8>,
    },
    /// One segment of a larger upper transport PDU.
    SegmentedAccess(Segment),
    /// Segment acknowledgment control message.
    SegmentAck(SegmentAck),
}

fn akf_aid(akf: bool, aid: u8) -> u8 {
    (u8::from(akf) << 6) | (aid & 0x3F)
}

impl LowerTransportPdu {
    /// Whether the PDU travels with the CTL bit set.
    pub fn is_control(&self) -> bool {
        matches!(self, Self::SegmentAck(_))
    }

    /// Wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::UnsegmentedAccess {
                akf,
                aid,
                upper_pdu,
            } => {
                let mut out = Vec::with_capacity(1 + upper_pdu.len());
                out.push(akf_aid(*akf, *aid));
                out.extend_from_slice(upper_pdu);
                out
            }
            Self::SegmentedAccess(segment) => {
                let seq_zero = segment.seq_zero & SEQ_ZERO_MASK as u16;
                let mut out = Vec::with_capacity(SEGMENTED_HEADER_SIZE + segment.payload.len());
                out.push(0x80 | akf_aid(segment.akf, segment.aid));
                out.push(((seq_zero >> 6) & 0x7F) as u8);
                out.push((((seq_zero & 0x3F) as u8) << 2) | ((segment.seg_o >> 3) & 0x03));
                out.push(((segment.seg_o & 0x07) << 5) | (segment.seg_n & 0x1F));
                out.extend_from_slice(&segment.payload);
                out
            }
            Self::SegmentAck(ack) => {
                let seq_zero = ack.seq_zero & SEQ_ZERO_MASK as u16;
                let mut out = Vec::with_capacity(SEGMENT_ACK_SIZE);
                out.push(SEGMENT_ACK_OPCODE);
                out.push((u8::from(ack.obo) << 7) | ((seq_zero >> 6) & 0x7F) as u8);
                out.push(((seq_zero & 0x3F) as u8) << 2);
                out.extend_from_slice(&ack.block_ack.to_be_bytes());
                out
            }
        }
    }

    /// Parse the transport PDU of a network PDU with the given CTL bit.
    pub fn decode(ctl: bool, bytes: &[u8]) -> Result<Self, TransportError> {
        let first = *bytes.first().ok_or(TransportError::PduTooShort { len: 0, min: 1 })?;
        let segmented = first & 0x80 != 0;

        if ctl {
            if segmented {
                return Err(TransportError::InvalidField("seg"));
            }
            if first & 0x7F != SEGMENT_ACK_OPCODE {
                return Err(TransportError::InvalidField("opcode"));
            }
            if bytes.len() != SEGMENT_ACK_SIZE {
                return Err(TransportError::InvalidField("segment ack length"));
            }
            let seq_zero = (u16::from(bytes[1] & 0x7F) << 6) | u16::from(bytes[2] >> 2);
            return Ok(Self::SegmentAck(SegmentAck {
                obo: bytes[1] & 0x80 != 0,
                seq_zero,
                block_ack: u32::from_be_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]),
            }));
        }

        let akf = first & 0x40 != 0;
        let aid = first & 0x3F;
        if !segmented {
            let min = 1 + MIC_SIZE + 1;
            if bytes.len() < min {
                return Err(TransportError::PduTooShort {
                    len: bytes.len(),
                    min,
                });
            }
            return Ok(Self::UnsegmentedAccess {
                akf,
                aid,
                upper_pdu: bytes[1..].to_vec(),
            });
        }

        let min = SEGMENTED_HEADER_SIZE + 1;
        if bytes.len() < min {
            return Err(TransportError::PduTooShort {
                len: bytes.len(),
                min,
            });
        }
        let seq_zero = (u16::from(bytes[1] & 0x7F) << 6) | u16::from(bytes[2] >> 2);
        let seg_o = ((bytes[2] & 0x03) << 3) | (bytes[3] >> 5);
        let seg_n = bytes[3] & 0x1F;
        if seg_o > seg_n {
            return Err(TransportError::InvalidSegment { seg_o, seg_n });
        }
        let payload = &bytes[SEGMENTED_HEADER_SIZE..];
        if payload.len() > SEGMENT_PAYLOAD_SIZE {
            return Err(TransportError::InvalidField("segment length"));
        }
        Ok(Self::SegmentedAccess(Segment {
            akf,
            aid,
            seq_zero,
            seg_o,
            seg_n,
            payload: payload.to_vec(),
        }))
    }
}

/// Split an upper transport PDU into segments of at most 12 bytes.
pub fn segment(
    akf: bool,
    aid: u8,
    seq_auth: u32,
    upper_pdu: &[u8],
) -> Result<Vec<Segment>, TransportError> {
    if upper_pdu.is_empty() || upper_pdu.len() > MAX_SEGMENTED_PAYLOAD {
        return Err(TransportError::PayloadTooLarge {
            size: upper_pdu.len(),
            max: MAX_SEGMENTED_PAYLOAD,
        });
    }
    let chunks: Vec<&[u8]> = upper_pdu.chunks(SEGMENT_PAYLOAD_SIZE).collect();
    debug_assert!(chunks.len() <= MAX_SEGMENTS);
    let seg_n = (chunks.len() - 1) as u8;
    Ok(chunks
        .into_iter()
        .enumerate()
        .map(|(seg_o, payload)| Segment {
            akf,
            aid,
            seq_zero: seq_zero(seq_auth),
            seg_o: seg_o as u8,
            seg_n,
            payload: payload.to_vec(),
        })
        .collect())
}

/// SeqZero carried by the segments of a message with this SeqAuth.
pub fn seq_zero(seq_auth: u32) -> u16 {
    (seq_auth & SEQ_ZERO_MASK) as u16
}

/// Recover the SeqAuth of a segment received with sequence number `seq`.
///
/// SeqAuth is the largest value not above `seq` whose low 13 bits equal
/// `seq_zero`.
pub fn seq_auth(seq: u32, seq_zero: u16) -> u32 {
    let delta = seq.wrapping_sub(u32::from(seq_zero)) & SEQ_ZERO_MASK;
    seq.wrapping_sub(delta) & MAX_SEQUENCE_NUMBER
}

/// Block ack with every segment `0..=seg_n` set.
pub fn full_block_ack(seg_n: u8) -> u32 {
    if u32::from(seg_n) >= 31 {
        u32::MAX
    } else {
        (1u32 << (seg_n + 1)) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsegmented_access_layout() {
        let pdu = LowerTransportPdu::UnsegmentedAccess {
            akf: true,
            aid: 0x15,
            upper_pdu: vec![0xAA; 20],
        };
        let bytes = pdu.encode();
        assert_eq!(bytes[0], 0x55);
        assert_eq!(LowerTransportPdu::decode(false, &bytes).unwrap(), pdu);
    }

    #[test]
    fn test_segment_header_layout() {
        let pdu = LowerTransportPdu::SegmentedAccess(Segment {
            akf: false,
            aid: 0,
            seq_zero: 0x1ABC,
            seg_o: 9,
            seg_n: 17,
            payload: vec![1, 2, 3],
        });
        let bytes = pdu.encode();
        // SeqZero 0x1ABC = 1_1010_1011_1100
        assert_eq!(&bytes[..4], &[0x80, 0x6A, 0xF1, 0x31]);
        assert_eq!(LowerTransportPdu::decode(false, &bytes).unwrap(), pdu);
    }

    #[test]
    fn test_segment_ack_layout() {
        let pdu = LowerTransportPdu::SegmentAck(SegmentAck {
            obo: false,
            seq_zero: 0x0042,
            block_ack: 0x0000_0007,
        });
        assert!(pdu.is_control());
        let bytes = pdu.encode();
        assert_eq!(bytes, vec![0x00, 0x01, 0x08, 0, 0, 0, 7]);
        assert_eq!(LowerTransportPdu::decode(true, &bytes).unwrap(), pdu);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(LowerTransportPdu::decode(false, &[]).is_err());
        assert!(LowerTransportPdu::decode(false, &[0x40, 1, 2]).is_err());
        // SegO greater than SegN.
        assert_eq!(
            LowerTransportPdu::decode(false, &[0x80, 0, 0x00, 0x41, 0]),
            Err(TransportError::InvalidSegment { seg_o: 2, seg_n: 1 })
        );
        assert!(LowerTransportPdu::decode(false, &[0x80, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]).is_err());
        assert!(LowerTransportPdu::decode(true, &[0x01, 0, 0, 0, 0, 0, 0]).is_err());
        assert!(LowerTransportPdu::decode(true, &[0x00, 0, 0]).is_err());
    }

    #[test]
    fn test_segmentation() {
        let upper = (0..40u8).collect::<Vec<_>>();
        let segments = segment(true, 3, 0x2005, &upper).unwrap();
        assert_eq!(segments.len(), 4);
        assert!(segments.iter().all(|s| s.seg_n == 3 && s.seq_zero == 0x0005));
        assert_eq!(segments[3].payload, vec![36, 37, 38, 39]);
        let joined: Vec<u8> = segments.iter().flat_map(|s| s.payload.clone()).collect();
        assert_eq!(joined, upper);

        assert!(segment(true, 3, 0, &vec![0; MAX_SEGMENTED_PAYLOAD]).is_ok());
        assert!(segment(true, 3, 0, &vec![0; MAX_SEGMENTED_PAYLOAD + 1]).is_err());
    }

    #[test]
    fn test_seq_auth_recovery() {
        assert_eq!(seq_auth(0x2010, 0x0005), 0x2005);
        assert_eq!(seq_auth(0x2005, 0x0005), 0x2005);
        // Later segment after SeqZero wrapped within the 13-bit window.
        assert_eq!(seq_auth(0x4002, 0x1FFE), 0x3FFE);
        assert_eq!(seq_zero(0x3FFE), 0x1FFE);
    }

    #[test]
    fn test_full_block_ack() {
        assert_eq!(full_block_ack(0), 0b1);
        assert_eq!(full_block_ack(3), 0b1111);
        assert_eq!(full_block_ack(31), u32::MAX);
    }
}
