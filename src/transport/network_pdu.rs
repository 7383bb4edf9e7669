//! Network PDU encryption and header obfuscation.
//!
//! Wire layout:
//!
//! ```text
//! +---------+-----------------------------+------------------------------+
//! | IVI|NID | CTL|TTL  SEQ (3)  SRC (2)   | DST (2) | transport | NetMIC |
//! | 1 byte  | 6 bytes, obfuscated         | encrypted, tag appended      |
//! +---------+-----------------------------+------------------------------+
//! ```
//!
//! The header fields are bound to the ciphertext through the nonce; the
//! first byte is passed as associated data. The privacy random is the first
//! seven ciphertext bytes.

use crate::core::{
    MAX_SEQUENCE_NUMBER, MAX_TTL, MAX_UNSEGMENTED_ACCESS_PAYLOAD, MIC_SIZE, NETWORK_HEADER_SIZE,
    OBFUSCATED_HEADER_SIZE, PRIVACY_RANDOM_SIZE,
};
use crate::crypto::{NetworkKeyMaterial, decrypt, encrypt, network_nonce, obfuscate};
use crate::network::{Address, IvIndex};

use super::TransportError;

/// Smallest valid network PDU: header, destination, one transport byte, MIC.
pub const MIN_NETWORK_PDU_SIZE: usize = NETWORK_HEADER_SIZE + 2 + 1 + MIC_SIZE;

/// Largest network PDU the stack emits: an unsegmented access message with
/// a full payload, its TransMIC and the NetMIC. Segments and acks are smaller.
pub const MAX_NETWORK_PDU_SIZE: usize =
    NETWORK_HEADER_SIZE + 2 + 1 + MAX_UNSEGMENTED_ACCESS_PAYLOAD + 2 * MIC_SIZE;

/// A decrypted network PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkPdu {
    /// Control message flag; set for segment acknowledgments.
    pub ctl: bool,
    /// Time to live.
    pub ttl: u8,
    /// 24-bit sequence number.
    pub seq: u32,
    /// Source element.
    pub src: Address,
    /// Destination address.
    pub dst: Address,
    /// Lower transport PDU.
    pub transport_pdu: Vec<u8>,
}

/// Least significant bit of the IV index and the NID of a raw PDU.
pub fn peek_ivi_nid(raw: &[u8]) -> Option<(u8, u8)> {
    raw.first().map(|b| (b >> 7, b & 0x7F))
}

fn ctl_ttl(ctl: bool, ttl: u8) -> u8 {
    (u8::from(ctl) << 7) | (ttl & MAX_TTL)
}

fn privacy_random(ciphertext: &[u8]) -> [u8; PRIVACY_RANDOM_SIZE] {
    let mut random = [0u8; PRIVACY_RANDOM_SIZE];
    random.copy_from_slice(&ciphertext[..PRIVACY_RANDOM_SIZE]);
    random
}

impl NetworkPdu {
    /// Encrypt and obfuscate with `material` under IV index `iv_index`.
    pub fn encode(
        &self,
        material: &NetworkKeyMaterial,
        iv_index: u32,
    ) -> Result<Vec<u8>, TransportError> {
        if self.ttl > MAX_TTL {
            return Err(TransportError::InvalidField("ttl"));
        }
        if self.seq > MAX_SEQUENCE_NUMBER {
            return Err(TransportError::InvalidField("seq"));
        }
        if !self.src.is_unicast() {
            return Err(TransportError::InvalidField("src"));
        }
        if self.dst.is_unassigned() {
            return Err(TransportError::InvalidField("dst"));
        }
        if self.transport_pdu.is_empty() {
            return Err(TransportError::InvalidField("transport pdu"));
        }

        let first = ((iv_index & 1) as u8) << 7 | material.nid;
        let ctl_ttl = ctl_ttl(self.ctl, self.ttl);
        let nonce = network_nonce(ctl_ttl, self.seq, self.src.value(), iv_index);

        let mut plaintext = Vec::with_capacity(2 + self.transport_pdu.len());
        plaintext.extend_from_slice(&self.dst.value().to_be_bytes());
        plaintext.extend_from_slice(&self.transport_pdu);
        let ciphertext = encrypt(&material.encryption_key, &nonce, &[first], &plaintext)?;

        let mut header = [0u8; OBFUSCATED_HEADER_SIZE];
        header[0] = ctl_ttl;
        header[1..4].copy_from_slice(&self.seq.to_be_bytes()[1..]);
        header[4..6].copy_from_slice(&self.src.value().to_be_bytes());
        obfuscate(
            &mut header,
            &material.privacy_key,
            iv_index,
            &privacy_random(&ciphertext),
        );

        let mut out = Vec::with_capacity(1 + header.len() + ciphertext.len());
        out.push(first);
        out.extend_from_slice(&header);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }
}

/// Deobfuscated header of a received PDU, not yet authenticated.
///
/// Check it against the replay cache before calling
/// [`NetworkHeader::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkHeader {
    /// IV index selected by the IVI bit.
    pub iv_index: u32,
    /// Control message flag.
    pub ctl: bool,
    /// Time to live.
    pub ttl: u8,
    /// Sequence number.
    pub seq: u32,
    /// Source address.
    pub src: Address,
}

impl NetworkHeader {
    /// Recover the header of `raw` with `material`.
    ///
    /// Fails with [`TransportError::NoMatchingKey`] when the NID differs.
    pub fn deobfuscate(
        raw: &[u8],
        material: &NetworkKeyMaterial,
        iv_index: IvIndex,
    ) -> Result<Self, TransportError> {
        if raw.len() < MIN_NETWORK_PDU_SIZE {
            return Err(TransportError::PduTooShort {
                len: raw.len(),
                min: MIN_NETWORK_PDU_SIZE,
            });
        }
        let (ivi, nid) = peek_ivi_nid(raw).ok_or(TransportError::InvalidField("nid"))?;
        if nid != material.nid {
            return Err(TransportError::NoMatchingKey);
        }
        let iv_index = iv_index.receive_index(ivi);

        let mut header = [0u8; OBFUSCATED_HEADER_SIZE];
        header.copy_from_slice(&raw[1..NETWORK_HEADER_SIZE]);
        obfuscate(
            &mut header,
            &material.privacy_key,
            iv_index,
            &privacy_random(&raw[NETWORK_HEADER_SIZE..]),
        );

        let src = Address::new(u16::from_be_bytes([header[4], header[5]]));
        if !src.is_unicast() {
            return Err(TransportError::InvalidField("src"));
        }
        Ok(Self {
            iv_index,
            ctl: header[0] & 0x80 != 0,
            ttl: header[0] & MAX_TTL,
            seq: u32::from_be_bytes([0, header[1], header[2], header[3]]),
            src,
        })
    }

    /// Authenticate and decrypt the rest of `raw`.
    pub fn open(
        &self,
        raw: &[u8],
        material: &NetworkKeyMaterial,
    ) -> Result<NetworkPdu, TransportError> {
        let nonce = network_nonce(
            ctl_ttl(self.ctl, self.ttl),
            self.seq,
            self.src.value(),
            self.iv_index,
        );
        let plaintext = decrypt(
            &material.encryption_key,
            &nonce,
            &raw[..1],
            &raw[NETWORK_HEADER_SIZE..],
        )?;

        let dst = Address::new(u16::from_be_bytes([plaintext[0], plaintext[1]]));
        if dst.is_unassigned() {
            return Err(TransportError::InvalidField("dst"));
        }
        Ok(NetworkPdu {
            ctl: self.ctl,
            ttl: self.ttl,
            seq: self.seq,
            src: self.src,
            dst,
            transport_pdu: plaintext[2..].to_vec(),
        })
    }
}
