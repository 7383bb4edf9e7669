//! Nonce construction for ChaCha20-Poly1305.
//!
//! All nonces are 12 bytes, big-endian fields:
//!
//! ```text
//! network:     [ 0x00 | CTL,TTL | SEQ (3) | SRC (2) | 0x00 | IV index (4) ]
//! application: [ 0x01 | SeqAuth (3) | SRC (2) | DST (2) | IV index (4) ]
//! device:      [ 0x02 | SeqAuth (3) | SRC (2) | DST (2) | IV index (4) ]
//! ```

use crate::core::NONCE_SIZE;

/// Nonce type byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NonceType {
    /// Network layer.
    Network,
    /// Upper transport, application key.
    Application,
    /// Upper transport, device key.
    Device,
}

impl NonceType {
    /// Byte representation.
    pub fn as_byte(self) -> u8 {
        match self {
            NonceType::Network => 0x00,
            NonceType::Application => 0x01,
            NonceType::Device => 0x02,
        }
    }
}

fn put_seq(out: &mut [u8], seq: u32) {
    out.copy_from_slice(&seq.to_be_bytes()[1..]);
}

/// Network layer nonce.
pub fn network_nonce(ctl_ttl: u8, seq: u32, src: u16, iv_index: u32) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[0] = NonceType::Network.as_byte();
    nonce[1] = ctl_ttl;
    put_seq(&mut nonce[2..5], seq);
    nonce[5..7].copy_from_slice(&src.to_be_bytes());
    nonce[8..12].copy_from_slice(&iv_index.to_be_bytes());
    nonce
}

/// Upper transport nonce for an application or device key.
pub fn upper_nonce(
    kind: NonceType,
    seq_auth: u32,
    src: u16,
    dst: u16,
    iv_index: u32,
) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    nonce[0] = kind.as_byte();
    put_seq(&mut nonce[1..4], seq_auth);
    nonce[4..6].copy_from_slice(&src.to_be_bytes());
    nonce[6..8].copy_from_slice(&dst.to_be_bytes());
    nonce[8..12].copy_from_slice(&iv_index.to_be_bytes());
    nonce
}
