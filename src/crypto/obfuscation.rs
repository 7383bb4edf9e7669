//! Network header obfuscation and virtual address hashing.
//!
//! The mutable header fields `CTL|TTL, SEQ, SRC` are XORed with a privacy
//! mask:
//!
//! ```text
//! mask = BLAKE2s(privacy_key || IV index (BE32) || ciphertext[0..7])[0..6]
//! ```

use blake2::{Blake2s256, Digest};
use uuid::Uuid;

use super::DerivedKey;
use crate::core::{MIN_VIRTUAL_ADDRESS, OBFUSCATED_HEADER_SIZE, PRIVACY_RANDOM_SIZE};
use crate::network::Address;

const VIRTUAL_LABEL: &[u8] = b"btmesh v1 virtual";

/// Privacy mask for one PDU.
pub fn privacy_mask(
    privacy_key: &DerivedKey,
    iv_index: u32,
    random: &[u8; PRIVACY_RANDOM_SIZE],
) -> [u8; OBFUSCATED_HEADER_SIZE] {
    let mut hasher = Blake2s256::new();
    hasher.update(privacy_key.as_bytes());
    hasher.update(iv_index.to_be_bytes());
    hasher.update(random);
    let digest = hasher.finalize();

    let mut mask = [0u8; OBFUSCATED_HEADER_SIZE];
    mask.copy_from_slice(&digest[..OBFUSCATED_HEADER_SIZE]);
    mask
}

/// XOR `header` with the privacy mask. Applying it twice restores the input.
pub fn obfuscate(
    header: &mut [u8; OBFUSCATED_HEADER_SIZE],
    privacy_key: &DerivedKey,
    iv_index: u32,
    random: &[u8; PRIVACY_RANDOM_SIZE],
) {
    let mask = privacy_mask(privacy_key, iv_index, random);
    for (byte, m) in header.iter_mut().zip(mask) {
        *byte ^= m;
    }
}

/// Virtual address of a label UUID: `0x8000 | hash14(label)`.
pub fn virtual_address(label: &Uuid) -> Address {
    let mut hasher = Blake2s256::new();
    hasher.update(VIRTUAL_LABEL);
    hasher.update(label.as_bytes());
    let digest = hasher.finalize();
    let hash = u16::from_be_bytes([digest[0], digest[1]]) & 0x3FFF;
    Address::new(MIN_VIRTUAL_ADDRESS | hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DERIVED_KEY_SIZE;

    #[test]
    fn test_obfuscation_is_involution() {
        let key = DerivedKey::from_bytes([9; DERIVED_KEY_SIZE]);
        let random = [1, 2, 3, 4, 5, 6, 7];
        let original = [0x85, 0x00, 0x00, 0x01, 0x12, 0x34];

        let mut header = original;
        obfuscate(&mut header, &key, 0, &random);
        assert_ne!(header, original);
        obfuscate(&mut header, &key, 0, &random);
        assert_eq!(header, original);
    }

    #[test]
    fn test_mask_depends_on_iv_index() {
        let key = DerivedKey::from_bytes([9; DERIVED_KEY_SIZE]);
        let random = [0; PRIVACY_RANDOM_SIZE];
        assert_ne!(privacy_mask(&key, 0, &random), privacy_mask(&key, 1, &random));
    }

    #[test]
    fn test_virtual_address_range() {
        for _ in 0..16 {
            let address = virtual_address(&Uuid::new_v4());
            assert!(address.is_virtual(), "{address}");
        }
        let label = Uuid::from_bytes([7; 16]);
        assert_eq!(virtual_address(&label), virtual_address(&label));
    }
}
