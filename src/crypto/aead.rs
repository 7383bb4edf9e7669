//! ChaCha20-Poly1305 AEAD encryption.
//!
//! Used for both the network layer (NetMIC) and the upper transport layer
//! (TransMIC). The 16-byte tag is appended to the ciphertext.

use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit, Payload},
};

use super::DerivedKey;
use crate::core::{CryptoError, MIC_SIZE, NONCE_SIZE};

/// Encrypt `plaintext`, returning ciphertext with the tag appended.
pub fn encrypt(
    key: &DerivedKey,
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .encrypt(Nonce::from_slice(nonce), Payload { msg: plaintext, aad })
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt and authenticate `ciphertext` (tag included).
pub fn decrypt(
    key: &DerivedKey,
    nonce: &[u8; NONCE_SIZE],
    aad: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < MIC_SIZE {
        return Err(CryptoError::DecryptionFailed);
    }
    let cipher = ChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .decrypt(Nonce::from_slice(nonce), Payload { msg: ciphertext, aad })
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DERIVED_KEY_SIZE;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = DerivedKey::from_bytes([0x42; DERIVED_KEY_SIZE]);
        let nonce = [0x01; NONCE_SIZE];
        let ciphertext = encrypt(&key, &nonce, b"hdr", b"turn on").unwrap();
        assert_eq!(ciphertext.len(), 7 + MIC_SIZE);

        let plaintext = decrypt(&key, &nonce, b"hdr", &ciphertext).unwrap();
        assert_eq!(plaintext, b"turn on");
    }

    #[test]
    fn test_decrypt_wrong_key_fails() {
        let key1 = DerivedKey::from_bytes([0x42; DERIVED_KEY_SIZE]);
        let key2 = DerivedKey::from_bytes([0x43; DERIVED_KEY_SIZE]);
        let nonce = [0x01; NONCE_SIZE];
        let ciphertext = encrypt(&key1, &nonce, &[], b"secret").unwrap();
        assert_eq!(
            decrypt(&key2, &nonce, &[], &ciphertext),
            Err(CryptoError::DecryptionFailed)
        );
    }

    #[test]
    fn test_decrypt_tampered_fails() {
        let key = DerivedKey::from_bytes([0x42; DERIVED_KEY_SIZE]);
        let nonce = [0x01; NONCE_SIZE];
        let mut ciphertext = encrypt(&key, &nonce, &[], b"secret").unwrap();
        ciphertext[0] ^= 0x01;
        assert!(decrypt(&key, &nonce, &[], &ciphertext).is_err());
        assert!(decrypt(&key, &nonce, &[], &[0u8; 4]).is_err());
    }
}
