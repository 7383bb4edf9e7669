//! Derived key material.
//!
//! Every 128-bit key in the network model expands through HKDF-SHA256 into
//! the material the transport needs:
//!
//! ```text
//! network key     -> NID (7 bits) | encryption key (32) | privacy key (32)
//!                 -> network id (8)
//! application key -> AID (6 bits) | AEAD key (32)
//! device key      -> AEAD key (32)
//! ```

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::core::{CryptoError, DERIVED_KEY_SIZE, NETWORK_ID_SIZE};
use crate::network::Key;

const NETWORK_SALT: &[u8] = b"btmesh v1 network";
const NETWORK_INFO: &[u8] = b"btmesh v1 nid|enc|privacy";
const NETWORK_ID_INFO: &[u8] = b"btmesh v1 network id";
const APPLICATION_SALT: &[u8] = b"btmesh v1 application";
const APPLICATION_INFO: &[u8] = b"btmesh v1 aid|key";
const DEVICE_SALT: &[u8] = b"btmesh v1 device";
const DEVICE_INFO: &[u8] = b"btmesh v1 device key";

/// A 256-bit derived key.
///
/// Zeroized on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct DerivedKey {
    key: [u8; DERIVED_KEY_SIZE],
}

impl DerivedKey {
    /// Wrap raw bytes.
    pub fn from_bytes(key: [u8; DERIVED_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Raw key bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; DERIVED_KEY_SIZE] {
        &self.key
    }

    fn from_slice(bytes: &[u8]) -> Self {
        let mut key = [0u8; DERIVED_KEY_SIZE];
        key.copy_from_slice(bytes);
        Self { key }
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Material derived from one network key.
#[derive(Debug, Clone)]
pub struct NetworkKeyMaterial {
    /// 7-bit network identifier carried in every PDU header.
    pub nid: u8,
    /// Network layer AEAD key.
    pub encryption_key: DerivedKey,
    /// Header obfuscation key.
    pub privacy_key: DerivedKey,
    /// Public network identifier.
    pub network_id: [u8; NETWORK_ID_SIZE],
}

impl NetworkKeyMaterial {
    /// Derive from a network key.
    pub fn derive(key: &Key) -> Result<Self, CryptoError> {
        let hk = Hkdf::<Sha256>::new(Some(NETWORK_SALT), key.as_bytes());

        let mut okm = [0u8; 1 + 2 * DERIVED_KEY_SIZE];
        hk.expand(NETWORK_INFO, &mut okm)
            .map_err(|_| CryptoError::KeyDerivationFailed)?;
        let mut network_id = [0u8; NETWORK_ID_SIZE];
        hk.expand(NETWORK_ID_INFO, &mut network_id)
            .map_err(|_| CryptoError::KeyDerivationFailed)?;

        let material = Self {
            nid: okm[0] & 0x7F,
            encryption_key: DerivedKey::from_slice(&okm[1..1 + DERIVED_KEY_SIZE]),
            privacy_key: DerivedKey::from_slice(&okm[1 + DERIVED_KEY_SIZE..]),
            network_id,
        };
        okm.zeroize();
        Ok(material)
    }
}

/// Material derived from one application key.
#[derive(Debug, Clone)]
pub struct ApplicationKeyMaterial {
    /// 6-bit application key identifier.
    pub aid: u8,
    /// Upper transport AEAD key.
    pub key: DerivedKey,
}

impl ApplicationKeyMaterial {
    /// Derive from an application key.
    pub fn derive(key: &Key) -> Result<Self, CryptoError> {
        let hk = Hkdf::<Sha256>::new(Some(APPLICATION_SALT), key.as_bytes());
        let mut okm = [0u8; 1 + DERIVED_KEY_SIZE];
        hk.expand(APPLICATION_INFO, &mut okm)
            .map_err(|_| CryptoError::KeyDerivationFailed)?;

        let material = Self {
            aid: okm[0] & 0x3F,
            key: DerivedKey::from_slice(&okm[1..]),
        };
        okm.zeroize();
        Ok(material)
    }
}

/// Upper transport AEAD key derived from a device key.
pub fn derive_device_key(key: &Key) -> Result<DerivedKey, CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(DEVICE_SALT), key.as_bytes());
    let mut okm = [0u8; DERIVED_KEY_SIZE];
    hk.expand(DEVICE_INFO, &mut okm)
        .map_err(|_| CryptoError::KeyDerivationFailed)?;
    let key = DerivedKey::from_bytes(okm);
    okm.zeroize();
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_derivation_is_deterministic() {
        let key = Key::new([0x11; 16]);
        let a = NetworkKeyMaterial::derive(&key).unwrap();
        let b = NetworkKeyMaterial::derive(&key).unwrap();
        assert_eq!(a.nid, b.nid);
        assert_eq!(a.encryption_key, b.encryption_key);
        assert_eq!(a.network_id, b.network_id);
        assert!(a.nid <= 0x7F);
        assert_ne!(a.encryption_key, a.privacy_key);
    }

    #[test]
    fn test_different_keys_differ() {
        let a = NetworkKeyMaterial::derive(&Key::new([0x11; 16])).unwrap();
        let b = NetworkKeyMaterial::derive(&Key::new([0x12; 16])).unwrap();
        assert_ne!(a.encryption_key, b.encryption_key);
        assert_ne!(a.network_id, b.network_id);
    }

    #[test]
    fn test_application_aid_is_six_bits() {
        for byte in 0..32u8 {
            let material = ApplicationKeyMaterial::derive(&Key::new([byte; 16])).unwrap();
            assert!(material.aid <= 0x3F);
        }
    }

    #[test]
    fn test_device_key_differs_from_application_key() {
        let key = Key::new([0x33; 16]);
        let app = ApplicationKeyMaterial::derive(&key).unwrap();
        let dev = derive_device_key(&key).unwrap();
        assert_ne!(app.key, dev);
    }
}
