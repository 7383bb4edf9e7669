//! Upper transport encryption of access payloads.
//!
//! The access PDU is sealed with an application key or a device key. The
//! nonce binds SeqAuth, source, destination and IV index; messages to a
//! virtual address also authenticate the label UUID.

use uuid::Uuid;

use crate::core::{CryptoError, MAX_ACCESS_PAYLOAD};
use crate::crypto::{
    ApplicationKeyMaterial, DerivedKey, NonceType, decrypt, derive_device_key, encrypt,
    upper_nonce,
};
use crate::network::{Address, Key};

use super::TransportError;

/// Key protecting an access payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessKey {
    /// Application key, identified on the wire by its AID.
    Application {
        /// 6-bit application key identifier.
        aid: u8,
        /// Derived AEAD key.
        key: DerivedKey,
    },
    /// Device key of the configured node.
    Device(DerivedKey),
}

impl AccessKey {
    /// Key for an application key's derived material.
    pub fn application(material: &ApplicationKeyMaterial) -> Self {
        Self::Application {
            aid: material.aid,
            key: material.key.clone(),
        }
    }

    /// Key for a node's device key.
    pub fn device(key: &Key) -> Result<Self, CryptoError> {
        Ok(Self::Device(derive_device_key(key)?))
    }

    /// Application key flag for the lower transport header.
    pub fn akf(&self) -> bool {
        matches!(self, Self::Application { .. })
    }

    /// AID for the lower transport header; zero for device keys.
    pub fn aid(&self) -> u8 {
        match self {
            Self::Application { aid, .. } => *aid,
            Self::Device(_) => 0,
        }
    }

    fn parts(&self) -> (NonceType, &DerivedKey) {
        match self {
            Self::Application { key, .. } => (NonceType::Application, key),
            Self::Device(key) => (NonceType::Device, key),
        }
    }
}

/// Addressing context shared by both ends of one upper transport PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpperContext<'a> {
    /// SeqAuth of the message.
    pub seq_auth: u32,
    /// Source element.
    pub src: Address,
    /// Destination address.
    pub dst: Address,
    /// IV index the message was sent under.
    pub iv_index: u32,
    /// Label UUID when `dst` is a virtual address.
    pub label: Option<&'a Uuid>,
}

impl UpperContext<'_> {
    fn aad(&self) -> &[u8] {
        self.label.map(|l| l.as_bytes().as_slice()).unwrap_or(&[])
    }
}

/// Seal an access PDU into an upper transport PDU (TransMIC appended).
pub fn encrypt_access(
    access_pdu: &[u8],
    key: &AccessKey,
    ctx: &UpperContext<'_>,
) -> Result<Vec<u8>, TransportError> {
    if access_pdu.is_empty() || access_pdu.len() > MAX_ACCESS_PAYLOAD {
        return Err(TransportError::PayloadTooLarge {
            size: access_pdu.len(),
            max: MAX_ACCESS_PAYLOAD,
        });
    }
    let (kind, aead_key) = key.parts();
    let nonce = upper_nonce(
        kind,
        ctx.seq_auth,
        ctx.src.value(),
        ctx.dst.value(),
        ctx.iv_index,
    );
    Ok(encrypt(aead_key, &nonce, ctx.aad(), access_pdu)?)
}

/// Open an upper transport PDU, returning the access PDU.
pub fn decrypt_access(
    upper_pdu: &[u8],
    key: &AccessKey,
    ctx: &UpperContext<'_>,
) -> Result<Vec<u8>, TransportError> {
    let (kind, aead_key) = key.parts();
    let nonce = upper_nonce(
        kind,
        ctx.seq_auth,
        ctx.src.value(),
        ctx.dst.value(),
        ctx.iv_index,
    );
    Ok(decrypt(aead_key, &nonce, ctx.aad(), upper_pdu)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MIC_SIZE;

    fn app_key() -> AccessKey {
        AccessKey::application(&ApplicationKeyMaterial::derive(&Key::new([7; 16])).unwrap())
    }

    fn ctx(label: Option<&Uuid>) -> UpperContext<'_> {
        UpperContext {
            seq_auth: 42,
            src: Address::new(0x0001),
            dst: Address::new(0x0002),
            iv_index: 1,
            label,
        }
    }

    #[test]
    fn test_seal_and_open() {
        let key = app_key();
        assert!(key.akf());
        let sealed = encrypt_access(&[0x82, 0x02, 1, 0], &key, &ctx(None)).unwrap();
        assert_eq!(sealed.len(), 4 + MIC_SIZE);
        assert_eq!(
            decrypt_access(&sealed, &key, &ctx(None)).unwrap(),
            vec![0x82, 0x02, 1, 0]
        );
    }

    #[test]
    fn test_device_and_application_nonces_differ() {
        let device = AccessKey::device(&Key::new([7; 16])).unwrap();
        assert!(!device.akf());
        assert_eq!(device.aid(), 0);
        let sealed = encrypt_access(&[0x80, 0x49], &device, &ctx(None)).unwrap();
        assert!(decrypt_access(&sealed, &app_key(), &ctx(None)).is_err());
        assert!(decrypt_access(&sealed, &device, &ctx(None)).is_ok());
    }

    #[test]
    fn test_addressing_is_authenticated() {
        let key = app_key();
        let sealed = encrypt_access(&[0x82, 0x01], &key, &ctx(None)).unwrap();
        let mut moved = ctx(None);
        moved.dst = Address::new(0x0003);
        assert!(decrypt_access(&sealed, &key, &moved).is_err());
    }

    #[test]
    fn test_virtual_label_is_authenticated() {
        let key = app_key();
        let label = Uuid::from_bytes([1; 16]);
        let other = Uuid::from_bytes([2; 16]);
        let sealed = encrypt_access(&[0x82, 0x01], &key, &ctx(Some(&label))).unwrap();
        assert!(decrypt_access(&sealed, &key, &ctx(Some(&other))).is_err());
        assert!(decrypt_access(&sealed, &key, &ctx(Some(&label))).is_ok());
    }

    #[test]
    fn test_rejects_oversized_payload() {
        let key = app_key();
        assert!(matches!(
            encrypt_access(&vec![0; MAX_ACCESS_PAYLOAD + 1], &key, &ctx(None)),
            Err(TransportError::PayloadTooLarge { .. })
        ));
        assert!(encrypt_access(&[], &key, &ctx(None)).is_err());
    }
}
