//! Security layer.
//!
//! - Key derivation (HKDF-SHA256) from network, application and device keys
//! - ChaCha20-Poly1305 AEAD for the network and upper transport layers
//! - Network header obfuscation (BLAKE2s privacy mask)
//! - Replay protection per source address

mod aead;
mod keys;
mod nonce;
mod obfuscation;
mod replay;

pub use aead::{decrypt, encrypt};
pub use keys::{ApplicationKeyMaterial, DerivedKey, NetworkKeyMaterial, derive_device_key};
pub use nonce::{NonceType, network_nonce, upper_nonce};
pub use obfuscation::{obfuscate, privacy_mask, virtual_address};
pub use replay::ReplayCache;
