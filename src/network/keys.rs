//! Network, application and device keys as stored in the network model.
//!
//! Only the raw 128-bit keys live here. Derived material (NID, AID,
//! encryption and privacy keys) is computed by the crypto layer.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::core::{KEY_SIZE, MAX_KEY_INDEX, ModelError};

/// 12-bit global key index.
pub type KeyIndex = u16;

/// A raw 128-bit key, serialised as a hex string.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Key(#[serde(with = "hex::serde")] [u8; KEY_SIZE]);

impl Key {
    /// Wrap raw key bytes.
    pub const fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generate a random key.
    pub fn random() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Key([REDACTED])")
    }
}

fn check_index(index: KeyIndex) -> Result<(), ModelError> {
    if index > MAX_KEY_INDEX {
        return Err(ModelError::InvalidKeyIndex(index));
    }
    Ok(())
}

/// Key refresh procedure phase of a network key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyRefreshPhase {
    /// No refresh in progress.
    #[default]
    Normal,
    /// New keys are being distributed; transmit with the old key.
    Distributing,
    /// All nodes have the new keys; transmit with the new key.
    UsingNewKeys,
}

/// A network key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkKey {
    index: KeyIndex,
    name: String,
    key: Key,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    old_key: Option<Key>,
    #[serde(default)]
    phase: KeyRefreshPhase,
}

impl NetworkKey {
    /// Create a network key with the given value.
    pub fn new(index: KeyIndex, name: impl Into<String>, key: Key) -> Result<Self, ModelError> {
        check_index(index)?;
        Ok(Self {
            index,
            name: name.into(),
            key,
            old_key: None,
            phase: KeyRefreshPhase::Normal,
        })
    }

    /// Create a network key with a random value.
    pub fn generate(index: KeyIndex, name: impl Into<String>) -> Result<Self, ModelError> {
        Self::new(index, name, Key::random())
    }

    /// Global key index.
    pub fn index(&self) -> KeyIndex {
        self.index
    }

    /// Human readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current (newest) key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Previous key while a refresh is in progress.
    pub fn old_key(&self) -> Option<&Key> {
        self.old_key.as_ref()
    }

    /// Key refresh phase.
    pub fn phase(&self) -> KeyRefreshPhase {
        self.phase
    }

    /// Key used for outgoing PDUs in the current phase.
    pub fn transmit_key(&self) -> &Key {
        match (self.phase, &self.old_key) {
            (KeyRefreshPhase::Distributing, Some(old)) => old,
            _ => &self.key,
        }
    }

    /// Keys accepted on receive, newest first.
    pub fn receive_keys(&self) -> impl Iterator<Item = &Key> {
        std::iter::once(&self.key).chain(self.old_key.as_ref())
    }

    /// Start a key refresh with `new_key`; the current key becomes the old key.
    pub fn start_key_refresh(&mut self, new_key: Key) {
        let old = std::mem::replace(&mut self.key, new_key);
        self.old_key = Some(old);
        self.phase = KeyRefreshPhase::Distributing;
    }

    /// Switch transmission to the new key.
    pub fn use_new_key(&mut self) {
        if self.old_key.is_some() {
            self.phase = KeyRefreshPhase::UsingNewKeys;
        }
    }

    /// Finish the refresh and drop the old key.
    pub fn finish_key_refresh(&mut self) {
        self.old_key = None;
        self.phase = KeyRefreshPhase::Normal;
    }
}

/// An application key, bound to exactly one network key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationKey {
    index: KeyIndex,
    name: String,
    key: Key,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    old_key: Option<Key>,
    bound_network_key: KeyIndex,
}

impl ApplicationKey {
    /// Create an application key bound to `bound_network_key`.
    pub fn new(
        index: KeyIndex,
        name: impl Into<String>,
        key: Key,
        bound_network_key: KeyIndex,
    ) -> Result<Self, ModelError> {
        check_index(index)?;
        check_index(bound_network_key)?;
        Ok(Self {
            index,
            name: name.into(),
            key,
            old_key: None,
            bound_network_key,
        })
    }

    /// Create an application key with a random value.
    pub fn generate(
        index: KeyIndex,
        name: impl Into<String>,
        bound_network_key: KeyIndex,
    ) -> Result<Self, ModelError> {
        Self::new(index, name, Key::random(), bound_network_key)
    }

    /// Global key index.
    pub fn index(&self) -> KeyIndex {
        self.index
    }

    /// Human readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current key.
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// Previous key while the bound network key is refreshing.
    pub fn old_key(&self) -> Option<&Key> {
        self.old_key.as_ref()
    }

    /// Index of the network key this key is bound to.
    pub fn bound_network_key(&self) -> KeyIndex {
        self.bound_network_key
    }

    /// Key used for outgoing PDUs given the bound network key's phase.
    pub fn transmit_key(&self, phase: KeyRefreshPhase) -> &Key {
        match (phase, &self.old_key) {
            (KeyRefreshPhase::Distributing, Some(old)) => old,
            _ => &self.key,
        }
    }

    /// Keys accepted on receive, newest first.
    pub fn receive_keys(&self) -> impl Iterator<Item = &Key> {
        std::iter::once(&self.key).chain(self.old_key.as_ref())
    }

    /// Replace the key; the current key is kept as the old key.
    pub fn start_key_refresh(&mut self, new_key: Key) {
        let old = std::mem::replace(&mut self.key, new_key);
        self.old_key = Some(old);
    }

    /// Drop the old key.
    pub fn finish_key_refresh(&mut self) {
        self.old_key = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_index_validation() {
        assert!(NetworkKey::generate(0x0FFF, "ok").is_ok());
        assert_eq!(
            NetworkKey::generate(0x1000, "bad").unwrap_err(),
            ModelError::InvalidKeyIndex(0x1000)
        );
        assert_eq!(
            ApplicationKey::generate(1, "bad", 0x2000).unwrap_err(),
            ModelError::InvalidKeyIndex(0x2000)
        );
    }

    #[test]
    fn test_key_debug_is_redacted() {
        let key = Key::new([0xAB; KEY_SIZE]);
        assert!(!format!("{key:?}").contains("ab"));
    }

    #[test]
    fn test_key_serializes_as_hex() {
        let key = Key::new([0x01; KEY_SIZE]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", "01".repeat(KEY_SIZE)));
        let back: Key = serde_json::from_str(&json).unwrap();
        assert_eq!(back, key);
    }

    #[test]
    fn test_network_key_refresh_phases() {
        let old = Key::new([1; KEY_SIZE]);
        let new = Key::new([2; KEY_SIZE]);
        let mut net = NetworkKey::new(0, "primary", old.clone()).unwrap();

        net.start_key_refresh(new.clone());
        assert_eq!(net.phase(), KeyRefreshPhase::Distributing);
        assert_eq!(net.transmit_key(), &old);
        assert_eq!(net.receive_keys().count(), 2);

        net.use_new_key();
        assert_eq!(net.phase(), KeyRefreshPhase::UsingNewKeys);
        assert_eq!(net.transmit_key(), &new);

        net.finish_key_refresh();
        assert_eq!(net.phase(), KeyRefreshPhase::Normal);
        assert!(net.old_key().is_none());
        assert_eq!(net.receive_keys().count(), 1);
    }

    #[test]
    fn test_application_key_transmit_follows_phase() {
        let mut app = ApplicationKey::new(0, "app", Key::new([1; KEY_SIZE]), 0).unwrap();
        app.start_key_refresh(Key::new([2; KEY_SIZE]));
        assert_eq!(app.transmit_key(KeyRefreshPhase::Distributing).as_bytes(), &[1; KEY_SIZE]);
        assert_eq!(app.transmit_key(KeyRefreshPhase::UsingNewKeys).as_bytes(), &[2; KEY_SIZE]);
    }
}
