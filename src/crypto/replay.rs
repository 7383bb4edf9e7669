//! Replay protection.
//!
//! One entry per source address holding the last accepted `(IV index, SEQ)`.
//! A PDU is a replay when its IV index is lower, or equal with a sequence
//! number that is not greater. Checking and recording are separate so the
//! transport can check before decryption and record only after the PDU
//! authenticated.

use std::collections::HashMap;

use crate::core::CryptoError;

/// Last accepted sequence per source.
#[derive(Debug, Default, Clone)]
pub struct ReplayCache {
    last: HashMap<u16, (u32, u32)>,
}

impl ReplayCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the PDU was already seen (without updating).
    pub fn is_replay(&self, src: u16, iv_index: u32, seq: u32) -> bool {
        match self.last.get(&src) {
            None => false,
            Some(&(last_iv, last_seq)) => {
                iv_index < last_iv || (iv_index == last_iv && seq <= last_seq)
            }
        }
    }

    /// `Err(ReplayDetected)` if the PDU was already seen.
    pub fn check(&self, src: u16, iv_index: u32, seq: u32) -> Result<(), CryptoError> {
        if self.is_replay(src, iv_index, seq) {
            return Err(CryptoError::ReplayDetected);
        }
        Ok(())
    }

    /// Record an authenticated PDU. Older values never overwrite newer ones.
    pub fn record(&mut self, src: u16, iv_index: u32, seq: u32) {
        if !self.is_replay(src, iv_index, seq) {
            self.last.insert(src, (iv_index, seq));
        }
    }

    /// Check and record in one step.
    pub fn check_and_update(&mut self, src: u16, iv_index: u32, seq: u32) -> Result<(), CryptoError> {
        self.check(src, iv_index, seq)?;
        self.last.insert(src, (iv_index, seq));
        Ok(())
    }

    /// Forget a source, e.g. after the node was reset.
    pub fn remove(&mut self, src: u16) {
        self.last.remove(&src);
    }

    /// Number of tracked sources.
    pub fn len(&self) -> usize {
        self.last.len()
    }

    /// Whether no source is tracked.
    pub fn is_empty(&self) -> bool {
        self.last.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_pdu_accepted() {
        let mut cache = ReplayCache::new();
        assert!(cache.check_and_update(0x0001, 0, 5).is_ok());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_replay_rejected() {
        let mut cache = ReplayCache::new();
        cache.check_and_update(0x0001, 0, 5).unwrap();
        assert_eq!(cache.check_and_update(0x0001, 0, 5), Err(CryptoError::ReplayDetected));
        assert_eq!(cache.check_and_update(0x0001, 0, 4), Err(CryptoError::ReplayDetected));
        assert!(cache.check_and_update(0x0001, 0, 6).is_ok());
    }

    #[test]
    fn test_replay_is_idempotent() {
        let mut cache = ReplayCache::new();
        cache.record(0x0001, 0, 10);
        for _ in 0..3 {
            assert!(cache.is_replay(0x0001, 0, 10));
        }
        cache.record(0x0001, 0, 3);
        assert!(!cache.is_replay(0x0001, 0, 11));
    }

    #[test]
    fn test_iv_index_ordering() {
        let mut cache = ReplayCache::new();
        cache.check_and_update(0x0001, 1, 100).unwrap();
        assert!(cache.is_replay(0x0001, 0, 1000));
        assert!(!cache.is_replay(0x0001, 2, 0));
    }

    #[test]
    fn test_sources_are_independent() {
        let mut cache = ReplayCache::new();
        cache.check_and_update(0x0001, 0, 10).unwrap();
        assert!(cache.check_and_update(0x0002, 0, 1).is_ok());
        cache.remove(0x0001);
        assert!(!cache.is_replay(0x0001, 0, 1));
    }
}
