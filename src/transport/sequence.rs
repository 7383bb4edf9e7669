//! Outgoing sequence numbers.

use std::sync::atomic::{AtomicU32, Ordering};

use super::TransportError;
use crate::core::MAX_SEQUENCE_NUMBER;

/// Monotonic 24-bit sequence counter shared by every outgoing PDU of one
/// source.
///
/// Each network PDU claims a fresh value, including retransmitted segments.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    next: AtomicU32,
}

impl SequenceCounter {
    /// Counter whose first claimed value is `next`.
    pub fn new(next: u32) -> Self {
        Self {
            next: AtomicU32::new(next),
        }
    }

    /// Claim the next sequence number.
    pub fn next(&self) -> Result<u32, TransportError> {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |seq| {
                (seq <= MAX_SEQUENCE_NUMBER).then_some(seq + 1)
            })
            .map_err(|_| TransportError::SequenceExhausted)
    }

    /// Value the next claim returns, for persisting.
    pub fn peek(&self) -> u32 {
        self.next.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_are_monotonic() {
        let counter = SequenceCounter::new(7);
        assert_eq!(counter.next(), Ok(7));
        assert_eq!(counter.next(), Ok(8));
        assert_eq!(counter.peek(), 9);
    }

    #[test]
    fn test_exhaustion() {
        let counter = SequenceCounter::new(MAX_SEQUENCE_NUMBER);
        assert_eq!(counter.next(), Ok(MAX_SEQUENCE_NUMBER));
        assert_eq!(counter.next(), Err(TransportError::SequenceExhausted));
        assert_eq!(counter.next(), Err(TransportError::SequenceExhausted));
    }

    #[test]
    fn test_concurrent_claims_are_unique() {
        let counter = std::sync::Arc::new(SequenceCounter::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let counter = counter.clone();
                std::thread::spawn(move || {
                    (0..250).map(|_| counter.next().unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();
        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1000);
    }
}
