//! Receiver side reassembly of segmented messages.
//!
//! Messages are keyed by source and SeqAuth. Incomplete messages are
//! dropped after a period without new segments. Completed ones are
//! remembered for a while so that retransmitted segments are re-acked
//! instead of delivered twice.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use tokio::time::Instant;

use crate::core::{
    COMPLETED_HISTORY_SIZE, INCOMPLETE_MESSAGE_TIMEOUT, MAX_INCOMPLETE_MESSAGES,
    SEGMENT_PAYLOAD_SIZE,
};
use crate::network::Address;

use super::lower::{Segment, full_block_ack};

/// Result of receiving one segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentOutcome {
    /// Stored; more segments are needed.
    Incomplete {
        /// Block ack to send now, if any.
        ack: Option<u32>,
    },
    /// Every segment arrived.
    Complete {
        /// Application key flag of the message.
        akf: bool,
        /// AID of the message.
        aid: u8,
        /// Reassembled upper transport PDU.
        upper_pdu: Vec<u8>,
        /// Block ack to send.
        block_ack: u32,
    },
    /// The message was already delivered.
    Duplicate {
        /// Block ack to repeat.
        block_ack: u32,
    },
    /// Too many messages are in flight; answer with an empty block ack.
    Busy,
    /// Stale or inconsistent segment.
    Discarded,
}

/// Reassembly limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReassemblyLimits {
    /// Time without segments after which a message is dropped.
    pub incomplete_timeout: Duration,
    /// Number of messages reassembled at once.
    pub max_incomplete: usize,
    /// Number of completed messages remembered.
    pub history_size: usize,
}

impl Default for ReassemblyLimits {
    fn default() -> Self {
        Self {
            incomplete_timeout: INCOMPLETE_MESSAGE_TIMEOUT,
            max_incomplete: MAX_INCOMPLETE_MESSAGES,
            history_size: COMPLETED_HISTORY_SIZE,
        }
    }
}

#[derive(Debug)]
struct Incomplete {
    akf: bool,
    aid: u8,
    seg_n: u8,
    received: u32,
    segments: Vec<Option<Vec<u8>>>,
    last_activity: Instant,
}

impl Incomplete {
    fn accepts(&self, segment: &Segment) -> bool {
        segment.seg_n == self.seg_n && segment.akf == self.akf && segment.aid == self.aid
    }
}

/// Reassembles segmented access messages.
#[derive(Debug)]
pub struct Reassembler {
    incomplete: HashMap<(Address, u32), Incomplete>,
    completed: VecDeque<(Address, u32, u32)>,
    limits: ReassemblyLimits,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new(ReassemblyLimits::default())
    }
}

impl Reassembler {
    /// Reassembler with the given limits.
    pub fn new(limits: ReassemblyLimits) -> Self {
        Self {
            incomplete: HashMap::new(),
            completed: VecDeque::with_capacity(limits.history_size),
            limits,
        }
    }

    /// Number of messages being reassembled.
    pub fn incomplete_count(&self) -> usize {
        self.incomplete.len()
    }

    /// Drop messages that saw no segment within the timeout.
    ///
    /// Returns how many were dropped.
    pub fn expire(&mut self, now: Instant) -> usize {
        let timeout = self.limits.incomplete_timeout;
        let before = self.incomplete.len();
        self.incomplete
            .retain(|_, m| now.saturating_duration_since(m.last_activity) < timeout);
        let dropped = before - self.incomplete.len();
        if dropped > 0 {
            tracing::debug!("discarded {dropped} incomplete messages after {timeout:?}");
        }
        dropped
    }

    /// Forget every message from `src`.
    pub fn forget(&mut self, src: Address) {
        self.incomplete.retain(|(s, _), _| *s != src);
        self.completed.retain(|(s, _, _)| *s != src);
    }

    /// Feed one segment received from `src`.
    pub fn on_segment(
        &mut self,
        src: Address,
        seq_auth: u32,
        segment: &Segment,
        now: Instant,
    ) -> SegmentOutcome {
        self.expire(now);

        if let Some(&(_, _, block_ack)) = self
            .completed
            .iter()
            .find(|(s, a, _)| *s == src && *a == seq_auth)
        {
            return SegmentOutcome::Duplicate { block_ack };
        }

        let is_last = segment.seg_o == segment.seg_n;
        let size_ok = if is_last {
            !segment.payload.is_empty() && segment.payload.len() <= SEGMENT_PAYLOAD_SIZE
        } else {
            segment.payload.len() == SEGMENT_PAYLOAD_SIZE
        };
        if !size_ok || segment.seg_o > segment.seg_n {
            return SegmentOutcome::Discarded;
        }

        // A newer message from the same source supersedes older ones.
        if self
            .incomplete
            .keys()
            .any(|(s, a)| *s == src && *a > seq_auth)
        {
            return SegmentOutcome::Discarded;
        }
        let before = self.incomplete.len();
        self.incomplete
            .retain(|(s, a), _| *s != src || *a >= seq_auth);
        if self.incomplete.len() < before {
            tracing::trace!("seq auth {seq_auth:#08x} from {src} supersedes older messages");
        }

        let key = (src, seq_auth);
        if !self.incomplete.contains_key(&key) {
            if self.incomplete.len() >= self.limits.max_incomplete {
                return SegmentOutcome::Busy;
            }
            self.incomplete.insert(
                key,
                Incomplete {
                    akf: segment.akf,
                    aid: segment.aid,
                    seg_n: segment.seg_n,
                    received: 0,
                    segments: vec![None; usize::from(segment.seg_n) + 1],
                    last_activity: now,
                },
            );
        }

        let Some(message) = self.incomplete.get_mut(&key) else {
            return SegmentOutcome::Discarded;
        };
        if !message.accepts(segment) {
            return SegmentOutcome::Discarded;
        }
        message.last_activity = now;
        message.received |= 1u32 << segment.seg_o;
        message.segments[usize::from(segment.seg_o)] = Some(segment.payload.clone());

        let all = full_block_ack(message.seg_n);
        if message.received != all {
            return SegmentOutcome::Incomplete {
                ack: is_last.then_some(message.received),
            };
        }

        let Some(message) = self.incomplete.remove(&key) else {
            return SegmentOutcome::Discarded;
        };
        let upper_pdu = message.segments.into_iter().flatten().flatten().collect();
        if self.completed.len() >= self.limits.history_size {
            self.completed.pop_front();
        }
        if self.limits.history_size > 0 {
            self.completed.push_back((src, seq_auth, all));
        }
        SegmentOutcome::Complete {
            akf: message.akf,
            aid: message.aid,
            upper_pdu,
            block_ack: all,
        }
    }
}
