//! Outgoing segmented message state and retransmission policy.
//!
//! ```text
//! Pending -> Segmenting -> AwaitingAck -> Completed
//!                 |              |---------> Failed    (busy, bearer, cancel)
//!                 |              +---------> TimedOut  (retransmission limit)
//!                 +-> Completed  (no acks for group destinations)
//! ```
//!
//! The state machine is synchronous; the manager drives it from a task
//! that owns the timer.

use std::time::Duration;

use crate::core::{
    DEFAULT_TTL, MAX_TRANSMISSION_INTERVAL, RETRANSMISSION_BACKOFF, RETRANSMISSION_LIMIT,
    TRANSMISSION_TIMER_INTERVAL, TRANSMISSION_TIMER_PER_TTL,
};
use crate::network::Address;

use super::lower::{Segment, SegmentAck, full_block_ack, seq_zero};

/// Lifecycle of one outgoing exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    /// Created, waiting for its turn.
    Pending,
    /// Segments are being handed to the bearer.
    Segmenting,
    /// Waiting for the destination to acknowledge every segment.
    AwaitingAck,
    /// Delivered.
    Completed,
    /// Aborted by the remote, the bearer or a cancellation.
    Failed,
    /// Retransmission limit or response timeout reached.
    TimedOut,
}

impl ExchangeState {
    /// Whether the exchange holds no more resources.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::TimedOut)
    }
}

/// Timer settings for segment retransmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetransmitPolicy {
    /// First retransmission interval.
    pub initial_interval: Duration,
    /// Upper bound of the backed-off interval.
    pub max_interval: Duration,
    /// Multiplier applied after every round.
    pub backoff: u32,
    /// Retransmission rounds before giving up.
    pub limit: u32,
}

impl RetransmitPolicy {
    /// Default policy for a message sent with `ttl`.
    pub fn for_ttl(ttl: u8) -> Self {
        Self {
            initial_interval: TRANSMISSION_TIMER_INTERVAL + TRANSMISSION_TIMER_PER_TTL * u32::from(ttl),
            ..Self::default()
        }
    }
}

impl Default for RetransmitPolicy {
    fn default() -> Self {
        Self {
            initial_interval: TRANSMISSION_TIMER_INTERVAL
                + TRANSMISSION_TIMER_PER_TTL * u32::from(DEFAULT_TTL),
            max_interval: MAX_TRANSMISSION_INTERVAL,
            backoff: RETRANSMISSION_BACKOFF,
            limit: RETRANSMISSION_LIMIT,
        }
    }
}

/// Result of feeding a segment acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// Every segment is acknowledged.
    Complete,
    /// Some segments are still missing; retransmit them now.
    Partial {
        /// Bitmap of segments not yet acknowledged.
        missing: u32,
    },
    /// The receiver cannot take the message.
    Busy,
    /// Not for this exchange or arrived in the wrong state.
    Ignored,
}

/// Result of the retransmission timer firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// Retransmit unacknowledged segments and wait [`SegmentedExchange::interval`].
    Retransmit,
    /// Limit reached; the exchange has timed out.
    Exhausted,
}

/// Sender side of one segmented message.
#[derive(Debug, Clone)]
pub struct SegmentedExchange {
    destination: Address,
    seq_auth: u32,
    segments: Vec<Segment>,
    acked: u32,
    rounds: u32,
    interval: Duration,
    policy: RetransmitPolicy,
    state: ExchangeState,
}

impl SegmentedExchange {
    /// New exchange for `segments` of the message with `seq_auth`.
    pub fn new(
        destination: Address,
        seq_auth: u32,
        segments: Vec<Segment>,
        policy: RetransmitPolicy,
    ) -> Self {
        Self {
            destination,
            seq_auth,
            segments,
            acked: 0,
            rounds: 0,
            interval: policy.initial_interval,
            policy,
            state: ExchangeState::Pending,
        }
    }

    /// Destination address.
    pub fn destination(&self) -> Address {
        self.destination
    }

    /// SeqAuth of the message.
    pub fn seq_auth(&self) -> u32 {
        self.seq_auth
    }

    /// SeqZero echoed by acknowledgments.
    pub fn seq_zero(&self) -> u16 {
        seq_zero(self.seq_auth)
    }

    /// Current state.
    pub fn state(&self) -> ExchangeState {
        self.state
    }

    /// Interval until the next retransmission round.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Retransmission rounds since the last progress.
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    /// Whether the destination acknowledges segments.
    pub fn expects_ack(&self) -> bool {
        self.destination.is_unicast()
    }

    fn all(&self) -> u32 {
        match self.segments.last() {
            Some(last) => full_block_ack(last.seg_n),
            None => 0,
        }
    }

    /// Begin the first transmission round; returns every segment in order.
    pub fn start(&mut self) -> &[Segment] {
        self.state = ExchangeState::Segmenting;
        &self.segments
    }

    /// The first round has been handed to the bearer.
    pub fn first_round_sent(&mut self) -> ExchangeState {
        self.state = if self.expects_ack() {
            ExchangeState::AwaitingAck
        } else {
            ExchangeState::Completed
        };
        self.state
    }

    /// Segments not yet acknowledged, in ascending order.
    pub fn unacked(&self) -> impl Iterator<Item = &Segment> {
        let acked = self.acked;
        self.segments
            .iter()
            .filter(move |s| acked & (1u32 << s.seg_o) == 0)
    }

    /// Process an acknowledgment from the destination.
    pub fn on_ack(&mut self, ack: &SegmentAck) -> AckOutcome {
        if self.state != ExchangeState::AwaitingAck || ack.seq_zero != self.seq_zero() {
            return AckOutcome::Ignored;
        }
        if ack.block_ack == 0 {
            self.state = ExchangeState::Failed;
            return AckOutcome::Busy;
        }

        let all = self.all();
        let newly = ack.block_ack & all & !self.acked;
        if newly != 0 {
            self.acked |= newly;
            self.rounds = 0;
        }
        if self.acked == all {
            self.state = ExchangeState::Completed;
            AckOutcome::Complete
        } else {
            AckOutcome::Partial {
                missing: all & !self.acked,
            }
        }
    }

    /// The retransmission timer fired without completing the exchange.
    pub fn on_timer(&mut self) -> TimerOutcome {
        if self.rounds >= self.policy.limit {
            self.state = ExchangeState::TimedOut;
            return TimerOutcome::Exhausted;
        }
        self.rounds += 1;
        self.interval = (self.interval * self.policy.backoff).min(self.policy.max_interval);
        TimerOutcome::Retransmit
    }

    /// Abort the exchange.
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = ExchangeState::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::lower::segment;

    fn exchange(destination: u16, len: usize) -> SegmentedExchange {
        let upper = vec![0u8; len];
        let segments = segment(true, 1, 0x0100, &upper).unwrap();
        SegmentedExchange::new(
            Address::new(destination),
            0x0100,
            segments,
            RetransmitPolicy::for_ttl(4),
        )
    }

    fn ack(block_ack: u32) -> SegmentAck {
        SegmentAck {
            obo: false,
            seq_zero: 0x0100,
            block_ack,
        }
    }

    #[test]
    fn test_policy_interval_depends_on_ttl() {
        assert_eq!(
            RetransmitPolicy::for_ttl(4).initial_interval,
            Duration::from_millis(400)
        );
        assert_eq!(
            RetransmitPolicy::for_ttl(0).initial_interval,
            Duration::from_millis(200)
        );
    }

    #[test]
    fn test_full_ack_completes() {
        let mut ex = exchange(0x0002, 30);
        assert_eq!(ex.state(), ExchangeState::Pending);
        assert_eq!(ex.start().len(), 3);
        assert_eq!(ex.state(), ExchangeState::Segmenting);
        assert_eq!(ex.first_round_sent(), ExchangeState::AwaitingAck);
        assert_eq!(ex.on_ack(&ack(0b111)), AckOutcome::Complete);
        assert!(ex.state().is_terminal());
    }

    #[test]
    fn test_partial_ack_leaves_missing_segments() {
        let mut ex = exchange(0x0002, 30);
        ex.start();
        ex.first_round_sent();
        assert_eq!(ex.on_ack(&ack(0b101)), AckOutcome::Partial { missing: 0b010 });
        let missing: Vec<u8> = ex.unacked().map(|s| s.seg_o).collect();
        assert_eq!(missing, vec![1]);
        assert_eq!(ex.on_ack(&ack(0b010)), AckOutcome::Complete);
    }

    #[test]
    fn test_busy_and_foreign_acks() {
        let mut ex = exchange(0x0002, 30);
        assert_eq!(ex.on_ack(&ack(0b111)), AckOutcome::Ignored);
        ex.start();
        ex.first_round_sent();
        let foreign = SegmentAck {
            seq_zero: 0x0101,
            ..ack(0b111)
        };
        assert_eq!(ex.on_ack(&foreign), AckOutcome::Ignored);
        assert_eq!(ex.on_ack(&ack(0)), AckOutcome::Busy);
        assert_eq!(ex.state(), ExchangeState::Failed);
    }

    #[test]
    fn test_group_destination_completes_without_ack() {
        let mut ex = exchange(0xC001, 30);
        ex.start();
        assert_eq!(ex.first_round_sent(), ExchangeState::Completed);
    }

    #[test]
    fn test_backoff_is_capped_and_limited() {
        let mut ex = exchange(0x0002, 30);
        ex.start();
        ex.first_round_sent();
        let mut intervals = vec![ex.interval()];
        for _ in 0..RETRANSMISSION_LIMIT {
            assert_eq!(ex.on_timer(), TimerOutcome::Retransmit);
            intervals.push(ex.interval());
        }
        assert_eq!(intervals[1], Duration::from_millis(800));
        assert!(intervals.iter().all(|i| *i <= MAX_TRANSMISSION_INTERVAL));
        assert_eq!(*intervals.last().unwrap(), MAX_TRANSMISSION_INTERVAL);
        assert_eq!(ex.on_timer(), TimerOutcome::Exhausted);
        assert_eq!(ex.state(), ExchangeState::TimedOut);
    }

    #[test]
    fn test_progress_resets_rounds() {
        let mut ex = exchange(0x0002, 30);
        ex.start();
        ex.first_round_sent();
        ex.on_timer();
        ex.on_timer();
        assert_eq!(ex.rounds(), 2);
        ex.on_ack(&ack(0b001));
        assert_eq!(ex.rounds(), 0);
        ex.on_ack(&ack(0b001));
        assert_eq!(ex.rounds(), 0);
    }
}
