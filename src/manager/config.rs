//! Manager configuration.

use std::time::Duration;

use crate::core::{
    ACKNOWLEDGMENT_MESSAGE_TIMEOUT, COMPLETED_HISTORY_SIZE, DEFAULT_TTL,
    INCOMPLETE_MESSAGE_TIMEOUT, MAX_INCOMPLETE_MESSAGES, MAX_TRANSMISSION_INTERVAL, MAX_TTL,
    MeshError, RETRANSMISSION_BACKOFF, RETRANSMISSION_LIMIT, TRANSMISSION_TIMER_INTERVAL,
    TRANSMISSION_TIMER_PER_TTL,
};
use crate::network::Address;
use crate::transport::{ReassemblyLimits, RetransmitPolicy};

/// Manager configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// TTL of outgoing messages.
    pub default_ttl: u8,

    /// Source address of outgoing messages. Falls back to the unicast
    /// address of the network's first provisioner.
    pub local_address: Option<Address>,

    /// Base segment transmission interval.
    pub transmission_timer_interval: Duration,

    /// Added to the transmission interval per TTL hop.
    pub transmission_timer_per_ttl: Duration,

    /// Cap of the backed-off transmission interval.
    pub max_transmission_interval: Duration,

    /// Backoff multiplier per retransmission round.
    pub retransmission_backoff: u32,

    /// Retransmission rounds before an exchange times out.
    pub retransmission_limit: u32,

    /// Time to wait for the response of an acknowledged message.
    pub acknowledgment_message_timeout: Duration,

    /// Time without segments after which reassembly is abandoned.
    pub incomplete_message_timeout: Duration,

    /// Concurrent reassemblies before answering busy.
    pub max_incomplete_messages: usize,

    /// Completed reassemblies remembered for duplicate acks.
    pub completed_history_size: usize,

    /// First sequence number to claim.
    pub initial_sequence: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            local_address: None,
            transmission_timer_interval: TRANSMISSION_TIMER_INTERVAL,
            transmission_timer_per_ttl: TRANSMISSION_TIMER_PER_TTL,
            max_transmission_interval: MAX_TRANSMISSION_INTERVAL,
            retransmission_backoff: RETRANSMISSION_BACKOFF,
            retransmission_limit: RETRANSMISSION_LIMIT,
            acknowledgment_message_timeout: ACKNOWLEDGMENT_MESSAGE_TIMEOUT,
            incomplete_message_timeout: INCOMPLETE_MESSAGE_TIMEOUT,
            max_incomplete_messages: MAX_INCOMPLETE_MESSAGES,
            completed_history_size: COMPLETED_HISTORY_SIZE,
            initial_sequence: 0,
        }
    }
}

impl ManagerConfig {
    /// Create a builder.
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::new()
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), MeshError> {
        // TTL 1 would never leave the sender.
        if self.default_ttl == 1 || self.default_ttl > MAX_TTL {
            return Err(MeshError::Config(format!(
                "default ttl {} is not 0 or 2..=127",
                self.default_ttl
            )));
        }
        if self.retransmission_backoff == 0 {
            return Err(MeshError::Config("retransmission backoff must be at least 1".into()));
        }
        if let Some(address) = self.local_address {
            if !address.is_unicast() {
                return Err(MeshError::InvalidSource(address.value()));
            }
        }
        Ok(())
    }

    /// Segment retransmission policy for a message sent with `ttl`.
    pub fn retransmit_policy(&self, ttl: u8) -> RetransmitPolicy {
        RetransmitPolicy {
            initial_interval: self.transmission_timer_interval
                + self.transmission_timer_per_ttl * u32::from(ttl),
            max_interval: self.max_transmission_interval,
            backoff: self.retransmission_backoff,
            limit: self.retransmission_limit,
        }
    }

    /// Reassembly limits.
    pub fn reassembly_limits(&self) -> ReassemblyLimits {
        ReassemblyLimits {
            incomplete_timeout: self.incomplete_message_timeout,
            max_incomplete: self.max_incomplete_messages,
            history_size: self.completed_history_size,
        }
    }
}

/// Builder for [`ManagerConfig`].
#[derive(Debug)]
pub struct ManagerConfigBuilder {
    config: ManagerConfig,
}

impl ManagerConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ManagerConfig::default(),
        }
    }

    /// Set the default TTL.
    pub fn default_ttl(mut self, ttl: u8) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    /// Set the local source address.
    pub fn local_address(mut self, address: Address) -> Self {
        self.config.local_address = Some(address);
        self
    }

    /// Set the base transmission interval and the per-TTL addition.
    pub fn transmission_timer(mut self, interval: Duration, per_ttl: Duration) -> Self {
        self.config.transmission_timer_interval = interval;
        self.config.transmission_timer_per_ttl = per_ttl;
        self
    }

    /// Set the maximum transmission interval.
    pub fn max_transmission_interval(mut self, interval: Duration) -> Self {
        self.config.max_transmission_interval = interval;
        self
    }

    /// Set the backoff multiplier.
    pub fn retransmission_backoff(mut self, backoff: u32) -> Self {
        self.config.retransmission_backoff = backoff;
        self
    }

    /// Set the retransmission limit.
    pub fn retransmission_limit(mut self, limit: u32) -> Self {
        self.config.retransmission_limit = limit;
        self
    }

    /// Set the response timeout for acknowledged messages.
    pub fn acknowledgment_message_timeout(mut self, timeout: Duration) -> Self {
        self.config.acknowledgment_message_timeout = timeout;
        self
    }

    /// Set the incomplete reassembly timeout.
    pub fn incomplete_message_timeout(mut self, timeout: Duration) -> Self {
        self.config.incomplete_message_timeout = timeout;
        self
    }

    /// Set the concurrent reassembly limit.
    pub fn max_incomplete_messages(mut self, max: usize) -> Self {
        self.config.max_incomplete_messages = max;
        self
    }

    /// Set the completed reassembly history size.
    pub fn completed_history_size(mut self, size: usize) -> Self {
        self.config.completed_history_size = size;
        self
    }

    /// Set the first sequence number.
    pub fn initial_sequence(mut self, seq: u32) -> Self {
        self.config.initial_sequence = seq;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ManagerConfig {
        self.config
    }
}

impl Default for ManagerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
