//! Protocol constants for the mesh stack.
//!
//! Address space boundaries and PDU field sizes are fixed by the Bluetooth
//! Mesh layout and MUST NOT be changed. Timing values are defaults; the
//! manager configuration can override them.

use std::time::Duration;

// =============================================================================
// ADDRESS SPACE
// =============================================================================

/// The unassigned address.
pub const UNASSIGNED_ADDRESS: u16 = 0x0000;

/// Lowest unicast address.
pub const MIN_UNICAST_ADDRESS: u16 = 0x0001;

/// Highest unicast address.
pub const MAX_UNICAST_ADDRESS: u16 = 0x7FFF;

/// Lowest virtual address.
pub const MIN_VIRTUAL_ADDRESS: u16 = 0x8000;

/// Highest virtual address.
pub const MAX_VIRTUAL_ADDRESS: u16 = 0xBFFF;

/// Lowest group address.
pub const MIN_GROUP_ADDRESS: u16 = 0xC000;

/// Highest group address that may be allocated to a group.
pub const MAX_GROUP_ADDRESS: u16 = 0xFEFF;

/// Lowest reserved fixed-group address.
pub const MIN_RESERVED_ADDRESS: u16 = 0xFF00;

/// Highest reserved fixed-group address.
pub const MAX_RESERVED_ADDRESS: u16 = 0xFFFB;

/// All-proxies fixed group address.
pub const ALL_PROXIES_ADDRESS: u16 = 0xFFFC;

/// All-friends fixed group address.
pub const ALL_FRIENDS_ADDRESS: u16 = 0xFFFD;

/// All-relays fixed group address.
pub const ALL_RELAYS_ADDRESS: u16 = 0xFFFE;

/// All-nodes fixed group address.
pub const ALL_NODES_ADDRESS: u16 = 0xFFFF;

/// Lowest scene number.
pub const MIN_SCENE_NUMBER: u16 = 0x0001;

/// Highest scene number.
pub const MAX_SCENE_NUMBER: u16 = 0xFFFF;

// =============================================================================
// KEYS
// =============================================================================

/// Size of network, application and device keys.
pub const KEY_SIZE: usize = 16;

/// Highest valid 12-bit key index.
pub const MAX_KEY_INDEX: u16 = 0x0FFF;

/// Size of derived AEAD keys (ChaCha20-Poly1305).
pub const DERIVED_KEY_SIZE: usize = 32;

/// Size of the network identifier.
pub const NETWORK_ID_SIZE: usize = 8;

/// Size of a label UUID used for virtual addresses.
pub const LABEL_UUID_SIZE: usize = 16;

// =============================================================================
// PDU SIZES
// =============================================================================

/// Poly1305 authentication tag size (NetMIC and TransMIC).
pub const MIC_SIZE: usize = 16;

/// AEAD nonce size.
pub const NONCE_SIZE: usize = 12;

/// Network PDU header: IVI/NID, CTL/TTL, SEQ (3), SRC (2).
pub const NETWORK_HEADER_SIZE: usize = 7;

/// Obfuscated portion of the header: CTL/TTL, SEQ, SRC.
pub const OBFUSCATED_HEADER_SIZE: usize = 6;

/// Number of ciphertext bytes used as privacy random.
pub const PRIVACY_RANDOM_SIZE: usize = 7;

/// Largest access PDU sent unsegmented. The upper transport PDU adds
/// the TransMIC and still fits a single lower transport PDU.
pub const MAX_UNSEGMENTED_ACCESS_PAYLOAD: usize = 11;

/// Upper transport bytes carried by one access segment.
pub const SEGMENT_PAYLOAD_SIZE: usize = 12;

/// Maximum number of segments in one segmented message (5-bit SegN).
pub const MAX_SEGMENTS: usize = 32;

/// Largest upper transport PDU that can be segmented.
pub const MAX_SEGMENTED_PAYLOAD: usize = MAX_SEGMENTS * SEGMENT_PAYLOAD_SIZE;

/// Largest access PDU that can be sent at all.
pub const MAX_ACCESS_PAYLOAD: usize = MAX_SEGMENTED_PAYLOAD - MIC_SIZE;

/// Mask for the 13-bit SeqZero field.
pub const SEQ_ZERO_MASK: u32 = 0x1FFF;

/// Highest 24-bit sequence number.
pub const MAX_SEQUENCE_NUMBER: u32 = 0x00FF_FFFF;

/// Highest TTL value.
pub const MAX_TTL: u8 = 0x7F;

/// Segment acknowledgment control opcode.
pub const SEGMENT_ACK_OPCODE: u8 = 0x00;

// =============================================================================
// TIMING DEFAULTS
// =============================================================================

/// Default TTL for outgoing messages.
pub const DEFAULT_TTL: u8 = 5;

/// Base interval of the segment transmission timer; 50 ms per TTL is added.
pub const TRANSMISSION_TIMER_INTERVAL: Duration = Duration::from_millis(200);

/// Per-hop addition to the segment transmission timer.
pub const TRANSMISSION_TIMER_PER_TTL: Duration = Duration::from_millis(50);

/// Maximum backoff for the segment transmission timer.
pub const MAX_TRANSMISSION_INTERVAL: Duration = Duration::from_secs(10);

/// Exponential backoff multiplier applied after each retransmission round.
pub const RETRANSMISSION_BACKOFF: u32 = 2;

/// Number of retransmission rounds for unacknowledged segments.
pub const RETRANSMISSION_LIMIT: u32 = 5;

/// Time after which a partially reassembled message is discarded.
pub const INCOMPLETE_MESSAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Time to wait for the response to an acknowledged message.
pub const ACKNOWLEDGMENT_MESSAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Number of concurrently reassembled messages before answering busy.
pub const MAX_INCOMPLETE_MESSAGES: usize = 8;

/// Number of completed reassemblies remembered for duplicate acks.
pub const COMPLETED_HISTORY_SIZE: usize = 64;
