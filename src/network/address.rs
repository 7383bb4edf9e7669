//! Mesh addresses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{
    ALL_FRIENDS_ADDRESS, ALL_NODES_ADDRESS, ALL_PROXIES_ADDRESS, ALL_RELAYS_ADDRESS,
    MAX_GROUP_ADDRESS, MAX_RESERVED_ADDRESS, MAX_UNICAST_ADDRESS, MAX_VIRTUAL_ADDRESS,
    MIN_GROUP_ADDRESS, MIN_RESERVED_ADDRESS, MIN_UNICAST_ADDRESS, MIN_VIRTUAL_ADDRESS,
    UNASSIGNED_ADDRESS,
};

/// Address class, derived from the numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressKind {
    /// 0x0000.
    Unassigned,
    /// 0x0001..=0x7FFF, assigned to elements.
    Unicast,
    /// 0x8000..=0xBFFF, hash of a label UUID.
    Virtual,
    /// 0xC000..=0xFEFF.
    Group,
    /// 0xFF00..=0xFFFB, reserved for future fixed groups.
    Reserved,
    /// 0xFFFC.
    AllProxies,
    /// 0xFFFD.
    AllFriends,
    /// 0xFFFE.
    AllRelays,
    /// 0xFFFF.
    AllNodes,
}

/// A 16-bit mesh address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u16);

impl Address {
    /// The unassigned address.
    pub const UNASSIGNED: Self = Self(UNASSIGNED_ADDRESS);
    /// All proxies.
    pub const ALL_PROXIES: Self = Self(ALL_PROXIES_ADDRESS);
    /// All friends.
    pub const ALL_FRIENDS: Self = Self(ALL_FRIENDS_ADDRESS);
    /// All relays.
    pub const ALL_RELAYS: Self = Self(ALL_RELAYS_ADDRESS);
    /// All nodes.
    pub const ALL_NODES: Self = Self(ALL_NODES_ADDRESS);

    /// Wrap a raw address.
    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    /// Raw value.
    pub const fn value(self) -> u16 {
        self.0
    }

    /// Address class.
    pub fn kind(self) -> AddressKind {
        match self.0 {
            UNASSIGNED_ADDRESS => AddressKind::Unassigned,
            MIN_UNICAST_ADDRESS..=MAX_UNICAST_ADDRESS => AddressKind::Unicast,
            MIN_VIRTUAL_ADDRESS..=MAX_VIRTUAL_ADDRESS => AddressKind::Virtual,
            MIN_GROUP_ADDRESS..=MAX_GROUP_ADDRESS => AddressKind::Group,
            MIN_RESERVED_ADDRESS..=MAX_RESERVED_ADDRESS => AddressKind::Reserved,
            ALL_PROXIES_ADDRESS => AddressKind::AllProxies,
            ALL_FRIENDS_ADDRESS => AddressKind::AllFriends,
            ALL_RELAYS_ADDRESS => AddressKind::AllRelays,
            ALL_NODES_ADDRESS => AddressKind::AllNodes,
        }
    }

    /// Whether this is the unassigned address.
    pub fn is_unassigned(self) -> bool {
        self.0 == UNASSIGNED_ADDRESS
    }

    /// Whether this is a unicast address.
    pub fn is_unicast(self) -> bool {
        self.kind() == AddressKind::Unicast
    }

    /// Whether this is a virtual address.
    pub fn is_virtual(self) -> bool {
        self.kind() == AddressKind::Virtual
    }

    /// Whether this is a group address, including the fixed groups.
    pub fn is_group(self) -> bool {
        matches!(
            self.kind(),
            AddressKind::Group
                | AddressKind::AllProxies
                | AddressKind::AllFriends
                | AddressKind::AllRelays
                | AddressKind::AllNodes
        )
    }

    /// Whether this is one of the fixed group addresses.
    pub fn is_fixed_group(self) -> bool {
        self.is_group() && self.kind() != AddressKind::Group
    }

    /// Only unicast addresses may appear as a source.
    pub fn is_valid_source(self) -> bool {
        self.is_unicast()
    }

    /// Whether a message may be addressed here.
    pub fn is_valid_destination(self) -> bool {
        !matches!(self.kind(), AddressKind::Unassigned | AddressKind::Reserved)
    }

    /// Address `offset` elements further, if it does not overflow.
    pub fn checked_add(self, offset: u16) -> Option<Self> {
        self.0.checked_add(offset).map(Self)
    }
}

impl From<u16> for Address {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<Address> for u16 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl PartialEq<u16> for Address {
    fn eq(&self, other: &u16) -> bool {
        self.0 == *other
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address(0x{:04X})", self.0)
    }
}
