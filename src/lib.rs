//! # btmesh
//!
//! A Bluetooth Mesh network stack.
//!
//! - **Network model**: provisioners, nodes, keys and groups, persisted as JSON
//! - **Allocation**: free unicast, group and scene ranges and addresses
//! - **Key registry**: which node knows which key, which model is bound to what
//! - **Access layer**: opcodes and typed Generic and Configuration messages
//! - **Transport**: network obfuscation and encryption, segmentation,
//!   reassembly and segment acknowledgment with retransmission
//! - **Manager**: send and receive orchestration over a pluggable bearer
//!
//! ## Feature Flags
//!
//! - `crypto` (default): key derivation, AEAD, header obfuscation, replay cache
//! - `transport` (default): PDU codecs, segmentation and the exchange engine
//! - `manager` (default): [`manager::MeshNetworkManager`]
//!
//! ## Layers
//!
//! ```text
//! +--------------------------------------------+
//! |  manager: MeshNetworkManager, delegate     |
//! +--------------------------------------------+
//! |  access: MeshMessage, MessageRegistry      |
//! +--------------------------------------------+
//! |  transport: upper / lower / network PDUs   |
//! +--------------------------------------------+
//! |  Bearer (ADV, GATT proxy, test channel)    |
//! +--------------------------------------------+
//! ```
//!
//! ## Example Usage
//!
//! ```rust
//! use btmesh::prelude::*;
//!
//! let mut network = MeshNetwork::new("home");
//! network
//!     .add_network_key(NetworkKey::generate(0, "primary").unwrap())
//!     .unwrap();
//! let provisioner = Provisioner::new(
//!     "phone",
//!     vec![AddressRange::new(0x0001, 0x00FF).unwrap()],
//!     vec![AddressRange::new(0xC000, 0xC0FF).unwrap()],
//!     Vec::new(),
//! )
//! .unwrap();
//! network.add_provisioner(provisioner.clone()).unwrap();
//!
//! let address = network.next_unicast_address(3, &provisioner);
//! assert_eq!(address, Some(Address::new(0x0001)));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

// Core module (always included)
pub mod core;

// Network model, allocator and key registry
pub mod network;

// Access layer
pub mod access;

// Crypto layer (feature-gated)
#[cfg(feature = "crypto")]
#[cfg_attr(docsrs, doc(cfg(feature = "crypto")))]
pub mod crypto;

// Transport layer (feature-gated)
#[cfg(feature = "transport")]
#[cfg_attr(docsrs, doc(cfg(feature = "transport")))]
pub mod transport;

// Manager (feature-gated)
#[cfg(feature = "manager")]
#[cfg_attr(docsrs, doc(cfg(feature = "manager")))]
pub mod manager;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    pub use crate::access::{MessageRegistry, TidCounter, Transition, TransitionTime, UnknownMessage};
    pub use crate::network::{
        Address, AddressRange, ApplicationKey, Element, Group, IvIndex, Key, KeyIndex, MeshNetwork,
        Model, ModelId, NetworkKey, Node, Provisioner, RangeKind,
    };

    #[cfg(feature = "transport")]
    pub use crate::transport::{Bearer, ChannelBearer, ExchangeState, TransportError};

    #[cfg(feature = "manager")]
    pub use crate::manager::{
        ChannelDelegate, ManagerConfig, MeshEvent, MeshNetworkDelegate, MeshNetworkManager,
        MessageHandle,
    };
}

// Re-export commonly used items at crate root
pub use core::{MeshError, MeshMessage, ModelError, SendError};
pub use network::{Address, MeshNetwork};

#[cfg(feature = "manager")]
pub use manager::MeshNetworkManager;
