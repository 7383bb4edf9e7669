//! Mesh network manager.
//!
//! High-level API tying the network model, access codec and transport
//! engine to a bearer.

mod config;
mod delegate;
mod handle;
#[allow(clippy::module_inception)]
mod manager;
mod outbound;

pub use config::{ManagerConfig, ManagerConfigBuilder};
pub use delegate::{ChannelDelegate, MeshEvent, MeshNetworkDelegate};
pub use handle::{ExchangeResult, MessageHandle};
pub use manager::MeshNetworkManager;
