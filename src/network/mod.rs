//! Network model: addresses, ranges, provisioners, nodes, keys and groups,
//! plus the address allocator and the key/binding registry built on them.

mod address;
mod allocator;
mod keys;
mod mesh;
mod node;
mod provisioner;
mod range;
mod registry;

pub use address::{Address, AddressKind};
pub use keys::{ApplicationKey, Key, KeyIndex, KeyRefreshPhase, NetworkKey};
pub use mesh::{Group, IvIndex, MeshNetwork};
pub use node::{Element, Model, ModelId, Node, Publish};
pub use provisioner::Provisioner;
pub use range::{AddressRange, RangeKind};
pub use registry::KeyRef;
