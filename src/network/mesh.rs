//! The network model.
//!
//! [`MeshNetwork`] owns every provisioner, node, key and group and enforces
//! the global uniqueness invariants:
//!
//! - node element spans are unicast and never overlap;
//! - node, provisioner and group identities are unique, as are key indexes;
//! - ranges of one kind owned by different provisioners never overlap;
//! - a node only knows application keys whose bound network key it knows.
//!
//! Every mutating method validates first and either applies the whole change
//! or returns a [`ModelError`] leaving the network untouched.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::Address;
use super::keys::{ApplicationKey, KeyIndex, NetworkKey};
use super::node::{Element, Node};
use super::provisioner::Provisioner;
use super::range::{AddressRange, RangeKind};
use crate::core::ModelError;

/// Network-wide IV index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IvIndex {
    /// Current IV index.
    pub index: u32,
    /// Whether an IV update is in progress.
    pub update_active: bool,
}

impl IvIndex {
    /// IV index in normal operation.
    pub fn new(index: u32) -> Self {
        Self {
            index,
            update_active: false,
        }
    }

    /// IV index used for outgoing PDUs.
    pub fn transmit_index(&self) -> u32 {
        if self.update_active {
            self.index.saturating_sub(1)
        } else {
            self.index
        }
    }

    /// IV index selected by the IVI bit of a received PDU.
    pub fn receive_index(&self, ivi: u8) -> u32 {
        if u32::from(ivi & 1) == self.index & 1 {
            self.index
        } else {
            self.index.saturating_sub(1)
        }
    }
}

/// A named group address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    name: String,
    address: Address,
}

impl Group {
    /// Create a group; `address` must be in the group range.
    pub fn new(name: impl Into<String>, address: Address) -> Result<Self, ModelError> {
        check_group(address)?;
        Ok(Self {
            name: name.into(),
            address,
        })
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Group address.
    pub fn address(&self) -> Address {
        self.address
    }
}

fn check_group(address: Address) -> Result<(), ModelError> {
    if !RangeKind::Group.bounds().contains(address.value()) {
        return Err(ModelError::NotGroup(address.value()));
    }
    Ok(())
}

/// A mesh network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshNetwork {
    uuid: Uuid,
    name: String,
    #[serde(default)]
    iv_index: IvIndex,
    #[serde(default)]
    network_keys: Vec<NetworkKey>,
    #[serde(default)]
    application_keys: Vec<ApplicationKey>,
    #[serde(default)]
    provisioners: Vec<Provisioner>,
    #[serde(default)]
    pub(crate) nodes: Vec<Node>,
    #[serde(default)]
    groups: Vec<Group>,
}

impl MeshNetwork {
    /// An empty network.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            iv_index: IvIndex::default(),
            network_keys: Vec::new(),
            application_keys: Vec::new(),
            provisioners: Vec::new(),
            nodes: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Network UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Network name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current IV index.
    pub fn iv_index(&self) -> IvIndex {
        self.iv_index
    }

    /// Replace the IV index.
    pub fn set_iv_index(&mut self, iv_index: IvIndex) {
        self.iv_index = iv_index;
    }

    // ---- provisioners ----

    /// Provisioners in insertion order.
    pub fn provisioners(&self) -> &[Provisioner] {
        &self.provisioners
    }

    /// Provisioner with the given UUID.
    pub fn provisioner(&self, uuid: Uuid) -> Option<&Provisioner> {
        self.provisioners.iter().find(|p| p.uuid() == uuid)
    }

    /// The provisioner this stack acts as (the first one added).
    pub fn local_provisioner(&self) -> Option<&Provisioner> {
        self.provisioners.first()
    }

    /// Add a provisioner whose ranges do not overlap any existing provisioner.
    pub fn add_provisioner(&mut self, provisioner: Provisioner) -> Result<(), ModelError> {
        if self.provisioner(provisioner.uuid()).is_some() {
            return Err(ModelError::DuplicateProvisioner(provisioner.uuid()));
        }
        for existing in &self.provisioners {
            check_disjoint(&provisioner, existing)?;
        }
        self.provisioners.push(provisioner);
        Ok(())
    }

    /// Allocate another range of `kind` to an existing provisioner.
    pub fn allocate_range(
        &mut self,
        provisioner: Uuid,
        kind: RangeKind,
        range: AddressRange,
    ) -> Result<(), ModelError> {
        let position = self
            .provisioners
            .iter()
            .position(|p| p.uuid() == provisioner)
            .ok_or(ModelError::UnknownProvisioner(provisioner))?;

        let mut updated = self.provisioners[position].clone();
        updated.add_range(kind, range)?;
        for (i, existing) in self.provisioners.iter().enumerate() {
            if i != position {
                check_disjoint(&updated, existing)?;
            }
        }
        self.provisioners[position] = updated;
        Ok(())
    }

    /// Remove a provisioner; its ranges become free.
    pub fn remove_provisioner(&mut self, uuid: Uuid) -> Result<Provisioner, ModelError> {
        let position = self
            .provisioners
            .iter()
            .position(|p| p.uuid() == uuid)
            .ok_or(ModelError::UnknownProvisioner(uuid))?;
        Ok(self.provisioners.remove(position))
    }

    // ---- nodes ----

    /// Nodes sorted by primary address.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Node owning `address` (any of its element addresses).
    pub fn node(&self, address: Address) -> Option<&Node> {
        self.node_position(address).map(|i| &self.nodes[i])
    }

    /// Node with the given UUID.
    pub fn node_with_uuid(&self, uuid: Uuid) -> Option<&Node> {
        self.nodes.iter().find(|n| n.uuid() == uuid)
    }

    /// Element with the given unicast address.
    pub fn element(&self, address: Address) -> Option<&Element> {
        self.node(address)?.element_with_address(address)
    }

    pub(crate) fn node_position(&self, address: Address) -> Option<usize> {
        // Nodes are sorted and disjoint: the candidate is the last node
        // starting at or below `address`.
        let after = self
            .nodes
            .partition_point(|n| n.unicast_address() <= address);
        let candidate = after.checked_sub(1)?;
        self.nodes[candidate]
            .contains_address(address)
            .then_some(candidate)
    }

    pub(crate) fn node_mut(&mut self, address: Address) -> Option<&mut Node> {
        let position = self.node_position(address)?;
        self.nodes.get_mut(position)
    }

    /// Add a node after checking every node invariant.
    pub fn add_node(&mut self, mut node: Node) -> Result<(), ModelError> {
        self.validate_node(&node)?;
        node.renumber_elements();
        let position = self
            .nodes
            .partition_point(|n| n.unicast_address() < node.unicast_address());
        self.nodes.insert(position, node);
        Ok(())
    }

    pub(crate) fn validate_node(&self, node: &Node) -> Result<(), ModelError> {
        let address = node.unicast_address();
        if node.element_count() == 0 {
            return Err(ModelError::NoElements);
        }
        if node.element_count() > usize::from(u8::MAX) {
            return Err(ModelError::TooManyElements(node.element_count()));
        }
        if !address.is_unicast() {
            return Err(ModelError::NotUnicast(address.value()));
        }
        let span = match node.last_address() {
            Some(last) if last.is_unicast() => node.address_range()?,
            _ => {
                return Err(ModelError::SpanOutOfBounds {
                    address: address.value(),
                    element_count: node.element_count(),
                });
            }
        };
        if self.node_with_uuid(node.uuid()).is_some() {
            return Err(ModelError::DuplicateNode(node.uuid()));
        }
        for existing in &self.nodes {
            if existing.address_range()?.overlaps(&span) {
                return Err(ModelError::NodeSpanOverlap {
                    address: address.value(),
                    existing: existing.unicast_address().value(),
                });
            }
        }

        for &net in node.network_keys() {
            if self.network_key(net).is_none() {
                return Err(ModelError::UnknownNetworkKey(net));
            }
        }
        for &app in node.application_keys() {
            let key = self
                .application_key(app)
                .ok_or(ModelError::UnknownApplicationKey(app))?;
            if !node.knows_network_key(key.bound_network_key()) {
                return Err(ModelError::NetworkKeyNotKnown {
                    node: address.value(),
                    net_key: key.bound_network_key(),
                });
            }
        }
        for model in node.elements().iter().flat_map(|e| e.models()) {
            if let Some(&app) = model
                .bound_application_keys()
                .iter()
                .find(|&&app| !node.knows_application_key(app))
            {
                return Err(ModelError::ApplicationKeyNotKnown {
                    node: address.value(),
                    app_key: app,
                });
            }
        }
        Ok(())
    }

    /// Remove the node owning `address`, releasing its span.
    pub fn remove_node(&mut self, address: Address) -> Result<Node, ModelError> {
        let position = self
            .node_position(address)
            .ok_or(ModelError::UnknownNode(address.value()))?;
        Ok(self.nodes.remove(position))
    }

    // ---- keys ----

    /// Network keys in insertion order.
    pub fn network_keys(&self) -> &[NetworkKey] {
        &self.network_keys
    }

    /// Network key with the given index.
    pub fn network_key(&self, index: KeyIndex) -> Option<&NetworkKey> {
        self.network_keys.iter().find(|k| k.index() == index)
    }

    /// Mutable network key, e.g. to drive a key refresh.
    pub fn network_key_mut(&mut self, index: KeyIndex) -> Option<&mut NetworkKey> {
        self.network_keys.iter_mut().find(|k| k.index() == index)
    }

    /// Add a network key with a unique index.
    pub fn add_network_key(&mut self, key: NetworkKey) -> Result<(), ModelError> {
        if self.network_key(key.index()).is_some() {
            return Err(ModelError::DuplicateKeyIndex(key.index()));
        }
        self.network_keys.push(key);
        Ok(())
    }

    /// Remove a network key no application key is bound to.
    pub fn remove_network_key(&mut self, index: KeyIndex) -> Result<NetworkKey, ModelError> {
        let position = self
            .network_keys
            .iter()
            .position(|k| k.index() == index)
            .ok_or(ModelError::UnknownNetworkKey(index))?;
        if self
            .application_keys
            .iter()
            .any(|k| k.bound_network_key() == index)
        {
            return Err(ModelError::KeyInUse(index));
        }
        for node in &mut self.nodes {
            node.network_keys.retain(|&k| k != index);
        }
        Ok(self.network_keys.remove(position))
    }

    /// Application keys in insertion order.
    pub fn application_keys(&self) -> &[ApplicationKey] {
        &self.application_keys
    }

    /// Application key with the given index.
    pub fn application_key(&self, index: KeyIndex) -> Option<&ApplicationKey> {
        self.application_keys.iter().find(|k| k.index() == index)
    }

    /// Mutable application key, e.g. to drive a key refresh.
    pub fn application_key_mut(&mut self, index: KeyIndex) -> Option<&mut ApplicationKey> {
        self.application_keys.iter_mut().find(|k| k.index() == index)
    }

    /// Add an application key bound to an existing network key.
    pub fn add_application_key(&mut self, key: ApplicationKey) -> Result<(), ModelError> {
        if self.application_key(key.index()).is_some() {
            return Err(ModelError::DuplicateKeyIndex(key.index()));
        }
        if self.network_key(key.bound_network_key()).is_none() {
            return Err(ModelError::UnknownNetworkKey(key.bound_network_key()));
        }
        self.application_keys.push(key);
        Ok(())
    }

    /// Remove an application key from the network, every node and every model.
    pub fn remove_application_key(&mut self, index: KeyIndex) -> Result<ApplicationKey, ModelError> {
        let position = self
            .application_keys
            .iter()
            .position(|k| k.index() == index)
            .ok_or(ModelError::UnknownApplicationKey(index))?;
        for node in &mut self.nodes {
            node.application_keys.retain(|&k| k != index);
            for model in node.elements.iter_mut().flat_map(|e| e.models.iter_mut()) {
                model.bound_application_keys.retain(|&k| k != index);
                if model.publish.as_ref().is_some_and(|p| p.app_key_index == index) {
                    model.publish = None;
                }
            }
        }
        Ok(self.application_keys.remove(position))
    }

    // ---- groups ----

    /// Groups in insertion order.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    /// Group with the given address.
    pub fn group(&self, address: Address) -> Option<&Group> {
        self.groups.iter().find(|g| g.address() == address)
    }

    /// Add a group with a unique address.
    pub fn add_group(&mut self, group: Group) -> Result<(), ModelError> {
        check_group(group.address())?;
        if self.group(group.address()).is_some() {
            return Err(ModelError::DuplicateGroup(group.address().value()));
        }
        self.groups.push(group);
        Ok(())
    }

    /// Remove a group.
    pub fn remove_group(&mut self, address: Address) -> Option<Group> {
        let position = self.groups.iter().position(|g| g.address() == address)?;
        Some(self.groups.remove(position))
    }

    // ---- persistence ----

    /// Export as JSON.
    pub fn to_json(&self) -> Result<String, ModelError> {
        serde_json::to_string_pretty(self).map_err(|e| ModelError::Serialization(e.to_string()))
    }

    /// Import from JSON, re-validating every invariant.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let raw: MeshNetwork =
            serde_json::from_str(json).map_err(|e| ModelError::Serialization(e.to_string()))?;

        let mut network = MeshNetwork {
            uuid: raw.uuid,
            name: raw.name,
            iv_index: raw.iv_index,
            ..MeshNetwork::new("")
        };
        for key in raw.network_keys {
            network.add_network_key(key)?;
        }
        for key in raw.application_keys {
            network.add_application_key(key)?;
        }
        for mut provisioner in raw.provisioners {
            provisioner.revalidate()?;
            network.add_provisioner(provisioner)?;
        }
        for group in raw.groups {
            network.add_group(group)?;
        }
        for node in raw.nodes {
            network.add_node(node)?;
        }
        Ok(network)
    }
}

fn check_disjoint(candidate: &Provisioner, existing: &Provisioner) -> Result<(), ModelError> {
    for kind in RangeKind::ALL {
        if let Some(range) = candidate.overlapping_range(existing, kind) {
            return Err(ModelError::RangeOverlap {
                kind: kind.name(),
                lower: range.lower_bound(),
                upper: range.upper_bound(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::keys::Key;
    use crate::network::node::{Model, ModelId};

    fn range(lower: u16, upper: u16) -> AddressRange {
        AddressRange::new(lower, upper).unwrap()
    }

    fn network_with_keys() -> MeshNetwork {
        let mut network = MeshNetwork::new("home");
        network
            .add_network_key(NetworkKey::generate(0, "primary").unwrap())
            .unwrap();
        network
            .add_application_key(ApplicationKey::generate(0, "lights", 0).unwrap())
            .unwrap();
        network
    }

    #[test]
    fn test_iv_index_selection() {
        let iv = IvIndex::new(5);
        assert_eq!(iv.receive_index(1), 5);
        assert_eq!(iv.receive_index(0), 4);
        assert_eq!(iv.transmit_index(), 5);

        let updating = IvIndex {
            index: 6,
            update_active: true,
        };
        assert_eq!(updating.transmit_index(), 5);
        assert_eq!(IvIndex::new(0).receive_index(1), 0);
    }

    #[test]
    fn test_add_node_rejects_overlap() {
        let mut network = MeshNetwork::new("home");
        network.add_node(Node::new("a", Address::new(10), 5)).unwrap();

        let result = network.add_node(Node::new("b", Address::new(14), 2));
        assert_eq!(
            result,
            Err(ModelError::NodeSpanOverlap {
                address: 14,
                existing: 10
            })
        );
        assert_eq!(network.nodes().len(), 1);

        network.add_node(Node::new("c", Address::new(15), 2)).unwrap();
        network.add_node(Node::new("d", Address::new(1), 9)).unwrap();
        let addresses: Vec<u16> = network.nodes().iter().map(|n| n.unicast_address().value()).collect();
        assert_eq!(addresses, vec![1, 10, 15]);
    }

    #[test]
    fn test_add_node_rejects_invalid_span() {
        let mut network = MeshNetwork::new("home");
        assert_eq!(
            network.add_node(Node::new("none", Address::new(1), 0)),
            Err(ModelError::NoElements)
        );
        assert_eq!(
            network.add_node(Node::new("group", Address::new(0xC000), 1)),
            Err(ModelError::NotUnicast(0xC000))
        );
        assert_eq!(
            network.add_node(Node::new("edge", Address::new(0x7FFE), 3)),
            Err(ModelError::SpanOutOfBounds {
                address: 0x7FFE,
                element_count: 3
            })
        );
        assert!(network.nodes().is_empty());
    }

    #[test]
    fn test_add_node_rejects_too_many_elements() {
        let mut network = MeshNetwork::new("home");
        let elements = |count| (0..count).map(|_| Element::new(0, Vec::new())).collect::<Vec<_>>();
        assert_eq!(
            network.add_node(Node::with_elements("wall", Address::new(1), elements(256))),
            Err(ModelError::TooManyElements(256))
        );
        network
            .add_node(Node::with_elements("panel", Address::new(1), elements(255)))
            .unwrap();
        assert_eq!(network.node(Address::new(255)).unwrap().element_count(), 255);
    }

    #[test]
    fn test_add_node_rejects_duplicate_uuid() {
        let mut network = MeshNetwork::new("home");
        let uuid = Uuid::new_v4();
        network
            .add_node(Node::new("a", Address::new(1), 1).with_uuid(uuid))
            .unwrap();
        assert_eq!(
            network.add_node(Node::new("b", Address::new(2), 1).with_uuid(uuid)),
            Err(ModelError::DuplicateNode(uuid))
        );
    }

    #[test]
    fn test_add_node_requires_bound_network_key() {
        let mut network = network_with_keys();
        let node = Node::new("a", Address::new(1), 1).with_keys(vec![], vec![0]);
        assert_eq!(
            network.add_node(node),
            Err(ModelError::NetworkKeyNotKnown { node: 1, net_key: 0 })
        );

        let node = Node::new("a", Address::new(1), 1).with_keys(vec![0], vec![0]);
        network.add_node(node).unwrap();
    }

    #[test]
    fn test_node_lookup_by_element_address() {
        let mut network = MeshNetwork::new("home");
        network.add_node(Node::new("a", Address::new(10), 3)).unwrap();
        network.add_node(Node::new("b", Address::new(20), 1)).unwrap();

        assert_eq!(network.node(Address::new(12)).unwrap().name(), "a");
        assert!(network.node(Address::new(13)).is_none());
        assert!(network.node(Address::new(9)).is_none());
        assert_eq!(network.element(Address::new(11)).unwrap().index(), 1);
    }

    #[test]
    fn test_remove_node_releases_span() {
        let mut network = MeshNetwork::new("home");
        network.add_node(Node::new("a", Address::new(10), 3)).unwrap();
        network.remove_node(Address::new(10)).unwrap();
        network.add_node(Node::new("b", Address::new(11), 1)).unwrap();
        assert_eq!(
            network.remove_node(Address::new(30)),
            Err(ModelError::UnknownNode(30))
        );
    }

    #[test]
    fn test_provisioner_ranges_must_not_overlap() {
        let mut network = MeshNetwork::new("home");
        let a = Provisioner::new("a", vec![range(1, 0x100)], vec![], vec![range(1, 10)]).unwrap();
        network.add_provisioner(a.clone()).unwrap();

        let b = Provisioner::new("b", vec![range(0x101, 0x200)], vec![], vec![range(10, 20)]).unwrap();
        assert!(matches!(
            network.add_provisioner(b),
            Err(ModelError::RangeOverlap { kind: "scene", .. })
        ));
        assert_eq!(
            network.add_provisioner(a.clone()),
            Err(ModelError::DuplicateProvisioner(a.uuid()))
        );
    }

    #[test]
    fn test_allocate_range_checks_other_provisioners() {
        let mut network = MeshNetwork::new("home");
        let a = Provisioner::new("a", vec![range(1, 0x100)], vec![], vec![]).unwrap();
        let b = Provisioner::new("b", vec![range(0x200, 0x300)], vec![], vec![]).unwrap();
        let (a_id, b_id) = (a.uuid(), b.uuid());
        network.add_provisioner(a).unwrap();
        network.add_provisioner(b).unwrap();

        network
            .allocate_range(a_id, RangeKind::Unicast, range(0x101, 0x1FF))
            .unwrap();
        assert_eq!(network.provisioner(a_id).unwrap().unicast_ranges(), &[range(1, 0x1FF)]);

        assert!(matches!(
            network.allocate_range(b_id, RangeKind::Unicast, range(0x180, 0x1FF)),
            Err(ModelError::RangeOverlap { .. })
        ));
        assert_eq!(network.provisioner(b_id).unwrap().unicast_ranges(), &[range(0x200, 0x300)]);
    }

    #[test]
    fn test_application_key_requires_network_key() {
        let mut network = MeshNetwork::new("home");
        assert_eq!(
            network.add_application_key(ApplicationKey::generate(0, "app", 3).unwrap()),
            Err(ModelError::UnknownNetworkKey(3))
        );
    }

    #[test]
    fn test_remove_network_key_in_use() {
        let mut network = network_with_keys();
        assert_eq!(network.remove_network_key(0), Err(ModelError::KeyInUse(0)));
        network.remove_application_key(0).unwrap();
        network.remove_network_key(0).unwrap();
        assert!(network.network_keys().is_empty());
    }

    #[test]
    fn test_remove_application_key_cascades() {
        let mut network = network_with_keys();
        let mut model = Model::new(ModelId::Sig(0x1000));
        model.bound_application_keys.push(0);
        let elements = vec![Element::new(0, vec![model])];
        let node = Node::with_elements("a", Address::new(1), elements).with_keys(vec![0], vec![0]);
        network.add_node(node).unwrap();

        network.remove_application_key(0).unwrap();
        let node = network.node(Address::new(1)).unwrap();
        assert!(node.application_keys().is_empty());
        assert!(node.elements()[0].models()[0].bound_application_keys().is_empty());
    }

    #[test]
    fn test_groups() {
        let mut network = MeshNetwork::new("home");
        network.add_group(Group::new("kitchen", Address::new(0xC001)).unwrap()).unwrap();
        assert_eq!(
            network.add_group(Group::new("again", Address::new(0xC001)).unwrap()),
            Err(ModelError::DuplicateGroup(0xC001))
        );
        assert_eq!(
            Group::new("bad", Address::ALL_NODES).unwrap_err(),
            ModelError::NotGroup(0xFFFF)
        );
        assert!(network.remove_group(Address::new(0xC001)).is_some());
    }

    #[test]
    fn test_json_round_trip() {
        let mut network = network_with_keys();
        network
            .add_provisioner(Provisioner::new("admin", vec![range(1, 0x7FFF)], vec![], vec![]).unwrap())
            .unwrap();
        let node = Node::new("a", Address::new(5), 2)
            .with_device_key(Key::new([7; 16]))
            .with_keys(vec![0], vec![0]);
        network.add_node(node).unwrap();
        network.add_group(Group::new("all lights", Address::new(0xC000)).unwrap()).unwrap();
        network.set_iv_index(IvIndex::new(42));

        let json = network.to_json().unwrap();
        let restored = MeshNetwork::from_json(&json).unwrap();
        assert_eq!(restored, network);
    }

    #[test]
    fn test_json_import_revalidates() {
        let mut network = MeshNetwork::new("home");
        network.add_node(Node::new("a", Address::new(5), 2)).unwrap();
        network.add_node(Node::new("b", Address::new(7), 2)).unwrap();

        // Move "b" onto "a" in the exported document.
        let json = network.to_json().unwrap().replace("\"unicastAddress\": 7", "\"unicastAddress\": 6");
        assert!(matches!(
            MeshNetwork::from_json(&json),
            Err(ModelError::NodeSpanOverlap { .. })
        ));
        assert!(matches!(
            MeshNetwork::from_json("{not json"),
            Err(ModelError::Serialization(_))
        ));
    }
}
