//! Address allocation.
//!
//! All searches are read-only; committing the result is a separate,
//! validated step (or [`MeshNetwork::add_node_with_next_address`], which does
//! both under one `&mut` borrow).

use std::collections::BTreeSet;

use uuid::Uuid;

use super::address::Address;
use super::mesh::MeshNetwork;
use super::node::Node;
use super::provisioner::Provisioner;
use super::range::{AddressRange, RangeKind};
use crate::core::ModelError;

impl MeshNetwork {
    /// Lowest address `a` such that `a..a + element_count` lies inside one of
    /// the provisioner's unicast ranges and overlaps no node.
    ///
    /// Returns `None` when `element_count` is 0 or no range has room.
    pub fn next_unicast_address(
        &self,
        element_count: usize,
        provisioner: &Provisioner,
    ) -> Option<Address> {
        let count = u32::try_from(element_count).ok().filter(|&c| c > 0)?;

        let spans: Vec<(u32, u32)> = self
            .nodes()
            .iter()
            .filter_map(|n| n.address_range().ok())
            .map(|r| (u32::from(r.lower_bound()), u32::from(r.upper_bound())))
            .collect();

        // Ranges ascend and candidates only grow, so the node cursor never
        // moves backwards.
        let mut cursor = 0;
        for range in provisioner.unicast_ranges() {
            let upper = u32::from(range.upper_bound());
            let mut candidate = u32::from(range.lower_bound());
            loop {
                let end = candidate + count - 1;
                if end > upper {
                    break;
                }
                while cursor < spans.len() && spans[cursor].1 < candidate {
                    cursor += 1;
                }
                match spans.get(cursor) {
                    Some(&(start, node_end)) if start <= end => candidate = node_end + 1,
                    _ => return u16::try_from(candidate).ok().map(Address::new),
                }
            }
        }
        None
    }

    /// A free unicast range not allocated to any provisioner.
    ///
    /// With `size`, the lowest gap of at least `size` addresses, trimmed to
    /// `size`. Without, the whole largest gap (ties go to the lowest).
    pub fn next_unicast_address_range(&self, size: Option<u16>) -> Option<AddressRange> {
        self.next_free_range(RangeKind::Unicast, size)
    }

    /// A free group range not allocated to any provisioner.
    pub fn next_group_address_range(&self, size: Option<u16>) -> Option<AddressRange> {
        self.next_free_range(RangeKind::Group, size)
    }

    /// A free scene range not allocated to any provisioner.
    pub fn next_scene_range(&self, size: Option<u16>) -> Option<AddressRange> {
        self.next_free_range(RangeKind::Scene, size)
    }

    fn next_free_range(&self, kind: RangeKind, size: Option<u16>) -> Option<AddressRange> {
        let allocated = AddressRange::merged(
            self.provisioners()
                .iter()
                .flat_map(|p| p.ranges(kind).iter().copied()),
        );
        let gaps = AddressRange::gaps(&allocated, kind.bounds());

        match size {
            Some(0) => None,
            Some(size) => {
                let gap = gaps.iter().find(|g| g.len() >= u32::from(size))?;
                let lower = gap.lower_bound();
                AddressRange::new(lower, lower + (size - 1)).ok()
            }
            None => gaps
                .into_iter()
                .fold(None, |best: Option<AddressRange>, gap| match best {
                    Some(b) if b.len() >= gap.len() => Some(b),
                    _ => Some(gap),
                }),
        }
    }

    /// Lowest address in the provisioner's group ranges not used by a group.
    pub fn next_group_address(&self, provisioner: &Provisioner) -> Option<Address> {
        let used: BTreeSet<u16> = self.groups().iter().map(|g| g.address().value()).collect();
        provisioner
            .group_ranges()
            .iter()
            .flat_map(|r| r.lower_bound()..=r.upper_bound())
            .find(|a| !used.contains(a))
            .map(Address::new)
    }

    /// Assign `node` the next free unicast address of `provisioner` and add it.
    pub fn add_node_with_next_address(
        &mut self,
        provisioner: Uuid,
        mut node: Node,
    ) -> Result<Address, ModelError> {
        let owner = self
            .provisioner(provisioner)
            .ok_or(ModelError::UnknownProvisioner(provisioner))?;
        let address = self
            .next_unicast_address(node.element_count(), owner)
            .ok_or(ModelError::NoAddressAvailable {
                element_count: node.element_count(),
            })?;
        node.set_unicast_address(address);
        self.add_node(node)?;
        Ok(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mesh::Group;

    fn range(lower: u16, upper: u16) -> AddressRange {
        AddressRange::new(lower, upper).unwrap()
    }

    fn provisioner(unicast: Vec<AddressRange>) -> Provisioner {
        Provisioner::new("admin", unicast, vec![], vec![]).unwrap()
    }

    fn add_nodes(network: &mut MeshNetwork, nodes: &[(u16, u8)]) {
        for (i, &(address, elements)) in nodes.iter().enumerate() {
            network
                .add_node(Node::new(format!("node {i}"), Address::new(address), elements))
                .unwrap();
        }
    }

    #[test]
    fn test_next_unicast_address_empty_network() {
        let network = MeshNetwork::new("home");
        let p = provisioner(vec![range(1, 0x7FFF)]);
        assert_eq!(network.next_unicast_address(6, &p), Some(Address::new(1)));
    }

    #[test]
    fn test_next_unicast_address_zero_elements() {
        let network = MeshNetwork::new("home");
        let p = provisioner(vec![range(1, 0x7FFF)]);
        assert_eq!(network.next_unicast_address(0, &p), None);
    }

    #[test]
    fn test_next_unicast_address_after_nodes() {
        let mut network = MeshNetwork::new("home");
        add_nodes(&mut network, &[(1, 9), (10, 9), (20, 9), (30, 9)]);
        let p = provisioner(vec![range(100, 200)]);
        assert_eq!(network.next_unicast_address(6, &p), Some(Address::new(100)));

        add_nodes(&mut network, &[(103, 5)]);
        assert_eq!(network.next_unicast_address(6, &p), Some(Address::new(108)));
    }

    #[test]
    fn test_next_unicast_address_exhausted() {
        let mut network = MeshNetwork::new("home");
        add_nodes(
            &mut network,
            &[(1, 10), (12, 18), (30, 11), (55, 10), (65, 5), (73, 5)],
        );
        let p = provisioner(vec![range(8, 38), range(50, 80)]);
        assert_eq!(network.next_unicast_address(6, &p), None);
    }

    #[test]
    fn test_next_unicast_address_advanced() {
        let mut network = MeshNetwork::new("home");
        add_nodes(
            &mut network,
            &[(1, 10), (12, 18), (30, 11), (55, 10), (65, 5), (73, 5)],
        );
        let p = provisioner(vec![range(8, 38), range(50, 100), range(120, 150)]);
        assert_eq!(network.next_unicast_address(6, &p), Some(Address::new(78)));
    }

    #[test]
    fn test_next_unicast_address_never_straddles_ranges() {
        let network = MeshNetwork::new("home");
        let p = provisioner(vec![range(1, 4), range(10, 20)]);
        assert_eq!(network.next_unicast_address(5, &p), Some(Address::new(10)));
    }

    #[test]
    fn test_next_unicast_address_result_is_free() {
        let mut network = MeshNetwork::new("home");
        add_nodes(&mut network, &[(1, 3), (5, 1), (8, 4), (13, 2)]);
        let p = provisioner(vec![range(1, 100)]);
        for count in 1..6 {
            let address = network.next_unicast_address(count, &p).unwrap();
            let node = Node::new("probe", address, count as u8);
            assert!(network.validate_node(&node).is_ok(), "count {count}");
        }
    }

    fn network_with_unicast_ranges(ranges: Vec<AddressRange>) -> MeshNetwork {
        let mut network = MeshNetwork::new("home");
        network.add_provisioner(provisioner(ranges)).unwrap();
        network
    }

    #[test]
    fn test_next_unicast_address_range() {
        let network = network_with_unicast_ranges(vec![
            range(0x0001, 0x00FF),
            range(0x0120, 0x0FFF),
            range(0x2000, 0x2FFF),
            range(0x6000, 0x7FFF),
        ]);

        assert_eq!(network.next_unicast_address_range(Some(1)), Some(range(0x0100, 0x0100)));
        assert_eq!(network.next_unicast_address_range(Some(0x51)), Some(range(0x1000, 0x1050)));
        assert_eq!(network.next_unicast_address_range(Some(0x1000)), Some(range(0x1000, 0x1FFF)));
        assert_eq!(network.next_unicast_address_range(Some(0x2000)), Some(range(0x3000, 0x4FFF)));
        assert_eq!(network.next_unicast_address_range(None), Some(range(0x3000, 0x5FFF)));
        assert_eq!(network.next_unicast_address_range(Some(0x3001)), None);
        assert_eq!(network.next_unicast_address_range(Some(0)), None);
    }

    #[test]
    fn test_next_unicast_address_range_full() {
        let network = network_with_unicast_ranges(vec![range(1, 0x7FFF)]);
        assert_eq!(network.next_unicast_address_range(Some(1)), None);
        assert_eq!(network.next_unicast_address_range(None), None);
    }

    #[test]
    fn test_largest_gap_tie_goes_to_lowest() {
        let network = network_with_unicast_ranges(vec![range(0x11, 0x7FEF)]);
        assert_eq!(network.next_unicast_address_range(None), Some(range(0x01, 0x10)));
    }

    #[test]
    fn test_next_group_and_scene_ranges() {
        let mut network = MeshNetwork::new("home");
        let p = Provisioner::new(
            "admin",
            vec![],
            vec![range(0xC000, 0xC0FF)],
            vec![range(1, 0x10)],
        )
        .unwrap();
        network.add_provisioner(p).unwrap();

        assert_eq!(network.next_group_address_range(Some(0x100)), Some(range(0xC100, 0xC1FF)));
        assert_eq!(network.next_group_address_range(None), Some(range(0xC100, 0xFEFF)));
        assert_eq!(network.next_scene_range(Some(4)), Some(range(0x11, 0x14)));
    }

    #[test]
    fn test_next_group_address_skips_used() {
        let mut network = MeshNetwork::new("home");
        let p = Provisioner::new("admin", vec![], vec![range(0xC000, 0xC001), range(0xC010, 0xC010)], vec![])
            .unwrap();
        assert_eq!(network.next_group_address(&p), Some(Address::new(0xC000)));

        network.add_group(Group::new("a", Address::new(0xC000)).unwrap()).unwrap();
        network.add_group(Group::new("b", Address::new(0xC001)).unwrap()).unwrap();
        assert_eq!(network.next_group_address(&p), Some(Address::new(0xC010)));

        network.add_group(Group::new("c", Address::new(0xC010)).unwrap()).unwrap();
        assert_eq!(network.next_group_address(&p), None);
    }

    #[test]
    fn test_add_node_with_next_address() {
        let mut network = MeshNetwork::new("home");
        let p = provisioner(vec![range(1, 5)]);
        let id = p.uuid();
        network.add_provisioner(p).unwrap();

        let first = network
            .add_node_with_next_address(id, Node::new("a", Address::UNASSIGNED, 3))
            .unwrap();
        let second = network
            .add_node_with_next_address(id, Node::new("b", Address::UNASSIGNED, 2))
            .unwrap();
        assert_eq!((first, second), (Address::new(1), Address::new(4)));

        assert_eq!(
            network.add_node_with_next_address(id, Node::new("c", Address::UNASSIGNED, 1)),
            Err(ModelError::NoAddressAvailable { element_count: 1 })
        );
        assert_eq!(network.nodes().len(), 2);
    }
}
