//! Provisioners and their allocated ranges.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::Address;
use super::range::{AddressRange, RangeKind};
use crate::core::ModelError;

/// An allocation authority owning unicast, group and scene ranges.
///
/// Ranges of each kind are kept sorted and merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provisioner {
    uuid: Uuid,
    name: String,
    #[serde(default)]
    unicast_ranges: Vec<AddressRange>,
    #[serde(default)]
    group_ranges: Vec<AddressRange>,
    #[serde(default)]
    scene_ranges: Vec<AddressRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unicast_address: Option<Address>,
}

impl Provisioner {
    /// Create a provisioner. Every range must lie within the bounds of its kind.
    pub fn new(
        name: impl Into<String>,
        unicast_ranges: Vec<AddressRange>,
        group_ranges: Vec<AddressRange>,
        scene_ranges: Vec<AddressRange>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            unicast_ranges: normalize(RangeKind::Unicast, unicast_ranges)?,
            group_ranges: normalize(RangeKind::Group, group_ranges)?,
            scene_ranges: normalize(RangeKind::Scene, scene_ranges)?,
            unicast_address: None,
        })
    }

    /// Replace the UUID.
    pub fn with_uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = uuid;
        self
    }

    /// Set the unicast address of this provisioner's own node.
    pub fn with_unicast_address(mut self, address: Address) -> Result<Self, ModelError> {
        if !address.is_unicast() {
            return Err(ModelError::NotUnicast(address.value()));
        }
        self.unicast_address = Some(address);
        Ok(self)
    }

    /// Provisioner UUID.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Human readable name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address of the provisioner's own node, if it has one.
    pub fn unicast_address(&self) -> Option<Address> {
        self.unicast_address
    }

    /// Allocated unicast ranges.
    pub fn unicast_ranges(&self) -> &[AddressRange] {
        &self.unicast_ranges
    }

    /// Allocated group ranges.
    pub fn group_ranges(&self) -> &[AddressRange] {
        &self.group_ranges
    }

    /// Allocated scene ranges.
    pub fn scene_ranges(&self) -> &[AddressRange] {
        &self.scene_ranges
    }

    /// Allocated ranges of `kind`.
    pub fn ranges(&self, kind: RangeKind) -> &[AddressRange] {
        match kind {
            RangeKind::Unicast => &self.unicast_ranges,
            RangeKind::Group => &self.group_ranges,
            RangeKind::Scene => &self.scene_ranges,
        }
    }

    /// Whether the provisioner may allocate `kind` at all.
    pub fn can_allocate(&self, kind: RangeKind) -> bool {
        !self.ranges(kind).is_empty()
    }

    /// First range of `kind` that overlaps one of `other`'s ranges of the same kind.
    pub fn overlapping_range(&self, other: &Provisioner, kind: RangeKind) -> Option<AddressRange> {
        self.ranges(kind)
            .iter()
            .find(|mine| other.ranges(kind).iter().any(|theirs| mine.overlaps(theirs)))
            .copied()
    }

    /// Checks the stored ranges again, e.g. after deserialisation.
    pub(crate) fn revalidate(&mut self) -> Result<(), ModelError> {
        for kind in RangeKind::ALL {
            let ranges = std::mem::take(self.ranges_mut(kind));
            *self.ranges_mut(kind) = normalize(kind, ranges)?;
        }
        if let Some(address) = self.unicast_address {
            if !address.is_unicast() {
                return Err(ModelError::NotUnicast(address.value()));
            }
        }
        Ok(())
    }

    pub(crate) fn add_range(&mut self, kind: RangeKind, range: AddressRange) -> Result<(), ModelError> {
        let mut ranges = self.ranges(kind).to_vec();
        ranges.push(range);
        *self.ranges_mut(kind) = normalize(kind, ranges)?;
        Ok(())
    }

    fn ranges_mut(&mut self, kind: RangeKind) -> &mut Vec<AddressRange> {
        match kind {
            RangeKind::Unicast => &mut self.unicast_ranges,
            RangeKind::Group => &mut self.group_ranges,
            RangeKind::Scene => &mut self.scene_ranges,
        }
    }
}

fn normalize(kind: RangeKind, ranges: Vec<AddressRange>) -> Result<Vec<AddressRange>, ModelError> {
    let bounds = kind.bounds();
    if let Some(bad) = ranges.iter().find(|r| !bounds.contains_range(r)) {
        return Err(ModelError::RangeOutOfBounds {
            kind: kind.name(),
            lower: bad.lower_bound(),
            upper: bad.upper_bound(),
        });
    }
    Ok(AddressRange::merged(ranges))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(lower: u16, upper: u16) -> AddressRange {
        AddressRange::new(lower, upper).unwrap()
    }

    #[test]
    fn test_ranges_are_normalized() {
        let p = Provisioner::new(
            "admin",
            vec![range(0x100, 0x1FF), range(1, 0xFF)],
            vec![],
            vec![],
        )
        .unwrap();
        assert_eq!(p.unicast_ranges(), &[range(1, 0x1FF)]);
        assert!(p.can_allocate(RangeKind::Unicast));
        assert!(!p.can_allocate(RangeKind::Group));
    }

    #[test]
    fn test_range_out_of_bounds() {
        let result = Provisioner::new("admin", vec![range(0x7000, 0x8000)], vec![], vec![]);
        assert!(matches!(
            result,
            Err(ModelError::RangeOutOfBounds { kind: "unicast", .. })
        ));

        let result = Provisioner::new("admin", vec![], vec![range(0xB000, 0xC100)], vec![]);
        assert!(matches!(
            result,
            Err(ModelError::RangeOutOfBounds { kind: "group", .. })
        ));

        let result = Provisioner::new("admin", vec![], vec![], vec![range(0, 10)]);
        assert!(matches!(
            result,
            Err(ModelError::RangeOutOfBounds { kind: "scene", .. })
        ));
    }

    #[test]
    fn test_overlapping_range() {
        let a = Provisioner::new("a", vec![range(1, 0x100)], vec![range(0xC000, 0xC0FF)], vec![]).unwrap();
        let b = Provisioner::new("b", vec![range(0x101, 0x200)], vec![range(0xC0F0, 0xC1FF)], vec![]).unwrap();
        assert_eq!(a.overlapping_range(&b, RangeKind::Unicast), None);
        assert_eq!(a.overlapping_range(&b, RangeKind::Group), Some(range(0xC000, 0xC0FF)));
    }

    #[test]
    fn test_unicast_address_must_be_unicast() {
        let p = Provisioner::new("a", vec![], vec![], vec![]).unwrap();
        assert_eq!(
            p.with_unicast_address(Address::new(0xC000)).unwrap_err(),
            ModelError::NotUnicast(0xC000)
        );
    }
}
