//! Inclusive address and scene ranges.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{
    MAX_GROUP_ADDRESS, MAX_SCENE_NUMBER, MAX_UNICAST_ADDRESS, MIN_GROUP_ADDRESS, MIN_SCENE_NUMBER,
    MIN_UNICAST_ADDRESS, ModelError,
};

/// What a range allocates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RangeKind {
    /// Unicast addresses for node elements.
    Unicast,
    /// Group addresses.
    Group,
    /// Scene numbers.
    Scene,
}

impl RangeKind {
    /// All kinds.
    pub const ALL: [RangeKind; 3] = [RangeKind::Unicast, RangeKind::Group, RangeKind::Scene];

    /// The span every range of this kind must lie in.
    pub fn bounds(self) -> AddressRange {
        let (lower, upper) = match self {
            RangeKind::Unicast => (MIN_UNICAST_ADDRESS, MAX_UNICAST_ADDRESS),
            RangeKind::Group => (MIN_GROUP_ADDRESS, MAX_GROUP_ADDRESS),
            RangeKind::Scene => (MIN_SCENE_NUMBER, MAX_SCENE_NUMBER),
        };
        AddressRange {
            lower_bound: lower,
            upper_bound: upper,
        }
    }

    /// Short name for messages.
    pub fn name(self) -> &'static str {
        match self {
            RangeKind::Unicast => "unicast",
            RangeKind::Group => "group",
            RangeKind::Scene => "scene",
        }
    }
}

/// An inclusive `[lower_bound, upper_bound]` range of 16-bit values.
///
/// The bounds are always ordered; deserialisation re-checks this.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RangeRepr", into = "RangeRepr")]
pub struct AddressRange {
    lower_bound: u16,
    upper_bound: u16,
}

#[derive(Serialize, Deserialize)]
struct RangeRepr {
    #[serde(rename = "lowAddress")]
    lower: u16,
    #[serde(rename = "highAddress")]
    upper: u16,
}

impl TryFrom<RangeRepr> for AddressRange {
    type Error = ModelError;

    fn try_from(repr: RangeRepr) -> Result<Self, Self::Error> {
        AddressRange::new(repr.lower, repr.upper)
    }
}

impl From<AddressRange> for RangeRepr {
    fn from(range: AddressRange) -> Self {
        RangeRepr {
            lower: range.lower_bound,
            upper: range.upper_bound,
        }
    }
}

impl AddressRange {
    /// Create a range; fails if `lower > upper`.
    pub fn new(lower: u16, upper: u16) -> Result<Self, ModelError> {
        if lower > upper {
            return Err(ModelError::InvalidRange { lower, upper });
        }
        Ok(Self {
            lower_bound: lower,
            upper_bound: upper,
        })
    }

    /// Lowest value in the range.
    pub fn lower_bound(&self) -> u16 {
        self.lower_bound
    }

    /// Highest value in the range.
    pub fn upper_bound(&self) -> u16 {
        self.upper_bound
    }

    /// Number of values in the range (never zero).
    pub fn len(&self) -> u32 {
        u32::from(self.upper_bound) - u32::from(self.lower_bound) + 1
    }

    /// Whether `value` lies in the range.
    pub fn contains(&self, value: u16) -> bool {
        (self.lower_bound..=self.upper_bound).contains(&value)
    }

    /// Whether `other` lies entirely in this range.
    pub fn contains_range(&self, other: &AddressRange) -> bool {
        self.lower_bound <= other.lower_bound && other.upper_bound <= self.upper_bound
    }

    /// Whether the two ranges share at least one value.
    pub fn overlaps(&self, other: &AddressRange) -> bool {
        self.lower_bound <= other.upper_bound && other.lower_bound <= self.upper_bound
    }

    /// Whether the ranges overlap or touch end to end.
    fn touches(&self, other: &AddressRange) -> bool {
        u32::from(self.lower_bound) <= u32::from(other.upper_bound) + 1
            && u32::from(other.lower_bound) <= u32::from(self.upper_bound) + 1
    }

    /// Sorted union of the given ranges, merging overlapping and adjacent ones.
    pub fn merged(ranges: impl IntoIterator<Item = AddressRange>) -> Vec<AddressRange> {
        let mut sorted: Vec<AddressRange> = ranges.into_iter().collect();
        sorted.sort_by_key(|r| (r.lower_bound, r.upper_bound));

        let mut result: Vec<AddressRange> = Vec::with_capacity(sorted.len());
        for range in sorted {
            match result.last_mut() {
                Some(last) if last.touches(&range) => {
                    last.upper_bound = last.upper_bound.max(range.upper_bound);
                }
                _ => result.push(range),
            }
        }
        result
    }

    /// Gaps of `bounds` not covered by `merged`, ascending.
    ///
    /// `merged` must be sorted and disjoint, as returned by [`AddressRange::merged`].
    pub fn gaps(merged: &[AddressRange], bounds: AddressRange) -> Vec<AddressRange> {
        let mut gaps = Vec::new();
        let mut next = u32::from(bounds.lower_bound);
        let end = u32::from(bounds.upper_bound);

        for range in merged {
            let lower = u32::from(range.lower_bound);
            let upper = u32::from(range.upper_bound);
            if upper < next {
                continue;
            }
            if lower > end {
                break;
            }
            if lower > next {
                gaps.push(AddressRange {
                    lower_bound: next as u16,
                    upper_bound: (lower - 1) as u16,
                });
            }
            next = upper + 1;
        }
        if next <= end {
            gaps.push(AddressRange {
                lower_bound: next as u16,
                upper_bound: end as u16,
            });
        }
        gaps
    }
}

impl fmt::Debug for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}..=0x{:04X}", self.lower_bound, self.upper_bound)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(lower: u16, upper: u16) -> AddressRange {
        AddressRange::new(lower, upper).unwrap()
    }

    #[test]
    fn test_invalid_range() {
        let result = AddressRange::new(10, 9);
        assert!(matches!(result, Err(ModelError::InvalidRange { lower: 10, upper: 9 })));
        assert_eq!(range(5, 5).len(), 1);
        assert_eq!(range(0, 0xFFFF).len(), 0x10000);
    }

    #[test]
    fn test_overlaps() {
        assert!(range(1, 10).overlaps(&range(10, 20)));
        assert!(!range(1, 10).overlaps(&range(11, 20)));
        assert!(range(5, 6).overlaps(&range(1, 100)));
    }

    #[test]
    fn test_merged() {
        let merged = AddressRange::merged([range(20, 30), range(1, 10), range(11, 12), range(25, 40)]);
        assert_eq!(merged, vec![range(1, 12), range(20, 40)]);
    }

    #[test]
    fn test_gaps() {
        let merged = AddressRange::merged([range(1, 0xFF), range(0x120, 0xFFF)]);
        let gaps = AddressRange::gaps(&merged, range(1, 0x7FFF));
        assert_eq!(gaps, vec![range(0x100, 0x11F), range(0x1000, 0x7FFF)]);
    }

    #[test]
    fn test_gaps_full_coverage() {
        let merged = AddressRange::merged([range(1, 0x7FFF)]);
        assert!(AddressRange::gaps(&merged, range(1, 0x7FFF)).is_empty());
    }

    #[test]
    fn test_gaps_at_upper_edge() {
        let merged = AddressRange::merged([range(0, 0xFFF0)]);
        let gaps = AddressRange::gaps(&merged, range(1, 0xFFFF));
        assert_eq!(gaps, vec![range(0xFFF1, 0xFFFF)]);
    }

    #[test]
    fn test_serde_rejects_inverted_range() {
        let json = r#"{"lowAddress":20,"highAddress":10}"#;
        assert!(serde_json::from_str::<AddressRange>(json).is_err());

        let ok: AddressRange = serde_json::from_str(r#"{"lowAddress":10,"highAddress":20}"#).unwrap();
        assert_eq!(ok, range(10, 20));
    }

    #[test]
    fn test_kind_bounds() {
        assert_eq!(RangeKind::Unicast.bounds(), range(0x0001, 0x7FFF));
        assert_eq!(RangeKind::Group.bounds(), range(0xC000, 0xFEFF));
        assert_eq!(RangeKind::Scene.bounds(), range(0x0001, 0xFFFF));
    }
}
