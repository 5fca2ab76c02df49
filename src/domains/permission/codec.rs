use crate::domains::permission::registry::{self, BitBinding, PERMISSION_BITS};
use crate::errors::{DomainError, DomainResult, ValidationError};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Largest integer the permission field may hold (all 31 bits set)
pub const MAX_PERMISSION_VALUE: i64 = (1i64 << PERMISSION_BITS) - 1;

/// Which sections an external advisor may see, indexed by bit.
///
/// Bit `i` of the vector is bit `i` of the stored integer counting from the
/// least significant end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PermissionVector([bool; PERMISSION_BITS]);

/// Expand a stored integer into a vector.
///
/// Negative values and values above `MAX_PERMISSION_VALUE` are rejected, never
/// masked.
pub fn decode(value: i64) -> DomainResult<PermissionVector> {
    if !(0..=MAX_PERMISSION_VALUE).contains(&value) {
        return Err(DomainError::InvalidPermissionValue(value));
    }
    let mut bits = [false; PERMISSION_BITS];
    for (index, bit) in bits.iter_mut().enumerate() {
        *bit = (value >> index) & 1 == 1;
    }
    Ok(PermissionVector(bits))
}

/// Inverse of [`decode`]
pub fn encode(vector: &PermissionVector) -> i64 {
    vector
        .0
        .iter()
        .enumerate()
        .filter(|(_, granted)| **granted)
        .fold(0i64, |acc, (index, _)| acc | (1i64 << index))
}

impl PermissionVector {
    /// Nothing granted (the default for new reports)
    pub fn none() -> Self {
        Self([false; PERMISSION_BITS])
    }

    pub fn all() -> Self {
        Self([true; PERMISSION_BITS])
    }

    pub fn from_bits(bits: [bool; PERMISSION_BITS]) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> &[bool; PERMISSION_BITS] {
        &self.0
    }

    /// Whether a bit is granted; indices outside the field read as not granted
    pub fn get(&self, bit: usize) -> bool {
        self.0.get(bit).copied().unwrap_or(false)
    }

    /// Set a bit; indices outside the field are ignored
    pub fn set(&mut self, bit: usize, granted: bool) {
        if let Some(slot) = self.0.get_mut(bit) {
            *slot = granted;
        }
    }

    pub fn toggle(&mut self, bit: usize) {
        if let Some(slot) = self.0.get_mut(bit) {
            *slot = !*slot;
        }
    }

    pub fn set_range(&mut self, range: RangeInclusive<usize>, granted: bool) {
        for bit in range {
            self.set(bit, granted);
        }
    }

    /// At least one bit in the range is granted
    pub fn any_in(&self, range: RangeInclusive<usize>) -> bool {
        range.into_iter().any(|bit| self.get(bit))
    }

    pub fn count_in(&self, range: RangeInclusive<usize>) -> usize {
        range.into_iter().filter(|bit| self.get(*bit)).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.0.iter().any(|granted| *granted)
    }

    pub fn encode(&self) -> i64 {
        encode(self)
    }

    /// Ids of the sections this vector grants, in registry order
    pub fn granted_section_ids(&self) -> Vec<&'static str> {
        registry::all_sections()
            .iter()
            .filter(|s| matches!(s.binding, BitBinding::Bound(bit) if self.get(bit as usize)))
            .map(|s| s.id)
            .collect()
    }

    /// Build a vector granting exactly the given sections
    pub fn from_section_ids<S: AsRef<str>>(ids: &[S]) -> DomainResult<Self> {
        let mut vector = Self::none();
        for id in ids {
            let id = id.as_ref();
            let section = registry::section(id)
                .ok_or_else(|| DomainError::UnknownSection(id.to_string()))?;
            match section.binding {
                BitBinding::Bound(bit) => vector.set(bit as usize, true),
                BitBinding::ManagerOnly => {
                    return Err(DomainError::Validation(ValidationError::invalid_value(
                        "sections",
                        &format!("'{}' cannot be granted through the permission field", id),
                    )));
                }
            }
        }
        Ok(vector)
    }
}

impl TryFrom<i64> for PermissionVector {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        decode(value)
    }
}

impl From<PermissionVector> for i64 {
    fn from(vector: PermissionVector) -> Self {
        encode(&vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries() {
        assert_eq!(decode(0).unwrap(), PermissionVector::none());
        assert_eq!(decode(MAX_PERMISSION_VALUE).unwrap(), PermissionVector::all());
        assert_eq!(encode(&PermissionVector::none()), 0);
        assert_eq!(encode(&PermissionVector::all()), 2_147_483_647);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        assert!(matches!(decode(-1), Err(DomainError::InvalidPermissionValue(-1))));
        assert!(matches!(
            decode(MAX_PERMISSION_VALUE + 1),
            Err(DomainError::InvalidPermissionValue(_))
        ));
        assert!(PermissionVector::try_from(i64::MIN).is_err());
    }

    #[test]
    fn test_least_significant_bit_is_index_zero() {
        let vector = decode(1).unwrap();
        assert!(vector.get(0));
        assert!(!vector.get(1));

        let vector = decode(1 << 21).unwrap();
        assert!(vector.get(21));
        assert_eq!(vector.granted_section_ids(), vec!["cover"]);
    }

    #[test]
    fn test_integer_round_trip_over_spread_of_values() {
        let mut value: i64 = 0;
        while value <= MAX_PERMISSION_VALUE {
            assert_eq!(encode(&decode(value).unwrap()), value);
            value = value * 3 + 1;
        }
        for bit in 0..PERMISSION_BITS {
            let single = 1i64 << bit;
            assert_eq!(encode(&decode(single).unwrap()), single);
            let all_but_one = MAX_PERMISSION_VALUE ^ single;
            assert_eq!(encode(&decode(all_but_one).unwrap()), all_but_one);
        }
    }

    #[test]
    fn test_vector_round_trip() {
        let mut vector = PermissionVector::none();
        for bit in (0..PERMISSION_BITS).step_by(3) {
            vector.set(bit, true);
        }
        assert_eq!(decode(encode(&vector)).unwrap(), vector);
        assert_eq!(PermissionVector::try_from(i64::from(vector)).unwrap(), vector);
    }

    #[test]
    fn test_range_queries() {
        let mut vector = PermissionVector::none();
        vector.set(7, true);
        assert!(vector.any_in(5..=12));
        assert!(!vector.any_in(0..=4));
        assert_eq!(vector.count_in(5..=12), 1);

        vector.set_range(5..=12, true);
        assert_eq!(vector.count_in(5..=12), 8);
        vector.toggle(5);
        assert_eq!(vector.count_in(5..=12), 7);

        // writes outside the field are dropped
        vector.set(31, true);
        assert!(!vector.get(31));
    }

    #[test]
    fn test_section_id_conversions() {
        let vector = PermissionVector::from_section_ids(&["mission", "cover"]).unwrap();
        assert_eq!(vector.granted_section_ids(), vec!["mission", "cover"]);
        assert_eq!(vector.encode(), (1 << 1) | (1 << 21));

        assert!(matches!(
            PermissionVector::from_section_ids(&["missing"]),
            Err(DomainError::UnknownSection(_))
        ));
        assert!(matches!(
            PermissionVector::from_section_ids(&["publish"]),
            Err(DomainError::Validation(_))
        ));
    }
}
