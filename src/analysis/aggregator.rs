//! Per-owner byte accumulation.
//!
//! Totals are kept in `u128` while single records carry at most `u64`, and
//! every addition is checked: an overflow is reported as an error instead of
//! wrapping.

use std::collections::BTreeMap;

/// Label used for traffic with no matching registry entry
pub const UNKNOWN_OWNER: &str = "Unknown";

/// Errors raised while accumulating byte counts
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AggregateError {
    #[error("Byte counter overflow for '{bucket}'")]
    Overflow { bucket: String },

    #[error("Self-check failed: reported {reported} bytes but consumed {consumed}")]
    TotalsMismatch { reported: u128, consumed: u128 },
}

fn checked_add(total: &mut u128, bytes: u128, bucket: &str) -> Result<(), AggregateError> {
    *total = total.checked_add(bytes).ok_or_else(|| AggregateError::Overflow {
        bucket: bucket.to_string(),
    })?;
    Ok(())
}

/// Byte totals per owner plus the unattributed remainder.
///
/// Only grows: entries are created on the first non-zero attribution and
/// never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationTable {
    owners: BTreeMap<String, u128>,
    unknown_bytes: u128,
}

impl AggregationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `bytes` to `owner`, or to Unknown when there is no owner.
    pub fn attribute(&mut self, owner: Option<&str>, bytes: u64) -> Result<(), AggregateError> {
        if bytes == 0 {
            return Ok(());
        }
        self.add(owner, bytes as u128)
    }

    fn add(&mut self, owner: Option<&str>, bytes: u128) -> Result<(), AggregateError> {
        match owner {
            Some(owner) => match self.owners.get_mut(owner) {
                Some(total) => checked_add(total, bytes, owner)?,
                None => {
                    self.owners.insert(owner.to_string(), bytes);
                }
            },
            None => checked_add(&mut self.unknown_bytes, bytes, UNKNOWN_OWNER)?,
        }
        Ok(())
    }

    /// Fold another table into this one. Order of merges does not matter.
    pub fn merge(&mut self, other: AggregationTable) -> Result<(), AggregateError> {
        for (owner, bytes) in other.owners {
            match self.owners.get_mut(&owner) {
                Some(total) => checked_add(total, bytes, &owner)?,
                None => {
                    self.owners.insert(owner, bytes);
                }
            }
        }
        checked_add(&mut self.unknown_bytes, other.unknown_bytes, UNKNOWN_OWNER)
    }

    /// Total for one owner; absent owners are zero.
    pub fn owner_total(&self, owner: &str) -> u128 {
        self.owners.get(owner).copied().unwrap_or(0)
    }

    pub fn unknown_bytes(&self) -> u128 {
        self.unknown_bytes
    }

    /// Owners with a non-zero total, sorted by name
    pub fn owners(&self) -> impl Iterator<Item = (&str, u128)> {
        self.owners
            .iter()
            .filter(|(_, bytes)| **bytes > 0)
            .map(|(owner, bytes)| (owner.as_str(), *bytes))
    }

    /// Sum of all owner totals plus Unknown
    pub fn reported_bytes(&self) -> Result<u128, AggregateError> {
        let mut reported = self.unknown_bytes;
        for (owner, bytes) in self.owners() {
            checked_add(&mut reported, bytes, owner)?;
        }
        Ok(reported)
    }

    /// Check the report against `consumed`, the byte total counted by the
    /// reader independently of attribution.
    pub fn verify(&self, consumed: u128) -> Result<(), AggregateError> {
        let reported = self.reported_bytes()?;
        if reported != consumed {
            return Err(AggregateError::TotalsMismatch { reported, consumed });
        }
        log::info!("Self-check passed: {} bytes accounted for", reported);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_accumulates() {
        let mut table = AggregationTable::new();
        table.attribute(Some("A"), 10).unwrap();
        table.attribute(Some("A"), 5).unwrap();
        table.attribute(Some("B"), 1).unwrap();
        table.attribute(None, 7).unwrap();

        assert_eq!(table.owner_total("A"), 15);
        assert_eq!(table.owner_total("B"), 1);
        assert_eq!(table.owner_total("C"), 0);
        assert_eq!(table.unknown_bytes(), 7);
        assert_eq!(table.reported_bytes(), Ok(23));
        assert!(table.verify(23).is_ok());
    }

    #[test]
    fn test_zero_bytes_is_noop() {
        let mut table = AggregationTable::new();
        table.attribute(Some("A"), 0).unwrap();
        table.attribute(None, 0).unwrap();

        assert_eq!(table, AggregationTable::new());
        assert_eq!(table.owners().count(), 0);
    }

    #[test]
    fn test_owners_sorted_by_name() {
        let mut table = AggregationTable::new();
        for owner in ["zeta", "Alpha", "beta", "alpha"] {
            table.attribute(Some(owner), 1).unwrap();
        }
        let names: Vec<&str> = table.owners().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Alpha", "alpha", "beta", "zeta"]);
    }

    #[test]
    fn test_totals_exceed_u64() {
        let mut table = AggregationTable::new();
        table.attribute(Some("A"), u64::MAX).unwrap();
        table.attribute(Some("A"), u64::MAX).unwrap();
        assert_eq!(table.owner_total("A"), 2 * u64::MAX as u128);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut table = AggregationTable::new();
        table.add(Some("A"), u128::MAX - 1).unwrap();
        let err = table.add(Some("A"), 2).unwrap_err();
        assert_eq!(err, AggregateError::Overflow { bucket: "A".to_string() });

        let mut table = AggregationTable::new();
        table.add(None, u128::MAX).unwrap();
        let err = table.attribute(None, 1).unwrap_err();
        assert_eq!(err, AggregateError::Overflow { bucket: UNKNOWN_OWNER.to_string() });
    }

    #[test]
    fn test_merge_matches_single_pass() {
        let mut left = AggregationTable::new();
        left.attribute(Some("A"), 3).unwrap();
        left.attribute(None, 1).unwrap();

        let mut right = AggregationTable::new();
        right.attribute(Some("A"), 4).unwrap();
        right.attribute(Some("B"), 2).unwrap();

        let mut single = AggregationTable::new();
        for (owner, bytes) in [(Some("A"), 3), (None, 1), (Some("A"), 4), (Some("B"), 2)] {
            single.attribute(owner, bytes).unwrap();
        }

        let mut merged = left.clone();
        merged.merge(right.clone()).unwrap();
        assert_eq!(merged, single);

        let mut reversed = right;
        reversed.merge(left).unwrap();
        assert_eq!(reversed, single);
    }

    #[test]
    fn test_verify_detects_mismatch() {
        let mut table = AggregationTable::new();
        table.attribute(Some("A"), 5).unwrap();
        table.attribute(None, 2).unwrap();
        assert_eq!(
            table.verify(8),
            Err(AggregateError::TotalsMismatch { reported: 7, consumed: 8 })
        );
        assert!(table.verify(7).is_ok());
    }
}
