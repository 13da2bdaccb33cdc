//! Attribution of log records to registry owners.

use super::aggregator::{AggregateError, AggregationTable};
use super::types::LogRecord;
use crate::ip::NetworkPrefix;
use crate::registry::Registry;

/// Looks up the owner of each record in the index of its address family.
///
/// Holds only a shared reference to the built registry, so any number of
/// matchers can run on different threads at once.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'r> {
    registry: &'r Registry,
}

impl<'r> Matcher<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Matcher { registry }
    }

    /// Owner of the longest registry prefix containing `prefix`
    pub fn owner_of(&self, prefix: &NetworkPrefix) -> Option<&'r str> {
        self.registry.index(prefix.family()).longest_match(prefix)
    }

    /// Attribute one record into `table`; unmatched bytes go to Unknown.
    pub fn attribute(
        &self,
        record: &LogRecord,
        table: &mut AggregationTable,
    ) -> Result<(), AggregateError> {
        if record.bytes == 0 {
            return Ok(());
        }
        table.attribute(self.owner_of(&record.prefix), record.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::parse_registry;
    use std::io::Cursor;

    fn registry(text: &str) -> Registry {
        Registry::build(parse_registry(Cursor::new(text)).unwrap()).unwrap()
    }

    fn record(prefix: &str, bytes: u64) -> LogRecord {
        LogRecord {
            prefix: prefix.parse().unwrap(),
            bytes,
        }
    }

    #[test]
    fn test_specificity() {
        let registry = registry("A 10.0.0.0/8\nB 10.1.0.0/16\n");
        let matcher = Matcher::new(&registry);
        let mut table = AggregationTable::new();

        for r in [record("10.1.2.3", 100), record("10.2.0.0", 50), record("192.0.2.1", 30)] {
            matcher.attribute(&r, &mut table).unwrap();
        }

        assert_eq!(table.owner_total("A"), 50);
        assert_eq!(table.owner_total("B"), 100);
        assert_eq!(table.unknown_bytes(), 30);
    }

    #[test]
    fn test_family_without_entries_goes_to_unknown() {
        let registry = registry("A 0.0.0.0/0\n");
        let matcher = Matcher::new(&registry);
        let mut table = AggregationTable::new();

        matcher.attribute(&record("::ffff:10.0.0.1", 9), &mut table).unwrap();
        matcher.attribute(&record("10.0.0.1", 1), &mut table).unwrap();

        assert_eq!(table.unknown_bytes(), 9);
        assert_eq!(table.owner_total("A"), 1);
    }

    #[test]
    fn test_zero_byte_record_is_noop() {
        let registry = registry("A 10.0.0.0/8\n");
        let matcher = Matcher::new(&registry);
        let mut table = AggregationTable::new();

        matcher.attribute(&record("10.0.0.1", 0), &mut table).unwrap();
        matcher.attribute(&record("192.0.2.1", 0), &mut table).unwrap();

        assert_eq!(table, AggregationTable::new());
    }
}
