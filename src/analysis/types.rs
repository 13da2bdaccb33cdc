//! Core data types for traffic attribution.

use serde::{Deserialize, Serialize};

use crate::ip::NetworkPrefix;

/// One metered traffic record: an address or prefix and its byte count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogRecord {
    pub prefix: NetworkPrefix,
    pub bytes: u64,
}

/// Counters collected while reading a log stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStats {
    /// Lines read, including blank and skipped ones
    pub lines: u64,
    /// Well-formed records, zero-byte records included
    pub records: u64,
    /// Lines skipped because they could not be parsed
    pub malformed: u64,
    /// Sum of the byte counts of well-formed records, counted as read
    pub bytes: u128,
}

impl ParseStats {
    /// Count one well-formed record
    pub fn count_record(&mut self, record: &LogRecord) {
        self.records += 1;
        self.bytes += record.bytes as u128;
    }

    /// Add the counters of another shard
    pub fn merge(&mut self, other: &ParseStats) {
        self.lines += other.lines;
        self.records += other.records;
        self.malformed += other.malformed;
        self.bytes += other.bytes;
    }
}
