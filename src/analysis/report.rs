//! Report generation for attributed traffic.
//!
//! The text report is the primary output: one `<owner>\t<bytes>` line per
//! owner with non-zero traffic, sorted by owner name, then an `Unknown` line
//! that is always present. The JSON report carries the same totals plus the
//! parse counters.

use std::io::Write;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use super::aggregator::{AggregationTable, UNKNOWN_OWNER};
use super::types::ParseStats;

/// Write the tab-separated text report
pub fn write_text_report<W: Write>(table: &AggregationTable, out: &mut W) -> std::io::Result<()> {
    out.write_all(render_text_report(table).as_bytes())
}

/// Render the text report into a string
pub fn render_text_report(table: &AggregationTable) -> String {
    let mut report: String = table
        .owners()
        .map(|(owner, bytes)| format!("{}\t{}\n", owner, bytes))
        .collect();
    report.push_str(&format!("{}\t{}\n", UNKNOWN_OWNER, table.unknown_bytes()));
    report
}

/// Traffic total for one owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerTotal {
    pub owner: String,
    pub bytes: u128,
}

/// Machine-readable report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficReport {
    /// Owners with non-zero traffic, sorted by name
    pub owners: Vec<OwnerTotal>,
    pub unknown_bytes: u128,
    pub records: u64,
    pub malformed_records: u64,
    pub generated_at: String,
}

impl TrafficReport {
    pub fn new(table: &AggregationTable, stats: &ParseStats) -> Self {
        TrafficReport {
            owners: table
                .owners()
                .map(|(owner, bytes)| OwnerTotal {
                    owner: owner.to_string(),
                    bytes,
                })
                .collect(),
            unknown_bytes: table.unknown_bytes(),
            records: stats.records,
            malformed_records: stats.malformed,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Write the JSON report
pub fn write_json_report<W: Write>(report: &TrafficReport, out: &mut W) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report).context("Failed to serialize report to JSON")?;
    writeln!(out).context("Failed to write JSON report")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> AggregationTable {
        let mut table = AggregationTable::new();
        table.attribute(Some("B"), 100).unwrap();
        table.attribute(Some("A"), 50).unwrap();
        table.attribute(None, 30).unwrap();
        table
    }

    #[test]
    fn test_text_report() {
        assert_eq!(render_text_report(&sample_table()), "A\t50\nB\t100\nUnknown\t30\n");
    }

    #[test]
    fn test_write_text_report_matches_render() {
        let table = sample_table();
        let mut buf = Vec::new();
        write_text_report(&table, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), render_text_report(&table));
    }

    #[test]
    fn test_unknown_line_always_present() {
        assert_eq!(render_text_report(&AggregationTable::new()), "Unknown\t0\n");

        let mut table = AggregationTable::new();
        table.attribute(Some("A"), 1).unwrap();
        assert_eq!(render_text_report(&table), "A\t1\nUnknown\t0\n");
    }

    #[test]
    fn test_json_report() {
        let stats = ParseStats {
            lines: 4,
            records: 3,
            malformed: 1,
            bytes: 180,
        };
        let report = TrafficReport::new(&sample_table(), &stats);
        let mut buf = Vec::new();
        write_json_report(&report, &mut buf).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["owners"][0]["owner"], "A");
        assert_eq!(value["owners"][0]["bytes"], 50);
        assert_eq!(value["owners"][1]["owner"], "B");
        assert_eq!(value["unknown_bytes"], 30);
        assert_eq!(value["records"], 3);
        assert_eq!(value["malformed_records"], 1);
    }
}
