//! Traffic attribution for metered log records.
//!
//! This module reads log records, matches them against the loaded registry,
//! accumulates per-owner totals and renders the final report.

pub mod types;
pub mod log_parser;
pub mod matcher;
pub mod aggregator;
pub mod report;

pub use types::*;
pub use log_parser::{parse_line, LogReader};
pub use matcher::Matcher;
pub use aggregator::{AggregateError, AggregationTable, UNKNOWN_OWNER};
pub use report::{write_json_report, write_text_report, TrafficReport};
