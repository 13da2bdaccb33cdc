//! Log parsing for metered traffic records.
//!
//! Each line holds `<address-or-prefix> <byte count>`. A bare address is a
//! maximal-length prefix. Blank lines and lines starting with `#` are skipped
//! silently. Lines that cannot be parsed are skipped and counted; a bad line
//! never stops the stream. Only genuine I/O failures end it.

use std::io::{self, BufRead, Split};
use std::sync::LazyLock;

use regex::Regex;

use super::types::{LogRecord, ParseStats};
use crate::ip::{NetworkPrefix, PrefixError};

/// Compiled regex patterns for log parsing
pub struct LogPatterns {
    /// Match: "<address-or-prefix> <byte count>"
    pub record: Regex,
}

impl LogPatterns {
    pub fn new() -> Self {
        Self {
            record: Regex::new(r"^(\S+)\s+(\S+)$").expect("Invalid record regex"),
        }
    }
}

impl Default for LogPatterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Global patterns instance
pub static PATTERNS: LazyLock<LogPatterns> = LazyLock::new(LogPatterns::new);

/// Reasons a log line is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogLineError {
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    #[error("expected '<address> <bytes>'")]
    FieldCount,

    #[error("{0}")]
    InvalidPrefix(#[from] PrefixError),

    #[error("invalid byte count '{0}'")]
    InvalidByteCount(String),
}

/// Parse one log line.
///
/// Returns `Ok(None)` for blank lines and `#` comments.
pub fn parse_line(line: &str) -> Result<Option<LogRecord>, LogLineError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let caps = PATTERNS.record.captures(trimmed).ok_or(LogLineError::FieldCount)?;
    let prefix: NetworkPrefix = caps[1].parse()?;

    let bytes_str = &caps[2];
    if !bytes_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LogLineError::InvalidByteCount(bytes_str.to_string()));
    }
    let bytes: u64 = bytes_str
        .parse()
        .map_err(|_| LogLineError::InvalidByteCount(bytes_str.to_string()))?;

    Ok(Some(LogRecord { prefix, bytes }))
}

/// Parse one raw line, rejecting invalid UTF-8 like any other bad input.
pub fn parse_raw_line(raw: &[u8]) -> Result<Option<LogRecord>, LogLineError> {
    let line = std::str::from_utf8(raw).map_err(|_| LogLineError::InvalidUtf8)?;
    parse_line(line)
}

/// Streaming reader yielding well-formed records.
///
/// Malformed lines are skipped and counted in `stats()`. The iterator yields
/// `Err` only for I/O errors on the underlying reader.
pub struct LogReader<R> {
    lines: Split<R>,
    stats: ParseStats,
}

impl<R: BufRead> LogReader<R> {
    pub fn new(reader: R) -> Self {
        LogReader {
            lines: reader.split(b'\n'),
            stats: ParseStats::default(),
        }
    }

    pub fn stats(&self) -> ParseStats {
        self.stats
    }
}

impl<R: BufRead> Iterator for LogReader<R> {
    type Item = io::Result<LogRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(e) => return Some(Err(e)),
            };
            self.stats.lines += 1;

            match parse_raw_line(&raw) {
                Ok(Some(record)) => {
                    self.stats.count_record(&record);
                    return Some(Ok(record));
                }
                Ok(None) => continue,
                Err(e) => {
                    self.stats.malformed += 1;
                    log::debug!("Skipping malformed log line {}: {}", self.stats.lines, e);
                }
            }
        }
    }
}
