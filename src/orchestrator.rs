//! Attribution pipeline orchestration.
//!
//! The registry is fully built before any record is matched. After that it is
//! only read, which lets the parallel pipeline hand the same `&Registry` to
//! every worker. Each worker fills a private `AggregationTable` from its own
//! shard of the log; the shard tables are merged sequentially at the end.

use std::io::BufRead;

use color_eyre::eyre::{Context, Result};
use rayon::prelude::*;

use crate::analysis::log_parser::{parse_raw_line, LogReader};
use crate::analysis::{AggregationTable, Matcher, ParseStats};
use crate::config::RunConfig;
use crate::registry::Registry;

/// Final state of one attribution run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    pub table: AggregationTable,
    pub stats: ParseStats,
}

impl RunOutcome {
    fn merge(&mut self, other: RunOutcome) -> Result<()> {
        self.table.merge(other.table)?;
        self.stats.merge(&other.stats);
        Ok(())
    }
}

/// Attribute a log stream record by record on the current thread.
pub fn attribute_stream<R: BufRead>(registry: &Registry, reader: R) -> Result<RunOutcome> {
    let matcher = Matcher::new(registry);
    let mut table = AggregationTable::new();
    let mut records = LogReader::new(reader);

    for record in records.by_ref() {
        let record = record.context("Failed to read log stream")?;
        matcher.attribute(&record, &mut table)?;
    }

    Ok(RunOutcome {
        table,
        stats: records.stats(),
    })
}

/// Attribute one shard of raw lines. `first_line` is the 1-based number of
/// the shard's first line, used for diagnostics only.
fn attribute_shard(matcher: &Matcher<'_>, lines: &[Vec<u8>], first_line: usize) -> Result<RunOutcome> {
    let mut outcome = RunOutcome::default();

    for (offset, raw) in lines.iter().enumerate() {
        outcome.stats.lines += 1;
        match parse_raw_line(raw) {
            Ok(Some(record)) => {
                outcome.stats.count_record(&record);
                matcher.attribute(&record, &mut outcome.table)?;
            }
            Ok(None) => {}
            Err(e) => {
                outcome.stats.malformed += 1;
                log::debug!("Skipping malformed log line {}: {}", first_line + offset, e);
            }
        }
    }

    Ok(outcome)
}

/// Attribute a finite log stream across a rayon worker pool.
///
/// The whole stream is read first, then split into shards of `shard_size`
/// lines. `threads == 0` uses rayon's default pool size.
pub fn attribute_parallel<R: BufRead>(
    registry: &Registry,
    reader: R,
    threads: usize,
    shard_size: usize,
) -> Result<RunOutcome> {
    let lines: Vec<Vec<u8>> = reader
        .split(b'\n')
        .collect::<std::io::Result<_>>()
        .context("Failed to read log stream")?;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("Failed to configure thread pool")?;

    log::info!(
        "Attributing {} lines in shards of {} on {} workers",
        lines.len(),
        shard_size,
        pool.current_num_threads()
    );

    let matcher = Matcher::new(registry);
    let shards: Vec<RunOutcome> = pool.install(|| {
        lines
            .par_chunks(shard_size.max(1))
            .enumerate()
            .map(|(idx, chunk)| {
                let outcome = attribute_shard(&matcher, chunk, idx * shard_size + 1)?;
                log::debug!(
                    "Shard {}: {} records, {} malformed",
                    idx,
                    outcome.stats.records,
                    outcome.stats.malformed
                );
                Ok(outcome)
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let mut total = RunOutcome::default();
    for shard in shards {
        total.merge(shard)?;
    }
    Ok(total)
}

/// Run the pipeline selected by `config`.
pub fn run<R: BufRead>(registry: &Registry, reader: R, config: &RunConfig) -> Result<RunOutcome> {
    let outcome = if config.is_parallel() {
        attribute_parallel(registry, reader, config.threads, config.shard_size)?
    } else {
        attribute_stream(registry, reader)?
    };

    log::info!(
        "Processed {} lines: {} records, {} malformed",
        outcome.stats.lines,
        outcome.stats.records,
        outcome.stats.malformed
    );

    if config.verify {
        outcome.table.verify(outcome.stats.bytes)?;
    }

    Ok(outcome)
}
