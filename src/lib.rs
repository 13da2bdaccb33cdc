//! # IpSummary - Traffic attribution by longest-prefix match
//!
//! This library attributes metered network traffic to the customers that own
//! the addresses, given a registry of owner prefixes.
//!
//! ## Overview
//!
//! A registry maps IP prefixes to owner names. A traffic log lists addresses
//! (or prefixes) with byte counts. For each log record the most specific
//! registry prefix containing it decides the owner; bytes that match nothing
//! are reported as `Unknown`.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `ip`: prefix value type and the per-family longest-prefix-match trie
//! - `registry`: registry file parsing and index construction
//! - `analysis`: log parsing, matching, aggregation and report output
//! - `config`: run configuration structures and validation
//! - `config_loader`: YAML configuration loading and CLI overrides
//! - `orchestrator`: sequential and sharded parallel pipelines
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::io;
//! use std::path::Path;
//! use ipsummary::{analysis, config::RunConfig, orchestrator, registry};
//!
//! let registry = registry::load_registry(Path::new("customers.txt"))?;
//! let outcome = orchestrator::run(&registry, io::stdin().lock(), &RunConfig::default())?;
//! analysis::write_text_report(&outcome.table, &mut io::stdout())?;
//! # Ok::<(), color_eyre::Report>(())
//! ```
//!
//! ## Input Formats
//!
//! Registry, one `<owner> <cidr-prefix>` entry per line:
//!
//! ```text
//! CustomerA 10.0.0.0/8
//! CustomerB 10.1.0.0/16
//! ```
//!
//! Log, one `<address-or-cidr> <bytes>` record per line:
//!
//! ```text
//! 10.1.2.3 100
//! 10.2.0.0 50
//! 192.0.2.1 30
//! ```
//!
//! which produces:
//!
//! ```text
//! CustomerA	50
//! CustomerB	100
//! Unknown	30
//! ```
//!
//! ## Error Handling
//!
//! Module-level failures are typed `thiserror` enums. A bad registry line is
//! fatal; a bad log line is skipped and counted. The pipeline and the binary
//! use `color_eyre` for reporting with context.

pub mod ip;
pub mod registry;
pub mod analysis;
pub mod config;
pub mod config_loader;
pub mod orchestrator;
