//! # Registry Loading Module
//!
//! This module turns the textual owner registry into the per-family prefix
//! indices used for attribution.
//!
//! ## File Format
//!
//! One entry per line, owner name first, then the CIDR prefix:
//!
//! ```text
//! CustomerA 10.0.0.0/8
//! CustomerB 10.1.0.0/16
//! CustomerC 2001:db8::/32
//! ```
//!
//! Blank lines are ignored. There is no comment syntax: `#` is read like any
//! other owner name. A line that does not have exactly two fields, or whose
//! prefix does not parse as a canonical CIDR prefix, fails the whole load:
//! traffic is never attributed against a partially loaded registry.
//!
//! ## Overlaps and Duplicates
//!
//! Entries may overlap freely; lookups pick the longest containing prefix.
//! When the same prefix appears more than once the last entry wins and the
//! overwrite is logged.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};

use crate::ip::{AddressFamily, NetworkPrefix, PrefixError, PrefixIndex};

/// Errors that abort a registry load
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to open registry file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read registry at line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed registry line {line}: expected '<owner> <prefix>', found {found} field(s) in '{text}'")]
    FieldCount {
        line: usize,
        found: usize,
        text: String,
    },

    #[error("Malformed registry line {line}: '{text}': {source}")]
    InvalidPrefix {
        line: usize,
        text: String,
        #[source]
        source: PrefixError,
    },

    #[error("Failed to index registry prefix {prefix}: {source}")]
    Index {
        prefix: NetworkPrefix,
        #[source]
        source: PrefixError,
    },
}

/// One registry line: an owner and a prefix it owns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub owner: Arc<str>,
    pub prefix: NetworkPrefix,
}

/// Parse registry lines from a reader.
///
/// Owner names are interned so repeated owners share one allocation.
pub fn parse_registry<R: BufRead>(reader: R) -> Result<Vec<RegistryEntry>, RegistryError> {
    let mut owners: HashSet<Arc<str>> = HashSet::new();
    let mut entries = Vec::new();

    for (idx, line_result) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line_result.map_err(|source| RegistryError::Read { line: line_no, source })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let [owner, prefix] = fields[..] else {
            return Err(RegistryError::FieldCount {
                line: line_no,
                found: fields.len(),
                text: trimmed.to_string(),
            });
        };

        let prefix: NetworkPrefix = prefix.parse().map_err(|source| RegistryError::InvalidPrefix {
            line: line_no,
            text: trimmed.to_string(),
            source,
        })?;

        let owner = match owners.get(owner) {
            Some(existing) => existing.clone(),
            None => {
                let interned: Arc<str> = Arc::from(owner);
                owners.insert(interned.clone());
                interned
            }
        };

        entries.push(RegistryEntry { owner, prefix });
    }

    Ok(entries)
}

/// Loaded registry: one prefix index per address family.
///
/// Built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Registry {
    v4: PrefixIndex,
    v6: PrefixIndex,
    duplicates: usize,
}

impl Registry {
    /// Build the indices from parsed entries, in file order.
    pub fn build(entries: Vec<RegistryEntry>) -> Result<Self, RegistryError> {
        let mut v4 = PrefixIndex::new(AddressFamily::V4);
        let mut v6 = PrefixIndex::new(AddressFamily::V6);
        let mut duplicates = 0;

        for entry in entries {
            let index = match entry.prefix.family() {
                AddressFamily::V4 => &mut v4,
                AddressFamily::V6 => &mut v6,
            };
            let previous = index
                .insert(&entry.prefix, entry.owner.clone())
                .map_err(|source| RegistryError::Index {
                    prefix: entry.prefix,
                    source,
                })?;
            if let Some(previous) = previous {
                duplicates += 1;
                if previous != entry.owner {
                    warn!(
                        "Duplicate prefix {}: owner '{}' replaced by '{}'",
                        entry.prefix, previous, entry.owner
                    );
                }
            }
        }

        Ok(Registry { v4, v6, duplicates })
    }

    /// Index for one address family
    pub fn index(&self, family: AddressFamily) -> &PrefixIndex {
        match family {
            AddressFamily::V4 => &self.v4,
            AddressFamily::V6 => &self.v6,
        }
    }

    /// Number of distinct prefixes across both families
    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of entries that overwrote an earlier identical prefix
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}

/// Load and index a registry file.
pub fn load_registry(path: &Path) -> Result<Registry, RegistryError> {
    info!("Loading registry from: {:?}", path);

    let file = File::open(path).map_err(|source| RegistryError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::with_capacity(64 * 1024, file);

    let entries = parse_registry(reader)?;
    let line_count = entries.len();
    let registry = Registry::build(entries)?;

    info!(
        "Registry loaded: {} entries, {} IPv4 prefixes ({} trie nodes, depth {}), {} IPv6 prefixes ({} trie nodes, depth {}), {} duplicates overwritten",
        line_count,
        registry.v4.len(),
        registry.v4.node_count(),
        registry.v4.max_depth(),
        registry.v6.len(),
        registry.v6.node_count(),
        registry.v6.max_depth(),
        registry.duplicates
    );

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn p(s: &str) -> NetworkPrefix {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_registry() {
        let input = "CustomerA 10.0.0.0/8\n\n   \n  CustomerB\t10.1.0.0/16  \nCustomerA 2001:db8::/32\n";
        let entries = parse_registry(Cursor::new(input)).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(&*entries[0].owner, "CustomerA");
        assert_eq!(entries[0].prefix, p("10.0.0.0/8"));
        assert_eq!(&*entries[1].owner, "CustomerB");
        assert_eq!(entries[2].prefix.family(), AddressFamily::V6);
        // Repeated owners share one allocation
        assert!(Arc::ptr_eq(&entries[0].owner, &entries[2].owner));
    }

    #[test]
    fn test_wrong_field_count_is_fatal() {
        let err = parse_registry(Cursor::new("A 10.0.0.0/8\nB\n")).unwrap_err();
        assert!(matches!(err, RegistryError::FieldCount { line: 2, found: 1, .. }));

        let err = parse_registry(Cursor::new("A 10.0.0.0/8 extra\n")).unwrap_err();
        assert!(matches!(err, RegistryError::FieldCount { line: 1, found: 3, .. }));
    }

    #[test]
    fn test_bad_prefix_is_fatal() {
        let err = parse_registry(Cursor::new("A 10.0.0.0/8\nB 300.0.0.0/8\n")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPrefix { line: 2, .. }));

        // Column order is fixed: owner first
        let err = parse_registry(Cursor::new("10.0.0.0/8 A\n")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPrefix { line: 1, .. }));

        // Host bits beyond the length
        let err = parse_registry(Cursor::new("A 10.1.2.3/8\n")).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::InvalidPrefix { source: PrefixError::HostBitsSet { .. }, .. }
        ));
    }

    #[test]
    fn test_hash_lines_are_not_comments() {
        let err = parse_registry(Cursor::new("# note\nA 10.0.0.0/8\n")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidPrefix { line: 1, .. }));

        // A leading '#' is part of the owner name
        let entries = parse_registry(Cursor::new("A 10.0.0.0/8\n#CustX 11.0.0.0/8\n")).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(&*entries[1].owner, "#CustX");
    }

    #[test]
    fn test_build_routes_families_and_counts_duplicates() {
        let entries = parse_registry(Cursor::new(
            "A 10.0.0.0/8\nB 10.0.0.0/8\nC 2001:db8::/32\nC 2001:db8::/32\n",
        ))
        .unwrap();
        let registry = Registry::build(entries).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.duplicates(), 2);
        assert_eq!(registry.index(AddressFamily::V4).longest_match(&p("10.0.0.1")), Some("B"));
        assert_eq!(registry.index(AddressFamily::V6).longest_match(&p("2001:db8::1")), Some("C"));
    }

    #[test]
    fn test_load_registry_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "CustomerA 10.0.0.0/8").unwrap();
        writeln!(temp_file, "CustomerB 10.1.0.0/16").unwrap();

        let registry = load_registry(temp_file.path()).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_registry(Path::new("/nonexistent/registry.txt")).unwrap_err();
        assert!(matches!(err, RegistryError::Open { .. }));
    }

    #[test]
    fn test_empty_registry_is_valid() {
        let registry = Registry::build(parse_registry(Cursor::new("")).unwrap()).unwrap();
        assert!(registry.is_empty());
    }
}
