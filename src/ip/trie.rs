//! Binary trie for longest-prefix-match lookups.
//!
//! One `PrefixIndex` holds the registry entries of a single address family.
//! Nodes live in a flat arena and refer to their children by index. A node
//! carries an owner label when a registry entry ends exactly at its depth.
//!
//! The index is filled once by `insert` and only read afterwards, so a built
//! index can be shared between worker threads by plain reference.

use std::num::NonZeroU32;
use std::sync::Arc;

use super::prefix::{AddressFamily, NetworkPrefix, PrefixError};

/// Arena slot of a child node. The root sits at slot 0 and is never a
/// child, so child links fit a `NonZeroU32` and `None` costs nothing.
type ChildIndex = NonZeroU32;

const ROOT: usize = 0;

#[derive(Debug, Clone, Default)]
struct TrieNode {
    /// Children for bit 0 and bit 1
    children: [Option<ChildIndex>; 2],
    label: Option<Arc<str>>,
}

/// Link for the node about to be pushed at arena slot `slot`.
fn child_index(slot: usize, family: AddressFamily) -> Result<ChildIndex, PrefixError> {
    u32::try_from(slot)
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or(PrefixError::IndexFull { family })
}

/// Longest-prefix-match index over the prefixes of one address family
#[derive(Debug, Clone)]
pub struct PrefixIndex {
    family: AddressFamily,
    nodes: Vec<TrieNode>,
    entries: usize,
}

impl PrefixIndex {
    pub fn new(family: AddressFamily) -> Self {
        PrefixIndex {
            family,
            nodes: vec![TrieNode::default()],
            entries: 0,
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Insert `prefix` with `owner` as its label.
    ///
    /// An exact duplicate prefix overwrites the earlier label (last write
    /// wins); the overwritten owner is returned so callers can report it.
    /// Fails on a prefix of the other family, or when the arena has no
    /// addressable slot left for a new node.
    pub fn insert(
        &mut self,
        prefix: &NetworkPrefix,
        owner: Arc<str>,
    ) -> Result<Option<Arc<str>>, PrefixError> {
        if prefix.family() != self.family {
            return Err(PrefixError::FamilyMismatch {
                expected: self.family,
                found: prefix.family(),
            });
        }

        let mut current = ROOT;
        for depth in 0..prefix.length() {
            let branch = prefix.bit(depth) as usize;
            let next = match self.nodes[current].children[branch] {
                Some(next) => next,
                None => {
                    let next = child_index(self.nodes.len(), self.family)?;
                    self.nodes.push(TrieNode::default());
                    self.nodes[current].children[branch] = Some(next);
                    next
                }
            };
            current = next.get() as usize;
        }

        let previous = self.nodes[current].label.replace(owner);
        if previous.is_none() {
            self.entries += 1;
        }
        Ok(previous)
    }

    /// Owner of the most specific entry containing `query`, if any.
    pub fn longest_match(&self, query: &NetworkPrefix) -> Option<&str> {
        self.longest_match_entry(query).map(|(_, owner)| owner)
    }

    /// Like `longest_match`, but also returns the matching registry prefix.
    ///
    /// Only entries no longer than the query can match: a registry prefix
    /// must be a supernet of the query, never a subnet of it.
    pub fn longest_match_entry(&self, query: &NetworkPrefix) -> Option<(NetworkPrefix, &str)> {
        if query.family() != self.family {
            return None;
        }

        let mut node = &self.nodes[ROOT];
        let mut best = node.label.as_deref().map(|owner| (0, owner));
        for depth in 0..query.length() {
            let Some(next) = node.children[query.bit(depth) as usize] else {
                break;
            };
            node = &self.nodes[next.get() as usize];
            if let Some(owner) = node.label.as_deref() {
                best = Some((depth + 1, owner));
            }
        }

        best.map(|(length, owner)| (query.truncate(length), owner))
    }

    /// Number of labelled entries (distinct prefixes)
    pub fn len(&self) -> usize {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of trie nodes, including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest node; the root alone has depth 0.
    pub fn max_depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(ROOT, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            max = max.max(depth);
            for child in self.nodes[idx].children.iter().flatten() {
                stack.push((child.get() as usize, depth + 1));
            }
        }
        max
    }
}
