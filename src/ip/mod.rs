//! IP prefix handling.
//!
//! This module provides the canonical prefix value type and the per-family
//! trie used for longest-prefix-match lookups.

pub mod prefix;
pub mod trie;

// Re-export commonly used types
pub use prefix::{AddressFamily, NetworkPrefix, PrefixError};
pub use trie::PrefixIndex;
