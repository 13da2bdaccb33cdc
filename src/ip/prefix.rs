//! Canonical network prefix value type.
//!
//! A prefix is an (address family, base address, length) triple. The base is
//! stored right-aligned in a `u128` regardless of family, and every bit past
//! `length` (counting from the most significant bit of the family's width)
//! must be zero. Constructors reject un-masked values instead of silently
//! masking them.

use std::cmp::Ordering;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Address family of a prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Number of address bits for this family
    pub const fn width(self) -> u8 {
        match self {
            AddressFamily::V4 => 32,
            AddressFamily::V6 => 128,
        }
    }

    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => AddressFamily::V4,
            IpAddr::V6(_) => AddressFamily::V6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::V4 => write!(f, "IPv4"),
            AddressFamily::V6 => write!(f, "IPv6"),
        }
    }
}

/// Errors that can occur when building or parsing a prefix
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PrefixError {
    #[error("Invalid address: '{0}'")]
    InvalidAddress(String),

    #[error("Invalid prefix length: '{0}'")]
    InvalidLength(String),

    #[error("Prefix length {length} out of range for {family}")]
    LengthOutOfRange { family: AddressFamily, length: u8 },

    #[error("Base address does not fit in {family}")]
    AddressOutOfRange { family: AddressFamily },

    #[error("Host bits set beyond /{length} in {addr}")]
    HostBitsSet { addr: IpAddr, length: u8 },

    #[error("Expected an {expected} prefix, got {found}")]
    FamilyMismatch {
        expected: AddressFamily,
        found: AddressFamily,
    },

    #[error("{family} prefix index has no room for another node")]
    IndexFull { family: AddressFamily },
}

/// Network mask for the top `length` bits of a `family`-wide address.
fn netmask(family: AddressFamily, length: u8) -> u128 {
    let width = family.width() as u32;
    let shift = 128 - length as u32;
    u128::MAX.checked_shl(shift).unwrap_or(0) >> (128 - width)
}

/// A canonical CIDR prefix.
///
/// Equality and hashing cover family, length and base. Ordering puts more
/// specific (longer) prefixes first, which is the order used when several
/// candidates contain the same address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkPrefix {
    family: AddressFamily,
    base: u128,
    length: u8,
}

impl NetworkPrefix {
    /// Build a prefix from its raw parts, rejecting un-masked bases.
    pub fn new(family: AddressFamily, base: u128, length: u8) -> Result<Self, PrefixError> {
        if length > family.width() {
            return Err(PrefixError::LengthOutOfRange { family, length });
        }
        if family == AddressFamily::V4 && base > u32::MAX as u128 {
            return Err(PrefixError::AddressOutOfRange { family });
        }
        let prefix = NetworkPrefix { family, base, length };
        if base & !netmask(family, length) != 0 {
            return Err(PrefixError::HostBitsSet {
                addr: prefix.addr(),
                length,
            });
        }
        Ok(prefix)
    }

    /// Build a prefix from an address and a length.
    pub fn from_addr(addr: IpAddr, length: u8) -> Result<Self, PrefixError> {
        let base = match addr {
            IpAddr::V4(v4) => u32::from(v4) as u128,
            IpAddr::V6(v6) => u128::from(v6),
        };
        Self::new(AddressFamily::of(&addr), base, length)
    }

    /// Maximal-length prefix covering exactly one address.
    pub fn host(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => NetworkPrefix {
                family: AddressFamily::V4,
                base: u32::from(v4) as u128,
                length: 32,
            },
            IpAddr::V6(v6) => NetworkPrefix {
                family: AddressFamily::V6,
                base: u128::from(v6),
                length: 128,
            },
        }
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    pub fn base(&self) -> u128 {
        self.base
    }

    pub fn length(&self) -> u8 {
        self.length
    }

    /// Base address as a standard library address
    pub fn addr(&self) -> IpAddr {
        match self.family {
            AddressFamily::V4 => IpAddr::V4(Ipv4Addr::from(self.base as u32)),
            AddressFamily::V6 => IpAddr::V6(Ipv6Addr::from(self.base)),
        }
    }

    /// Whether `other` lies entirely inside this prefix. A prefix contains itself.
    pub fn contains(&self, other: &NetworkPrefix) -> bool {
        self.family == other.family
            && self.length <= other.length
            && other.base & netmask(self.family, self.length) == self.base
    }

    /// The covering prefix of `length` bits, or `self` if it is already shorter.
    pub fn truncate(&self, length: u8) -> NetworkPrefix {
        let length = length.min(self.length);
        NetworkPrefix {
            family: self.family,
            base: self.base & netmask(self.family, length),
            length,
        }
    }

    /// The `idx`-th most significant bit of the base, counted from the left.
    pub fn bit(&self, idx: u8) -> bool {
        let width = self.family.width();
        debug_assert!(idx < width, "bit {} out of range for {}", idx, self.family);
        (self.base >> (width - 1 - idx)) & 1 == 1
    }
}

impl Ord for NetworkPrefix {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .length
            .cmp(&self.length)
            .then(self.family.cmp(&other.family))
            .then(self.base.cmp(&other.base))
    }
}

impl PartialOrd for NetworkPrefix {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr(), self.length)
    }
}

impl FromStr for NetworkPrefix {
    type Err = PrefixError;

    /// Parse `addr/len` or a bare address, which becomes a host prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr_str, len_str) = match s.split_once('/') {
            Some((addr, len)) => (addr, Some(len)),
            None => (s, None),
        };
        let addr: IpAddr = addr_str
            .parse()
            .map_err(|_| PrefixError::InvalidAddress(addr_str.to_string()))?;

        match len_str {
            None => Ok(Self::host(addr)),
            Some(len) => {
                if len.is_empty() || !len.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(PrefixError::InvalidLength(len.to_string()));
                }
                let length: u8 = len
                    .parse()
                    .map_err(|_| PrefixError::InvalidLength(len.to_string()))?;
                Self::from_addr(addr, length)
            }
        }
    }
}
