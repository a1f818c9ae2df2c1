use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Bound for anything usable as an entry identity.
///
/// The ordered-list storage assigns identities; the engine only needs to
/// compare, hash, and print them.
pub trait EntryKey: Clone + Eq + Hash + fmt::Debug + fmt::Display {}

impl<T> EntryKey for T where T: Clone + Eq + Hash + fmt::Debug + fmt::Display {}

/// Opaque, stable identifier of an entry.
///
/// Ordered-list stores hand out either numeric counters or string keys, so
/// both are accepted on the wire: `0` and `"a7f3"` are both valid `id`s.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    /// Numeric identity (e.g. a per-document counter).
    Number(u64),
    /// String identity (e.g. `client:clock` keys).
    Text(String),
}

impl EntryId {
    /// Returns the numeric form, if this is a numeric identity.
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "EntryId({n})"),
            Self::Text(s) => write!(f, "EntryId({s:?})"),
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Parses decimal digits as a numeric identity and anything else as text.
impl FromStr for EntryId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<u64>()
            .map(Self::Number)
            .unwrap_or_else(|_| Self::Text(s.to_string())))
    }
}

impl From<u64> for EntryId {
    fn from(n: u64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}
