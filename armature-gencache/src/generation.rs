//! Generation counters and cache groups.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Version stamp shared by a group's counter and the entries written to it.
///
/// The registry seeds counters at [`Generation::INITIAL`] and only ever
/// increments them, so [`Generation::TOMBSTONE`] compares lower than any
/// generation a group can be at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// Marks a soft-deleted entry as permanently stale.
    pub const TOMBSTONE: Generation = Generation(0);

    /// First generation of every group.
    pub const INITIAL: Generation = Generation(1);

    /// Wrap a raw generation value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw generation value.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Whether this is the soft-delete sentinel.
    pub const fn is_tombstone(self) -> bool {
        self.0 == 0
    }

    /// The following generation.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1).max(Self::INITIAL.0))
    }

    /// Parse a persisted counter. Anything that is not a positive integer
    /// reads as [`Generation::INITIAL`].
    pub fn from_persisted(raw: &[u8]) -> Self {
        std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|v| *v > 0)
            .map(|v| Self(v as u64))
            .unwrap_or(Self::INITIAL)
    }

    /// Encode for persistence.
    pub fn to_persisted(self) -> Vec<u8> {
        self.0.to_string().into_bytes()
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A logical partition of entries that is flushed as a unit.
///
/// `Group::Default` is the implicit group used when callers do not name
/// one. `Group::named("")` normalizes to it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Group {
    /// The reserved default group.
    #[default]
    Default,
    /// A caller-named group.
    Named(String),
}

impl Group {
    /// Create a group from a name.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Group::Default
        } else {
            Group::Named(name)
        }
    }

    /// Segment used when deriving the group's counter key.
    pub fn key_segment(&self) -> &str {
        match self {
            Group::Default => "",
            Group::Named(name) => name,
        }
    }

    /// Whether this is the default group.
    pub fn is_default(&self) -> bool {
        matches!(self, Group::Default)
    }
}

impl From<&str> for Group {
    fn from(name: &str) -> Self {
        Group::named(name)
    }
}

impl From<String> for Group {
    fn from(name: String) -> Self {
        Group::named(name)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::Default => write!(f, "<default>"),
            Group::Named(name) => write!(f, "{}", name),
        }
    }
}
