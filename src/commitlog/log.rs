use std::convert::TryFrom;
use std::{fmt, io};

#[derive(Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash)]
struct U64NonZero(u64);

impl U64NonZero {
    fn new(val: u64) -> Self {
        assert_ne!(val, 0);
        U64NonZero(val)
    }
}

/// Index is an index of an entry in the log; i.e. a log entry's index.
#[derive(Copy, Clone, PartialOrd, PartialEq, Ord, Eq, Hash)]
pub struct Index(U64NonZero);

impl Index {
    pub fn new(index: u64) -> Self {
        Index(U64NonZero::new(index))
    }

    /// Wire formats use 0 as "no index". This maps 0 to None.
    pub fn from_u64(index: u64) -> Option<Self> {
        if index == 0 {
            None
        } else {
            Some(Self::new(index))
        }
    }

    pub fn start_index() -> Self {
        Self::new(1)
    }

    /// The index that follows `previous`, where None is the position before the first entry.
    pub fn following(previous: Option<Index>) -> Self {
        previous.map(|i| i.plus(1)).unwrap_or_else(Self::start_index)
    }

    pub fn as_u64(&self) -> u64 {
        self.0 .0
    }

    pub fn plus(&self, delta: u64) -> Index {
        Index::new(self.as_u64() + delta)
    }

    pub fn minus(&self, delta: u64) -> Index {
        Index::new(self.as_u64() - delta)
    }

    pub fn checked_minus(&self, delta: u64) -> Option<Index> {
        self.as_u64().checked_sub(delta).and_then(Self::from_u64)
    }
}

/// Inverse of `Index::from_u64()`.
pub fn index_as_u64(index: Option<Index>) -> u64 {
    index.map(|i| i.as_u64()).unwrap_or(0)
}

impl fmt::Debug for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0 .0)
    }
}

/// Log is an append only log intended for use as a replicated commit log in a database.
///
/// Log indexes entries starting from 1. There will be no entry existing at index 0. The first
/// entry is written at index 1, unless the log was `reset()` to start later.
///
/// Entries before `first_index()` have been compacted away and read as None.
pub trait Log<E: Entry> {
    /// append() appends a log entry to the log at the next log entry index, then returns
    /// the log entry index that was just used to append the entry.
    fn append(&mut self, entry: E) -> Result<Index, io::Error>;

    /// Read log entry at specified index.
    fn read(&self, index: Index) -> Result<Option<E>, io::Error>;

    /// Soft-deletes anything starting at `index` and later. Soft-deletion makes this infallible.
    /// If hard-deletion is required, add a new method.
    fn truncate(&mut self, index: Index);

    /// next_index returns the next index that will be used to append an entry.
    fn next_index(&self) -> Index;

    /// first_index returns the lowest index still readable. Same as `next_index()` when empty.
    fn first_index(&self) -> Index;

    /// Drops every entry strictly before `index`. No-op if already compacted past it.
    fn compact_before(&mut self, index: Index);

    /// Drops every entry. The next append will land at `next_index`.
    fn reset(&mut self, next_index: Index);
}

#[derive(Debug, thiserror::Error)]
#[error("Malformed log entry: {0}")]
pub struct EntryDecodeError(pub String);

// Choice of Vec<u8> vs Bytes will depend on whats easier for disk to use.
pub trait Entry: Clone + TryFrom<Vec<u8>, Error = EntryDecodeError> + Into<Vec<u8>> {}
