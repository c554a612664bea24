use crate::commitlog::Index;
use crate::protocol::SnapshotDescriptor;
use crate::replica::Term;
use bytes::{Bytes, BytesMut};
use std::io;

/// Version of the snapshot format produced by this crate. Carried on every Install chunk.
pub(crate) const SNAPSHOT_VERSION: u32 = 1;

/// A complete snapshot of the application's state, covering every entry up to and including
/// `descriptor.index`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Snapshot {
    pub(crate) descriptor: SnapshotDescriptor,
    pub(crate) data: Bytes,
}

impl Snapshot {
    pub(crate) fn new(index: Index, term: Term, data: Bytes) -> Self {
        Snapshot {
            descriptor: SnapshotDescriptor {
                index,
                term,
                version: SNAPSHOT_VERSION,
                checksum: crc32fast::hash(&data),
            },
            data,
        }
    }

    pub(crate) fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum SnapshotStoreError {
    #[error("No snapshot is being received")]
    NotReceiving,
    #[error("Chunk at offset {offset} doesn't follow the {received} bytes received so far")]
    UnexpectedOffset { offset: u64, received: u64 },
    #[error("Snapshot checksum mismatch. Expected {expected:#010x}, assembled {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("Snapshot storage failure: {0}")]
    Io(#[from] io::Error),
}

/// SnapshotStore holds the latest persisted snapshot, and at most one snapshot being received.
///
/// Receiving is strictly sequential: chunks are written at increasing offsets with no gaps.
pub(crate) trait SnapshotStore {
    /// Start receiving a new snapshot. Any partially received snapshot is discarded.
    fn begin_receive(&mut self, descriptor: SnapshotDescriptor) -> Result<(), SnapshotStoreError>;

    fn write_chunk(&mut self, offset: u64, data: &[u8]) -> Result<(), SnapshotStoreError>;

    /// Verify the received snapshot against its descriptor's checksum and hand it back. The
    /// receive is over either way. Nothing is persisted until `persist()`.
    fn finalize(&mut self) -> Result<Snapshot, SnapshotStoreError>;

    /// Discard a partially received snapshot, if any.
    fn abort(&mut self);

    fn current_snapshot(&self) -> Option<&Snapshot>;

    /// Up to `max_len` bytes of the current snapshot starting at `offset`. None if there's no
    /// current snapshot or the offset is past its end.
    fn read_chunk(&self, offset: u64, max_len: usize) -> Option<Bytes>;

    /// Replace the current snapshot.
    fn persist(&mut self, snapshot: Snapshot) -> Result<(), SnapshotStoreError>;
}

struct Receiving {
    descriptor: SnapshotDescriptor,
    buffer: BytesMut,
}

// TODO:3 Persist snapshots to disk, not RAM.
#[derive(Default)]
pub(crate) struct InMemorySnapshotStore {
    current: Option<Snapshot>,
    receiving: Option<Receiving>,
}

impl InMemorySnapshotStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn begin_receive(&mut self, descriptor: SnapshotDescriptor) -> Result<(), SnapshotStoreError> {
        self.receiving = Some(Receiving {
            descriptor,
            buffer: BytesMut::new(),
        });
        Ok(())
    }

    fn write_chunk(&mut self, offset: u64, data: &[u8]) -> Result<(), SnapshotStoreError> {
        let receiving = self.receiving.as_mut().ok_or(SnapshotStoreError::NotReceiving)?;

        let received = receiving.buffer.len() as u64;
        if offset != received {
            return Err(SnapshotStoreError::UnexpectedOffset { offset, received });
        }

        receiving.buffer.extend_from_slice(data);
        Ok(())
    }

    fn finalize(&mut self) -> Result<Snapshot, SnapshotStoreError> {
        let Receiving { descriptor, buffer } = self.receiving.take().ok_or(SnapshotStoreError::NotReceiving)?;

        let data = buffer.freeze();
        let actual = crc32fast::hash(&data);
        if actual != descriptor.checksum {
            return Err(SnapshotStoreError::ChecksumMismatch {
                expected: descriptor.checksum,
                actual,
            });
        }

        Ok(Snapshot { descriptor, data })
    }

    fn abort(&mut self) {
        self.receiving = None;
    }

    fn current_snapshot(&self) -> Option<&Snapshot> {
        self.current.as_ref()
    }

    fn read_chunk(&self, offset: u64, max_len: usize) -> Option<Bytes> {
        let snapshot = self.current.as_ref()?;
        if offset > snapshot.len() {
            return None;
        }

        let start = offset as usize;
        let end = snapshot.data.len().min(start + max_len);
        Some(snapshot.data.slice(start..end))
    }

    fn persist(&mut self, snapshot: Snapshot) -> Result<(), SnapshotStoreError> {
        self.current = Some(snapshot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn receive_in_order_then_finalize() {
        let expected = Snapshot::new(Index::new(10), Term::new(2), Bytes::from_static(b"abcdef"));
        let mut store = InMemorySnapshotStore::new();

        store.begin_receive(expected.descriptor).unwrap();
        store.write_chunk(0, b"abc").unwrap();
        assert!(matches!(
            store.write_chunk(4, b"ef"),
            Err(SnapshotStoreError::UnexpectedOffset { offset: 4, received: 3 })
        ));
        store.write_chunk(3, b"def").unwrap();

        let snapshot = store.finalize().unwrap();
        assert_eq!(snapshot, expected);
        assert!(store.current_snapshot().is_none());

        store.persist(snapshot).unwrap();
        assert_eq!(store.read_chunk(4, 10), Some(Bytes::from_static(b"ef")));
        assert_eq!(store.read_chunk(6, 10), Some(Bytes::new()));
        assert_eq!(store.read_chunk(7, 10), None);
    }

    #[test]
    fn finalize_verifies_checksum() {
        let descriptor = Snapshot::new(Index::new(1), Term::new(1), Bytes::from_static(b"good")).descriptor;
        let mut store = InMemorySnapshotStore::new();

        store.begin_receive(descriptor).unwrap();
        store.write_chunk(0, b"evil").unwrap();

        assert!(matches!(
            store.finalize(),
            Err(SnapshotStoreError::ChecksumMismatch { .. })
        ));
        assert!(matches!(
            store.write_chunk(4, b"x"),
            Err(SnapshotStoreError::NotReceiving)
        ));
    }
}
