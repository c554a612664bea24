use crate::protocol::{ChunkId, SnapshotChunk, SnapshotDescriptor};
use crate::replica::snapshot::SnapshotStore;

/// Read the chunk of the current snapshot that starts at `chunk_id`. Chunk ids are byte offsets,
/// so the chunk size may change between chunks of one transfer.
pub(crate) fn read_chunk(
    store: &dyn SnapshotStore,
    chunk_id: ChunkId,
    chunk_size: usize,
) -> Option<(SnapshotDescriptor, SnapshotChunk)> {
    let snapshot = store.current_snapshot()?;
    let data = store.read_chunk(chunk_id.offset(), chunk_size)?;

    let end = chunk_id.offset() + data.len() as u64;
    let complete = end >= snapshot.len();
    let chunk = SnapshotChunk {
        chunk_id,
        next_chunk_id: if complete { None } else { Some(ChunkId::new(end)) },
        data,
        initial: chunk_id == ChunkId::initial(),
        complete,
    };

    Some((snapshot.descriptor, chunk))
}
