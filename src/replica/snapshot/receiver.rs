use crate::commitlog::Index;
use crate::protocol::{ChunkId, InstallRequest, RaftError, SnapshotDescriptor};
use crate::replica::snapshot::{Snapshot, SnapshotStore};

/// A snapshot being received, chunk by chunk.
#[derive(Debug)]
struct PendingSnapshot {
    descriptor: SnapshotDescriptor,
    last_chunk_id: ChunkId,
    next_chunk_id: Option<ChunkId>,
}

#[derive(Debug, PartialEq)]
pub(crate) enum ReceiveOutcome {
    /// Chunk was written; more are expected.
    Accepted,
    /// Chunk was already received, or the snapshot isn't needed. Nothing changed.
    Ignored,
    /// Last chunk. The snapshot is verified and persisted.
    Installed(Snapshot),
}

/// SnapshotReceiver reassembles a snapshot from Install chunks, strictly in order. Any deviation
/// from the expected sequence discards the partial snapshot.
pub(crate) struct SnapshotReceiver {
    logger: slog::Logger,
    store: Box<dyn SnapshotStore + Send>,
    pending: Option<PendingSnapshot>,
}

impl SnapshotReceiver {
    pub(crate) fn new(logger: slog::Logger, store: Box<dyn SnapshotStore + Send>) -> Self {
        SnapshotReceiver {
            logger,
            store,
            pending: None,
        }
    }

    pub(crate) fn store(&self) -> &dyn SnapshotStore {
        self.store.as_ref()
    }

    pub(crate) fn store_mut(&mut self) -> &mut (dyn SnapshotStore + Send) {
        self.store.as_mut()
    }

    pub(crate) fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drops whatever was received of a snapshot so far.
    pub(crate) fn abort_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            slog::info!(self.logger, "Discarding partially received snapshot {:?}", pending.descriptor);
        }
        self.store.abort();
    }

    /// Handle one chunk. The caller has already rejected stale terms.
    pub(crate) fn receive(
        &mut self,
        request: &InstallRequest,
        commit_index: Option<Index>,
    ) -> Result<ReceiveOutcome, RaftError> {
        let chunk = &request.chunk;

        // A chunk from a different snapshot means the leader has moved on.
        if matches!(&self.pending, Some(p) if !p.descriptor.same_snapshot(&request.snapshot)) {
            self.abort_pending();
        }

        if let Some(pending) = &self.pending {
            if pending.last_chunk_id == chunk.chunk_id {
                // Leader retried because our response was lost.
                return Ok(ReceiveOutcome::Ignored);
            }
            if pending.next_chunk_id != Some(chunk.chunk_id) {
                let message = format!(
                    "Expected chunk {:?}, received {:?}",
                    pending.next_chunk_id, chunk.chunk_id
                );
                self.abort_pending();
                return Err(RaftError::illegal_member_state(message));
            }
        }

        // Everything the snapshot covers is already committed here.
        if commit_index > Some(request.snapshot.index) {
            self.abort_pending();
            return Ok(ReceiveOutcome::Ignored);
        }
        if matches!(self.store.current_snapshot(), Some(s) if s.descriptor.index >= request.snapshot.index) {
            self.abort_pending();
            return Ok(ReceiveOutcome::Ignored);
        }

        if !chunk.complete && chunk.next_chunk_id.is_none() {
            self.abort_pending();
            return Err(RaftError::protocol("Snapshot chunk is incomplete but has no next chunk"));
        }

        if self.pending.is_none() {
            if !chunk.initial {
                return Err(RaftError::illegal_member_state("Request chunk offset is invalid"));
            }
            if let Err(e) = self.store.begin_receive(request.snapshot) {
                return Err(RaftError::application(format!("Failed to start receiving snapshot: {}", e)));
            }
            slog::info!(self.logger, "Receiving snapshot {:?}", request.snapshot);
        }

        if let Err(e) = self.store.write_chunk(chunk.chunk_id.offset(), &chunk.data) {
            self.abort_pending();
            return Err(RaftError::application(format!("Failed to write snapshot chunk: {}", e)));
        }

        if !chunk.complete {
            self.pending = Some(PendingSnapshot {
                descriptor: request.snapshot,
                last_chunk_id: chunk.chunk_id,
                next_chunk_id: chunk.next_chunk_id,
            });
            return Ok(ReceiveOutcome::Accepted);
        }

        self.pending = None;
        let snapshot = match self.store.finalize() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.store.abort();
                return Err(RaftError::application(format!("Failed to install snapshot: {}", e)));
            }
        };
        if let Err(e) = self.store.persist(snapshot.clone()) {
            return Err(RaftError::application(format!("Failed to persist snapshot: {}", e)));
        }

        slog::info!(self.logger, "Installed snapshot {:?}", snapshot.descriptor);
        Ok(ReceiveOutcome::Installed(snapshot))
    }
}
