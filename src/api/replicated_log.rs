use crate::actor::ActorClient;
use crate::api::types::{RaftEntryId, RaftLeaderInfo};
use crate::commitlog::Index;
use crate::replica;
use bytes::Bytes;
use std::io;

/// ReplicatedLog is the replicated log for external application to append to.
#[derive(Clone)]
pub struct ReplicatedLog {
    actor_client: ActorClient,
}

impl ReplicatedLog {
    pub(crate) fn new(actor_client: ActorClient) -> Self {
        ReplicatedLog { actor_client }
    }

    /// Only the leader accepts entries. The entry shows up in the commit stream once a quorum
    /// has it.
    pub async fn enqueue_entry(&self, input: EnqueueEntryInput) -> Result<EnqueueEntryOutput, EnqueueEntryError> {
        let replica_input = replica::EnqueueForReplicationInput { data: input.data };

        self.actor_client
            .enqueue_for_replication(replica_input)
            .await
            .map(|o| o.into())
            .map_err(|e| e.into())
    }

    /// Hand over the application's state as of `applied_index`, so the log before it can be
    /// dropped and lagging members can catch up from the snapshot.
    pub async fn take_snapshot(
        &self,
        applied_index: u64,
        data: Bytes,
    ) -> Result<TakeSnapshotOutput, TakeSnapshotError> {
        let index = Index::from_u64(applied_index).ok_or(TakeSnapshotError::NothingApplied)?;
        let replica_input = replica::TakeSnapshotInput { index, data };

        self.actor_client
            .take_snapshot(replica_input)
            .await
            .map(|o| o.into())
            .map_err(|e| e.into())
    }
}

#[derive(Debug)]
pub struct EnqueueEntryInput {
    pub data: Bytes,
}

#[derive(Debug)]
pub struct EnqueueEntryOutput {
    pub entry_id: RaftEntryId,
}

#[derive(Debug, thiserror::Error)]
pub enum EnqueueEntryError {
    #[error("I'm not leader")]
    LeaderRedirect(RaftLeaderInfo),

    // Can be retried with exponential backoff with recommended initial delay of 200ms. Likely an
    // election is in progress.
    #[error("Cluster is in a tough shape. No one is leader.")]
    NoLeader,

    #[error("Failed to persist log")]
    LocalIoError(io::Error),

    // Replica logic runs on a background task. This error is returned if the task has exited.
    #[error("Replica task has exited")]
    ReplicaExited,
}

#[derive(Debug)]
pub struct TakeSnapshotOutput {
    pub snapshot_entry_id: RaftEntryId,
    /// First index still held in the log. Compaction stops short of the snapshot while a
    /// membership change is in flight or a compaction bound is set.
    pub first_log_index: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum TakeSnapshotError {
    #[error("Index 0 never holds an entry")]
    NothingApplied,
    #[error("Entry {requested} is not applied yet. Last applied: {last_applied:?}")]
    NotApplied { requested: u64, last_applied: Option<u64> },
    #[error("Snapshot at or past {0} already exists")]
    AlreadyCovered(u64),
    #[error("Failed to persist snapshot: {0}")]
    Store(String),
    #[error("Failed to read or compact log")]
    LocalIoError(io::Error),
    #[error("Replica task has exited")]
    ReplicaExited,
}

// ------- Conversions --------

impl From<replica::EnqueueForReplicationOutput> for EnqueueEntryOutput {
    fn from(internal_output: replica::EnqueueForReplicationOutput) -> Self {
        EnqueueEntryOutput {
            entry_id: RaftEntryId {
                term: internal_output.enqueued_term,
                entry_index: internal_output.enqueued_index,
            },
        }
    }
}

impl From<replica::EnqueueForReplicationError> for EnqueueEntryError {
    fn from(internal_error: replica::EnqueueForReplicationError) -> Self {
        match internal_error {
            replica::EnqueueForReplicationError::LeaderRedirect(leader_id) => {
                EnqueueEntryError::LeaderRedirect(RaftLeaderInfo::from(leader_id))
            }
            replica::EnqueueForReplicationError::NoLeader => EnqueueEntryError::NoLeader,
            replica::EnqueueForReplicationError::LocalIoError(e) => EnqueueEntryError::LocalIoError(e),
            replica::EnqueueForReplicationError::ActorExited => EnqueueEntryError::ReplicaExited,
        }
    }
}

impl From<replica::TakeSnapshotOutput> for TakeSnapshotOutput {
    fn from(internal_output: replica::TakeSnapshotOutput) -> Self {
        TakeSnapshotOutput {
            snapshot_entry_id: RaftEntryId {
                term: internal_output.snapshot_term,
                entry_index: internal_output.snapshot_index,
            },
            first_log_index: internal_output.first_log_index.as_u64(),
        }
    }
}

impl From<replica::TakeSnapshotError> for TakeSnapshotError {
    fn from(internal_error: replica::TakeSnapshotError) -> Self {
        match internal_error {
            replica::TakeSnapshotError::NotApplied {
                requested,
                last_applied,
            } => TakeSnapshotError::NotApplied {
                requested: requested.as_u64(),
                last_applied: last_applied.map(|i| i.as_u64()),
            },
            replica::TakeSnapshotError::AlreadyCovered(index) => TakeSnapshotError::AlreadyCovered(index.as_u64()),
            replica::TakeSnapshotError::Store(message) => TakeSnapshotError::Store(message),
            replica::TakeSnapshotError::LocalIoError(e) => TakeSnapshotError::LocalIoError(e),
            replica::TakeSnapshotError::ActorExited => TakeSnapshotError::ReplicaExited,
        }
    }
}
