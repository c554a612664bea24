use crate::commitlog::Index;
use crate::membership::{Configuration, MemberId};
use crate::protocol::{
    AppendResponse, ChunkId, ConfigureResponse, InstallResponse, RaftError, SnapshotDescriptor,
};
use crate::replica::Term;
use bytes::Bytes;
use std::io;

#[derive(Debug)]
pub(crate) struct EnqueueForReplicationInput {
    pub(crate) data: Bytes,
}

#[derive(Debug)]
pub(crate) struct EnqueueForReplicationOutput {
    pub(crate) enqueued_term: Term,
    pub(crate) enqueued_index: Index,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum EnqueueForReplicationError {
    #[error("I'm not leader. Leader is {0:?}")]
    LeaderRedirect(MemberId),

    // Can be retried with exponential backoff with recommended initial delay of 200ms. Likely an
    // election is in progress.
    #[error("Cluster is in a tough shape. No one is leader.")]
    NoLeader,

    #[error("Failed to persist log")]
    LocalIoError(io::Error),

    #[error("Replica actor is dead RIP")]
    ActorExited,
}

/// The application's state as of `index`, which it must already have applied.
#[derive(Debug)]
pub(crate) struct TakeSnapshotInput {
    pub(crate) index: Index,
    pub(crate) data: Bytes,
}

#[derive(Debug)]
pub(crate) struct TakeSnapshotOutput {
    pub(crate) snapshot_index: Index,
    pub(crate) snapshot_term: Term,
    // First entry still in the log after compaction.
    pub(crate) first_log_index: Index,
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum TakeSnapshotError {
    #[error("Index {requested:?} is not applied yet. Last applied: {last_applied:?}")]
    NotApplied {
        requested: Index,
        last_applied: Option<Index>,
    },
    #[error("A snapshot at or past index {0:?} already exists")]
    AlreadyCovered(Index),
    #[error("Failed to persist snapshot: {0}")]
    Store(String),
    #[error("Failed to read or compact log")]
    LocalIoError(io::Error),
    #[error("Replica actor is dead RIP")]
    ActorExited,
}

#[derive(Clone, Debug)]
pub(crate) struct ClusterInfo {
    pub(crate) term: Term,
    pub(crate) leader: Option<MemberId>,
    pub(crate) configuration: Configuration,
    pub(crate) configuration_committed: bool,
    pub(crate) commit_index: Option<Index>,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) enum ElectionRequestKind {
    Poll,
    Vote,
}

#[derive(Debug)]
pub(crate) struct ElectionReplyFromPeer {
    pub(crate) peer_id: MemberId,
    pub(crate) kind: ElectionRequestKind,
    // Term the request was sent with.
    pub(crate) term: Term,
    pub(crate) result: Result<ElectionReply, PeerReplyError>,
}

#[derive(Debug)]
pub(crate) struct ElectionReply {
    pub(crate) term: Term,
    pub(crate) accepted: bool,
}

/// Why a request to a peer didn't produce a successful response.
#[derive(Debug)]
pub(crate) enum PeerReplyError {
    // No response: transport failure or timeout.
    Failed(String),
    // The peer answered, with status=ERROR.
    Error(RaftError),
}

#[derive(Debug)]
pub(crate) struct AppendReplyFromPeer {
    pub(crate) descriptor: AppendReplyDescriptor,
    pub(crate) result: Result<AppendResponse, PeerReplyError>,
}

// This is basically info about the original request
#[derive(Debug)]
pub(crate) struct AppendReplyDescriptor {
    pub(crate) peer_id: MemberId,
    pub(crate) term: Term,
    pub(crate) seq_no: u64,
    pub(crate) previous_log_entry_index: Option<Index>,
    pub(crate) num_log_entries: usize,
}

#[derive(Debug)]
pub(crate) struct InstallReplyFromPeer {
    pub(crate) descriptor: InstallReplyDescriptor,
    pub(crate) result: Result<InstallResponse, PeerReplyError>,
}

#[derive(Debug)]
pub(crate) struct InstallReplyDescriptor {
    pub(crate) peer_id: MemberId,
    pub(crate) term: Term,
    pub(crate) seq_no: u64,
    pub(crate) snapshot: SnapshotDescriptor,
    pub(crate) chunk_id: ChunkId,
    pub(crate) next_chunk_id: Option<ChunkId>,
}

#[derive(Debug)]
pub(crate) struct ConfigureReplyFromPeer {
    pub(crate) descriptor: ConfigureReplyDescriptor,
    pub(crate) result: Result<ConfigureResponse, PeerReplyError>,
}

#[derive(Debug)]
pub(crate) struct ConfigureReplyDescriptor {
    pub(crate) peer_id: MemberId,
    pub(crate) term: Term,
    pub(crate) seq_no: u64,
    pub(crate) configuration_index: Option<Index>,
}

/// LeaderTimerTick contains info for a single tick of a leader's per-peer timer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LeaderTimerTick {
    pub(crate) peer_id: MemberId,
    pub(crate) term: Term,
}
