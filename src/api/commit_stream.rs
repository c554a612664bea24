use crate::api::types::RaftEntryId;
use crate::replica;
use bytes::Bytes;

/// RaftCommitStream delivers committed entries in log order, for the application to apply to its
/// state machine.
pub struct RaftCommitStream {
    commit_stream: replica::CommitStream,
}

#[derive(Debug)]
pub enum RaftCommitEvent {
    Entry(RaftCommittedEntry),
    /// The leader sent a snapshot in place of entries this member was missing. Restore the state
    /// machine from `data`; entries after `entry_id` follow.
    SnapshotInstalled { entry_id: RaftEntryId, data: Bytes },
}

#[derive(Debug)]
pub struct RaftCommittedEntry {
    pub entry_id: RaftEntryId,
    pub data: Bytes,
}

impl RaftCommitStream {
    pub(crate) fn new(commit_stream: replica::CommitStream) -> Self {
        RaftCommitStream { commit_stream }
    }

    /// None once the replica has shut down.
    pub async fn next(&mut self) -> Option<RaftCommitEvent> {
        self.commit_stream.recv().await.map(RaftCommitEvent::from)
    }
}

// ------- Conversions --------

impl From<replica::CommitEvent> for RaftCommitEvent {
    fn from(event: replica::CommitEvent) -> Self {
        match event {
            replica::CommitEvent::Entry(entry) => RaftCommitEvent::Entry(RaftCommittedEntry {
                entry_id: RaftEntryId {
                    term: entry.term,
                    entry_index: entry.index,
                },
                data: entry.data,
            }),
            replica::CommitEvent::SnapshotInstalled(snapshot) => RaftCommitEvent::SnapshotInstalled {
                entry_id: RaftEntryId {
                    term: snapshot.term,
                    entry_index: snapshot.index,
                },
                data: snapshot.data,
            },
        }
    }
}
