use crate::commitlog::Index;
use crate::membership::{Configuration, MemberId, RaftMember};
use crate::protocol::{MessageError, RaftError, RaftResponse};
use crate::replica::Term;
use bytes::Bytes;
use std::collections::HashSet;

/// Every request a raft member can receive.
#[derive(Debug)]
pub(crate) enum RaftRequest {
    Poll(PollRequest),
    Vote(VoteRequest),
    Append(AppendRequest),
    VersionedAppend(VersionedAppendRequest),
    Install(InstallRequest),
    Configure(ConfigureRequest),
    Reconfigure(ReconfigureRequest),
    ForceConfigure(ForceConfigureRequest),
    Join(JoinRequest),
    Leave(LeaveRequest),
}

impl RaftRequest {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            RaftRequest::Poll(_) => "Poll",
            RaftRequest::Vote(_) => "Vote",
            RaftRequest::Append(_) => "Append",
            RaftRequest::VersionedAppend(_) => "VersionedAppend",
            RaftRequest::Install(_) => "Install",
            RaftRequest::Configure(_) => "Configure",
            RaftRequest::Reconfigure(_) => "Reconfigure",
            RaftRequest::ForceConfigure(_) => "ForceConfigure",
            RaftRequest::Join(_) => "Join",
            RaftRequest::Leave(_) => "Leave",
        }
    }

    /// The status=ERROR response of the matching kind.
    pub(crate) fn error_response(&self, error: RaftError) -> RaftResponse {
        match self {
            RaftRequest::Poll(_) => RaftResponse::Poll(Err(error)),
            RaftRequest::Vote(_) => RaftResponse::Vote(Err(error)),
            RaftRequest::Append(_) | RaftRequest::VersionedAppend(_) => RaftResponse::Append(Err(error)),
            RaftRequest::Install(_) => RaftResponse::Install(Err(error)),
            RaftRequest::Configure(_) => RaftResponse::Configure(Err(error)),
            RaftRequest::Reconfigure(_) => RaftResponse::Reconfigure(Err(error)),
            RaftRequest::ForceConfigure(_) => RaftResponse::ForceConfigure(Err(error)),
            RaftRequest::Join(_) => RaftResponse::Join(Err(error)),
            RaftRequest::Leave(_) => RaftResponse::Leave(Err(error)),
        }
    }
}

/// Wire formats carry a log position as a (term, index) pair where (0, 0) means "no entry".
pub(crate) fn log_entry_metadata(term: u64, index: u64) -> Result<Option<(Term, Index)>, MessageError> {
    match (term, index) {
        (0, 0) => Ok(None),
        (0, _) => Err(MessageError::InconsistentLogPosition("term 0 and index non-0")),
        (_, 0) => Err(MessageError::InconsistentLogPosition("index 0 and term non-0")),
        (term, index) => Ok(Some((Term::new(term), Index::new(index)))),
    }
}

// ------- Election -------

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PollRequest {
    pub(crate) term: Term,
    pub(crate) candidate: MemberId,
    pub(crate) last_log_entry: Option<(Term, Index)>,
}

impl PollRequest {
    pub(crate) fn new(
        term: Term,
        candidate: MemberId,
        last_log_entry: Option<(Term, Index)>,
    ) -> Result<Self, MessageError> {
        validate_last_log_entry(term, last_log_entry)?;
        Ok(PollRequest {
            term,
            candidate,
            last_log_entry,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct VoteRequest {
    pub(crate) term: Term,
    pub(crate) candidate: MemberId,
    pub(crate) last_log_entry: Option<(Term, Index)>,
}

impl VoteRequest {
    pub(crate) fn new(
        term: Term,
        candidate: MemberId,
        last_log_entry: Option<(Term, Index)>,
    ) -> Result<Self, MessageError> {
        validate_last_log_entry(term, last_log_entry)?;
        Ok(VoteRequest {
            term,
            candidate,
            last_log_entry,
        })
    }
}

fn validate_last_log_entry(term: Term, last_log_entry: Option<(Term, Index)>) -> Result<(), MessageError> {
    match last_log_entry {
        Some((last_term, _)) if last_term > term => Err(MessageError::InvalidField {
            field: "lastLogTerm",
            reason: format!("{:?} is ahead of request term {:?}", last_term, term),
        }),
        _ => Ok(()),
    }
}

// ------- Replication -------

/// Record as sent by members that predate protocol versioning.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct PersistedRecord {
    pub(crate) index: Index,
    pub(crate) term: Term,
    pub(crate) checksum: u32,
    pub(crate) data: Bytes,
}

/// Record as sent by versioned members. `serialized` is the raw log entry.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ReplicatableRecord {
    pub(crate) index: Index,
    pub(crate) term: Term,
    pub(crate) checksum: u32,
    pub(crate) serialized: Bytes,
}

impl ReplicatableRecord {
    pub(crate) fn new(index: Index, term: Term, serialized: Bytes) -> Self {
        ReplicatableRecord {
            index,
            term,
            checksum: record_checksum(&serialized),
            serialized,
        }
    }

    pub(crate) fn is_intact(&self) -> bool {
        record_checksum(&self.serialized) == self.checksum
    }
}

pub(crate) fn record_checksum(serialized: &[u8]) -> u32 {
    crc32fast::hash(serialized)
}

/// Legacy append. Has no version field.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct AppendRequest {
    pub(crate) term: Term,
    pub(crate) leader: MemberId,
    pub(crate) prev_log_entry: Option<(Term, Index)>,
    pub(crate) commit_index: Option<Index>,
    pub(crate) entries: Vec<PersistedRecord>,
}

impl AppendRequest {
    pub(crate) fn new(
        term: Term,
        leader: MemberId,
        prev_log_entry: Option<(Term, Index)>,
        commit_index: Option<Index>,
        entries: Vec<PersistedRecord>,
    ) -> Result<Self, MessageError> {
        validate_entries(term, prev_log_entry, entries.iter().map(|e| (e.index, e.term)))?;
        Ok(AppendRequest {
            term,
            leader,
            prev_log_entry,
            commit_index,
            entries,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct VersionedAppendRequest {
    pub(crate) version: u32,
    pub(crate) term: Term,
    pub(crate) leader: MemberId,
    pub(crate) prev_log_entry: Option<(Term, Index)>,
    pub(crate) commit_index: Option<Index>,
    pub(crate) entries: Vec<ReplicatableRecord>,
}

impl VersionedAppendRequest {
    pub(crate) fn new(
        version: u32,
        term: Term,
        leader: MemberId,
        prev_log_entry: Option<(Term, Index)>,
        commit_index: Option<Index>,
        entries: Vec<ReplicatableRecord>,
    ) -> Result<Self, MessageError> {
        if version <= super::LEGACY_PROTOCOL_VERSION || version > super::CURRENT_PROTOCOL_VERSION {
            return Err(MessageError::InvalidField {
                field: "version",
                reason: format!("unsupported protocol version {}", version),
            });
        }
        validate_entries(term, prev_log_entry, entries.iter().map(|e| (e.index, e.term)))?;
        Ok(VersionedAppendRequest {
            version,
            term,
            leader,
            prev_log_entry,
            commit_index,
            entries,
        })
    }
}

fn validate_entries(
    term: Term,
    prev_log_entry: Option<(Term, Index)>,
    entries: impl Iterator<Item = (Index, Term)>,
) -> Result<(), MessageError> {
    if let Some((prev_term, _)) = prev_log_entry {
        if prev_term > term {
            return Err(MessageError::InvalidField {
                field: "prevLogTerm",
                reason: format!("{:?} is ahead of request term {:?}", prev_term, term),
            });
        }
    }

    let mut expected_index = Index::following(prev_log_entry.map(|(_, index)| index));
    let mut min_term = prev_log_entry.map(|(t, _)| t).unwrap_or_else(|| Term::new(0));
    for (index, entry_term) in entries {
        if index != expected_index {
            return Err(MessageError::InvalidField {
                field: "entries",
                reason: format!("expected index {:?}, got {:?}", expected_index, index),
            });
        }
        if entry_term < min_term || entry_term > term {
            return Err(MessageError::InvalidField {
                field: "entries",
                reason: format!("entry {:?} has out of order term {:?}", index, entry_term),
            });
        }
        min_term = entry_term;
        expected_index = expected_index.plus(1);
    }

    Ok(())
}

// ------- Snapshots -------

/// ChunkId is the byte offset of a chunk within the snapshot.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) struct ChunkId(u64);

impl ChunkId {
    pub(crate) fn new(offset: u64) -> Self {
        ChunkId(offset)
    }

    pub(crate) fn initial() -> Self {
        ChunkId(0)
    }

    pub(crate) fn offset(&self) -> u64 {
        self.0
    }
}

/// Identifies one snapshot. A transfer is for exactly one (index, term, version).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct SnapshotDescriptor {
    pub(crate) index: Index,
    pub(crate) term: Term,
    pub(crate) version: u32,
    // Checksum of the whole snapshot, verified once assembled.
    pub(crate) checksum: u32,
}

impl SnapshotDescriptor {
    pub(crate) fn same_snapshot(&self, other: &SnapshotDescriptor) -> bool {
        self.index == other.index && self.term == other.term
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SnapshotChunk {
    pub(crate) chunk_id: ChunkId,
    pub(crate) next_chunk_id: Option<ChunkId>,
    pub(crate) data: Bytes,
    pub(crate) initial: bool,
    pub(crate) complete: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct InstallRequest {
    pub(crate) current_term: Term,
    pub(crate) leader: MemberId,
    pub(crate) snapshot: SnapshotDescriptor,
    pub(crate) chunk: SnapshotChunk,
}

impl InstallRequest {
    pub(crate) fn new(
        current_term: Term,
        leader: MemberId,
        snapshot: SnapshotDescriptor,
        chunk: SnapshotChunk,
    ) -> Result<Self, MessageError> {
        if snapshot.term > current_term {
            return Err(MessageError::InvalidField {
                field: "term",
                reason: format!("snapshot term {:?} is ahead of {:?}", snapshot.term, current_term),
            });
        }
        if chunk.initial != (chunk.chunk_id == ChunkId::initial()) {
            return Err(MessageError::InvalidField {
                field: "initial",
                reason: format!("initial={} disagrees with chunk {:?}", chunk.initial, chunk.chunk_id),
            });
        }
        if let Some(next_chunk_id) = chunk.next_chunk_id {
            if chunk.complete {
                return Err(MessageError::InvalidField {
                    field: "nextChunkId",
                    reason: "complete chunk can't have a next chunk".into(),
                });
            }
            if next_chunk_id <= chunk.chunk_id {
                return Err(MessageError::InvalidField {
                    field: "nextChunkId",
                    reason: format!("{:?} doesn't follow {:?}", next_chunk_id, chunk.chunk_id),
                });
            }
        }

        Ok(InstallRequest {
            current_term,
            leader,
            snapshot,
            chunk,
        })
    }
}

// ------- Membership -------

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ConfigureRequest {
    pub(crate) term: Term,
    pub(crate) leader: MemberId,
    pub(crate) configuration: Configuration,
}

impl ConfigureRequest {
    pub(crate) fn new(term: Term, leader: MemberId, configuration: Configuration) -> Result<Self, MessageError> {
        validate_members("newMembers", &configuration.new_members)?;
        if configuration.term > term {
            return Err(MessageError::InvalidField {
                field: "configuration",
                reason: format!("term {:?} is ahead of request term {:?}", configuration.term, term),
            });
        }
        Ok(ConfigureRequest {
            term,
            leader,
            configuration,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ReconfigureRequest {
    // Index and term of the configuration the requester based its change on.
    pub(crate) index: Option<Index>,
    pub(crate) term: Term,
    pub(crate) members: Vec<RaftMember>,
    pub(crate) from: MemberId,
}

impl ReconfigureRequest {
    pub(crate) fn new(
        index: Option<Index>,
        term: Term,
        members: Vec<RaftMember>,
        from: MemberId,
    ) -> Result<Self, MessageError> {
        validate_members("members", &members)?;
        Ok(ReconfigureRequest {
            index,
            term,
            members,
            from,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct ForceConfigureRequest {
    pub(crate) term: Term,
    pub(crate) index: Option<Index>,
    pub(crate) timestamp: i64,
    pub(crate) new_members: Vec<RaftMember>,
    pub(crate) from: MemberId,
}

impl ForceConfigureRequest {
    pub(crate) fn new(
        term: Term,
        index: Option<Index>,
        timestamp: i64,
        new_members: Vec<RaftMember>,
        from: MemberId,
    ) -> Result<Self, MessageError> {
        validate_members("newMembers", &new_members)?;
        Ok(ForceConfigureRequest {
            term,
            index,
            timestamp,
            new_members,
            from,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct JoinRequest {
    pub(crate) joining_member: RaftMember,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct LeaveRequest {
    pub(crate) leaving_member: RaftMember,
}

fn validate_members(field: &'static str, members: &[RaftMember]) -> Result<(), MessageError> {
    if members.is_empty() {
        return Err(MessageError::MissingField(field));
    }

    let mut seen = HashSet::with_capacity(members.len());
    for member in members {
        if !seen.insert(member.id()) {
            return Err(MessageError::InvalidField {
                field,
                reason: format!("member {:?} is listed twice", member.id()),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(term: u64) -> Term {
        Term::new(term)
    }

    fn i(index: u64) -> Index {
        Index::new(index)
    }

    fn record(index: u64, term: u64) -> ReplicatableRecord {
        ReplicatableRecord::new(i(index), t(term), Bytes::from_static(b"entry"))
    }

    #[test]
    fn log_position_from_wire() {
        assert_eq!(log_entry_metadata(0, 0), Ok(None));
        assert_eq!(log_entry_metadata(2, 5), Ok(Some((t(2), i(5)))));
        assert!(log_entry_metadata(0, 5).is_err());
        assert!(log_entry_metadata(2, 0).is_err());
    }

    #[test]
    fn election_request_rejects_last_term_ahead_of_term() {
        let candidate = MemberId::new("a");
        assert!(VoteRequest::new(t(2), candidate.clone(), Some((t(1), i(5)))).is_ok());
        assert!(VoteRequest::new(t(2), candidate.clone(), Some((t(3), i(5)))).is_err());
        assert!(PollRequest::new(t(0), candidate, None).is_ok());
    }

    #[test]
    fn append_entries_must_follow_previous_entry() {
        let leader = MemberId::new("a");
        let prev = Some((t(1), i(4)));

        let ok = VersionedAppendRequest::new(2, t(2), leader.clone(), prev, None, vec![record(5, 1), record(6, 2)]);
        assert!(ok.is_ok());

        let gap = VersionedAppendRequest::new(2, t(2), leader.clone(), prev, None, vec![record(6, 2)]);
        assert!(matches!(gap, Err(MessageError::InvalidField { field: "entries", .. })));

        let term_goes_back = VersionedAppendRequest::new(2, t(2), leader.clone(), prev, None, vec![record(5, 0)]);
        assert!(term_goes_back.is_err());

        let term_ahead = VersionedAppendRequest::new(2, t(2), leader.clone(), prev, None, vec![record(5, 3)]);
        assert!(term_ahead.is_err());

        let unknown_version = VersionedAppendRequest::new(9, t(2), leader, prev, None, vec![]);
        assert!(matches!(
            unknown_version,
            Err(MessageError::InvalidField { field: "version", .. })
        ));
    }

    #[test]
    fn record_checksum_detects_corruption() {
        let mut r = record(1, 1);
        assert!(r.is_intact());
        r.serialized = Bytes::from_static(b"entrx");
        assert!(!r.is_intact());
    }

    #[test]
    fn install_chunk_shape() {
        let snapshot = SnapshotDescriptor {
            index: i(10),
            term: t(2),
            version: 1,
            checksum: 0,
        };
        let chunk = |offset: u64, next: Option<u64>, complete: bool| SnapshotChunk {
            chunk_id: ChunkId::new(offset),
            next_chunk_id: next.map(ChunkId::new),
            data: Bytes::from_static(b"x"),
            initial: offset == 0,
            complete,
        };
        let leader = MemberId::new("a");

        assert!(InstallRequest::new(t(3), leader.clone(), snapshot, chunk(0, Some(1), false)).is_ok());
        assert!(InstallRequest::new(t(3), leader.clone(), snapshot, chunk(1, None, true)).is_ok());
        // Snapshot from the future.
        assert!(InstallRequest::new(t(1), leader.clone(), snapshot, chunk(0, Some(1), false)).is_err());
        // Next chunk goes backwards.
        assert!(InstallRequest::new(t(3), leader.clone(), snapshot, chunk(5, Some(5), false)).is_err());
        // Complete chunk with a successor.
        assert!(InstallRequest::new(t(3), leader.clone(), snapshot, chunk(5, Some(6), true)).is_err());
        // `initial` disagrees with offset.
        let mut bad = chunk(3, Some(4), false);
        bad.initial = true;
        assert!(InstallRequest::new(t(3), leader, snapshot, bad).is_err());
    }

    #[test]
    fn member_lists_must_be_unique_and_non_empty() {
        let from = MemberId::new("a");
        assert_eq!(
            ReconfigureRequest::new(None, t(1), vec![], from.clone()),
            Err(MessageError::MissingField("members"))
        );
        let dup = vec![RaftMember::active("a"), RaftMember::active("a")];
        assert!(ForceConfigureRequest::new(t(1), None, 0, dup, from).is_err());
    }
}
