use crate::commitlog::Index;
use crate::membership::MemberId;
use crate::protocol::{AppendRequest, ReplicatableRecord, VersionedAppendRequest};
use crate::replica::Term;

/// InternalAppendRequest is the only shape of append the replica handles. Every wire variant of
/// the append request is converted into it first. The version was already checked on decode.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct InternalAppendRequest {
    pub(crate) term: Term,
    pub(crate) leader: MemberId,
    pub(crate) prev_log_entry: Option<(Term, Index)>,
    pub(crate) commit_index: Option<Index>,
    pub(crate) entries: Vec<ReplicatableRecord>,
}

pub(crate) trait ToInternalAppend {
    fn to_internal(self) -> InternalAppendRequest;
}

impl ToInternalAppend for AppendRequest {
    fn to_internal(self) -> InternalAppendRequest {
        let entries = self
            .entries
            .into_iter()
            .map(|record| ReplicatableRecord {
                index: record.index,
                term: record.term,
                checksum: record.checksum,
                serialized: record.data,
            })
            .collect();

        InternalAppendRequest {
            term: self.term,
            leader: self.leader,
            prev_log_entry: self.prev_log_entry,
            commit_index: self.commit_index,
            entries,
        }
    }
}

impl ToInternalAppend for VersionedAppendRequest {
    fn to_internal(self) -> InternalAppendRequest {
        InternalAppendRequest {
            term: self.term,
            leader: self.leader,
            prev_log_entry: self.prev_log_entry,
            commit_index: self.commit_index,
            entries: self.entries,
        }
    }
}
