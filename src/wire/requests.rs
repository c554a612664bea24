use crate::commitlog::{index_as_u64, Index};
use crate::grpc::{
    ProtoAppendRequest, ProtoChunkId, ProtoConfigureRequest, ProtoForceConfigureRequest, ProtoInstallRequest,
    ProtoJoinRequest, ProtoLeaveRequest, ProtoPersistedRecord, ProtoPollRequest, ProtoReconfigureRequest,
    ProtoReplicatableRecord, ProtoVersionedAppendRequest, ProtoVoteRequest,
};
use crate::protocol::{
    log_entry_metadata, AppendRequest, ChunkId, ConfigureRequest, ForceConfigureRequest, InstallRequest, JoinRequest,
    LeaveRequest, MessageError, PersistedRecord, PollRequest, ReconfigureRequest, ReplicatableRecord,
    SnapshotChunk, SnapshotDescriptor, VersionedAppendRequest, VoteRequest,
};
use crate::replica::Term;
use crate::wire::common::{
    convert_configuration, convert_member, convert_member_id, convert_members, log_position, proto_configuration,
    proto_member, proto_members, required,
};
use bytes::Bytes;

// ------- Election -------

pub(crate) fn proto_poll_request(request: PollRequest) -> ProtoPollRequest {
    let (last_log_term, last_log_index) = log_position(request.last_log_entry);
    ProtoPollRequest {
        term: request.term.as_u64(),
        candidate: request.candidate.into_inner(),
        last_log_index,
        last_log_term,
    }
}

pub(crate) fn convert_poll_request(proto: ProtoPollRequest) -> Result<PollRequest, MessageError> {
    PollRequest::new(
        Term::new(proto.term),
        convert_member_id("candidate", proto.candidate)?,
        log_entry_metadata(proto.last_log_term, proto.last_log_index)?,
    )
}

pub(crate) fn proto_vote_request(request: VoteRequest) -> ProtoVoteRequest {
    let (last_log_term, last_log_index) = log_position(request.last_log_entry);
    ProtoVoteRequest {
        term: request.term.as_u64(),
        candidate: request.candidate.into_inner(),
        last_log_index,
        last_log_term,
    }
}

pub(crate) fn convert_vote_request(proto: ProtoVoteRequest) -> Result<VoteRequest, MessageError> {
    VoteRequest::new(
        Term::new(proto.term),
        convert_member_id("candidate", proto.candidate)?,
        log_entry_metadata(proto.last_log_term, proto.last_log_index)?,
    )
}

// ------- Replication -------

pub(crate) fn proto_append_request(request: AppendRequest) -> ProtoAppendRequest {
    let (prev_log_term, prev_log_index) = log_position(request.prev_log_entry);
    ProtoAppendRequest {
        term: request.term.as_u64(),
        leader: request.leader.into_inner(),
        prev_log_index,
        prev_log_term,
        commit_index: index_as_u64(request.commit_index),
        entries: request
            .entries
            .into_iter()
            .map(|record| ProtoPersistedRecord {
                index: record.index.as_u64(),
                term: record.term.as_u64(),
                checksum: record.checksum,
                data: record.data.to_vec(),
            })
            .collect(),
    }
}

pub(crate) fn convert_append_request(proto: ProtoAppendRequest) -> Result<AppendRequest, MessageError> {
    let entries = proto
        .entries
        .into_iter()
        .map(|record| {
            Ok(PersistedRecord {
                index: required("entries.index", Index::from_u64(record.index))?,
                term: Term::new(record.term),
                checksum: record.checksum,
                data: Bytes::from(record.data),
            })
        })
        .collect::<Result<Vec<_>, MessageError>>()?;

    AppendRequest::new(
        Term::new(proto.term),
        convert_member_id("leader", proto.leader)?,
        log_entry_metadata(proto.prev_log_term, proto.prev_log_index)?,
        Index::from_u64(proto.commit_index),
        entries,
    )
}

pub(crate) fn proto_versioned_append_request(request: VersionedAppendRequest) -> ProtoVersionedAppendRequest {
    let (prev_log_term, prev_log_index) = log_position(request.prev_log_entry);
    ProtoVersionedAppendRequest {
        version: request.version,
        term: request.term.as_u64(),
        leader: request.leader.into_inner(),
        prev_log_index,
        prev_log_term,
        commit_index: index_as_u64(request.commit_index),
        entries: request
            .entries
            .into_iter()
            .map(|record| ProtoReplicatableRecord {
                index: record.index.as_u64(),
                term: record.term.as_u64(),
                checksum: record.checksum,
                serialized: record.serialized.to_vec(),
            })
            .collect(),
    }
}

pub(crate) fn convert_versioned_append_request(
    proto: ProtoVersionedAppendRequest,
) -> Result<VersionedAppendRequest, MessageError> {
    let entries = proto
        .entries
        .into_iter()
        .map(|record| {
            Ok(ReplicatableRecord {
                index: required("entries.index", Index::from_u64(record.index))?,
                term: Term::new(record.term),
                checksum: record.checksum,
                serialized: Bytes::from(record.serialized),
            })
        })
        .collect::<Result<Vec<_>, MessageError>>()?;

    VersionedAppendRequest::new(
        proto.version,
        Term::new(proto.term),
        convert_member_id("leader", proto.leader)?,
        log_entry_metadata(proto.prev_log_term, proto.prev_log_index)?,
        Index::from_u64(proto.commit_index),
        entries,
    )
}

// ------- Snapshots -------

pub(crate) fn proto_install_request(request: InstallRequest) -> ProtoInstallRequest {
    ProtoInstallRequest {
        current_term: request.current_term.as_u64(),
        leader: request.leader.into_inner(),
        index: request.snapshot.index.as_u64(),
        term: request.snapshot.term.as_u64(),
        version: request.snapshot.version,
        chunk_id: Some(ProtoChunkId {
            offset: request.chunk.chunk_id.offset(),
        }),
        next_chunk_id: request.chunk.next_chunk_id.map(|id| ProtoChunkId { offset: id.offset() }),
        data: request.chunk.data.to_vec(),
        initial: request.chunk.initial,
        complete: request.chunk.complete,
        checksum: request.snapshot.checksum,
    }
}

pub(crate) fn convert_install_request(proto: ProtoInstallRequest) -> Result<InstallRequest, MessageError> {
    let snapshot = SnapshotDescriptor {
        index: required("index", Index::from_u64(proto.index))?,
        term: Term::new(proto.term),
        version: proto.version,
        checksum: proto.checksum,
    };
    let chunk = SnapshotChunk {
        chunk_id: ChunkId::new(required("chunkId", proto.chunk_id)?.offset),
        next_chunk_id: proto.next_chunk_id.map(|id| ChunkId::new(id.offset)),
        data: Bytes::from(proto.data),
        initial: proto.initial,
        complete: proto.complete,
    };

    InstallRequest::new(
        Term::new(proto.current_term),
        convert_member_id("leader", proto.leader)?,
        snapshot,
        chunk,
    )
}

// ------- Membership -------

pub(crate) fn proto_configure_request(request: ConfigureRequest) -> ProtoConfigureRequest {
    ProtoConfigureRequest {
        term: request.term.as_u64(),
        leader: request.leader.into_inner(),
        configuration: Some(proto_configuration(&request.configuration)),
    }
}

pub(crate) fn convert_configure_request(proto: ProtoConfigureRequest) -> Result<ConfigureRequest, MessageError> {
    ConfigureRequest::new(
        Term::new(proto.term),
        convert_member_id("leader", proto.leader)?,
        convert_configuration(required("configuration", proto.configuration)?)?,
    )
}

pub(crate) fn proto_reconfigure_request(request: ReconfigureRequest) -> ProtoReconfigureRequest {
    ProtoReconfigureRequest {
        index: index_as_u64(request.index),
        term: request.term.as_u64(),
        members: proto_members(&request.members),
        from: request.from.into_inner(),
    }
}

pub(crate) fn convert_reconfigure_request(proto: ProtoReconfigureRequest) -> Result<ReconfigureRequest, MessageError> {
    ReconfigureRequest::new(
        Index::from_u64(proto.index),
        Term::new(proto.term),
        convert_members(proto.members)?,
        convert_member_id("from", proto.from)?,
    )
}

pub(crate) fn proto_force_configure_request(request: ForceConfigureRequest) -> ProtoForceConfigureRequest {
    ProtoForceConfigureRequest {
        term: request.term.as_u64(),
        index: index_as_u64(request.index),
        timestamp: request.timestamp,
        new_members: proto_members(&request.new_members),
        from: request.from.into_inner(),
    }
}

pub(crate) fn convert_force_configure_request(
    proto: ProtoForceConfigureRequest,
) -> Result<ForceConfigureRequest, MessageError> {
    ForceConfigureRequest::new(
        Term::new(proto.term),
        Index::from_u64(proto.index),
        proto.timestamp,
        convert_members(proto.new_members)?,
        convert_member_id("from", proto.from)?,
    )
}

pub(crate) fn proto_join_request(request: JoinRequest) -> ProtoJoinRequest {
    ProtoJoinRequest {
        joining_member: Some(proto_member(&request.joining_member)),
    }
}

pub(crate) fn convert_join_request(proto: ProtoJoinRequest) -> Result<JoinRequest, MessageError> {
    Ok(JoinRequest {
        joining_member: convert_member(required("joiningMember", proto.joining_member)?)?,
    })
}

pub(crate) fn proto_leave_request(request: LeaveRequest) -> ProtoLeaveRequest {
    ProtoLeaveRequest {
        leaving_member: Some(proto_member(&request.leaving_member)),
    }
}

pub(crate) fn convert_leave_request(proto: ProtoLeaveRequest) -> Result<LeaveRequest, MessageError> {
    Ok(LeaveRequest {
        leaving_member: convert_member(required("leavingMember", proto.leaving_member)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{Configuration, MemberId, RaftMember};
    use crate::protocol::CURRENT_PROTOCOL_VERSION;

    #[test]
    fn poll_request_rejects_half_log_position() {
        let proto = ProtoPollRequest {
            term: 3,
            candidate: "a".into(),
            last_log_index: 4,
            last_log_term: 0,
        };
        assert!(matches!(
            convert_poll_request(proto),
            Err(MessageError::InconsistentLogPosition(_))
        ));

        let proto = ProtoPollRequest {
            term: 3,
            candidate: String::new(),
            last_log_index: 0,
            last_log_term: 0,
        };
        assert_eq!(convert_poll_request(proto), Err(MessageError::MissingField("candidate")));
    }

    #[test]
    fn versioned_append_keeps_records() {
        let record = ReplicatableRecord::new(Index::new(5), Term::new(2), Bytes::from_static(b"e"));
        let request = VersionedAppendRequest::new(
            CURRENT_PROTOCOL_VERSION,
            Term::new(2),
            MemberId::new("leader"),
            Some((Term::new(1), Index::new(4))),
            Some(Index::new(3)),
            vec![record],
        )
        .unwrap();

        let proto = proto_versioned_append_request(request.clone());
        assert_eq!(proto.prev_log_index, 4);
        assert_eq!(proto.commit_index, 3);
        assert_eq!(convert_versioned_append_request(proto), Ok(request));
    }

    #[test]
    fn append_record_needs_index() {
        let proto = ProtoAppendRequest {
            term: 1,
            leader: "leader".into(),
            entries: vec![ProtoPersistedRecord {
                index: 0,
                term: 1,
                checksum: 0,
                data: vec![],
            }],
            ..Default::default()
        };
        assert_eq!(
            convert_append_request(proto),
            Err(MessageError::MissingField("entries.index"))
        );
    }

    #[test]
    fn install_request_needs_chunk_id() {
        let proto = ProtoInstallRequest {
            current_term: 2,
            leader: "leader".into(),
            index: 10,
            term: 1,
            initial: true,
            complete: true,
            ..Default::default()
        };
        assert_eq!(convert_install_request(proto), Err(MessageError::MissingField("chunkId")));
    }

    #[test]
    fn configure_request_carries_joint_configuration() {
        let configuration = Configuration {
            index: Some(Index::new(7)),
            term: Term::new(2),
            timestamp: 1234,
            new_members: vec![RaftMember::active("a"), RaftMember::active("d")],
            old_members: vec![RaftMember::active("a"), RaftMember::active("b")],
            compaction_bound: Some(Index::new(3)),
            force: false,
        };
        let request = ConfigureRequest::new(Term::new(2), MemberId::new("a"), configuration).unwrap();

        assert_eq!(convert_configure_request(proto_configure_request(request.clone())), Ok(request));
        assert_eq!(
            convert_configure_request(ProtoConfigureRequest {
                term: 2,
                leader: "a".into(),
                configuration: None,
            }),
            Err(MessageError::MissingField("configuration"))
        );
    }
}
