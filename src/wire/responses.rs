use crate::commitlog::{index_as_u64, Index};
use crate::grpc::{
    ProtoAppendResponse, ProtoConfigureResponse, ProtoForceConfigureResponse, ProtoInstallResponse,
    ProtoJoinResponse, ProtoLeaveResponse, ProtoPollResponse, ProtoRaftError, ProtoReconfigureResponse,
    ProtoVoteResponse,
};
use crate::protocol::{
    AppendResponse, ConfigureResponse, ForceConfigureResponse, InstallResponse, JoinResponse, LeaveResponse,
    MessageError, PollResponse, RaftResult, ReconfigureResponse, VoteResponse,
};
use crate::replica::Term;
use crate::wire::common::{convert_error, convert_members, proto_error, proto_members};

// Every response message has an optional `error` field; its presence means status=ERROR and the
// other fields are left at their defaults.

fn split<T>(result: RaftResult<T>) -> (Option<ProtoRaftError>, Option<T>) {
    match result {
        Ok(body) => (None, Some(body)),
        Err(e) => (Some(proto_error(&e)), None),
    }
}

pub(crate) fn proto_poll_response(result: RaftResult<PollResponse>) -> ProtoPollResponse {
    match split(result) {
        (_, Some(body)) => ProtoPollResponse {
            error: None,
            term: body.term.as_u64(),
            accepted: body.accepted,
        },
        (error, None) => ProtoPollResponse {
            error,
            ..Default::default()
        },
    }
}

pub(crate) fn convert_poll_response(proto: ProtoPollResponse) -> Result<RaftResult<PollResponse>, MessageError> {
    if let Some(error) = proto.error {
        return Ok(Err(convert_error(error)));
    }

    Ok(Ok(PollResponse {
        term: Term::new(proto.term),
        accepted: proto.accepted,
    }))
}

pub(crate) fn proto_vote_response(result: RaftResult<VoteResponse>) -> ProtoVoteResponse {
    match split(result) {
        (_, Some(body)) => ProtoVoteResponse {
            error: None,
            term: body.term.as_u64(),
            accepted: body.accepted,
        },
        (error, None) => ProtoVoteResponse {
            error,
            ..Default::default()
        },
    }
}

pub(crate) fn convert_vote_response(proto: ProtoVoteResponse) -> Result<RaftResult<VoteResponse>, MessageError> {
    if let Some(error) = proto.error {
        return Ok(Err(convert_error(error)));
    }

    Ok(Ok(VoteResponse {
        term: Term::new(proto.term),
        accepted: proto.accepted,
    }))
}

pub(crate) fn proto_append_response(result: RaftResult<AppendResponse>) -> ProtoAppendResponse {
    match split(result) {
        (_, Some(body)) => ProtoAppendResponse {
            error: None,
            term: body.term.as_u64(),
            succeeded: body.succeeded,
            last_log_index: index_as_u64(body.last_log_index),
            last_snapshot_index: index_as_u64(body.last_snapshot_index),
            configuration_index: index_as_u64(body.configuration_index),
        },
        (error, None) => ProtoAppendResponse {
            error,
            ..Default::default()
        },
    }
}

pub(crate) fn convert_append_response(
    proto: ProtoAppendResponse,
) -> Result<RaftResult<AppendResponse>, MessageError> {
    if let Some(error) = proto.error {
        return Ok(Err(convert_error(error)));
    }

    Ok(Ok(AppendResponse {
        term: Term::new(proto.term),
        succeeded: proto.succeeded,
        last_log_index: Index::from_u64(proto.last_log_index),
        last_snapshot_index: Index::from_u64(proto.last_snapshot_index),
        configuration_index: Index::from_u64(proto.configuration_index),
    }))
}

pub(crate) fn proto_install_response(result: RaftResult<InstallResponse>) -> ProtoInstallResponse {
    match split(result) {
        (_, Some(body)) => ProtoInstallResponse {
            error: None,
            preferred_chunk_size: body.preferred_chunk_size,
        },
        (error, None) => ProtoInstallResponse {
            error,
            ..Default::default()
        },
    }
}

pub(crate) fn convert_install_response(
    proto: ProtoInstallResponse,
) -> Result<RaftResult<InstallResponse>, MessageError> {
    if let Some(error) = proto.error {
        return Ok(Err(convert_error(error)));
    }

    Ok(Ok(InstallResponse {
        preferred_chunk_size: proto.preferred_chunk_size,
    }))
}

pub(crate) fn proto_configure_response(result: RaftResult<ConfigureResponse>) -> ProtoConfigureResponse {
    match split(result) {
        (_, Some(body)) => ProtoConfigureResponse {
            error: None,
            term: body.term.as_u64(),
        },
        (error, None) => ProtoConfigureResponse {
            error,
            ..Default::default()
        },
    }
}

pub(crate) fn convert_configure_response(
    proto: ProtoConfigureResponse,
) -> Result<RaftResult<ConfigureResponse>, MessageError> {
    if let Some(error) = proto.error {
        return Ok(Err(convert_error(error)));
    }

    Ok(Ok(ConfigureResponse {
        term: Term::new(proto.term),
    }))
}

pub(crate) fn proto_reconfigure_response(result: RaftResult<ReconfigureResponse>) -> ProtoReconfigureResponse {
    match split(result) {
        (_, Some(body)) => ProtoReconfigureResponse {
            error: None,
            index: index_as_u64(body.index),
            term: body.term.as_u64(),
            timestamp: body.timestamp,
            members: proto_members(&body.members),
        },
        (error, None) => ProtoReconfigureResponse {
            error,
            ..Default::default()
        },
    }
}

pub(crate) fn convert_reconfigure_response(
    proto: ProtoReconfigureResponse,
) -> Result<RaftResult<ReconfigureResponse>, MessageError> {
    if let Some(error) = proto.error {
        return Ok(Err(convert_error(error)));
    }

    Ok(Ok(ReconfigureResponse {
        index: Index::from_u64(proto.index),
        term: Term::new(proto.term),
        timestamp: proto.timestamp,
        members: convert_members(proto.members)?,
    }))
}

pub(crate) fn proto_force_configure_response(
    result: RaftResult<ForceConfigureResponse>,
) -> ProtoForceConfigureResponse {
    match split(result) {
        (_, Some(body)) => ProtoForceConfigureResponse {
            error: None,
            index: index_as_u64(body.index),
            term: body.term.as_u64(),
        },
        (error, None) => ProtoForceConfigureResponse {
            error,
            ..Default::default()
        },
    }
}

pub(crate) fn convert_force_configure_response(
    proto: ProtoForceConfigureResponse,
) -> Result<RaftResult<ForceConfigureResponse>, MessageError> {
    if let Some(error) = proto.error {
        return Ok(Err(convert_error(error)));
    }

    Ok(Ok(ForceConfigureResponse {
        index: Index::from_u64(proto.index),
        term: Term::new(proto.term),
    }))
}

pub(crate) fn proto_join_response(result: RaftResult<JoinResponse>) -> ProtoJoinResponse {
    ProtoJoinResponse { error: split(result).0 }
}

pub(crate) fn convert_join_response(proto: ProtoJoinResponse) -> Result<RaftResult<JoinResponse>, MessageError> {
    Ok(match proto.error {
        Some(error) => Err(convert_error(error)),
        None => Ok(JoinResponse),
    })
}

pub(crate) fn proto_leave_response(result: RaftResult<LeaveResponse>) -> ProtoLeaveResponse {
    ProtoLeaveResponse { error: split(result).0 }
}

pub(crate) fn convert_leave_response(proto: ProtoLeaveResponse) -> Result<RaftResult<LeaveResponse>, MessageError> {
    Ok(match proto.error {
        Some(error) => Err(convert_error(error)),
        None => Ok(LeaveResponse),
    })
}
