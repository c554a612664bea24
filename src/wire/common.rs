use crate::commitlog::{index_as_u64, Index};
use crate::grpc::{ProtoConfiguration, ProtoErrorKind, ProtoMember, ProtoMemberType, ProtoRaftError};
use crate::membership::{Configuration, MemberId, MemberType, RaftMember};
use crate::protocol::{MessageError, RaftError, RaftErrorKind};
use crate::replica::Term;

pub(crate) fn required<T>(field: &'static str, value: Option<T>) -> Result<T, MessageError> {
    value.ok_or(MessageError::MissingField(field))
}

pub(crate) fn convert_member_id(field: &'static str, member_id: String) -> Result<MemberId, MessageError> {
    if member_id.is_empty() {
        return Err(MessageError::MissingField(field));
    }

    Ok(MemberId::new(member_id))
}

/// (term, index) as sent on the wire, where (0, 0) is "no entry".
pub(crate) fn log_position(entry: Option<(Term, Index)>) -> (u64, u64) {
    match entry {
        None => (0, 0),
        Some((term, index)) => (term.as_u64(), index.as_u64()),
    }
}

pub(crate) fn proto_member(member: &RaftMember) -> ProtoMember {
    let member_type = match member.member_type() {
        MemberType::Active => ProtoMemberType::Active,
        MemberType::Promotable => ProtoMemberType::Promotable,
        MemberType::Passive => ProtoMemberType::Passive,
    };

    ProtoMember {
        member_id: member.id().as_str().to_string(),
        member_type: member_type as i32,
    }
}

pub(crate) fn proto_members(members: &[RaftMember]) -> Vec<ProtoMember> {
    members.iter().map(proto_member).collect()
}

pub(crate) fn convert_member(proto: ProtoMember) -> Result<RaftMember, MessageError> {
    let member_type = match ProtoMemberType::from_i32(proto.member_type) {
        Some(ProtoMemberType::Active) => MemberType::Active,
        Some(ProtoMemberType::Promotable) => MemberType::Promotable,
        Some(ProtoMemberType::Passive) => MemberType::Passive,
        None => {
            return Err(MessageError::InvalidField {
                field: "memberType",
                reason: format!("unknown member type {}", proto.member_type),
            })
        }
    };

    Ok(RaftMember::new(convert_member_id("memberId", proto.member_id)?, member_type))
}

pub(crate) fn convert_members(protos: Vec<ProtoMember>) -> Result<Vec<RaftMember>, MessageError> {
    protos.into_iter().map(convert_member).collect()
}

pub(crate) fn proto_configuration(configuration: &Configuration) -> ProtoConfiguration {
    ProtoConfiguration {
        index: index_as_u64(configuration.index),
        term: configuration.term.as_u64(),
        timestamp: configuration.timestamp,
        new_members: proto_members(&configuration.new_members),
        old_members: proto_members(&configuration.old_members),
        compaction_bound: index_as_u64(configuration.compaction_bound),
        force: configuration.force,
    }
}

pub(crate) fn convert_configuration(proto: ProtoConfiguration) -> Result<Configuration, MessageError> {
    Ok(Configuration {
        index: Index::from_u64(proto.index),
        term: Term::new(proto.term),
        timestamp: proto.timestamp,
        new_members: convert_members(proto.new_members)?,
        old_members: convert_members(proto.old_members)?,
        compaction_bound: Index::from_u64(proto.compaction_bound),
        force: proto.force,
    })
}

pub(crate) fn proto_error(error: &RaftError) -> ProtoRaftError {
    let kind = match error.kind {
        RaftErrorKind::NoLeader => ProtoErrorKind::NoLeader,
        RaftErrorKind::IllegalMemberState => ProtoErrorKind::IllegalMemberState,
        RaftErrorKind::ConfigurationError => ProtoErrorKind::ConfigurationError,
        RaftErrorKind::ProtocolError => ProtoErrorKind::ProtocolError,
        RaftErrorKind::ApplicationError => ProtoErrorKind::ApplicationError,
    };

    ProtoRaftError {
        kind: kind as i32,
        message: error.message.clone(),
        term: error.term.map(|t| t.as_u64()).unwrap_or(0),
    }
}

pub(crate) fn convert_error(proto: ProtoRaftError) -> RaftError {
    let kind = match ProtoErrorKind::from_i32(proto.kind) {
        Some(ProtoErrorKind::NoLeader) => RaftErrorKind::NoLeader,
        Some(ProtoErrorKind::IllegalMemberState) => RaftErrorKind::IllegalMemberState,
        Some(ProtoErrorKind::ConfigurationError) => RaftErrorKind::ConfigurationError,
        Some(ProtoErrorKind::ProtocolError) => RaftErrorKind::ProtocolError,
        Some(ProtoErrorKind::ApplicationError) => RaftErrorKind::ApplicationError,
        // A newer peer may send kinds we don't know about.
        Some(ProtoErrorKind::Unknown) | None => RaftErrorKind::ProtocolError,
    };

    RaftError {
        kind,
        message: proto.message,
        term: match proto.term {
            0 => None,
            term => Some(Term::new(term)),
        },
    }
}
