use crate::commitlog::{index_as_u64, Index};
use crate::membership::{Configuration, MemberId, MemberType, RaftMember};
use crate::protocol::{RaftError, RaftErrorKind};
use crate::replica;
use crate::replica::Term;

/// Identifies an entry in the replicated log.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RaftEntryId {
    pub(crate) term: Term,
    pub(crate) entry_index: Index,
}

impl RaftEntryId {
    pub fn term(&self) -> u64 {
        self.term.as_u64()
    }

    pub fn index(&self) -> u64 {
        self.entry_index.as_u64()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RaftMemberType {
    /// Votes, and may become leader.
    Active,
    /// Receives entries like a follower without voting. Can be promoted to active later.
    Promotable,
    /// Only receives committed entries.
    Passive,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RaftMemberInfo {
    pub member_id: String,
    pub member_type: RaftMemberType,
}

impl RaftMemberInfo {
    pub fn active(member_id: impl Into<String>) -> Self {
        RaftMemberInfo {
            member_id: member_id.into(),
            member_type: RaftMemberType::Active,
        }
    }

    pub fn new(member_id: impl Into<String>, member_type: RaftMemberType) -> Self {
        RaftMemberInfo {
            member_id: member_id.into(),
            member_type,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RaftLeaderInfo {
    pub member_id: String,
}

/// One version of the cluster's membership.
#[derive(Clone, Debug, PartialEq)]
pub struct RaftConfiguration {
    /// Log index that introduced this configuration. None for the bootstrap configuration.
    pub index: Option<u64>,
    pub term: u64,
    pub timestamp: i64,
    pub members: Vec<RaftMemberInfo>,
    /// Non-empty while a membership change is halfway done.
    pub old_members: Vec<RaftMemberInfo>,
    pub compaction_bound: Option<u64>,
    pub forced: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RaftClusterInfo {
    pub term: u64,
    pub leader: Option<RaftLeaderInfo>,
    pub configuration: RaftConfiguration,
    pub configuration_committed: bool,
    pub commit_index: Option<u64>,
}

/// A raft request that was answered with an error.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct RaftRequestError {
    pub kind: RaftRequestErrorKind,
    pub message: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RaftRequestErrorKind {
    NoLeader,
    IllegalMemberState,
    Configuration,
    Protocol,
    Application,
}

// ------- Conversions --------

impl From<RaftMemberType> for MemberType {
    fn from(member_type: RaftMemberType) -> Self {
        match member_type {
            RaftMemberType::Active => MemberType::Active,
            RaftMemberType::Promotable => MemberType::Promotable,
            RaftMemberType::Passive => MemberType::Passive,
        }
    }
}

impl From<MemberType> for RaftMemberType {
    fn from(member_type: MemberType) -> Self {
        match member_type {
            MemberType::Active => RaftMemberType::Active,
            MemberType::Promotable => RaftMemberType::Promotable,
            MemberType::Passive => RaftMemberType::Passive,
        }
    }
}

impl From<RaftMemberInfo> for RaftMember {
    fn from(member_info: RaftMemberInfo) -> Self {
        RaftMember::new(MemberId::new(member_info.member_id), member_info.member_type.into())
    }
}

impl From<&RaftMember> for RaftMemberInfo {
    fn from(member: &RaftMember) -> Self {
        RaftMemberInfo {
            member_id: member.id().to_string(),
            member_type: member.member_type().into(),
        }
    }
}

impl From<MemberId> for RaftLeaderInfo {
    fn from(member_id: MemberId) -> Self {
        RaftLeaderInfo {
            member_id: member_id.into_inner(),
        }
    }
}

impl From<&Configuration> for RaftConfiguration {
    fn from(configuration: &Configuration) -> Self {
        RaftConfiguration {
            index: configuration.index.map(|i| i.as_u64()),
            term: configuration.term.as_u64(),
            timestamp: configuration.timestamp,
            members: configuration.new_members.iter().map(RaftMemberInfo::from).collect(),
            old_members: configuration.old_members.iter().map(RaftMemberInfo::from).collect(),
            compaction_bound: configuration.compaction_bound.map(|i| i.as_u64()),
            forced: configuration.force,
        }
    }
}

impl From<replica::ClusterInfo> for RaftClusterInfo {
    fn from(info: replica::ClusterInfo) -> Self {
        RaftClusterInfo {
            term: info.term.as_u64(),
            leader: info.leader.map(RaftLeaderInfo::from),
            configuration: RaftConfiguration::from(&info.configuration),
            configuration_committed: info.configuration_committed,
            commit_index: match index_as_u64(info.commit_index) {
                0 => None,
                index => Some(index),
            },
        }
    }
}

impl From<RaftError> for RaftRequestError {
    fn from(error: RaftError) -> Self {
        let kind = match error.kind {
            RaftErrorKind::NoLeader => RaftRequestErrorKind::NoLeader,
            RaftErrorKind::IllegalMemberState => RaftRequestErrorKind::IllegalMemberState,
            RaftErrorKind::ConfigurationError => RaftRequestErrorKind::Configuration,
            RaftErrorKind::ProtocolError => RaftRequestErrorKind::Protocol,
            RaftErrorKind::ApplicationError => RaftRequestErrorKind::Application,
        };
        RaftRequestError {
            kind,
            message: error.message,
        }
    }
}
