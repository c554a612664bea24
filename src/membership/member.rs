use std::fmt;

/// MemberId identifies a raft member across the cluster.
#[derive(Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) struct MemberId(String);

impl MemberId {
    pub(crate) fn new(member_id: impl Into<String>) -> Self {
        MemberId(member_id.into())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) enum MemberType {
    /// Full voting member.
    Active,
    /// Learner that is expected to be promoted to Active.
    Promotable,
    /// Learner that only ever receives committed entries.
    Passive,
}

impl MemberType {
    pub(crate) fn is_voting(&self) -> bool {
        matches!(self, MemberType::Active)
    }
}

/// Two RaftMembers are equal iff both id and type match.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct RaftMember {
    id: MemberId,
    member_type: MemberType,
}

impl RaftMember {
    pub(crate) fn new(id: MemberId, member_type: MemberType) -> Self {
        RaftMember { id, member_type }
    }

    pub(crate) fn active(id: impl Into<String>) -> Self {
        Self::new(MemberId::new(id), MemberType::Active)
    }

    pub(crate) fn id(&self) -> &MemberId {
        &self.id
    }

    pub(crate) fn member_type(&self) -> MemberType {
        self.member_type
    }
}
