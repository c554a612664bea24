use crate::commitlog::Index;
use crate::membership::{JointQuorum, MemberId, RaftMember};
use crate::replica::Term;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Configuration is one version of the cluster membership. `old_members` is non-empty only while
/// a joint-consensus change is in flight.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Configuration {
    // Index of the log entry that introduced this configuration. None for the bootstrap
    // configuration, which isn't in the log.
    pub(crate) index: Option<Index>,
    pub(crate) term: Term,
    // Millis since unix epoch.
    pub(crate) timestamp: i64,
    pub(crate) new_members: Vec<RaftMember>,
    pub(crate) old_members: Vec<RaftMember>,
    // Lowest index that members must keep in their log until the bound is raised.
    pub(crate) compaction_bound: Option<Index>,
    // Set for configurations installed by ForceConfigure, until a leader replaces it.
    pub(crate) force: bool,
}

impl Configuration {
    pub(crate) fn bootstrap(members: Vec<RaftMember>) -> Self {
        Configuration {
            index: None,
            term: Term::new(0),
            timestamp: 0,
            new_members: members,
            old_members: vec![],
            compaction_bound: None,
            force: false,
        }
    }

    pub(crate) fn is_joint(&self) -> bool {
        !self.old_members.is_empty()
    }

    pub(crate) fn quorum(&self) -> JointQuorum {
        JointQuorum::new(&self.new_members, &self.old_members)
    }

    /// Looks up a member, preferring its entry in the new member set.
    pub(crate) fn member(&self, member_id: &MemberId) -> Option<&RaftMember> {
        self.new_members
            .iter()
            .chain(self.old_members.iter())
            .find(|m| m.id() == member_id)
    }

    /// Every member of either set.
    pub(crate) fn member_ids(&self) -> HashSet<MemberId> {
        self.new_members
            .iter()
            .chain(self.old_members.iter())
            .map(|m| m.id().clone())
            .collect()
    }

    /// Configurations order by term first, then index. A forced configuration installed out of
    /// band is superseded by the next leader's configuration, which always has a higher term.
    pub(crate) fn is_newer_than(&self, other: &Configuration) -> bool {
        match self.term.cmp(&other.term) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => self.index > other.index,
        }
    }
}

/// Membership equality ignores ordering.
pub(crate) fn same_members(a: &[RaftMember], b: &[RaftMember]) -> bool {
    let a: HashSet<&RaftMember> = a.iter().collect();
    let b: HashSet<&RaftMember> = b.iter().collect();
    a == b
}
