use crate::commitlog::Index;
use crate::membership::{Configuration, JointQuorum, MemberId, MemberType};

/// What the local member is, according to the current configuration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum LocalMembership {
    Member(MemberType),
    NotAMember,
}

/// ClusterMembership tracks the configuration this replica currently acts on, and whether that
/// configuration is known to be committed.
pub(crate) struct ClusterMembership {
    my_member_id: MemberId,
    configuration: Configuration,
    committed: bool,
    // What to fall back on when log truncation takes the current configuration away.
    last_committed: Configuration,
}

impl ClusterMembership {
    pub(crate) fn new(my_member_id: MemberId, configuration: Configuration) -> Self {
        ClusterMembership {
            my_member_id,
            // A bootstrap or previously persisted configuration is treated as committed.
            last_committed: configuration.clone(),
            configuration,
            committed: true,
        }
    }

    pub(crate) fn my_member_id(&self) -> &MemberId {
        &self.my_member_id
    }

    pub(crate) fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    pub(crate) fn is_committed(&self) -> bool {
        self.committed
    }

    pub(crate) fn quorum(&self) -> JointQuorum {
        self.configuration.quorum()
    }

    pub(crate) fn local_membership(&self) -> LocalMembership {
        match self.configuration.member(&self.my_member_id) {
            Some(member) => LocalMembership::Member(member.member_type()),
            None => LocalMembership::NotAMember,
        }
    }

    /// Every member except me, from both the new and old sets.
    pub(crate) fn remote_member_ids(&self) -> Vec<MemberId> {
        let mut ids: Vec<MemberId> = self
            .configuration
            .member_ids()
            .into_iter()
            .filter(|id| id != &self.my_member_id)
            .collect();
        ids.sort();
        ids
    }

    /// Installs `configuration` if it's newer than the current one. Returns true iff installed.
    pub(crate) fn configure(&mut self, configuration: Configuration) -> bool {
        if !configuration.is_newer_than(&self.configuration) {
            return false;
        }

        self.configuration = configuration;
        self.committed = false;
        true
    }

    /// Installs a configuration that is committed on arrival (ForceConfigure).
    pub(crate) fn configure_committed(&mut self, configuration: Configuration) {
        self.last_committed = configuration.clone();
        self.configuration = configuration;
        self.committed = true;
    }

    /// Marks the current configuration committed once `commit_index` reaches it. Returns true
    /// iff this call changed the committed flag.
    pub(crate) fn commit_if_reached(&mut self, commit_index: Option<Index>) -> bool {
        if self.committed || commit_index < self.configuration.index {
            return false;
        }

        self.committed = true;
        self.last_committed = self.configuration.clone();
        true
    }

    pub(crate) fn last_committed_index(&self) -> Option<Index> {
        self.last_committed.index
    }

    /// Replaces a configuration whose entry was truncated. `found` is the latest configuration
    /// still in the log, if any. It only wins over the last committed one if it's newer.
    pub(crate) fn revert(&mut self, found: Option<Configuration>, commit_index: Option<Index>) {
        let configuration = match found {
            Some(found) if found.is_newer_than(&self.last_committed) => found,
            _ => self.last_committed.clone(),
        };

        self.committed = configuration.index <= commit_index;
        if self.committed {
            self.last_committed = configuration.clone();
        }
        self.configuration = configuration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::RaftMember;
    use crate::replica::Term;

    fn cluster() -> ClusterMembership {
        ClusterMembership::new(
            MemberId::new("a"),
            Configuration::bootstrap(vec![RaftMember::active("a"), RaftMember::active("b")]),
        )
    }

    fn next_config(index: u64, members: Vec<RaftMember>) -> Configuration {
        Configuration {
            index: Index::from_u64(index),
            term: Term::new(1),
            timestamp: 1,
            new_members: members,
            old_members: vec![],
            compaction_bound: None,
            force: false,
        }
    }

    #[test]
    fn configure_and_commit() {
        let mut cluster = cluster();
        assert!(cluster.is_committed());
        assert_eq!(cluster.local_membership(), LocalMembership::Member(MemberType::Active));

        let members = vec![RaftMember::active("b"), RaftMember::active("c")];
        assert!(cluster.configure(next_config(5, members)));
        assert!(!cluster.is_committed());
        assert_eq!(cluster.local_membership(), LocalMembership::NotAMember);
        assert_eq!(cluster.remote_member_ids(), vec![MemberId::new("b"), MemberId::new("c")]);

        assert!(!cluster.commit_if_reached(Index::from_u64(4)));
        assert!(cluster.commit_if_reached(Index::from_u64(5)));
        assert!(!cluster.commit_if_reached(Index::from_u64(6)));
        assert!(cluster.is_committed());
    }

    #[test]
    fn stale_configuration_is_ignored() {
        let mut cluster = cluster();
        assert!(cluster.configure(next_config(5, vec![RaftMember::active("a")])));
        assert!(!cluster.configure(next_config(3, vec![RaftMember::active("z")])));
        assert!(!cluster.configure(next_config(5, vec![RaftMember::active("z")])));

        assert_eq!(cluster.configuration().index, Index::from_u64(5));
    }

    #[test]
    fn revert_falls_back_to_last_committed() {
        let mut cluster = cluster();
        let bootstrap = cluster.configuration().clone();
        let two = vec![RaftMember::active("a"), RaftMember::active("c")];
        let three = vec![RaftMember::active("a"), RaftMember::active("d")];

        assert!(cluster.configure(next_config(3, two.clone())));
        assert!(cluster.configure(next_config(6, three)));
        cluster.revert(None, Index::from_u64(2));
        assert_eq!(cluster.configuration(), &bootstrap);
        assert!(cluster.is_committed());

        // A configuration still in the log takes precedence, committed or not.
        assert!(cluster.configure(next_config(6, two.clone())));
        cluster.revert(Some(next_config(3, two.clone())), Index::from_u64(2));
        assert_eq!(cluster.configuration().index, Index::from_u64(3));
        assert!(!cluster.is_committed());

        cluster.revert(Some(next_config(3, two)), Index::from_u64(4));
        assert!(cluster.is_committed());
        assert_eq!(cluster.last_committed_index(), Index::from_u64(3));

        // Nothing older than the last committed configuration comes back.
        cluster.revert(Some(next_config(1, vec![RaftMember::active("z")])), Index::from_u64(4));
        assert_eq!(cluster.configuration().index, Index::from_u64(3));
    }
}
