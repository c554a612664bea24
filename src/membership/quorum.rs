use crate::commitlog::Index;
use crate::membership::{MemberId, RaftMember};
use std::collections::{HashMap, HashSet};

/// JointQuorum answers "do we have a majority" for the currently effective configuration. While a
/// configuration change is in flight, it requires a majority of both the old and new voter sets.
#[derive(Clone, Debug)]
pub(crate) struct JointQuorum {
    new_voters: HashSet<MemberId>,
    old_voters: HashSet<MemberId>,
}

impl JointQuorum {
    pub(crate) fn new(new_members: &[RaftMember], old_members: &[RaftMember]) -> Self {
        JointQuorum {
            new_voters: Self::voters_of(new_members),
            old_voters: Self::voters_of(old_members),
        }
    }

    fn voters_of(members: &[RaftMember]) -> HashSet<MemberId> {
        members
            .iter()
            .filter(|m| m.member_type().is_voting())
            .map(|m| m.id().clone())
            .collect()
    }

    pub(crate) fn is_joint(&self) -> bool {
        !self.old_voters.is_empty()
    }

    pub(crate) fn is_voter(&self, member_id: &MemberId) -> bool {
        self.new_voters.contains(member_id) || self.old_voters.contains(member_id)
    }

    pub(crate) fn voters(&self) -> HashSet<MemberId> {
        self.new_voters.union(&self.old_voters).cloned().collect()
    }

    pub(crate) fn has_majority(&self, acks: &HashSet<MemberId>) -> bool {
        let new_majority = Self::set_has_majority(&self.new_voters, acks);
        if self.is_joint() {
            new_majority && Self::set_has_majority(&self.old_voters, acks)
        } else {
            new_majority
        }
    }

    fn set_has_majority(voters: &HashSet<MemberId>, acks: &HashSet<MemberId>) -> bool {
        if voters.is_empty() {
            return false;
        }
        let num_acks = voters.intersection(acks).count();
        num_acks >= Self::majority(voters.len())
    }

    fn majority(num_voters: usize) -> usize {
        (num_voters / 2) + 1
    }

    /// Returns the highest index that a majority of each voter set has matched. Members missing
    /// from `matched` count as having matched nothing.
    pub(crate) fn committed_index(&self, matched: &HashMap<MemberId, Option<Index>>) -> Option<Index> {
        let new_value = Self::set_quorum_value(&self.new_voters, matched);
        if self.is_joint() {
            let old_value = Self::set_quorum_value(&self.old_voters, matched);
            std::cmp::min(new_value, old_value)
        } else {
            new_value
        }
    }

    fn set_quorum_value(voters: &HashSet<MemberId>, matched: &HashMap<MemberId, Option<Index>>) -> Option<Index> {
        let mut values: Vec<Option<Index>> = voters
            .iter()
            .map(|member_id| matched.get(member_id).copied().flatten())
            .collect();
        // Highest first. The value at position n/2 is held by a majority of the n voters.
        values.sort_unstable_by(|a, b| b.cmp(a));
        values.get(voters.len() / 2).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::MemberType;

    fn members(ids: &[&str]) -> Vec<RaftMember> {
        ids.iter().map(|id| RaftMember::active(*id)).collect()
    }

    fn acks(ids: &[&str]) -> HashSet<MemberId> {
        ids.iter().map(|id| MemberId::new(*id)).collect()
    }

    fn matched(values: &[(&str, u64)]) -> HashMap<MemberId, Option<Index>> {
        values
            .iter()
            .map(|(id, v)| (MemberId::new(*id), Index::from_u64(*v)))
            .collect()
    }

    #[test]
    fn simple_majority() {
        let quorum = JointQuorum::new(&members(&["a", "b", "c"]), &[]);

        assert!(!quorum.has_majority(&acks(&["a"])));
        assert!(quorum.has_majority(&acks(&["a", "c"])));
        // Unknown members don't count.
        assert!(!quorum.has_majority(&acks(&["a", "x", "y"])));
    }

    #[test]
    fn joint_majority_needs_both_sets() {
        // old={A,B,C}, new={A,B,D}
        let quorum = JointQuorum::new(&members(&["a", "b", "d"]), &members(&["a", "b", "c"]));

        // 2 of 4 distinct members, and 2/3 of new, but only 1/3 of old.
        assert!(!quorum.has_majority(&acks(&["a", "d"])));
        // 2/3 of old, but only 1/3 of new.
        assert!(!quorum.has_majority(&acks(&["b", "c"])));
        // 2/3 of both.
        assert!(quorum.has_majority(&acks(&["a", "b"])));
        assert!(quorum.has_majority(&acks(&["a", "c", "d"])));
    }

    #[test]
    fn learners_are_not_voters() {
        let new_members = vec![
            RaftMember::active("a"),
            RaftMember::new(MemberId::new("p"), MemberType::Passive),
            RaftMember::new(MemberId::new("q"), MemberType::Promotable),
        ];
        let quorum = JointQuorum::new(&new_members, &[]);

        assert!(quorum.is_voter(&MemberId::new("a")));
        assert!(!quorum.is_voter(&MemberId::new("p")));
        assert!(quorum.has_majority(&acks(&["a"])));
        assert!(!quorum.has_majority(&acks(&["p", "q"])));
    }

    #[test]
    fn committed_index_single_set() {
        let quorum = JointQuorum::new(&members(&["a", "b", "c"]), &[]);

        assert_eq!(quorum.committed_index(&matched(&[("a", 9), ("b", 0), ("c", 0)])), None);
        assert_eq!(
            quorum.committed_index(&matched(&[("a", 9), ("b", 8), ("c", 0)])),
            Some(Index::new(8))
        );
        // Missing member counts as nothing matched.
        assert_eq!(quorum.committed_index(&matched(&[("a", 9), ("b", 7)])), Some(Index::new(7)));

        let quorum = JointQuorum::new(&members(&["a", "b", "c", "d"]), &[]);
        assert_eq!(
            quorum.committed_index(&matched(&[("a", 9), ("b", 8), ("c", 0), ("d", 0)])),
            None
        );
        assert_eq!(
            quorum.committed_index(&matched(&[("a", 9), ("b", 8), ("c", 7), ("d", 0)])),
            Some(Index::new(7))
        );
    }

    #[test]
    fn committed_index_joint_takes_minimum_of_sets() {
        // old={A,B,C}, new={A,B,D}
        let quorum = JointQuorum::new(&members(&["a", "b", "d"]), &members(&["a", "b", "c"]));

        // new set quorum value is 9 (a, d), old set quorum value is 5 (a, c).
        let m = matched(&[("a", 9), ("b", 1), ("c", 5), ("d", 9)]);
        assert_eq!(quorum.committed_index(&m), Some(Index::new(5)));
    }
}
