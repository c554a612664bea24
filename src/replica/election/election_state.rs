use crate::actor::WeakActorClient;
use crate::commitlog::Index;
use crate::membership::{LocalMembership, MemberId, MemberType};
use crate::replica::election::state_change_listener::{self, ElectionStateChangeNotifier};
use crate::replica::election::timers::{FollowerTimerHandle, LeaderTimerHandle};
use crate::replica::election::{ElectionStateChangeListener, ElectionStateSnapshot, LeaderStateTracker, PeerState};
use crate::replica::Term;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Clone)]
pub(crate) struct ElectionConfig {
    pub my_member_id: MemberId,
    pub leader_heartbeat_duration: Duration,
    pub follower_min_timeout: Duration,
    pub follower_max_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CurrentLeader {
    Me,
    Other(MemberId),
    Unknown,
}

/// ElectionState is responsible for holding state specific to the role this replica plays. Its
/// methods are responsible for "what" to do. It is NOT responsible for validating anything
/// specific to logs, terms, configurations, etc. or knowing "when" to do something.
pub(crate) struct ElectionState {
    state: State,
    config: ElectionConfig,
    actor_client: WeakActorClient,
    state_change_notifier: ElectionStateChangeNotifier,
}

impl ElectionState {
    /// Starts in the role `membership` implies, with no known leader.
    pub(crate) fn new(
        config: ElectionConfig,
        actor_client: WeakActorClient,
        membership: LocalMembership,
        term: Term,
    ) -> (Self, ElectionStateChangeListener) {
        let (state_change_notifier, listener) = state_change_listener::new(ElectionStateSnapshot::Inactive);
        let mut election_state = ElectionState {
            state: State::Inactive,
            config,
            actor_client,
            state_change_notifier,
        };
        election_state.transition_to_member_role(membership, term, None);

        (election_state, listener)
    }

    /// Follower, passive or inactive, depending on what the configuration says we are.
    pub(crate) fn transition_to_member_role(
        &mut self,
        membership: LocalMembership,
        term: Term,
        leader: Option<MemberId>,
    ) {
        match membership {
            LocalMembership::Member(MemberType::Active) => self.transition_to_follower(term, leader),
            LocalMembership::Member(member_type) => self.transition_to_passive(member_type, leader),
            LocalMembership::NotAMember => self.transition_to_inactive(),
        }
    }

    pub(crate) fn transition_to_follower(&mut self, term: Term, leader: Option<MemberId>) {
        self.state = State::Follower(FollowerState {
            leader,
            poll_round: None,
            follower_timeout_tracker: FollowerTimerHandle::spawn_timer_task(
                self.config.follower_min_timeout,
                self.config.follower_max_timeout,
                self.actor_client.clone(),
                term,
            ),
        });
        self.notify_new_state();
    }

    fn transition_to_passive(&mut self, member_type: MemberType, leader: Option<MemberId>) {
        self.state = State::Passive(PassiveState { member_type, leader });
        self.notify_new_state();
    }

    pub(crate) fn transition_to_inactive(&mut self) {
        self.state = State::Inactive;
        self.notify_new_state();
    }

    pub(crate) fn transition_to_candidate_and_vote_for_self(&mut self, term: Term) {
        let mut received_votes_from = HashSet::new();
        received_votes_from.insert(self.config.my_member_id.clone());

        self.state = State::Candidate(CandidateState {
            term,
            received_votes_from,
            _election_timeout_tracker: FollowerTimerHandle::spawn_timer_task(
                self.config.follower_min_timeout,
                self.config.follower_max_timeout,
                self.actor_client.clone(),
                term,
            ),
        });
        self.notify_new_state();
    }

    /// `initial_entry_index` is the no-op entry just appended for this term. Every peer starts
    /// replication from it.
    pub(crate) fn transition_to_leader(&mut self, term: Term, peer_ids: Vec<MemberId>, initial_entry_index: Index) {
        let now = Instant::now();
        let peer_state: HashMap<MemberId, PeerState> = peer_ids
            .into_iter()
            .map(|peer_id| {
                let state = self.new_peer_state(peer_id.clone(), term, initial_entry_index, now);
                (peer_id, state)
            })
            .collect();

        self.state = State::Leader(LeaderState {
            term,
            tracker: LeaderStateTracker::new(peer_state, initial_entry_index),
        });
        self.notify_new_state();
    }

    fn new_peer_state(&self, peer_id: MemberId, term: Term, next: Index, now: Instant) -> PeerState {
        let timer = LeaderTimerHandle::spawn_timer_task(
            self.config.leader_heartbeat_duration,
            self.actor_client.clone(),
            peer_id,
            term,
        );
        PeerState::new(timer, next, now)
    }

    /// Leader only. Start tracking new members, stop tracking removed ones. New peers start from
    /// `next`.
    pub(crate) fn sync_leader_peers(&mut self, peer_ids: Vec<MemberId>, next: Index) {
        let term = match &self.state {
            State::Leader(ls) => ls.term,
            _ => return,
        };

        let keep: HashSet<MemberId> = peer_ids.iter().cloned().collect();
        let now = Instant::now();
        let mut new_peers = Vec::new();
        if let State::Leader(ls) = &self.state {
            for peer_id in peer_ids {
                if ls.tracker.peer_state(&peer_id).is_none() {
                    new_peers.push(peer_id);
                }
            }
        }
        let new_states: Vec<(MemberId, PeerState)> = new_peers
            .into_iter()
            .map(|peer_id| {
                let state = self.new_peer_state(peer_id.clone(), term, next, now);
                (peer_id, state)
            })
            .collect();

        if let State::Leader(ls) = &mut self.state {
            ls.tracker.retain_peers(&keep);
            for (peer_id, state) in new_states {
                ls.tracker.insert_peer(peer_id, state);
            }
        }
    }

    pub(crate) fn current_state(&self) -> ElectionStateSnapshot {
        match &self.state {
            State::Leader(ls) => ElectionStateSnapshot::Leader(ls.term),
            State::Candidate(cs) => ElectionStateSnapshot::Candidate(cs.term),
            State::Follower(fs) => ElectionStateSnapshot::Follower(fs.leader.clone()),
            State::Passive(PassiveState {
                member_type: MemberType::Promotable,
                leader,
            }) => ElectionStateSnapshot::Promotable(leader.clone()),
            State::Passive(ps) => ElectionStateSnapshot::Passive(ps.leader.clone()),
            State::Inactive => ElectionStateSnapshot::Inactive,
        }
    }

    fn notify_new_state(&self) {
        self.state_change_notifier.notify_new_state(self.current_state());
    }

    pub(crate) fn current_leader(&self) -> CurrentLeader {
        let leader = match &self.state {
            State::Leader(_) => return CurrentLeader::Me,
            State::Follower(fs) => &fs.leader,
            State::Passive(ps) => &ps.leader,
            State::Candidate(_) | State::Inactive => &None,
        };

        match leader {
            Some(leader) => CurrentLeader::Other(leader.clone()),
            None => CurrentLeader::Unknown,
        }
    }

    pub(crate) fn is_leader(&self) -> bool {
        matches!(self.state, State::Leader(_))
    }

    pub(crate) fn is_candidate(&self) -> bool {
        matches!(self.state, State::Candidate(_))
    }

    pub(crate) fn is_follower(&self) -> bool {
        matches!(self.state, State::Follower(_))
    }

    pub(crate) fn is_inactive(&self) -> bool {
        matches!(self.state, State::Inactive)
    }

    pub(crate) fn reset_timeout_if_follower(&self) {
        if let State::Follower(fs) = &self.state {
            fs.follower_timeout_tracker.reset_timeout();
        }
    }

    /// Followers and passive members learn who leads from the leader's requests.
    pub(crate) fn set_leader_if_unknown(&mut self, leader: &MemberId) {
        let slot = match &mut self.state {
            State::Follower(fs) => &mut fs.leader,
            State::Passive(ps) => &mut ps.leader,
            _ => return,
        };
        if slot.is_none() {
            slot.replace(leader.clone());
            self.notify_new_state();
        }
    }

    /// Follower only. Starts a new poll round in which we've already accepted ourselves.
    /// Returns false if not a follower.
    pub(crate) fn start_poll_round_if_follower(&mut self, term: Term) -> bool {
        if let State::Follower(fs) = &mut self.state {
            let mut accepted_from = HashSet::new();
            accepted_from.insert(self.config.my_member_id.clone());
            fs.poll_round = Some(PollRound { term, accepted_from });
            true
        } else {
            false
        }
    }

    /// Returns every member that accepted the poll for `term` so far, or None if that poll round
    /// is over.
    pub(crate) fn add_poll_accept_if_polling(&mut self, term: Term, from: MemberId) -> Option<HashSet<MemberId>> {
        match &mut self.state {
            State::Follower(FollowerState {
                poll_round: Some(round),
                ..
            }) if round.term == term => {
                round.accepted_from.insert(from);
                Some(round.accepted_from.clone())
            }
            _ => None,
        }
    }

    /// Returns every member that voted for us so far, or None if no longer Candidate.
    pub(crate) fn add_vote_if_candidate(&mut self, vote_from: MemberId) -> Option<HashSet<MemberId>> {
        if let State::Candidate(cs) = &mut self.state {
            cs.received_votes_from.insert(vote_from);
            Some(cs.received_votes_from.clone())
        } else {
            None
        }
    }

    pub(crate) fn leader_state(&self) -> Option<&LeaderStateTracker> {
        if let State::Leader(ls) = &self.state {
            Some(&ls.tracker)
        } else {
            None
        }
    }

    pub(crate) fn leader_state_mut(&mut self) -> Option<&mut LeaderStateTracker> {
        if let State::Leader(ls) = &mut self.state {
            Some(&mut ls.tracker)
        } else {
            None
        }
    }
}

impl fmt::Debug for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            State::Leader(ls) => write!(f, "Leader(Term={:?})", ls.term),
            State::Candidate(cs) => write!(f, "Candidate(Term={:?})", cs.term),
            State::Follower(fs) => write!(f, "Follower(Leader={:?})", fs.leader),
            State::Passive(ps) => write!(f, "{:?}(Leader={:?})", ps.member_type, ps.leader),
            State::Inactive => write!(f, "Inactive"),
        }
    }
}

enum State {
    Leader(LeaderState),
    Candidate(CandidateState),
    Follower(FollowerState),
    Passive(PassiveState),
    Inactive,
}

struct LeaderState {
    term: Term,
    tracker: LeaderStateTracker,
}

struct CandidateState {
    term: Term,
    received_votes_from: HashSet<MemberId>,
    // Restarts the election if it doesn't conclude in time.
    _election_timeout_tracker: FollowerTimerHandle,
}

struct FollowerState {
    leader: Option<MemberId>,
    // Pre-vote. A follower only becomes candidate once a quorum says it would vote for it.
    poll_round: Option<PollRound>,
    follower_timeout_tracker: FollowerTimerHandle,
}

struct PollRound {
    term: Term,
    accepted_from: HashSet<MemberId>,
}

struct PassiveState {
    member_type: MemberType,
    leader: Option<MemberId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorClient;

    fn election_state(membership: LocalMembership) -> (ElectionState, ElectionStateChangeListener, ActorClient) {
        let (client, _rx) = ActorClient::new(10);
        let config = ElectionConfig {
            my_member_id: MemberId::new("me"),
            leader_heartbeat_duration: Duration::from_secs(60),
            follower_min_timeout: Duration::from_secs(60),
            follower_max_timeout: Duration::from_secs(60),
        };
        let (state, listener) = ElectionState::new(config, client.weak(), membership, Term::new(1));
        (state, listener, client)
    }

    #[tokio::test]
    async fn initial_role_follows_membership() {
        let (state, listener, _client) = election_state(LocalMembership::Member(MemberType::Active));
        assert_eq!(listener.current(), ElectionStateSnapshot::Follower(None));
        assert!(state.is_follower());

        let (_, listener, _client) = election_state(LocalMembership::Member(MemberType::Promotable));
        assert_eq!(listener.current(), ElectionStateSnapshot::Promotable(None));

        let (state, listener, _client) = election_state(LocalMembership::NotAMember);
        assert_eq!(listener.current(), ElectionStateSnapshot::Inactive);
        assert_eq!(state.current_leader(), CurrentLeader::Unknown);
    }

    #[tokio::test]
    async fn poll_round_only_counts_current_term() {
        let (mut state, _listener, _client) = election_state(LocalMembership::Member(MemberType::Active));
        assert!(state.add_poll_accept_if_polling(Term::new(1), MemberId::new("a")).is_none());

        assert!(state.start_poll_round_if_follower(Term::new(1)));
        assert!(state.add_poll_accept_if_polling(Term::new(0), MemberId::new("a")).is_none());
        let accepted = state.add_poll_accept_if_polling(Term::new(1), MemberId::new("a")).unwrap();
        assert_eq!(accepted.len(), 2);

        // Becoming candidate ends the poll round.
        state.transition_to_candidate_and_vote_for_self(Term::new(2));
        assert!(state.add_poll_accept_if_polling(Term::new(1), MemberId::new("b")).is_none());
        assert_eq!(state.add_vote_if_candidate(MemberId::new("b")).map(|v| v.len()), Some(2));
    }

    #[tokio::test]
    async fn leader_syncs_peers_with_configuration() {
        let (mut state, mut listener, _client) = election_state(LocalMembership::Member(MemberType::Active));
        state.transition_to_leader(Term::new(3), vec![MemberId::new("a"), MemberId::new("b")], Index::new(4));
        assert_eq!(listener.next().await, Some(ElectionStateSnapshot::Leader(Term::new(3))));
        assert_eq!(state.current_leader(), CurrentLeader::Me);

        state.sync_leader_peers(vec![MemberId::new("b"), MemberId::new("c")], Index::new(9));
        let tracker = state.leader_state().unwrap();
        let mut peers: Vec<_> = tracker.peer_ids().into_iter().collect();
        peers.sort();
        assert_eq!(peers, vec![MemberId::new("b"), MemberId::new("c")]);
        assert_eq!(
            tracker.peer_state(&MemberId::new("b")).unwrap().next_and_previous_log_index().0,
            Index::new(4)
        );
        assert_eq!(
            tracker.peer_state(&MemberId::new("c")).unwrap().next_and_previous_log_index().0,
            Index::new(9)
        );
    }

    #[tokio::test]
    async fn follower_learns_leader_once() {
        let (mut state, _listener, _client) = election_state(LocalMembership::Member(MemberType::Passive));
        state.set_leader_if_unknown(&MemberId::new("a"));
        state.set_leader_if_unknown(&MemberId::new("b"));
        assert_eq!(state.current_leader(), CurrentLeader::Other(MemberId::new("a")));
    }
}
