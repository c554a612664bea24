use crate::api::types::RaftLeaderInfo;
use crate::replica::ElectionStateChangeListener;
use crate::replica::ElectionStateSnapshot;

// This is a really lazy event bus style just to expose *any* API to the consumer. Only role
// changes are published for now.

/// An event that happened, as observed by the local raft replica.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RaftEvent {
    /// The local replica changed role. Consuming this event type is subtle. It doesn't queue
    /// intermediate events. If there are multiple events between when application awaits the next
    /// event, those events will be clobbered into only the most recent event.
    Election(RaftElectionState),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RaftElectionState {
    Leader { term: u64 },
    Candidate { term: u64 },
    Follower { leader: Option<RaftLeaderInfo> },
    Passive { leader: Option<RaftLeaderInfo> },
    Promotable { leader: Option<RaftLeaderInfo> },
    /// Not a member of the current configuration.
    Inactive,
}

#[derive(Clone)]
pub struct RaftEventListener {
    election_state_change_listener: ElectionStateChangeListener,
}

impl RaftEventListener {
    pub(crate) fn new(election_state_change_listener: ElectionStateChangeListener) -> Self {
        RaftEventListener {
            election_state_change_listener,
        }
    }

    /// `next_event()` returns the next event that this local raft replica observes.
    pub async fn next_event(&mut self) -> Option<RaftEvent> {
        self.election_state_change_listener
            .next()
            .await
            .map(|election_state| RaftEvent::Election(RaftElectionState::from(election_state)))
    }

    pub fn current_election_state(&self) -> RaftElectionState {
        RaftElectionState::from(self.election_state_change_listener.current())
    }
}

// ------- Conversions --------

impl From<ElectionStateSnapshot> for RaftElectionState {
    fn from(election_state: ElectionStateSnapshot) -> Self {
        match election_state {
            ElectionStateSnapshot::Leader(term) => RaftElectionState::Leader { term: term.as_u64() },
            ElectionStateSnapshot::Candidate(term) => RaftElectionState::Candidate { term: term.as_u64() },
            ElectionStateSnapshot::Follower(leader) => RaftElectionState::Follower {
                leader: leader.map(RaftLeaderInfo::from),
            },
            ElectionStateSnapshot::Passive(leader) => RaftElectionState::Passive {
                leader: leader.map(RaftLeaderInfo::from),
            },
            ElectionStateSnapshot::Promotable(leader) => RaftElectionState::Promotable {
                leader: leader.map(RaftLeaderInfo::from),
            },
            ElectionStateSnapshot::Inactive => RaftElectionState::Inactive,
        }
    }
}
