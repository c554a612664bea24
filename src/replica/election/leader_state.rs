use crate::commitlog::Index;
use crate::membership::MemberId;
use crate::protocol::{ChunkId, SnapshotDescriptor};
use crate::replica::election::timers::LeaderTimerHandle;
use std::collections::{HashMap, HashSet};
use tokio::time::Instant;

/// After this many failed requests in a row, only empty appends are sent to a peer until it
/// answers again.
const MAX_FAILURES_BEFORE_BACKOFF: u32 = 5;

pub(crate) struct LeaderStateTracker {
    peer_state: HashMap<MemberId, PeerState>,
    // The entry this leader appended on election. Entries from earlier terms only count as
    // committed once this one is.
    initial_entry_index: Index,
}

impl LeaderStateTracker {
    pub(super) fn new(peer_state: HashMap<MemberId, PeerState>, initial_entry_index: Index) -> Self {
        LeaderStateTracker {
            peer_state,
            initial_entry_index,
        }
    }

    pub(crate) fn initial_entry_index(&self) -> Index {
        self.initial_entry_index
    }

    pub(crate) fn peer_state(&self, peer_id: &MemberId) -> Option<&PeerState> {
        self.peer_state.get(peer_id)
    }

    pub(crate) fn peer_state_mut(&mut self, peer_id: &MemberId) -> Option<&mut PeerState> {
        self.peer_state.get_mut(peer_id)
    }

    pub(crate) fn peer_ids(&self) -> HashSet<MemberId> {
        self.peer_state.keys().cloned().collect()
    }

    pub(crate) fn peers_iter(&self) -> impl Iterator<Item = (&MemberId, &PeerState)> {
        self.peer_state.iter()
    }

    pub(crate) fn matched_indexes(&self) -> HashMap<MemberId, Option<Index>> {
        self.peer_state
            .iter()
            .map(|(id, state)| (id.clone(), state.matched))
            .collect()
    }

    pub(super) fn insert_peer(&mut self, peer_id: MemberId, state: PeerState) {
        self.peer_state.insert(peer_id, state);
    }

    /// Stop tracking peers not in `keep`. Their timers stop with them.
    pub(super) fn retain_peers(&mut self, keep: &HashSet<MemberId>) {
        self.peer_state.retain(|peer_id, _| keep.contains(peer_id));
    }
}

/// Where a snapshot transfer to a peer stands.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SnapshotProgress {
    pub(crate) snapshot: SnapshotDescriptor,
    pub(crate) next_chunk_id: ChunkId,
}

pub(crate) struct PeerState {
    // Held to send heartbeats for this peer
    leader_timer_handle: LeaderTimerHandle,

    // > index of the next log entry to send to that server
    // > (initialized to leader last log index + 1)
    next: Index,
    // > index of highest log entry known to be replicated on server
    // > (initialized to 0, increases monotonically)
    matched: Option<Index>,

    // SeqNo is a logical clock over this leader's requests to the peer, across all request kinds.
    // Replies carrying an older SeqNo than one already received are discarded.
    last_sent_seq_no: u64,
    last_received_seq_no: u64,

    consecutive_failures: u32,
    // Index of the newest configuration the peer is known to have. None until it tells us.
    configuration_index: Option<Index>,
    snapshot_progress: Option<SnapshotProgress>,
    // Largest chunk the peer last asked for.
    preferred_chunk_size: Option<u64>,
    last_contact: Instant,
}

impl PeerState {
    pub(super) fn new(leader_timer_handle: LeaderTimerHandle, next: Index, now: Instant) -> Self {
        PeerState {
            leader_timer_handle,
            next,
            matched: None,
            last_sent_seq_no: 0,
            last_received_seq_no: 0,
            consecutive_failures: 0,
            configuration_index: None,
            snapshot_progress: None,
            preferred_chunk_size: None,
            last_contact: now,
        }
    }

    pub(crate) fn next_and_previous_log_index(&self) -> (Index, Option<Index>) {
        (self.next, self.next.checked_minus(1))
    }

    pub(crate) fn matched(&self) -> Option<Index> {
        self.matched
    }

    /// The peer has everything up to `last_appended`.
    pub(crate) fn record_append_success(&mut self, last_appended: Option<Index>) {
        if last_appended > self.matched {
            self.matched = last_appended;
        }
        let next = Index::following(self.matched);
        if next > self.next {
            self.next = next;
        }
    }

    /// The peer couldn't append. Continue right after its reported last entry, but never past our
    /// own log.
    pub(crate) fn record_append_mismatch(&mut self, peer_last_index: Option<Index>, leader_next_index: Index) {
        self.next = std::cmp::min(Index::following(peer_last_index), leader_next_index);
    }

    /// Skip the peer past everything a snapshot covers.
    pub(crate) fn record_snapshot_installed(&mut self, snapshot_index: Index) {
        self.snapshot_progress = None;
        self.record_append_success(Some(snapshot_index));
    }

    pub(crate) fn has_outstanding_request(&self) -> bool {
        self.last_received_seq_no < self.last_sent_seq_no
    }

    pub(crate) fn next_seq_no(&mut self) -> u64 {
        self.last_sent_seq_no += 1;
        self.last_sent_seq_no
    }

    /// Returns true if the reply with `received_seq_no` is the newest so far and should be acted
    /// on.
    pub(crate) fn ratchet_fwd_received_seq_no(&mut self, received_seq_no: u64) -> bool {
        if self.last_received_seq_no < received_seq_no && received_seq_no <= self.last_sent_seq_no {
            self.last_received_seq_no = received_seq_no;
            true
        } else {
            false
        }
    }

    pub(crate) fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    /// Any reply, even a rejection, means the peer is reachable.
    pub(crate) fn record_contact(&mut self, now: Instant) {
        self.consecutive_failures = 0;
        self.last_contact = now;
    }

    pub(crate) fn reset_failures(&mut self) {
        self.consecutive_failures = 0;
    }

    pub(crate) fn is_backing_off(&self) -> bool {
        self.consecutive_failures >= MAX_FAILURES_BEFORE_BACKOFF
    }

    pub(crate) fn last_contact(&self) -> Instant {
        self.last_contact
    }

    pub(crate) fn configuration_index(&self) -> Option<Index> {
        self.configuration_index
    }

    /// The peer's latest report wins, even if it's older. Truncation can take a configuration away.
    pub(crate) fn record_configuration_index(&mut self, index: Option<Index>) {
        self.configuration_index = index;
    }

    pub(crate) fn snapshot_progress(&self) -> Option<SnapshotProgress> {
        self.snapshot_progress
    }

    pub(crate) fn set_snapshot_progress(&mut self, progress: Option<SnapshotProgress>) {
        self.snapshot_progress = progress;
    }

    pub(crate) fn preferred_chunk_size(&self) -> Option<u64> {
        self.preferred_chunk_size
    }

    pub(crate) fn set_preferred_chunk_size(&mut self, size: u64) {
        if size > 0 {
            self.preferred_chunk_size = Some(size);
        }
    }

    pub(crate) fn reset_heartbeat_timer(&self) {
        self.leader_timer_handle.reset_heartbeat_timer();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ActorClient;
    use crate::replica::Term;
    use std::time::Duration;

    fn peer_state(next: u64) -> (PeerState, ActorClient) {
        let (client, _rx) = ActorClient::new(10);
        let timer = LeaderTimerHandle::spawn_timer_task(
            Duration::from_secs(60),
            client.weak(),
            MemberId::new("peer"),
            Term::new(1),
        );
        (PeerState::new(timer, Index::new(next), Instant::now()), client)
    }

    #[tokio::test]
    async fn append_progress() {
        let (mut peer, _client) = peer_state(5);
        assert_eq!(peer.next_and_previous_log_index(), (Index::new(5), Some(Index::new(4))));

        // Peer's log is shorter than we guessed.
        peer.record_append_mismatch(Some(Index::new(2)), Index::new(5));
        assert_eq!(peer.next_and_previous_log_index().0, Index::new(3));

        peer.record_append_success(Some(Index::new(4)));
        assert_eq!(peer.matched(), Some(Index::new(4)));
        assert_eq!(peer.next_and_previous_log_index().0, Index::new(5));

        // Late, smaller success doesn't move anything back.
        peer.record_append_success(Some(Index::new(3)));
        assert_eq!(peer.matched(), Some(Index::new(4)));

        // Peer claims a longer log than ours.
        peer.record_append_mismatch(Some(Index::new(50)), Index::new(7));
        assert_eq!(peer.next_and_previous_log_index().0, Index::new(7));
    }

    #[tokio::test]
    async fn seq_no_throttles_to_one_outstanding_request() {
        let (mut peer, _client) = peer_state(1);
        assert!(!peer.has_outstanding_request());

        let first = peer.next_seq_no();
        assert!(peer.has_outstanding_request());
        assert!(peer.ratchet_fwd_received_seq_no(first));
        assert!(!peer.has_outstanding_request());

        // Duplicate and never-sent seq nos are dropped.
        assert!(!peer.ratchet_fwd_received_seq_no(first));
        assert!(!peer.ratchet_fwd_received_seq_no(first + 1));
    }

    #[tokio::test]
    async fn backoff_after_consecutive_failures() {
        let (mut peer, _client) = peer_state(1);
        for _ in 0..MAX_FAILURES_BEFORE_BACKOFF {
            assert!(!peer.is_backing_off());
            peer.record_failure();
        }
        assert!(peer.is_backing_off());

        peer.record_contact(Instant::now());
        assert!(!peer.is_backing_off());

        for _ in 0..MAX_FAILURES_BEFORE_BACKOFF {
            peer.record_failure();
        }
        peer.reset_failures();
        assert!(!peer.is_backing_off());
    }
}
