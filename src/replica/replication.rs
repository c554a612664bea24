use crate::commitlog::{Index, Log};
use crate::membership::MemberId;
use crate::protocol::{
    ChunkId, ConfigureRequest, InstallRequest, MessageError, RaftRequest, VersionedAppendRequest,
    CURRENT_PROTOCOL_VERSION,
};
use crate::replica::election::{PeerState, SnapshotProgress};
use crate::replica::local_state::Term;
use crate::replica::peer_call::ReplyRoute;
use crate::replica::replica::Replica;
use crate::replica::replica_api::{
    AppendReplyDescriptor, AppendReplyFromPeer, ConfigureReplyDescriptor, ConfigureReplyFromPeer,
    InstallReplyDescriptor, InstallReplyFromPeer, LeaderTimerTick, PeerReplyError,
};
use crate::replica::snapshot;
use crate::replica::write_ahead_log::WriteAheadLogEntry;
use std::collections::HashSet;
use std::{cmp, io};
use tokio::time::Instant;

enum HandleLeaderTimerError {
    NoLongerLeader,
    PeerConcurrencyThrottle,
    LeaderStateMissingPeer { leader_state_tracker_peers: HashSet<MemberId> },
    DiskRead(Index, io::Error),
    UnexpectedMissingLogEntry(Index),
    MissingSnapshot(Index),
    InvalidRequest(MessageError),
}

impl<L> Replica<L>
where
    L: Log<WriteAheadLogEntry> + 'static,
{
    pub(crate) fn handle_leader_timer(&mut self, tick: LeaderTimerTick) {
        let current_term = self.current_term();
        if current_term != tick.term {
            slog::debug!(
                self.logger,
                "Received leader heartbeat for outdated term {:?}, current term: {:?}",
                tick.term,
                current_term
            );
            return;
        }

        if self.step_down_if_quorum_unreachable() {
            return;
        }

        match self.try_handle_leader_timer_for_peer(&tick.peer_id, current_term) {
            Ok(()) => {}
            Err(HandleLeaderTimerError::NoLongerLeader) => {
                slog::info!(self.logger, "Received leader timer event but no longer leader.")
            }
            Err(HandleLeaderTimerError::PeerConcurrencyThrottle) => {
                slog::debug!(self.logger, "Request to peer {:?} still outstanding", tick.peer_id)
            }
            Err(HandleLeaderTimerError::LeaderStateMissingPeer {
                leader_state_tracker_peers,
            }) => {
                // Timer of a peer that was just removed from the configuration.
                slog::debug!(
                    self.logger,
                    "Peer {:?} is not tracked. Tracked peers: [{:?}]",
                    tick.peer_id,
                    leader_state_tracker_peers,
                )
            }
            Err(HandleLeaderTimerError::DiskRead(index, ioe)) => {
                slog::error!(self.logger, "Failed to read log entry at index {:?}: {:?}", index, ioe);
            }
            Err(HandleLeaderTimerError::UnexpectedMissingLogEntry(index)) => {
                slog::error!(
                    self.logger,
                    "Wtf! LeaderStateTracker is tracking index {:?}, but entry is missing from log.",
                    index
                );
            }
            Err(HandleLeaderTimerError::MissingSnapshot(index)) => {
                slog::error!(
                    self.logger,
                    "Peer {:?} needs index {:?}, which is compacted, but there's no snapshot.",
                    tick.peer_id,
                    index
                );
            }
            Err(HandleLeaderTimerError::InvalidRequest(e)) => {
                slog::error!(self.logger, "Built an invalid request for {:?}: {}", tick.peer_id, e);
            }
        }
    }

    /// A leader that hasn't heard from a quorum for a while is likely partitioned away. Better
    /// to step down than keep serving a stale view.
    fn step_down_if_quorum_unreachable(&mut self) -> bool {
        let leader_state = match self.election_state.leader_state() {
            Some(ls) => ls,
            None => return false,
        };

        let now = Instant::now();
        let mut contacted: HashSet<MemberId> = leader_state
            .peers_iter()
            .filter(|(_, peer)| now.duration_since(peer.last_contact()) < self.config.leader_step_down_timeout)
            .map(|(peer_id, _)| peer_id.clone())
            .collect();
        contacted.insert(self.my_member_id.clone());

        if self.membership.quorum().has_majority(&contacted) {
            return false;
        }

        slog::warn!(
            self.logger,
            "Only heard from {:?} within {:?}. Stepping down.",
            contacted,
            self.config.leader_step_down_timeout
        );
        let term = self.current_term();
        self.step_down(term, None);
        true
    }

    fn try_handle_leader_timer_for_peer(
        &mut self,
        peer_id: &MemberId,
        current_term: Term,
    ) -> Result<(), HandleLeaderTimerError> {
        let Replica {
            election_state,
            membership,
            wal,
            snapshots,
            peers,
            config,
            my_member_id,
            ..
        } = self;

        let leader_state = election_state
            .leader_state_mut()
            .ok_or(HandleLeaderTimerError::NoLongerLeader)?;
        let leader_state_tracker_peers = leader_state.peer_ids();
        let peer_state = leader_state
            .peer_state_mut(peer_id)
            .ok_or(HandleLeaderTimerError::LeaderStateMissingPeer {
                leader_state_tracker_peers,
            })?;

        // One request in flight per peer.
        if peer_state.has_outstanding_request() {
            return Err(HandleLeaderTimerError::PeerConcurrencyThrottle);
        }

        // 1. The peer must know the configuration before anything else.
        let configuration = membership.configuration();
        if peer_state.configuration_index() < configuration.index {
            let request = ConfigureRequest::new(current_term, my_member_id.clone(), configuration.clone())
                .map_err(HandleLeaderTimerError::InvalidRequest)?;
            let descriptor = ConfigureReplyDescriptor {
                peer_id: peer_id.clone(),
                term: current_term,
                seq_no: peer_state.next_seq_no(),
                configuration_index: configuration.index,
            };
            peer_state.reset_heartbeat_timer();
            peers.spawn_call(
                peer_id.clone(),
                RaftRequest::Configure(request),
                ReplyRoute::Configure(descriptor),
            );
            return Ok(());
        }

        // 2. A peer that's behind the start of our log, or too far behind, gets the snapshot.
        let (next_index, previous_index) = peer_state.next_and_previous_log_index();
        let lag = wal.latest_index().map_or(0, |latest| latest.as_u64()).saturating_sub(next_index.as_u64());
        let current_snapshot = snapshots.store().current_snapshot().map(|s| s.descriptor);
        let lagging_behind_snapshot = matches!(
            (config.snapshot_replication_threshold, current_snapshot),
            (Some(threshold), Some(s)) if lag > threshold && s.index >= next_index
        );
        if next_index < wal.first_index() || lagging_behind_snapshot || peer_state.snapshot_progress().is_some() {
            let current_snapshot =
                current_snapshot.ok_or(HandleLeaderTimerError::MissingSnapshot(next_index))?;

            // Restart from the first chunk if the snapshot changed mid-transfer.
            let chunk_id = match peer_state.snapshot_progress() {
                Some(progress) if progress.snapshot.same_snapshot(&current_snapshot) => progress.next_chunk_id,
                _ => ChunkId::initial(),
            };
            let chunk_size = cmp::min(
                config.snapshot_chunk_size as u64,
                peer_state.preferred_chunk_size().unwrap_or(u64::MAX),
            ) as usize;
            let (descriptor, chunk) = snapshot::read_chunk(snapshots.store(), chunk_id, chunk_size)
                .ok_or(HandleLeaderTimerError::MissingSnapshot(next_index))?;

            let reply_descriptor = InstallReplyDescriptor {
                peer_id: peer_id.clone(),
                term: current_term,
                seq_no: peer_state.next_seq_no(),
                snapshot: descriptor,
                chunk_id: chunk.chunk_id,
                next_chunk_id: chunk.next_chunk_id,
            };
            let request = InstallRequest::new(current_term, my_member_id.clone(), descriptor, chunk)
                .map_err(HandleLeaderTimerError::InvalidRequest)?;
            peer_state.set_snapshot_progress(Some(SnapshotProgress {
                snapshot: descriptor,
                next_chunk_id: chunk_id,
            }));
            peer_state.reset_heartbeat_timer();
            peers.spawn_call(
                peer_id.clone(),
                RaftRequest::Install(request),
                ReplyRoute::Install(reply_descriptor),
            );
            return Ok(());
        }

        // 3. Entries (or a heartbeat).
        // > If last log index ≥ nextIndex for a follower: send
        // > AppendEntries RPC with log entries starting at nextIndex
        let previous_log_entry = match previous_index {
            None => None,
            Some(index) => match wal.term_at(index) {
                Ok(Some(term)) => Some((term, index)),
                Ok(None) => return Err(HandleLeaderTimerError::UnexpectedMissingLogEntry(index)),
                Err(e) => return Err(HandleLeaderTimerError::DiskRead(index, e)),
            },
        };
        let entries = if peer_state.is_backing_off() {
            Vec::new()
        } else {
            wal.records(next_index, config.max_entries_per_append)
                .map_err(|e| HandleLeaderTimerError::DiskRead(next_index, e))?
        };

        let descriptor = AppendReplyDescriptor {
            peer_id: peer_id.clone(),
            term: current_term,
            seq_no: peer_state.next_seq_no(),
            previous_log_entry_index: previous_index,
            num_log_entries: entries.len(),
        };
        let request = VersionedAppendRequest::new(
            CURRENT_PROTOCOL_VERSION,
            current_term,
            my_member_id.clone(),
            previous_log_entry,
            wal.commit_index(),
            entries,
        )
        .map_err(HandleLeaderTimerError::InvalidRequest)?;

        peer_state.reset_heartbeat_timer();
        peers.spawn_call(
            peer_id.clone(),
            RaftRequest::VersionedAppend(request),
            ReplyRoute::Append(descriptor),
        );

        Ok(())
    }

    pub(crate) fn handle_append_reply_from_peer(&mut self, reply: AppendReplyFromPeer) {
        let descriptor = reply.descriptor;
        let logger = self.logger.new(slog::o!(
            "Peer" => descriptor.peer_id.to_string(),
            "SeqNo" => descriptor.seq_no,
        ));
        slog::debug!(logger, "Append reply from peer result: {:?}", reply.result);

        let response = match self.accept_peer_reply(
            &logger,
            &descriptor.peer_id,
            descriptor.term,
            descriptor.seq_no,
            reply.result,
        ) {
            Some(response) => response,
            None => return,
        };
        if self.observe_term(response.term, None) {
            slog::info!(logger, "Peer is on a newer term. Stepped down.");
            return;
        }

        let leader_next_index = self.wal.next_index();
        let peer_state = match self.peer_state_mut(&descriptor.peer_id) {
            Some(peer_state) => peer_state,
            None => return,
        };
        peer_state.record_configuration_index(response.configuration_index);

        if response.succeeded {
            let replicated_through = descriptor
                .previous_log_entry_index
                .map_or(0, |index| index.as_u64())
                + descriptor.num_log_entries as u64;
            let acked = cmp::min(response.last_log_index, Index::from_u64(replicated_through));
            peer_state.record_append_success(acked);
        } else {
            slog::info!(logger, "Peer is missing entries. It has up to {:?}", response.last_log_index);
            peer_state.record_append_mismatch(response.last_log_index, leader_next_index);
        }
        let (next_index, _) = peer_state.next_and_previous_log_index();

        self.advance_leader_commit();

        // Keep going while the peer is behind.
        if self.wal.latest_index() >= Some(next_index) {
            self.schedule_immediate_tick(descriptor.peer_id, descriptor.term);
        }
    }

    pub(crate) fn handle_install_reply_from_peer(&mut self, reply: InstallReplyFromPeer) {
        let descriptor = reply.descriptor;
        let logger = self.logger.new(slog::o!(
            "Peer" => descriptor.peer_id.to_string(),
            "SeqNo" => descriptor.seq_no,
        ));
        slog::debug!(logger, "Install reply from peer result: {:?}", reply.result);

        let peer_id = descriptor.peer_id.clone();
        // The receiver drops its partial snapshot when it rejects a chunk. A chunk that got no
        // answer is just resent.
        let rejected = matches!(reply.result, Err(PeerReplyError::Error(_)));
        let response = match self.accept_peer_reply(&logger, &peer_id, descriptor.term, descriptor.seq_no, reply.result) {
            Some(response) => response,
            None => {
                if rejected {
                    if let Some(peer_state) = self.peer_state_mut(&peer_id) {
                        peer_state.set_snapshot_progress(None);
                    }
                }
                return;
            }
        };

        let peer_state = match self.peer_state_mut(&peer_id) {
            Some(peer_state) => peer_state,
            None => return,
        };
        peer_state.set_preferred_chunk_size(response.preferred_chunk_size);
        match descriptor.next_chunk_id {
            Some(next_chunk_id) => peer_state.set_snapshot_progress(Some(SnapshotProgress {
                snapshot: descriptor.snapshot,
                next_chunk_id,
            })),
            None => {
                slog::info!(logger, "Peer installed snapshot {:?}", descriptor.snapshot);
                peer_state.record_snapshot_installed(descriptor.snapshot.index);
            }
        }

        self.advance_leader_commit();
        self.schedule_immediate_tick(peer_id, descriptor.term);
    }

    pub(crate) fn handle_configure_reply_from_peer(&mut self, reply: ConfigureReplyFromPeer) {
        let descriptor = reply.descriptor;
        let logger = self.logger.new(slog::o!(
            "Peer" => descriptor.peer_id.to_string(),
            "SeqNo" => descriptor.seq_no,
        ));

        let response = match self.accept_peer_reply(
            &logger,
            &descriptor.peer_id,
            descriptor.term,
            descriptor.seq_no,
            reply.result,
        ) {
            Some(response) => response,
            None => return,
        };
        if self.observe_term(response.term, None) {
            return;
        }

        if let Some(peer_state) = self.peer_state_mut(&descriptor.peer_id) {
            peer_state.record_configuration_index(descriptor.configuration_index);
            slog::debug!(logger, "Peer has configuration {:?}", descriptor.configuration_index);
        }
        self.schedule_immediate_tick(descriptor.peer_id, descriptor.term);
    }

    /// Common bookkeeping for every reply from a peer. Returns the response only if it's current
    /// and successful.
    fn accept_peer_reply<T: std::fmt::Debug>(
        &mut self,
        logger: &slog::Logger,
        peer_id: &MemberId,
        request_term: Term,
        seq_no: u64,
        result: Result<T, PeerReplyError>,
    ) -> Option<T> {
        // A status=ERROR carrying a newer term means we're stale, no matter how old the request.
        if let Err(PeerReplyError::Error(e)) = &result {
            if let Some(term) = e.term {
                if self.observe_term(term, None) {
                    slog::info!(logger, "Peer is on a newer term. Stepped down.");
                    return None;
                }
            }
        }

        if self.current_term() != request_term {
            slog::info!(
                logger,
                "Received reply for outdated term {:?}, but we're on term {:?}",
                request_term,
                self.current_term()
            );
            return None;
        }

        let peer_state = match self.peer_state_mut(peer_id) {
            Some(peer_state) => peer_state,
            None => {
                slog::info!(logger, "Not leader anymore, or peer was removed");
                return None;
            }
        };
        if !peer_state.ratchet_fwd_received_seq_no(seq_no) {
            slog::info!(logger, "Discarding out of order reply");
            return None;
        }

        match result {
            Ok(response) => {
                peer_state.record_contact(Instant::now());
                Some(response)
            }
            Err(PeerReplyError::Error(e)) => {
                peer_state.record_contact(Instant::now());
                slog::warn!(logger, "Peer rejected request: {}", e);
                None
            }
            Err(PeerReplyError::Failed(message)) => {
                peer_state.record_failure();
                slog::warn!(logger, "Request failed: {}", message);
                None
            }
        }
    }

    fn peer_state_mut(&mut self, peer_id: &MemberId) -> Option<&mut PeerState> {
        self.election_state
            .leader_state_mut()
            .and_then(|leader_state| leader_state.peer_state_mut(peer_id))
    }

    fn schedule_immediate_tick(&self, peer_id: MemberId, term: Term) {
        let actor_client = self.peers.actor_client().clone();
        let tick = LeaderTimerTick { peer_id, term };
        tokio::task::spawn(async move {
            let _ = actor_client.leader_timer(tick).await;
        });
    }

    /// > If there exists an N such that N > commitIndex, a majority
    /// > of matchIndex[i] ≥ N, and log[N].term == currentTerm:
    /// > set commitIndex = N (§5.3, §5.4).
    ///
    /// The majority is over the effective, possibly joint, configuration. The leader counts its
    /// own log.
    pub(super) fn advance_leader_commit(&mut self) {
        let (mut matched, initial_entry_index) = match self.election_state.leader_state() {
            Some(leader_state) => (leader_state.matched_indexes(), leader_state.initial_entry_index()),
            None => return,
        };
        matched.insert(self.my_member_id.clone(), self.wal.latest_index());

        let tentative_new_commit_index = match self.membership.quorum().committed_index(&matched) {
            Some(index) if index >= initial_entry_index => index,
            _ => return,
        };

        match self
            .wal
            .ratchet_fwd_commit_index_if_valid(tentative_new_commit_index, self.current_term())
        {
            Ok(true) => self.on_commit_advanced(),
            Ok(false) => {}
            Err(ioe) => slog::warn!(
                self.logger,
                "IO failure while confirming new commit index {:?}: {:?}",
                tentative_new_commit_index,
                ioe
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::RaftMember;
    use crate::protocol::{AppendResponse, RaftResponse};
    use crate::replica::replica_wiring::testing::{app_entry, elect_with, test_replica, FakePeer, TestHarness};

    fn two_members() -> Vec<RaftMember> {
        vec![RaftMember::active("a"), RaftMember::active("b")]
    }

    async fn next_append(peer: &mut FakePeer) -> (VersionedAppendRequest, crate::actor::Callback<RaftResponse>) {
        match peer.next_request().await {
            (RaftRequest::VersionedAppend(request), callback) => (request, callback),
            (other, _) => panic!("Unexpected request {:?}", other),
        }
    }

    fn tick(harness: &mut TestHarness, peer_id: &str) {
        let term = harness.replica.current_term();
        harness.replica.handle_leader_timer(LeaderTimerTick {
            peer_id: MemberId::new(peer_id),
            term,
        });
    }

    #[tokio::test]
    async fn leader_backs_up_to_what_the_follower_reports() {
        let mut harness = test_replica("a", two_members());
        let mut b = harness.fake_peer("b");
        elect_with(&mut harness.replica, &["b"]);
        for data in [b"2", b"3", b"4", b"5", b"6"].iter() {
            harness.replica.wal.append(app_entry(1, *data)).unwrap();
        }

        tick(&mut harness, "b");
        let (first, callback) = next_append(&mut b).await;
        assert_eq!(first.prev_log_entry, None);
        assert_eq!(first.entries.len(), 6);

        // b had an older leader's entries past 4.
        callback.send(RaftResponse::Append(Ok(AppendResponse {
            term: Term::new(1),
            succeeded: false,
            last_log_index: Some(Index::new(4)),
            last_snapshot_index: None,
            configuration_index: None,
        })));
        let reply = harness.next_append_reply().await;
        harness.replica.handle_append_reply_from_peer(reply);
        assert_eq!(harness.replica.wal.commit_index(), None);

        tick(&mut harness, "b");
        let (second, _callback) = next_append(&mut b).await;
        assert_eq!(second.prev_log_entry, Some((Term::new(1), Index::new(4))));
        let indexes: Vec<Index> = second.entries.iter().map(|record| record.index).collect();
        assert_eq!(indexes, vec![Index::new(5), Index::new(6)]);
    }

    #[tokio::test]
    async fn acknowledged_entries_commit() {
        let mut harness = test_replica("a", two_members());
        let mut b = harness.fake_peer("b");
        elect_with(&mut harness.replica, &["b"]);
        harness.replica.wal.append(app_entry(1, b"x")).unwrap();

        tick(&mut harness, "b");
        let (request, callback) = next_append(&mut b).await;
        assert_eq!(request.commit_index, None);
        callback.send(RaftResponse::Append(Ok(AppendResponse {
            term: Term::new(1),
            succeeded: true,
            last_log_index: Some(Index::new(2)),
            last_snapshot_index: None,
            configuration_index: None,
        })));
        let reply = harness.next_append_reply().await;
        harness.replica.handle_append_reply_from_peer(reply);
        assert_eq!(harness.replica.wal.commit_index(), Some(Index::new(2)));

        // The heartbeat carries the new commit index.
        tick(&mut harness, "b");
        let (heartbeat, _callback) = next_append(&mut b).await;
        assert_eq!(heartbeat.commit_index, Some(Index::new(2)));
        assert!(heartbeat.entries.is_empty());
    }
}
