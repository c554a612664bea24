use crate::actor::Callback;
use crate::commitlog::{Index, Log};
use crate::membership::{ClusterMembership, Configuration, LocalMembership, MemberId, MemberType};
use crate::protocol::{RaftError, RaftRequest, RaftResponse, ToInternalAppend};
use crate::replica::election::{CurrentLeader, ElectionState, ElectionStateSnapshot};
use crate::replica::local_state::{PersistentLocalState, Term};
use crate::replica::peer_call::PeerCaller;
use crate::replica::reconfigure::PendingReconfigure;
use crate::replica::replica_api::{
    ClusterInfo, EnqueueForReplicationError, EnqueueForReplicationInput, EnqueueForReplicationOutput, LeaderTimerTick,
};
use crate::replica::snapshot::SnapshotReceiver;
use crate::replica::write_ahead_log::{EntryPayload, WriteAheadLog, WriteAheadLogEntry};
use std::io;
use std::time::Duration;

/// Knobs for the leader's side of replication.
#[derive(Clone, Debug)]
pub(crate) struct ReplicationConfig {
    pub leader_step_down_timeout: Duration,
    pub max_entries_per_append: usize,
    pub snapshot_chunk_size: usize,
    // Send a snapshot instead of entries when a member is further behind than this, even if the
    // entries are still in the log.
    pub snapshot_replication_threshold: Option<u64>,
}

pub(crate) struct Replica<L>
where
    L: Log<WriteAheadLogEntry>,
{
    pub(super) logger: slog::Logger,
    pub(super) my_member_id: MemberId,
    pub(super) membership: ClusterMembership,
    pub(super) local_state: Box<dyn PersistentLocalState + Send>,
    pub(super) election_state: ElectionState,
    pub(super) wal: WriteAheadLog<L>,
    pub(super) snapshots: SnapshotReceiver,
    pub(super) peers: PeerCaller,
    pub(super) config: ReplicationConfig,
    // Leader only. The Reconfigure/Join/Leave being worked on.
    pub(super) pending_reconfigure: Option<PendingReconfigure>,
}

impl<L> Replica<L>
where
    L: Log<WriteAheadLogEntry> + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        logger: slog::Logger,
        membership: ClusterMembership,
        local_state: Box<dyn PersistentLocalState + Send>,
        election_state: ElectionState,
        wal: WriteAheadLog<L>,
        snapshots: SnapshotReceiver,
        peers: PeerCaller,
        config: ReplicationConfig,
    ) -> Self {
        Replica {
            logger,
            my_member_id: membership.my_member_id().clone(),
            membership,
            local_state,
            election_state,
            wal,
            snapshots,
            peers,
            config,
            pending_reconfigure: None,
        }
    }

    /// Every raft request is answered through `callback`, most of them before this returns.
    pub(crate) fn handle_request(&mut self, request: RaftRequest, callback: Callback<RaftResponse>) {
        let response = match request {
            RaftRequest::Poll(r) => RaftResponse::Poll(self.handle_poll(r)),
            RaftRequest::Vote(r) => RaftResponse::Vote(self.handle_vote(r)),
            RaftRequest::Append(r) => RaftResponse::Append(self.handle_append(r.to_internal())),
            RaftRequest::VersionedAppend(r) => RaftResponse::Append(self.handle_append(r.to_internal())),
            RaftRequest::Install(r) => RaftResponse::Install(self.handle_install(r)),
            RaftRequest::Configure(r) => RaftResponse::Configure(self.handle_configure(r)),
            RaftRequest::ForceConfigure(r) => RaftResponse::ForceConfigure(self.handle_force_configure(r)),
            RaftRequest::Reconfigure(r) => return self.handle_reconfigure(r, callback),
            RaftRequest::Join(r) => return self.handle_join(r, callback),
            RaftRequest::Leave(r) => return self.handle_leave(r, callback),
        };

        callback.send(response);
    }

    pub(crate) fn handle_enqueue_for_replication(
        &mut self,
        input: EnqueueForReplicationInput,
    ) -> Result<EnqueueForReplicationOutput, EnqueueForReplicationError> {
        // Leader check
        match self.election_state.current_leader() {
            CurrentLeader::Me => { /* carry on */ }
            CurrentLeader::Other(leader_id) => return Err(EnqueueForReplicationError::LeaderRedirect(leader_id)),
            CurrentLeader::Unknown => return Err(EnqueueForReplicationError::NoLeader),
        }

        // TODO:2 throttle based on number of uncommitted entries.

        // > If command received from client: append entry to local log,
        // > respond after entry applied to state machine (§5.3)
        let term = self.local_state.current_term();
        let appended_index = self
            .wal
            .append(WriteAheadLogEntry {
                term,
                payload: EntryPayload::Application(input.data),
            })
            .map_err(EnqueueForReplicationError::LocalIoError)?;

        self.advance_leader_commit();
        self.trigger_replication();

        Ok(EnqueueForReplicationOutput {
            enqueued_term: term,
            enqueued_index: appended_index,
        })
    }

    pub(crate) fn cluster_info(&self) -> ClusterInfo {
        let leader = match self.election_state.current_leader() {
            CurrentLeader::Me => Some(self.my_member_id.clone()),
            CurrentLeader::Other(leader_id) => Some(leader_id),
            CurrentLeader::Unknown => None,
        };

        ClusterInfo {
            term: self.local_state.current_term(),
            leader,
            configuration: self.membership.configuration().clone(),
            configuration_committed: self.membership.is_committed(),
            commit_index: self.wal.commit_index(),
        }
    }

    pub(super) fn current_term(&self) -> Term {
        self.local_state.current_term()
    }

    pub(super) fn known_leader(&self) -> Option<MemberId> {
        match self.election_state.current_leader() {
            CurrentLeader::Other(leader_id) => Some(leader_id),
            CurrentLeader::Me | CurrentLeader::Unknown => None,
        }
    }

    /// > If RPC request or response contains term T > currentTerm:
    /// > set currentTerm = T, convert to follower (§5.1)
    ///
    /// Returns true if `term` was newer than ours.
    pub(super) fn observe_term(&mut self, term: Term, leader: Option<MemberId>) -> bool {
        if !self.local_state.store_term_if_increased(term) {
            return false;
        }

        self.step_down(term, leader);
        slog::info!(
            self.logger,
            "Observed newer term {:?}. Election state: {:?}",
            term,
            self.election_state
        );
        true
    }

    /// Leave whatever role we're in for the one the configuration gives us. For an active member
    /// that's follower.
    pub(super) fn step_down(&mut self, term: Term, leader: Option<MemberId>) {
        if self.election_state.is_leader() {
            self.fail_pending_reconfigure(RaftError::protocol("Leader stepped down"));
        }
        self.election_state
            .transition_to_member_role(self.membership.local_membership(), term, leader);
    }

    /// Installs `configuration` if it's newer. Configurations take effect as soon as they're in
    /// the log, committed or not.
    pub(super) fn apply_configuration(&mut self, configuration: Configuration) -> bool {
        if !self.membership.configure(configuration) {
            return false;
        }

        slog::info!(self.logger, "Configuration changed: {:?}", self.membership.configuration());
        self.on_configuration_changed();
        true
    }

    pub(super) fn on_configuration_changed(&mut self) {
        self.refresh_member_role();
        let peer_ids = self.membership.remote_member_ids();
        let next_index = self.wal.next_index();
        self.election_state.sync_leader_peers(peer_ids, next_index);
    }

    /// Members whose type changed, or that were added or removed, switch role right away. A
    /// leader keeps leading until the configuration that removes it commits.
    fn refresh_member_role(&mut self) {
        let membership = self.membership.local_membership();
        let in_matching_role = matches!(
            (membership, self.election_state.current_state()),
            (LocalMembership::Member(MemberType::Active), ElectionStateSnapshot::Follower(_))
                | (LocalMembership::Member(MemberType::Active), ElectionStateSnapshot::Candidate(_))
                | (LocalMembership::Member(MemberType::Promotable), ElectionStateSnapshot::Promotable(_))
                | (LocalMembership::Member(MemberType::Passive), ElectionStateSnapshot::Passive(_))
                | (LocalMembership::NotAMember, ElectionStateSnapshot::Inactive)
                | (_, ElectionStateSnapshot::Leader(_))
        );
        if in_matching_role {
            return;
        }

        let leader = self.known_leader();
        self.election_state
            .transition_to_member_role(membership, self.current_term(), leader);
        slog::info!(
            self.logger,
            "Local membership is now {:?}. Election state: {:?}",
            membership,
            self.election_state
        );
    }

    /// Called whenever the commit index moved forward.
    pub(super) fn on_commit_advanced(&mut self) {
        // > If commitIndex > lastApplied: increment lastApplied, apply
        // > log[lastApplied] to state machine (§5.3)
        self.wal.apply_all_committed_entries();

        if self.membership.commit_if_reached(self.wal.commit_index()) {
            let configuration = self.membership.configuration().clone();
            slog::info!(self.logger, "Committed configuration {:?}", configuration);
            self.local_state.store_configuration(configuration);
            if let Err(e) = self.compact_to_snapshot() {
                slog::warn!(self.logger, "Failed to compact log: {:?}", e);
            }
            if self.election_state.is_leader() {
                self.on_leader_configuration_committed();
            }
        }

        if self.election_state.is_leader() {
            self.leave_inherited_configuration_if_ready();
        }
    }

    /// Ask every peer's timer to fire now instead of waiting for the next heartbeat.
    pub(super) fn trigger_replication(&self) {
        let leader_state = match self.election_state.leader_state() {
            Some(ls) => ls,
            None => return,
        };
        let term = self.current_term();
        for peer_id in leader_state.peer_ids() {
            let actor_client = self.peers.actor_client().clone();
            let tick = LeaderTimerTick { peer_id, term };
            tokio::task::spawn(async move {
                let _ = actor_client.leader_timer(tick).await;
            });
        }
    }

    pub(super) fn last_snapshot_index(&self) -> Option<Index> {
        self.snapshots
            .store()
            .current_snapshot()
            .map(|snapshot| snapshot.descriptor.index)
    }
}

pub(super) fn io_error(context: &str, e: io::Error) -> RaftError {
    RaftError::application(format!("{}: {:?}", context, e))
}
