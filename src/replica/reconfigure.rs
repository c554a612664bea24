use crate::actor::Callback;
use crate::commitlog::{Index, Log};
use crate::membership::{same_members, Configuration, LocalMembership, MemberType, RaftMember};
use crate::protocol::{
    ConfigureRequest, ConfigureResponse, ForceConfigureRequest, ForceConfigureResponse, JoinRequest, JoinResponse,
    LeaveRequest, LeaveResponse, RaftError, RaftRequest, RaftResponse, RaftResult, ReconfigureRequest,
    ReconfigureResponse,
};
use crate::replica::local_state::Term;
use crate::replica::replica::{io_error, Replica};
use crate::replica::write_ahead_log::{EntryPayload, WriteAheadLogEntry};
use std::{cmp, io};

/// A membership change in flight on the leader. It's answered once the final, non-joint
/// configuration commits.
pub(super) struct PendingReconfigure {
    origin: ReconfigureOrigin,
    callback: Callback<RaftResponse>,
    stage: ReconfigureStage,
}

#[derive(Debug, Clone, Copy)]
pub(super) enum ReconfigureOrigin {
    Reconfigure,
    Join,
    Leave,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ReconfigureStage {
    // Waiting for configure(new, old) at this index to commit.
    Joint(Option<Index>),
    // Waiting for configure(new, []) at this index to commit.
    Final(Option<Index>),
}

impl ReconfigureOrigin {
    fn respond(self, callback: Callback<RaftResponse>, result: RaftResult<&Configuration>) {
        let response = match self {
            ReconfigureOrigin::Reconfigure => RaftResponse::Reconfigure(result.map(|configuration| {
                ReconfigureResponse {
                    index: configuration.index,
                    term: configuration.term,
                    timestamp: configuration.timestamp,
                    members: configuration.new_members.clone(),
                }
            })),
            ReconfigureOrigin::Join => RaftResponse::Join(result.map(|_| JoinResponse)),
            ReconfigureOrigin::Leave => RaftResponse::Leave(result.map(|_| LeaveResponse)),
        };
        callback.send(response);
    }
}

impl<L> Replica<L>
where
    L: Log<WriteAheadLogEntry> + 'static,
{
    pub(super) fn handle_configure(&mut self, request: ConfigureRequest) -> RaftResult<ConfigureResponse> {
        let current_term = self.current_term();
        if request.term < current_term {
            return Err(RaftError::stale_term(current_term));
        }
        if !self.observe_term(request.term, Some(request.leader.clone())) && self.election_state.is_candidate() {
            self.step_down(request.term, Some(request.leader.clone()));
        }

        if self.apply_configuration(request.configuration) {
            if self.membership.commit_if_reached(self.wal.commit_index()) {
                self.local_state
                    .store_configuration(self.membership.configuration().clone());
            }
        } else {
            slog::debug!(self.logger, "Ignoring configuration that isn't newer than ours");
        }

        self.election_state.set_leader_if_unknown(&request.leader);
        self.election_state.reset_timeout_if_follower();

        Ok(ConfigureResponse {
            term: self.current_term(),
        })
    }

    pub(super) fn handle_force_configure(
        &mut self,
        request: ForceConfigureRequest,
    ) -> RaftResult<ForceConfigureResponse> {
        let current_term = self.current_term();
        if request.term < current_term {
            return Err(RaftError::stale_term(current_term));
        }
        if !request.new_members.iter().any(|m| m.id() == &request.from) {
            return Err(RaftError::configuration(format!(
                "Sender {:?} is not among the new members",
                request.from
            )));
        }
        if !request.new_members.iter().any(|m| m.id() == &self.my_member_id) {
            return Err(RaftError::configuration("Not among the new members"));
        }

        self.local_state.store_term_if_increased(request.term);
        let term = self.current_term();

        let current = self.membership.configuration();
        if current.force {
            if !same_members(&current.new_members, &request.new_members) {
                return Err(RaftError::configuration(
                    "Already forced into a configuration with different members",
                ));
            }
            slog::info!(self.logger, "Already forced into {:?}", current);
            return Ok(ForceConfigureResponse {
                index: current.index,
                term: current.term,
            });
        }

        let forced = Configuration {
            index: cmp::max(request.index, Some(Index::following(current.index))),
            term,
            timestamp: request.timestamp,
            new_members: request.new_members,
            old_members: vec![],
            compaction_bound: current.compaction_bound,
            force: true,
        };
        slog::warn!(self.logger, "Forcing configuration {:?}", forced);
        self.membership.configure_committed(forced.clone());
        self.local_state.store_configuration(forced.clone());
        self.step_down(term, None);
        self.on_configuration_changed();

        Ok(ForceConfigureResponse {
            index: forced.index,
            term: forced.term,
        })
    }

    pub(super) fn handle_reconfigure(&mut self, request: ReconfigureRequest, callback: Callback<RaftResponse>) {
        if !self.election_state.is_leader() {
            return self.forward_to_leader(RaftRequest::Reconfigure(request), callback);
        }

        let origin = ReconfigureOrigin::Reconfigure;
        if let Err(e) = self.ensure_ready_to_reconfigure(Some((request.index, request.term))) {
            return origin.respond(callback, Err(e));
        }
        self.reconfigure(origin, request.members, callback);
    }

    pub(super) fn handle_join(&mut self, request: JoinRequest, callback: Callback<RaftResponse>) {
        if !self.election_state.is_leader() {
            return self.forward_to_leader(RaftRequest::Join(request), callback);
        }

        let origin = ReconfigureOrigin::Join;
        if let Err(e) = self.ensure_ready_to_reconfigure(None) {
            return origin.respond(callback, Err(e));
        }

        // A member that's already in the configuration joins with its new type.
        let joining = request.joining_member;
        let mut members: Vec<RaftMember> = self
            .membership
            .configuration()
            .new_members
            .iter()
            .filter(|m| m.id() != joining.id())
            .cloned()
            .collect();
        members.push(joining);

        self.reconfigure(origin, members, callback);
    }

    pub(super) fn handle_leave(&mut self, request: LeaveRequest, callback: Callback<RaftResponse>) {
        if !self.election_state.is_leader() {
            return self.forward_to_leader(RaftRequest::Leave(request), callback);
        }

        let origin = ReconfigureOrigin::Leave;
        if let Err(e) = self.ensure_ready_to_reconfigure(None) {
            return origin.respond(callback, Err(e));
        }

        let members: Vec<RaftMember> = self
            .membership
            .configuration()
            .new_members
            .iter()
            .filter(|m| m.id() != request.leaving_member.id())
            .cloned()
            .collect();
        if members.is_empty() {
            return origin.respond(callback, Err(RaftError::configuration("Cannot remove the last member")));
        }

        self.reconfigure(origin, members, callback);
    }

    fn forward_to_leader(&self, request: RaftRequest, callback: Callback<RaftResponse>) {
        match self.known_leader() {
            Some(leader_id) => {
                slog::debug!(self.logger, "Forwarding {} to leader {:?}", request.name(), leader_id);
                self.peers.spawn_forward(leader_id, request, callback);
            }
            None => callback.send(request.error_response(RaftError::no_leader())),
        }
    }

    /// Leader only. `expected` is the (index, term) of the configuration the requester based
    /// its change on, if it said.
    pub(super) fn ensure_ready_to_reconfigure(&self, expected: Option<(Option<Index>, Term)>) -> RaftResult<()> {
        let initial_entry_index = match self.election_state.leader_state() {
            Some(leader_state) => leader_state.initial_entry_index(),
            None => return Err(RaftError::no_leader()),
        };
        if self.wal.commit_index() < Some(initial_entry_index) {
            return Err(RaftError::configuration("Not ready to make configuration changes"));
        }

        let configuration = self.membership.configuration();
        if self.pending_reconfigure.is_some() || !self.membership.is_committed() || configuration.is_joint() {
            return Err(RaftError::configuration("Another configuration change is in progress"));
        }

        if let Some((index, term)) = expected {
            if index < configuration.index || term < configuration.term {
                return Err(RaftError::configuration("Stale configuration"));
            }
        }

        Ok(())
    }

    fn reconfigure(&mut self, origin: ReconfigureOrigin, members: Vec<RaftMember>, callback: Callback<RaftResponse>) {
        let current = self.membership.configuration().clone();
        if same_members(&current.new_members, &members) {
            return origin.respond(callback, Ok(&current));
        }

        // Joint consensus: configure(new, old) first.
        let joint = match self.append_configuration(members, current.new_members.clone(), current.compaction_bound) {
            Ok(joint) => joint,
            Err(e) => return origin.respond(callback, Err(io_error("Failed to append configuration", e))),
        };
        slog::info!(self.logger, "{:?}: entering joint configuration {:?}", origin, joint);

        self.pending_reconfigure = Some(PendingReconfigure {
            origin,
            callback,
            stage: ReconfigureStage::Joint(joint.index),
        });
        self.trigger_replication();
        self.advance_leader_commit();
    }

    /// Leader only. Appends a configuration entry, which takes effect right away.
    pub(super) fn append_configuration(
        &mut self,
        new_members: Vec<RaftMember>,
        old_members: Vec<RaftMember>,
        compaction_bound: Option<Index>,
    ) -> Result<Configuration, io::Error> {
        let term = self.current_term();
        let index = self.wal.next_index();
        let configuration = Configuration {
            index: Some(index),
            term,
            timestamp: chrono::Utc::now().timestamp_millis(),
            new_members,
            old_members,
            compaction_bound,
            force: false,
        };

        let appended_index = self.wal.append(WriteAheadLogEntry {
            term,
            payload: EntryPayload::Configuration(configuration.clone()),
        })?;
        assert_eq!(appended_index, index, "Appended configuration to unexpected index.");

        self.apply_configuration(configuration.clone());
        Ok(configuration)
    }

    pub(super) fn on_leader_configuration_committed(&mut self) {
        let configuration = self.membership.configuration().clone();

        if configuration.is_joint() {
            // Old and new members agree. Leave joint consensus with configure(new, []).
            match self.append_configuration(configuration.new_members.clone(), vec![], configuration.compaction_bound) {
                Ok(final_configuration) => {
                    slog::info!(self.logger, "Leaving joint configuration: {:?}", final_configuration);
                    if let Some(pending) = &mut self.pending_reconfigure {
                        if pending.stage == ReconfigureStage::Joint(configuration.index) {
                            pending.stage = ReconfigureStage::Final(final_configuration.index);
                        }
                    }
                    self.trigger_replication();
                    self.advance_leader_commit();
                }
                Err(e) => {
                    slog::error!(self.logger, "Failed to append final configuration: {:?}", e);
                    self.fail_pending_reconfigure(io_error("Failed to append configuration", e));
                }
            }
            return;
        }

        match self.pending_reconfigure.take() {
            Some(pending) if pending.stage == ReconfigureStage::Final(configuration.index) => {
                slog::info!(self.logger, "{:?} complete: {:?}", pending.origin, configuration);
                pending.origin.respond(pending.callback, Ok(&configuration));
            }
            other => self.pending_reconfigure = other,
        }

        // A leader that removed or demoted itself hands over now that it's committed.
        if self.membership.local_membership() != LocalMembership::Member(MemberType::Active) {
            slog::info!(self.logger, "No longer a voting member. Stepping down.");
            let term = self.current_term();
            self.step_down(term, None);
        }
    }

    /// A leader elected under a forced configuration, or under a committed joint one that its
    /// predecessor never got to leave, replaces it with configure(new, []) once its initial
    /// entry is committed. Nothing else can change the configuration until then.
    pub(super) fn leave_inherited_configuration_if_ready(&mut self) {
        let configuration = self.membership.configuration().clone();
        let inherited_joint = configuration.is_joint() && self.membership.is_committed();
        if !(configuration.force || inherited_joint) || self.pending_reconfigure.is_some() {
            return;
        }
        let initial_entry_index = match self.election_state.leader_state() {
            Some(leader_state) => leader_state.initial_entry_index(),
            None => return,
        };
        if self.wal.commit_index() < Some(initial_entry_index) {
            return;
        }

        match self.append_configuration(configuration.new_members, vec![], configuration.compaction_bound) {
            Ok(regular) => {
                slog::info!(self.logger, "Replacing inherited configuration with {:?}", regular);
                self.trigger_replication();
                self.advance_leader_commit();
            }
            Err(e) => slog::error!(self.logger, "Failed to replace inherited configuration: {:?}", e),
        }
    }

    pub(super) fn fail_pending_reconfigure(&mut self, error: RaftError) {
        if let Some(pending) = self.pending_reconfigure.take() {
            slog::info!(self.logger, "Failing {:?}: {}", pending.origin, error);
            pending.origin.respond(pending.callback, Err(error));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::MemberId;
    use crate::protocol::RaftErrorKind;
    use crate::replica::election::ElectionStateSnapshot;
    use crate::replica::replica_wiring::testing::{
        ack, append, elect_self, elect_with, record, request, send, test_replica, TestHarness, TestReplica,
    };

    fn passive(id: &str) -> RaftMember {
        RaftMember::new(MemberId::new(id), MemberType::Passive)
    }

    fn leader_of(members: Vec<RaftMember>) -> TestHarness {
        let mut harness = test_replica("a", members);
        elect_self(&mut harness.replica);
        harness
    }

    fn join(replica: &mut TestReplica, member: RaftMember) -> RaftResult<JoinResponse> {
        match request(replica, RaftRequest::Join(JoinRequest { joining_member: member })) {
            RaftResponse::Join(result) => result,
            other => panic!("Unexpected response {:?}", other),
        }
    }

    fn reconfigure(
        replica: &mut TestReplica,
        based_on: (Option<u64>, u64),
        members: Vec<RaftMember>,
    ) -> RaftResult<ReconfigureResponse> {
        let request_body = ReconfigureRequest {
            index: based_on.0.map(Index::new),
            term: Term::new(based_on.1),
            members,
            from: MemberId::new("a"),
        };
        match request(replica, RaftRequest::Reconfigure(request_body)) {
            RaftResponse::Reconfigure(result) => result,
            other => panic!("Unexpected response {:?}", other),
        }
    }

    fn force(
        replica: &mut TestReplica,
        term: u64,
        members: Vec<RaftMember>,
        from: &str,
    ) -> RaftResult<ForceConfigureResponse> {
        let request_body = ForceConfigureRequest {
            term: Term::new(term),
            index: None,
            timestamp: 1_600_000_000_000,
            new_members: members,
            from: MemberId::new(from),
        };
        match request(replica, RaftRequest::ForceConfigure(request_body)) {
            RaftResponse::ForceConfigure(result) => result,
            other => panic!("Unexpected response {:?}", other),
        }
    }

    fn configure(replica: &mut TestReplica, term: u64, configuration: Configuration) -> RaftResult<ConfigureResponse> {
        let request_body = ConfigureRequest {
            term: Term::new(term),
            leader: MemberId::new("b"),
            configuration,
        };
        match request(replica, RaftRequest::Configure(request_body)) {
            RaftResponse::Configure(result) => result,
            other => panic!("Unexpected response {:?}", other),
        }
    }

    fn configuration(index: u64, term: u64, members: Vec<RaftMember>) -> Configuration {
        Configuration {
            index: Some(Index::new(index)),
            term: Term::new(term),
            timestamp: 1_600_000_000_000,
            new_members: members,
            old_members: vec![],
            compaction_bound: None,
            force: false,
        }
    }

    fn three_members() -> Vec<RaftMember> {
        vec![RaftMember::active("a"), RaftMember::active("b"), RaftMember::active("c")]
    }

    #[tokio::test]
    async fn changes_without_a_known_leader_fail() {
        let mut harness = test_replica("a", three_members());

        let error = join(&mut harness.replica, passive("d")).unwrap_err();
        assert_eq!(error.kind, RaftErrorKind::NoLeader);
        let error = reconfigure(&mut harness.replica, (None, 0), vec![RaftMember::active("a")]).unwrap_err();
        assert_eq!(error.kind, RaftErrorKind::NoLeader);
    }

    #[tokio::test]
    async fn join_goes_through_joint_consensus() {
        let mut harness = leader_of(vec![RaftMember::active("a")]);
        let replica = &mut harness.replica;

        join(replica, passive("p")).unwrap();

        let info = replica.cluster_info();
        assert!(info.configuration_committed);
        // Initial entry, joint configuration, then the final one.
        assert_eq!(info.configuration.index, Some(Index::new(3)));
        assert!(!info.configuration.is_joint());
        assert!(same_members(
            &info.configuration.new_members,
            &[RaftMember::active("a"), passive("p")]
        ));
        assert!(replica.election_state.is_leader());
    }

    #[tokio::test]
    async fn rejoining_changes_member_type() {
        let mut harness = leader_of(vec![RaftMember::active("a"), passive("p")]);
        let replica = &mut harness.replica;

        join(replica, RaftMember::new(MemberId::new("p"), MemberType::Promotable)).unwrap();
        let configuration = replica.membership.configuration();
        assert!(!configuration.is_joint());
        assert_eq!(configuration.new_members.len(), 2);
        assert_eq!(
            configuration.member(&MemberId::new("p")).map(|m| m.member_type()),
            Some(MemberType::Promotable)
        );
    }

    #[tokio::test]
    async fn one_change_at_a_time() {
        let mut harness = leader_of(vec![RaftMember::active("a"), passive("p")]);
        let replica = &mut harness.replica;

        // The new voter has to ack before the joint configuration commits.
        let mut first = send(
            replica,
            RaftRequest::Join(JoinRequest {
                joining_member: RaftMember::active("q"),
            }),
        );
        assert!(first.try_recv().is_err());
        assert!(replica.membership.configuration().is_joint());

        let error = join(replica, passive("r")).unwrap_err();
        assert_eq!(error.kind, RaftErrorKind::ConfigurationError);
        assert_eq!(error.message, "Another configuration change is in progress");

        // Stepping down fails the change in flight.
        replica.observe_term(Term::new(5), None);
        match first.try_recv() {
            Ok(RaftResponse::Join(Err(e))) => assert_eq!(e.kind, RaftErrorKind::ProtocolError),
            other => panic!("Unexpected response {:?}", other),
        }
    }

    #[tokio::test]
    async fn reconfigure_must_be_based_on_current_configuration() {
        let mut harness = leader_of(vec![RaftMember::active("a")]);
        let replica = &mut harness.replica;
        join(replica, passive("p")).unwrap();

        let error = reconfigure(replica, (None, 0), vec![RaftMember::active("a")]).unwrap_err();
        assert_eq!(error.message, "Stale configuration");

        let response = reconfigure(replica, (Some(3), 1), vec![RaftMember::active("a")]).unwrap();
        assert_eq!(response.index, Some(Index::new(5)));
        assert_eq!(response.members, vec![RaftMember::active("a")]);
        assert_eq!(replica.membership.remote_member_ids(), Vec::<MemberId>::new());
    }

    #[tokio::test]
    async fn unchanged_members_answer_right_away() {
        let mut harness = leader_of(vec![RaftMember::active("a")]);
        let replica = &mut harness.replica;

        let response = reconfigure(replica, (None, 0), vec![RaftMember::active("a")]).unwrap();
        assert_eq!(response.index, None);
        assert_eq!(replica.wal.latest_index(), Some(Index::new(1)));
    }

    #[tokio::test]
    async fn last_member_cannot_leave() {
        let mut harness = leader_of(vec![RaftMember::active("a")]);
        let response = request(
            &mut harness.replica,
            RaftRequest::Leave(LeaveRequest {
                leaving_member: RaftMember::active("a"),
            }),
        );
        match response {
            RaftResponse::Leave(Err(e)) => assert_eq!(e.message, "Cannot remove the last member"),
            other => panic!("Unexpected response {:?}", other),
        }
    }

    #[tokio::test]
    async fn follower_installs_pushed_configuration() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;

        let mut members = three_members();
        members.push(passive("d"));
        let pushed = configuration(5, 2, members);
        assert_eq!(configure(replica, 2, pushed.clone()).unwrap().term, Term::new(2));

        let info = replica.cluster_info();
        assert_eq!(info.configuration, pushed);
        assert!(!info.configuration_committed);
        assert_eq!(info.leader, Some(MemberId::new("b")));

        // Older configurations are ignored.
        configure(replica, 2, configuration(4, 2, three_members())).unwrap();
        assert_eq!(replica.membership.configuration(), &pushed);

        let error = configure(replica, 1, configuration(9, 1, three_members())).unwrap_err();
        assert_eq!(error.term, Some(Term::new(2)));
    }

    #[tokio::test]
    async fn removed_follower_becomes_inactive() {
        let mut harness = test_replica("a", three_members());
        configure(
            &mut harness.replica,
            1,
            configuration(2, 1, vec![RaftMember::active("b"), RaftMember::active("c")]),
        )
        .unwrap();
        assert_eq!(harness.listener.current(), ElectionStateSnapshot::Inactive);
    }

    #[tokio::test]
    async fn force_configure_checks_membership() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;

        let error = force(replica, 0, vec![RaftMember::active("a")], "b").unwrap_err();
        assert_eq!(error.kind, RaftErrorKind::ConfigurationError);
        let error = force(replica, 0, vec![RaftMember::active("b")], "b").unwrap_err();
        assert_eq!(error.kind, RaftErrorKind::ConfigurationError);

        configure(replica, 3, configuration(2, 3, three_members())).unwrap();
        let error = force(replica, 2, vec![RaftMember::active("a")], "a").unwrap_err();
        assert_eq!(error.term, Some(Term::new(3)));
    }

    #[tokio::test]
    async fn forced_member_elects_itself_and_replaces_forced_configuration() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;

        let forced = force(replica, 0, vec![RaftMember::active("a")], "a").unwrap();
        assert_eq!(forced.index, Some(Index::new(1)));
        assert!(replica.membership.configuration().force);
        assert!(replica.membership.is_committed());

        // Retrying is harmless, forcing something else isn't allowed.
        assert_eq!(force(replica, 0, vec![RaftMember::active("a")], "a").unwrap(), forced);
        let error = force(replica, 0, vec![RaftMember::active("a"), RaftMember::active("b")], "a").unwrap_err();
        assert_eq!(error.kind, RaftErrorKind::ConfigurationError);

        // b and c no longer count, so a wins on its own.
        elect_self(replica);
        let info = replica.cluster_info();
        assert!(!info.configuration.force);
        assert!(info.configuration_committed);
        assert_eq!(info.configuration.term, Term::new(1));
        assert_eq!(info.configuration.new_members, vec![RaftMember::active("a")]);
    }

    #[tokio::test]
    async fn leader_leaves_joint_configuration_it_inherited() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;

        // b got as far as committing the joint configuration, then went away.
        let joint = Configuration {
            old_members: three_members(),
            ..configuration(
                2,
                1,
                vec![RaftMember::active("a"), RaftMember::active("b"), RaftMember::active("d")],
            )
        };
        let initialize = WriteAheadLogEntry {
            term: Term::new(1),
            payload: EntryPayload::Initialize,
        };
        let entries = vec![
            record(1, initialize),
            record(
                2,
                WriteAheadLogEntry {
                    term: Term::new(1),
                    payload: EntryPayload::Configuration(joint.clone()),
                },
            ),
        ];
        match request(replica, append(1, "b", None, Some(2), entries)) {
            RaftResponse::Append(Ok(response)) => assert!(response.succeeded),
            other => panic!("Unexpected response {:?}", other),
        }
        assert_eq!(replica.membership.configuration(), &joint);
        assert!(replica.membership.is_committed());

        // b is in both the old and the new members, so a and b are a joint majority.
        elect_with(replica, &["b"]);
        assert_eq!(replica.wal.latest_index(), Some(Index::new(3)));
        let error = replica.ensure_ready_to_reconfigure(None).unwrap_err();
        assert_eq!(error.message, "Not ready to make configuration changes");

        ack(replica, "b", 3);
        let configuration = replica.membership.configuration().clone();
        assert!(!configuration.is_joint());
        assert_eq!(configuration.index, Some(Index::new(4)));
        assert_eq!(configuration.term, Term::new(2));
        assert!(same_members(&configuration.new_members, &joint.new_members));

        ack(replica, "b", 4);
        assert!(replica.membership.is_committed());
        assert!(replica.election_state.is_leader());
        replica.ensure_ready_to_reconfigure(None).unwrap();
    }
}
