use crate::commitlog::{Index, Log};
use crate::membership::{LocalMembership, MemberType};
use crate::protocol::{AppendResponse, InternalAppendRequest, RaftError, RaftResult};
use crate::replica::local_state::Term;
use crate::replica::replica::{io_error, Replica};
use crate::replica::write_ahead_log::{EntryPayload, WriteAheadLogEntry};
use std::cmp;
use std::convert::TryFrom;

impl<L> Replica<L>
where
    L: Log<WriteAheadLogEntry> + 'static,
{
    pub(super) fn handle_append(&mut self, request: InternalAppendRequest) -> RaftResult<AppendResponse> {
        if self.election_state.is_inactive() {
            return Err(RaftError::illegal_member_state("Not a member of the current configuration"));
        }

        // 1. Reply false if term < currentTerm (§5.1)
        let current_term = self.current_term();
        if request.term < current_term {
            slog::info!(self.logger, "Rejecting append from {:?}. Term is out of date.", request.leader);
            return Ok(self.append_response(false, self.wal.latest_index()));
        }

        if !self.observe_term(request.term, Some(request.leader.clone())) {
            if self.election_state.is_candidate() {
                // Someone else won this term.
                self.step_down(request.term, Some(request.leader.clone()));
            } else {
                self.election_state.set_leader_if_unknown(&request.leader);
            }
        }
        self.election_state.reset_timeout_if_follower();

        // The leader went back to sending entries.
        if self.snapshots.has_pending() {
            self.snapshots.abort_pending();
        }

        match self.try_append(&request) {
            Ok(response) => Ok(response),
            Err(e) => {
                slog::error!(self.logger, "Failed to append entries from {:?}: {:?}", request.leader, e);
                Err(e)
            }
        }
    }

    fn try_append(&mut self, request: &InternalAppendRequest) -> RaftResult<AppendResponse> {
        // 2. Reply false if [my] log doesn't contain an entry at [leader's]
        // prevLogIndex whose term matches [leader's] prevLogTerm (§5.3)
        if let Some((prev_term, prev_index)) = request.prev_log_entry {
            if Some(prev_index) > self.wal.latest_index() {
                slog::debug!(self.logger, "Missing previous entry {:?}", prev_index);
                return Ok(self.append_response(false, self.wal.latest_index()));
            }

            let my_prev_term = self
                .wal
                .term_at(prev_index)
                .map_err(|e| io_error("Failed to read previous entry", e))?;
            match my_prev_term {
                Some(term) if term == prev_term => {}
                Some(_) => {
                    slog::debug!(self.logger, "Term mismatch at previous entry {:?}", prev_index);
                    return Ok(self.append_response(false, prev_index.checked_minus(1)));
                }
                // Compacted past it. Everything a snapshot covers is committed, so it matches.
                None => {}
            }
        }

        // Passive members only take what's already committed.
        let append_limit = match self.membership.local_membership() {
            LocalMembership::Member(MemberType::Active) => None,
            _ => Some(request.commit_index),
        };

        // 3. If [my] existing entry conflicts with [leader's new entries]
        // (same index but different terms), delete [my] existing entry and
        // all that follow it (§5.3)
        // 4. Append any new entries not already in the log
        let mut last_new_entry = request.prev_log_entry.map(|(_, index)| index);
        for record in request.entries.iter() {
            if let Some(limit) = append_limit {
                if Some(record.index) > limit {
                    break;
                }
            }

            let expected_index = Index::following(last_new_entry);
            if record.index != expected_index {
                return Err(RaftError::protocol(format!(
                    "Expected entry {:?}, received {:?}",
                    expected_index, record.index
                )));
            }
            if !record.is_intact() {
                slog::warn!(self.logger, "Checksum mismatch for entry {:?}", record.index);
                return Ok(self.append_response(false, record.index.checked_minus(1)));
            }

            if self.should_append(record.index, record.term)? {
                let entry = WriteAheadLogEntry::try_from(record.serialized.to_vec())
                    .map_err(|e| RaftError::protocol(format!("Undecodable entry {:?}: {}", record.index, e)))?;
                if entry.term != record.term {
                    return Err(RaftError::protocol(format!(
                        "Entry {:?} claims term {:?} but holds {:?}",
                        record.index, record.term, entry.term
                    )));
                }

                let configuration = match &entry.payload {
                    EntryPayload::Configuration(configuration) => Some(configuration.clone()),
                    _ => None,
                };
                let appended_index = self
                    .wal
                    .append(entry)
                    .map_err(|e| io_error("Failed to append entry", e))?;
                assert_eq!(appended_index, record.index, "Appended log entry to unexpected index.");

                // Log terms never go down, so a configuration from an older term can't be at or
                // after this entry.
                let current = self.membership.configuration();
                if Some(record.index) <= current.index && record.term > current.term {
                    self.revert_configuration()?;
                }

                if let Some(configuration) = configuration {
                    self.apply_configuration(configuration);
                }
            }

            last_new_entry = Some(record.index);
        }

        // 5. If leaderCommit > commitIndex, set commitIndex = min(leaderCommit, index of last new entry)
        if let (Some(leader_commit), Some(last_new_entry)) = (request.commit_index, last_new_entry) {
            let new_commit_index = cmp::min(leader_commit, last_new_entry);
            if self.wal.ratchet_fwd_commit_index_if_increased(new_commit_index) {
                self.on_commit_advanced();
            }
        }

        Ok(self.append_response(true, self.wal.latest_index()))
    }

    /// Decides what to do with an incoming entry at `index`: skip it if we already have it,
    /// truncate our conflicting suffix if we don't.
    fn should_append(&mut self, index: Index, term: Term) -> RaftResult<bool> {
        // Committed entries can't conflict, and compacted ones are committed.
        if Some(index) <= self.wal.commit_index() || index < self.wal.first_index() {
            return Ok(false);
        }

        let existing_term = self
            .wal
            .term_at(index)
            .map_err(|e| io_error("Failed to read existing entry", e))?;
        match existing_term {
            None => Ok(true),
            Some(existing_term) if existing_term == term => Ok(false),
            Some(_) => {
                slog::info!(self.logger, "Truncating conflicting entries from {:?}", index);
                self.wal
                    .truncate(index)
                    .map_err(|e| io_error("Failed to truncate log", e))?;
                if self.membership.configuration().index >= Some(index) {
                    self.revert_configuration()?;
                }
                Ok(true)
            }
        }
    }

    /// The entry the current configuration came from is gone. Falls back to the latest
    /// configuration left in the log, or else the last committed one.
    fn revert_configuration(&mut self) -> RaftResult<()> {
        let floor = self.membership.last_committed_index();
        let first_index = self.wal.first_index();
        let mut found = None;
        let mut next = self.wal.latest_index();
        while let Some(index) = next {
            if Some(index) <= floor || index < first_index {
                break;
            }
            let entry = self
                .wal
                .read(index)
                .map_err(|e| io_error("Failed to read configuration", e))?;
            if let Some(WriteAheadLogEntry {
                payload: EntryPayload::Configuration(configuration),
                ..
            }) = entry
            {
                found = Some(configuration);
                break;
            }
            next = index.checked_minus(1);
        }

        let dropped = self.membership.configuration().index;
        self.membership.revert(found, self.wal.commit_index());
        slog::info!(
            self.logger,
            "Configuration at {:?} was truncated. Reverted to {:?}",
            dropped,
            self.membership.configuration()
        );
        self.on_configuration_changed();
        Ok(())
    }

    pub(super) fn append_response(&self, succeeded: bool, last_log_index: Option<Index>) -> AppendResponse {
        AppendResponse {
            term: self.current_term(),
            succeeded,
            last_log_index,
            last_snapshot_index: self.last_snapshot_index(),
            configuration_index: self.membership.configuration().index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{Configuration, MemberId, RaftMember};
    use crate::protocol::{RaftErrorKind, RaftRequest, RaftResponse};
    use crate::replica::election::ElectionStateSnapshot;
    use crate::replica::local_state::PersistentLocalState;
    use crate::replica::replica_wiring::testing::{app_entry, append, record, request, test_replica, TestReplica};
    use crate::replica::CommitEvent;
    use bytes::Bytes;

    fn three_members() -> Vec<RaftMember> {
        vec![RaftMember::active("a"), RaftMember::active("b"), RaftMember::active("c")]
    }

    fn initialize(term: u64) -> WriteAheadLogEntry {
        WriteAheadLogEntry {
            term: Term::new(term),
            payload: EntryPayload::Initialize,
        }
    }

    fn append_ok(replica: &mut TestReplica, req: RaftRequest) -> AppendResponse {
        match request(replica, req) {
            RaftResponse::Append(Ok(response)) => response,
            other => panic!("Unexpected response {:?}", other),
        }
    }

    #[tokio::test]
    async fn follower_appends_then_commits_on_heartbeat() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;

        let response = append_ok(
            replica,
            append(1, "b", None, None, vec![record(1, initialize(1)), record(2, app_entry(1, b"x"))]),
        );
        assert!(response.succeeded);
        assert_eq!(response.term, Term::new(1));
        assert_eq!(response.last_log_index, Some(Index::new(2)));
        assert_eq!(replica.wal.commit_index(), None);
        assert_eq!(
            harness.listener.current(),
            ElectionStateSnapshot::Follower(Some(MemberId::new("b")))
        );

        let response = append_ok(replica, append(1, "b", Some((1, 2)), Some(2), vec![]));
        assert!(response.succeeded);
        assert_eq!(replica.wal.commit_index(), Some(Index::new(2)));

        match harness.commit_stream.recv().await {
            Some(CommitEvent::Entry(entry)) => {
                assert_eq!(entry.index, Index::new(2));
                assert_eq!(entry.data, Bytes::from_static(b"x"));
            }
            other => panic!("Unexpected commit event {:?}", other),
        }
    }

    #[tokio::test]
    async fn leader_commit_is_capped_by_entries_received() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;

        append_ok(replica, append(1, "b", None, Some(5), vec![record(1, initialize(1))]));
        assert_eq!(replica.wal.commit_index(), Some(Index::new(1)));
    }

    #[tokio::test]
    async fn stale_leader_is_rejected() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;
        append_ok(replica, append(2, "b", None, None, vec![]));

        let response = append_ok(replica, append(1, "c", None, None, vec![record(1, initialize(1))]));
        assert!(!response.succeeded);
        assert_eq!(response.term, Term::new(2));
        assert_eq!(replica.wal.latest_index(), None);
    }

    #[tokio::test]
    async fn missing_previous_entry_is_reported() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;
        append_ok(replica, append(1, "b", None, None, vec![record(1, initialize(1))]));

        let response = append_ok(replica, append(1, "b", Some((1, 5)), None, vec![]));
        assert!(!response.succeeded);
        assert_eq!(response.last_log_index, Some(Index::new(1)));
    }

    #[tokio::test]
    async fn conflicting_suffix_is_truncated() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;
        append_ok(
            replica,
            append(
                1,
                "b",
                None,
                None,
                vec![
                    record(1, initialize(1)),
                    record(2, app_entry(1, b"lost")),
                    record(3, app_entry(1, b"lost too")),
                ],
            ),
        );

        // New leader in term 2 only agrees on the first entry.
        let response = append_ok(replica, append(2, "c", Some((1, 1)), None, vec![record(2, initialize(2))]));
        assert!(response.succeeded);
        assert_eq!(response.last_log_index, Some(Index::new(2)));
        assert_eq!(replica.wal.term_at(Index::new(2)).unwrap(), Some(Term::new(2)));
        assert_eq!(replica.wal.read(Index::new(3)).unwrap(), None);

        // Term mismatch at the previous entry asks the leader to back up.
        let response = append_ok(replica, append(3, "b", Some((3, 2)), None, vec![]));
        assert!(!response.succeeded);
        assert_eq!(response.last_log_index, Some(Index::new(1)));
    }

    #[tokio::test]
    async fn corrupt_entry_is_not_appended() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;

        let mut corrupt = record(1, app_entry(1, b"x"));
        corrupt.checksum ^= 1;
        let response = append_ok(replica, append(1, "b", None, None, vec![corrupt]));
        assert!(!response.succeeded);
        assert_eq!(response.last_log_index, None);
        assert_eq!(replica.wal.latest_index(), None);
    }

    #[tokio::test]
    async fn passive_members_only_append_committed_entries() {
        let mut harness = test_replica(
            "p",
            vec![RaftMember::active("b"), RaftMember::new(MemberId::new("p"), MemberType::Passive)],
        );
        let replica = &mut harness.replica;

        let response = append_ok(
            replica,
            append(1, "b", None, Some(1), vec![record(1, initialize(1)), record(2, app_entry(1, b"x"))]),
        );
        assert!(response.succeeded);
        assert_eq!(response.last_log_index, Some(Index::new(1)));
        assert_eq!(replica.wal.commit_index(), Some(Index::new(1)));
        assert_eq!(
            harness.listener.current(),
            ElectionStateSnapshot::Passive(Some(MemberId::new("b")))
        );
    }

    #[tokio::test]
    async fn non_members_reject_appends() {
        let mut harness = test_replica("stranger", three_members());
        match request(&mut harness.replica, append(1, "b", None, None, vec![])) {
            RaftResponse::Append(Err(e)) => assert_eq!(e.kind, RaftErrorKind::IllegalMemberState),
            other => panic!("Unexpected response {:?}", other),
        }
    }

    #[tokio::test]
    async fn configuration_takes_effect_before_commit() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;

        let mut members = three_members();
        members.push(RaftMember::new(MemberId::new("d"), MemberType::Passive));
        let configuration = Configuration {
            index: Some(Index::new(2)),
            term: Term::new(1),
            timestamp: 1_600_000_000_000,
            new_members: members,
            old_members: vec![],
            compaction_bound: None,
            force: false,
        };
        let entry = WriteAheadLogEntry {
            term: Term::new(1),
            payload: EntryPayload::Configuration(configuration.clone()),
        };

        append_ok(replica, append(1, "b", None, None, vec![record(1, initialize(1)), record(2, entry)]));
        let info = replica.cluster_info();
        assert_eq!(info.configuration, configuration);
        assert!(!info.configuration_committed);

        append_ok(replica, append(1, "b", Some((1, 2)), Some(2), vec![]));
        assert!(replica.cluster_info().configuration_committed);
        assert_eq!(replica.local_state.configuration(), Some(configuration));
    }

    fn with_passive_d(index: u64, term: u64) -> Configuration {
        let mut members = three_members();
        members.push(RaftMember::new(MemberId::new("d"), MemberType::Passive));
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

    #[tokio::test]
    async fn truncated_configuration_is_reverted() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;
        let bootstrap = replica.membership.configuration().clone();

        let entry = WriteAheadLogEntry {
            term: Term::new(2),
            payload: EntryPayload::Configuration(with_passive_d(2, 2)),
        };
        append_ok(replica, append(2, "b", None, Some(1), vec![record(1, initialize(2)), record(2, entry)]));
        assert_eq!(replica.membership.configuration(), &with_passive_d(2, 2));

        // c won term 3 without ever seeing the configuration.
        let response = append_ok(replica, append(3, "c", Some((2, 1)), None, vec![record(2, initialize(3))]));
        assert!(response.succeeded);
        assert_eq!(response.configuration_index, None);
        assert_eq!(replica.membership.configuration(), &bootstrap);
        assert!(replica.membership.is_committed());
        assert_eq!(replica.membership.remote_member_ids().len(), 2);
    }

    #[tokio::test]
    async fn configuration_left_in_the_log_survives_truncation() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;

        let configuration_entry = |configuration: Configuration| WriteAheadLogEntry {
            term: configuration.term,
            payload: EntryPayload::Configuration(configuration),
        };
        let mut later = with_passive_d(3, 1);
        later.new_members.pop();
        append_ok(
            replica,
            append(
                1,
                "b",
                None,
                None,
                vec![
                    record(1, initialize(1)),
                    record(2, configuration_entry(with_passive_d(2, 1))),
                    record(3, configuration_entry(later)),
                ],
            ),
        );
        assert_eq!(replica.membership.configuration().index, Some(Index::new(3)));

        append_ok(replica, append(2, "c", Some((1, 2)), None, vec![record(3, initialize(2))]));
        assert_eq!(replica.membership.configuration(), &with_passive_d(2, 1));
        assert!(!replica.membership.is_committed());
    }

    #[tokio::test]
    async fn pushed_configuration_is_dropped_by_entries_from_a_later_term() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;
        let bootstrap = replica.membership.configuration().clone();

        // Leader b of term 2 pushed its configuration ahead of the entries.
        assert!(replica.apply_configuration(with_passive_d(5, 2)));

        append_ok(replica, append(3, "c", None, None, vec![record(1, initialize(3))]));
        assert_eq!(replica.membership.configuration(), &bootstrap);
    }
}
