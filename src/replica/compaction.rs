use crate::commitlog::{Index, Log};
use crate::protocol::{RaftError, RaftResult};
use crate::replica::replica::{io_error, Replica};
use crate::replica::replica_api::{TakeSnapshotError, TakeSnapshotInput, TakeSnapshotOutput};
use crate::replica::snapshot::Snapshot;
use crate::replica::write_ahead_log::WriteAheadLogEntry;
use std::{cmp, io};

impl<L> Replica<L>
where
    L: Log<WriteAheadLogEntry> + 'static,
{
    /// Persist the application's snapshot at `input.index` and compact the log behind it.
    pub(crate) fn handle_take_snapshot(
        &mut self,
        input: TakeSnapshotInput,
    ) -> Result<TakeSnapshotOutput, TakeSnapshotError> {
        let index = input.index;
        let last_applied = self.wal.last_applied_index();
        if Some(index) > last_applied {
            return Err(TakeSnapshotError::NotApplied {
                requested: index,
                last_applied,
            });
        }
        if let Some(snapshot_index) = self.last_snapshot_index() {
            if index <= snapshot_index {
                return Err(TakeSnapshotError::AlreadyCovered(snapshot_index));
            }
        }

        let term = match self.wal.term_at(index).map_err(TakeSnapshotError::LocalIoError)? {
            Some(term) => term,
            None => return Err(TakeSnapshotError::AlreadyCovered(index)),
        };

        self.snapshots
            .store_mut()
            .persist(Snapshot::new(index, term, input.data))
            .map_err(|e| TakeSnapshotError::Store(e.to_string()))?;
        slog::info!(self.logger, "Persisted snapshot at {:?} (term {:?})", index, term);

        self.compact_to_snapshot().map_err(TakeSnapshotError::LocalIoError)?;

        Ok(TakeSnapshotOutput {
            snapshot_index: index,
            snapshot_term: term,
            first_log_index: self.wal.first_index(),
        })
    }

    /// Drop the entries the current snapshot covers, short of the compaction bound. Called again
    /// once a joint configuration is left.
    pub(super) fn compact_to_snapshot(&mut self) -> Result<(), io::Error> {
        let snapshot_index = match self.last_snapshot_index() {
            Some(index) => index,
            None => return Ok(()),
        };

        let configuration = self.membership.configuration();
        if configuration.is_joint() {
            // Members still catching up to the joint configuration may need these entries.
            slog::info!(self.logger, "Deferring compaction until the joint configuration is left");
            return Ok(());
        }

        let mut compact_before = snapshot_index.plus(1);
        if let Some(bound) = configuration.compaction_bound {
            compact_before = cmp::min(compact_before, bound);
        }
        self.wal.compact_before(compact_before)
    }

    /// Leader only. The bound travels to every member inside a new configuration entry.
    pub(crate) fn handle_update_compaction_bound(&mut self, bound: Option<Index>) -> RaftResult<()> {
        if !self.election_state.is_leader() {
            return Err(RaftError::no_leader());
        }
        self.ensure_ready_to_reconfigure(None)?;

        let configuration = self.membership.configuration().clone();
        if configuration.compaction_bound == bound {
            return Ok(());
        }

        let updated = self
            .append_configuration(configuration.new_members, vec![], bound)
            .map_err(|e| io_error("Failed to append configuration", e))?;
        slog::info!(self.logger, "Compaction bound is now {:?}", updated.compaction_bound);

        self.trigger_replication();
        self.advance_leader_commit();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::membership::{MemberId, MemberType, RaftMember};
    use crate::protocol::{JoinRequest, RaftErrorKind, RaftRequest};
    use crate::replica::local_state::Term;
    use crate::replica::replica_api::EnqueueForReplicationInput;
    use crate::replica::replica_wiring::testing::{ack, elect_self, send, test_replica, TestHarness, TestReplica};
    use bytes::Bytes;

    fn single_leader() -> TestHarness {
        let mut harness = test_replica("a", vec![RaftMember::active("a")]);
        elect_self(&mut harness.replica);
        harness
    }

    fn enqueue(replica: &mut TestReplica, count: usize) {
        for _ in 0..count {
            replica
                .handle_enqueue_for_replication(EnqueueForReplicationInput {
                    data: Bytes::from_static(b"entry"),
                })
                .unwrap();
        }
    }

    fn snapshot_at(index: u64) -> TakeSnapshotInput {
        TakeSnapshotInput {
            index: Index::new(index),
            data: Bytes::from(format!("state as of {}", index)),
        }
    }

    #[tokio::test]
    async fn snapshot_compacts_applied_entries() {
        let mut harness = single_leader();
        let replica = &mut harness.replica;
        enqueue(replica, 3);
        assert_eq!(replica.wal.last_applied_index(), Some(Index::new(4)));

        let output = replica.handle_take_snapshot(snapshot_at(3)).unwrap();
        assert_eq!(output.snapshot_index, Index::new(3));
        assert_eq!(output.snapshot_term, Term::new(1));
        assert_eq!(output.first_log_index, Index::new(4));
        assert_eq!(replica.last_snapshot_index(), Some(Index::new(3)));
        // The compacted boundary still answers for its term.
        assert_eq!(replica.wal.term_at(Index::new(3)).unwrap(), Some(Term::new(1)));

        match replica.handle_take_snapshot(snapshot_at(2)) {
            Err(TakeSnapshotError::AlreadyCovered(index)) => assert_eq!(index, Index::new(3)),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn snapshot_must_be_applied() {
        let mut harness = single_leader();
        match harness.replica.handle_take_snapshot(snapshot_at(10)) {
            Err(TakeSnapshotError::NotApplied {
                requested,
                last_applied,
            }) => {
                assert_eq!(requested, Index::new(10));
                assert_eq!(last_applied, Some(Index::new(1)));
            }
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn compaction_bound_holds_back_compaction() {
        let mut harness = single_leader();
        let replica = &mut harness.replica;

        replica.handle_update_compaction_bound(Some(Index::new(2))).unwrap();
        let info = replica.cluster_info();
        assert_eq!(info.configuration.compaction_bound, Some(Index::new(2)));
        assert!(info.configuration_committed);

        // Same bound again is a no-op.
        replica.handle_update_compaction_bound(Some(Index::new(2))).unwrap();
        assert_eq!(replica.wal.latest_index(), Some(Index::new(2)));

        enqueue(replica, 2);
        let output = replica.handle_take_snapshot(snapshot_at(4)).unwrap();
        assert_eq!(output.first_log_index, Index::new(2));
    }

    #[tokio::test]
    async fn joint_configuration_defers_compaction() {
        let mut harness = test_replica(
            "a",
            vec![RaftMember::active("a"), RaftMember::new(MemberId::new("p"), MemberType::Passive)],
        );
        let replica = &mut harness.replica;
        elect_self(replica);
        let mut pending = send(
            replica,
            RaftRequest::Join(JoinRequest {
                joining_member: RaftMember::active("q"),
            }),
        );
        assert!(replica.membership.configuration().is_joint());

        let output = replica.handle_take_snapshot(snapshot_at(1)).unwrap();
        assert_eq!(output.snapshot_index, Index::new(1));
        assert_eq!(output.first_log_index, Index::new(1));

        // Committing the joint configuration isn't enough.
        ack(replica, "q", 2);
        assert!(!replica.membership.configuration().is_joint());
        assert_eq!(replica.wal.first_index(), Index::new(1));

        ack(replica, "q", 3);
        assert!(replica.membership.is_committed());
        assert_eq!(replica.wal.first_index(), Index::new(2));
        assert!(pending.try_recv().is_ok());
    }

    #[tokio::test]
    async fn only_leader_updates_compaction_bound() {
        let mut harness = test_replica("a", vec![RaftMember::active("a"), RaftMember::active("b")]);
        let error = harness
            .replica
            .handle_update_compaction_bound(Some(Index::new(1)))
            .unwrap_err();
        assert_eq!(error.kind, RaftErrorKind::NoLeader);
    }
}
