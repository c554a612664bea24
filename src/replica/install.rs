use crate::commitlog::Log;
use crate::protocol::{InstallRequest, InstallResponse, RaftError, RaftResult};
use crate::replica::replica::Replica;
use crate::replica::snapshot::ReceiveOutcome;
use crate::replica::write_ahead_log::WriteAheadLogEntry;

impl<L> Replica<L>
where
    L: Log<WriteAheadLogEntry> + 'static,
{
    pub(super) fn handle_install(&mut self, request: InstallRequest) -> RaftResult<InstallResponse> {
        if self.election_state.is_inactive() {
            return Err(RaftError::illegal_member_state("Not a member of the current configuration"));
        }

        let current_term = self.current_term();
        if request.current_term < current_term {
            return Err(RaftError::stale_term(current_term));
        }
        if !self.observe_term(request.current_term, Some(request.leader.clone())) {
            if self.election_state.is_candidate() {
                self.step_down(request.current_term, Some(request.leader.clone()));
            } else {
                self.election_state.set_leader_if_unknown(&request.leader);
            }
        }
        self.election_state.reset_timeout_if_follower();

        let outcome = self.snapshots.receive(&request, self.wal.commit_index())?;
        if let ReceiveOutcome::Installed(snapshot) = outcome {
            let descriptor = snapshot.descriptor;
            self.wal
                .reset_to_snapshot(descriptor.term, descriptor.index, snapshot.data);
            slog::info!(
                self.logger,
                "Log reset to snapshot {:?}. Next entry is {:?}",
                descriptor,
                self.wal.next_index()
            );
            self.on_commit_advanced();
        }

        Ok(InstallResponse {
            preferred_chunk_size: self.config.snapshot_chunk_size as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitlog::Index;
    use crate::membership::{MemberId, RaftMember};
    use crate::protocol::{ChunkId, RaftErrorKind, RaftRequest, RaftResponse, SnapshotChunk};
    use crate::replica::replica_wiring::testing::{app_entry, append, record, request, test_replica, TestReplica};
    use crate::replica::snapshot::Snapshot;
    use crate::replica::{CommitEvent, Term};
    use bytes::Bytes;

    fn three_members() -> Vec<RaftMember> {
        vec![RaftMember::active("a"), RaftMember::active("b"), RaftMember::active("c")]
    }

    fn install(
        replica: &mut TestReplica,
        term: u64,
        snapshot: &Snapshot,
        chunk: SnapshotChunk,
    ) -> RaftResult<InstallResponse> {
        let request_body = InstallRequest {
            current_term: Term::new(term),
            leader: MemberId::new("b"),
            snapshot: snapshot.descriptor,
            chunk,
        };
        match request(replica, RaftRequest::Install(request_body)) {
            RaftResponse::Install(result) => result,
            other => panic!("Unexpected response {:?}", other),
        }
    }

    fn chunk(offset: u64, data: &'static [u8], next: Option<u64>) -> SnapshotChunk {
        SnapshotChunk {
            chunk_id: ChunkId::new(offset),
            next_chunk_id: next.map(ChunkId::new),
            data: Bytes::from_static(data),
            initial: offset == 0,
            complete: next.is_none(),
        }
    }

    #[tokio::test]
    async fn installed_snapshot_replaces_log() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;
        let snapshot = Snapshot::new(Index::new(10), Term::new(1), Bytes::from_static(b"abcdef"));

        install(replica, 1, &snapshot, chunk(0, b"abc", Some(3))).unwrap();
        // Nothing changes until the last chunk arrives.
        assert_eq!(replica.wal.commit_index(), None);
        let response = install(replica, 1, &snapshot, chunk(3, b"def", None)).unwrap();
        assert_eq!(response.preferred_chunk_size, 1024);

        assert_eq!(replica.wal.commit_index(), Some(Index::new(10)));
        assert_eq!(replica.wal.next_index(), Index::new(11));
        match harness.commit_stream.recv().await {
            Some(CommitEvent::SnapshotInstalled(installed)) => {
                assert_eq!(installed.index, Index::new(10));
                assert_eq!(installed.data, Bytes::from_static(b"abcdef"));
            }
            other => panic!("Unexpected commit event {:?}", other),
        }

        // Replication carries on from the snapshot.
        let response = request(
            replica,
            append(1, "b", Some((1, 10)), Some(11), vec![record(11, app_entry(1, b"next"))]),
        );
        match response {
            RaftResponse::Append(Ok(response)) => assert!(response.succeeded),
            other => panic!("Unexpected response {:?}", other),
        }
        match harness.commit_stream.recv().await {
            Some(CommitEvent::Entry(entry)) => assert_eq!(entry.index, Index::new(11)),
            other => panic!("Unexpected commit event {:?}", other),
        }
    }

    #[tokio::test]
    async fn stale_term_is_rejected() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;
        request(replica, append(3, "c", None, None, vec![]));

        let snapshot = Snapshot::new(Index::new(10), Term::new(1), Bytes::from_static(b"abc"));
        let error = install(replica, 2, &snapshot, chunk(0, b"abc", None)).unwrap_err();
        assert_eq!(error.term, Some(Term::new(3)));
        assert_eq!(replica.wal.commit_index(), None);
    }

    #[tokio::test]
    async fn chunks_must_arrive_in_order() {
        let mut harness = test_replica("a", three_members());
        let snapshot = Snapshot::new(Index::new(10), Term::new(1), Bytes::from_static(b"abcdef"));

        let error = install(&mut harness.replica, 1, &snapshot, chunk(3, b"def", None)).unwrap_err();
        assert_eq!(error.kind, RaftErrorKind::IllegalMemberState);
    }

    #[tokio::test]
    async fn replayed_snapshot_is_installed_once() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;
        let snapshot = Snapshot::new(Index::new(10), Term::new(1), Bytes::from_static(b"abcdef"));

        for _ in 0..2 {
            install(replica, 1, &snapshot, chunk(0, b"abc", Some(3))).unwrap();
            install(replica, 1, &snapshot, chunk(3, b"def", None)).unwrap();
        }
        assert_eq!(replica.wal.commit_index(), Some(Index::new(10)));
        assert_eq!(replica.wal.next_index(), Index::new(11));

        assert!(matches!(
            harness.commit_stream.recv().await,
            Some(CommitEvent::SnapshotInstalled(_))
        ));
        let again = tokio::time::timeout(std::time::Duration::from_millis(50), harness.commit_stream.recv()).await;
        assert!(again.is_err(), "Snapshot was installed twice");
    }

    #[tokio::test]
    async fn append_discards_partial_snapshot() {
        let mut harness = test_replica("a", three_members());
        let replica = &mut harness.replica;
        let snapshot = Snapshot::new(Index::new(10), Term::new(1), Bytes::from_static(b"abcdef"));

        install(replica, 1, &snapshot, chunk(0, b"abc", Some(3))).unwrap();
        assert!(replica.snapshots.has_pending());

        request(replica, append(1, "b", None, None, vec![]));
        assert!(!replica.snapshots.has_pending());

        // The transfer has to start over.
        let error = install(replica, 1, &snapshot, chunk(3, b"def", None)).unwrap_err();
        assert_eq!(error.kind, RaftErrorKind::IllegalMemberState);
        assert_eq!(replica.wal.commit_index(), None);
    }
}
