use crate::actor::WeakActorClient;
use crate::commitlog::Log;
use crate::membership::{ClusterMembership, Configuration, MemberId};
use crate::replica::election::{ElectionConfig, ElectionState, ElectionStateChangeListener};
use crate::replica::local_state::{PersistentLocalState, VolatileLocalState};
use crate::replica::peer_call::PeerCaller;
use crate::replica::replica::{Replica, ReplicationConfig};
use crate::replica::snapshot::{InMemorySnapshotStore, SnapshotReceiver};
use crate::replica::write_ahead_log::{CommitStream, WriteAheadLog, WriteAheadLogEntry};
use crate::transport::RaftTransport;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug)]
pub(crate) struct ReplicaTiming {
    pub leader_heartbeat_duration: Duration,
    pub follower_min_timeout: Duration,
    pub follower_max_timeout: Duration,
    pub rpc_timeout: Duration,
    pub forward_timeout: Duration,
}

pub(crate) fn create_replica<L>(
    logger: slog::Logger,
    my_member_id: MemberId,
    bootstrap_configuration: Configuration,
    commit_log: L,
    transport: Arc<dyn RaftTransport>,
    actor_client: WeakActorClient,
    timing: ReplicaTiming,
    replication: ReplicationConfig,
) -> (Replica<L>, CommitStream, ElectionStateChangeListener)
where
    L: Log<WriteAheadLogEntry> + 'static,
{
    let local_state = VolatileLocalState::new(my_member_id.clone());

    // A restarted member resumes from the last configuration it saw committed.
    let configuration = local_state.configuration().unwrap_or(bootstrap_configuration);
    let membership = ClusterMembership::new(my_member_id.clone(), configuration);

    let (election_state, election_state_change_listener) = ElectionState::new(
        ElectionConfig {
            my_member_id,
            leader_heartbeat_duration: timing.leader_heartbeat_duration,
            follower_min_timeout: timing.follower_min_timeout,
            follower_max_timeout: timing.follower_max_timeout,
        },
        actor_client.clone(),
        membership.local_membership(),
        local_state.current_term(),
    );

    let (write_ahead_log, commit_stream) = WriteAheadLog::wired(logger.clone(), commit_log);
    let snapshots = SnapshotReceiver::new(logger.clone(), Box::new(InMemorySnapshotStore::new()));
    let peers = PeerCaller::new(
        logger.clone(),
        transport,
        actor_client,
        timing.rpc_timeout,
        timing.forward_timeout,
    );

    let replica = Replica::new(
        logger,
        membership,
        Box::new(local_state),
        election_state,
        write_ahead_log,
        snapshots,
        peers,
        replication,
    );

    (replica, commit_stream, election_state_change_listener)
}

#[cfg(test)]
pub(super) mod testing {
    use super::*;
    use crate::actor::{ActorClient, Callback, Event};
    use crate::commitlog::{Index, InMemoryLog};
    use crate::membership::RaftMember;
    use crate::protocol::{
        RaftRequest, RaftResponse, ReplicatableRecord, VersionedAppendRequest, CURRENT_PROTOCOL_VERSION,
    };
    use crate::replica::replica_api::{AppendReplyFromPeer, ElectionReply, ElectionReplyFromPeer, ElectionRequestKind};
    use crate::transport::LocalNetwork;
    use crate::replica::write_ahead_log::EntryPayload;
    use crate::replica::Term;
    use bytes::Bytes;
    use tokio::sync::{mpsc, oneshot};

    pub(in crate::replica) type TestReplica = Replica<InMemoryLog<WriteAheadLogEntry>>;

    /// A replica whose peers are never reachable. Timers are long enough that tests drive every
    /// transition by hand.
    pub(in crate::replica) struct TestHarness {
        pub(in crate::replica) replica: TestReplica,
        pub(in crate::replica) commit_stream: CommitStream,
        pub(in crate::replica) listener: ElectionStateChangeListener,
        // Replies and timer ticks the replica sent itself.
        pub(in crate::replica) actor_queue: mpsc::Receiver<Event>,
        network: LocalNetwork,
        _actor_client: ActorClient,
    }

    /// A member that only records what it's sent. The test answers through the callback.
    pub(in crate::replica) struct FakePeer {
        queue: mpsc::Receiver<Event>,
        _actor_client: ActorClient,
    }

    impl TestHarness {
        pub(in crate::replica) fn fake_peer(&self, member_id: &str) -> FakePeer {
            let (actor_client, queue) = ActorClient::new(16);
            self.network.register(MemberId::new(member_id), actor_client.weak());
            FakePeer {
                queue,
                _actor_client: actor_client,
            }
        }

        pub(in crate::replica) async fn next_append_reply(&mut self) -> AppendReplyFromPeer {
            loop {
                match self.actor_queue.recv().await {
                    Some(Event::AppendReplyFromPeer(reply)) => return reply,
                    Some(_) => continue,
                    None => panic!("Actor queue closed"),
                }
            }
        }
    }

    impl FakePeer {
        pub(in crate::replica) async fn next_request(&mut self) -> (RaftRequest, Callback<RaftResponse>) {
            match self.queue.recv().await {
                Some(Event::Request(request, callback)) => (request, callback),
                other => panic!("Unexpected event {:?}", other),
            }
        }
    }

    pub(in crate::replica) fn test_replica(me: &str, members: Vec<RaftMember>) -> TestHarness {
        let logger = slog::Logger::root(slog::Discard, slog::o!());
        let (actor_client, actor_queue) = ActorClient::new(256);
        let network = LocalNetwork::new();
        let transport = network.transport(MemberId::new(me));

        let (replica, commit_stream, listener) = create_replica(
            logger,
            MemberId::new(me),
            Configuration::bootstrap(members),
            InMemoryLog::create().unwrap(),
            Arc::new(transport),
            actor_client.weak(),
            ReplicaTiming {
                leader_heartbeat_duration: Duration::from_secs(5),
                follower_min_timeout: Duration::from_secs(30),
                follower_max_timeout: Duration::from_secs(60),
                rpc_timeout: Duration::from_millis(100),
                forward_timeout: Duration::from_millis(100),
            },
            ReplicationConfig {
                leader_step_down_timeout: Duration::from_secs(120),
                max_entries_per_append: 16,
                snapshot_chunk_size: 1024,
                snapshot_replication_threshold: None,
            },
        );

        TestHarness {
            replica,
            commit_stream,
            listener,
            actor_queue,
            network,
            _actor_client: actor_client,
        }
    }

    /// Hands `request` to the replica. The receiver holds the response if it was answered
    /// synchronously.
    pub(in crate::replica) fn send(replica: &mut TestReplica, request: RaftRequest) -> oneshot::Receiver<RaftResponse> {
        let (tx, rx) = oneshot::channel();
        replica.handle_request(request, Callback(tx));
        rx
    }

    pub(in crate::replica) fn request(replica: &mut TestReplica, request: RaftRequest) -> RaftResponse {
        send(replica, request)
            .try_recv()
            .expect("Request should be answered right away")
    }

    /// Runs the poll and election of a single voter cluster.
    pub(in crate::replica) fn elect_self(replica: &mut TestReplica) {
        let term = replica.current_term();
        replica.handle_follower_timeout(term);
        assert!(replica.election_state.is_leader(), "Expected to win the election");
    }

    /// Polls, then wins the election with the backing of `supporters`.
    pub(in crate::replica) fn elect_with(replica: &mut TestReplica, supporters: &[&str]) {
        let term = replica.current_term();
        replica.handle_follower_timeout(term);
        for peer_id in supporters {
            replica.handle_election_reply_from_peer(accepted(peer_id, ElectionRequestKind::Poll, term));
        }

        let term = replica.current_term();
        for peer_id in supporters {
            replica.handle_election_reply_from_peer(accepted(peer_id, ElectionRequestKind::Vote, term));
        }
        assert!(replica.election_state.is_leader(), "Expected to win the election");
    }

    pub(in crate::replica) fn accepted(peer_id: &str, kind: ElectionRequestKind, term: Term) -> ElectionReplyFromPeer {
        ElectionReplyFromPeer {
            peer_id: MemberId::new(peer_id),
            kind,
            term,
            result: Ok(ElectionReply { term, accepted: true }),
        }
    }

    /// Leader only. Records that `peer_id` holds everything up to `index`, then recomputes the
    /// commit index.
    pub(in crate::replica) fn ack(replica: &mut TestReplica, peer_id: &str, index: u64) {
        replica
            .election_state
            .leader_state_mut()
            .and_then(|leader_state| leader_state.peer_state_mut(&MemberId::new(peer_id)))
            .expect("Expected to lead, with the peer tracked")
            .record_append_success(Some(Index::new(index)));
        replica.advance_leader_commit();
    }

    pub(in crate::replica) fn app_entry(term: u64, data: &'static [u8]) -> WriteAheadLogEntry {
        WriteAheadLogEntry {
            term: Term::new(term),
            payload: EntryPayload::Application(Bytes::from_static(data)),
        }
    }

    pub(in crate::replica) fn record(index: u64, entry: WriteAheadLogEntry) -> ReplicatableRecord {
        let term = entry.term;
        ReplicatableRecord::new(Index::new(index), term, Bytes::from(Vec::<u8>::from(entry)))
    }

    /// `prev` is the (term, index) of the entry just before `entries`.
    pub(in crate::replica) fn append(
        term: u64,
        leader: &str,
        prev: Option<(u64, u64)>,
        commit_index: Option<u64>,
        entries: Vec<ReplicatableRecord>,
    ) -> RaftRequest {
        RaftRequest::VersionedAppend(VersionedAppendRequest {
            version: CURRENT_PROTOCOL_VERSION,
            term: Term::new(term),
            leader: MemberId::new(leader),
            prev_log_entry: prev.map(|(t, i)| (Term::new(t), Index::new(i))),
            commit_index: commit_index.map(Index::new),
            entries,
        })
    }
}
