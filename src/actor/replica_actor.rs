use crate::actor::Event;
use crate::commitlog;
use crate::replica::{Replica, WriteAheadLogEntry};
use tokio::sync::mpsc;

/// ReplicaActor is replica logic in actor model.
pub(crate) struct ReplicaActor<L>
where
    L: commitlog::Log<WriteAheadLogEntry>,
{
    logger: slog::Logger,
    receiver: mpsc::Receiver<Event>,
    replica: Replica<L>,
}

impl<L> ReplicaActor<L>
where
    L: commitlog::Log<WriteAheadLogEntry> + 'static,
{
    pub(crate) fn new(logger: slog::Logger, receiver: mpsc::Receiver<Event>, replica: Replica<L>) -> Self {
        ReplicaActor {
            logger,
            receiver,
            replica,
        }
    }

    pub(crate) async fn run_event_loop(mut self) {
        while let Some(event) = self.receiver.recv().await {
            self.handle_event(event);
        }

        slog::info!(self.logger, "All actor clients dropped. Replica event loop exiting.");
    }

    // This must NOT be async. Any long running work must be spawned on another task and come back
    // to this actor as an event.
    fn handle_event(&mut self, event: Event) {
        slog::trace!(self.logger, "Event: {:?}", event);
        match event {
            Event::Request(request, callback) => {
                self.replica.handle_request(request, callback);
            }
            Event::EnqueueForReplication(input, callback) => {
                let result = self.replica.handle_enqueue_for_replication(input);
                callback.send(result);
            }
            Event::TakeSnapshot(input, callback) => {
                let result = self.replica.handle_take_snapshot(input);
                callback.send(result);
            }
            Event::UpdateCompactionBound(bound, callback) => {
                let result = self.replica.handle_update_compaction_bound(bound);
                callback.send(result);
            }
            Event::ClusterInfo(callback) => {
                callback.send(self.replica.cluster_info());
            }
            Event::ElectionReplyFromPeer(reply) => {
                self.replica.handle_election_reply_from_peer(reply);
            }
            Event::AppendReplyFromPeer(reply) => {
                self.replica.handle_append_reply_from_peer(reply);
            }
            Event::InstallReplyFromPeer(reply) => {
                self.replica.handle_install_reply_from_peer(reply);
            }
            Event::ConfigureReplyFromPeer(reply) => {
                self.replica.handle_configure_reply_from_peer(reply);
            }
            Event::LeaderTimer(tick) => {
                self.replica.handle_leader_timer(tick);
            }
            Event::FollowerTimeout(term) => {
                self.replica.handle_follower_timeout(term);
            }
        }
    }
}
