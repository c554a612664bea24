use crate::actor::{Callback, Event};
use crate::commitlog::Index;
use crate::protocol::{RaftRequest, RaftResponse, RaftResult};
use crate::replica;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Copy, thiserror::Error)]
#[error("Replica actor has exited")]
pub(crate) struct ActorExited;

/// ActorClient is the strong handle to the replica actor. The actor's event loop runs for as long
/// as at least one ActorClient exists.
#[derive(Clone)]
pub(crate) struct ActorClient {
    sender: mpsc::Sender<Event>,
}

/// WeakActorClient doesn't keep the actor alive. Used by anything the actor itself owns (timers,
/// in-flight RPC tasks) and by the RPC server, so they don't form a cycle.
#[derive(Clone)]
pub(crate) struct WeakActorClient {
    sender: mpsc::WeakSender<Event>,
}

impl ActorClient {
    pub(crate) fn new(buffer_size: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(buffer_size);
        (ActorClient { sender: tx }, rx)
    }

    pub(crate) fn weak(&self) -> WeakActorClient {
        WeakActorClient {
            sender: self.sender.downgrade(),
        }
    }

    pub(crate) async fn enqueue_for_replication(
        &self,
        input: replica::EnqueueForReplicationInput,
    ) -> Result<replica::EnqueueForReplicationOutput, replica::EnqueueForReplicationError> {
        let (tx, rx) = oneshot::channel();
        send(&self.sender, Event::EnqueueForReplication(input, Callback(tx)))
            .await
            .map_err(|_| replica::EnqueueForReplicationError::ActorExited)?;

        rx.await
            .unwrap_or(Err(replica::EnqueueForReplicationError::ActorExited))
    }

    pub(crate) async fn take_snapshot(
        &self,
        input: replica::TakeSnapshotInput,
    ) -> Result<replica::TakeSnapshotOutput, replica::TakeSnapshotError> {
        let (tx, rx) = oneshot::channel();
        send(&self.sender, Event::TakeSnapshot(input, Callback(tx)))
            .await
            .map_err(|_| replica::TakeSnapshotError::ActorExited)?;

        rx.await.unwrap_or(Err(replica::TakeSnapshotError::ActorExited))
    }

    pub(crate) async fn update_compaction_bound(&self, bound: Option<Index>) -> Result<RaftResult<()>, ActorExited> {
        let (tx, rx) = oneshot::channel();
        send(&self.sender, Event::UpdateCompactionBound(bound, Callback(tx))).await?;

        rx.await.map_err(|_| ActorExited)
    }

    pub(crate) async fn cluster_info(&self) -> Result<replica::ClusterInfo, ActorExited> {
        let (tx, rx) = oneshot::channel();
        send(&self.sender, Event::ClusterInfo(Callback(tx))).await?;

        rx.await.map_err(|_| ActorExited)
    }

    pub(crate) async fn raft_request(&self, request: RaftRequest) -> Result<RaftResponse, ActorExited> {
        raft_request(&self.sender, request).await
    }
}

impl WeakActorClient {
    fn upgrade(&self) -> Result<mpsc::Sender<Event>, ActorExited> {
        self.sender.upgrade().ok_or(ActorExited)
    }

    pub(crate) async fn raft_request(&self, request: RaftRequest) -> Result<RaftResponse, ActorExited> {
        raft_request(&self.upgrade()?, request).await
    }

    pub(crate) async fn notify_election_reply_from_peer(
        &self,
        reply: replica::ElectionReplyFromPeer,
    ) -> Result<(), ActorExited> {
        send(&self.upgrade()?, Event::ElectionReplyFromPeer(reply)).await
    }

    pub(crate) async fn notify_append_reply_from_peer(
        &self,
        reply: replica::AppendReplyFromPeer,
    ) -> Result<(), ActorExited> {
        send(&self.upgrade()?, Event::AppendReplyFromPeer(reply)).await
    }

    pub(crate) async fn notify_install_reply_from_peer(
        &self,
        reply: replica::InstallReplyFromPeer,
    ) -> Result<(), ActorExited> {
        send(&self.upgrade()?, Event::InstallReplyFromPeer(reply)).await
    }

    pub(crate) async fn notify_configure_reply_from_peer(
        &self,
        reply: replica::ConfigureReplyFromPeer,
    ) -> Result<(), ActorExited> {
        send(&self.upgrade()?, Event::ConfigureReplyFromPeer(reply)).await
    }

    pub(crate) async fn leader_timer(&self, tick: replica::LeaderTimerTick) -> Result<(), ActorExited> {
        send(&self.upgrade()?, Event::LeaderTimer(tick)).await
    }

    pub(crate) async fn follower_timeout(&self, term: replica::Term) -> Result<(), ActorExited> {
        send(&self.upgrade()?, Event::FollowerTimeout(term)).await
    }
}

async fn raft_request(sender: &mpsc::Sender<Event>, request: RaftRequest) -> Result<RaftResponse, ActorExited> {
    let (tx, rx) = oneshot::channel();
    send(sender, Event::Request(request, Callback(tx))).await?;

    rx.await.map_err(|_| ActorExited)
}

async fn send(sender: &mpsc::Sender<Event>, event: Event) -> Result<(), ActorExited> {
    sender.send(event).await.map_err(|_| ActorExited)
}
