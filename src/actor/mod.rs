mod client;
mod replica_actor;

pub(crate) use client::ActorClient;
pub(crate) use client::ActorExited;
pub(crate) use client::WeakActorClient;
pub(crate) use replica_actor::ReplicaActor;

use crate::commitlog::Index;
use crate::protocol::{RaftRequest, RaftResponse, RaftResult};
use crate::replica;
use std::fmt::Debug;
use tokio::sync::oneshot;

// Disk interaction is synchronous, on the actor's task. Anything that waits on the network is
// spawned and reports back to the actor as another event.
#[derive(Debug)]
pub(crate) enum Event {
    // Any raft RPC from another member. Most are answered before the next event is handled;
    // Reconfigure/Join/Leave on a leader are answered once the new configuration commits.
    Request(RaftRequest, Callback<RaftResponse>),

    // Leader: Append to local log, replicate later.
    // Other: Redirect.
    EnqueueForReplication(
        replica::EnqueueForReplicationInput,
        Callback<Result<replica::EnqueueForReplicationOutput, replica::EnqueueForReplicationError>>,
    ),
    TakeSnapshot(
        replica::TakeSnapshotInput,
        Callback<Result<replica::TakeSnapshotOutput, replica::TakeSnapshotError>>,
    ),
    UpdateCompactionBound(Option<Index>, Callback<RaftResult<()>>),
    ClusterInfo(Callback<replica::ClusterInfo>),

    // Replies to requests this replica sent. Stale replies are discarded by term/seq no.
    ElectionReplyFromPeer(replica::ElectionReplyFromPeer),
    AppendReplyFromPeer(replica::AppendReplyFromPeer),
    InstallReplyFromPeer(replica::InstallReplyFromPeer),
    ConfigureReplyFromPeer(replica::ConfigureReplyFromPeer),

    // Leader: Send whatever this peer needs next (configuration, snapshot chunk, or entries).
    LeaderTimer(replica::LeaderTimerTick),
    // Follower: Start polling for an election. Candidate: Restart election.
    FollowerTimeout(replica::Term),
}

#[derive(Debug)]
pub(crate) struct Callback<T: Debug>(pub(crate) oneshot::Sender<T>);

impl<T: Debug> Callback<T> {
    pub(crate) fn send(self, message: T) {
        // Requester may have given up waiting. That's fine.
        let _ = self.0.send(message);
    }
}
