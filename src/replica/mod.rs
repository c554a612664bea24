mod append;
mod compaction;
mod election;
mod election_handlers;
mod install;
mod local_state;
mod peer_call;
mod reconfigure;
mod replica;
mod replica_api;
mod replica_wiring;
mod replication;
mod snapshot;
mod write_ahead_log;

pub(crate) use election::ElectionStateChangeListener;
pub(crate) use election::ElectionStateSnapshot;
pub(crate) use local_state::Term;
pub(crate) use replica::Replica;
pub(crate) use replica::ReplicationConfig;
pub(crate) use replica_api::AppendReplyFromPeer;
pub(crate) use replica_api::ClusterInfo;
pub(crate) use replica_api::ConfigureReplyFromPeer;
pub(crate) use replica_api::ElectionReplyFromPeer;
pub(crate) use replica_api::EnqueueForReplicationError;
pub(crate) use replica_api::EnqueueForReplicationInput;
pub(crate) use replica_api::EnqueueForReplicationOutput;
pub(crate) use replica_api::InstallReplyFromPeer;
pub(crate) use replica_api::LeaderTimerTick;
pub(crate) use replica_api::TakeSnapshotError;
pub(crate) use replica_api::TakeSnapshotInput;
pub(crate) use replica_api::TakeSnapshotOutput;
pub(crate) use replica_wiring::create_replica;
pub(crate) use replica_wiring::ReplicaTiming;
pub(crate) use write_ahead_log::CommitEvent;
pub(crate) use write_ahead_log::CommitStream;
pub(crate) use write_ahead_log::WriteAheadLogEntry;
