use crate::api::cluster_admin::ClusterAdmin;
use crate::api::commit_stream::RaftCommitStream;
use crate::api::event_bus::RaftEventListener;
use crate::api::replicated_log::ReplicatedLog;
use crate::server::RpcServerShutdownHandle;

/// RaftClient is everything the application needs to work with one local raft member.
pub struct RaftClient {
    pub replicated_log: ReplicatedLog,
    pub commit_stream: RaftCommitStream,
    pub event_listener: RaftEventListener,
    pub cluster_admin: ClusterAdmin,
    // Only for members served over gRPC. The server stops when this is dropped.
    pub(crate) _server_shutdown_handle: Option<RpcServerShutdownHandle>,
}
