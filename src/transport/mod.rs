//! How a replica reaches other members. The replica only ever sees `RaftTransport`; what's behind
//! it is either gRPC or an in-process network.
mod grpc;
mod local;

pub(crate) use grpc::GrpcTransport;
pub use local::LocalNetwork;

use crate::membership::MemberId;
use crate::protocol::{MessageError, RaftRequest, RaftResponse};

#[derive(Debug, thiserror::Error)]
pub(crate) enum TransportError {
    #[error("No address known for member {0:?}")]
    UnknownMember(MemberId),
    #[error("Failed to connect to {member:?}: {message}")]
    Connect { member: MemberId, message: String },
    #[error("RPC failed: {0}")]
    Rpc(#[from] tonic::Status),
    #[error("Malformed response: {0}")]
    MalformedResponse(#[from] MessageError),
    #[error("Member {0:?} is unreachable")]
    Unreachable(MemberId),
    #[error("Remote replica has exited")]
    RemoteExited,
}

/// RaftTransport sends one request to one member and waits for its response. Callers apply their
/// own timeouts.
#[async_trait::async_trait]
pub(crate) trait RaftTransport: Send + Sync {
    async fn send(&self, to: &MemberId, request: RaftRequest) -> Result<RaftResponse, TransportError>;
}
