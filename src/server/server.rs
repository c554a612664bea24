use crate::actor::WeakActorClient;
use crate::grpc::grpc_raft_server::{GrpcRaft, GrpcRaftServer};
use crate::grpc::{
    ProtoAppendRequest, ProtoAppendResponse, ProtoConfigureRequest, ProtoConfigureResponse, ProtoForceConfigureRequest,
    ProtoForceConfigureResponse, ProtoInstallRequest, ProtoInstallResponse, ProtoJoinRequest, ProtoJoinResponse,
    ProtoLeaveRequest, ProtoLeaveResponse, ProtoPollRequest, ProtoPollResponse, ProtoReconfigureRequest,
    ProtoReconfigureResponse, ProtoVersionedAppendRequest, ProtoVoteRequest, ProtoVoteResponse,
};
use crate::protocol::{MessageError, RaftRequest, RaftResponse};
use crate::server::RpcServerShutdownSignal;
use crate::wire;
use std::net::SocketAddr;
use tonic::transport::Server;
use tonic::{Request, Response, Status};

/// RpcServer is the type that implements the Raft gRPC interface. Every request is decoded, handed
/// to the local replica, and its answer encoded back.
pub(crate) struct RpcServer {
    logger: slog::Logger,
    local_replica: WeakActorClient,
}

impl RpcServer {
    pub(crate) fn new(logger: slog::Logger, local_replica: WeakActorClient) -> Self {
        RpcServer { logger, local_replica }
    }

    pub(crate) async fn run(self, socket_addr: SocketAddr, shutdown_signal: RpcServerShutdownSignal) {
        let logger = self.logger.clone();
        slog::info!(logger, "Listening on '{:?}'", socket_addr);

        // TODO:2 if server port is unavailable, signal back to caller.
        let result = Server::builder()
            .add_service(GrpcRaftServer::new(self))
            .serve_with_shutdown(socket_addr, shutdown_signal.wait())
            .await;

        slog::info!(logger, "Server run() has exited: {:?}", result);
    }

    async fn dispatch(&self, request: RaftRequest) -> Result<RaftResponse, Status> {
        slog::debug!(self.logger, "ServerWire - {:?}", request);
        let response = self
            .local_replica
            .raft_request(request)
            .await
            .map_err(|e| Status::unavailable(e.to_string()))?;
        slog::debug!(self.logger, "ServerWire - {:?}", response);

        Ok(response)
    }
}

fn invalid_argument(e: MessageError) -> Status {
    Status::invalid_argument(e.to_string())
}

fn mismatched(response: RaftResponse) -> Status {
    Status::internal(format!("Replica answered with unexpected {:?}", response))
}

#[async_trait::async_trait]
impl GrpcRaft for RpcServer {
    async fn poll(&self, request: Request<ProtoPollRequest>) -> Result<Response<ProtoPollResponse>, Status> {
        let request = wire::convert_poll_request(request.into_inner()).map_err(invalid_argument)?;
        match self.dispatch(RaftRequest::Poll(request)).await? {
            RaftResponse::Poll(result) => Ok(Response::new(wire::proto_poll_response(result))),
            other => Err(mismatched(other)),
        }
    }

    async fn vote(&self, request: Request<ProtoVoteRequest>) -> Result<Response<ProtoVoteResponse>, Status> {
        let request = wire::convert_vote_request(request.into_inner()).map_err(invalid_argument)?;
        match self.dispatch(RaftRequest::Vote(request)).await? {
            RaftResponse::Vote(result) => Ok(Response::new(wire::proto_vote_response(result))),
            other => Err(mismatched(other)),
        }
    }

    async fn append(&self, request: Request<ProtoAppendRequest>) -> Result<Response<ProtoAppendResponse>, Status> {
        let request = wire::convert_append_request(request.into_inner()).map_err(invalid_argument)?;
        match self.dispatch(RaftRequest::Append(request)).await? {
            RaftResponse::Append(result) => Ok(Response::new(wire::proto_append_response(result))),
            other => Err(mismatched(other)),
        }
    }

    async fn versioned_append(
        &self,
        request: Request<ProtoVersionedAppendRequest>,
    ) -> Result<Response<ProtoAppendResponse>, Status> {
        let request = wire::convert_versioned_append_request(request.into_inner()).map_err(invalid_argument)?;
        match self.dispatch(RaftRequest::VersionedAppend(request)).await? {
            RaftResponse::Append(result) => Ok(Response::new(wire::proto_append_response(result))),
            other => Err(mismatched(other)),
        }
    }

    async fn install(&self, request: Request<ProtoInstallRequest>) -> Result<Response<ProtoInstallResponse>, Status> {
        let request = wire::convert_install_request(request.into_inner()).map_err(invalid_argument)?;
        match self.dispatch(RaftRequest::Install(request)).await? {
            RaftResponse::Install(result) => Ok(Response::new(wire::proto_install_response(result))),
            other => Err(mismatched(other)),
        }
    }

    async fn configure(
        &self,
        request: Request<ProtoConfigureRequest>,
    ) -> Result<Response<ProtoConfigureResponse>, Status> {
        let request = wire::convert_configure_request(request.into_inner()).map_err(invalid_argument)?;
        match self.dispatch(RaftRequest::Configure(request)).await? {
            RaftResponse::Configure(result) => Ok(Response::new(wire::proto_configure_response(result))),
            other => Err(mismatched(other)),
        }
    }

    async fn reconfigure(
        &self,
        request: Request<ProtoReconfigureRequest>,
    ) -> Result<Response<ProtoReconfigureResponse>, Status> {
        let request = wire::convert_reconfigure_request(request.into_inner()).map_err(invalid_argument)?;
        match self.dispatch(RaftRequest::Reconfigure(request)).await? {
            RaftResponse::Reconfigure(result) => Ok(Response::new(wire::proto_reconfigure_response(result))),
            other => Err(mismatched(other)),
        }
    }

    async fn force_configure(
        &self,
        request: Request<ProtoForceConfigureRequest>,
    ) -> Result<Response<ProtoForceConfigureResponse>, Status> {
        let request = wire::convert_force_configure_request(request.into_inner()).map_err(invalid_argument)?;
        match self.dispatch(RaftRequest::ForceConfigure(request)).await? {
            RaftResponse::ForceConfigure(result) => Ok(Response::new(wire::proto_force_configure_response(result))),
            other => Err(mismatched(other)),
        }
    }

    async fn join(&self, request: Request<ProtoJoinRequest>) -> Result<Response<ProtoJoinResponse>, Status> {
        let request = wire::convert_join_request(request.into_inner()).map_err(invalid_argument)?;
        match self.dispatch(RaftRequest::Join(request)).await? {
            RaftResponse::Join(result) => Ok(Response::new(wire::proto_join_response(result))),
            other => Err(mismatched(other)),
        }
    }

    async fn leave(&self, request: Request<ProtoLeaveRequest>) -> Result<Response<ProtoLeaveResponse>, Status> {
        let request = wire::convert_leave_request(request.into_inner()).map_err(invalid_argument)?;
        match self.dispatch(RaftRequest::Leave(request)).await? {
            RaftResponse::Leave(result) => Ok(Response::new(wire::proto_leave_response(result))),
            other => Err(mismatched(other)),
        }
    }
}
