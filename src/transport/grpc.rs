use crate::grpc::grpc_raft_client::GrpcRaftClient;
use crate::membership::MemberId;
use crate::protocol::{RaftRequest, RaftResponse};
use crate::transport::{RaftTransport, TransportError};
use crate::wire;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use tonic::transport::{Channel, Endpoint};

/// GrpcTransport talks to other members over gRPC. Connections are made on first use and cached.
pub(crate) struct GrpcTransport {
    logger: slog::Logger,
    // Every member that may ever be in a configuration, including ones that haven't joined yet.
    addresses: HashMap<MemberId, SocketAddr>,
    clients: Mutex<HashMap<MemberId, GrpcRaftClient<Channel>>>,
}

impl GrpcTransport {
    pub(crate) fn new(logger: slog::Logger, addresses: HashMap<MemberId, SocketAddr>) -> Self {
        GrpcTransport {
            logger,
            addresses,
            clients: Mutex::new(HashMap::new()),
        }
    }

    async fn client(&self, member_id: &MemberId) -> Result<GrpcRaftClient<Channel>, TransportError> {
        if let Some(client) = self
            .clients
            .lock()
            .expect("GrpcTransport.client() mutex guard poison")
            .get(member_id)
        {
            return Ok(client.clone());
        }

        let addr = self
            .addresses
            .get(member_id)
            .ok_or_else(|| TransportError::UnknownMember(member_id.clone()))?;
        let url = format!("http://{}", addr);
        slog::info!(self.logger, "Connecting to {:?} at {} ...", member_id, url);

        let endpoint = Endpoint::from_shared(url).map_err(|e| connect_error(member_id, e))?;
        let channel = endpoint.connect().await.map_err(|e| connect_error(member_id, e))?;
        let client = GrpcRaftClient::new(channel);

        // Another request may have connected concurrently. Either connection is fine.
        self.clients
            .lock()
            .expect("GrpcTransport.client() mutex guard poison")
            .insert(member_id.clone(), client.clone());

        Ok(client)
    }
}

// Covers both the invalid uri and the failed connection.
fn connect_error<E: ToString>(member_id: &MemberId, e: E) -> TransportError {
    TransportError::Connect {
        member: member_id.clone(),
        message: e.to_string(),
    }
}

#[async_trait::async_trait]
impl RaftTransport for GrpcTransport {
    async fn send(&self, to: &MemberId, request: RaftRequest) -> Result<RaftResponse, TransportError> {
        let mut client = self.client(to).await?;

        let response = match request {
            RaftRequest::Poll(r) => {
                let reply = client.poll(wire::proto_poll_request(r)).await?.into_inner();
                RaftResponse::Poll(wire::convert_poll_response(reply)?)
            }
            RaftRequest::Vote(r) => {
                let reply = client.vote(wire::proto_vote_request(r)).await?.into_inner();
                RaftResponse::Vote(wire::convert_vote_response(reply)?)
            }
            RaftRequest::Append(r) => {
                let reply = client.append(wire::proto_append_request(r)).await?.into_inner();
                RaftResponse::Append(wire::convert_append_response(reply)?)
            }
            RaftRequest::VersionedAppend(r) => {
                let reply = client
                    .versioned_append(wire::proto_versioned_append_request(r))
                    .await?
                    .into_inner();
                RaftResponse::Append(wire::convert_append_response(reply)?)
            }
            RaftRequest::Install(r) => {
                let reply = client.install(wire::proto_install_request(r)).await?.into_inner();
                RaftResponse::Install(wire::convert_install_response(reply)?)
            }
            RaftRequest::Configure(r) => {
                let reply = client.configure(wire::proto_configure_request(r)).await?.into_inner();
                RaftResponse::Configure(wire::convert_configure_response(reply)?)
            }
            RaftRequest::Reconfigure(r) => {
                let reply = client
                    .reconfigure(wire::proto_reconfigure_request(r))
                    .await?
                    .into_inner();
                RaftResponse::Reconfigure(wire::convert_reconfigure_response(reply)?)
            }
            RaftRequest::ForceConfigure(r) => {
                let reply = client
                    .force_configure(wire::proto_force_configure_request(r))
                    .await?
                    .into_inner();
                RaftResponse::ForceConfigure(wire::convert_force_configure_response(reply)?)
            }
            RaftRequest::Join(r) => {
                let reply = client.join(wire::proto_join_request(r)).await?.into_inner();
                RaftResponse::Join(wire::convert_join_response(reply)?)
            }
            RaftRequest::Leave(r) => {
                let reply = client.leave(wire::proto_leave_request(r)).await?.into_inner();
                RaftResponse::Leave(wire::convert_leave_response(reply)?)
            }
        };

        Ok(response)
    }
}
