use crate::actor::{ActorExited, Callback, WeakActorClient};
use crate::membership::MemberId;
use crate::protocol::{RaftError, RaftRequest, RaftResponse};
use crate::replica::replica_api::{
    AppendReplyDescriptor, AppendReplyFromPeer, ConfigureReplyDescriptor, ConfigureReplyFromPeer, ElectionReply,
    ElectionReplyFromPeer, ElectionRequestKind, InstallReplyDescriptor, InstallReplyFromPeer, PeerReplyError,
};
use crate::replica::Term;
use crate::transport::RaftTransport;
use std::sync::Arc;
use std::time::Duration;

/// What to do with the reply of an outbound request.
#[derive(Debug)]
pub(super) enum ReplyRoute {
    Election { kind: ElectionRequestKind, term: Term },
    Append(AppendReplyDescriptor),
    Install(InstallReplyDescriptor),
    Configure(ConfigureReplyDescriptor),
}

/// PeerCaller sends requests to other members on spawned tasks. Every reply, including a
/// failure, comes back to the actor as an event.
#[derive(Clone)]
pub(super) struct PeerCaller {
    logger: slog::Logger,
    transport: Arc<dyn RaftTransport>,
    actor_client: WeakActorClient,
    rpc_timeout: Duration,
    // Forwarded membership changes are answered only once they commit on the leader.
    forward_timeout: Duration,
}

impl PeerCaller {
    pub(super) fn new(
        logger: slog::Logger,
        transport: Arc<dyn RaftTransport>,
        actor_client: WeakActorClient,
        rpc_timeout: Duration,
        forward_timeout: Duration,
    ) -> Self {
        PeerCaller {
            logger,
            transport,
            actor_client,
            rpc_timeout,
            forward_timeout,
        }
    }

    pub(super) fn actor_client(&self) -> &WeakActorClient {
        &self.actor_client
    }

    pub(super) fn spawn_call(&self, peer_id: MemberId, request: RaftRequest, route: ReplyRoute) {
        let caller = self.clone();
        tokio::task::spawn(async move {
            let logger = caller.logger.new(slog::o!("Peer" => peer_id.to_string()));
            let reply = caller.call(&logger, &peer_id, request, caller.rpc_timeout).await;
            if let Err(ActorExited) = notify(&caller.actor_client, peer_id, route, reply).await {
                slog::debug!(logger, "Replica exited before reply was handled");
            }
        });
    }

    /// Send a request on behalf of someone else (e.g. forwarding Join to the leader) and hand
    /// the response straight to `callback`.
    pub(super) fn spawn_forward(&self, peer_id: MemberId, request: RaftRequest, callback: Callback<RaftResponse>) {
        let caller = self.clone();
        tokio::task::spawn(async move {
            let logger = caller.logger.new(slog::o!("Peer" => peer_id.to_string()));
            let on_failure = request.error_response(RaftError::protocol(format!(
                "Failed to forward {} to leader {}",
                request.name(),
                peer_id
            )));
            let response = match caller.call(&logger, &peer_id, request, caller.forward_timeout).await {
                Ok(response) => response,
                Err(e) => {
                    slog::warn!(logger, "Forwarding failed: {:?}", e);
                    on_failure
                }
            };
            callback.send(response);
        });
    }

    async fn call(
        &self,
        logger: &slog::Logger,
        peer_id: &MemberId,
        request: RaftRequest,
        timeout: Duration,
    ) -> Result<RaftResponse, PeerReplyError> {
        slog::debug!(logger, "ClientWire - {:?}", request);
        let rpc_reply = tokio::time::timeout(timeout, self.transport.send(peer_id, request)).await;
        slog::debug!(logger, "ClientWire - {:?}", rpc_reply);

        match rpc_reply {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(PeerReplyError::Failed(e.to_string())),
            Err(_timeout) => Err(PeerReplyError::Failed(format!("Timed out after {:?}", timeout))),
        }
    }
}

async fn notify(
    actor_client: &WeakActorClient,
    peer_id: MemberId,
    route: ReplyRoute,
    reply: Result<RaftResponse, PeerReplyError>,
) -> Result<(), ActorExited> {
    match route {
        ReplyRoute::Election { kind, term } => {
            let result = match reply {
                Ok(RaftResponse::Poll(Ok(r))) => Ok(ElectionReply {
                    term: r.term,
                    accepted: r.accepted,
                }),
                Ok(RaftResponse::Vote(Ok(r))) => Ok(ElectionReply {
                    term: r.term,
                    accepted: r.accepted,
                }),
                Ok(RaftResponse::Poll(Err(e))) | Ok(RaftResponse::Vote(Err(e))) => Err(PeerReplyError::Error(e)),
                Ok(other) => Err(unexpected(&other)),
                Err(e) => Err(e),
            };
            actor_client
                .notify_election_reply_from_peer(ElectionReplyFromPeer {
                    peer_id,
                    kind,
                    term,
                    result,
                })
                .await
        }
        ReplyRoute::Append(descriptor) => {
            let result = match reply {
                Ok(RaftResponse::Append(Ok(r))) => Ok(r),
                Ok(RaftResponse::Append(Err(e))) => Err(PeerReplyError::Error(e)),
                Ok(other) => Err(unexpected(&other)),
                Err(e) => Err(e),
            };
            actor_client
                .notify_append_reply_from_peer(AppendReplyFromPeer { descriptor, result })
                .await
        }
        ReplyRoute::Install(descriptor) => {
            let result = match reply {
                Ok(RaftResponse::Install(Ok(r))) => Ok(r),
                Ok(RaftResponse::Install(Err(e))) => Err(PeerReplyError::Error(e)),
                Ok(other) => Err(unexpected(&other)),
                Err(e) => Err(e),
            };
            actor_client
                .notify_install_reply_from_peer(InstallReplyFromPeer { descriptor, result })
                .await
        }
        ReplyRoute::Configure(descriptor) => {
            let result = match reply {
                Ok(RaftResponse::Configure(Ok(r))) => Ok(r),
                Ok(RaftResponse::Configure(Err(e))) => Err(PeerReplyError::Error(e)),
                Ok(other) => Err(unexpected(&other)),
                Err(e) => Err(e),
            };
            actor_client
                .notify_configure_reply_from_peer(ConfigureReplyFromPeer { descriptor, result })
                .await
        }
    }
}

fn unexpected(response: &RaftResponse) -> PeerReplyError {
    PeerReplyError::Failed(format!("Unexpected response kind: {:?}", response))
}
