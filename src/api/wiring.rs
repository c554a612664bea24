use crate::actor::{ActorClient, ReplicaActor};
use crate::api::client::RaftClient;
use crate::api::cluster_admin::ClusterAdmin;
use crate::api::commit_stream::RaftCommitStream;
use crate::api::event_bus::RaftEventListener;
use crate::api::options::{RaftOptions, RaftOptionsValidated};
use crate::api::replicated_log::ReplicatedLog;
use crate::api::types::RaftMemberInfo;
use crate::commitlog::InMemoryLog;
use crate::membership::{Configuration, MemberId, RaftMember};
use crate::replica::{self, ReplicaTiming, ReplicationConfig};
use crate::server::{self, RpcServer};
use crate::transport::{GrpcTransport, LocalNetwork, RaftTransport};
use std::collections::{HashMap, HashSet};
use std::convert::TryFrom;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

pub struct RaftClientConfig {
    pub my_member_id: String,
    // The cluster's first configuration. Leave empty on a member that will join an existing
    // cluster through `ClusterAdmin::join()`.
    pub bootstrap_members: Vec<RaftMemberInfo>,
    pub network: RaftNetwork,
    pub info_logger: slog::Logger,
    pub options: RaftOptions,
}

/// How members reach each other.
pub enum RaftNetwork {
    Grpc {
        listen_addr: SocketAddr,
        // Every member that may ever be part of the cluster, joiners included.
        member_addrs: HashMap<String, SocketAddr>,
    },
    /// In-process, for tests and embedding several members in one process.
    Local(LocalNetwork),
}

#[derive(Debug, thiserror::Error)]
pub enum RaftClientCreationError {
    #[error("Invalid cluster info: {0}")]
    InvalidClusterInfo(String),
    #[error("Illegal options for configuring client: {0}")]
    IllegalClientOptions(String),
    #[error("Log initialization failure")]
    LogInitialization(io::Error),
}

pub async fn try_create_raft_client(config: RaftClientConfig) -> Result<RaftClient, RaftClientCreationError> {
    let root_logger = config.info_logger;

    let options = RaftOptionsValidated::try_from(config.options)
        .map_err(|e| RaftClientCreationError::IllegalClientOptions(e.to_string()))?;

    let my_member_id = MemberId::new(config.my_member_id);
    let bootstrap_configuration = bootstrap_configuration(config.bootstrap_members)?;

    let commit_log = InMemoryLog::create().map_err(RaftClientCreationError::LogInitialization)?;

    let (actor_client, actor_queue_rx) = ActorClient::new(64);

    let (transport, rpc_listen_addr) = match config.network {
        RaftNetwork::Grpc {
            listen_addr,
            member_addrs,
        } => {
            let addresses = member_addrs
                .into_iter()
                .map(|(member_id, addr)| (MemberId::new(member_id), addr))
                .collect();
            let transport: Arc<dyn RaftTransport> = Arc::new(GrpcTransport::new(root_logger.clone(), addresses));
            (transport, Some(listen_addr))
        }
        RaftNetwork::Local(network) => {
            network.register(my_member_id.clone(), actor_client.weak());
            let transport: Arc<dyn RaftTransport> = Arc::new(network.transport(my_member_id.clone()));
            (transport, None)
        }
    };

    let (replica, replica_commit_stream, election_state_change_listener) = replica::create_replica(
        root_logger.clone(),
        my_member_id.clone(),
        bootstrap_configuration,
        commit_log,
        transport.clone(),
        actor_client.weak(),
        ReplicaTiming {
            leader_heartbeat_duration: options.leader_heartbeat_duration,
            follower_min_timeout: options.follower_min_timeout,
            follower_max_timeout: options.follower_max_timeout,
            rpc_timeout: options.leader_rpc_timeout,
            forward_timeout: options.admin_request_timeout,
        },
        ReplicationConfig {
            leader_step_down_timeout: options.leader_step_down_timeout,
            max_entries_per_append: options.max_entries_per_append,
            snapshot_chunk_size: options.snapshot_chunk_size,
            snapshot_replication_threshold: options.snapshot_replication_threshold,
        },
    );

    let replica_actor = ReplicaActor::new(root_logger.clone(), actor_queue_rx, replica);
    tokio::spawn(replica_actor.run_event_loop());

    let server_shutdown_handle = rpc_listen_addr.map(|listen_addr| {
        let (server_shutdown_handle, server_shutdown_signal) = server::shutdown_signal();
        let replica_raft_server = RpcServer::new(root_logger.clone(), actor_client.weak());
        tokio::spawn(replica_raft_server.run(listen_addr, server_shutdown_signal));
        server_shutdown_handle
    });

    let cluster_admin = ClusterAdmin::new(
        root_logger,
        my_member_id,
        actor_client.clone(),
        transport,
        options.admin_request_timeout,
    );

    Ok(RaftClient {
        replicated_log: ReplicatedLog::new(actor_client),
        commit_stream: RaftCommitStream::new(replica_commit_stream),
        event_listener: RaftEventListener::new(election_state_change_listener),
        cluster_admin,
        _server_shutdown_handle: server_shutdown_handle,
    })
}

fn bootstrap_configuration(members: Vec<RaftMemberInfo>) -> Result<Configuration, RaftClientCreationError> {
    let mut seen = HashSet::with_capacity(members.len());
    for member in members.iter() {
        if !seen.insert(member.member_id.as_str()) {
            return Err(RaftClientCreationError::InvalidClusterInfo(format!(
                "Member {} is listed twice",
                member.member_id
            )));
        }
    }

    Ok(Configuration::bootstrap(
        members.into_iter().map(RaftMember::from).collect(),
    ))
}
