use crate::actor::ActorClient;
use crate::api::types::{RaftClusterInfo, RaftConfiguration, RaftMemberInfo, RaftMemberType, RaftRequestError};
use crate::commitlog::Index;
use crate::membership::{MemberId, RaftMember};
use crate::protocol::{
    ForceConfigureRequest, JoinRequest, LeaveRequest, RaftRequest, RaftResponse, ReconfigureRequest,
};
use crate::transport::RaftTransport;
use std::sync::Arc;
use std::time::Duration;

/// ClusterAdmin changes who's in the cluster. Requests go through the local replica, which hands
/// them to the leader.
#[derive(Clone)]
pub struct ClusterAdmin {
    logger: slog::Logger,
    my_member_id: MemberId,
    actor_client: ActorClient,
    transport: Arc<dyn RaftTransport>,
    request_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ClusterAdminError {
    #[error("Request rejected: {0}")]
    Rejected(#[from] RaftRequestError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Member {member_id} is unreachable: {message}")]
    Unreachable { member_id: String, message: String },
    #[error("Timed out waiting for the change to commit")]
    Timeout,
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("Replica task has exited")]
    ReplicaExited,
}

impl ClusterAdmin {
    pub(crate) fn new(
        logger: slog::Logger,
        my_member_id: MemberId,
        actor_client: ActorClient,
        transport: Arc<dyn RaftTransport>,
        request_timeout: Duration,
    ) -> Self {
        ClusterAdmin {
            logger,
            my_member_id,
            actor_client,
            transport,
            request_timeout,
        }
    }

    /// What the local replica currently knows. Followers may lag behind the leader.
    pub async fn cluster_info(&self) -> Result<RaftClusterInfo, ClusterAdminError> {
        self.actor_client
            .cluster_info()
            .await
            .map(RaftClusterInfo::from)
            .map_err(|_| ClusterAdminError::ReplicaExited)
    }

    pub async fn configuration(&self) -> Result<RaftConfiguration, ClusterAdminError> {
        self.cluster_info().await.map(|info| info.configuration)
    }

    /// Replace the members of the cluster. Returns once the new configuration is committed.
    pub async fn reconfigure(&self, members: Vec<RaftMemberInfo>) -> Result<RaftConfiguration, ClusterAdminError> {
        let info = self
            .actor_client
            .cluster_info()
            .await
            .map_err(|_| ClusterAdminError::ReplicaExited)?;
        let current = info.configuration;

        let request = ReconfigureRequest::new(
            current.index,
            current.term,
            members.into_iter().map(RaftMember::from).collect(),
            self.my_member_id.clone(),
        )
        .map_err(|e| ClusterAdminError::InvalidRequest(e.to_string()))?;

        slog::info!(self.logger, "Reconfiguring to {:?}", request.members);
        match self.send(&self.my_member_id, RaftRequest::Reconfigure(request)).await? {
            RaftResponse::Reconfigure(Ok(response)) => Ok(RaftConfiguration {
                index: response.index.map(|i| i.as_u64()),
                term: response.term.as_u64(),
                timestamp: response.timestamp,
                members: response.members.iter().map(RaftMemberInfo::from).collect(),
                old_members: vec![],
                compaction_bound: current.compaction_bound.map(|i| i.as_u64()),
                forced: false,
            }),
            RaftResponse::Reconfigure(Err(e)) => Err(RaftRequestError::from(e).into()),
            other => Err(unexpected(other)),
        }
    }

    /// Ask `contact_member_id`, which must already be in the cluster, to add this member.
    pub async fn join(&self, contact_member_id: &str, member_type: RaftMemberType) -> Result<(), ClusterAdminError> {
        let request = RaftRequest::Join(JoinRequest {
            joining_member: RaftMember::new(self.my_member_id.clone(), member_type.into()),
        });

        slog::info!(self.logger, "Joining as {:?} through {}", member_type, contact_member_id);
        match self.send(&MemberId::new(contact_member_id), request).await? {
            RaftResponse::Join(Ok(_)) => Ok(()),
            RaftResponse::Join(Err(e)) => Err(RaftRequestError::from(e).into()),
            other => Err(unexpected(other)),
        }
    }

    /// Remove this member from the cluster.
    pub async fn leave(&self) -> Result<(), ClusterAdminError> {
        let info = self
            .actor_client
            .cluster_info()
            .await
            .map_err(|_| ClusterAdminError::ReplicaExited)?;
        let leaving_member = info
            .configuration
            .member(&self.my_member_id)
            .cloned()
            .ok_or_else(|| ClusterAdminError::InvalidRequest("Not a member of the cluster".into()))?;

        slog::info!(self.logger, "Leaving the cluster");
        match self
            .send(&self.my_member_id, RaftRequest::Leave(LeaveRequest { leaving_member }))
            .await?
        {
            RaftResponse::Leave(Ok(_)) => Ok(()),
            RaftResponse::Leave(Err(e)) => Err(RaftRequestError::from(e).into()),
            other => Err(unexpected(other)),
        }
    }

    /// Install `members` as the committed configuration on every one of them, without a quorum
    /// of the current configuration. For recovering a cluster that lost its quorum for good.
    ///
    /// Every listed member must be reachable. Retrying with the same members is safe.
    pub async fn force_configure(&self, members: Vec<RaftMemberInfo>) -> Result<(), ClusterAdminError> {
        let info = self
            .actor_client
            .cluster_info()
            .await
            .map_err(|_| ClusterAdminError::ReplicaExited)?;

        let request = ForceConfigureRequest::new(
            info.term,
            info.configuration.index,
            chrono::Utc::now().timestamp_millis(),
            members.into_iter().map(RaftMember::from).collect(),
            self.my_member_id.clone(),
        )
        .map_err(|e| ClusterAdminError::InvalidRequest(e.to_string()))?;

        // Force ourselves first, then everyone else.
        let mut targets: Vec<MemberId> = request.new_members.iter().map(|m| m.id().clone()).collect();
        targets.sort_by_key(|member_id| *member_id != self.my_member_id);

        slog::warn!(self.logger, "Forcing configuration {:?}", request.new_members);
        for member_id in targets {
            match self
                .send(&member_id, RaftRequest::ForceConfigure(request.clone()))
                .await?
            {
                RaftResponse::ForceConfigure(Ok(response)) => {
                    slog::info!(self.logger, "{} forced at {:?}", member_id, response.index);
                }
                RaftResponse::ForceConfigure(Err(e)) => return Err(RaftRequestError::from(e).into()),
                other => return Err(unexpected(other)),
            }
        }

        Ok(())
    }

    /// Leader only. Members keep every entry at or after `bound` in their logs, regardless of
    /// snapshots. None lifts the bound.
    pub async fn update_compaction_bound(&self, bound: Option<u64>) -> Result<(), ClusterAdminError> {
        let bound = bound.and_then(Index::from_u64);
        self.actor_client
            .update_compaction_bound(bound)
            .await
            .map_err(|_| ClusterAdminError::ReplicaExited)?
            .map_err(|e| RaftRequestError::from(e).into())
    }

    async fn send(&self, to: &MemberId, request: RaftRequest) -> Result<RaftResponse, ClusterAdminError> {
        let call = async {
            if *to == self.my_member_id {
                self.actor_client
                    .raft_request(request)
                    .await
                    .map_err(|_| ClusterAdminError::ReplicaExited)
            } else {
                self.transport
                    .send(to, request)
                    .await
                    .map_err(|e| ClusterAdminError::Unreachable {
                        member_id: to.to_string(),
                        message: e.to_string(),
                    })
            }
        };

        tokio::time::timeout(self.request_timeout, call)
            .await
            .map_err(|_| ClusterAdminError::Timeout)?
    }
}

fn unexpected(response: RaftResponse) -> ClusterAdminError {
    ClusterAdminError::UnexpectedResponse(format!("{:?}", response))
}
