use crate::actor::WeakActorClient;
use crate::membership::MemberId;
use crate::protocol::{RaftRequest, RaftResponse};
use crate::transport::{RaftTransport, TransportError};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

/// LocalNetwork connects replicas running in the same process, without any sockets. Members can
/// be cut off and reconnected, which is what makes it useful for testing.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    state: Arc<Mutex<NetworkState>>,
}

#[derive(Default)]
struct NetworkState {
    members: HashMap<MemberId, WeakActorClient>,
    disconnected: HashSet<MemberId>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all traffic to and from `member_id` until `reconnect`.
    pub fn disconnect(&self, member_id: &str) {
        self.lock().disconnected.insert(MemberId::new(member_id));
    }

    pub fn reconnect(&self, member_id: &str) {
        self.lock().disconnected.remove(&MemberId::new(member_id));
    }

    pub(crate) fn register(&self, member_id: MemberId, replica: WeakActorClient) {
        self.lock().members.insert(member_id, replica);
    }

    pub(crate) fn transport(&self, me: MemberId) -> LocalTransport {
        LocalTransport {
            me,
            network: self.clone(),
        }
    }

    fn route(&self, from: &MemberId, to: &MemberId) -> Result<WeakActorClient, TransportError> {
        let state = self.lock();
        if state.disconnected.contains(from) || state.disconnected.contains(to) {
            return Err(TransportError::Unreachable(to.clone()));
        }

        state
            .members
            .get(to)
            .cloned()
            .ok_or_else(|| TransportError::UnknownMember(to.clone()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        self.state.lock().expect("LocalNetwork mutex guard poison")
    }
}

/// One member's view of a LocalNetwork.
pub(crate) struct LocalTransport {
    me: MemberId,
    network: LocalNetwork,
}

#[async_trait::async_trait]
impl RaftTransport for LocalTransport {
    async fn send(&self, to: &MemberId, request: RaftRequest) -> Result<RaftResponse, TransportError> {
        let replica = self.network.route(&self.me, to)?;
        let response = replica
            .raft_request(request)
            .await
            .map_err(|_| TransportError::RemoteExited)?;

        // The link may have been cut while the request was in flight.
        self.network.route(&self.me, to)?;
        Ok(response)
    }
}
