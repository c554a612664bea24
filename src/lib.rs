mod actor;
mod api;
mod commitlog;
mod membership;
mod protocol;
mod replica;
mod server;
mod transport;
mod wire;
mod grpc {
    include!("../generated/raft.rs");
}

pub use api::try_create_raft_client;
pub use api::ClusterAdmin;
pub use api::ClusterAdminError;
pub use api::EnqueueEntryError;
pub use api::EnqueueEntryInput;
pub use api::EnqueueEntryOutput;
pub use api::RaftClient;
pub use api::RaftClientConfig;
pub use api::RaftClientCreationError;
pub use api::RaftClusterInfo;
pub use api::RaftCommitEvent;
pub use api::RaftCommitStream;
pub use api::RaftCommittedEntry;
pub use api::RaftConfiguration;
pub use api::RaftElectionState;
pub use api::RaftEntryId;
pub use api::RaftEvent;
pub use api::RaftEventListener;
pub use api::RaftLeaderInfo;
pub use api::RaftMemberInfo;
pub use api::RaftMemberType;
pub use api::RaftNetwork;
pub use api::RaftOptions;
pub use api::RaftRequestError;
pub use api::RaftRequestErrorKind;
pub use api::ReplicatedLog;
pub use api::TakeSnapshotError;
pub use api::TakeSnapshotOutput;
pub use transport::LocalNetwork;

// Learning 1: `create::{root_mod}` should not have any code. Just `mod` and `pub use` statements.
// Learning 2: All `mod` statements, anywhere, should not be `pub`. Only export `pub` via individual
//             use statements.
//
// This keeps the `crate::{root_mod}` root_mod only responsible for exporting types to the rest of
// crate, and allows me to organize my root_mod impl however I want.
