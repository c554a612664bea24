//! Messages exchanged between raft members, independent of any transport.
mod adapter;
mod error;
mod request;
mod response;

pub(crate) use adapter::InternalAppendRequest;
pub(crate) use adapter::ToInternalAppend;
pub(crate) use error::MessageError;
pub(crate) use error::RaftError;
pub(crate) use error::RaftErrorKind;
pub(crate) use request::log_entry_metadata;
pub(crate) use request::record_checksum;
pub(crate) use request::AppendRequest;
pub(crate) use request::ChunkId;
pub(crate) use request::ConfigureRequest;
pub(crate) use request::ForceConfigureRequest;
pub(crate) use request::InstallRequest;
pub(crate) use request::JoinRequest;
pub(crate) use request::LeaveRequest;
pub(crate) use request::PersistedRecord;
pub(crate) use request::PollRequest;
pub(crate) use request::RaftRequest;
pub(crate) use request::ReconfigureRequest;
pub(crate) use request::ReplicatableRecord;
pub(crate) use request::SnapshotChunk;
pub(crate) use request::SnapshotDescriptor;
pub(crate) use request::VersionedAppendRequest;
pub(crate) use request::VoteRequest;
pub(crate) use response::AppendResponse;
pub(crate) use response::ConfigureResponse;
pub(crate) use response::ForceConfigureResponse;
pub(crate) use response::InstallResponse;
pub(crate) use response::JoinResponse;
pub(crate) use response::LeaveResponse;
pub(crate) use response::PollResponse;
pub(crate) use response::RaftResponse;
pub(crate) use response::RaftResult;
pub(crate) use response::ReconfigureResponse;
pub(crate) use response::VoteResponse;

/// Append requests without a version field.
pub(crate) const LEGACY_PROTOCOL_VERSION: u32 = 1;
pub(crate) const CURRENT_PROTOCOL_VERSION: u32 = 2;
