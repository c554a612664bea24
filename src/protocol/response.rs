use crate::commitlog::Index;
use crate::membership::RaftMember;
use crate::protocol::RaftError;
use crate::replica::Term;

/// status=OK is `Ok(body)`, status=ERROR is `Err(RaftError)`.
pub(crate) type RaftResult<T> = Result<T, RaftError>;

#[derive(Debug)]
pub(crate) enum RaftResponse {
    Poll(RaftResult<PollResponse>),
    Vote(RaftResult<VoteResponse>),
    Append(RaftResult<AppendResponse>),
    Install(RaftResult<InstallResponse>),
    Configure(RaftResult<ConfigureResponse>),
    Reconfigure(RaftResult<ReconfigureResponse>),
    ForceConfigure(RaftResult<ForceConfigureResponse>),
    Join(RaftResult<JoinResponse>),
    Leave(RaftResult<LeaveResponse>),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct PollResponse {
    pub(crate) term: Term,
    pub(crate) accepted: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct VoteResponse {
    pub(crate) term: Term,
    pub(crate) accepted: bool,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct AppendResponse {
    pub(crate) term: Term,
    pub(crate) succeeded: bool,
    // On failure, the index the leader should continue from.
    pub(crate) last_log_index: Option<Index>,
    pub(crate) last_snapshot_index: Option<Index>,
    pub(crate) configuration_index: Option<Index>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct InstallResponse {
    pub(crate) preferred_chunk_size: u64,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ConfigureResponse {
    pub(crate) term: Term,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ReconfigureResponse {
    pub(crate) index: Option<Index>,
    pub(crate) term: Term,
    pub(crate) timestamp: i64,
    pub(crate) members: Vec<RaftMember>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ForceConfigureResponse {
    pub(crate) index: Option<Index>,
    pub(crate) term: Term,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct JoinResponse;

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct LeaveResponse;
