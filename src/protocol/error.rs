use crate::replica::Term;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum RaftErrorKind {
    NoLeader,
    IllegalMemberState,
    ConfigurationError,
    ProtocolError,
    ApplicationError,
}

/// RaftError is the body of a response whose status is ERROR.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub(crate) struct RaftError {
    pub(crate) kind: RaftErrorKind,
    pub(crate) message: String,
    // Responder's term, set only when the request was rejected for carrying a stale term.
    pub(crate) term: Option<Term>,
}

impl RaftError {
    pub(crate) fn new(kind: RaftErrorKind, message: impl Into<String>) -> Self {
        RaftError {
            kind,
            message: message.into(),
            term: None,
        }
    }

    pub(crate) fn no_leader() -> Self {
        Self::new(RaftErrorKind::NoLeader, "No leader known")
    }

    pub(crate) fn illegal_member_state(message: impl Into<String>) -> Self {
        Self::new(RaftErrorKind::IllegalMemberState, message)
    }

    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::new(RaftErrorKind::ConfigurationError, message)
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::new(RaftErrorKind::ProtocolError, message)
    }

    pub(crate) fn application(message: impl Into<String>) -> Self {
        Self::new(RaftErrorKind::ApplicationError, message)
    }

    pub(crate) fn stale_term(local_term: Term) -> Self {
        RaftError {
            kind: RaftErrorKind::IllegalMemberState,
            message: format!("Request term is older than current term {:?}", local_term),
            term: Some(local_term),
        }
    }
}

/// MessageError is returned by message constructors when the fields are inconsistent. Malformed
/// messages never reach the replica.
#[derive(Debug, Eq, PartialEq, thiserror::Error)]
pub(crate) enum MessageError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Inconsistent log position: {0}")]
    InconsistentLogPosition(&'static str),
    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
}
