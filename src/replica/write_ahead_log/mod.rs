//! This module is a raft-specific commit log that wraps the generic commit log. Besides the log
//! itself, it owns commit/apply progress and the boundary left behind by compaction.

mod commit_stream;
mod log;
mod log_entry;

pub(crate) use commit_stream::CommitEvent;
pub(crate) use commit_stream::CommitStream;
pub(crate) use log_entry::EntryPayload;
pub(crate) use log_entry::WriteAheadLogEntry;

pub(crate) use log::WriteAheadLog;
