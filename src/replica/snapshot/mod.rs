//! Snapshot transfer. The leader reads a persisted snapshot as byte-offset chunks; followers
//! reassemble them in order and install the result atomically.
mod receiver;
mod sender;
mod store;

pub(crate) use receiver::ReceiveOutcome;
pub(crate) use receiver::SnapshotReceiver;
pub(crate) use sender::read_chunk;
pub(crate) use store::InMemorySnapshotStore;
pub(crate) use store::Snapshot;
pub(crate) use store::SnapshotStore;
pub(crate) use store::SnapshotStoreError;
pub(crate) use store::SNAPSHOT_VERSION;
