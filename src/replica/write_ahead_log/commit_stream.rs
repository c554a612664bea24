use crate::commitlog::Index;
use crate::replica::Term;
use bytes::Bytes;
use tokio::sync::mpsc;

pub(super) struct CommitStreamPublisher {
    sender: mpsc::UnboundedSender<CommitEvent>,
}

pub(crate) struct CommitStream {
    receiver: mpsc::UnboundedReceiver<CommitEvent>,
}

#[derive(Debug)]
pub(crate) enum CommitEvent {
    Entry(CommittedEntry),
    /// The log was replaced by a snapshot received from the leader. The application should
    /// restore its state machine from `data` before applying any later entries.
    SnapshotInstalled(InstalledSnapshot),
}

#[derive(Debug)]
pub(crate) struct CommittedEntry {
    pub(crate) term: Term,
    pub(crate) index: Index,
    pub(crate) data: Bytes,
}

#[derive(Debug)]
pub(crate) struct InstalledSnapshot {
    pub(crate) term: Term,
    pub(crate) index: Index,
    pub(crate) data: Bytes,
}

pub(super) fn new() -> (CommitStreamPublisher, CommitStream) {
    let (tx, rx) = mpsc::unbounded_channel();

    let publisher = CommitStreamPublisher { sender: tx };
    let stream = CommitStream { receiver: rx };

    (publisher, stream)
}

impl CommitStreamPublisher {
    pub(super) fn notify_commit(&self, logger: &slog::Logger, term: Term, index: Index, data: Bytes) {
        self.publish(logger, CommitEvent::Entry(CommittedEntry { term, index, data }));
    }

    pub(super) fn notify_snapshot_installed(&self, logger: &slog::Logger, term: Term, index: Index, data: Bytes) {
        self.publish(
            logger,
            CommitEvent::SnapshotInstalled(InstalledSnapshot { term, index, data }),
        );
    }

    fn publish(&self, logger: &slog::Logger, event: CommitEvent) {
        if self.sender.send(event).is_err() {
            slog::warn!(logger, "CommitStream has disconnected.");
        }
    }
}

impl CommitStream {
    pub(crate) async fn recv(&mut self) -> Option<CommitEvent> {
        self.receiver.recv().await
    }
}
