use crate::commitlog;
use crate::commitlog::Index;
use crate::protocol::ReplicatableRecord;
use crate::replica::write_ahead_log::commit_stream;
use crate::replica::write_ahead_log::commit_stream::CommitStreamPublisher;
use crate::replica::write_ahead_log::log_entry::EntryPayload;
use crate::replica::{CommitStream, Term, WriteAheadLogEntry};
use bytes::Bytes;
use std::io;

/// WriteAheadLog is the raft-specific log facade.
///
/// Note: A log entry has 3 states (not modeled directly in code):
/// 1. Persisted - written to disk, not yet replicated to majority
/// 2. Committed - written to disk, replicated to majority
/// 3. Applied - a committed entry that has also been applied to the state machine
///
/// A log entry's state has no global truth. Each replica will have their own local view of what
/// state the log entry is in.
///
/// Once a snapshot exists, the prefix of the log it covers may be compacted away. The last
/// compacted entry's (term, index) is remembered so it can still serve as a previous entry for
/// appends.
pub(crate) struct WriteAheadLog<L>
where
    L: commitlog::Log<WriteAheadLogEntry>,
{
    // Application's info/debug log.
    logger: slog::Logger,

    // This is the log that we're replicating.
    log: L,
    // Metadata about the highest log entry that we've locally written. It must be updated atomically.
    latest_entry_metadata: Option<(Term, Index)>,
    // Highest entry that is no longer readable from `log`.
    compacted_through: Option<(Term, Index)>,

    // Commit stream to publish committed entries to. To be consumed by the application layer to
    // apply committed entries to their state machine.
    commit_stream: CommitStreamPublisher,
    // Index of highest log entry known to be committed. None if nothing is committed.
    commit_index: Option<Index>,
    // Index of highest log entry applied to state machine. None if nothing is applied.
    last_applied_index: Option<Index>,
}

impl<L> WriteAheadLog<L>
where
    L: commitlog::Log<WriteAheadLogEntry>,
{
    pub(in super::super) fn wired(logger: slog::Logger, log: L) -> (Self, CommitStream) {
        // TODO:3 properly initialize based on existing log. For now, always assume empty log.
        assert_eq!(
            log.next_index(),
            Index::start_index(),
            "We only know how to handle initialization of an empty log."
        );

        let (commit_stream, stream) = commit_stream::new();
        let wal = WriteAheadLog {
            logger,
            log,
            latest_entry_metadata: None,
            compacted_through: None,
            commit_stream,
            commit_index: None,
            last_applied_index: None,
        };

        (wal, stream)
    }

    pub(crate) fn latest_entry(&self) -> Option<(Term, Index)> {
        self.latest_entry_metadata
    }

    pub(crate) fn latest_index(&self) -> Option<Index> {
        self.latest_entry_metadata.map(|(_, index)| index)
    }

    pub(crate) fn compacted_through(&self) -> Option<(Term, Index)> {
        self.compacted_through
    }

    /// Lowest index still readable.
    pub(crate) fn first_index(&self) -> Index {
        self.log.first_index()
    }

    pub(crate) fn next_index(&self) -> Index {
        self.log.next_index()
    }

    pub(crate) fn read(&self, index: Index) -> Result<Option<WriteAheadLogEntry>, io::Error> {
        self.log.read(index)
    }

    fn read_required(&self, index: Index) -> Result<WriteAheadLogEntry, io::Error> {
        match self.read(index)? {
            Some(entry) => Ok(entry),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("No log entry for index {:?}", index),
            )),
        }
    }

    /// Term of the entry at `index`, counting the compacted boundary as an entry. None if the
    /// index is past the end of the log, or compacted beyond the boundary.
    pub(crate) fn term_at(&self, index: Index) -> Result<Option<Term>, io::Error> {
        if let Some((term, compacted_index)) = self.compacted_through {
            if index == compacted_index {
                return Ok(Some(term));
            }
        }

        Ok(self.read(index)?.map(|entry| entry.term))
    }

    /// Remove anything starting at `index` and later.
    pub(crate) fn truncate(&mut self, index: Index) -> Result<(), io::Error> {
        if let Some(commit_index) = self.commit_index {
            assert!(
                index > commit_index,
                "Can't truncate committed entries. Expected [input] {:?} > {:?} [commit index]",
                index,
                commit_index,
            );
        }

        let mut new_latest_entry_metadata = None;
        if let Some(new_latest_entry_index) = index.checked_minus(1) {
            new_latest_entry_metadata = self
                .term_at(new_latest_entry_index)?
                .map(|term| (term, new_latest_entry_index));
        }

        // Only update log after we've successfully read what new state will be.
        self.log.truncate(index);

        self.latest_entry_metadata = new_latest_entry_metadata;
        Ok(())
    }

    pub(crate) fn append(&mut self, entry: WriteAheadLogEntry) -> Result<Index, io::Error> {
        let appended_term = entry.term;
        let appended_index = self.log.append(entry)?;
        // Only update state after log action completes.
        self.latest_entry_metadata = Some((appended_term, appended_index));

        Ok(appended_index)
    }

    /// Up to `max` consecutive records starting at `from`, serialized for replication. Stops early
    /// at the end of the log.
    pub(crate) fn records(&self, from: Index, max: usize) -> Result<Vec<ReplicatableRecord>, io::Error> {
        let mut records = Vec::new();
        let mut index = from;
        while records.len() < max && index < self.log.next_index() {
            let entry = self.read_required(index)?;
            let term = entry.term;
            let serialized: Vec<u8> = entry.into();
            records.push(ReplicatableRecord::new(index, term, Bytes::from(serialized)));
            index = index.plus(1);
        }

        Ok(records)
    }

    pub(crate) fn commit_index(&self) -> Option<Index> {
        self.commit_index
    }

    pub(crate) fn last_applied_index(&self) -> Option<Index> {
        self.last_applied_index
    }

    /// Leader-side commit. No-op unless `tentative_new_commit_index` moves the commit index
    /// forward and was written in the current term.
    pub(crate) fn ratchet_fwd_commit_index_if_valid(
        &mut self,
        tentative_new_commit_index: Index,
        current_term: Term,
    ) -> Result<bool, io::Error> {
        // A new leader may compute a quorum index below what it already knows to be committed.
        if matches!(self.commit_index, Some(ci) if tentative_new_commit_index <= ci) {
            return Ok(false);
        }

        // > If there exists an N such that N > commitIndex, a majority
        // > of matchIndex[i] ≥ N, and log[N].term == currentTerm:
        // > set commitIndex = N (§5.3, §5.4).
        let entry = self.read_required(tentative_new_commit_index)?;
        if entry.term != current_term {
            return Ok(false);
        }

        self.ratchet_fwd_commit_index_panicking(tentative_new_commit_index);

        Ok(true)
    }

    /// Follower-side commit. The leader's commit index may be behind ours (e.g. right after we
    /// installed a snapshot), so anything that isn't forward is ignored.
    pub(crate) fn ratchet_fwd_commit_index_if_increased(&mut self, new_commit_index: Index) -> bool {
        if matches!(self.commit_index, Some(ci) if new_commit_index <= ci) {
            return false;
        }

        self.ratchet_fwd_commit_index_panicking(new_commit_index);
        true
    }

    fn ratchet_fwd_commit_index_panicking(&mut self, new_commit_index: Index) {
        // Assert we only ratchet commit index forward.
        if let Some(current_commit_index) = self.commit_index {
            assert!(
                new_commit_index > current_commit_index,
                "Can't ratchet commit index backwards. Expected [input] {:?} > {:?} [current]",
                new_commit_index,
                current_commit_index,
            );
        }

        // Assert we only mark as committed if we have the entry locally.
        let latest_locally_written_index = self.latest_index();
        assert!(
            latest_locally_written_index >= Some(new_commit_index),
            "Can't ratchet commit index forwards past our local log. Expected [latest log] {:?} >= {:?} [input]",
            latest_locally_written_index,
            new_commit_index,
        );

        self.commit_index.replace(new_commit_index);
    }

    /// apply_all_committed_entries applies all committed but unapplied entries in order. Only
    /// application entries are published; raft's own entries are skipped over.
    pub(crate) fn apply_all_committed_entries(&mut self) {
        if let Err(e) = self.try_apply_all_committed_entries() {
            // We've already persisted the log. Applying committed logs is not on critical
            // path. We can wait to retry next time.
            slog::error!(self.logger, "Failed to apply a log entry. {:?}", e);
        }
    }

    fn try_apply_all_committed_entries(&mut self) -> Result<(), io::Error> {
        let commit_index = match self.commit_index {
            Some(ci) => ci,
            None => return Ok(()),
        };

        // This may be a long running loop, and starve the Replica event loop from handling
        // another event. It's only long for a member catching up on many commits at once.
        while self.last_applied_index < Some(commit_index) {
            let next_index = Index::following(self.last_applied_index);
            let entry = self.read_required(next_index)?;
            if let EntryPayload::Application(data) = entry.payload {
                self.commit_stream
                    .notify_commit(&self.logger, entry.term, next_index, data);
            }
            self.last_applied_index.replace(next_index);
        }

        Ok(())
    }

    /// Replace the whole log with a snapshot covering everything up to and including `index`.
    /// Everything the snapshot covers is committed and applied.
    pub(crate) fn reset_to_snapshot(&mut self, term: Term, index: Index, data: Bytes) {
        self.log.reset(index.plus(1));
        self.compacted_through = Some((term, index));
        self.latest_entry_metadata = Some((term, index));
        if self.commit_index < Some(index) {
            self.commit_index = Some(index);
        }
        if self.last_applied_index < Some(index) {
            self.last_applied_index = Some(index);
        }

        self.commit_stream
            .notify_snapshot_installed(&self.logger, term, index, data);
    }

    /// Drop entries before `index`. Only applied entries may be compacted; anything later is
    /// left in place.
    pub(crate) fn compact_before(&mut self, index: Index) -> Result<(), io::Error> {
        let last_compacted = match index.checked_minus(1) {
            Some(i) => i,
            None => return Ok(()),
        };
        if Some(last_compacted) > self.last_applied_index || index <= self.log.first_index() {
            return Ok(());
        }

        let term = match self.term_at(last_compacted)? {
            Some(term) => term,
            None => return Ok(()),
        };
        self.log.compact_before(index);
        self.compacted_through = Some((term, last_compacted));

        slog::info!(self.logger, "Compacted log through {:?}", last_compacted);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitlog::InMemoryLog;
    use crate::replica::CommitEvent;

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    fn wal() -> (WriteAheadLog<InMemoryLog<WriteAheadLogEntry>>, CommitStream) {
        WriteAheadLog::wired(logger(), InMemoryLog::create().unwrap())
    }

    fn app_entry(term: u64, data: &'static [u8]) -> WriteAheadLogEntry {
        WriteAheadLogEntry {
            term: Term::new(term),
            payload: EntryPayload::Application(Bytes::from_static(data)),
        }
    }

    #[tokio::test]
    async fn only_application_entries_are_published() {
        let (mut wal, mut stream) = wal();
        wal.append(WriteAheadLogEntry {
            term: Term::new(1),
            payload: EntryPayload::Initialize,
        })
        .unwrap();
        wal.append(app_entry(1, b"a")).unwrap();

        assert!(wal.ratchet_fwd_commit_index_if_valid(Index::new(2), Term::new(1)).unwrap());
        wal.apply_all_committed_entries();

        match stream.recv().await {
            Some(CommitEvent::Entry(entry)) => {
                assert_eq!(entry.index, Index::new(2));
                assert_eq!(entry.data, Bytes::from_static(b"a"));
            }
            other => panic!("Unexpected {:?}", other),
        }
        assert_eq!(wal.last_applied_index(), Some(Index::new(2)));
    }

    #[test]
    fn commit_requires_current_term_and_never_goes_back() {
        let (mut wal, _stream) = wal();
        wal.append(app_entry(1, b"a")).unwrap();
        wal.append(app_entry(2, b"b")).unwrap();

        assert!(!wal.ratchet_fwd_commit_index_if_valid(Index::new(1), Term::new(2)).unwrap());
        assert_eq!(wal.commit_index(), None);
        assert!(wal.ratchet_fwd_commit_index_if_valid(Index::new(2), Term::new(2)).unwrap());
        assert!(!wal.ratchet_fwd_commit_index_if_increased(Index::new(1)));
        assert_eq!(wal.commit_index(), Some(Index::new(2)));
    }

    #[test]
    fn truncate_restores_latest_entry() {
        let (mut wal, _stream) = wal();
        wal.append(app_entry(1, b"a")).unwrap();
        wal.append(app_entry(2, b"b")).unwrap();

        wal.truncate(Index::new(2)).unwrap();
        assert_eq!(wal.latest_entry(), Some((Term::new(1), Index::new(1))));
        wal.truncate(Index::new(1)).unwrap();
        assert_eq!(wal.latest_entry(), None);
    }

    #[test]
    fn compaction_keeps_boundary_term() {
        let (mut wal, _stream) = wal();
        for term in &[1, 1, 2, 2] {
            wal.append(app_entry(*term, b"x")).unwrap();
        }

        // Not applied yet, nothing happens.
        wal.compact_before(Index::new(4)).unwrap();
        assert_eq!(wal.first_index(), Index::new(1));

        wal.ratchet_fwd_commit_index_if_valid(Index::new(4), Term::new(2)).unwrap();
        wal.apply_all_committed_entries();
        wal.compact_before(Index::new(4)).unwrap();

        assert_eq!(wal.first_index(), Index::new(4));
        assert_eq!(wal.compacted_through(), Some((Term::new(2), Index::new(3))));
        assert_eq!(wal.term_at(Index::new(3)).unwrap(), Some(Term::new(2)));
        assert_eq!(wal.term_at(Index::new(2)).unwrap(), None);

        let records = wal.records(Index::new(4), 10).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].is_intact());
    }

    #[tokio::test]
    async fn reset_to_snapshot_moves_every_index() {
        let (mut wal, mut stream) = wal();
        wal.append(app_entry(1, b"a")).unwrap();

        wal.reset_to_snapshot(Term::new(3), Index::new(10), Bytes::from_static(b"state"));

        assert_eq!(wal.latest_entry(), Some((Term::new(3), Index::new(10))));
        assert_eq!(wal.commit_index(), Some(Index::new(10)));
        assert_eq!(wal.last_applied_index(), Some(Index::new(10)));
        assert_eq!(wal.next_index(), Index::new(11));
        assert!(matches!(
            stream.recv().await,
            Some(CommitEvent::SnapshotInstalled(s)) if s.index == Index::new(10)
        ));

        assert_eq!(wal.append(app_entry(3, b"b")).unwrap(), Index::new(11));
    }
}
