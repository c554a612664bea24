use crate::membership::MemberId;
use crate::replica::Term;
use tokio::sync::watch;

/// What role this replica plays, as seen from outside the actor.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum ElectionStateSnapshot {
    Leader(Term),
    Candidate(Term),
    Follower(Option<MemberId>),
    // Receives entries but never votes or stands for election.
    Passive(Option<MemberId>),
    // Like passive, but may be promoted to a voter by a configuration change.
    Promotable(Option<MemberId>),
    // Not a member of the current configuration.
    Inactive,
}

pub(super) fn new(initial_state: ElectionStateSnapshot) -> (ElectionStateChangeNotifier, ElectionStateChangeListener) {
    let (snd, rcv) = watch::channel(initial_state);

    (ElectionStateChangeNotifier { snd }, ElectionStateChangeListener { rcv })
}

pub(super) struct ElectionStateChangeNotifier {
    snd: watch::Sender<ElectionStateSnapshot>,
}

impl ElectionStateChangeNotifier {
    pub(super) fn notify_new_state(&self, new_state: ElectionStateSnapshot) {
        // Skip no-op transitions, e.g. follower -> follower with the same leader.
        if *self.snd.borrow() == new_state {
            return;
        }
        let _ = self.snd.send(new_state);
    }
}

#[derive(Clone)]
pub(crate) struct ElectionStateChangeListener {
    rcv: watch::Receiver<ElectionStateSnapshot>,
}

impl ElectionStateChangeListener {
    /// Waits for the next change. Intermediate states may be skipped if several changes happen
    /// before this is polled. None once the replica is gone.
    pub(crate) async fn next(&mut self) -> Option<ElectionStateSnapshot> {
        match self.rcv.changed().await {
            Ok(_) => Some(self.rcv.borrow().clone()),
            Err(_) => None,
        }
    }

    pub(crate) fn current(&self) -> ElectionStateSnapshot {
        self.rcv.borrow().clone()
    }
}
