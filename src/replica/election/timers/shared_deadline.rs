use std::sync::Mutex;
use tokio::time::Instant;

/// A deadline written by the actor and consumed by a timer task.
#[derive(Default)]
pub(super) struct SharedDeadline {
    deadline: Mutex<Option<Instant>>,
}

impl SharedDeadline {
    pub(super) fn set(&self, deadline: Instant) {
        self.deadline
            .lock()
            .expect("SharedDeadline.set() mutex guard poison")
            .replace(deadline);
    }

    pub(super) fn take(&self) -> Option<Instant> {
        self.deadline
            .lock()
            .expect("SharedDeadline.take() mutex guard poison")
            .take()
    }
}
