use crate::actor;
use crate::replica::election::timers::shared_deadline::SharedDeadline;
use crate::replica::election::timers::time::{Clock, RealClock};
use crate::replica::Term;
use rand::Rng;
use std::ops::RangeInclusive;
use std::sync::{Arc, Weak};
use tokio::time::{Duration, Instant};

/// FollowerTimerHandle is the actor's side of an election timeout. The timer task notifies the
/// actor with `FollowerTimeout(term)` when the timeout isn't reset in time, and keeps notifying
/// (spaced by the minimum timeout) until it is. Dropping the handle stops the task.
///
/// The term lets the actor discard a timeout that was already queued when it changed term.
pub(crate) struct FollowerTimerHandle<C: Clock = RealClock> {
    shared: Arc<Shared<C>>,
}

struct Shared<C: Clock> {
    next_timeout: SharedDeadline,
    timeout_range: RangeInclusive<Duration>,
    clock: C,
}

struct FollowerTimerTask<C: Clock> {
    weak_shared: Weak<Shared<C>>,
    actor_client: actor::WeakActorClient,
    term: Term,
    clock: C,
    // Not from the paper. Time between repeated timeout notifications while nothing resets us.
    timeout_backoff: Duration,
}

impl FollowerTimerHandle {
    pub(crate) fn spawn_timer_task(
        min_timeout: Duration,
        max_timeout: Duration,
        actor_client: actor::WeakActorClient,
        term: Term,
    ) -> Self {
        let (task, handle) = FollowerTimerTask::new(min_timeout, max_timeout, actor_client, term, RealClock);
        tokio::task::spawn(task.run());

        handle
    }
}

impl<C: Clock + Send + Sync + 'static> FollowerTimerHandle<C> {
    pub(crate) fn reset_timeout(&self) {
        self.shared.reset_timeout();
    }
}

impl<C: Clock> Shared<C> {
    fn reset_timeout(&self) {
        let timeout = rand::thread_rng().gen_range(self.timeout_range.clone());
        self.next_timeout.set(self.clock.now() + timeout);
    }
}

impl<C: Clock + Send + Sync + 'static> FollowerTimerTask<C> {
    fn new(
        min_timeout: Duration,
        max_timeout: Duration,
        actor_client: actor::WeakActorClient,
        term: Term,
        clock: C,
    ) -> (Self, FollowerTimerHandle<C>) {
        let shared = Arc::new(Shared {
            next_timeout: SharedDeadline::default(),
            timeout_range: RangeInclusive::new(min_timeout, max_timeout),
            clock: clock.clone(),
        });
        // Start with a deadline, otherwise we'd time out the moment we become a follower.
        shared.reset_timeout();

        let task = FollowerTimerTask {
            weak_shared: Arc::downgrade(&shared),
            actor_client,
            term,
            clock,
            timeout_backoff: min_timeout,
        };

        (task, FollowerTimerHandle { shared })
    }

    fn next_timeout(&self) -> Option<Option<Instant>> {
        // The strong ref must not be held across an await, or the handle can't stop us.
        self.weak_shared.upgrade().map(|shared| shared.next_timeout.take())
    }

    async fn run(mut self) {
        loop {
            match self.next_timeout() {
                // Handle dropped. We're no longer waiting on a leader in this term.
                None => return,
                Some(Some(deadline)) => self.clock.sleep_until(deadline).await,
                Some(None) => {
                    // Slept through the deadline without a reset.
                    if self.actor_client.follower_timeout(self.term).await.is_err() {
                        return;
                    }
                    self.clock.sleep(self.timeout_backoff).await;
                }
            }
        }
    }
}
