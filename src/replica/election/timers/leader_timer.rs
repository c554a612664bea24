use crate::actor;
use crate::membership::MemberId;
use crate::replica::election::timers::shared_deadline::SharedDeadline;
use crate::replica::election::timers::time::{Clock, RealClock};
use crate::replica::{LeaderTimerTick, Term};
use std::sync::{Arc, Weak};
use tokio::time::{Duration, Instant};

/// LeaderTimerHandle drives replication to one peer. Its task notifies the actor whenever a
/// heartbeat interval passes without anything being sent to the peer. Dropping the handle stops
/// the task.
pub(crate) struct LeaderTimerHandle<C: Clock = RealClock> {
    shared: Arc<Shared<C>>,
}

struct Shared<C: Clock> {
    heartbeat_interval: Duration,
    next_heartbeat: SharedDeadline,
    clock: C,
}

struct LeaderTimerTask<C: Clock> {
    weak_shared: Weak<Shared<C>>,
    actor_client: actor::WeakActorClient,
    tick: LeaderTimerTick,
    clock: C,
}

impl LeaderTimerHandle {
    pub(crate) fn spawn_timer_task(
        heartbeat_interval: Duration,
        actor_client: actor::WeakActorClient,
        peer_id: MemberId,
        term: Term,
    ) -> Self {
        let (task, handle) = LeaderTimerTask::new(heartbeat_interval, actor_client, peer_id, term, RealClock);
        tokio::task::spawn(task.run());

        handle
    }
}

impl<C: Clock + Send + Sync + 'static> LeaderTimerHandle<C> {
    /// Something was just sent to the peer. Push the next heartbeat out by a full interval.
    pub(crate) fn reset_heartbeat_timer(&self) {
        self.shared.reset_heartbeat_timer();
    }
}

impl<C: Clock> Shared<C> {
    fn reset_heartbeat_timer(&self) {
        self.next_heartbeat.set(self.clock.now() + self.heartbeat_interval);
    }
}

impl<C: Clock + Send + Sync + 'static> LeaderTimerTask<C> {
    fn new(
        heartbeat_interval: Duration,
        actor_client: actor::WeakActorClient,
        peer_id: MemberId,
        term: Term,
        clock: C,
    ) -> (Self, LeaderTimerHandle<C>) {
        let shared = Arc::new(Shared {
            heartbeat_interval,
            next_heartbeat: SharedDeadline::default(),
            clock: clock.clone(),
        });

        let task = LeaderTimerTask {
            weak_shared: Arc::downgrade(&shared),
            actor_client,
            tick: LeaderTimerTick { peer_id, term },
            clock,
        };

        (task, LeaderTimerHandle { shared })
    }

    fn next_heartbeat(&self) -> Option<Option<Instant>> {
        self.weak_shared.upgrade().map(|shared| shared.next_heartbeat.take())
    }

    async fn run(mut self) {
        // No deadline on the first iteration, so the first tick goes out right away. A new leader
        // (or a newly added peer) should hear from us immediately.
        loop {
            match self.next_heartbeat() {
                None => return,
                Some(Some(deadline)) => self.clock.sleep_until(deadline).await,
                Some(None) => {
                    if self.actor_client.leader_timer(self.tick.clone()).await.is_err() {
                        return;
                    }
                    match self.weak_shared.upgrade() {
                        Some(shared) => shared.reset_heartbeat_timer(),
                        None => return,
                    }
                }
            }
        }
    }
}
