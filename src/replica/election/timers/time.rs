#[cfg(test)]
use tokio::sync::watch;
use tokio::time::{Duration, Instant};

/// Clock abstracts tokio's time so timer tasks can be driven by hand in tests.
#[async_trait::async_trait]
pub(crate) trait Clock: Clone {
    fn now(&self) -> Instant;
    async fn sleep_until(&mut self, deadline: Instant);

    async fn sleep(&mut self, duration: Duration) {
        let deadline = self.now() + duration;
        self.sleep_until(deadline).await;
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct RealClock;

#[async_trait::async_trait]
impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&mut self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}

/// A clock that only moves when its controller says so.
#[cfg(test)]
pub(crate) fn mocked_clock() -> (MockClock, MockClockController) {
    let start = Instant::now();
    let (tx, rx) = watch::channel(start);

    (MockClock { now: rx }, MockClockController { now: tx, start })
}

#[cfg(test)]
#[derive(Clone)]
pub(crate) struct MockClock {
    now: watch::Receiver<Instant>,
}

#[cfg(test)]
#[async_trait::async_trait]
impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.now.borrow()
    }

    async fn sleep_until(&mut self, deadline: Instant) {
        while *self.now.borrow() < deadline {
            if self.now.changed().await.is_err() {
                // Controller is gone, time will never reach the deadline.
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
pub(crate) struct MockClockController {
    now: watch::Sender<Instant>,
    start: Instant,
}

#[cfg(test)]
impl MockClockController {
    pub(crate) fn now(&self) -> Instant {
        *self.now.borrow()
    }

    pub(crate) fn elapsed_time(&self) -> Duration {
        self.now() - self.start
    }

    /// Sleepers wake up once `now` is at or past their deadline, not at the deadline itself, so
    /// big jumps make a task observe a time well past when it asked to wake. Step in increments
    /// finer than what the test is trying to observe.
    pub(crate) fn advance(&mut self, duration: Duration) {
        let next = self.now() + duration;
        // Err just means no clock is listening anymore.
        let _ = self.now.send(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn mock_clock_wakes_sleepers_in_order() {
        let step = Duration::from_millis(500);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (mut clock, mut controller) = mocked_clock();
        let start = controller.now();

        tokio::spawn(async move {
            for i in 1..=4u32 {
                clock.sleep_until(start + step * i).await;
                if tx.send(i).is_err() {
                    return;
                }
            }
        });

        controller.advance(step / 2);
        assert!(tokio::time::timeout(step, rx.recv()).await.is_err());

        controller.advance(step);
        assert_eq!(rx.recv().await, Some(1));
        assert!(tokio::time::timeout(step, rx.recv()).await.is_err());

        // A big jump wakes every sleeper it passes.
        controller.advance(step * 3);
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, Some(3));
        assert_eq!(rx.recv().await, Some(4));

        assert_eq!(controller.elapsed_time(), step * 9 / 2);
    }
}
