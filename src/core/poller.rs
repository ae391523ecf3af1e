use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::core::activity::RunIdentifiers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    Continue,
    Stop,
}

/// Handle to one running poll loop. Dropping it does not stop the loop;
/// call [`PollTimer::cancel`].
#[derive(Debug)]
pub struct PollTimer {
    ids: RunIdentifiers,
    interval: Duration,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollTimer {
    /// Calls `on_tick` every `interval`, first one interval after arming.
    /// A tick that is still awaiting when the next one is due delays the
    /// schedule instead of overlapping it.
    pub fn arm<F, Fut>(ids: RunIdentifiers, interval: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickControl> + Send + 'static,
    {
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let loop_ids = ids.clone();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let control = tokio::select! {
                    _ = loop_token.cancelled() => break,
                    control = on_tick() => control,
                };
                if control == TickControl::Stop {
                    break;
                }
            }
            debug!(run = %loop_ids, "poll loop stopped");
        });

        Self {
            ids,
            interval,
            token,
            task,
        }
    }

    pub fn cancel(&self) {
        debug!(run = %self.ids, "cancelling poll timer");
        self.token.cancel();
    }

    pub fn ids(&self) -> &RunIdentifiers {
        &self.ids
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_timer(interval: Duration, stop_after: usize) -> (PollTimer, Arc<AtomicUsize>) {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let timer = PollTimer::arm(RunIdentifiers::new("A1", "R1"), interval, move || {
            let counter = counter.clone();
            async move {
                let seen = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if seen >= stop_after {
                    TickControl::Stop
                } else {
                    TickControl::Continue
                }
            }
        });
        (timer, ticks)
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_one_interval() {
        let (timer, ticks) = counting_timer(Duration::from_secs(30), usize::MAX);

        time::sleep(Duration::from_secs(29)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        timer.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_itself_when_told() {
        let (timer, ticks) = counting_timer(Duration::from_secs(1), 2);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 2);
        assert!(timer.is_finished());
        assert!(!timer.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_ends_the_loop() {
        let (timer, ticks) = counting_timer(Duration::from_secs(1), usize::MAX);

        time::sleep(Duration::from_millis(1500)).await;
        timer.cancel();
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert!(timer.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_interrupts_a_slow_tick() {
        let finished = Arc::new(AtomicUsize::new(0));
        let seen = finished.clone();
        let timer = PollTimer::arm(
            RunIdentifiers::new("A1", "R1"),
            Duration::from_secs(1),
            move || {
                let seen = seen.clone();
                async move {
                    time::sleep(Duration::from_secs(60)).await;
                    seen.fetch_add(1, Ordering::SeqCst);
                    TickControl::Continue
                }
            },
        );

        time::sleep(Duration::from_secs(5)).await;
        timer.cancel();
        time::sleep(Duration::from_secs(120)).await;

        assert_eq!(finished.load(Ordering::SeqCst), 0);
        assert!(timer.is_finished());
    }
}
