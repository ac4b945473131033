use std::time::Duration;

use coach_core::TimerTag;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::trace;

/// One countdown tick, delivered to the owning controller's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick {
    pub tag: TimerTag,
}

/// Running countdown task.
///
/// Sends at most `budget` ticks, one per `period`, then exits on its own.
/// `stop` and `Drop` abort the task; aborting twice is harmless.
#[derive(Debug)]
pub struct TimerHandle {
    tag: TimerTag,
    task: JoinHandle<()>,
}

impl TimerHandle {
    #[must_use]
    pub fn spawn(
        tag: TimerTag,
        period: Duration,
        budget: u32,
        ticks: mpsc::UnboundedSender<TimerTick>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            for _ in 0..budget {
                interval.tick().await;
                if ticks.send(TimerTick { tag }).is_err() {
                    return;
                }
            }
            trace!(generation = tag.generation, "timer budget exhausted");
        });
        Self { tag, task }
    }

    #[must_use]
    pub fn tag(&self) -> TimerTag {
        self.tag
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_core::model::AttemptId;

    fn tag() -> TimerTag {
        TimerTag {
            attempt: AttemptId::generate(),
            generation: 1,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sends_budgeted_ticks_then_exits() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let tag = tag();
        let handle = TimerHandle::spawn(tag, Duration::from_secs(1), 3, tx);

        for _ in 0..3 {
            assert_eq!(rx.recv().await, Some(TimerTick { tag }));
        }
        // Sender moved into the task is dropped when the task exits.
        assert_eq!(rx.recv().await, None);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_a_full_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let start = Instant::now();
        let _handle = TimerHandle::spawn(tag(), Duration::from_secs(1), 1, tx);

        rx.recv().await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_silences_the_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = TimerHandle::spawn(tag(), Duration::from_secs(1), 10, tx);

        handle.stop();
        handle.stop();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_stops_the_timer() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = TimerHandle::spawn(tag(), Duration::from_secs(1), 10, tx);

        drop(handle);
        assert_eq!(rx.recv().await, None);
    }
}
