use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use coach_core::model::{AssessmentDefinition, ResultContext, ResultRecord, UserId};
use coach_core::{Advance, Clock, Session, TickOutcome, TimerTag, TransitionRejected};
use storage::repository::{AssessmentResultRepository, ResultRowId, StorageError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::timer::{TimerHandle, TimerTick};
use crate::error::AttemptError;

/// Knobs for running attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptSettings {
    tick_period: Duration,
}

impl Default for AttemptSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
        }
    }
}

impl AttemptSettings {
    #[must_use]
    pub fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    #[must_use]
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }
}

type RecorderHandle = JoinHandle<Result<ResultRowId, StorageError>>;

/// Owns one user's attempt at one assessment: the session, its countdown timer
/// and the hand-off of the final result.
///
/// All mutations run on the caller's task. Timer ticks arrive through a queue
/// and only take effect when the caller feeds them back via [`handle_tick`],
/// so ticks and user actions never interleave.
///
/// Each timer started here is stopped on pause, reset, completion, restart, or
/// when the controller is dropped.
///
/// [`handle_tick`]: AttemptController::handle_tick
pub struct AttemptController {
    clock: Clock,
    user_id: UserId,
    settings: AttemptSettings,
    results: Arc<dyn AssessmentResultRepository>,
    session: Session,
    timer: Option<TimerHandle>,
    tick_tx: mpsc::UnboundedSender<TimerTick>,
    tick_rx: mpsc::UnboundedReceiver<TimerTick>,
    recorder: Option<RecorderHandle>,
}

impl AttemptController {
    #[must_use]
    pub fn new(
        clock: Clock,
        user_id: UserId,
        definition: Arc<AssessmentDefinition>,
        results: Arc<dyn AssessmentResultRepository>,
        settings: AttemptSettings,
    ) -> Self {
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        Self {
            clock,
            user_id,
            settings,
            results,
            session: Session::new(definition),
            timer: None,
            tick_tx,
            tick_rx,
            recorder: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// True while a countdown task is attached to the live session.
    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Start an attempt. After a completed attempt this begins a fresh session.
    ///
    /// # Errors
    ///
    /// Returns `TransitionRejected` if an attempt is already running or paused.
    pub fn start(&mut self) -> Result<(), TransitionRejected> {
        if self.session.is_complete() {
            self.session = Session::new(Arc::clone(self.session.definition()));
        }
        let tag = self
            .session
            .start()
            .inspect_err(|e| debug!(reason = %e, "start rejected"))?;

        info!(
            assessment = %self.session.definition().id(),
            attempt = %tag.attempt,
            user = %self.user_id,
            duration_secs = self.session.remaining_secs(),
            "attempt started"
        );
        self.arm_timer(tag);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `TransitionRejected` if not running or `option` is out of range.
    pub fn select_answer(&mut self, option: usize) -> Result<(), TransitionRejected> {
        self.session
            .select_answer(option)
            .inspect_err(|e| debug!(option, reason = %e, "selection rejected"))
    }

    /// # Errors
    ///
    /// Returns `TransitionRejected` if not running or nothing is selected.
    pub fn advance(&mut self) -> Result<Advance, TransitionRejected> {
        let step = self
            .session
            .advance()
            .inspect_err(|e| debug!(reason = %e, "advance rejected"))?;
        if step == Advance::Completed {
            info!(attempt = ?self.session.attempt_id(), "all questions answered");
            self.finish();
        }
        Ok(step)
    }

    /// # Errors
    ///
    /// Returns `TransitionRejected` if not running or already at the first question.
    pub fn retreat(&mut self) -> Result<usize, TransitionRejected> {
        self.session
            .retreat()
            .inspect_err(|e| debug!(reason = %e, "retreat rejected"))
    }

    /// # Errors
    ///
    /// Returns `TransitionRejected::NotRunning` unless running.
    pub fn pause(&mut self) -> Result<(), TransitionRejected> {
        self.session
            .pause()
            .inspect_err(|e| debug!(reason = %e, "pause rejected"))?;
        self.stop_timer();
        debug!(remaining_secs = self.session.remaining_secs(), "attempt paused");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `TransitionRejected::NotPaused` unless paused.
    pub fn resume(&mut self) -> Result<(), TransitionRejected> {
        let tag = self
            .session
            .resume()
            .inspect_err(|e| debug!(reason = %e, "resume rejected"))?;
        debug!(remaining_secs = self.session.remaining_secs(), "attempt resumed");
        self.arm_timer(tag);
        Ok(())
    }

    /// Abandon the attempt and return to `NotStarted`. Nothing is recorded.
    pub fn reset(&mut self) {
        self.stop_timer();
        if let Some(attempt) = self.session.attempt_id() {
            info!(%attempt, "attempt reset");
        }
        self.session.reset();
    }

    /// Wait for the next queued tick. Returns `None` when no timer is running.
    pub async fn next_tick(&mut self) -> Option<TimerTick> {
        if self.timer.is_none() {
            return None;
        }
        self.tick_rx.recv().await
    }

    /// Apply a tick. Ticks from stopped timers are ignored.
    pub fn handle_tick(&mut self, tick: TimerTick) -> TickOutcome {
        let outcome = self.session.tick(tick.tag);
        match outcome {
            TickOutcome::Stale => trace!(generation = tick.tag.generation, "stale tick ignored"),
            TickOutcome::Counted(remaining) => trace!(remaining, "tick"),
            TickOutcome::Expired => {
                info!(attempt = %tick.tag.attempt, "time expired");
                self.finish();
            }
        }
        outcome
    }

    /// Wait for and apply the next tick.
    pub async fn pump_tick(&mut self) -> Option<TickOutcome> {
        let tick = self.next_tick().await?;
        Some(self.handle_tick(tick))
    }

    /// Take the handle of the task recording the last completed attempt.
    ///
    /// Completion never waits on it; callers that want to surface recording
    /// failures can await it.
    pub fn take_recorder(&mut self) -> Option<RecorderHandle> {
        self.recorder.take()
    }

    /// Await the recording of the last completed attempt, if any.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::Storage` if the repository rejected the result and
    /// `AttemptError::RecorderTask` if the task was aborted or panicked.
    pub async fn wait_for_recording(&mut self) -> Option<Result<ResultRowId, AttemptError>> {
        let handle = self.recorder.take()?;
        Some(match handle.await {
            Ok(res) => res.map_err(AttemptError::from),
            Err(e) => Err(AttemptError::RecorderTask(e.to_string())),
        })
    }

    fn arm_timer(&mut self, tag: TimerTag) {
        self.stop_timer();
        self.timer = Some(TimerHandle::spawn(
            tag,
            self.settings.tick_period(),
            self.session.remaining_secs(),
            self.tick_tx.clone(),
        ));
    }

    fn stop_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop();
            trace!(generation = timer.tag().generation, "timer stopped");
        }
    }

    fn finish(&mut self) {
        self.stop_timer();
        self.hand_off();
    }

    // Fire-and-forget: the session is already `Completed` and stays so whatever
    // the repository answers.
    fn hand_off(&mut self) {
        let (Some(attempt_id), Some(result)) = (self.session.attempt_id(), self.session.result())
        else {
            return;
        };

        let record = ResultRecord::new(
            attempt_id,
            ResultContext {
                assessment_id: result.assessment_id().clone(),
                user_id: self.user_id,
                recorded_at: self.clock.now(),
            },
            result.clone(),
        );
        info!(
            %attempt_id,
            correct = result.correct_count(),
            total = result.total_questions(),
            percentage = result.percentage(),
            "attempt completed"
        );

        let results = Arc::clone(&self.results);
        self.recorder = Some(tokio::spawn(async move {
            match results.record_result(&record).await {
                Ok(id) => {
                    debug!(%attempt_id, result_id = id, "result recorded");
                    Ok(id)
                }
                Err(e) => {
                    warn!(%attempt_id, error = %e, "failed to record result");
                    Err(e)
                }
            }
        }));
    }
}

impl fmt::Debug for AttemptController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttemptController")
            .field("user_id", &self.user_id)
            .field("session", &self.session)
            .field("timer_running", &self.timer.is_some())
            .field("recorder_pending", &self.recorder.is_some())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coach_core::SessionStatus;
    use coach_core::model::{AssessmentId, Question};
    use coach_core::time::{fixed_clock, fixed_now};
    use storage::repository::{InMemoryRepository, ResultRow};

    fn definition(correct: &[usize], duration_secs: u32) -> Arc<AssessmentDefinition> {
        let questions = correct
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Question::new(format!("Q{i}"), vec!["a".into(), "b".into(), "c".into()], c, "")
                    .unwrap()
            })
            .collect();
        Arc::new(
            AssessmentDefinition::new(
                AssessmentId::new("quiz").unwrap(),
                "Quiz",
                "",
                "General",
                duration_secs,
                questions,
            )
            .unwrap(),
        )
    }

    fn controller(
        def: Arc<AssessmentDefinition>,
        repo: Arc<dyn AssessmentResultRepository>,
    ) -> AttemptController {
        AttemptController::new(
            fixed_clock(),
            UserId::new(9),
            def,
            repo,
            AttemptSettings::default(),
        )
    }

    struct FailingRepository;

    #[async_trait]
    impl AssessmentResultRepository for FailingRepository {
        async fn record_result(&self, _: &ResultRecord) -> Result<ResultRowId, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn get_result(&self, _: ResultRowId) -> Result<ResultRow, StorageError> {
            Err(StorageError::NotFound)
        }

        async fn list_results(
            &self,
            _: UserId,
            _: Option<&AssessmentId>,
            _: u32,
        ) -> Result<Vec<ResultRow>, StorageError> {
            Ok(Vec::new())
        }

        async fn list_all_results(&self, _: UserId) -> Result<Vec<ResultRow>, StorageError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_drive_countdown() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut ctl = controller(definition(&[1, 0], 30), repo);
        ctl.start().unwrap();

        for n in 1..=3 {
            assert_eq!(ctl.pump_tick().await, Some(TickOutcome::Counted(30 - n)));
        }
        assert_eq!(ctl.session().remaining_secs(), 27);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_completes_records_and_stops_timer() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut ctl = controller(definition(&[1, 0, 2], 10), repo.clone());
        ctl.start().unwrap();

        let mut last = None;
        while let Some(outcome) = ctl.pump_tick().await {
            last = Some(outcome);
        }

        assert_eq!(last, Some(TickOutcome::Expired));
        assert_eq!(ctl.session().status(), SessionStatus::Completed);
        assert!(!ctl.timer_running());
        assert_eq!(ctl.session().result().unwrap().correct_count(), 0);
        assert_eq!(ctl.session().result().unwrap().total_questions(), 3);

        let id = ctl.wait_for_recording().await.unwrap().unwrap();
        let row = repo.get_result(id).await.unwrap();
        assert_eq!(row.record.context.user_id, UserId::new(9));
        assert_eq!(row.record.context.recorded_at, fixed_now());
        assert_eq!(row.record.result.correct_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_stops_ticks_and_keeps_time() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut ctl = controller(definition(&[1, 0], 30), repo);
        ctl.start().unwrap();
        ctl.select_answer(1).unwrap();
        ctl.pump_tick().await;
        ctl.pause().unwrap();
        let at_pause = ctl.session().remaining_secs();

        assert!(ctl.next_tick().await.is_none());
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ctl.session().remaining_secs(), at_pause);

        ctl.resume().unwrap();
        assert_eq!(ctl.session().remaining_secs(), at_pause);
        assert_eq!(ctl.pump_tick().await, Some(TickOutcome::Counted(at_pause - 1)));
    }

    #[tokio::test(start_paused = true)]
    async fn stale_tick_after_reset_is_ignored() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut ctl = controller(definition(&[1, 0], 30), repo);
        ctl.start().unwrap();
        let tick = ctl.next_tick().await.unwrap();

        ctl.reset();
        assert!(!ctl.timer_running());
        assert_eq!(ctl.handle_tick(tick), TickOutcome::Stale);
        assert_eq!(ctl.session().status(), SessionStatus::NotStarted);
        assert_eq!(ctl.session().remaining_secs(), 30);
    }

    #[tokio::test(start_paused = true)]
    async fn answering_everything_records_once() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut ctl = controller(definition(&[1, 0, 2], 60), repo.clone());
        ctl.start().unwrap();

        for option in [1, 0, 1] {
            ctl.select_answer(option).unwrap();
            ctl.advance().unwrap();
        }
        assert!(!ctl.timer_running());
        assert_eq!(ctl.session().result().unwrap().percentage(), 67);
        assert_eq!(ctl.advance(), Err(TransitionRejected::NotRunning));

        ctl.wait_for_recording().await.unwrap().unwrap();
        assert!(ctl.wait_for_recording().await.is_none());
        let rows = repo.list_results(UserId::new(9), None, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record.result.correct_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn recording_failure_keeps_completed_result() {
        let mut ctl = controller(definition(&[1], 60), Arc::new(FailingRepository));
        ctl.start().unwrap();
        ctl.select_answer(1).unwrap();
        assert_eq!(ctl.advance(), Ok(Advance::Completed));

        let err = ctl.wait_for_recording().await.unwrap().unwrap_err();
        assert!(matches!(err, AttemptError::Storage(StorageError::Connection(_))));
        assert_eq!(ctl.session().status(), SessionStatus::Completed);
        assert_eq!(ctl.session().result().unwrap().percentage(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_completion_uses_fresh_attempt() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut ctl = controller(definition(&[1], 60), repo.clone());
        ctl.start().unwrap();
        let first = ctl.session().attempt_id().unwrap();
        ctl.select_answer(1).unwrap();
        ctl.advance().unwrap();
        ctl.wait_for_recording().await.unwrap().unwrap();

        ctl.start().unwrap();
        let second = ctl.session().attempt_id().unwrap();
        assert_ne!(first, second);
        assert!(ctl.timer_running());
        assert!(ctl.session().recorded_answers().is_empty());
        assert_eq!(ctl.session().remaining_secs(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_actions_leave_state_untouched() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut ctl = controller(definition(&[1, 0], 30), repo);

        assert_eq!(ctl.select_answer(0), Err(TransitionRejected::NotRunning));
        ctl.start().unwrap();
        assert_eq!(ctl.advance(), Err(TransitionRejected::NoSelection));
        assert_eq!(ctl.retreat(), Err(TransitionRejected::AtFirstQuestion));
        assert_eq!(ctl.resume(), Err(TransitionRejected::NotPaused));
        assert_eq!(ctl.session().current_index(), 0);
        assert!(ctl.timer_running());
    }
}
