use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::model::{AssessmentDefinition, AssessmentResult, AttemptId, Question};
use crate::scoring::score;
use crate::timer::{TickOutcome, TimerTag};

//
// ─── STATUS & REJECTIONS ───────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    NotStarted,
    Running,
    Paused,
    Completed,
}

/// Why a transition was refused. The session is left untouched in every case.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransitionRejected {
    #[error("session is already {0:?}")]
    AlreadyActive(SessionStatus),

    #[error("session is not running")]
    NotRunning,

    #[error("session is not paused")]
    NotPaused,

    #[error("no option selected for the current question")]
    NoSelection,

    #[error("option {option} is out of range for {count} options")]
    OptionOutOfRange { option: usize, count: usize },

    #[error("already at the first question")]
    AtFirstQuestion,
}

/// Where `advance` left the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    Completed,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// State of one timed attempt at an assessment.
///
/// `NotStarted → Running ⇄ Paused → Completed`. Every mutation goes through the
/// methods below, which either apply fully or return `TransitionRejected` without
/// touching anything.
///
/// The session never runs a timer itself. `start` and `resume` hand back the
/// [`TimerTag`] the owner must tick with; `pause`, `reset` and completion forget
/// it, so ticks from a stopped timer are ignored.
pub struct Session {
    definition: Arc<AssessmentDefinition>,
    attempt_id: Option<AttemptId>,
    status: SessionStatus,
    current: usize,
    furthest: usize,
    recorded: Vec<Option<usize>>,
    pending: Option<usize>,
    remaining_secs: u32,
    generation: u64,
    live_timer: Option<TimerTag>,
    result: Option<AssessmentResult>,
}

impl Session {
    #[must_use]
    pub fn new(definition: Arc<AssessmentDefinition>) -> Self {
        let remaining_secs = definition.duration_secs();
        Self {
            definition,
            attempt_id: None,
            status: SessionStatus::NotStarted,
            current: 0,
            furthest: 0,
            recorded: Vec::new(),
            pending: None,
            remaining_secs,
            generation: 0,
            live_timer: None,
            result: None,
        }
    }

    #[must_use]
    pub fn definition(&self) -> &Arc<AssessmentDefinition> {
        &self.definition
    }

    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
        self.attempt_id
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The question on screen, while an attempt is in progress.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.status {
            SessionStatus::Running | SessionStatus::Paused => self.definition.question(self.current),
            SessionStatus::NotStarted | SessionStatus::Completed => None,
        }
    }

    #[must_use]
    pub fn pending_selection(&self) -> Option<usize> {
        self.pending
    }

    /// Answers recorded so far, indexed by question.
    #[must_use]
    pub fn recorded_answers(&self) -> &[Option<usize>] {
        &self.recorded
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.recorded.iter().filter(|a| a.is_some()).count()
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Tag of the timer that should currently be ticking, if any.
    #[must_use]
    pub fn live_timer(&self) -> Option<TimerTag> {
        self.live_timer
    }

    #[must_use]
    pub fn result(&self) -> Option<&AssessmentResult> {
        self.result.as_ref()
    }

    /// Begin a fresh attempt.
    ///
    /// Allowed from `NotStarted` or after a previous attempt completed; all prior
    /// attempt state is discarded and a new `AttemptId` is minted.
    ///
    /// # Errors
    ///
    /// Returns `TransitionRejected::AlreadyActive` while running or paused.
    pub fn start(&mut self) -> Result<TimerTag, TransitionRejected> {
        match self.status {
            SessionStatus::NotStarted | SessionStatus::Completed => {}
            status => return Err(TransitionRejected::AlreadyActive(status)),
        }

        let attempt = AttemptId::generate();
        self.attempt_id = Some(attempt);
        self.current = 0;
        self.furthest = 0;
        self.recorded.clear();
        self.pending = None;
        self.remaining_secs = self.definition.duration_secs();
        self.result = None;
        self.status = SessionStatus::Running;

        Ok(self.arm_timer(attempt))
    }

    /// Mark `option` as the pending choice for the current question.
    ///
    /// # Errors
    ///
    /// Returns `NotRunning` unless running, `OptionOutOfRange` for an invalid index.
    pub fn select_answer(&mut self, option: usize) -> Result<(), TransitionRejected> {
        self.ensure_running()?;
        let question = self
            .definition
            .question(self.current)
            .ok_or(TransitionRejected::NotRunning)?;
        if !question.accepts(option) {
            return Err(TransitionRejected::OptionOutOfRange {
                option,
                count: question.option_count(),
            });
        }

        self.pending = Some(option);
        Ok(())
    }

    /// Record the pending choice and move on, completing after the last question.
    ///
    /// # Errors
    ///
    /// Returns `NotRunning` unless running, `NoSelection` if nothing is pending.
    pub fn advance(&mut self) -> Result<Advance, TransitionRejected> {
        self.ensure_running()?;
        let Some(choice) = self.pending else {
            return Err(TransitionRejected::NoSelection);
        };

        if self.recorded.len() <= self.current {
            self.recorded.resize(self.current + 1, None);
        }
        self.recorded[self.current] = Some(choice);
        self.pending = None;

        if self.current >= self.definition.last_index() {
            self.complete();
            return Ok(Advance::Completed);
        }

        self.current += 1;
        self.furthest = self.furthest.max(self.current);
        Ok(Advance::Moved(self.current))
    }

    /// Step back one question, restoring its recorded answer as the pending choice.
    ///
    /// Recorded answers are kept; an un-advanced pending choice is dropped.
    ///
    /// # Errors
    ///
    /// Returns `NotRunning` unless running, `AtFirstQuestion` at index 0.
    pub fn retreat(&mut self) -> Result<usize, TransitionRejected> {
        self.ensure_running()?;
        if self.current == 0 {
            return Err(TransitionRejected::AtFirstQuestion);
        }

        self.current -= 1;
        self.pending = self.recorded.get(self.current).copied().flatten();
        Ok(self.current)
    }

    /// # Errors
    ///
    /// Returns `NotRunning` unless running.
    pub fn pause(&mut self) -> Result<(), TransitionRejected> {
        self.ensure_running()?;
        self.status = SessionStatus::Paused;
        self.live_timer = None;
        Ok(())
    }

    /// Continue a paused attempt with the time that was left at `pause`.
    ///
    /// # Errors
    ///
    /// Returns `NotPaused` unless paused.
    pub fn resume(&mut self) -> Result<TimerTag, TransitionRejected> {
        if self.status != SessionStatus::Paused {
            return Err(TransitionRejected::NotPaused);
        }
        let Some(attempt) = self.attempt_id else {
            return Err(TransitionRejected::NotPaused);
        };

        self.status = SessionStatus::Running;
        Ok(self.arm_timer(attempt))
    }

    /// Drop the attempt entirely and return to `NotStarted`.
    pub fn reset(&mut self) {
        self.attempt_id = None;
        self.status = SessionStatus::NotStarted;
        self.current = 0;
        self.furthest = 0;
        self.recorded.clear();
        self.pending = None;
        self.remaining_secs = self.definition.duration_secs();
        self.live_timer = None;
        self.result = None;
    }

    /// Apply one second of countdown from the timer identified by `tag`.
    pub fn tick(&mut self, tag: TimerTag) -> TickOutcome {
        if self.status != SessionStatus::Running || self.live_timer != Some(tag) {
            return TickOutcome::Stale;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.complete();
            return TickOutcome::Expired;
        }
        TickOutcome::Counted(self.remaining_secs)
    }

    fn ensure_running(&self) -> Result<(), TransitionRejected> {
        if self.status == SessionStatus::Running {
            Ok(())
        } else {
            Err(TransitionRejected::NotRunning)
        }
    }

    fn arm_timer(&mut self, attempt: AttemptId) -> TimerTag {
        self.generation += 1;
        let tag = TimerTag {
            attempt,
            generation: self.generation,
        };
        self.live_timer = Some(tag);
        tag
    }

    // Pending selections are not answers; only recorded slots are scored.
    fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.live_timer = None;
        self.result = Some(score(&self.definition, &self.recorded));
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("assessment_id", self.definition.id())
            .field("attempt_id", &self.attempt_id)
            .field("status", &self.status)
            .field("current", &self.current)
            .field("recorded_len", &self.recorded.len())
            .field("pending", &self.pending)
            .field("remaining_secs", &self.remaining_secs)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
