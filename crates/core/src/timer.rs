use crate::model::AttemptId;

/// Identifies one run of the countdown timer.
///
/// A session mints a new tag each time the timer must (re)start and forgets it
/// when the timer must stop, so ticks carrying an old tag are recognisably stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTag {
    pub attempt: AttemptId,
    pub generation: u64,
}

/// What a single one-second tick did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belonged to a stopped timer, or the session is not running.
    Stale,
    /// One second was consumed; this many remain.
    Counted(u32),
    /// Time ran out and the session completed.
    Expired,
}

impl TickOutcome {
    #[must_use]
    pub fn is_stale(self) -> bool {
        matches!(self, TickOutcome::Stale)
    }
}
