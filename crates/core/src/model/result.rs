use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AssessmentId, AttemptId, UserId};
use crate::scoring::percentage;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ResultError {
    #[error("total questions ({total}) does not match breakdown length ({len})")]
    TotalMismatch { total: u32, len: usize },

    #[error("correct count ({count}) does not match breakdown ({actual})")]
    CorrectMismatch { count: u32, actual: u32 },

    #[error("percentage {stored} does not match computed {computed}")]
    PercentageMismatch { stored: u8, computed: u8 },
}

/// Review entry for one question of a scored attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub chosen: Option<usize>,
    pub correct_option: usize,
    pub is_correct: bool,
    pub explanation: String,
}

/// Score summary of a completed attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ResultFields")]
pub struct AssessmentResult {
    assessment_id: AssessmentId,
    correct_count: u32,
    total_questions: u32,
    percentage: u8,
    breakdown: Vec<QuestionOutcome>,
}

impl AssessmentResult {
    pub(crate) fn from_breakdown(assessment_id: AssessmentId, breakdown: Vec<QuestionOutcome>) -> Self {
        let total_questions = u32::try_from(breakdown.len()).unwrap_or(u32::MAX);
        let correct_count = count_correct(&breakdown);
        Self {
            assessment_id,
            correct_count,
            total_questions,
            percentage: percentage(correct_count, total_questions),
            breakdown,
        }
    }

    /// Rehydrate a result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ResultError` if the stored totals disagree with the breakdown.
    pub fn from_persisted(
        assessment_id: AssessmentId,
        correct_count: u32,
        total_questions: u32,
        percentage_value: u8,
        breakdown: Vec<QuestionOutcome>,
    ) -> Result<Self, ResultError> {
        if usize::try_from(total_questions).ok() != Some(breakdown.len()) {
            return Err(ResultError::TotalMismatch {
                total: total_questions,
                len: breakdown.len(),
            });
        }
        let actual = count_correct(&breakdown);
        if actual != correct_count {
            return Err(ResultError::CorrectMismatch {
                count: correct_count,
                actual,
            });
        }
        let computed = percentage(correct_count, total_questions);
        if computed != percentage_value {
            return Err(ResultError::PercentageMismatch {
                stored: percentage_value,
                computed,
            });
        }

        Ok(Self {
            assessment_id,
            correct_count,
            total_questions,
            percentage: percentage_value,
            breakdown,
        })
    }

    #[must_use]
    pub fn assessment_id(&self) -> &AssessmentId {
        &self.assessment_id
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn breakdown(&self) -> &[QuestionOutcome] {
        &self.breakdown
    }

    /// Number of questions with no recorded answer.
    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        self.breakdown.iter().filter(|o| o.chosen.is_none()).count()
    }
}

#[derive(Deserialize)]
struct ResultFields {
    assessment_id: AssessmentId,
    correct_count: u32,
    total_questions: u32,
    percentage: u8,
    breakdown: Vec<QuestionOutcome>,
}

impl TryFrom<ResultFields> for AssessmentResult {
    type Error = ResultError;

    fn try_from(raw: ResultFields) -> Result<Self, Self::Error> {
        AssessmentResult::from_persisted(
            raw.assessment_id,
            raw.correct_count,
            raw.total_questions,
            raw.percentage,
            raw.breakdown,
        )
    }
}

fn count_correct(breakdown: &[QuestionOutcome]) -> u32 {
    let n = breakdown.iter().filter(|o| o.is_correct).count();
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Who completed which assessment, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultContext {
    pub assessment_id: AssessmentId,
    pub user_id: UserId,
    pub recorded_at: DateTime<Utc>,
}

/// Plain object handed to the result recorder once an attempt completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub attempt_id: AttemptId,
    pub context: ResultContext,
    pub result: AssessmentResult,
}

impl ResultRecord {
    #[must_use]
    pub fn new(attempt_id: AttemptId, context: ResultContext, result: AssessmentResult) -> Self {
        Self {
            attempt_id,
            context,
            result,
        }
    }
}
