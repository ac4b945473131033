use coach_core::model::{
    AssessmentId, AssessmentResult, AttemptId, QuestionOutcome, ResultContext, ResultRecord, UserId,
};
use sqlx::Row;

use crate::repository::{ResultRow, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn user_id_to_i64(id: UserId) -> Result<i64, StorageError> {
    i64::try_from(id.value()).map_err(|_| StorageError::Serialization("user_id overflow".into()))
}

pub(crate) fn usize_to_i64(field: &'static str, v: usize) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn usize_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn u8_from_i64(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_answer_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuestionOutcome, StorageError> {
    let chosen = row
        .try_get::<Option<i64>, _>("chosen_option")
        .map_err(ser)?
        .map(|v| usize_from_i64("chosen_option", v))
        .transpose()?;
    let correct_option = usize_from_i64(
        "correct_option",
        row.try_get::<i64, _>("correct_option").map_err(ser)?,
    )?;
    let is_correct = match row.try_get::<i64, _>("is_correct").map_err(ser)? {
        0 => false,
        1 => true,
        other => {
            return Err(StorageError::Serialization(format!(
                "invalid is_correct: {other}"
            )));
        }
    };

    Ok(QuestionOutcome {
        chosen,
        correct_option,
        is_correct,
        explanation: row.try_get("explanation").map_err(ser)?,
    })
}

/// Rebuild a result row from its header row and ordered breakdown.
pub(crate) fn map_result_row(
    row: &sqlx::sqlite::SqliteRow,
    breakdown: Vec<QuestionOutcome>,
) -> Result<ResultRow, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let attempt_id: AttemptId = row
        .try_get::<String, _>("attempt_id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let assessment_id =
        AssessmentId::new(row.try_get::<String, _>("assessment_id").map_err(ser)?).map_err(ser)?;
    let user_raw: i64 = row.try_get("user_id").map_err(ser)?;
    let user_id = UserId::new(
        u64::try_from(user_raw)
            .map_err(|_| StorageError::Serialization(format!("invalid user_id: {user_raw}")))?,
    );

    let result = AssessmentResult::from_persisted(
        assessment_id.clone(),
        u32_from_i64("correct_count", row.try_get("correct_count").map_err(ser)?)?,
        u32_from_i64("total_questions", row.try_get("total_questions").map_err(ser)?)?,
        u8_from_i64("percentage", row.try_get("percentage").map_err(ser)?)?,
        breakdown,
    )
    .map_err(ser)?;

    let context = ResultContext {
        assessment_id,
        user_id,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
    };

    Ok(ResultRow::new(id, ResultRecord::new(attempt_id, context, result)))
}
