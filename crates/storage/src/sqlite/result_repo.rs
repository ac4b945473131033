use std::collections::HashMap;

use coach_core::model::{AssessmentId, QuestionOutcome, ResultRecord, UserId};
use sqlx::Row;
use sqlx::sqlite::{Sqlite, SqliteArguments};

use super::SqliteRepository;
use super::mapping::{map_answer_row, map_result_row, user_id_to_i64, usize_to_i64};
use crate::repository::{AssessmentResultRepository, ResultRow, ResultRowId, StorageError};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Shared `WHERE .. ORDER BY .. LIMIT` tail for history queries.
///
/// Bind order: user id, then the assessment id and limit when present.
fn history_filter(by_assessment: bool, limited: bool) -> String {
    let mut sql = String::from(" WHERE user_id = ?1");
    let mut bind_index = 2;
    if by_assessment {
        sql.push_str(" AND assessment_id = ?");
        sql.push_str(&bind_index.to_string());
        bind_index += 1;
    }
    sql.push_str(" ORDER BY recorded_at DESC, id DESC");
    if limited {
        sql.push_str(" LIMIT ?");
        sql.push_str(&bind_index.to_string());
    }
    sql
}

fn bind_history<'q>(
    query: SqliteQuery<'q>,
    user_id: i64,
    assessment_id: Option<&'q AssessmentId>,
    limit: Option<u32>,
) -> SqliteQuery<'q> {
    let mut query = query.bind(user_id);
    if let Some(id) = assessment_id {
        query = query.bind(id.as_str());
    }
    if let Some(limit) = limit {
        query = query.bind(i64::from(limit));
    }
    query
}

impl SqliteRepository {
    async fn load_breakdown(
        &self,
        result_id: ResultRowId,
    ) -> Result<Vec<QuestionOutcome>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT chosen_option, correct_option, is_correct, explanation
                FROM assessment_result_answers
                WHERE result_id = ?1
                ORDER BY position ASC
            ",
        )
        .bind(result_id)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_answer_row).collect()
    }

    /// Load history headers, then every breakdown they need in one query.
    async fn fetch_rows(
        &self,
        user_id: UserId,
        assessment_id: Option<&AssessmentId>,
        limit: Option<u32>,
    ) -> Result<Vec<ResultRow>, StorageError> {
        let user = user_id_to_i64(user_id)?;
        let filter = history_filter(assessment_id.is_some(), limit.is_some());
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let header_sql = format!(
            r"
                SELECT
                    id, attempt_id, assessment_id, user_id, recorded_at,
                    correct_count, total_questions, percentage
                FROM assessment_results{filter}
            "
        );
        let headers = bind_history(sqlx::query(&header_sql), user, assessment_id, limit)
            .fetch_all(&mut *tx)
            .await
            .map_err(conn)?;
        if headers.is_empty() {
            return Ok(Vec::new());
        }

        let answers_sql = format!(
            r"
                SELECT result_id, chosen_option, correct_option, is_correct, explanation
                FROM assessment_result_answers
                WHERE result_id IN (SELECT id FROM assessment_results{filter})
                ORDER BY result_id ASC, position ASC
            "
        );
        let answer_rows = bind_history(sqlx::query(&answers_sql), user, assessment_id, limit)
            .fetch_all(&mut *tx)
            .await
            .map_err(conn)?;
        tx.commit().await.map_err(conn)?;

        let mut breakdowns: HashMap<ResultRowId, Vec<QuestionOutcome>> = HashMap::new();
        for row in &answer_rows {
            let result_id: ResultRowId = row.try_get("result_id").map_err(conn)?;
            breakdowns
                .entry(result_id)
                .or_default()
                .push(map_answer_row(row)?);
        }

        headers
            .iter()
            .map(|row| {
                let id: ResultRowId = row.try_get("id").map_err(conn)?;
                map_result_row(row, breakdowns.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl AssessmentResultRepository for SqliteRepository {
    async fn record_result(&self, record: &ResultRecord) -> Result<ResultRowId, StorageError> {
        let user_id = user_id_to_i64(record.context.user_id)?;
        let result = &record.result;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        let res = sqlx::query(
            r"
                INSERT INTO assessment_results (
                    attempt_id, assessment_id, user_id, recorded_at,
                    correct_count, total_questions, percentage
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(record.attempt_id.to_string())
        .bind(record.context.assessment_id.as_str())
        .bind(user_id)
        .bind(record.context.recorded_at)
        .bind(i64::from(result.correct_count()))
        .bind(i64::from(result.total_questions()))
        .bind(i64::from(result.percentage()))
        .execute(&mut *tx)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => StorageError::Conflict,
            _ => conn(&e),
        })?;
        let id = res.last_insert_rowid();

        for (position, outcome) in result.breakdown().iter().enumerate() {
            let chosen = outcome
                .chosen
                .map(|c| usize_to_i64("chosen_option", c))
                .transpose()?;
            sqlx::query(
                r"
                    INSERT INTO assessment_result_answers (
                        result_id, position, chosen_option, correct_option,
                        is_correct, explanation
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(id)
            .bind(usize_to_i64("position", position)?)
            .bind(chosen)
            .bind(usize_to_i64("correct_option", outcome.correct_option)?)
            .bind(i64::from(outcome.is_correct))
            .bind(outcome.explanation.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(id)
    }

    async fn get_result(&self, id: ResultRowId) -> Result<ResultRow, StorageError> {
        let row = sqlx::query(
            r"
                SELECT
                    id, attempt_id, assessment_id, user_id, recorded_at,
                    correct_count, total_questions, percentage
                FROM assessment_results
                WHERE id = ?1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        let breakdown = self.load_breakdown(id).await?;
        map_result_row(&row, breakdown)
    }

    async fn list_results(
        &self,
        user_id: UserId,
        assessment_id: Option<&AssessmentId>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError> {
        self.fetch_rows(user_id, assessment_id, Some(limit)).await
    }

    async fn list_all_results(&self, user_id: UserId) -> Result<Vec<ResultRow>, StorageError> {
        self.fetch_rows(user_id, None, None).await
    }
}
