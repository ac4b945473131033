use async_trait::async_trait;
use coach_core::model::{AssessmentId, ResultRecord, UserId};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Storage identifier for a recorded result.
///
/// NOTE: This is `i64` to match `SQLite` row IDs.
pub type ResultRowId = i64;

/// A recorded result together with its storage id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    pub id: ResultRowId,
    pub record: ResultRecord,
}

impl ResultRow {
    #[must_use]
    pub fn new(id: ResultRowId, record: ResultRecord) -> Self {
        Self { id, record }
    }
}

/// Repository contract for completed assessment results.
#[async_trait]
pub trait AssessmentResultRepository: Send + Sync {
    /// Record the result of a completed attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the attempt was already recorded, or
    /// other storage errors.
    async fn record_result(&self, record: &ResultRecord) -> Result<ResultRowId, StorageError>;

    /// Fetch a recorded result by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_result(&self, id: ResultRowId) -> Result<ResultRow, StorageError>;

    /// List a user's results, newest first, optionally for one assessment.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_results(
        &self,
        user_id: UserId,
        assessment_id: Option<&AssessmentId>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError>;

    /// Every result recorded for a user, newest first. Used for aggregates.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on adapter failures.
    async fn list_all_results(&self, user_id: UserId) -> Result<Vec<ResultRow>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    results: Arc<Mutex<Vec<ResultRow>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn matching_rows(
        &self,
        user_id: UserId,
        assessment_id: Option<&AssessmentId>,
    ) -> Result<Vec<ResultRow>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut rows: Vec<ResultRow> = guard
            .iter()
            .filter(|row| row.record.context.user_id == user_id)
            .filter(|row| assessment_id.is_none_or(|id| &row.record.context.assessment_id == id))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.record
                .context
                .recorded_at
                .cmp(&a.record.context.recorded_at)
                .then(b.id.cmp(&a.id))
        });
        Ok(rows)
    }
}

#[async_trait]
impl AssessmentResultRepository for InMemoryRepository {
    async fn record_result(&self, record: &ResultRecord) -> Result<ResultRowId, StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.iter().any(|row| row.record.attempt_id == record.attempt_id) {
            return Err(StorageError::Conflict);
        }
        let id = guard.last().map_or(1, |row| row.id + 1);
        guard.push(ResultRow::new(id, record.clone()));
        Ok(id)
    }

    async fn get_result(&self, id: ResultRowId) -> Result<ResultRow, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|row| row.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_results(
        &self,
        user_id: UserId,
        assessment_id: Option<&AssessmentId>,
        limit: u32,
    ) -> Result<Vec<ResultRow>, StorageError> {
        let mut rows = self.matching_rows(user_id, assessment_id)?;
        rows.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(rows)
    }

    async fn list_all_results(&self, user_id: UserId) -> Result<Vec<ResultRow>, StorageError> {
        self.matching_rows(user_id, None)
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub results: Arc<dyn AssessmentResultRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            results: Arc::new(InMemoryRepository::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coach_core::model::{AttemptId, ResultContext};
    use coach_core::scoring::score;
    use coach_core::time::fixed_now;
    use coach_core::Catalog;

    fn record(assessment: &str, user: u64, minutes: i64) -> ResultRecord {
        let catalog = Catalog::builtin().unwrap();
        let id = AssessmentId::new(assessment).unwrap();
        let def = catalog.get(&id).unwrap();
        ResultRecord::new(
            AttemptId::generate(),
            ResultContext {
                assessment_id: id,
                user_id: UserId::new(user),
                recorded_at: fixed_now() + chrono::Duration::minutes(minutes),
            },
            score(&def, &[Some(1)]),
        )
    }

    #[tokio::test]
    async fn records_and_fetches_results() {
        let repo = InMemoryRepository::new();
        let rec = record("resume-fundamentals", 1, 0);

        let id = repo.record_result(&rec).await.unwrap();
        let row = repo.get_result(id).await.unwrap();
        assert_eq!(row.record, rec);
        assert!(matches!(
            repo.get_result(id + 1).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn duplicate_attempt_is_a_conflict() {
        let repo = InMemoryRepository::new();
        let rec = record("resume-fundamentals", 1, 0);
        repo.record_result(&rec).await.unwrap();

        assert!(matches!(
            repo.record_result(&rec).await,
            Err(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn lists_newest_first_per_user_and_assessment() {
        let repo = InMemoryRepository::new();
        repo.record_result(&record("resume-fundamentals", 1, 0)).await.unwrap();
        repo.record_result(&record("product-sense", 1, 5)).await.unwrap();
        repo.record_result(&record("resume-fundamentals", 1, 10)).await.unwrap();
        repo.record_result(&record("resume-fundamentals", 2, 20)).await.unwrap();

        let all = repo.list_results(UserId::new(1), None, 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all[0].record.context.recorded_at > all[1].record.context.recorded_at);

        let resume = AssessmentId::new("resume-fundamentals").unwrap();
        let filtered = repo
            .list_results(UserId::new(1), Some(&resume), 1)
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].record.context.recorded_at, fixed_now() + chrono::Duration::minutes(10));
    }

    #[tokio::test]
    async fn list_all_ignores_limits_but_not_users() {
        let repo = InMemoryRepository::new();
        for minute in 0..5 {
            repo.record_result(&record("product-sense", 1, minute)).await.unwrap();
        }
        repo.record_result(&record("product-sense", 2, 9)).await.unwrap();

        let all = repo.list_all_results(UserId::new(1)).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].record.context.recorded_at, fixed_now() + chrono::Duration::minutes(4));
    }
}
