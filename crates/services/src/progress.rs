use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use coach_core::Catalog;
use coach_core::model::{AssessmentId, UserId};
use coach_core::scoring::{average_percent, percentage};
use storage::repository::{AssessmentResultRepository, ResultRow, ResultRowId};

use crate::error::ProgressError;

/// Presentation-agnostic list item for a recorded result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultListItem {
    pub id: ResultRowId,
    pub assessment_id: AssessmentId,
    pub recorded_at: DateTime<Utc>,
    pub correct: u32,
    pub total: u32,
    pub percentage: u8,
}

impl ResultListItem {
    #[must_use]
    pub fn from_row(row: &ResultRow) -> Self {
        let result = &row.record.result;
        Self {
            id: row.id,
            assessment_id: row.record.context.assessment_id.clone(),
            recorded_at: row.record.context.recorded_at,
            correct: result.correct_count(),
            total: result.total_questions(),
            percentage: result.percentage(),
        }
    }
}

/// Aggregate over every attempt at one assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssessmentProgress {
    pub assessment_id: AssessmentId,
    pub attempts: u32,
    pub best_percentage: u8,
    pub latest_percentage: u8,
    pub average_percentage: u8,
}

/// Aggregate over a user's whole history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressOverview {
    pub attempts: u32,
    pub average_percentage: u8,
    pub best_percentage: u8,
    pub assessments_attempted: u32,
    pub catalog_size: u32,
    /// Share of catalog assessments attempted at least once.
    pub completion_percentage: u8,
    /// Catalog order; assessments no longer in the catalog come last, by id.
    pub per_assessment: Vec<AssessmentProgress>,
}

#[derive(Default)]
struct Tally {
    attempts: u32,
    sum: u64,
    best: u8,
    latest: Option<(DateTime<Utc>, ResultRowId, u8)>,
}

impl Tally {
    fn add(&mut self, row: &ResultRow) {
        let pct = row.record.result.percentage();
        let key = (row.record.context.recorded_at, row.id);
        self.attempts = self.attempts.saturating_add(1);
        self.sum += u64::from(pct);
        self.best = self.best.max(pct);
        if self.latest.is_none_or(|(at, id, _)| key > (at, id)) {
            self.latest = Some((key.0, key.1, pct));
        }
    }
}

/// Summarize result rows against the catalog. Pure; row order does not matter.
#[must_use]
pub fn summarize(rows: &[ResultRow], catalog: &Catalog) -> ProgressOverview {
    let mut tallies: HashMap<&AssessmentId, Tally> = HashMap::new();
    let mut sum = 0_u64;
    let mut best = 0_u8;
    for row in rows {
        tallies
            .entry(&row.record.context.assessment_id)
            .or_default()
            .add(row);
        sum += u64::from(row.record.result.percentage());
        best = best.max(row.record.result.percentage());
    }

    let mut ordered: Vec<&AssessmentId> = catalog
        .iter()
        .map(|d| d.id())
        .filter(|id| tallies.contains_key(id))
        .collect();
    let in_catalog = u32::try_from(ordered.len()).unwrap_or(u32::MAX);
    let mut retired: Vec<&AssessmentId> = tallies
        .keys()
        .copied()
        .filter(|id| catalog.get(id).is_none())
        .collect();
    retired.sort();
    ordered.extend(retired);

    let per_assessment = ordered
        .into_iter()
        .filter_map(|id| {
            let tally = tallies.get(id)?;
            Some(AssessmentProgress {
                assessment_id: id.clone(),
                attempts: tally.attempts,
                best_percentage: tally.best,
                latest_percentage: tally.latest.map_or(0, |(_, _, pct)| pct),
                average_percentage: average_percent(tally.sum, u64::from(tally.attempts)),
            })
        })
        .collect::<Vec<_>>();

    let catalog_size = u32::try_from(catalog.len()).unwrap_or(u32::MAX);
    let attempts = u32::try_from(rows.len()).unwrap_or(u32::MAX);

    ProgressOverview {
        attempts,
        average_percentage: average_percent(sum, u64::from(attempts)),
        best_percentage: best,
        assessments_attempted: u32::try_from(per_assessment.len()).unwrap_or(u32::MAX),
        catalog_size,
        completion_percentage: percentage(in_catalog, catalog_size),
        per_assessment,
    }
}

/// Read-side facade over recorded results.
#[derive(Clone)]
pub struct ProgressService {
    results: Arc<dyn AssessmentResultRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(results: Arc<dyn AssessmentResultRepository>) -> Self {
        Self { results }
    }

    /// Most recent results for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on repository failures.
    pub async fn recent_results(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<ResultListItem>, ProgressError> {
        let rows = self.results.list_results(user_id, None, limit).await?;
        Ok(rows.iter().map(ResultListItem::from_row).collect())
    }

    /// Progress across the catalog for a user, over their whole history.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` on repository failures.
    pub async fn overview(
        &self,
        user_id: UserId,
        catalog: &Catalog,
    ) -> Result<ProgressOverview, ProgressError> {
        let rows = self.results.list_all_results(user_id).await?;
        Ok(summarize(&rows, catalog))
    }
}
