use std::sync::Arc;

use coach_core::Catalog;
use coach_core::model::{AssessmentId, UserId};
use storage::repository::AssessmentResultRepository;

use super::controller::{AttemptController, AttemptSettings};
use crate::Clock;
use crate::error::AttemptError;

/// Hands out attempt controllers for assessments in the catalog.
#[derive(Clone)]
pub struct AssessmentService {
    clock: Clock,
    catalog: Arc<Catalog>,
    results: Arc<dyn AssessmentResultRepository>,
    settings: AttemptSettings,
}

impl AssessmentService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<Catalog>,
        results: Arc<dyn AssessmentResultRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            results,
            settings: AttemptSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: AttemptSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Prepare a `NotStarted` attempt for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `AttemptError::UnknownAssessment` if the id is not in the catalog.
    pub fn begin(
        &self,
        assessment_id: &AssessmentId,
        user_id: UserId,
    ) -> Result<AttemptController, AttemptError> {
        let definition = self
            .catalog
            .get(assessment_id)
            .ok_or_else(|| AttemptError::UnknownAssessment(assessment_id.clone()))?;

        Ok(AttemptController::new(
            self.clock,
            user_id,
            definition,
            Arc::clone(&self.results),
            self.settings,
        ))
    }
}
