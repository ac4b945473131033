use std::sync::Arc;

use coach_core::Catalog;
use storage::repository::Storage;

use crate::Clock;
use crate::attempts::{AssessmentService, AttemptSettings};
use crate::error::AppServicesError;
use crate::progress::ProgressService;

/// Assembles app-facing services over one storage backend and the built-in catalog.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<Catalog>,
    assessments: Arc<AssessmentService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or catalog loading fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        settings: AttemptSettings,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Self::from_storage(&storage, clock, settings)
    }

    /// Build services over in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Catalog` if the built-in catalog is invalid.
    pub fn in_memory(clock: Clock) -> Result<Self, AppServicesError> {
        Self::from_storage(&Storage::in_memory(), clock, AttemptSettings::default())
    }

    fn from_storage(
        storage: &Storage,
        clock: Clock,
        settings: AttemptSettings,
    ) -> Result<Self, AppServicesError> {
        let catalog = Arc::new(Catalog::builtin()?);
        let assessments = Arc::new(
            AssessmentService::new(clock, Arc::clone(&catalog), Arc::clone(&storage.results))
                .with_settings(settings),
        );
        let progress = Arc::new(ProgressService::new(Arc::clone(&storage.results)));

        Ok(Self {
            catalog,
            assessments,
            progress,
        })
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn assessments(&self) -> Arc<AssessmentService> {
        Arc::clone(&self.assessments)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
