use std::sync::Arc;

use practice_core::Clock;
use storage::repository::Storage;

use crate::adaptive::AdaptiveService;
use crate::catalog::CatalogService;
use crate::error::AppServicesError;
use crate::generation::{GenerationConfig, QuestionGenerator};
use crate::practice::PracticeService;

/// Assembles the app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    practice: Arc<PracticeService>,
    catalog: Arc<CatalogService>,
    adaptive: Arc<AdaptiveService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, with question generation
    /// configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(
            storage,
            clock,
            GenerationConfig::from_env(),
        ))
    }

    /// Build services over the in-memory backend (tests, prototyping).
    /// Question generation is disabled unless a config is given.
    #[must_use]
    pub fn in_memory(clock: Clock, generation: Option<GenerationConfig>) -> Self {
        Self::with_storage(Storage::in_memory(), clock, generation)
    }

    fn with_storage(storage: Storage, clock: Clock, generation: Option<GenerationConfig>) -> Self {
        let adaptive = Arc::new(AdaptiveService::new(clock, Arc::clone(&storage.progress)));
        let generator = Arc::new(QuestionGenerator::new(
            generation,
            clock,
            Arc::clone(&storage.units),
            Arc::clone(&storage.questions),
        ));
        let practice = Arc::new(PracticeService::new(
            clock,
            Arc::clone(&storage.users),
            Arc::clone(&storage.units),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.sessions),
            Arc::clone(&storage.responses),
            AdaptiveService::new(clock, Arc::clone(&storage.progress)),
            generator,
        ));
        let catalog = Arc::new(CatalogService::new(
            Arc::clone(&storage.units),
            Arc::clone(&storage.progress),
        ));

        Self {
            storage,
            practice,
            catalog,
            adaptive,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn practice(&self) -> Arc<PracticeService> {
        Arc::clone(&self.practice)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn adaptive(&self) -> Arc<AdaptiveService> {
        Arc::clone(&self.adaptive)
    }
}
