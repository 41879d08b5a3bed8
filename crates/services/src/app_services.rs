use std::sync::Arc;
use std::time::Duration;

use storage::repository::Storage;

use crate::Clock;
use crate::error::AppServicesError;
use crate::generator::{ChatOutlineGenerator, OutlineGenerator};
use crate::outline_service::OutlineService;
use crate::sessions::{DEFAULT_STORE_TIMEOUT, PresentationService};

/// Knobs for the presentation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceConfig {
    pub store_timeout: Duration,
    pub skip_redundant_writes: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
            skip_redundant_writes: false,
        }
    }
}

/// Assembles app-facing services over one outline store.
#[derive(Clone)]
pub struct AppServices {
    outlines: Arc<OutlineService>,
    presentations: Arc<PresentationService>,
    generator: Arc<dyn OutlineGenerator>,
    generator_enabled: bool,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: ServiceConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url, clock).await?;
        Ok(Self::from_storage(&storage, clock, config))
    }

    /// Build services over a fresh in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock, config: ServiceConfig) -> Self {
        Self::from_storage(&Storage::in_memory(clock), clock, config)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, config: ServiceConfig) -> Self {
        let outlines = Arc::new(OutlineService::new(clock, Arc::clone(&storage.outlines)));
        let presentations = Arc::new(
            PresentationService::new(clock, Arc::clone(&storage.outlines))
                .with_store_timeout(config.store_timeout)
                .with_skip_redundant_writes(config.skip_redundant_writes),
        );
        let generator = ChatOutlineGenerator::from_env();
        let generator_enabled = generator.enabled();

        Self {
            outlines,
            presentations,
            generator: Arc::new(generator),
            generator_enabled,
        }
    }

    /// Swap the text-to-outline backend.
    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn OutlineGenerator>) -> Self {
        self.generator = generator;
        self.generator_enabled = true;
        self
    }

    #[must_use]
    pub fn outlines(&self) -> Arc<OutlineService> {
        Arc::clone(&self.outlines)
    }

    #[must_use]
    pub fn presentations(&self) -> Arc<PresentationService> {
        Arc::clone(&self.presentations)
    }

    #[must_use]
    pub fn generator(&self) -> Arc<dyn OutlineGenerator> {
        Arc::clone(&self.generator)
    }

    #[must_use]
    pub fn generator_enabled(&self) -> bool {
        self.generator_enabled
    }
}
