use std::sync::Arc;

use outline_core::model::{Outline, OutlineDraft, OutlineId};
use outline_core::progress::{DashboardStats, OutlineFilter};
use storage::repository::{OutlineRepository, OutlineSort, StorageError};

use crate::Clock;
use crate::error::OutlineServiceError;

/// Dashboard listing: counts over every outline plus the filtered rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub outlines: Vec<Outline>,
}

/// Orchestrates outline authoring and dashboard listings.
#[derive(Clone)]
pub struct OutlineService {
    clock: Clock,
    outlines: Arc<dyn OutlineRepository>,
}

impl OutlineService {
    #[must_use]
    pub fn new(clock: Clock, outlines: Arc<dyn OutlineRepository>) -> Self {
        Self { clock, outlines }
    }

    /// Validate a draft and persist it with status `draft`.
    ///
    /// The total duration is fixed here and never recomputed.
    ///
    /// # Errors
    ///
    /// Returns `OutlineServiceError::Outline` for validation failures.
    /// Returns `OutlineServiceError::Storage` if persistence fails.
    pub async fn create_outline(&self, draft: OutlineDraft) -> Result<Outline, OutlineServiceError> {
        let new = draft.validate(self.clock.now())?;
        let outline = self.outlines.create_outline(new).await?;
        tracing::info!(
            outline_id = %outline.id(),
            sections = outline.len(),
            total_minutes = outline.total_duration_minutes(),
            "outline created"
        );
        Ok(outline)
    }

    /// Fetch an outline by ID.
    ///
    /// Returns `Ok(None)` when the outline does not exist.
    ///
    /// # Errors
    ///
    /// Returns `OutlineServiceError::Storage` if repository access fails.
    pub async fn get_outline(&self, id: OutlineId) -> Result<Option<Outline>, OutlineServiceError> {
        match self.outlines.get_outline(id).await {
            Ok(outline) => Ok(Some(outline)),
            Err(StorageError::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// # Errors
    ///
    /// Returns `OutlineServiceError::Storage` if repository access fails.
    pub async fn list_outlines(&self, sort: OutlineSort) -> Result<Vec<Outline>, OutlineServiceError> {
        Ok(self.outlines.list_outlines(sort).await?)
    }

    /// Stats are computed over every outline; `filter` only narrows the rows.
    ///
    /// # Errors
    ///
    /// Returns `OutlineServiceError::Storage` if repository access fails.
    pub async fn dashboard(
        &self,
        sort: OutlineSort,
        filter: &OutlineFilter,
    ) -> Result<Dashboard, OutlineServiceError> {
        let all = self.outlines.list_outlines(sort).await?;
        let stats = DashboardStats::from_outlines(&all);
        let outlines = all.into_iter().filter(|o| filter.matches(o)).collect();
        Ok(Dashboard { stats, outlines })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use outline_core::model::{OutlineError, OutlinePatch, OutlineStatus, SectionDraft};
    use outline_core::progress::StatusFilter;
    use outline_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn draft(title: &str, description: &str) -> OutlineDraft {
        OutlineDraft {
            title: title.into(),
            description: description.into(),
            sections: vec![
                SectionDraft::new("Opening", "- hello"),
                SectionDraft::new("Body", "").with_duration(15),
            ],
        }
    }

    #[tokio::test]
    async fn create_outline_snapshots_duration_as_draft() {
        let service = OutlineService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        let outline = service.create_outline(draft("Talk", "")).await.unwrap();
        assert_eq!(outline.status(), OutlineStatus::Draft);
        assert_eq!(outline.total_duration_minutes(), 20);
        assert_eq!(outline.description(), None);
    }

    #[tokio::test]
    async fn create_outline_rejects_blank_title() {
        let service = OutlineService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        let err = service.create_outline(draft("   ", "")).await.unwrap_err();
        assert!(matches!(
            err,
            OutlineServiceError::Outline(OutlineError::EmptyTitle)
        ));
    }

    #[tokio::test]
    async fn get_missing_outline_is_none() {
        let service = OutlineService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        assert!(service.get_outline(OutlineId::new(3)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn dashboard_counts_all_but_lists_filtered() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = OutlineService::new(fixed_clock(), repo.clone());
        let rust = service
            .create_outline(draft("Rust intro", "for the meetup"))
            .await
            .unwrap();
        service
            .create_outline(draft("Quarterly review", "finance"))
            .await
            .unwrap();
        repo.update_outline(rust.id(), OutlinePatch::status(OutlineStatus::Active))
            .await
            .unwrap();

        let filter = OutlineFilter {
            search: "MEETUP".into(),
            status: StatusFilter::All,
        };
        let dashboard = service
            .dashboard(OutlineSort::default(), &filter)
            .await
            .unwrap();
        assert_eq!(dashboard.stats.total, 2);
        assert_eq!(dashboard.stats.active, 1);
        assert_eq!(dashboard.outlines.len(), 1);
        assert_eq!(dashboard.outlines[0].id(), rust.id());

        let drafts = OutlineFilter {
            search: String::new(),
            status: StatusFilter::Only(OutlineStatus::Draft),
        };
        let dashboard = service
            .dashboard(OutlineSort::TitleAsc, &drafts)
            .await
            .unwrap();
        assert_eq!(dashboard.outlines.len(), 1);
        assert_eq!(dashboard.outlines[0].title(), "Quarterly review");
    }
}
