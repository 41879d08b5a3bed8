use async_trait::async_trait;
use outline_core::Clock;
use outline_core::model::{NewOutline, Outline, OutlineId, OutlinePatch};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Ordering for dashboard listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutlineSort {
    /// Newest first.
    #[default]
    CreatedDesc,
    CreatedAsc,
    UpdatedDesc,
    TitleAsc,
}

impl OutlineSort {
    #[must_use]
    pub fn as_key(self) -> &'static str {
        match self {
            Self::CreatedDesc => "-created_date",
            Self::CreatedAsc => "created_date",
            Self::UpdatedDesc => "-updated_date",
            Self::TitleAsc => "title",
        }
    }

    fn sort(self, outlines: &mut [Outline]) {
        match self {
            Self::CreatedDesc => outlines.sort_by(|a, b| {
                b.created_at()
                    .cmp(&a.created_at())
                    .then_with(|| b.id().cmp(&a.id()))
            }),
            Self::CreatedAsc => outlines.sort_by(|a, b| {
                a.created_at()
                    .cmp(&b.created_at())
                    .then_with(|| a.id().cmp(&b.id()))
            }),
            Self::UpdatedDesc => outlines.sort_by(|a, b| {
                b.updated_at()
                    .cmp(&a.updated_at())
                    .then_with(|| b.id().cmp(&a.id()))
            }),
            Self::TitleAsc => outlines.sort_by(|a, b| {
                a.title()
                    .to_lowercase()
                    .cmp(&b.title().to_lowercase())
                    .then_with(|| a.id().cmp(&b.id()))
            }),
        }
    }
}

impl fmt::Display for OutlineSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

impl FromStr for OutlineSort {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-created_date" => Ok(Self::CreatedDesc),
            "created_date" => Ok(Self::CreatedAsc),
            "-updated_date" => Ok(Self::UpdatedDesc),
            "title" => Ok(Self::TitleAsc),
            other => Err(StorageError::Serialization(format!(
                "unknown sort key: {other}"
            ))),
        }
    }
}

/// Outline Store contract.
#[async_trait]
pub trait OutlineRepository: Send + Sync {
    /// Persist a validated outline and assign its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the outline cannot be stored.
    async fn create_outline(&self, outline: NewOutline) -> Result<Outline, StorageError>;

    /// Fetch an outline by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_outline(&self, id: OutlineId) -> Result<Outline, StorageError>;

    /// Merge `patch` into the stored outline and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, `StorageError::Conflict` if the
    /// merged record would break the status invariant, or other storage errors.
    async fn update_outline(
        &self,
        id: OutlineId,
        patch: OutlinePatch,
    ) -> Result<Outline, StorageError>;

    /// List every outline in the requested order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn list_outlines(&self, sort: OutlineSort) -> Result<Vec<Outline>, StorageError>;
}

#[derive(Default)]
struct InMemoryState {
    next_id: u64,
    outlines: HashMap<OutlineId, Outline>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    clock: Clock,
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `clock` for `updated_at` stamps.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl OutlineRepository for InMemoryRepository {
    async fn create_outline(&self, outline: NewOutline) -> Result<Outline, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.next_id += 1;
        let id = OutlineId::new(guard.next_id);
        let outline = outline.assign_id(id);
        guard.outlines.insert(id, outline.clone());
        Ok(outline)
    }

    async fn get_outline(&self, id: OutlineId) -> Result<Outline, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.outlines.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn update_outline(
        &self,
        id: OutlineId,
        patch: OutlinePatch,
    ) -> Result<Outline, StorageError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let outline = guard.outlines.get_mut(&id).ok_or(StorageError::NotFound)?;
        outline
            .apply_patch(patch, self.clock.now())
            .map_err(|e| StorageError::Conflict(e.to_string()))?;
        Ok(outline.clone())
    }

    async fn list_outlines(&self, sort: OutlineSort) -> Result<Vec<Outline>, StorageError> {
        let guard = self
            .state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut outlines: Vec<Outline> = guard.outlines.values().cloned().collect();
        sort.sort(&mut outlines);
        Ok(outlines)
    }
}

/// Outline store behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub outlines: Arc<dyn OutlineRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self {
            outlines: Arc::new(InMemoryRepository::new().with_clock(clock)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use outline_core::model::{OutlineDraft, OutlineStatus, SectionDraft};
    use outline_core::time::{fixed_clock, fixed_now};

    fn new_outline(title: &str, sections: usize) -> NewOutline {
        OutlineDraft {
            title: title.into(),
            description: String::new(),
            sections: (0..sections)
                .map(|i| SectionDraft::new(format!("Part {i}"), ""))
                .collect(),
        }
        .validate(fixed_now())
        .unwrap()
    }

    #[tokio::test]
    async fn create_assigns_increasing_ids_and_draft_status() {
        let repo = InMemoryRepository::new();
        let a = repo.create_outline(new_outline("A", 1)).await.unwrap();
        let b = repo.create_outline(new_outline("B", 2)).await.unwrap();
        assert_eq!(a.id(), OutlineId::new(1));
        assert_eq!(b.id(), OutlineId::new(2));
        assert_eq!(b.status(), OutlineStatus::Draft);
        assert_eq!(b.total_duration_minutes(), 10);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get_outline(OutlineId::new(9)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn update_merges_only_given_fields() {
        let mut clock = fixed_clock();
        clock.advance(Duration::hours(1));
        let repo = InMemoryRepository::new().with_clock(clock);
        let created = repo.create_outline(new_outline("A", 2)).await.unwrap();

        let updated = repo
            .update_outline(created.id(), OutlinePatch::status(OutlineStatus::Active))
            .await
            .unwrap();
        assert_eq!(updated.status(), OutlineStatus::Active);
        assert_eq!(updated.sections(), created.sections());
        assert_eq!(updated.updated_at(), fixed_now() + Duration::hours(1));

        let fetched = repo.get_outline(created.id()).await.unwrap();
        assert_eq!(fetched, updated);
    }

    #[tokio::test]
    async fn update_rejects_invariant_breaking_patch() {
        let repo = InMemoryRepository::new();
        let created = repo.create_outline(new_outline("A", 1)).await.unwrap();
        let err = repo
            .update_outline(created.id(), OutlinePatch::status(OutlineStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        let fetched = repo.get_outline(created.id()).await.unwrap();
        assert_eq!(fetched.status(), OutlineStatus::Draft);
    }

    #[tokio::test]
    async fn list_orders_by_sort_key() {
        let repo = InMemoryRepository::new();
        repo.create_outline(new_outline("beta", 1)).await.unwrap();
        repo.create_outline(new_outline("Alpha", 1)).await.unwrap();

        let newest_first = repo.list_outlines(OutlineSort::CreatedDesc).await.unwrap();
        let ids: Vec<_> = newest_first.iter().map(|o| o.id().value()).collect();
        assert_eq!(ids, vec![2, 1]);

        let by_title = repo.list_outlines(OutlineSort::TitleAsc).await.unwrap();
        assert_eq!(by_title[0].title(), "Alpha");
    }

    #[test]
    fn sort_keys_parse() {
        assert_eq!(
            "-created_date".parse::<OutlineSort>().unwrap(),
            OutlineSort::CreatedDesc
        );
        assert!("random".parse::<OutlineSort>().is_err());
    }
}
