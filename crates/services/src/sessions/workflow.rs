use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use outline_core::model::{OutlineId, OutlinePatch, OutlineStatus};
use outline_core::progress::OutlineProgress;
use storage::repository::{OutlineRepository, StorageError};

use super::session::PresentationSession;
use crate::Clock;
use crate::error::SessionError;

/// Upper bound for a single outline store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of completing or undoing one section.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOutcome {
    pub index: usize,
    pub status: OutlineStatus,
    pub progress: OutlineProgress,
    /// False when the write was skipped because nothing would change.
    pub persisted: bool,
}

/// Opens sessions and synchronizes section completion with the outline store.
///
/// Every mutation is persisted first and committed to the session only after the
/// store acknowledges. A failed or timed-out write leaves the session untouched.
#[derive(Clone)]
pub struct PresentationService {
    clock: Clock,
    outlines: Arc<dyn OutlineRepository>,
    store_timeout: Duration,
    skip_redundant_writes: bool,
}

impl PresentationService {
    #[must_use]
    pub fn new(clock: Clock, outlines: Arc<dyn OutlineRepository>) -> Self {
        Self {
            clock,
            outlines,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            skip_redundant_writes: false,
        }
    }

    #[must_use]
    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Skip the store call when a mutation would not change sections or status.
    ///
    /// Off by default: completing an already-completed section still writes.
    #[must_use]
    pub fn with_skip_redundant_writes(mut self, skip: bool) -> Self {
        self.skip_redundant_writes = skip;
        self
    }

    async fn store_call<T>(
        &self,
        id: OutlineId,
        op: &'static str,
        call: impl Future<Output = Result<T, StorageError>>,
    ) -> Result<T, SessionError> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(StorageError::NotFound)) => {
                tracing::debug!(outline_id = %id, op, "outline not found");
                Err(SessionError::NotFound(id))
            }
            Ok(Err(err)) => {
                tracing::warn!(outline_id = %id, op, error = %err, "outline store call failed");
                Err(SessionError::from_storage(id, err))
            }
            Err(_) => {
                tracing::warn!(
                    outline_id = %id,
                    op,
                    timeout = ?self.store_timeout,
                    "outline store call timed out"
                );
                Err(SessionError::timeout(self.store_timeout))
            }
        }
    }

    /// Load an outline for live delivery.
    ///
    /// A non-completed outline is moved to `Active` in the store before the session
    /// starts. The returned session starts at the first section with focus mode off.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if no outline has this id and
    /// `SessionError::StoreUnavailable` if a store call fails or times out.
    pub async fn open_session(&self, id: OutlineId) -> Result<PresentationSession, SessionError> {
        let outline = self
            .store_call(id, "get", self.outlines.get_outline(id))
            .await?;

        let outline = if outline.status() == OutlineStatus::Completed {
            outline
        } else {
            let previous = outline.status();
            let updated = self
                .store_call(
                    id,
                    "activate",
                    self.outlines
                        .update_outline(id, OutlinePatch::status(OutlineStatus::Active)),
                )
                .await?;
            if previous != OutlineStatus::Active {
                tracing::info!(outline_id = %id, from = %previous, to = %updated.status(), "outline status changed");
            }
            updated
        };

        tracing::info!(
            outline_id = %id,
            sections = outline.len(),
            status = %outline.status(),
            "presentation session opened"
        );
        Ok(PresentationSession::new(outline, self.clock.now()))
    }

    /// Mark section `index` completed and persist it.
    ///
    /// The outline becomes `Completed` when this was the last incomplete section.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Validation` for an out-of-range index (no store call is made),
    /// `SessionError::NotFound` if the outline disappeared from the store, or
    /// `SessionError::StoreUnavailable` if the write fails or times out.
    pub async fn complete_section(
        &self,
        session: &mut PresentationSession,
        index: usize,
    ) -> Result<CompletionOutcome, SessionError> {
        let patch = session.outline().completion_patch(index)?;
        self.persist_and_commit(session, index, patch, "complete")
            .await
    }

    /// Mark section `index` incomplete and persist it. The outline is forced to `Active`.
    ///
    /// # Errors
    ///
    /// Same as [`PresentationService::complete_section`].
    pub async fn undo_section(
        &self,
        session: &mut PresentationSession,
        index: usize,
    ) -> Result<CompletionOutcome, SessionError> {
        let patch = session.outline().undo_patch(index)?;
        self.persist_and_commit(session, index, patch, "undo").await
    }

    /// Complete the section under the cursor.
    ///
    /// # Errors
    ///
    /// Same as [`PresentationService::complete_section`].
    pub async fn complete_current(
        &self,
        session: &mut PresentationSession,
    ) -> Result<CompletionOutcome, SessionError> {
        let index = session.current_index();
        self.complete_section(session, index).await
    }

    /// Undo the section under the cursor.
    ///
    /// # Errors
    ///
    /// Same as [`PresentationService::complete_section`].
    pub async fn undo_current(
        &self,
        session: &mut PresentationSession,
    ) -> Result<CompletionOutcome, SessionError> {
        let index = session.current_index();
        self.undo_section(session, index).await
    }

    async fn persist_and_commit(
        &self,
        session: &mut PresentationSession,
        index: usize,
        patch: OutlinePatch,
        op: &'static str,
    ) -> Result<CompletionOutcome, SessionError> {
        let id = session.outline().id();
        let previous = session.status();

        if self.skip_redundant_writes && session.outline().is_unchanged_by(&patch) {
            tracing::debug!(outline_id = %id, index, op, "skipping redundant write");
            return Ok(CompletionOutcome {
                index,
                status: previous,
                progress: OutlineProgress::of(session.outline()),
                persisted: false,
            });
        }

        let acked = self
            .store_call(id, op, self.outlines.update_outline(id, patch.clone()))
            .await?;

        session.commit(patch, acked.updated_at())?;

        let status = session.status();
        if status != previous {
            tracing::info!(outline_id = %id, from = %previous, to = %status, "outline status changed");
        }
        tracing::debug!(outline_id = %id, index, op, "section change committed");

        Ok(CompletionOutcome {
            index,
            status,
            progress: OutlineProgress::of(session.outline()),
            persisted: true,
        })
    }
}
