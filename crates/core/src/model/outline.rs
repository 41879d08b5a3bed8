use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::OutlineId;
use crate::model::section::{Section, SectionDraft, SectionError};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OutlineError {
    #[error("outline title cannot be empty")]
    EmptyTitle,

    #[error("outline needs at least one section")]
    NoSections,

    #[error("section {index} is invalid: {source}")]
    InvalidSection {
        index: usize,
        #[source]
        source: SectionError,
    },

    #[error("total duration does not fit in u32 minutes")]
    DurationOverflow,

    #[error("section index {index} is out of range for {len} sections")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("status {status} does not match section completion")]
    StatusMismatch { status: OutlineStatus },

    #[error("invalid status: {0}")]
    InvalidStatus(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle label of an outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlineStatus {
    Draft,
    Active,
    Completed,
}

impl OutlineStatus {
    /// Status implied by the completion flags of `sections` once a session has started.
    ///
    /// An empty outline is never `Completed`.
    #[must_use]
    pub fn for_sections(sections: &[Section]) -> Self {
        if all_completed(sections) {
            Self::Completed
        } else {
            Self::Active
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for OutlineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutlineStatus {
    type Err = OutlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(OutlineError::InvalidStatus(other.to_string())),
        }
    }
}

fn all_completed(sections: &[Section]) -> bool {
    !sections.is_empty() && sections.iter().all(Section::is_completed)
}

fn check_status(status: OutlineStatus, sections: &[Section]) -> Result<(), OutlineError> {
    if (status == OutlineStatus::Completed) == all_completed(sections) {
        Ok(())
    } else {
        Err(OutlineError::StatusMismatch { status })
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated outline as assembled by the authoring flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutlineDraft {
    pub title: String,
    pub description: String,
    pub sections: Vec<SectionDraft>,
}

impl OutlineDraft {
    /// Validate the draft and take the duration snapshot.
    ///
    /// `total_duration_minutes` is summed here once and is never recomputed afterwards.
    ///
    /// # Errors
    ///
    /// Returns `OutlineError::EmptyTitle`, `OutlineError::NoSections`,
    /// `OutlineError::InvalidSection` pointing at the first bad section, or
    /// `OutlineError::DurationOverflow` when the durations do not fit in a `u32`.
    pub fn validate(self, now: DateTime<Utc>) -> Result<NewOutline, OutlineError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(OutlineError::EmptyTitle);
        }
        if self.sections.is_empty() {
            return Err(OutlineError::NoSections);
        }

        let sections = self
            .sections
            .into_iter()
            .enumerate()
            .map(|(index, draft)| {
                draft
                    .validate()
                    .map_err(|source| OutlineError::InvalidSection { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let total_duration_minutes = sections
            .iter()
            .map(Section::duration_minutes)
            .try_fold(0_u32, u32::checked_add)
            .ok_or(OutlineError::DurationOverflow)?;
        let description = Some(self.description.trim().to_owned()).filter(|d| !d.is_empty());

        Ok(NewOutline {
            title,
            description,
            sections,
            total_duration_minutes,
            status: OutlineStatus::Draft,
            created_at: now,
        })
    }
}

/// Validated outline waiting for the store to assign an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOutline {
    pub title: String,
    pub description: Option<String>,
    pub sections: Vec<Section>,
    pub total_duration_minutes: u32,
    pub status: OutlineStatus,
    pub created_at: DateTime<Utc>,
}

impl NewOutline {
    #[must_use]
    pub fn assign_id(self, id: OutlineId) -> Outline {
        Outline {
            id,
            title: self.title,
            description: self.description,
            sections: self.sections,
            total_duration_minutes: self.total_duration_minutes,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

//
// ─── PATCH ─────────────────────────────────────────────────────────────────────
//

/// Partial update merged into a stored outline. `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutlinePatch {
    pub sections: Option<Vec<Section>>,
    pub status: Option<OutlineStatus>,
}

impl OutlinePatch {
    #[must_use]
    pub fn status(status: OutlineStatus) -> Self {
        Self {
            sections: None,
            status: Some(status),
        }
    }

    #[must_use]
    pub fn sections_and_status(sections: Vec<Section>, status: OutlineStatus) -> Self {
        Self {
            sections: Some(sections),
            status: Some(status),
        }
    }

}

//
// ─── OUTLINE ───────────────────────────────────────────────────────────────────
//

/// A presentation: ordered sections plus aggregate status and duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    id: OutlineId,
    title: String,
    description: Option<String>,
    sections: Vec<Section>,
    total_duration_minutes: u32,
    status: OutlineStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Outline {
    /// Rehydrate an outline from storage.
    ///
    /// # Errors
    ///
    /// Returns `OutlineError::EmptyTitle` for a blank title and
    /// `OutlineError::StatusMismatch` when `status` disagrees with section completion.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: OutlineId,
        title: impl Into<String>,
        description: Option<String>,
        sections: Vec<Section>,
        total_duration_minutes: u32,
        status: OutlineStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, OutlineError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(OutlineError::EmptyTitle);
        }
        check_status(status, &sections)?;

        Ok(Self {
            id,
            title,
            description,
            sections,
            total_duration_minutes,
            status,
            created_at,
            updated_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> OutlineId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sum of section durations taken when the outline was created.
    #[must_use]
    pub fn total_duration_minutes(&self) -> u32 {
        self.total_duration_minutes
    }

    #[must_use]
    pub fn status(&self) -> OutlineStatus {
        self.status
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn check_index(&self, index: usize) -> Result<(), OutlineError> {
        if index < self.sections.len() {
            Ok(())
        } else {
            Err(OutlineError::IndexOutOfRange {
                index,
                len: self.sections.len(),
            })
        }
    }

    /// Compute the patch that marks `index` completed. `self` is not modified.
    ///
    /// The status becomes `Completed` once every section is done, `Active` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `OutlineError::IndexOutOfRange` if `index >= len()`.
    pub fn completion_patch(&self, index: usize) -> Result<OutlinePatch, OutlineError> {
        self.check_index(index)?;
        let mut sections = self.sections.clone();
        sections[index].set_completed(true);
        let status = OutlineStatus::for_sections(&sections);
        Ok(OutlinePatch::sections_and_status(sections, status))
    }

    /// Compute the patch that marks `index` incomplete. `self` is not modified.
    ///
    /// The status is forced to `Active`, never back to `Draft`.
    ///
    /// # Errors
    ///
    /// Returns `OutlineError::IndexOutOfRange` if `index >= len()`.
    pub fn undo_patch(&self, index: usize) -> Result<OutlinePatch, OutlineError> {
        self.check_index(index)?;
        let mut sections = self.sections.clone();
        sections[index].set_completed(false);
        Ok(OutlinePatch::sections_and_status(
            sections,
            OutlineStatus::Active,
        ))
    }

    /// True when applying `patch` would leave sections and status as they are.
    #[must_use]
    pub fn is_unchanged_by(&self, patch: &OutlinePatch) -> bool {
        patch.sections.as_ref().is_none_or(|s| *s == self.sections)
            && patch.status.is_none_or(|s| s == self.status)
    }

    /// Merge `patch` into this outline.
    ///
    /// The merge is all-or-nothing: on error `self` is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `OutlineError::StatusMismatch` if the merged status would disagree
    /// with section completion.
    pub fn apply_patch(
        &mut self,
        patch: OutlinePatch,
        updated_at: DateTime<Utc>,
    ) -> Result<(), OutlineError> {
        let status = patch.status.unwrap_or(self.status);
        let sections_ref = patch.sections.as_deref().unwrap_or(&self.sections);
        check_status(status, sections_ref)?;

        if let Some(sections) = patch.sections {
            self.sections = sections;
        }
        self.status = status;
        self.updated_at = updated_at;
        Ok(())
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
