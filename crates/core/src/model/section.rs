use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minutes assigned to a section when the author does not pick a duration.
pub const DEFAULT_SECTION_MINUTES: u32 = 5;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SectionError {
    #[error("section title cannot be empty")]
    EmptyTitle,

    #[error("section duration must be > 0 minutes")]
    InvalidDuration,
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated section as typed by an author or returned by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SectionDraft {
    pub title: String,
    pub content: String,
    pub duration_minutes: Option<u32>,
}

impl SectionDraft {
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            duration_minutes: None,
        }
    }

    #[must_use]
    pub fn with_duration(mut self, minutes: u32) -> Self {
        self.duration_minutes = Some(minutes);
        self
    }

    /// Validate the draft into an incomplete `Section`.
    ///
    /// # Errors
    ///
    /// Returns `SectionError::EmptyTitle` for a blank title and
    /// `SectionError::InvalidDuration` for a zero duration.
    pub fn validate(self) -> Result<Section, SectionError> {
        Section::new(
            self.title,
            Some(self.content),
            self.duration_minutes.unwrap_or(DEFAULT_SECTION_MINUTES),
        )
    }
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// One timed, completable unit of presentation content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    title: String,
    content: Option<String>,
    duration_minutes: u32,
    completed: bool,
}

impl Section {
    /// Creates a new, incomplete section.
    ///
    /// Title and content are trimmed; blank content is stored as `None`.
    ///
    /// # Errors
    ///
    /// Returns `SectionError` if the title is blank or the duration is zero.
    pub fn new(
        title: impl Into<String>,
        content: Option<String>,
        duration_minutes: u32,
    ) -> Result<Self, SectionError> {
        Self::from_persisted(title, content, duration_minutes, false)
    }

    /// Rehydrate a section from storage, keeping its completion flag.
    ///
    /// # Errors
    ///
    /// Returns `SectionError` if the stored values violate section rules.
    pub fn from_persisted(
        title: impl Into<String>,
        content: Option<String>,
        duration_minutes: u32,
        completed: bool,
    ) -> Result<Self, SectionError> {
        let title = title.into();
        let title = title.trim();
        if title.is_empty() {
            return Err(SectionError::EmptyTitle);
        }
        if duration_minutes == 0 {
            return Err(SectionError::InvalidDuration);
        }

        let content = content
            .map(|c| c.trim().to_owned())
            .filter(|c| !c.is_empty());

        Ok(Self {
            title: title.to_owned(),
            content,
            duration_minutes,
            completed,
        })
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_defaults_to_five_minutes() {
        let section = SectionDraft::new("Intro", "- hello").validate().unwrap();
        assert_eq!(section.duration_minutes(), DEFAULT_SECTION_MINUTES);
        assert!(!section.is_completed());
    }

    #[test]
    fn rejects_blank_title() {
        let err = SectionDraft::new("   ", "body").validate().unwrap_err();
        assert_eq!(err, SectionError::EmptyTitle);
    }

    #[test]
    fn rejects_zero_duration() {
        let err = Section::new("Intro", None, 0).unwrap_err();
        assert_eq!(err, SectionError::InvalidDuration);
    }

    #[test]
    fn trims_title_and_drops_blank_content() {
        let section = Section::new("  Wrap up  ", Some("   ".into()), 3).unwrap();
        assert_eq!(section.title(), "Wrap up");
        assert_eq!(section.content(), None);
    }

    #[test]
    fn from_persisted_keeps_completion() {
        let section = Section::from_persisted("Demo", Some("notes".into()), 10, true).unwrap();
        assert!(section.is_completed());
        assert_eq!(section.content(), Some("notes"));
    }
}
