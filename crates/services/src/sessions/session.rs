use chrono::{DateTime, Utc};
use std::fmt;

use outline_core::model::{Outline, OutlineError, OutlinePatch, OutlineStatus, Section};
use outline_core::progress::{OutlineProgress, section_markers};

use super::navigator::{NavCommand, SessionNavigator};
use super::progress::SessionProgress;

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Live delivery state for one outline: the outline itself plus a navigator.
///
/// The outline is only readable from outside this crate. Completion changes go
/// through `PresentationService`, which commits them after the store acknowledges.
pub struct PresentationSession {
    outline: Outline,
    navigator: SessionNavigator,
    opened_at: DateTime<Utc>,
}

impl PresentationSession {
    pub(crate) fn new(outline: Outline, opened_at: DateTime<Utc>) -> Self {
        let navigator = SessionNavigator::new(outline.len());
        Self {
            outline,
            navigator,
            opened_at,
        }
    }

    #[must_use]
    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    #[must_use]
    pub fn navigator(&self) -> &SessionNavigator {
        &self.navigator
    }

    #[must_use]
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    #[must_use]
    pub fn status(&self) -> OutlineStatus {
        self.outline.status()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.navigator.current_index()
    }

    #[must_use]
    pub fn current_section(&self) -> Option<&Section> {
        self.outline.section(self.navigator.current_index())
    }

    #[must_use]
    pub fn is_focus_mode(&self) -> bool {
        self.navigator.is_focus_mode()
    }

    /// True once every section is completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.outline.status() == OutlineStatus::Completed
    }

    pub fn advance(&mut self) -> bool {
        self.navigator.apply(NavCommand::Advance)
    }

    pub fn retreat(&mut self) -> bool {
        self.navigator.apply(NavCommand::Retreat)
    }

    pub fn toggle_focus_mode(&mut self) {
        self.navigator.apply(NavCommand::ToggleFocus);
    }

    pub fn exit_focus_mode(&mut self) {
        self.navigator.apply(NavCommand::ExitFocus);
    }

    pub fn navigate(&mut self, command: NavCommand) -> bool {
        self.navigator.apply(command)
    }

    pub fn drag(&mut self, offset_x: f64) -> bool {
        self.navigator.drag(offset_x)
    }

    /// Progress recomputed from the current outline state.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress::new(
            OutlineProgress::of(&self.outline),
            self.navigator.position().0,
            section_markers(self.outline.sections(), self.navigator.current_index()),
            self.outline.status(),
        )
    }

    /// Commit a patch the store has already acknowledged.
    pub(crate) fn commit(
        &mut self,
        patch: OutlinePatch,
        updated_at: DateTime<Utc>,
    ) -> Result<(), OutlineError> {
        self.outline.apply_patch(patch, updated_at)
    }
}

impl fmt::Debug for PresentationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresentationSession")
            .field("outline_id", &self.outline.id())
            .field("status", &self.outline.status())
            .field("sections_len", &self.outline.len())
            .field("current", &self.navigator.current_index())
            .field("focus_mode", &self.navigator.is_focus_mode())
            .field("opened_at", &self.opened_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use outline_core::model::{OutlineDraft, OutlineId, SectionDraft};
    use outline_core::progress::SectionMarker;
    use outline_core::time::fixed_now;

    fn session(n: usize) -> PresentationSession {
        let outline = OutlineDraft {
            title: "Talk".into(),
            description: String::new(),
            sections: (0..n)
                .map(|i| SectionDraft::new(format!("S{i}"), ""))
                .collect(),
        }
        .validate(fixed_now())
        .unwrap()
        .assign_id(OutlineId::new(1));
        PresentationSession::new(outline, fixed_now())
    }

    #[test]
    fn new_session_starts_at_first_section() {
        let s = session(3);
        assert_eq!(s.current_index(), 0);
        assert!(!s.is_focus_mode());
        assert_eq!(s.opened_at(), fixed_now());
        assert_eq!(s.current_section().unwrap().title(), "S0");
    }

    #[test]
    fn len_advances_land_on_last_section() {
        let mut s = session(4);
        for _ in 0..4 {
            s.advance();
        }
        assert_eq!(s.current_index(), 3);
        assert_eq!(s.current_section().unwrap().title(), "S3");
    }

    #[test]
    fn progress_tracks_cursor_and_completion() {
        let mut s = session(3);
        let patch = s.outline().completion_patch(0).unwrap();
        s.commit(patch, fixed_now()).unwrap();
        s.advance();

        let progress = s.progress();
        assert_eq!(progress.completed, 1);
        assert_eq!(progress.remaining, 2);
        assert_eq!(progress.position, 2);
        assert_eq!(
            progress.markers,
            vec![
                SectionMarker::Completed,
                SectionMarker::Current,
                SectionMarker::Pending
            ]
        );
        assert!(!progress.is_complete);
    }

    #[test]
    fn navigation_never_changes_sections() {
        let mut s = session(2);
        let before = s.outline().clone();
        s.advance();
        s.toggle_focus_mode();
        s.drag(100.0);
        s.exit_focus_mode();
        assert_eq!(s.outline(), &before);
    }
}
