//! Read-only derivations over outline state: completion progress, per-section
//! indicators, and dashboard aggregates.
//!
//! Nothing here is cached. Every value is recomputed from the outline it is given.

use crate::model::{Outline, OutlineStatus, Section};

//
// ─── PROGRESS ──────────────────────────────────────────────────────────────────
//

#[must_use]
pub fn completed_count(sections: &[Section]) -> usize {
    sections.iter().filter(|s| s.is_completed()).count()
}

/// Percentage of completed sections, `0.0` for an empty outline.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn progress_percent(sections: &[Section]) -> f64 {
    if sections.is_empty() {
        return 0.0;
    }
    100.0 * completed_count(sections) as f64 / sections.len() as f64
}

/// Snapshot of completion progress for one outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineProgress {
    pub completed: usize,
    pub total: usize,
    pub percent: f64,
}

impl OutlineProgress {
    #[must_use]
    pub fn of(outline: &Outline) -> Self {
        Self::of_sections(outline.sections())
    }

    #[must_use]
    pub fn of_sections(sections: &[Section]) -> Self {
        Self {
            completed: completed_count(sections),
            total: sections.len(),
            percent: progress_percent(sections),
        }
    }

    /// Percent rounded to the nearest whole number, for compact badges.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn rounded_percent(&self) -> u8 {
        self.percent.round().clamp(0.0, 100.0) as u8
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed)
    }
}

//
// ─── SECTION MARKERS ───────────────────────────────────────────────────────────
//

/// Indicator state for one position in the progress strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionMarker {
    Completed,
    Current,
    Pending,
}

/// Marker per section given the cursor position. Completion wins over the cursor.
#[must_use]
pub fn section_markers(sections: &[Section], current_index: usize) -> Vec<SectionMarker> {
    sections
        .iter()
        .enumerate()
        .map(|(i, s)| {
            if s.is_completed() {
                SectionMarker::Completed
            } else if i == current_index {
                SectionMarker::Current
            } else {
                SectionMarker::Pending
            }
        })
        .collect()
}

//
// ─── DASHBOARD ─────────────────────────────────────────────────────────────────
//

/// Outline counts shown on the dashboard header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
}

impl DashboardStats {
    #[must_use]
    pub fn from_outlines(outlines: &[Outline]) -> Self {
        outlines.iter().fold(Self::default(), |mut acc, o| {
            acc.total += 1;
            match o.status() {
                OutlineStatus::Active => acc.active += 1,
                OutlineStatus::Completed => acc.completed += 1,
                OutlineStatus::Draft => {}
            }
            acc
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(OutlineStatus),
}

impl StatusFilter {
    #[must_use]
    pub fn matches(self, status: OutlineStatus) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == status,
        }
    }
}

/// Search + status filter over the dashboard list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutlineFilter {
    pub search: String,
    pub status: StatusFilter,
}

impl OutlineFilter {
    /// Case-insensitive substring match on title or description, plus status.
    #[must_use]
    pub fn matches(&self, outline: &Outline) -> bool {
        if !self.status.matches(outline.status()) {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        outline.title().to_lowercase().contains(&needle)
            || outline
                .description()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }

    #[must_use]
    pub fn apply<'a>(&self, outlines: &'a [Outline]) -> Vec<&'a Outline> {
        outlines.iter().filter(|o| self.matches(o)).collect()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{OutlineDraft, OutlineId, SectionDraft};
    use crate::time::fixed_now;

    fn outline(id: u64, title: &str, description: &str, n: usize) -> Outline {
        OutlineDraft {
            title: title.into(),
            description: description.into(),
            sections: (0..n)
                .map(|i| SectionDraft::new(format!("S{i}"), ""))
                .collect(),
        }
        .validate(fixed_now())
        .unwrap()
        .assign_id(OutlineId::new(id))
    }

    fn complete(outline: &mut Outline, index: usize) {
        let patch = outline.completion_patch(index).unwrap();
        outline.apply_patch(patch, fixed_now()).unwrap();
    }

    #[test]
    fn empty_sections_report_zero_percent() {
        let progress = OutlineProgress::of_sections(&[]);
        assert_eq!(progress.completed, 0);
        assert!(progress.percent.abs() < f64::EPSILON);
    }

    #[test]
    fn percent_is_monotone_while_completing_in_sequence() {
        let mut o = outline(1, "Talk", "", 3);
        let mut last = OutlineProgress::of(&o).percent;
        for i in 0..3 {
            complete(&mut o, i);
            let now = OutlineProgress::of(&o).percent;
            assert!(now >= last);
            last = now;
        }
        assert!((last - 100.0).abs() < f64::EPSILON);

        for i in 0..3 {
            let patch = o.undo_patch(i).unwrap();
            o.apply_patch(patch, fixed_now()).unwrap();
            let now = OutlineProgress::of(&o).percent;
            assert!(now <= last);
            last = now;
        }
        assert!(last.abs() < f64::EPSILON);
    }

    #[test]
    fn two_of_three_rounds_to_67() {
        let mut o = outline(1, "Talk", "", 3);
        complete(&mut o, 0);
        complete(&mut o, 1);
        let progress = OutlineProgress::of(&o);
        assert_eq!(progress.completed, 2);
        assert_eq!(progress.remaining(), 1);
        assert!((progress.percent - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(progress.rounded_percent(), 67);
    }

    #[test]
    fn markers_prefer_completion_over_cursor() {
        let mut o = outline(1, "Talk", "", 3);
        complete(&mut o, 1);
        let markers = section_markers(o.sections(), 1);
        assert_eq!(
            markers,
            vec![
                SectionMarker::Pending,
                SectionMarker::Completed,
                SectionMarker::Pending
            ]
        );
        let markers = section_markers(o.sections(), 2);
        assert_eq!(markers[2], SectionMarker::Current);
    }

    #[test]
    fn dashboard_counts_by_status() {
        let draft = outline(1, "A", "", 1);
        let mut active = outline(2, "B", "", 2);
        complete(&mut active, 0);
        let mut done = outline(3, "C", "", 1);
        complete(&mut done, 0);

        let stats = DashboardStats::from_outlines(&[draft, active, done]);
        assert_eq!(
            stats,
            DashboardStats {
                total: 3,
                active: 1,
                completed: 1
            }
        );
    }

    #[test]
    fn filter_matches_title_description_and_status() {
        let a = outline(1, "Rust Intro", "", 1);
        let b = outline(2, "Cooking", "a talk about RUST pans", 1);
        let c = outline(3, "Gardening", "", 1);
        let all = vec![a, b, c];

        let filter = OutlineFilter {
            search: "rust".into(),
            status: StatusFilter::All,
        };
        let ids: Vec<_> = filter.apply(&all).iter().map(|o| o.id().value()).collect();
        assert_eq!(ids, vec![1, 2]);

        let filter = OutlineFilter {
            search: String::new(),
            status: StatusFilter::Only(OutlineStatus::Completed),
        };
        assert!(filter.apply(&all).is_empty());
    }
}
