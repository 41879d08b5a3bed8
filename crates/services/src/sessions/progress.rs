use outline_core::model::OutlineStatus;
use outline_core::progress::{OutlineProgress, SectionMarker};

/// Aggregated view of session progress, useful for indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionProgress {
    pub completed: usize,
    pub total: usize,
    pub remaining: usize,
    pub percent: f64,
    /// 1-based cursor position, 0 for an empty outline.
    pub position: usize,
    pub markers: Vec<SectionMarker>,
    pub is_complete: bool,
}

impl SessionProgress {
    pub(crate) fn new(
        progress: OutlineProgress,
        position: usize,
        markers: Vec<SectionMarker>,
        status: OutlineStatus,
    ) -> Self {
        Self {
            completed: progress.completed,
            total: progress.total,
            remaining: progress.remaining(),
            percent: progress.percent,
            position,
            markers,
            is_complete: status == OutlineStatus::Completed,
        }
    }
}
