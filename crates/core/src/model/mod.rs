mod ids;
mod outline;
mod section;

pub use ids::{OutlineId, ParseIdError};
pub use outline::{NewOutline, Outline, OutlineDraft, OutlineError, OutlinePatch, OutlineStatus};
pub use section::{DEFAULT_SECTION_MINUTES, Section, SectionDraft, SectionError};
