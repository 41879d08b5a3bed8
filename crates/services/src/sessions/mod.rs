mod navigator;
mod progress;
mod session;
mod workflow;

// Public API of the presentation session subsystem.
pub use crate::error::SessionError;
pub use navigator::{DRAG_THRESHOLD, NavCommand, SessionNavigator};
pub use progress::SessionProgress;
pub use session::PresentationSession;
pub use workflow::{CompletionOutcome, DEFAULT_STORE_TIMEOUT, PresentationService};
