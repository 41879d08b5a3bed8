/// Horizontal drag distance that counts as one navigation step.
pub const DRAG_THRESHOLD: f64 = 60.0;

/// Input-agnostic navigation command.
///
/// Keyboard, click and drag input all resolve to one of these before touching the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavCommand {
    Advance,
    Retreat,
    ToggleFocus,
    ExitFocus,
}

impl NavCommand {
    /// Map a finished horizontal drag to a command.
    ///
    /// Dragging left past the threshold advances, dragging right past it retreats.
    /// Offsets within `±DRAG_THRESHOLD` map to nothing.
    #[must_use]
    pub fn from_drag(offset_x: f64) -> Option<Self> {
        if offset_x < -DRAG_THRESHOLD {
            Some(Self::Advance)
        } else if offset_x > DRAG_THRESHOLD {
            Some(Self::Retreat)
        } else {
            None
        }
    }
}

/// Cursor over an outline's sections plus the focus-mode flag.
///
/// Holds no section data, so it can never mutate an outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNavigator {
    len: usize,
    current: usize,
    focus_mode: bool,
}

impl SessionNavigator {
    /// Start at the first section with focus mode off.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            len,
            current: 0,
            focus_mode: false,
        }
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn is_focus_mode(&self) -> bool {
        self.focus_mode
    }

    #[must_use]
    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    #[must_use]
    pub fn is_last(&self) -> bool {
        self.current + 1 >= self.len
    }

    /// 1-based position and total, e.g. `(2, 5)` for "2 of 5".
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        if self.len == 0 {
            (0, 0)
        } else {
            (self.current + 1, self.len)
        }
    }

    /// Move to the next section. Returns false at the last section.
    pub fn advance(&mut self) -> bool {
        if self.is_last() {
            return false;
        }
        self.current += 1;
        true
    }

    /// Move to the previous section. Returns false at the first section.
    pub fn retreat(&mut self) -> bool {
        if self.is_first() {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn toggle_focus_mode(&mut self) {
        self.focus_mode = !self.focus_mode;
    }

    pub fn exit_focus_mode(&mut self) {
        self.focus_mode = false;
    }

    /// Apply a command; returns whether anything changed.
    pub fn apply(&mut self, command: NavCommand) -> bool {
        let changed = match command {
            NavCommand::Advance => self.advance(),
            NavCommand::Retreat => self.retreat(),
            NavCommand::ToggleFocus => {
                self.toggle_focus_mode();
                true
            }
            NavCommand::ExitFocus => {
                let was = self.focus_mode;
                self.exit_focus_mode();
                was
            }
        };
        tracing::debug!(
            ?command,
            changed,
            index = self.current,
            focus = self.focus_mode,
            "navigator command"
        );
        changed
    }

    /// Apply whatever command a drag of `offset_x` maps to.
    pub fn drag(&mut self, offset_x: f64) -> bool {
        NavCommand::from_drag(offset_x).is_some_and(|command| self.apply(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retreat_at_start_is_noop() {
        let mut nav = SessionNavigator::new(3);
        assert!(!nav.retreat());
        assert_eq!(nav.current_index(), 0);
    }

    #[test]
    fn advance_stops_at_last_section() {
        let mut nav = SessionNavigator::new(3);
        for _ in 0..3 {
            nav.advance();
        }
        assert_eq!(nav.current_index(), 2);
        assert!(nav.is_last());
        assert!(!nav.advance());
        assert_eq!(nav.current_index(), 2);
        assert_eq!(nav.position(), (3, 3));
    }

    #[test]
    fn empty_outline_keeps_cursor_at_zero() {
        let mut nav = SessionNavigator::new(0);
        assert!(!nav.advance());
        assert!(!nav.retreat());
        assert_eq!(nav.current_index(), 0);
        assert_eq!(nav.position(), (0, 0));
    }

    #[test]
    fn focus_mode_does_not_move_cursor() {
        let mut nav = SessionNavigator::new(3);
        nav.advance();
        nav.toggle_focus_mode();
        assert!(nav.is_focus_mode());
        assert_eq!(nav.current_index(), 1);
        nav.toggle_focus_mode();
        assert!(!nav.is_focus_mode());
        nav.toggle_focus_mode();
        nav.exit_focus_mode();
        assert!(!nav.is_focus_mode());
        assert_eq!(nav.current_index(), 1);
    }

    #[test]
    fn exit_focus_reports_change_only_when_focused() {
        let mut nav = SessionNavigator::new(2);
        assert!(!nav.apply(NavCommand::ExitFocus));
        assert!(nav.apply(NavCommand::ToggleFocus));
        assert!(nav.apply(NavCommand::ExitFocus));
    }

    #[test]
    fn drag_threshold_is_exclusive() {
        assert_eq!(NavCommand::from_drag(-60.0), None);
        assert_eq!(NavCommand::from_drag(60.0), None);
        assert_eq!(NavCommand::from_drag(0.0), None);
        assert_eq!(NavCommand::from_drag(-61.0), Some(NavCommand::Advance));
        assert_eq!(NavCommand::from_drag(61.0), Some(NavCommand::Retreat));
    }

    #[test]
    fn drag_moves_cursor_like_commands() {
        let mut nav = SessionNavigator::new(3);
        assert!(nav.drag(-120.0));
        assert_eq!(nav.current_index(), 1);
        assert!(!nav.drag(30.0));
        assert_eq!(nav.current_index(), 1);
        assert!(nav.drag(75.0));
        assert_eq!(nav.current_index(), 0);
        assert!(!nav.drag(75.0));
    }
}
