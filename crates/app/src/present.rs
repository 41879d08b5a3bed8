use std::io::{self, Write};

use outline_core::progress::SectionMarker;
use services::{NavCommand, PresentationService, PresentationSession, SessionError};

/// One line of presenter input.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Action {
    Navigate(NavCommand),
    Drag(f64),
    Complete,
    Undo,
    Quit,
}

impl Action {
    fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let action = match parts.next().unwrap_or("n") {
            "n" | "next" => Self::Navigate(NavCommand::Advance),
            "p" | "prev" => Self::Navigate(NavCommand::Retreat),
            "f" | "focus" => Self::Navigate(NavCommand::ToggleFocus),
            "x" | "esc" => Self::Navigate(NavCommand::ExitFocus),
            "c" | "done" => Self::Complete,
            "u" | "undo" => Self::Undo,
            "q" | "quit" => Self::Quit,
            "d" | "drag" => Self::Drag(parts.next()?.parse().ok()?),
            _ => return None,
        };
        Some(action)
    }
}

const HELP: &str = "keys: n next, p prev, c complete, u undo, f focus, x exit focus, d <offset> drag, q quit";

fn render(out: &mut impl Write, session: &PresentationSession) -> io::Result<()> {
    let progress = session.progress();
    let Some(section) = session.current_section() else {
        return writeln!(out, "(this outline has no sections)");
    };

    if session.is_focus_mode() {
        writeln!(out)?;
        writeln!(out, "  {}", section.title())?;
        if let Some(content) = section.content() {
            for line in content.lines() {
                writeln!(out, "  {line}")?;
            }
        }
        return Ok(());
    }

    let markers: String = progress
        .markers
        .iter()
        .map(|marker| match marker {
            SectionMarker::Completed => '●',
            SectionMarker::Current => '◉',
            SectionMarker::Pending => '○',
        })
        .collect();
    writeln!(out)?;
    writeln!(
        out,
        "{}  [{}]  section {} of {}  {:.0}% complete",
        session.outline().title(),
        markers,
        progress.position,
        progress.total,
        progress.percent
    )?;
    let check = if section.is_completed() { "x" } else { " " };
    writeln!(
        out,
        "[{check}] {} ({} min)",
        section.title(),
        section.duration_minutes()
    )?;
    if let Some(content) = section.content() {
        writeln!(out, "{content}")?;
    }
    if session.is_finished() {
        writeln!(out, "All sections completed.")?;
    }
    Ok(())
}

/// Drive a session from line input until `q` or end of input.
///
/// Store failures are reported and the loop continues with the session unchanged.
pub(crate) async fn run(
    service: &PresentationService,
    mut session: PresentationSession,
    lines: impl Iterator<Item = io::Result<String>>,
    mut out: impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    writeln!(
        out,
        "session opened {}",
        session.opened_at().format("%Y-%m-%d %H:%M UTC")
    )?;
    writeln!(out, "{HELP}")?;
    render(&mut out, &session)?;

    for line in lines {
        let line = line?;
        let Some(action) = Action::parse(&line) else {
            writeln!(out, "{HELP}")?;
            continue;
        };

        let result = match action {
            Action::Quit => break,
            Action::Navigate(command) => {
                session.navigate(command);
                Ok(())
            }
            Action::Drag(offset) => {
                session.drag(offset);
                Ok(())
            }
            Action::Complete => service.complete_current(&mut session).await.map(|_| ()),
            Action::Undo => service.undo_current(&mut session).await.map(|_| ()),
        };

        match result {
            Ok(()) => {}
            Err(err @ SessionError::StoreUnavailable { .. }) => {
                writeln!(out, "not saved: {err}")?;
            }
            Err(err) => return Err(err.into()),
        }
        render(&mut out, &session)?;
    }

    tracing::info!(
        outline_id = %session.outline().id(),
        status = %session.status(),
        opened_at = %session.opened_at(),
        "presentation session closed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use outline_core::model::{OutlineDraft, OutlineStatus, SectionDraft};
    use outline_core::time::fixed_now;
    use services::{AppServices, Clock, ServiceConfig};

    #[test]
    fn actions_parse_from_keys() {
        assert_eq!(Action::parse(""), Some(Action::Navigate(NavCommand::Advance)));
        assert_eq!(Action::parse("p"), Some(Action::Navigate(NavCommand::Retreat)));
        assert_eq!(Action::parse("d -75"), Some(Action::Drag(-75.0)));
        assert_eq!(Action::parse("d"), None);
        assert_eq!(Action::parse("zz"), None);
    }

    #[tokio::test]
    async fn scripted_session_completes_outline() {
        let services = AppServices::in_memory(Clock::fixed(fixed_now()), ServiceConfig::default());
        let outline = services
            .outlines()
            .create_outline(OutlineDraft {
                title: "Lightning talk".into(),
                description: String::new(),
                sections: vec![
                    SectionDraft::new("Hook", "- a question"),
                    SectionDraft::new("Answer", ""),
                ],
            })
            .await
            .unwrap();
        let presentations = services.presentations();
        let session = presentations.open_session(outline.id()).await.unwrap();

        let script = ["c", "d -80", "f", "c", "x", "q", "c"];
        let lines = script.iter().map(|l| Ok((*l).to_string()));
        let mut out = Vec::new();
        run(&presentations, session, lines, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("session opened 2023-11-14 22:13 UTC"));
        assert!(text.contains("All sections completed."));
        let stored = services
            .outlines()
            .get_outline(outline.id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status(), OutlineStatus::Completed);
    }
}
