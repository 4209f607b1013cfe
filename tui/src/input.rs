//! Key handling for the Jifra TUI.
//!
//! Terminal events are first mapped to an [`Action`] (pure, per focus), then
//! applied to the [`App`]. A submit comes back as a [`QueuedRequest`] so the
//! caller can draw the processing frame before awaiting the remote call.

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use jifra_engine::{App, Focus, QueuedRequest, Sleeper, TextModel};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Submit,
    Insert(char),
    Newline,
    Paste(String),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
    CycleStyle,
    CycleDirection,
    Clear,
    OpenPassword,
    SubmitPassword,
    FocusHistory,
    HistoryUp,
    HistoryDown,
    TogglePin,
    ClearUnpinned,
    Back,
    Quit,
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Map a terminal event to an action for the focused widget.
#[must_use]
pub fn map_event(focus: Focus, event: &Event) -> Option<Action> {
    match event {
        Event::Key(key) if matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) => {
            map_key(focus, *key)
        }
        Event::Paste(text) if focus != Focus::History => {
            Some(Action::Paste(normalize_line_endings(text)))
        }
        _ => None,
    }
}

fn map_key(focus: Focus, key: KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && matches!(key.code, KeyCode::Char('c')) {
        return Some(Action::Quit);
    }
    if key.code == KeyCode::Esc {
        return Some(Action::Back);
    }

    match focus {
        Focus::Input => map_input_key(key, ctrl),
        Focus::Password => match key.code {
            KeyCode::Enter => Some(Action::SubmitPassword),
            KeyCode::Backspace => Some(Action::Backspace),
            KeyCode::Delete => Some(Action::Delete),
            KeyCode::Left => Some(Action::Left),
            KeyCode::Right => Some(Action::Right),
            KeyCode::Char(c) if !ctrl => Some(Action::Insert(c)),
            _ => None,
        },
        Focus::History => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Action::HistoryUp),
            KeyCode::Down | KeyCode::Char('j') => Some(Action::HistoryDown),
            KeyCode::Char(' ' | 'p') => Some(Action::TogglePin),
            KeyCode::Char('x') => Some(Action::ClearUnpinned),
            KeyCode::Tab => Some(Action::Back),
            _ => None,
        },
    }
}

fn map_input_key(key: KeyEvent, ctrl: bool) -> Option<Action> {
    if ctrl {
        return match key.code {
            KeyCode::Char('j') | KeyCode::Enter => Some(Action::Newline),
            KeyCode::Char('t') => Some(Action::CycleStyle),
            KeyCode::Char('d') => Some(Action::CycleDirection),
            KeyCode::Char('l') => Some(Action::Clear),
            KeyCode::Char('p') => Some(Action::OpenPassword),
            KeyCode::Char('a') => Some(Action::Home),
            KeyCode::Char('e') => Some(Action::End),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Enter
            if key
                .modifiers
                .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
        {
            Some(Action::Newline)
        }
        KeyCode::Enter => Some(Action::Submit),
        KeyCode::Tab => Some(Action::FocusHistory),
        KeyCode::Backspace => Some(Action::Backspace),
        KeyCode::Delete => Some(Action::Delete),
        KeyCode::Left => Some(Action::Left),
        KeyCode::Right => Some(Action::Right),
        KeyCode::Home => Some(Action::Home),
        KeyCode::End => Some(Action::End),
        KeyCode::Char(c) => Some(Action::Insert(c)),
        _ => None,
    }
}

/// Apply `action`. Returns the queued request when a valid submit was made.
pub fn apply<M, S>(app: &mut App<M, S>, action: Action) -> Option<QueuedRequest>
where
    M: TextModel + Sync,
    S: Sleeper + Sync,
{
    match action {
        Action::Submit => return app.prepare_submit(),
        Action::SubmitPassword => app.submit_password(),
        Action::CycleStyle => app.cycle_style(),
        Action::CycleDirection => app.cycle_direction(),
        Action::Clear => app.clear(),
        Action::OpenPassword => app.open_password_prompt(),
        Action::FocusHistory => app.focus_history(),
        Action::HistoryUp => app.history_up(),
        Action::HistoryDown => app.history_down(),
        Action::TogglePin => app.toggle_selected_pin(),
        Action::ClearUnpinned => app.clear_unpinned(),
        Action::Back => app.escape(),
        Action::Quit => app.request_quit(),
        edit => {
            if let Some(draft) = app.draft_mut() {
                match edit {
                    Action::Insert(c) => draft.insert_char(c),
                    Action::Newline => draft.insert_newline(),
                    Action::Paste(text) => draft.insert_str(&text),
                    Action::Backspace => draft.backspace(),
                    Action::Delete => draft.delete(),
                    Action::Left => draft.move_left(),
                    Action::Right => draft.move_right(),
                    Action::Home => draft.move_home(),
                    Action::End => draft.move_end(),
                    _ => {}
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn plain(code: KeyCode) -> Event {
        key(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> Event {
        key(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn input_bindings() {
        let f = Focus::Input;
        assert_eq!(map_event(f, &plain(KeyCode::Enter)), Some(Action::Submit));
        assert_eq!(map_event(f, &ctrl('j')), Some(Action::Newline));
        assert_eq!(map_event(f, &ctrl('t')), Some(Action::CycleStyle));
        assert_eq!(map_event(f, &ctrl('d')), Some(Action::CycleDirection));
        assert_eq!(map_event(f, &ctrl('l')), Some(Action::Clear));
        assert_eq!(map_event(f, &ctrl('p')), Some(Action::OpenPassword));
        assert_eq!(map_event(f, &plain(KeyCode::Tab)), Some(Action::FocusHistory));
        assert_eq!(map_event(f, &plain(KeyCode::Char('p'))), Some(Action::Insert('p')));
        assert_eq!(map_event(f, &plain(KeyCode::Esc)), Some(Action::Back));
    }

    #[test]
    fn history_bindings() {
        let f = Focus::History;
        assert_eq!(map_event(f, &plain(KeyCode::Up)), Some(Action::HistoryUp));
        assert_eq!(map_event(f, &plain(KeyCode::Down)), Some(Action::HistoryDown));
        assert_eq!(map_event(f, &plain(KeyCode::Char(' '))), Some(Action::TogglePin));
        assert_eq!(map_event(f, &plain(KeyCode::Char('p'))), Some(Action::TogglePin));
        assert_eq!(map_event(f, &plain(KeyCode::Char('x'))), Some(Action::ClearUnpinned));
        assert_eq!(map_event(f, &plain(KeyCode::Char('z'))), None);
    }

    #[test]
    fn ctrl_c_quits_everywhere() {
        for focus in [Focus::Input, Focus::History, Focus::Password] {
            assert_eq!(map_event(focus, &ctrl('c')), Some(Action::Quit));
        }
    }

    #[test]
    fn password_enter_submits_password() {
        assert_eq!(
            map_event(Focus::Password, &plain(KeyCode::Enter)),
            Some(Action::SubmitPassword)
        );
        assert_eq!(map_event(Focus::Password, &ctrl('t')), None);
    }

    #[test]
    fn releases_are_ignored() {
        let release = Event::Key(KeyEvent {
            code: KeyCode::Enter,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        });
        assert_eq!(map_event(Focus::Input, &release), None);
    }

    #[test]
    fn paste_normalizes_line_endings() {
        let paste = Event::Paste("a\r\nb\rc".into());
        assert_eq!(
            map_event(Focus::Input, &paste),
            Some(Action::Paste("a\nb\nc".into()))
        );
        assert_eq!(map_event(Focus::History, &paste), None);
    }
}
