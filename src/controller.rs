use std::time::Duration;
use tracing::trace;

use crate::domain::{Message, ViewerConfig, ViewerError};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Where terminal events come from. The viewer reads the real terminal, tests feed
/// scripted events.
pub trait EventSource {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>, ViewerError>;
}

pub struct TerminalEvents;

impl EventSource for TerminalEvents {
    fn next_event(&mut self, timeout: Duration) -> Result<Option<Event>, ViewerError> {
        if event::poll(timeout)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }
}

pub struct Controller<S: EventSource> {
    event_poll_time: u64,
    source: S,
}

impl<S: EventSource> Controller<S> {
    pub fn new(cfg: &ViewerConfig, source: S) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
            source,
        }
    }

    pub fn handle_event(&mut self, model: &Model) -> Result<Option<Message>, ViewerError> {
        let timeout = Duration::from_millis(self.event_poll_time);
        let message = match self.source.next_event(timeout)? {
            Some(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Some(Event::Resize(width, height)) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        };
        Ok(message)
    }

    fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('j'), _) | (KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k'), _) | (KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::Char('h'), _) | (KeyCode::Left, _) => Some(Message::MoveLeft),
            (KeyCode::Char('l'), _) | (KeyCode::Right, _) => Some(Message::MoveRight),
            (KeyCode::Char('n'), _) | (KeyCode::PageDown, _) => Some(Message::NextPage),
            (KeyCode::Char('p'), _) | (KeyCode::PageUp, _) => Some(Message::PrevPage),
            (KeyCode::Char('g'), _) | (KeyCode::Home, _) => Some(Message::FirstPage),
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => Some(Message::LastPage),
            (KeyCode::Char(':'), _) => Some(Message::GotoPage),
            (KeyCode::Char('s'), _) => Some(Message::Sort),
            (KeyCode::Char('f'), _) => Some(Message::ToggleFilters),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Tab, _) => Some(Message::FocusNextControl),
            (KeyCode::BackTab, _) => Some(Message::FocusPrevControl),
            (KeyCode::Char('+'), _) => Some(Message::NextOption),
            (KeyCode::Char('-'), _) => Some(Message::PrevOption),
            (KeyCode::Char('x'), _) => Some(Message::ClearFilters),
            (KeyCode::Char('y'), _) => Some(Message::CopyCell),
            (KeyCode::Char('Y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{Field, Filter};
    use crate::list::FilterableList;
    use crate::record::{Record, Value};
    use ratatui::crossterm::event::KeyEventState;
    use std::collections::VecDeque;

    struct ScriptedEvents(VecDeque<Event>);

    impl EventSource for ScriptedEvents {
        fn next_event(&mut self, _timeout: Duration) -> Result<Option<Event>, ViewerError> {
            Ok(self.0.pop_front())
        }
    }

    fn press(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn model() -> Model {
        let data = vec![Some(Record::new().with("name", Value::text("Bot1")))];
        let list = FilterableList::new(data, vec![Field::path("name")], vec![Filter::search("search")]);
        Model::init(&ViewerConfig::default(), "test", list, 100, 30)
    }

    fn controller(events: Vec<Event>) -> Controller<ScriptedEvents> {
        Controller::new(&ViewerConfig::default(), ScriptedEvents(events.into()))
    }

    #[test]
    fn maps_keys_to_messages() {
        let m = model();
        let mut c = controller(vec![press(KeyCode::Char('n')), press(KeyCode::Char('s')), press(KeyCode::Tab)]);
        assert_eq!(c.handle_event(&m).ok().flatten(), Some(Message::NextPage));
        assert_eq!(c.handle_event(&m).ok().flatten(), Some(Message::Sort));
        assert_eq!(c.handle_event(&m).ok().flatten(), Some(Message::FocusNextControl));
        assert_eq!(c.handle_event(&m).ok().flatten(), None);
    }

    #[test]
    fn resize_becomes_message() {
        let m = model();
        let mut c = controller(vec![Event::Resize(72, 20)]);
        assert_eq!(c.handle_event(&m).ok().flatten(), Some(Message::Resize(72, 20)));
    }

    #[test]
    fn key_release_is_ignored() {
        let m = model();
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        let mut c = controller(vec![Event::Key(release)]);
        assert_eq!(c.handle_event(&m).ok().flatten(), None);
    }

    #[test]
    fn raw_keys_while_editing() {
        let mut m = model();
        m.update(Some(Message::Search));
        let mut c = controller(vec![press(KeyCode::Char('q'))]);
        assert!(matches!(
            c.handle_event(&m).ok().flatten(),
            Some(Message::RawKey(KeyEvent { code: KeyCode::Char('q'), .. }))
        ));
    }
}
