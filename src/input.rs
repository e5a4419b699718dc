use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Platform-agnostic keys the viewer reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Tab,
    BackTab,
    Esc,
    Char(char),
}

impl Key {
    /// Converts a terminal key press; releases and unmapped keys yield `None`
    pub fn from_event(event: &KeyEvent) -> Option<Key> {
        if event.kind == KeyEventKind::Release {
            return None;
        }
        let key = match event.code {
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Tab if event.modifiers.contains(KeyModifiers::SHIFT) => Key::BackTab,
            KeyCode::Tab => Key::Tab,
            KeyCode::BackTab => Key::BackTab,
            KeyCode::Esc => Key::Esc,
            KeyCode::Char(' ') => Key::Space,
            KeyCode::Char(c) => Key::Char(c),
            _ => return None,
        };
        Some(key)
    }
}

/// Viewer actions reachable from the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    RotateLeft,
    RotateRight,
    ZoomIn,
    ZoomOut,
    ToggleAutoRotate,
    ToggleNarration,
    /// Same as the on-screen rotate buttons
    NudgeLeft,
    NudgeRight,
    /// Same as the on-screen zoom buttons
    StepZoomIn,
    StepZoomOut,
    ToggleFullscreen,
    ToggleHotspots,
    NextScene,
    PreviousScene,
    /// Zero-based hotspot index on the current scene
    ActivateHotspot(usize),
    ResetView,
}

/// Default key bindings
pub fn action_for(key: Key) -> Option<KeyAction> {
    let action = match key {
        Key::Left => KeyAction::RotateLeft,
        Key::Right => KeyAction::RotateRight,
        Key::Up => KeyAction::ZoomIn,
        Key::Down => KeyAction::ZoomOut,
        Key::Space => KeyAction::ToggleAutoRotate,
        Key::Char('v') => KeyAction::ToggleNarration,
        Key::Char('[') => KeyAction::NudgeLeft,
        Key::Char(']') => KeyAction::NudgeRight,
        Key::Char('+' | '=') => KeyAction::StepZoomIn,
        Key::Char('-') => KeyAction::StepZoomOut,
        Key::Char('f') => KeyAction::ToggleFullscreen,
        Key::Char('h') => KeyAction::ToggleHotspots,
        Key::Tab => KeyAction::NextScene,
        Key::BackTab => KeyAction::PreviousScene,
        Key::Char('r') => KeyAction::ResetView,
        Key::Char(c @ '1'..='9') => KeyAction::ActivateHotspot(c as usize - '1' as usize),
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bindings() {
        assert_eq!(action_for(Key::Left), Some(KeyAction::RotateLeft));
        assert_eq!(action_for(Key::Up), Some(KeyAction::ZoomIn));
        assert_eq!(action_for(Key::Space), Some(KeyAction::ToggleAutoRotate));
        assert_eq!(action_for(Key::Char('v')), Some(KeyAction::ToggleNarration));
        assert_eq!(action_for(Key::Char('1')), Some(KeyAction::ActivateHotspot(0)));
        assert_eq!(action_for(Key::Char('9')), Some(KeyAction::ActivateHotspot(8)));
        assert_eq!(action_for(Key::Char('0')), None);
        assert_eq!(action_for(Key::Esc), None);
    }

    #[test]
    fn converts_terminal_events() {
        let space = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
        assert_eq!(Key::from_event(&space), Some(Key::Space));

        let shift_tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::SHIFT);
        assert_eq!(Key::from_event(&shift_tab), Some(Key::BackTab));

        let mut release = KeyEvent::new(KeyCode::Left, KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(Key::from_event(&release), None);

        let f1 = KeyEvent::new(KeyCode::F(1), KeyModifiers::NONE);
        assert_eq!(Key::from_event(&f1), None);
    }
}
