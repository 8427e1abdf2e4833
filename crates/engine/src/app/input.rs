use winit::keyboard::KeyCode;

use super::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Raw input as delivered to the world each tick. Pointer positions are in
/// real (window buffer) pixels until the world translates them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    PointerMoved { position: Vec2 },
    PointerDown { button: PointerButton, position: Vec2 },
    PointerUp { button: PointerButton, position: Vec2 },
    CloseRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEventKind {
    KeyDown,
    KeyUp,
    PointerMoved,
    PointerDown,
    PointerUp,
    CloseRequested,
}

impl InputEvent {
    pub fn kind(&self) -> InputEventKind {
        match self {
            InputEvent::KeyDown(_) => InputEventKind::KeyDown,
            InputEvent::KeyUp(_) => InputEventKind::KeyUp,
            InputEvent::PointerMoved { .. } => InputEventKind::PointerMoved,
            InputEvent::PointerDown { .. } => InputEventKind::PointerDown,
            InputEvent::PointerUp { .. } => InputEventKind::PointerUp,
            InputEvent::CloseRequested => InputEventKind::CloseRequested,
        }
    }

    pub fn pointer_position(&self) -> Option<Vec2> {
        match self {
            InputEvent::PointerMoved { position }
            | InputEvent::PointerDown { position, .. }
            | InputEvent::PointerUp { position, .. } => Some(*position),
            _ => None,
        }
    }

    pub fn with_pointer_position(self, new_position: Vec2) -> Self {
        match self {
            InputEvent::PointerMoved { .. } => InputEvent::PointerMoved {
                position: new_position,
            },
            InputEvent::PointerDown { button, .. } => InputEvent::PointerDown {
                button,
                position: new_position,
            },
            InputEvent::PointerUp { button, .. } => InputEvent::PointerUp {
                button,
                position: new_position,
            },
            other => other,
        }
    }
}

/// Keys currently held, in the order they were pressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PressedKeys {
    order: Vec<KeyCode>,
}

impl PressedKeys {
    pub fn from_sequence(keys: &[KeyCode]) -> Self {
        let mut pressed = Self::default();
        for key in keys {
            pressed.press(*key);
        }
        pressed
    }

    /// Returns false when the key was already held.
    pub fn press(&mut self, key: KeyCode) -> bool {
        if self.order.contains(&key) {
            return false;
        }
        self.order.push(key);
        true
    }

    pub fn release(&mut self, key: KeyCode) -> bool {
        let before = self.order.len();
        self.order.retain(|held| *held != key);
        self.order.len() != before
    }

    pub fn is_down(&self, key: KeyCode) -> bool {
        self.order.contains(&key)
    }

    /// Position of the key in press order, 0 being the earliest still held.
    pub fn press_index(&self, key: KeyCode) -> Option<usize> {
        self.order.iter().position(|held| *held == key)
    }

    pub fn clear(&mut self) {
        self.order.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = KeyCode> + '_ {
        self.order.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_order_is_tracked_and_compacts_on_release() {
        let mut keys = PressedKeys::default();
        assert!(keys.press(KeyCode::ArrowLeft));
        assert!(keys.press(KeyCode::ArrowUp));
        assert!(!keys.press(KeyCode::ArrowLeft));
        assert_eq!(keys.press_index(KeyCode::ArrowUp), Some(1));

        assert!(keys.release(KeyCode::ArrowLeft));
        assert_eq!(keys.press_index(KeyCode::ArrowUp), Some(0));
        assert!(!keys.release(KeyCode::ArrowLeft));
        assert!(!keys.is_down(KeyCode::ArrowLeft));
    }

    #[test]
    fn pointer_position_rewrite_keeps_button() {
        let event = InputEvent::PointerDown {
            button: PointerButton::Right,
            position: Vec2::new(5.0, 6.0),
        };
        let moved = event.with_pointer_position(Vec2::new(1.0, 2.0));
        assert_eq!(
            moved,
            InputEvent::PointerDown {
                button: PointerButton::Right,
                position: Vec2::new(1.0, 2.0),
            }
        );
        assert_eq!(moved.kind(), InputEventKind::PointerDown);
        assert_eq!(InputEvent::CloseRequested.pointer_position(), None);
    }
}
