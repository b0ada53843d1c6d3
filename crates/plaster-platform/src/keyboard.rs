//! Keyboard state tracking.

use hashbrown::HashMap;
use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Per-key state, including the frame a transition happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonState {
    JustPressed,
    Pressed,
    JustReleased,
    #[default]
    Released,
}

impl ButtonState {
    #[must_use]
    pub const fn is_pressed(self) -> bool {
        matches!(self, Self::JustPressed | Self::Pressed)
    }

    #[must_use]
    pub const fn is_just_pressed(self) -> bool {
        matches!(self, Self::JustPressed)
    }

    #[must_use]
    pub const fn is_just_released(self) -> bool {
        matches!(self, Self::JustReleased)
    }

    /// Apply a press or release. Key repeat leaves a held key held.
    fn apply(&mut self, pressed: bool) {
        *self = match (pressed, self.is_pressed()) {
            (true, false) => Self::JustPressed,
            (false, true) => Self::JustReleased,
            _ => *self,
        };
    }

    /// Settle a transition from the previous frame.
    fn settle(&mut self) {
        *self = match *self {
            Self::JustPressed => Self::Pressed,
            Self::JustReleased => Self::Released,
            held => held,
        };
    }
}

/// Keyboard state, keyed by physical key code.
#[derive(Debug, Default)]
pub struct KeyboardState {
    keys: HashMap<KeyCode, ButtonState>,
}

impl KeyboardState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a winit key event. Keys without a physical code are ignored.
    pub fn process_key_event(&mut self, event: &KeyEvent) {
        if let PhysicalKey::Code(key) = event.physical_key {
            self.set_key(key, event.state == ElementState::Pressed);
        }
    }

    pub fn set_key(&mut self, key: KeyCode, pressed: bool) {
        self.keys.entry(key).or_default().apply(pressed);
    }

    #[must_use]
    pub fn state(&self, key: KeyCode) -> ButtonState {
        self.keys.get(&key).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.state(key).is_pressed()
    }

    #[must_use]
    pub fn is_just_pressed(&self, key: KeyCode) -> bool {
        self.state(key).is_just_pressed()
    }

    #[must_use]
    pub fn is_just_released(&self, key: KeyCode) -> bool {
        self.state(key).is_just_released()
    }

    /// Settle this frame's transitions. Called before the next batch of events.
    pub fn end_frame(&mut self) {
        self.keys.values_mut().for_each(ButtonState::settle);
        self.keys.retain(|_, state| *state != ButtonState::Released);
    }

    /// Forget every key, e.g. when the window loses focus.
    pub fn clear(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_just_pressed_for_one_frame() {
        let mut keyboard = KeyboardState::new();
        keyboard.set_key(KeyCode::KeyW, true);
        assert!(keyboard.is_just_pressed(KeyCode::KeyW));

        keyboard.end_frame();
        assert!(keyboard.is_pressed(KeyCode::KeyW));
        assert!(!keyboard.is_just_pressed(KeyCode::KeyW));
    }

    #[test]
    fn repeat_does_not_retrigger() {
        let mut keyboard = KeyboardState::new();
        keyboard.set_key(KeyCode::Space, true);
        keyboard.end_frame();
        keyboard.set_key(KeyCode::Space, true);
        assert_eq!(keyboard.state(KeyCode::Space), ButtonState::Pressed);
    }

    #[test]
    fn release_settles_to_released() {
        let mut keyboard = KeyboardState::new();
        keyboard.set_key(KeyCode::Escape, true);
        keyboard.end_frame();
        keyboard.set_key(KeyCode::Escape, false);
        assert!(keyboard.is_just_released(KeyCode::Escape));

        keyboard.end_frame();
        assert_eq!(keyboard.state(KeyCode::Escape), ButtonState::Released);
        assert!(keyboard.keys.is_empty());
    }

    #[test]
    fn release_without_press_is_ignored() {
        let mut keyboard = KeyboardState::new();
        keyboard.set_key(KeyCode::KeyA, false);
        assert!(!keyboard.is_just_released(KeyCode::KeyA));
    }
}
