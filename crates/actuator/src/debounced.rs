//! Actuator that de-duplicates logical commands before they reach a backend.

use crate::command::MouseButton;
use crate::held::{Claim, HeldKeys, Release};
use crate::key::KeyCode;
use crate::{Actuator, InjectionBackend};

/// Forwards only physical edges to `B`, tracking held keys and buttons.
///
/// Backend failures are logged and dropped. Everything still held is
/// released when the actuator is dropped.
pub struct DebouncedActuator<B: InjectionBackend> {
    backend: B,
    held: HeldKeys,
}

impl<B: InjectionBackend> DebouncedActuator<B> {
    pub fn new(backend: B) -> Self {
        tracing::info!(backend = %backend.name(), "Actuator ready");
        Self {
            backend,
            held: HeldKeys::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn held(&self) -> &HeldKeys {
        &self.held
    }

    fn parse_key(key: &str) -> Option<KeyCode> {
        let parsed = KeyCode::parse(key);
        if parsed.is_none() {
            tracing::trace!(key = %key, "Ignoring unknown key");
        }
        parsed
    }

    fn press(&mut self, key: KeyCode) {
        if let Err(e) = self.backend.press_key(key) {
            tracing::warn!(error = %e, key = %key, backend = %self.backend.name(), "Key press failed");
        }
    }

    fn release(&mut self, key: KeyCode) {
        if let Err(e) = self.backend.release_key(key) {
            tracing::warn!(error = %e, key = %key, backend = %self.backend.name(), "Key release failed");
        }
    }

    fn button(&mut self, button: MouseButton, down: bool) {
        if let Err(e) = self.backend.button(button, down) {
            tracing::warn!(error = %e, button = ?button, down, "Mouse button failed");
        }
    }
}

impl<B: InjectionBackend> Actuator for DebouncedActuator<B> {
    fn key_down(&mut self, key: &str, owner: &str) {
        let Some(code) = Self::parse_key(key) else {
            return;
        };
        match self.held.claim(code, owner) {
            Claim::Pressed => {
                tracing::info!(key = %code, rule = %owner, "Pressing key");
                self.press(code);
            }
            Claim::Shared => {
                tracing::debug!(key = %code, rule = %owner, "Key already down for another rule");
            }
            Claim::AlreadyHeld => {}
        }
    }

    fn key_up(&mut self, key: &str, owner: &str) {
        let Some(code) = Self::parse_key(key) else {
            return;
        };
        match self.held.release(code, owner) {
            Release::Released => {
                self.release(code);
                tracing::info!(key = %code, rule = %owner, "Releasing key");
            }
            Release::StillHeld => {
                tracing::debug!(key = %code, rule = %owner, "Key still held by another rule");
            }
            Release::NotHeld => {}
        }
    }

    fn move_mouse_relative(&mut self, dx: i32, dy: i32) {
        if dx == 0 && dy == 0 {
            return;
        }
        if let Err(e) = self.backend.move_pointer(dx, dy) {
            tracing::warn!(error = %e, dx, dy, "Pointer move failed");
        }
    }

    fn mouse_button_down(&mut self, button: MouseButton) {
        if self.held.press_button(button) {
            self.button(button, true);
        }
    }

    fn mouse_button_up(&mut self, button: MouseButton) {
        if self.held.release_button(button) {
            self.button(button, false);
        }
    }

    fn scroll_mouse(&mut self, amount: i32) {
        if amount == 0 {
            return;
        }
        if let Err(e) = self.backend.scroll(amount) {
            tracing::warn!(error = %e, amount, "Scroll failed");
        }
    }

    fn release_all(&mut self) {
        let (keys, buttons) = self.held.drain();
        if keys.is_empty() && buttons.is_empty() {
            return;
        }
        for key in &keys {
            self.release(*key);
        }
        for button in &buttons {
            self.button(*button, false);
        }
        tracing::info!(keys = keys.len(), buttons = buttons.len(), "Released all keys");
    }

    fn name(&self) -> &str {
        self.backend.name()
    }
}

impl<B: InjectionBackend> Drop for DebouncedActuator<B> {
    fn drop(&mut self) {
        self.release_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{InjectedEvent, RecordingBackend};
    use headput_common::error::{HeadputError, HeadputResult};

    fn actuator() -> (DebouncedActuator<RecordingBackend>, RecordingBackend) {
        let backend = RecordingBackend::new();
        (DebouncedActuator::new(backend.clone()), backend)
    }

    #[test]
    fn test_repeated_key_down_presses_once() {
        let (mut actuator, backend) = actuator();
        for _ in 0..5 {
            actuator.key_down("Q", "HeadTiltLeft");
        }
        assert_eq!(backend.events(), vec![InjectedEvent::KeyDown(KeyCode::Q)]);
    }

    #[test]
    fn test_double_key_up_releases_once() {
        let (mut actuator, backend) = actuator();
        actuator.key_down("A", "MouthOpen");
        actuator.key_up("A", "MouthOpen");
        actuator.key_up("A", "MouthOpen");
        assert_eq!(
            backend.events(),
            vec![
                InjectedEvent::KeyDown(KeyCode::A),
                InjectedEvent::KeyUp(KeyCode::A)
            ]
        );
    }

    #[test]
    fn test_owners_share_a_physical_key() {
        let (mut actuator, backend) = actuator();
        actuator.key_down("Space", "MouthOpen");
        actuator.key_down("space", "BrowRaise");
        actuator.key_up("Space", "MouthOpen");
        assert_eq!(backend.key_ups(KeyCode::Space), 0);
        actuator.key_up("Space", "BrowRaise");
        assert_eq!(backend.key_downs(KeyCode::Space), 1);
        assert_eq!(backend.key_ups(KeyCode::Space), 1);
    }

    #[test]
    fn test_unknown_key_is_noop() {
        let (mut actuator, backend) = actuator();
        actuator.key_down("Hyper", "Weird");
        actuator.key_up("Hyper", "Weird");
        assert!(backend.events().is_empty());
    }

    #[test]
    fn test_release_all_and_drop() {
        let (mut actuator, backend) = actuator();
        actuator.key_down("Left", "HeadLeft");
        actuator.mouse_button_down(MouseButton::Right);
        actuator.release_all();
        assert_eq!(backend.key_ups(KeyCode::Left), 1);
        assert!(backend
            .events()
            .contains(&InjectedEvent::ButtonUp(MouseButton::Right)));

        actuator.key_down("E", "HeadTiltRight");
        drop(actuator);
        assert_eq!(backend.key_ups(KeyCode::E), 1);
    }

    #[test]
    fn test_zero_motion_is_skipped() {
        let (mut actuator, backend) = actuator();
        actuator.move_mouse_relative(0, 0);
        actuator.scroll_mouse(0);
        actuator.move_mouse_relative(4, 0);
        assert_eq!(backend.events(), vec![InjectedEvent::Move { dx: 4, dy: 0 }]);
    }

    struct FailingBackend;

    impl InjectionBackend for FailingBackend {
        fn press_key(&mut self, _key: KeyCode) -> HeadputResult<()> {
            Err(HeadputError::actuation("injection denied"))
        }
        fn release_key(&mut self, _key: KeyCode) -> HeadputResult<()> {
            Err(HeadputError::actuation("injection denied"))
        }
        fn move_pointer(&mut self, _dx: i32, _dy: i32) -> HeadputResult<()> {
            Err(HeadputError::actuation("injection denied"))
        }
        fn button(&mut self, _button: MouseButton, _down: bool) -> HeadputResult<()> {
            Err(HeadputError::actuation("injection denied"))
        }
        fn scroll(&mut self, _amount: i32) -> HeadputResult<()> {
            Err(HeadputError::actuation("injection denied"))
        }
        fn name(&self) -> &str {
            "failing"
        }
        fn is_available(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_backend_failures_do_not_leak_state() {
        let mut actuator = DebouncedActuator::new(FailingBackend);
        actuator.key_down("A", "MouthOpen");
        actuator.move_mouse_relative(1, 1);
        actuator.key_up("A", "MouthOpen");
        assert!(actuator.held().is_empty());
    }
}
