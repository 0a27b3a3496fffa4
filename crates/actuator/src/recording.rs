//! In-memory actuators and backends for tests and offline replay.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use headput_common::error::HeadputResult;

use crate::command::{ActuationCommand, MouseButton};
use crate::key::KeyCode;
use crate::{Actuator, InjectionBackend};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A physical edge as a backend would have injected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedEvent {
    KeyDown(KeyCode),
    KeyUp(KeyCode),
    Move { dx: i32, dy: i32 },
    ButtonDown(MouseButton),
    ButtonUp(MouseButton),
    Scroll(i32),
}

/// Backend that stores every physical edge. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    events: Arc<Mutex<Vec<InjectedEvent>>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InjectedEvent> {
        lock(&self.events).clone()
    }

    pub fn key_downs(&self, key: KeyCode) -> usize {
        self.count(&InjectedEvent::KeyDown(key))
    }

    pub fn key_ups(&self, key: KeyCode) -> usize {
        self.count(&InjectedEvent::KeyUp(key))
    }

    pub fn clear(&self) {
        lock(&self.events).clear();
    }

    fn count(&self, event: &InjectedEvent) -> usize {
        lock(&self.events).iter().filter(|e| *e == event).count()
    }

    fn push(&self, event: InjectedEvent) -> HeadputResult<()> {
        lock(&self.events).push(event);
        Ok(())
    }
}

impl InjectionBackend for RecordingBackend {
    fn press_key(&mut self, key: KeyCode) -> HeadputResult<()> {
        self.push(InjectedEvent::KeyDown(key))
    }

    fn release_key(&mut self, key: KeyCode) -> HeadputResult<()> {
        self.push(InjectedEvent::KeyUp(key))
    }

    fn move_pointer(&mut self, dx: i32, dy: i32) -> HeadputResult<()> {
        self.push(InjectedEvent::Move { dx, dy })
    }

    fn button(&mut self, button: MouseButton, down: bool) -> HeadputResult<()> {
        if down {
            self.push(InjectedEvent::ButtonDown(button))
        } else {
            self.push(InjectedEvent::ButtonUp(button))
        }
    }

    fn scroll(&mut self, amount: i32) -> HeadputResult<()> {
        self.push(InjectedEvent::Scroll(amount))
    }

    fn name(&self) -> &str {
        "recording"
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Actuator that records logical commands without de-duplicating them.
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingActuator {
    commands: Arc<Mutex<Vec<ActuationCommand>>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<ActuationCommand> {
        lock(&self.commands).clone()
    }

    /// Remove and return everything recorded so far.
    pub fn take(&self) -> Vec<ActuationCommand> {
        std::mem::take(&mut *lock(&self.commands))
    }

    pub fn count(&self, command: &ActuationCommand) -> usize {
        lock(&self.commands).iter().filter(|c| *c == command).count()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.commands).is_empty()
    }

    fn push(&self, command: ActuationCommand) {
        lock(&self.commands).push(command);
    }
}

impl Actuator for RecordingActuator {
    fn key_down(&mut self, key: &str, owner: &str) {
        self.push(ActuationCommand::key_down(key, owner));
    }

    fn key_up(&mut self, key: &str, owner: &str) {
        self.push(ActuationCommand::key_up(key, owner));
    }

    fn move_mouse_relative(&mut self, dx: i32, dy: i32) {
        self.push(ActuationCommand::MoveMouse { dx, dy });
    }

    fn mouse_button_down(&mut self, button: MouseButton) {
        self.push(ActuationCommand::MouseButtonDown { button });
    }

    fn mouse_button_up(&mut self, button: MouseButton) {
        self.push(ActuationCommand::MouseButtonUp { button });
    }

    fn scroll_mouse(&mut self, amount: i32) {
        self.push(ActuationCommand::Scroll { amount });
    }

    fn release_all(&mut self) {
        self.push(ActuationCommand::ReleaseAll);
    }

    fn name(&self) -> &str {
        "recording"
    }
}
