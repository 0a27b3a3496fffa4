//! Injection backend implementations.

use headput_common::error::HeadputResult;

use crate::command::MouseButton;
use crate::key::KeyCode;
use crate::InjectionBackend;

/// Backend that reports physical edges to the log instead of the OS.
#[derive(Debug, Default)]
pub struct LogBackend {
    events: u64,
}

impl LogBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of physical edges reported so far.
    pub fn events(&self) -> u64 {
        self.events
    }
}

impl InjectionBackend for LogBackend {
    fn press_key(&mut self, key: KeyCode) -> HeadputResult<()> {
        self.events += 1;
        tracing::info!(key = %key, "Key down");
        Ok(())
    }

    fn release_key(&mut self, key: KeyCode) -> HeadputResult<()> {
        self.events += 1;
        tracing::info!(key = %key, "Key up");
        Ok(())
    }

    fn move_pointer(&mut self, dx: i32, dy: i32) -> HeadputResult<()> {
        self.events += 1;
        tracing::debug!(dx, dy, "Pointer move");
        Ok(())
    }

    fn button(&mut self, button: MouseButton, down: bool) -> HeadputResult<()> {
        self.events += 1;
        tracing::info!(button = ?button, down, "Mouse button");
        Ok(())
    }

    fn scroll(&mut self, amount: i32) -> HeadputResult<()> {
        self.events += 1;
        tracing::debug!(amount, "Scroll");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }

    fn is_available(&self) -> bool {
        true
    }
}

/// Detect the best available injection backend for the current system.
pub fn detect_best_backend() -> Box<dyn InjectionBackend> {
    tracing::warn!("No OS injection backend is compiled in, actuation goes to the log only");
    Box::new(LogBackend::new())
}
