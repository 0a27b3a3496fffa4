//! HeadPut Actuator
//!
//! Turns logical actuation commands into injected keyboard and mouse
//! events. The gesture engine talks to an [`Actuator`]; the actuator owns
//! the held-key table and forwards physical edges to a pluggable
//! [`InjectionBackend`]:
//!
//! - **Log:** writes each physical edge to the tracing log
//! - **Recording:** captures physical edges in memory for tests and replay
//!
//! OS-level injection lives outside this crate behind the backend trait.

pub mod backends;
pub mod command;
pub mod debounced;
pub mod held;
pub mod key;
pub mod recording;
pub mod writer;

pub use backends::{detect_best_backend, LogBackend};
pub use command::{ActuationCommand, MouseButton};
pub use debounced::DebouncedActuator;
pub use held::HeldKeys;
pub use key::KeyCode;
pub use recording::{InjectedEvent, RecordingActuator, RecordingBackend};
pub use writer::CommandWriter;

use headput_common::error::HeadputResult;

/// The collaborator the gesture engine drives.
///
/// Calls are fire-and-forget: an implementation logs its own failures and
/// never reports them back to the caller. Repeated `key_down` for a key an
/// owner already holds and `key_up` for a key it does not hold are no-ops.
pub trait Actuator: Send {
    fn key_down(&mut self, key: &str, owner: &str);

    fn key_up(&mut self, key: &str, owner: &str);

    fn move_mouse_relative(&mut self, dx: i32, dy: i32);

    fn mouse_button_down(&mut self, button: MouseButton);

    fn mouse_button_up(&mut self, button: MouseButton);

    fn scroll_mouse(&mut self, amount: i32);

    /// Release every key and button still held.
    fn release_all(&mut self);

    /// Actuator name for logging.
    fn name(&self) -> &str;

    /// Dispatch a logical command.
    fn apply(&mut self, command: &ActuationCommand) {
        match command {
            ActuationCommand::KeyDown { key, owner } => self.key_down(key, owner),
            ActuationCommand::KeyUp { key, owner } => self.key_up(key, owner),
            ActuationCommand::MoveMouse { dx, dy } => self.move_mouse_relative(*dx, *dy),
            ActuationCommand::MouseButtonDown { button } => self.mouse_button_down(*button),
            ActuationCommand::MouseButtonUp { button } => self.mouse_button_up(*button),
            ActuationCommand::Scroll { amount } => self.scroll_mouse(*amount),
            ActuationCommand::ReleaseAll => self.release_all(),
        }
    }
}

/// Trait for physical event injection backends.
pub trait InjectionBackend: Send {
    fn press_key(&mut self, key: KeyCode) -> HeadputResult<()>;

    fn release_key(&mut self, key: KeyCode) -> HeadputResult<()>;

    fn move_pointer(&mut self, dx: i32, dy: i32) -> HeadputResult<()>;

    fn button(&mut self, button: MouseButton, down: bool) -> HeadputResult<()>;

    fn scroll(&mut self, amount: i32) -> HeadputResult<()>;

    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Check if the backend can inject on this system.
    fn is_available(&self) -> bool;
}

impl<B: InjectionBackend + ?Sized> InjectionBackend for Box<B> {
    fn press_key(&mut self, key: KeyCode) -> HeadputResult<()> {
        (**self).press_key(key)
    }

    fn release_key(&mut self, key: KeyCode) -> HeadputResult<()> {
        (**self).release_key(key)
    }

    fn move_pointer(&mut self, dx: i32, dy: i32) -> HeadputResult<()> {
        (**self).move_pointer(dx, dy)
    }

    fn button(&mut self, button: MouseButton, down: bool) -> HeadputResult<()> {
        (**self).button(button, down)
    }

    fn scroll(&mut self, amount: i32) -> HeadputResult<()> {
        (**self).scroll(amount)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}
