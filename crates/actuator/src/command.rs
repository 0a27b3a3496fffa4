//! Logical actuation commands.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Mouse button addressed by click rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Right,
}

impl MouseButton {
    pub fn from_is_right(is_right: bool) -> Self {
        if is_right {
            MouseButton::Right
        } else {
            MouseButton::Left
        }
    }

    pub fn is_right(self) -> bool {
        self == MouseButton::Right
    }
}

/// One imperative action for an [`Actuator`](crate::Actuator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActuationCommand {
    KeyDown { key: String, owner: String },
    KeyUp { key: String, owner: String },
    MoveMouse { dx: i32, dy: i32 },
    MouseButtonDown { button: MouseButton },
    MouseButtonUp { button: MouseButton },
    Scroll { amount: i32 },
    ReleaseAll,
}

impl ActuationCommand {
    pub fn key_down(key: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::KeyDown {
            key: key.into(),
            owner: owner.into(),
        }
    }

    pub fn key_up(key: impl Into<String>, owner: impl Into<String>) -> Self {
        Self::KeyUp {
            key: key.into(),
            owner: owner.into(),
        }
    }
}

impl fmt::Display for ActuationCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActuationCommand::KeyDown { key, owner } => write!(f, "KeyDown({key}, {owner})"),
            ActuationCommand::KeyUp { key, owner } => write!(f, "KeyUp({key}, {owner})"),
            ActuationCommand::MoveMouse { dx, dy } => write!(f, "MoveMouseRelative({dx}, {dy})"),
            ActuationCommand::MouseButtonDown { button } => {
                write!(f, "MouseButtonDown({button:?})")
            }
            ActuationCommand::MouseButtonUp { button } => write!(f, "MouseButtonUp({button:?})"),
            ActuationCommand::Scroll { amount } => write!(f, "ScrollMouse({amount})"),
            ActuationCommand::ReleaseAll => f.write_str("ReleaseAll"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        let json = serde_json::to_string(&ActuationCommand::key_down("A", "MouthOpen")).unwrap();
        assert_eq!(json, r#"{"type":"key_down","key":"A","owner":"MouthOpen"}"#);

        let json = serde_json::to_string(&ActuationCommand::MouseButtonUp {
            button: MouseButton::Right,
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"mouse_button_up","button":"right"}"#);

        let parsed: ActuationCommand = serde_json::from_str(r#"{"type":"release_all"}"#).unwrap();
        assert_eq!(parsed, ActuationCommand::ReleaseAll);
    }

    #[test]
    fn test_display_matches_contract_names() {
        assert_eq!(
            ActuationCommand::key_down("Q", "HeadTiltLeft").to_string(),
            "KeyDown(Q, HeadTiltLeft)"
        );
        assert_eq!(
            ActuationCommand::MoveMouse { dx: 3, dy: -1 }.to_string(),
            "MoveMouseRelative(3, -1)"
        );
    }

    #[test]
    fn test_mouse_button_from_flag() {
        assert_eq!(MouseButton::from_is_right(true), MouseButton::Right);
        assert!(!MouseButton::from_is_right(false).is_right());
    }
}
