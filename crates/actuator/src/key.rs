//! Key vocabulary accepted in rule settings.

use std::fmt;
use std::str::FromStr;

use headput_common::error::HeadputError;

/// A physical key a rule can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCode {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    D0,
    D1,
    D2,
    D3,
    D4,
    D5,
    D6,
    D7,
    D8,
    D9,
    Up,
    Down,
    Left,
    Right,
    Space,
    Enter,
    Tab,
    Escape,
}

const LETTERS: [KeyCode; 26] = [
    KeyCode::A,
    KeyCode::B,
    KeyCode::C,
    KeyCode::D,
    KeyCode::E,
    KeyCode::F,
    KeyCode::G,
    KeyCode::H,
    KeyCode::I,
    KeyCode::J,
    KeyCode::K,
    KeyCode::L,
    KeyCode::M,
    KeyCode::N,
    KeyCode::O,
    KeyCode::P,
    KeyCode::Q,
    KeyCode::R,
    KeyCode::S,
    KeyCode::T,
    KeyCode::U,
    KeyCode::V,
    KeyCode::W,
    KeyCode::X,
    KeyCode::Y,
    KeyCode::Z,
];

const DIGITS: [KeyCode; 10] = [
    KeyCode::D0,
    KeyCode::D1,
    KeyCode::D2,
    KeyCode::D3,
    KeyCode::D4,
    KeyCode::D5,
    KeyCode::D6,
    KeyCode::D7,
    KeyCode::D8,
    KeyCode::D9,
];

impl KeyCode {
    pub fn name(self) -> &'static str {
        match self {
            KeyCode::A => "A",
            KeyCode::B => "B",
            KeyCode::C => "C",
            KeyCode::D => "D",
            KeyCode::E => "E",
            KeyCode::F => "F",
            KeyCode::G => "G",
            KeyCode::H => "H",
            KeyCode::I => "I",
            KeyCode::J => "J",
            KeyCode::K => "K",
            KeyCode::L => "L",
            KeyCode::M => "M",
            KeyCode::N => "N",
            KeyCode::O => "O",
            KeyCode::P => "P",
            KeyCode::Q => "Q",
            KeyCode::R => "R",
            KeyCode::S => "S",
            KeyCode::T => "T",
            KeyCode::U => "U",
            KeyCode::V => "V",
            KeyCode::W => "W",
            KeyCode::X => "X",
            KeyCode::Y => "Y",
            KeyCode::Z => "Z",
            KeyCode::D0 => "D0",
            KeyCode::D1 => "D1",
            KeyCode::D2 => "D2",
            KeyCode::D3 => "D3",
            KeyCode::D4 => "D4",
            KeyCode::D5 => "D5",
            KeyCode::D6 => "D6",
            KeyCode::D7 => "D7",
            KeyCode::D8 => "D8",
            KeyCode::D9 => "D9",
            KeyCode::Up => "Up",
            KeyCode::Down => "Down",
            KeyCode::Left => "Left",
            KeyCode::Right => "Right",
            KeyCode::Space => "Space",
            KeyCode::Enter => "Enter",
            KeyCode::Tab => "Tab",
            KeyCode::Escape => "Escape",
        }
    }

    /// Parse a key name, returning `None` when it is not in the vocabulary.
    pub fn parse(name: &str) -> Option<KeyCode> {
        let upper = name.trim().to_ascii_uppercase();
        let bytes = upper.as_bytes();

        match bytes {
            [letter @ b'A'..=b'Z'] => return Some(LETTERS[usize::from(letter - b'A')]),
            [digit @ b'0'..=b'9'] | [b'D', digit @ b'0'..=b'9'] => {
                return Some(DIGITS[usize::from(digit - b'0')])
            }
            _ => {}
        }

        let key = match upper.as_str() {
            "UP" => KeyCode::Up,
            "DOWN" => KeyCode::Down,
            "LEFT" => KeyCode::Left,
            "RIGHT" => KeyCode::Right,
            "SPACE" => KeyCode::Space,
            "ENTER" | "RETURN" => KeyCode::Enter,
            "TAB" => KeyCode::Tab,
            "ESCAPE" | "ESC" => KeyCode::Escape,
            _ => return None,
        };
        Some(key)
    }
}

impl FromStr for KeyCode {
    type Err = HeadputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyCode::parse(s).ok_or_else(|| HeadputError::unknown_key(s))
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
