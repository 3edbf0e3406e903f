//! Key codes and raw keyboard input.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A normalised numeric key code.
///
/// Uses the legacy numeric code space, so persisted chord tables written by
/// older hosts keep matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyCode(pub u16);

impl KeyCode {
    pub const ARROW_LEFT: Self = Self(37);
    pub const ARROW_UP: Self = Self(38);
    pub const ARROW_RIGHT: Self = Self(39);
    pub const ARROW_DOWN: Self = Self(40);
    pub const H: Self = Self(72);
    pub const COMMA: Self = Self(188);
    pub const PERIOD: Self = Self(190);
    pub const BRACKET_LEFT: Self = Self(219);
    pub const BRACKET_RIGHT: Self = Self(221);

    /// Map a symbolic key identifier to its numeric code.
    ///
    /// Only punctuation used by the default bindings and single ASCII letters
    /// or digits are known; anything else yields `None`.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "," => Some(Self::COMMA),
            "." => Some(Self::PERIOD),
            "[" => Some(Self::BRACKET_LEFT),
            "]" => Some(Self::BRACKET_RIGHT),
            "ArrowLeft" => Some(Self::ARROW_LEFT),
            "ArrowUp" => Some(Self::ARROW_UP),
            "ArrowRight" => Some(Self::ARROW_RIGHT),
            "ArrowDown" => Some(Self::ARROW_DOWN),
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphanumeric() => {
                        Some(Self(c.to_ascii_uppercase() as u16))
                    }
                    _ => None,
                }
            }
        }
    }

    /// Map a physical key code (layout independent) to its numeric code.
    pub fn from_physical(code: &str) -> Option<Self> {
        match code {
            "Comma" => Some(Self::COMMA),
            "Period" => Some(Self::PERIOD),
            "BracketLeft" => Some(Self::BRACKET_LEFT),
            "BracketRight" => Some(Self::BRACKET_RIGHT),
            "ArrowLeft" | "ArrowUp" | "ArrowRight" | "ArrowDown" => Self::from_key(code),
            _ => {
                if let Some(letter) = code.strip_prefix("Key") {
                    return Self::from_key(letter);
                }
                if let Some(digit) = code.strip_prefix("Digit") {
                    return Self::from_key(digit);
                }
                None
            }
        }
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A modifier key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Alt,
    Ctrl,
    Shift,
}

/// A raw key press or release as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInput {
    /// Physical key identifier, e.g. `"AltLeft"` or `"Period"`.
    pub code: String,
    /// Symbolic key identifier, e.g. `"."`.
    pub key: String,
    /// Legacy numeric code, `0` when the host does not supply one.
    pub key_code: u16,
}

impl KeyInput {
    /// Build an input from a legacy numeric code only.
    pub fn from_code(key_code: KeyCode) -> Self {
        Self {
            key_code: key_code.0,
            ..Self::default()
        }
    }

    /// Build an input from a symbolic key only.
    pub fn from_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    /// Build an input for a modifier key, identified by its physical code.
    pub fn modifier_key(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    /// Which modifier this key is, if any.
    pub fn modifier(&self) -> Option<Modifier> {
        match self.code.as_str() {
            "AltLeft" | "AltRight" => Some(Modifier::Alt),
            "ControlLeft" | "ControlRight" => Some(Modifier::Ctrl),
            "ShiftLeft" | "ShiftRight" => Some(Modifier::Shift),
            _ => None,
        }
    }

    /// The normalised code used for held-key tracking.
    ///
    /// Prefers the legacy numeric code, then the symbolic key, then the
    /// physical code. The last step covers dead keys, whose symbolic value is
    /// not the printed character.
    pub fn normalized_code(&self) -> Option<KeyCode> {
        if self.key_code != 0 {
            return Some(KeyCode(self.key_code));
        }
        KeyCode::from_key(&self.key).or_else(|| KeyCode::from_physical(&self.code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_normalises_to_legacy_codes() {
        assert_eq!(KeyInput::from_key(",").normalized_code(), Some(KeyCode(188)));
        assert_eq!(KeyInput::from_key(".").normalized_code(), Some(KeyCode(190)));
        assert_eq!(KeyInput::from_key("[").normalized_code(), Some(KeyCode(219)));
        assert_eq!(KeyInput::from_key("]").normalized_code(), Some(KeyCode(221)));
    }

    #[test]
    fn legacy_code_wins_over_symbolic_key() {
        let input = KeyInput {
            code: "Period".into(),
            key: ">".into(),
            key_code: 190,
        };
        assert_eq!(input.normalized_code(), Some(KeyCode::PERIOD));
    }

    #[test]
    fn dead_key_falls_back_to_physical_code() {
        let input = KeyInput {
            code: "BracketLeft".into(),
            key: "Dead".into(),
            key_code: 0,
        };
        assert_eq!(input.normalized_code(), Some(KeyCode::BRACKET_LEFT));
    }

    #[test]
    fn letters_are_case_insensitive() {
        assert_eq!(KeyCode::from_key("h"), Some(KeyCode::H));
        assert_eq!(KeyCode::from_key("H"), Some(KeyCode::H));
        assert_eq!(KeyCode::from_physical("KeyH"), Some(KeyCode::H));
        assert_eq!(KeyCode::from_key("Enter"), None);
    }

    #[test]
    fn modifiers_are_identified_by_physical_code() {
        assert_eq!(KeyInput::modifier_key("AltRight").modifier(), Some(Modifier::Alt));
        assert_eq!(
            KeyInput::modifier_key("ControlLeft").modifier(),
            Some(Modifier::Ctrl)
        );
        assert_eq!(KeyInput::from_key("a").modifier(), None);
    }
}
