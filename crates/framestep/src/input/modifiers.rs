//! Modifier, held-key and wheel state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::keys::{KeyCode, KeyInput, Modifier};

/// Direction of the most recent wheel gesture.
///
/// Persisted as `-1` (up), `0` (none) or `1` (down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i8", into = "i8")]
pub enum Wheel {
    #[default]
    None,
    Up,
    Down,
}

impl Wheel {
    /// Direction for a vertical wheel delta. Positive deltas scroll down.
    pub fn from_delta(delta_y: f64) -> Self {
        if delta_y > 0.0 { Self::Down } else { Self::Up }
    }
}

impl From<i8> for Wheel {
    fn from(value: i8) -> Self {
        match value {
            v if v > 0 => Self::Down,
            v if v < 0 => Self::Up,
            _ => Self::None,
        }
    }
}

impl From<Wheel> for i8 {
    fn from(value: Wheel) -> Self {
        match value {
            Wheel::None => 0,
            Wheel::Up => -1,
            Wheel::Down => 1,
        }
    }
}

/// Accumulated keyboard and wheel state.
///
/// The wheel direction is one-shot: any key press or release resets it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModifierState {
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
    pub held: BTreeSet<KeyCode>,
    pub wheel: Wheel,
}

impl ModifierState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a key press.
    pub fn press(&mut self, input: &KeyInput) {
        match input.modifier() {
            Some(modifier) => self.set_modifier(modifier, true),
            None => {
                if let Some(code) = input.normalized_code() {
                    self.held.insert(code);
                }
            }
        }
        self.wheel = Wheel::None;
        tracing::trace!(target: "framestep::input", state = ?self, "key pressed");
    }

    /// Record a key release.
    pub fn release(&mut self, input: &KeyInput) {
        match input.modifier() {
            Some(modifier) => self.set_modifier(modifier, false),
            None => {
                if let Some(code) = input.normalized_code() {
                    self.held.remove(&code);
                }
            }
        }
        self.wheel = Wheel::None;
        tracing::trace!(target: "framestep::input", state = ?self, "key released");
    }

    /// Record a wheel gesture.
    pub fn wheel(&mut self, delta_y: f64) {
        self.wheel = Wheel::from_delta(delta_y);
    }

    /// Forget everything, e.g. when the window loses focus and releases will
    /// never arrive.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn set_modifier(&mut self, modifier: Modifier, down: bool) {
        match modifier {
            Modifier::Alt => self.alt = down,
            Modifier::Ctrl => self.ctrl = down,
            Modifier::Shift => self.shift = down,
        }
    }
}
