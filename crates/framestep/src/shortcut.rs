//! Shortcut matching engine.
//!
//! A [`ChordTable`] maps action names to declarative [`ChordDefinition`]s. On
//! every key press or wheel gesture the [`ShortcutEngine`] evaluates the whole
//! table against the current [`ModifierState`] and returns every action whose
//! chord matches, in table order.
//!
//! # Matching rules
//!
//! A modifier left out of a chord is "don't care"; a modifier that is present
//! must equal the live state. After the modifiers agree, a chord matches when
//! either
//!
//! - neither the chord nor the state carries a wheel direction and the chord's
//!   key set equals the held key set exactly, or
//! - the chord names a wheel direction and the state's one-shot wheel
//!   direction is the same.
//!
//! Exact set equality is what keeps `.` from firing while `Ctrl+.` is held.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::input::{InputTarget, KeyCode, ModifierState, Wheel};

/// Display label stored next to a bound key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLabel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl KeyLabel {
    /// A label showing `key`.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }
}

/// A declarative key/wheel chord.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChordDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheel: Option<Wheel>,
    #[serde(default)]
    pub keys: BTreeMap<KeyCode, KeyLabel>,
}

impl ChordDefinition {
    /// A chord of a single key with no modifier constraints.
    pub fn key(code: KeyCode, label: impl Into<String>) -> Self {
        Self {
            keys: BTreeMap::from([(code, KeyLabel::new(label))]),
            ..Self::default()
        }
    }

    /// A chord on a wheel direction.
    pub fn wheel(direction: Wheel) -> Self {
        Self {
            wheel: Some(direction),
            ..Self::default()
        }
    }

    /// Add a key to the chord.
    pub fn with_key(mut self, code: KeyCode, label: impl Into<String>) -> Self {
        self.keys.insert(code, KeyLabel::new(label));
        self
    }

    /// Require `alt` to be in the given state.
    pub fn with_alt(mut self, down: bool) -> Self {
        self.alt = Some(down);
        self
    }

    /// Require `ctrl` to be in the given state.
    pub fn with_ctrl(mut self, down: bool) -> Self {
        self.ctrl = Some(down);
        self
    }

    /// Require `shift` to be in the given state.
    pub fn with_shift(mut self, down: bool) -> Self {
        self.shift = Some(down);
        self
    }

    /// Whether this chord matches `state`.
    pub fn matches(&self, state: &ModifierState) -> bool {
        let modifier_ok = |required: Option<bool>, actual: bool| required.is_none_or(|r| r == actual);
        if !modifier_ok(self.alt, state.alt)
            || !modifier_ok(self.ctrl, state.ctrl)
            || !modifier_ok(self.shift, state.shift)
        {
            return false;
        }

        let chord_wheel = self.wheel.unwrap_or_default();
        if chord_wheel == Wheel::None {
            state.wheel == Wheel::None && self.keys.keys().copied().eq(state.held.iter().copied())
        } else {
            chord_wheel == state.wheel
        }
    }

    /// The key codes of this chord.
    pub fn key_set(&self) -> BTreeSet<KeyCode> {
        self.keys.keys().copied().collect()
    }
}

/// Actions the session knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    IncreaseFrameRate,
    DecreaseFrameRate,
    NextFrame,
    PreviousFrame,
    ToggleSurface,
}

impl Action {
    /// Every action, in default table order.
    pub const ALL: [Action; 5] = [
        Action::IncreaseFrameRate,
        Action::DecreaseFrameRate,
        Action::NextFrame,
        Action::PreviousFrame,
        Action::ToggleSurface,
    ];

    /// The persisted settings key of this action's chord.
    pub fn name(self) -> &'static str {
        match self {
            Action::IncreaseFrameRate => "increase_framerate",
            Action::DecreaseFrameRate => "decrease_framerate",
            Action::NextFrame => "next_shortcut",
            Action::PreviousFrame => "prev_shortcut",
            Action::ToggleSurface => "hide_shortcut",
        }
    }

    /// Look up an action by its settings key.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.name() == name)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of a chord table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordEntry {
    pub name: String,
    pub chord: ChordDefinition,
}

/// An ordered list of named chords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChordTable {
    entries: Vec<ChordEntry>,
}

impl ChordTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the chord for `name`. Replacing keeps the entry's
    /// position.
    pub fn set(&mut self, name: impl Into<String>, chord: ChordDefinition) {
        let name = name.into();
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.chord = chord,
            None => self.entries.push(ChordEntry { name, chord }),
        }
    }

    /// The chord bound to `name`.
    pub fn get(&self, name: &str) -> Option<&ChordDefinition> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.chord)
    }

    /// Remove the chord bound to `name`.
    pub fn remove(&mut self, name: &str) -> Option<ChordDefinition> {
        let index = self.entries.iter().position(|entry| entry.name == name)?;
        Some(self.entries.remove(index).chord)
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = &ChordEntry> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Session facts that gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchContext {
    /// Where the triggering event was delivered.
    pub target: InputTarget,
    /// An active media element exists.
    pub has_active_target: bool,
    /// The control surface is currently shown.
    pub surface_visible: bool,
}

/// Evaluates chord tables against the live modifier state.
#[derive(Debug, Clone, Default)]
pub struct ShortcutEngine {
    handlers: HashMap<String, Action>,
}

impl ShortcutEngine {
    /// An engine with no registered handlers. Nothing will ever match.
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine with every [`Action`] registered under its own name.
    pub fn with_default_actions() -> Self {
        let mut engine = Self::new();
        for action in Action::ALL {
            engine.register(action.name(), action);
        }
        engine
    }

    /// Route table entries named `name` to `action`.
    pub fn register(&mut self, name: impl Into<String>, action: Action) {
        self.handlers.insert(name.into(), action);
    }

    /// Stop routing entries named `name`.
    pub fn unregister(&mut self, name: &str) -> Option<Action> {
        self.handlers.remove(name)
    }

    /// Whether entries named `name` have a handler.
    pub fn is_registered(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Return every action whose chord matches `state`, in table order.
    ///
    /// Returns nothing for targets that accept text, or when there is neither
    /// an active element nor a visible surface.
    pub fn evaluate(
        &self,
        state: &ModifierState,
        table: &ChordTable,
        context: &MatchContext,
    ) -> Vec<Action> {
        if context.target.excludes_shortcuts() {
            tracing::trace!(target: "framestep::shortcut", "text entry context, skipping evaluation");
            return Vec::new();
        }
        if !context.has_active_target && !context.surface_visible {
            return Vec::new();
        }

        let matched: Vec<Action> = table
            .iter()
            .filter_map(|entry| {
                let action = self.handlers.get(&entry.name)?;
                entry.chord.matches(state).then_some(*action)
            })
            .collect();

        if !matched.is_empty() {
            tracing::debug!(target: "framestep::shortcut", ?matched, "chords matched");
        }
        matched
    }
}
