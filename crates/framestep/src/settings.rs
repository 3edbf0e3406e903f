//! Persisted settings and the typed preference view over them.
//!
//! Storage itself is the host's concern. framestep talks to it through the
//! [`SettingsStore`] trait, which deals in `serde_json::Value`s keyed by
//! name and announces every change on a [`Signal`]. [`MemorySettings`] is the
//! in-process implementation used by tests and by hosts without persistence.
//!
//! # Keys
//!
//! | key | value |
//! |-----|-------|
//! | [`keys::FRAME_RATE`] | positive number, defaults to 60 |
//! | [`keys::HIDDEN`] | bool, the control surface is collapsed |
//! | [`keys::POSITION`] | `{ "x": f64, "y": f64 }` |
//! | [`keys::SIZE`] | `{ "width": f64, "height": f64 }` |
//! | one per [`Action`] name | a [`ChordDefinition`] |
//!
//! # Binding import
//!
//! Older releases bound frame stepping and rate adjustment to the arrow keys.
//! On load, each of the four stepping and rate actions must be bound to
//! exactly one key, its default key; any other stored key set (arrow keys,
//! a custom key, extra keys, a bare wheel chord) is reset to the default.
//! Modifier flags on the default key are kept. The surface toggle is only
//! filled in when missing. Changes made while a session runs are applied as
//! stored; the reset happens on the next load.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use framestep_core::Signal;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SettingsError;
use crate::host::{Point, Size};
use crate::input::KeyCode;
use crate::shortcut::{Action, ChordDefinition, ChordTable};

/// Settings key names.
pub mod keys {
    /// Assumed playback frame rate.
    pub const FRAME_RATE: &str = "framerate";
    /// Whether the control surface is collapsed to its toggle.
    pub const HIDDEN: &str = "hidden";
    /// Last dragged surface position.
    pub const POSITION: &str = "position";
    /// Last resized surface size.
    pub const SIZE: &str = "size";
}

/// Default frame rate when nothing is persisted.
pub const DEFAULT_FRAME_RATE: f64 = 60.0;

/// Key/value storage for persisted settings.
pub trait SettingsStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a value and announce the change.
    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError>;

    /// Write several values. Stops at the first failure.
    fn set_many(&self, entries: Vec<(String, Value)>) -> Result<(), SettingsError> {
        for (key, value) in entries {
            self.set(&key, value)?;
        }
        Ok(())
    }

    /// Emitted with the key of every changed value.
    fn changed(&self) -> &Signal<String>;
}

/// An in-memory [`SettingsStore`].
pub struct MemorySettings {
    data: RwLock<HashMap<String, Value>>,
    changed: Signal<String>,
    read_only: AtomicBool,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySettings {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::from_values(HashMap::new())
    }

    /// Creates a store pre-populated with `values`.
    pub fn from_values(values: HashMap<String, Value>) -> Self {
        Self {
            data: RwLock::new(values),
            changed: Signal::new(),
            read_only: AtomicBool::new(false),
        }
    }

    /// Make every subsequent write fail, as a full or revoked store would.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Gets a value using serde deserialization.
    pub fn get_deserialized<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.data.read().get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    /// Returns true if a value exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Removes a value, announcing the change if it existed.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let removed = self.data.write().remove(key);
        if removed.is_some() {
            self.changed.emit(key.to_string());
        }
        removed
    }

    /// Returns all keys.
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Returns the number of stored values.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.data.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) -> Result<(), SettingsError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(SettingsError::write(key, "store is read-only"));
        }
        // Release the lock before emitting so slots can read back.
        {
            self.data.write().insert(key.to_string(), value);
        }
        self.changed.emit(key.to_string());
        Ok(())
    }

    fn changed(&self) -> &Signal<String> {
        &self.changed
    }
}

/// The default chord for `action`.
pub fn default_chord(action: Action) -> ChordDefinition {
    match action {
        Action::IncreaseFrameRate => ChordDefinition::key(KeyCode::BRACKET_RIGHT, "]"),
        Action::DecreaseFrameRate => ChordDefinition::key(KeyCode::BRACKET_LEFT, "["),
        Action::NextFrame => ChordDefinition::key(KeyCode::PERIOD, "."),
        Action::PreviousFrame => ChordDefinition::key(KeyCode::COMMA, ","),
        Action::ToggleSurface => ChordDefinition::key(KeyCode::H, "h"),
    }
}

/// The default chord table, in [`Action::ALL`] order.
pub fn default_chords() -> ChordTable {
    let mut table = ChordTable::new();
    for action in Action::ALL {
        table.set(action.name(), default_chord(action));
    }
    table
}

/// Whether a stored binding for `action` is replaced by the default on load.
fn needs_reset(action: Action, chord: &ChordDefinition) -> bool {
    if action == Action::ToggleSurface {
        return false;
    }
    let expected = default_chord(action).key_set();
    chord.key_set() != expected
}

fn read_frame_rate(store: &dyn SettingsStore) -> Option<f64> {
    store
        .get(keys::FRAME_RATE)
        .and_then(|value| value.as_f64())
        .filter(|fps| fps.is_finite() && *fps > 0.0)
}

fn read<T: DeserializeOwned>(store: &dyn SettingsStore, key: &str) -> Option<T> {
    let value = store.get(key)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            tracing::warn!(target: "framestep::settings", key, %err, "ignoring malformed setting");
            None
        }
    }
}

fn frame_rate_value(fps: f64) -> Value {
    if fps.fract() == 0.0 && fps <= i64::MAX as f64 {
        Value::from(fps as i64)
    } else {
        Value::from(fps)
    }
}

/// Typed, in-memory view of the persisted settings.
///
/// Reads never touch the store. Writes update memory first and then persist,
/// so a failed write leaves the new value in effect for the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Preferences {
    default_frame_rate: f64,
    frame_rate: f64,
    hidden: bool,
    position: Option<Point>,
    size: Option<Size>,
    chords: ChordTable,
}

impl Preferences {
    /// Read every setting from `store`, applying defaults and the binding
    /// reset in memory.
    ///
    /// Returns the preferences and the names of the chords that were added
    /// or reset; pass them to [`persist_chords`](Self::persist_chords) to
    /// write them back.
    pub fn load(store: &dyn SettingsStore, default_frame_rate: f64) -> (Self, Vec<String>) {
        let mut chords = ChordTable::new();
        let mut migrated = Vec::new();

        for action in Action::ALL {
            let name = action.name();
            let chord = match read::<ChordDefinition>(store, name) {
                Some(chord) if needs_reset(action, &chord) => {
                    tracing::info!(target: "framestep::settings", action = name, keys = ?chord.key_set(), "resetting binding to its default key");
                    migrated.push(name.to_string());
                    default_chord(action)
                }
                Some(chord) => chord,
                None => {
                    migrated.push(name.to_string());
                    default_chord(action)
                }
            };
            chords.set(name, chord);
        }

        let preferences = Self {
            default_frame_rate,
            frame_rate: read_frame_rate(store).unwrap_or(default_frame_rate),
            hidden: read(store, keys::HIDDEN).unwrap_or(false),
            position: read(store, keys::POSITION),
            size: read(store, keys::SIZE),
            chords,
        };
        tracing::debug!(target: "framestep::settings", frame_rate = preferences.frame_rate, hidden = preferences.hidden, migrated = migrated.len(), "preferences loaded");

        (preferences, migrated)
    }

    /// Write the named chords back to `store` in one pass.
    pub fn persist_chords(
        &self,
        store: &dyn SettingsStore,
        names: &[String],
    ) -> Result<(), SettingsError> {
        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let Some(chord) = self.chords.get(name) else {
                continue;
            };
            let value = serde_json::to_value(chord)
                .map_err(|err| SettingsError::write(name.clone(), err.to_string()))?;
            entries.push((name.clone(), value));
        }
        if entries.is_empty() {
            return Ok(());
        }
        store.set_many(entries)
    }

    /// Re-read one key after a store change.
    ///
    /// Returns `false` for keys this view does not track.
    pub fn refresh(&mut self, store: &dyn SettingsStore, key: &str) -> bool {
        match key {
            keys::FRAME_RATE => {
                self.frame_rate = read_frame_rate(store).unwrap_or(self.default_frame_rate);
            }
            keys::HIDDEN => self.hidden = read(store, keys::HIDDEN).unwrap_or(false),
            keys::POSITION => self.position = read(store, keys::POSITION),
            keys::SIZE => self.size = read(store, keys::SIZE),
            _ => match Action::from_name(key) {
                Some(action) => {
                    let chord = read(store, key).unwrap_or_else(|| default_chord(action));
                    self.chords.set(key, chord);
                }
                None => return false,
            },
        }
        tracing::trace!(target: "framestep::settings", key, "preference refreshed");
        true
    }

    /// The assumed playback frame rate.
    pub fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    /// Set and persist the frame rate.
    pub fn set_frame_rate(
        &mut self,
        store: &dyn SettingsStore,
        fps: f64,
    ) -> Result<(), SettingsError> {
        self.frame_rate = fps;
        store.set(keys::FRAME_RATE, frame_rate_value(fps))
    }

    /// Whether the control surface is collapsed.
    pub fn hidden(&self) -> bool {
        self.hidden
    }

    /// Set and persist the collapsed flag.
    pub fn set_hidden(
        &mut self,
        store: &dyn SettingsStore,
        hidden: bool,
    ) -> Result<(), SettingsError> {
        self.hidden = hidden;
        store.set(keys::HIDDEN, Value::Bool(hidden))
    }

    /// Last persisted surface position.
    pub fn position(&self) -> Option<Point> {
        self.position
    }

    /// Set and persist the surface position.
    pub fn set_position(
        &mut self,
        store: &dyn SettingsStore,
        position: Point,
    ) -> Result<(), SettingsError> {
        self.position = Some(position);
        let value = serde_json::to_value(position)
            .map_err(|err| SettingsError::write(keys::POSITION, err.to_string()))?;
        store.set(keys::POSITION, value)
    }

    /// Last persisted surface size.
    pub fn size(&self) -> Option<Size> {
        self.size
    }

    /// Set and persist the surface size.
    pub fn set_size(&mut self, store: &dyn SettingsStore, size: Size) -> Result<(), SettingsError> {
        self.size = Some(size);
        let value = serde_json::to_value(size)
            .map_err(|err| SettingsError::write(keys::SIZE, err.to_string()))?;
        store.set(keys::SIZE, value)
    }

    /// The chord table.
    pub fn chords(&self) -> &ChordTable {
        &self.chords
    }
}
