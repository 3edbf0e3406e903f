//! Raw input types and the modifier/state tracker.

mod keys;
mod modifiers;

pub use keys::{KeyCode, KeyInput, Modifier};
pub use modifiers::{ModifierState, Wheel};

/// Kind of the element that currently holds document focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusKind {
    #[default]
    Other,
    Embed,
    Input,
    Object,
    TextArea,
    Frame,
}

/// Where a keyboard or wheel event was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputTarget {
    /// The event target is editable content.
    pub editable: bool,
    /// What holds document focus.
    pub focus: FocusKind,
}

impl InputTarget {
    /// A target that does not accept text.
    pub fn document() -> Self {
        Self::default()
    }

    /// An editable content target.
    pub fn editable() -> Self {
        Self {
            editable: true,
            focus: FocusKind::Other,
        }
    }

    /// A target with focus on the given kind of element.
    pub fn focused(focus: FocusKind) -> Self {
        Self {
            editable: false,
            focus,
        }
    }

    /// Whether shortcuts must not be evaluated for this target.
    pub fn excludes_shortcuts(&self) -> bool {
        self.editable || self.focus != FocusKind::Other
    }
}
