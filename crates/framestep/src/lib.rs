//! Frame-accurate video stepping for live documents.
//!
//! framestep keeps a set of media elements under observation while the
//! document around them mutates, elects one of them as the *active* element,
//! and turns keyboard and wheel chords into frame-exact seeks and frame-rate
//! adjustments on it.
//!
//! The crate is host-agnostic. Everything it needs from the outside world is
//! expressed as a capability trait:
//!
//! - [`DocumentHost`] / [`MediaHost`]: the document tree and playback control
//! - [`DecodedFrameCounter`]: optional decoded-frame sampling for rate
//!   detection
//! - [`SettingsStore`]: persisted key/value settings
//! - [`Presentation`]: the floating control surface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use framestep::{InputTarget, KeyInput, Session};
//!
//! let mut session = Session::builder(Arc::new(host), Arc::new(renderer))
//!     .settings(Arc::new(store))
//!     .frame_counter(Arc::new(quality))
//!     .build();
//!
//! session.diagnostics().connect(|err| eprintln!("framestep: {err}"));
//!
//! // From the host's keydown listener:
//! if session.key_down(&KeyInput::from_key("."), InputTarget::document()).is_consumed() {
//!     // prevent default
//! }
//!
//! // From the host's event loop:
//! if session.time_until_next_timer() == Some(std::time::Duration::ZERO) {
//!     session.process_timers();
//! }
//! ```
//!
//! # Logging
//!
//! All events go through `tracing` under the `framestep::*` targets listed in
//! [`framestep_core::logging::targets`].

pub mod actions;
mod error;
pub mod host;
pub mod input;
pub mod presentation;
pub mod registry;
mod session;
pub mod settings;
pub mod shortcut;
pub mod surface;

pub use actions::Direction;
pub use error::{Error, MediaError, PresentationError, Result, SettingsError};
pub use host::{DecodedFrameCounter, DocumentHost, MediaHost, Point, Rect, Size};
pub use input::{FocusKind, InputTarget, KeyCode, KeyInput, ModifierState, Wheel};
pub use presentation::{Affordance, Presentation, SurfaceState};
pub use registry::{MediaEvent, MediaId, MediaRegistry, MutationRecord};
pub use session::{Session, SessionBuilder, SessionConfig};
pub use settings::{MemorySettings, Preferences, SettingsStore};
pub use shortcut::{Action, ChordDefinition, ChordTable, ShortcutEngine};
pub use surface::Disposition;
