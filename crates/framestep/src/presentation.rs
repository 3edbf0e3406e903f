//! The presentation bridge.
//!
//! framestep never draws. A host-side renderer implements [`Presentation`]
//! and the session tells it when to show, hide and refresh the floating
//! control surface.

use crate::error::PresentationError;
use crate::host::{Point, Rect, Size};

/// Interactive regions of the control surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affordance {
    /// Collapses or expands the surface.
    Toggle,
    /// Moves the surface.
    Drag,
    /// Resizes the surface.
    Resize,
}

/// Snapshot of the active element shown on the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceState {
    /// Playback position in seconds.
    pub current_time: f64,
    /// Duration in seconds, if known.
    pub duration: Option<f64>,
    /// `floor(current_time * frame_rate)`.
    pub frame: u64,
    /// The assumed frame rate.
    pub frame_rate: f64,
}

impl SurfaceState {
    /// Build a snapshot, deriving the frame index from time and rate.
    pub fn new(current_time: f64, duration: Option<f64>, frame_rate: f64) -> Self {
        let frame = (current_time * frame_rate).floor().max(0.0) as u64;
        Self {
            current_time,
            duration,
            frame,
            frame_rate,
        }
    }
}

/// Renderer for the floating control surface.
pub trait Presentation: Send + Sync {
    /// Show the surface over `bounds`.
    fn show(&self, bounds: Rect) -> Result<(), PresentationError>;

    /// Hide the surface.
    fn hide(&self);

    /// Whether the surface is currently shown.
    fn is_visible(&self) -> bool;

    /// Refresh the displayed values.
    fn update(&self, state: &SurfaceState);

    /// Current on-screen bounds of an affordance, if laid out.
    fn affordance_rect(&self, affordance: Affordance) -> Option<Rect>;

    /// Current on-screen bounds of the movable surface panel.
    fn surface_rect(&self) -> Option<Rect>;

    /// Mark the surface busy while a drag or resize is in progress.
    fn set_busy(&self, busy: bool);

    /// Collapse or expand the surface to its toggle affordance.
    fn set_collapsed(&self, collapsed: bool);

    /// Move the surface panel so its top-left corner is at `origin`.
    fn move_to(&self, origin: Point);

    /// Resize the surface panel.
    fn resize_to(&self, size: Size);
}
