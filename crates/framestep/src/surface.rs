//! Pointer gestures on the control surface's affordances.
//!
//! Pressing the drag or resize handle starts a gesture that follows the
//! pointer until release. The toggle affordance only reacts to clicks. While
//! the surface is collapsed (the persisted `hidden` flag) only the toggle is
//! interactive.

use crate::host::{Point, Size};
use crate::presentation::{Affordance, Presentation};

/// Whether the host should stop an event from reaching the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    /// The event was not for the surface.
    #[default]
    Ignored,
    /// The surface handled the event.
    Consumed,
}

impl Disposition {
    /// Whether the event was consumed.
    pub fn is_consumed(self) -> bool {
        self == Disposition::Consumed
    }

    fn from_hit(hit: bool) -> Self {
        if hit {
            Disposition::Consumed
        } else {
            Disposition::Ignored
        }
    }
}

/// A finished gesture and the geometry to persist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEnd {
    Moved(Point),
    Resized(Size),
}

/// Result of a pointer release.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Release {
    pub disposition: Disposition,
    pub ended: Option<GestureEnd>,
}

/// Result of a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Click {
    pub disposition: Disposition,
    /// The toggle affordance was clicked.
    pub toggle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum Gesture {
    #[default]
    Idle,
    /// `grab` is the pointer offset from the panel's top-left corner.
    Dragging { grab: Point },
    /// `grab` is the pointer offset from the panel's bottom-right corner.
    Resizing { grab: Point },
}

/// Drag/resize state machine for the control surface.
#[derive(Debug, Default)]
pub struct SurfaceGestures {
    gesture: Gesture,
}

impl SurfaceGestures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a drag or resize is in progress.
    pub fn is_active(&self) -> bool {
        self.gesture != Gesture::Idle
    }

    pub fn pointer_down(
        &mut self,
        point: Point,
        presentation: &dyn Presentation,
        collapsed: bool,
    ) -> Disposition {
        if hit(presentation, Affordance::Toggle, point) {
            return Disposition::Consumed;
        }
        if collapsed {
            return Disposition::Ignored;
        }
        let Some(panel) = presentation.surface_rect() else {
            return Disposition::Ignored;
        };

        if hit(presentation, Affordance::Drag, point) {
            let origin = panel.origin();
            self.gesture = Gesture::Dragging {
                grab: Point::new(point.x - origin.x, point.y - origin.y),
            };
        } else if hit(presentation, Affordance::Resize, point) {
            let corner = panel.bottom_right();
            self.gesture = Gesture::Resizing {
                grab: Point::new(point.x - corner.x, point.y - corner.y),
            };
        } else {
            return Disposition::Ignored;
        }

        presentation.set_busy(true);
        tracing::trace!(target: "framestep::session", gesture = ?self.gesture, "surface gesture started");
        Disposition::Consumed
    }

    /// Follow the pointer. Returns `true` while a gesture is in progress.
    pub fn pointer_move(&mut self, point: Point, presentation: &dyn Presentation) -> bool {
        match self.gesture {
            Gesture::Idle => false,
            Gesture::Dragging { grab } => {
                presentation.move_to(Point::new(point.x - grab.x, point.y - grab.y));
                true
            }
            Gesture::Resizing { grab } => {
                if let Some(panel) = presentation.surface_rect() {
                    let width = (point.x - grab.x - panel.x).max(0.0);
                    let height = (point.y - grab.y - panel.y).max(0.0);
                    presentation.resize_to(Size::new(width, height));
                }
                true
            }
        }
    }

    /// End any gesture and report the geometry to persist.
    pub fn pointer_up(
        &mut self,
        point: Point,
        presentation: &dyn Presentation,
        collapsed: bool,
    ) -> Release {
        let gesture = std::mem::take(&mut self.gesture);
        let ended = match (gesture, presentation.surface_rect()) {
            (Gesture::Dragging { .. }, Some(panel)) => Some(GestureEnd::Moved(panel.origin())),
            (Gesture::Resizing { .. }, Some(panel)) => {
                Some(GestureEnd::Resized(Size::new(panel.width, panel.height)))
            }
            _ => None,
        };
        if gesture != Gesture::Idle {
            presentation.set_busy(false);
        }

        Release {
            disposition: Disposition::from_hit(over_affordance(presentation, point, collapsed)),
            ended,
        }
    }

    pub fn click(&self, point: Point, presentation: &dyn Presentation, collapsed: bool) -> Click {
        Click {
            disposition: Disposition::from_hit(over_affordance(presentation, point, collapsed)),
            toggle: hit(presentation, Affordance::Toggle, point),
        }
    }

    /// Abandon a gesture without reporting geometry.
    pub fn cancel(&mut self, presentation: &dyn Presentation) {
        if std::mem::take(&mut self.gesture) != Gesture::Idle {
            presentation.set_busy(false);
        }
    }
}

fn hit(presentation: &dyn Presentation, affordance: Affordance, point: Point) -> bool {
    presentation
        .affordance_rect(affordance)
        .is_some_and(|rect| rect.contains(point))
}

fn over_affordance(presentation: &dyn Presentation, point: Point, collapsed: bool) -> bool {
    hit(presentation, Affordance::Toggle, point)
        || (!collapsed
            && (hit(presentation, Affordance::Drag, point)
                || hit(presentation, Affordance::Resize, point)))
}
