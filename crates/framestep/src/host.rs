//! Capability traits implemented by the embedding host.
//!
//! framestep never touches a real document. The host (a browser binding, a
//! test double, a native player shell) implements these traits and feeds
//! events into a [`Session`](crate::Session):
//!
//! - [`DocumentHost`] - tree queries and observer subscriptions
//! - [`MediaHost`] - playback control on media elements
//! - [`DecodedFrameCounter`] - optional playback-quality sampling, supplied
//!   once at session construction

use std::fmt;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

use crate::error::MediaError;

/// Opaque handle to a node in the host document.
///
/// Handles compare equal when they refer to the same node. They are cheap to
/// clone and carry no ownership.
pub trait NodeHandle: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> NodeHandle for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// A point in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A width/height pair.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    /// Create a new size.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Create a new rectangle.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Top-left corner.
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Bottom-right corner.
    pub fn bottom_right(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height)
    }

    /// Whether `point` lies inside the rectangle (edges inclusive).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }
}

/// Identifier of an observer subscription issued by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(pub u64);

/// What an observer subscription watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation<'a, N> {
    /// Child-list mutations anywhere in the document (one per registry).
    Structure,
    /// Delegated pointer-down and click listeners on the document body.
    Interactions,
    /// Size changes of a media element.
    Size(&'a N),
    /// Scroll events on an ancestor of one or more media elements.
    Scroll(&'a N),
}

/// Tree queries and observer management for the host document.
pub trait DocumentHost: Send + Sync {
    /// The host's node handle type.
    type Node: NodeHandle;

    /// Whether the node is a media element the registry should manage.
    fn is_media(&self, node: &Self::Node) -> bool;

    /// Whether the node is currently part of the live document.
    fn is_connected(&self, node: &Self::Node) -> bool;

    /// The node's parent, if it has one.
    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    /// Whether the node is the document root at which ancestor walks stop.
    fn is_document_root(&self, node: &Self::Node) -> bool;

    /// Element children in document order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// Every media element currently in the document, in document order.
    fn query_media(&self) -> Vec<Self::Node>;

    /// The node's bounding box in viewport coordinates, if it has layout.
    fn bounding_rect(&self, node: &Self::Node) -> Option<Rect>;

    /// Start an observation and return its handle.
    fn observe(&self, observation: Observation<'_, Self::Node>) -> ObserverHandle;

    /// Stop an observation previously started with [`observe`](Self::observe).
    fn disconnect(&self, handle: ObserverHandle);

    /// The nearest inclusive ancestor of `node` that is a media element.
    ///
    /// Used for delegated interaction handling.
    fn closest_media(&self, node: &Self::Node) -> Option<Self::Node> {
        let mut current = Some(node.clone());
        while let Some(candidate) = current {
            if self.is_media(&candidate) {
                return Some(candidate);
            }
            current = self.parent(&candidate);
        }
        None
    }
}

/// Playback control for media elements.
pub trait MediaHost: DocumentHost {
    /// Current playback position in seconds.
    fn current_time(&self, node: &Self::Node) -> f64;

    /// Media duration in seconds, or `None` while unknown.
    fn duration(&self, node: &Self::Node) -> Option<f64>;

    /// Move the playback position.
    fn seek(&self, node: &Self::Node, time: f64) -> Result<(), MediaError>;

    /// Whether playback is paused.
    fn is_paused(&self, node: &Self::Node) -> bool;

    /// Start playback.
    fn play(&self, node: &Self::Node) -> Result<(), MediaError>;

    /// Pause playback.
    fn pause(&self, node: &Self::Node);

    /// Playback speed multiplier.
    fn playback_rate(&self, node: &Self::Node) -> f64;

    /// Set the playback speed multiplier.
    fn set_playback_rate(&self, node: &Self::Node, rate: f64);
}

/// Playback-quality sampling: the total number of decoded video frames.
pub trait DecodedFrameCounter<N>: Send + Sync {
    /// Total frames decoded so far, or `None` if the element cannot report it.
    fn total_video_frames(&self, node: &N) -> Option<u64>;
}
