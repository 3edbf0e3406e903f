//! Frame-accurate seeking.

use crate::error::{Error, Result};
use crate::host::MediaHost;

/// Which way to step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

impl Direction {
    /// `-1.0` or `1.0`.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Backward => -1.0,
            Direction::Forward => 1.0,
        }
    }
}

/// The playback position `frames` frames away from `current_time`, clamped to
/// `[0, duration]`.
///
/// An unknown or non-finite duration leaves the upper end open. A
/// non-finite `current_time` (an element with nothing loaded) counts as 0.
pub fn step_target(
    current_time: f64,
    duration: Option<f64>,
    direction: Direction,
    frames: f64,
    frame_rate: f64,
) -> f64 {
    let upper = duration.filter(|d| d.is_finite()).unwrap_or(f64::INFINITY);
    let current_time = if current_time.is_finite() {
        current_time
    } else {
        0.0
    };
    let next = current_time + direction.sign() * frames / frame_rate;
    next.min(upper).max(0.0)
}

/// Steps media elements one or more frames at a time.
#[derive(Debug, Default)]
pub struct Scrubber {
    was_playing: bool,
}

impl Scrubber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a scrub has ever had to pause playback.
    pub fn was_playing(&self) -> bool {
        self.was_playing
    }

    /// Pause `node` if it is playing, then seek by `frames` frames.
    ///
    /// Returns the new playback position.
    pub fn step<H: MediaHost>(
        &mut self,
        host: &H,
        node: &H::Node,
        direction: Direction,
        frames: f64,
        frame_rate: f64,
    ) -> Result<f64> {
        if !host.is_paused(node) {
            host.pause(node);
            self.was_playing = true;
        }

        let current = host.current_time(node);
        let target = step_target(current, host.duration(node), direction, frames, frame_rate);
        host.seek(node, target)
            .map_err(|source| Error::media("seek", source))?;

        tracing::debug!(target: "framestep::actions", ?direction, frames, from = current, to = target, "scrubbed");
        Ok(target)
    }
}
