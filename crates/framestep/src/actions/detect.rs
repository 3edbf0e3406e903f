//! Frame-rate auto-detection from decoded-frame sampling.
//!
//! A detection takes two readings of the element's decoded-frame counter a
//! fixed window apart, playing the element in between if it was paused. The
//! window is a one-shot timer on the session's [`TimerManager`]; the sample is
//! completed when that timer fires. Samples are bound to the element that was
//! active when detection started, even if another element becomes active
//! during the window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use framestep_core::{TimerId, TimerManager};

use crate::error::{Error, Result};
use crate::host::{DecodedFrameCounter, MediaHost};

/// Default length of the sampling window.
pub const DEFAULT_SAMPLE_WINDOW: Duration = Duration::from_millis(700);

#[derive(Debug)]
struct Sample<N> {
    node: N,
    start_frames: u64,
    started_at: Duration,
    was_paused: bool,
    previous_rate: f64,
}

/// A completed detection.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection<N> {
    /// The sampled element.
    pub node: N,
    /// The estimated frame rate, or why there is none.
    pub result: Result<f64>,
}

/// Runs frame-rate detections.
pub struct FrameRateDetector<N> {
    counter: Option<Arc<dyn DecodedFrameCounter<N>>>,
    window: Duration,
    pending: HashMap<TimerId, Sample<N>>,
}

impl<N: Clone> FrameRateDetector<N> {
    /// Create a detector. Without a `counter` every detection is reported as
    /// unsupported.
    pub fn new(counter: Option<Arc<dyn DecodedFrameCounter<N>>>, window: Duration) -> Self {
        Self {
            counter,
            window,
            pending: HashMap::new(),
        }
    }

    /// Whether decoded-frame sampling is available.
    pub fn is_supported(&self) -> bool {
        self.counter.is_some()
    }

    /// The sampling window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Number of samples waiting for their window to close.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether `timer` belongs to a pending sample.
    pub fn owns(&self, timer: TimerId) -> bool {
        self.pending.contains_key(&timer)
    }

    /// Take the first reading and start the sampling window.
    pub fn begin<H>(&mut self, host: &H, node: &N, timers: &mut TimerManager) -> Result<TimerId>
    where
        H: MediaHost<Node = N>,
    {
        let counter = self
            .counter
            .as_ref()
            .ok_or(Error::unsupported("playback quality sampling"))?;
        let start_frames = counter
            .total_video_frames(node)
            .ok_or(Error::unsupported("decoded frame count"))?;

        if !self.pending.is_empty() {
            tracing::debug!(target: "framestep::actions", pending = self.pending.len(), "starting overlapping frame-rate detection");
        }

        let was_paused = host.is_paused(node);
        let previous_rate = host.playback_rate(node);
        if was_paused {
            if let Err(err) = host.play(node) {
                tracing::debug!(target: "framestep::actions", %err, "playback for sampling was refused");
            }
        }

        let started_at = timers.clock().now();
        let timer = timers.start_one_shot(self.window);
        self.pending.insert(
            timer,
            Sample {
                node: node.clone(),
                start_frames,
                started_at,
                was_paused,
                previous_rate,
            },
        );
        tracing::debug!(target: "framestep::actions", ?timer, start_frames, "frame-rate sampling started");
        Ok(timer)
    }

    /// Complete the sample whose window closed with `timer`.
    ///
    /// Restores the element's playback rate and paused state before
    /// computing the estimate. Returns `None` if `timer` is not a sample
    /// timer.
    pub fn finish<H>(&mut self, host: &H, timer: TimerId, now: Duration) -> Option<Detection<N>>
    where
        H: MediaHost<Node = N>,
    {
        let sample = self.pending.remove(&timer)?;
        let end_frames = self
            .counter
            .as_ref()
            .and_then(|counter| counter.total_video_frames(&sample.node))
            .unwrap_or(sample.start_frames);
        let elapsed = now.saturating_sub(sample.started_at);

        restore(host, &sample);

        let frames = end_frames as i64 - sample.start_frames as i64;
        let result = if frames > 0 && !elapsed.is_zero() {
            let fps = (frames as f64 / elapsed.as_secs_f64()).round().max(1.0);
            tracing::info!(target: "framestep::actions", frames, ?elapsed, fps, "frame rate detected");
            Ok(fps)
        } else {
            Err(Error::InsufficientSamples { frames, elapsed })
        };

        Some(Detection {
            node: sample.node,
            result,
        })
    }

    /// Drop every pending sample, restoring each element's playback state
    /// and cancelling its timer.
    pub fn abort_all<H>(&mut self, host: &H, timers: &mut TimerManager)
    where
        H: MediaHost<Node = N>,
    {
        for (timer, sample) in self.pending.drain() {
            // The timer may already have fired without being processed.
            let _ = timers.cancel(timer);
            restore(host, &sample);
        }
    }
}

fn restore<H: MediaHost>(host: &H, sample: &Sample<H::Node>) {
    host.set_playback_rate(&sample.node, sample.previous_rate);
    if sample.was_paused {
        host.pause(&sample.node);
    }
}
