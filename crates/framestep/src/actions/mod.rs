//! Handlers behind the shortcut actions: frame stepping, manual rate
//! adjustment and rate detection.

mod detect;
mod rate;
mod scrub;

pub use detect::{DEFAULT_SAMPLE_WINDOW, Detection, FrameRateDetector};
pub use rate::{MIN_FRAME_RATE, adjusted_frame_rate};
pub use scrub::{Direction, Scrubber, step_target};
