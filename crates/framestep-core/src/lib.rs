//! Core systems for framestep.
//!
//! This crate provides the small runtime that the `framestep` media controller
//! is built on:
//!
//! - **Signals**: Type-safe observer connections used for change notification
//! - **Timers**: One-shot timers driven cooperatively by the host event loop
//! - **Clocks**: Injectable monotonic time so timing-sensitive code is testable
//! - **Logging**: Tracing target names and helpers shared across the workspace
//!
//! Everything here assumes a single logical thread of control. Types are
//! `Send + Sync` so they can live inside shared handles, but no operation
//! blocks and nothing is dispatched to another thread.
//!
//! # Signal Example
//!
//! ```
//! use framestep_core::Signal;
//!
//! let rate_changed = Signal::<f64>::new();
//!
//! let conn_id = rate_changed.connect(|fps| {
//!     println!("frame rate is now {fps}");
//! });
//!
//! rate_changed.emit(29.97);
//! rate_changed.disconnect(conn_id);
//! ```
//!
//! # Timer Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use framestep_core::{ManualClock, TimerManager};
//!
//! let clock = Arc::new(ManualClock::new());
//! let mut timers = TimerManager::new(clock.clone());
//!
//! let id = timers.start_one_shot(Duration::from_millis(700));
//! assert!(timers.process_expired().is_empty());
//!
//! clock.advance(Duration::from_millis(700));
//! assert_eq!(timers.process_expired(), vec![id]);
//! ```

pub mod clock;
mod error;
pub mod logging;
pub mod signal;
mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, Result, TimerError};
pub use logging::PerfSpan;
pub use signal::{ConnectionId, Signal};
pub use timer::{TimerId, TimerManager};
