//! Logging facilities for framestep.
//!
//! framestep uses the `tracing` crate for instrumentation. Nothing in the
//! workspace installs a subscriber; the embedding host decides where logs go:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("framestep=debug,framestep_core=info")
//!     .init();
//! ```
//!
//! Every event is emitted with one of the [`targets`] below so that
//! subsystems can be filtered independently.

/// Target names for log filtering.
pub mod targets {
    /// Core runtime target.
    pub const CORE: &str = "framestep_core";
    /// Timer system target.
    pub const TIMER: &str = "framestep_core::timer";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "framestep_core::signal";
    /// Media lifecycle registry target.
    pub const REGISTRY: &str = "framestep::registry";
    /// Modifier/key state tracking target.
    pub const INPUT: &str = "framestep::input";
    /// Chord matching target.
    pub const SHORTCUT: &str = "framestep::shortcut";
    /// Scrub, rate and detection handlers target.
    pub const ACTIONS: &str = "framestep::actions";
    /// Settings and preferences target.
    pub const SETTINGS: &str = "framestep::settings";
    /// Session dispatch target.
    pub const SESSION: &str = "framestep::session";
}

/// A guard that records a performance span while it is alive.
///
/// ```
/// use framestep_core::PerfSpan;
///
/// {
///     let _span = PerfSpan::new("mutation_batch");
///     // work measured here
/// }
/// ```
pub struct PerfSpan {
    _span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span, active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "framestep::perf", "perf", operation = name);
        Self {
            _span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn test_perf_span() {
        init_tracing();
        let span = PerfSpan::new("test_operation");
        tracing::trace!(target: targets::CORE, "inside perf span");
        drop(span);
    }

    #[test]
    fn test_perf_spans_nest() {
        init_tracing();
        let _outer = PerfSpan::new("mutation_batch");
        let _inner = PerfSpan::new("track");
        tracing::debug!(target: targets::TIMER, "nested perf spans entered");
    }

    #[test]
    fn targets_share_prefixes() {
        assert!(targets::TIMER.starts_with(targets::CORE));
        assert!(targets::SIGNAL.starts_with(targets::CORE));
        for target in [
            targets::REGISTRY,
            targets::INPUT,
            targets::SHORTCUT,
            targets::ACTIONS,
            targets::SETTINGS,
            targets::SESSION,
        ] {
            assert!(target.starts_with("framestep::"));
        }
    }
}
