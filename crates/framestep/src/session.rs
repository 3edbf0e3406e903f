//! The session context.
//!
//! A [`Session`] owns every piece of mutable state: the media registry, the
//! modifier tracker, the preferences, pending detection samples and the
//! surface gesture. The host forwards raw events to its entry points
//! (`key_down`, `wheel`, `pointer_down`, `mutations`, `process_timers`, ...)
//! from a single thread of control. No entry point returns an error; failures
//! are logged and emitted on [`Session::diagnostics`].
//!
//! # Settings changes
//!
//! Change notifications from the settings store are queued and applied at
//! the start and end of every entry point. Each applied key is re-emitted on
//! [`Session::settings_changed`].

use std::sync::Arc;
use std::time::Duration;

use framestep_core::{Clock, ConnectionId, PerfSpan, Signal, SystemClock, TimerManager};
use parking_lot::Mutex;

use crate::actions::{
    DEFAULT_SAMPLE_WINDOW, Direction, FrameRateDetector, Scrubber, adjusted_frame_rate,
};
use crate::error::{Error, PresentationError, Result};
use crate::host::{DecodedFrameCounter, MediaHost, Point};
use crate::input::{InputTarget, KeyInput, ModifierState};
use crate::presentation::{Presentation, SurfaceState};
use crate::registry::{MediaEvent, MediaRegistry, MutationRecord};
use crate::settings::{DEFAULT_FRAME_RATE, MemorySettings, Preferences, SettingsStore, keys};
use crate::shortcut::{Action, MatchContext, ShortcutEngine};
use crate::surface::{Disposition, GestureEnd, SurfaceGestures};

/// Tunables for a [`Session`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// How long frame-rate detection samples playback.
    pub sample_window: Duration,
    /// Frames per step (and rate delta) when shift is held.
    pub fast_multiplier: u32,
    /// Frame rate assumed when none is persisted.
    pub default_frame_rate: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_window: DEFAULT_SAMPLE_WINDOW,
            fast_multiplier: 10,
            default_frame_rate: DEFAULT_FRAME_RATE,
        }
    }
}

/// Builder for a [`Session`].
pub struct SessionBuilder<H: MediaHost> {
    host: Arc<H>,
    presentation: Arc<dyn Presentation>,
    settings: Option<Arc<dyn SettingsStore>>,
    clock: Option<Arc<dyn Clock>>,
    frame_counter: Option<Arc<dyn DecodedFrameCounter<H::Node>>>,
    engine: Option<ShortcutEngine>,
    config: SessionConfig,
}

impl<H: MediaHost> SessionBuilder<H> {
    /// Start building a session over `host`, rendering through
    /// `presentation`.
    pub fn new(host: Arc<H>, presentation: Arc<dyn Presentation>) -> Self {
        Self {
            host,
            presentation,
            settings: None,
            clock: None,
            frame_counter: None,
            engine: None,
            config: SessionConfig::default(),
        }
    }

    /// Use `store` for persisted settings. Defaults to an empty
    /// [`MemorySettings`].
    pub fn settings(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(store);
        self
    }

    /// Read time from `clock`. Defaults to [`SystemClock`].
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Enable frame-rate detection through `counter`.
    pub fn frame_counter(mut self, counter: Arc<dyn DecodedFrameCounter<H::Node>>) -> Self {
        self.frame_counter = Some(counter);
        self
    }

    /// Route chords through `engine` instead of one with every action
    /// registered.
    pub fn shortcut_engine(mut self, engine: ShortcutEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Replace the configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Load preferences, attach to the document and return the session.
    pub fn build(self) -> Session<H> {
        Session::with_builder(self)
    }
}

/// One attachment of framestep to a document.
pub struct Session<H: MediaHost> {
    host: Arc<H>,
    presentation: Arc<dyn Presentation>,
    settings: Arc<dyn SettingsStore>,
    settings_connection: Option<ConnectionId>,
    pending_settings: Arc<Mutex<Vec<String>>>,
    config: SessionConfig,
    registry: MediaRegistry<H>,
    modifiers: ModifierState,
    engine: ShortcutEngine,
    preferences: Preferences,
    scrubber: Scrubber,
    detector: FrameRateDetector<H::Node>,
    timers: TimerManager,
    gestures: SurfaceGestures,
    cursor: Option<Point>,
    settings_changed: Signal<String>,
    diagnostics: Signal<Error>,
    destroyed: bool,
}

impl<H: MediaHost> Session<H> {
    /// Start building a session.
    pub fn builder(host: Arc<H>, presentation: Arc<dyn Presentation>) -> SessionBuilder<H> {
        SessionBuilder::new(host, presentation)
    }

    fn with_builder(builder: SessionBuilder<H>) -> Self {
        let SessionBuilder {
            host,
            presentation,
            settings,
            clock,
            frame_counter,
            engine,
            config,
        } = builder;

        let settings =
            settings.unwrap_or_else(|| Arc::new(MemorySettings::new()) as Arc<dyn SettingsStore>);
        let clock = clock.unwrap_or_else(|| Arc::new(SystemClock::new()) as Arc<dyn Clock>);

        let (preferences, migrated) = Preferences::load(settings.as_ref(), config.default_frame_rate);
        let migration = preferences.persist_chords(settings.as_ref(), &migrated);

        let pending_settings = Arc::new(Mutex::new(Vec::new()));
        let queue = pending_settings.clone();
        let settings_connection = settings.changed().connect(move |key: &String| {
            queue.lock().push(key.clone());
        });

        let registry = MediaRegistry::new(host.clone());
        let hide_on_clear = presentation.clone();
        registry.active_changed().connect(move |active: &Option<H::Node>| {
            if active.is_none() {
                hide_on_clear.hide();
            }
        });

        let mut session = Self {
            detector: FrameRateDetector::new(frame_counter, config.sample_window),
            timers: TimerManager::new(clock),
            engine: engine.unwrap_or_else(ShortcutEngine::with_default_actions),
            host,
            presentation,
            settings,
            settings_connection: Some(settings_connection),
            pending_settings,
            config,
            registry,
            modifiers: ModifierState::new(),
            preferences,
            scrubber: Scrubber::new(),
            gestures: SurfaceGestures::new(),
            cursor: None,
            settings_changed: Signal::new(),
            diagnostics: Signal::new(),
            destroyed: false,
        };

        if let Err(err) = migration {
            session.report(err.into());
        }
        session.restore_layout();
        session.registry.attach();
        tracing::debug!(target: "framestep::session", tracked = session.registry.len(), frame_rate = session.preferences.frame_rate(), "session started");

        session
    }

    // -------------------------------------------------------------------------
    // Signals and accessors
    // -------------------------------------------------------------------------

    /// Every failure that an entry point swallowed.
    pub fn diagnostics(&self) -> &Signal<Error> {
        &self.diagnostics
    }

    /// Emitted with each settings key after it has been applied.
    pub fn settings_changed(&self) -> &Signal<String> {
        &self.settings_changed
    }

    /// Emitted when the active element changes; `None` when it is cleared.
    pub fn active_changed(&self) -> &Signal<Option<H::Node>> {
        self.registry.active_changed()
    }

    /// The active element, without any liveness check.
    pub fn active_element(&self) -> Option<H::Node> {
        self.registry.active_node().cloned()
    }

    /// The media registry.
    pub fn registry(&self) -> &MediaRegistry<H> {
        &self.registry
    }

    /// The current modifier/key/wheel state.
    pub fn modifiers(&self) -> &ModifierState {
        &self.modifiers
    }

    /// The typed settings view.
    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// The assumed frame rate.
    pub fn frame_rate(&self) -> f64 {
        self.preferences.frame_rate()
    }

    /// The configuration the session was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the host supplied a decoded-frame counter.
    pub fn can_detect_frame_rate(&self) -> bool {
        self.detector.is_supported()
    }

    /// Whether any scrub so far had to pause playback.
    pub fn scrub_interrupted_playback(&self) -> bool {
        self.scrubber.was_playing()
    }

    /// Number of frame-rate detections in progress.
    pub fn pending_detections(&self) -> usize {
        self.detector.pending_count()
    }

    /// How long until [`process_timers`](Self::process_timers) has work.
    pub fn time_until_next_timer(&mut self) -> Option<Duration> {
        self.timers.time_until_next()
    }

    /// Whether [`destroy`](Self::destroy) has run.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // -------------------------------------------------------------------------
    // Keyboard and wheel
    // -------------------------------------------------------------------------

    /// A key was pressed. Returns [`Disposition::Consumed`] if a shortcut
    /// fired and the host should suppress the event's default action.
    pub fn key_down(&mut self, input: &KeyInput, target: InputTarget) -> Disposition {
        self.entry(|session| {
            if target.excludes_shortcuts() {
                return Disposition::Ignored;
            }
            session.modifiers.press(input);
            session.dispatch(target)
        })
    }

    /// A key was released.
    ///
    /// Releases are applied even inside text-entry contexts, otherwise a key
    /// pressed on the page and released in a text field would stay held.
    pub fn key_up(&mut self, input: &KeyInput, _target: InputTarget) {
        self.entry(|session| session.modifiers.release(input));
    }

    /// A wheel gesture with vertical delta `delta_y`.
    pub fn wheel(&mut self, delta_y: f64, target: InputTarget) -> Disposition {
        self.entry(|session| {
            session.modifiers.wheel(delta_y);
            session.dispatch(target)
        })
    }

    /// The window lost focus; forget held keys and any gesture.
    pub fn focus_lost(&mut self) {
        self.entry(|session| {
            session.modifiers.reset();
            session.gestures.cancel(session.presentation.as_ref());
        });
    }

    // -------------------------------------------------------------------------
    // Pointer
    // -------------------------------------------------------------------------

    /// Pointer pressed on `target` at `point`.
    pub fn pointer_down(&mut self, target: &H::Node, point: Point) -> Disposition {
        self.entry(|session| {
            let collapsed = session.preferences.hidden();
            let disposition =
                session
                    .gestures
                    .pointer_down(point, session.presentation.as_ref(), collapsed);
            if !disposition.is_consumed() {
                session.registry.handle_interaction(target);
            }
            disposition
        })
    }

    /// Pointer released at `point`.
    pub fn pointer_up(&mut self, point: Point) -> Disposition {
        self.entry(|session| {
            let collapsed = session.preferences.hidden();
            let release =
                session
                    .gestures
                    .pointer_up(point, session.presentation.as_ref(), collapsed);
            let persisted = match release.ended {
                Some(GestureEnd::Moved(origin)) => session
                    .preferences
                    .set_position(session.settings.as_ref(), origin),
                Some(GestureEnd::Resized(size)) => {
                    session.preferences.set_size(session.settings.as_ref(), size)
                }
                None => Ok(()),
            };
            if let Err(err) = persisted {
                session.report(err.into());
            }
            release.disposition
        })
    }

    /// Click on `target` at `point`.
    pub fn click(&mut self, target: &H::Node, point: Point) -> Disposition {
        self.entry(|session| {
            let collapsed = session.preferences.hidden();
            let click = session
                .gestures
                .click(point, session.presentation.as_ref(), collapsed);
            if click.toggle {
                session.toggle_collapsed();
            }
            if !click.disposition.is_consumed() {
                session.registry.handle_interaction(target);
            }
            click.disposition
        })
    }

    /// Pointer moved to `point`.
    pub fn pointer_move(&mut self, point: Point) {
        self.entry(|session| {
            session.cursor = Some(point);
            if session
                .gestures
                .pointer_move(point, session.presentation.as_ref())
            {
                return;
            }
            session.update_hover();
            session.refresh_surface();
        });
    }

    /// Pointer entered the document at `point`.
    pub fn pointer_enter(&mut self, point: Point) {
        self.entry(|session| {
            session.cursor = Some(point);
            session.update_hover();
        });
    }

    /// Pointer left the window.
    pub fn pointer_leave(&mut self) {
        self.entry(|session| {
            session.cursor = None;
            session.presentation.hide();
        });
    }

    // -------------------------------------------------------------------------
    // Document
    // -------------------------------------------------------------------------

    /// A batch of child-list mutations.
    pub fn mutations(&mut self, batch: &[MutationRecord<H::Node>]) {
        self.entry(|session| {
            let _span = PerfSpan::new("mutation_batch");
            session.registry.handle_mutations(batch);
        });
    }

    /// A lifecycle event from a media element.
    pub fn media_event(&mut self, node: &H::Node, event: MediaEvent) {
        self.entry(|session| {
            if session.registry.handle_media_event(node, event) && event == MediaEvent::TimeUpdate {
                session.refresh_surface();
            }
        });
    }

    /// A scroll or size observation fired.
    pub fn observed_change(&mut self) {
        self.entry(|session| session.update_hover());
    }

    /// Run every timer that is due. Call when
    /// [`time_until_next_timer`](Self::time_until_next_timer) elapses.
    #[tracing::instrument(skip(self), target = "framestep::session", level = "trace")]
    pub fn process_timers(&mut self) {
        self.entry(|session| {
            for timer in session.timers.process_expired() {
                let now = session.timers.clock().now();
                let Some(detection) = session.detector.finish(session.host.as_ref(), timer, now)
                else {
                    continue;
                };
                match detection.result {
                    Ok(fps) => session.store_frame_rate(fps),
                    Err(err) => session.report(err),
                }
            }
        });
    }

    // -------------------------------------------------------------------------
    // Actions
    // -------------------------------------------------------------------------

    /// Step the active element one frame, or `fast_multiplier` frames when
    /// `fast` is set.
    pub fn scrub(&mut self, direction: Direction, fast: bool) {
        self.entry(|session| {
            if let Err(err) = session.try_scrub(direction, fast) {
                session.report(err);
            }
        });
    }

    /// Nudge the assumed frame rate by `delta`, or by `delta *
    /// fast_multiplier` when `fast` is set.
    pub fn adjust_frame_rate(&mut self, delta: i32, fast: bool) {
        self.entry(|session| {
            if let Err(err) = session.try_adjust_frame_rate(delta, fast) {
                session.report(err);
            }
        });
    }

    /// Start sampling the active element's decoded frames. The estimate is
    /// stored when the sampling window closes in
    /// [`process_timers`](Self::process_timers).
    pub fn detect_frame_rate(&mut self) {
        self.entry(|session| {
            if let Err(err) = session.try_detect_frame_rate() {
                session.report(err);
            }
        });
    }

    /// Collapse or expand the control surface. Needs an active element.
    pub fn toggle_surface(&mut self) {
        self.entry(|session| {
            if session.registry.active().is_some() {
                session.toggle_collapsed();
            }
        });
    }

    /// Tear down every observer, abort pending detections and detach from
    /// the settings store. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;

        self.detector.abort_all(self.host.as_ref(), &mut self.timers);
        self.timers.clear();
        self.registry.destroy();
        if let Some(connection) = self.settings_connection.take() {
            self.settings.changed().disconnect(connection);
        }
        self.pending_settings.lock().clear();
        self.gestures.cancel(self.presentation.as_ref());
        self.modifiers.reset();
        self.presentation.hide();
        tracing::debug!(target: "framestep::session", "session destroyed");
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn entry<R: Default>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        if self.destroyed {
            return R::default();
        }
        self.apply_pending_settings();
        let result = f(self);
        self.apply_pending_settings();
        result
    }

    fn apply_pending_settings(&mut self) {
        let keys = std::mem::take(&mut *self.pending_settings.lock());
        for key in keys {
            if self.preferences.refresh(self.settings.as_ref(), &key) {
                tracing::trace!(target: "framestep::session", key = key.as_str(), "applied settings change");
                if key == keys::HIDDEN {
                    self.presentation.set_collapsed(self.preferences.hidden());
                }
            }
            self.settings_changed.emit(key);
        }
    }

    fn dispatch(&mut self, target: InputTarget) -> Disposition {
        let has_active_target = self.registry.ensure_active().is_some();
        let surface_visible = self.presentation.is_visible();
        let context = MatchContext {
            target,
            has_active_target,
            surface_visible,
        };

        let actions = self
            .engine
            .evaluate(&self.modifiers, self.preferences.chords(), &context);
        if actions.is_empty() {
            return Disposition::Ignored;
        }

        if has_active_target && !surface_visible {
            self.show_over_active();
        }
        for action in actions {
            self.run(action);
        }
        Disposition::Consumed
    }

    fn run(&mut self, action: Action) {
        let fast = self.modifiers.shift;
        let result = match action {
            Action::IncreaseFrameRate => self.try_adjust_frame_rate(1, fast),
            Action::DecreaseFrameRate => self.try_adjust_frame_rate(-1, fast),
            Action::NextFrame => self.try_scrub(Direction::Forward, fast).map(|_| ()),
            Action::PreviousFrame => self.try_scrub(Direction::Backward, fast).map(|_| ()),
            Action::ToggleSurface => {
                if self.registry.active().is_some() {
                    self.toggle_collapsed();
                }
                Ok(())
            }
        };
        if let Err(err) = result {
            self.report(err);
        }
    }

    fn try_scrub(&mut self, direction: Direction, fast: bool) -> Result<f64> {
        let id = self
            .registry
            .ensure_active()
            .ok_or(Error::no_target("scrub"))?;
        let node = self
            .registry
            .node(id)
            .cloned()
            .ok_or(Error::no_target("scrub"))?;

        let frames = if fast {
            f64::from(self.config.fast_multiplier)
        } else {
            1.0
        };
        let position = self.scrubber.step(
            self.host.as_ref(),
            &node,
            direction,
            frames,
            self.preferences.frame_rate(),
        )?;
        self.refresh_surface();
        Ok(position)
    }

    fn try_adjust_frame_rate(&mut self, delta: i32, fast: bool) -> Result<()> {
        if self.registry.active().is_none() {
            return Err(Error::no_target("adjust the frame rate"));
        }
        let multiplier = if fast { self.config.fast_multiplier } else { 1 };
        let fps = adjusted_frame_rate(self.preferences.frame_rate(), delta, multiplier);
        tracing::debug!(target: "framestep::actions", delta, multiplier, fps, "frame rate adjusted");
        self.store_frame_rate(fps);
        Ok(())
    }

    fn try_detect_frame_rate(&mut self) -> Result<()> {
        let id = self
            .registry
            .ensure_active()
            .ok_or(Error::no_target("detect the frame rate"))?;
        let node = self
            .registry
            .node(id)
            .cloned()
            .ok_or(Error::no_target("detect the frame rate"))?;
        self.detector
            .begin(self.host.as_ref(), &node, &mut self.timers)?;
        Ok(())
    }

    fn store_frame_rate(&mut self, fps: f64) {
        let persisted = self
            .preferences
            .set_frame_rate(self.settings.as_ref(), fps);
        self.refresh_surface();
        if let Err(err) = persisted {
            self.report(err.into());
        }
    }

    fn toggle_collapsed(&mut self) {
        let collapsed = !self.preferences.hidden();
        let persisted = self
            .preferences
            .set_hidden(self.settings.as_ref(), collapsed);
        self.presentation.set_collapsed(collapsed);
        if let Err(err) = persisted {
            self.report(err.into());
        }
    }

    fn show_over_active(&mut self) {
        let Some(id) = self.registry.active() else {
            return;
        };
        let shown = match self.registry.bounds(id) {
            Some(bounds) => self.presentation.show(bounds),
            None => Err(PresentationError::BoundsUnavailable),
        };
        if let Err(err) = shown {
            tracing::debug!(target: "framestep::session", %err, "could not show control surface");
        }
    }

    fn update_hover(&mut self) {
        if self.gestures.is_active() {
            return;
        }
        let Some(point) = self.cursor else {
            return;
        };

        match self.registry.element_at(point) {
            Some(id) => {
                let shown = match self.registry.bounds(id) {
                    Some(bounds) => self.presentation.show(bounds),
                    None => Err(PresentationError::BoundsUnavailable),
                };
                if let Err(err) = shown {
                    self.report(err.into());
                }
            }
            None => {
                if self.presentation.is_visible() {
                    self.presentation.hide();
                }
            }
        }
    }

    fn refresh_surface(&mut self) {
        let Some(node) = self.registry.active_node() else {
            return;
        };
        let state = SurfaceState::new(
            self.host.current_time(node),
            self.host.duration(node),
            self.preferences.frame_rate(),
        );
        self.presentation.update(&state);
    }

    fn restore_layout(&mut self) {
        if let Some(origin) = self.preferences.position() {
            self.presentation.move_to(origin);
        }
        if let Some(size) = self.preferences.size() {
            self.presentation.resize_to(size);
        }
        self.presentation.set_collapsed(self.preferences.hidden());
    }

    fn report(&self, err: Error) {
        match &err {
            Error::Media { .. } => {
                tracing::error!(target: "framestep::session", %err, "media request failed")
            }
            _ => tracing::warn!(target: "framestep::session", %err, "action failed"),
        }
        self.diagnostics.emit(err);
    }
}

impl<H: MediaHost> Drop for Session<H> {
    fn drop(&mut self) {
        self.destroy();
    }
}
