//! Shared fakes for integration tests: an in-memory document with media
//! elements, a decoded-frame counter and a recording presentation.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use framestep::host::{Observation, ObserverHandle};
use framestep::{
    Affordance, DecodedFrameCounter, DocumentHost, Error, MediaError, MediaHost,
    MemorySettings, Point, Presentation, PresentationError, Rect, Session, Size, SurfaceState,
};
use framestep_core::ManualClock;
use parking_lot::Mutex;

/// Install a test subscriber once. Honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// What an active observer watches, with node handles resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observed {
    Structure,
    Interactions,
    Size(NodeId),
    Scroll(NodeId),
}

#[derive(Debug, Clone)]
pub struct MediaState {
    pub current_time: f64,
    pub duration: Option<f64>,
    pub paused: bool,
    pub rate: f64,
    pub seek_error: Option<MediaError>,
    pub play_error: Option<MediaError>,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            duration: Some(10.0),
            paused: true,
            rate: 1.0,
            seek_error: None,
            play_error: None,
        }
    }
}

#[derive(Debug, Default)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    media: Option<MediaState>,
    rect: Option<Rect>,
}

#[derive(Debug, Default)]
struct DocState {
    nodes: HashMap<NodeId, NodeData>,
    next_node: u32,
    observers: HashMap<u64, Observed>,
    next_observer: u64,
    seeks: Vec<(NodeId, f64)>,
}

/// An in-memory document: `html > body > ...`.
pub struct FakeDocument {
    state: Mutex<DocState>,
}

pub const HTML: NodeId = NodeId(0);
pub const BODY: NodeId = NodeId(1);

impl FakeDocument {
    pub fn new() -> Arc<Self> {
        let doc = Self {
            state: Mutex::new(DocState::default()),
        };
        let html = doc.create_element();
        let body = doc.create_element();
        assert_eq!((html, body), (HTML, BODY));
        doc.append(HTML, BODY);
        Arc::new(doc)
    }

    /// A detached, non-media element.
    pub fn create_element(&self) -> NodeId {
        let mut state = self.state.lock();
        let id = NodeId(state.next_node);
        state.next_node += 1;
        state.nodes.insert(id, NodeData::default());
        id
    }

    /// A detached video element.
    pub fn create_video(&self) -> NodeId {
        let id = self.create_element();
        if let Some(node) = self.state.lock().nodes.get_mut(&id) {
            node.media = Some(MediaState::default());
        }
        id
    }

    /// Create a `div` under `parent`.
    pub fn div(&self, parent: NodeId) -> NodeId {
        let id = self.create_element();
        self.append(parent, id);
        id
    }

    /// Create a video under `parent` with the given bounds.
    pub fn video(&self, parent: NodeId, rect: Rect) -> NodeId {
        let id = self.create_video();
        self.set_rect(id, rect);
        self.append(parent, id);
        id
    }

    pub fn append(&self, parent: NodeId, child: NodeId) {
        self.remove(child);
        let mut state = self.state.lock();
        if let Some(node) = state.nodes.get_mut(&child) {
            node.parent = Some(parent);
        }
        if let Some(node) = state.nodes.get_mut(&parent) {
            node.children.push(child);
        }
    }

    /// Detach `child` from its parent. The subtree below it stays intact.
    pub fn remove(&self, child: NodeId) {
        let mut state = self.state.lock();
        let Some(parent) = state.nodes.get_mut(&child).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(node) = state.nodes.get_mut(&parent) {
            node.children.retain(|&c| c != child);
        }
    }

    pub fn set_rect(&self, node: NodeId, rect: Rect) {
        if let Some(data) = self.state.lock().nodes.get_mut(&node) {
            data.rect = Some(rect);
        }
    }

    pub fn with_media<R>(&self, node: NodeId, f: impl FnOnce(&mut MediaState) -> R) -> R {
        let mut state = self.state.lock();
        let media = state
            .nodes
            .get_mut(&node)
            .and_then(|data| data.media.as_mut())
            .expect("node is not a media element");
        f(media)
    }

    pub fn media(&self, node: NodeId) -> MediaState {
        self.with_media(node, |media| media.clone())
    }

    pub fn seeks(&self) -> Vec<(NodeId, f64)> {
        self.state.lock().seeks.clone()
    }

    pub fn observers(&self) -> Vec<Observed> {
        let mut observed: Vec<Observed> = self.state.lock().observers.values().copied().collect();
        observed.sort_by_key(|o| format!("{o:?}"));
        observed
    }

    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }

    pub fn scroll_observers_on(&self, node: NodeId) -> usize {
        self.state
            .lock()
            .observers
            .values()
            .filter(|o| **o == Observed::Scroll(node))
            .count()
    }

    pub fn size_observers_on(&self, node: NodeId) -> usize {
        self.state
            .lock()
            .observers
            .values()
            .filter(|o| **o == Observed::Size(node))
            .count()
    }

    fn resolve(observation: Observation<'_, NodeId>) -> Observed {
        match observation {
            Observation::Structure => Observed::Structure,
            Observation::Interactions => Observed::Interactions,
            Observation::Size(node) => Observed::Size(*node),
            Observation::Scroll(node) => Observed::Scroll(*node),
        }
    }

    fn collect_media(state: &DocState, node: NodeId, out: &mut Vec<NodeId>) {
        let Some(data) = state.nodes.get(&node) else {
            return;
        };
        if data.media.is_some() {
            out.push(node);
        }
        for &child in &data.children {
            Self::collect_media(state, child, out);
        }
    }
}

impl DocumentHost for FakeDocument {
    type Node = NodeId;

    fn is_media(&self, node: &NodeId) -> bool {
        self.state
            .lock()
            .nodes
            .get(node)
            .is_some_and(|data| data.media.is_some())
    }

    fn is_connected(&self, node: &NodeId) -> bool {
        let state = self.state.lock();
        let mut current = *node;
        loop {
            if current == HTML {
                return true;
            }
            match state.nodes.get(&current).and_then(|data| data.parent) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    fn parent(&self, node: &NodeId) -> Option<NodeId> {
        self.state.lock().nodes.get(node).and_then(|data| data.parent)
    }

    fn is_document_root(&self, node: &NodeId) -> bool {
        *node == BODY || *node == HTML
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.state
            .lock()
            .nodes
            .get(node)
            .map(|data| data.children.clone())
            .unwrap_or_default()
    }

    fn query_media(&self) -> Vec<NodeId> {
        let state = self.state.lock();
        let mut out = Vec::new();
        Self::collect_media(&state, HTML, &mut out);
        out
    }

    fn bounding_rect(&self, node: &NodeId) -> Option<Rect> {
        self.state.lock().nodes.get(node).and_then(|data| data.rect)
    }

    fn observe(&self, observation: Observation<'_, NodeId>) -> ObserverHandle {
        let mut state = self.state.lock();
        let id = state.next_observer;
        state.next_observer += 1;
        state.observers.insert(id, Self::resolve(observation));
        ObserverHandle(id)
    }

    fn disconnect(&self, handle: ObserverHandle) {
        let removed = self.state.lock().observers.remove(&handle.0);
        assert!(removed.is_some(), "observer {handle:?} disconnected twice");
    }
}

impl MediaHost for FakeDocument {
    fn current_time(&self, node: &NodeId) -> f64 {
        self.with_media(*node, |media| media.current_time)
    }

    fn duration(&self, node: &NodeId) -> Option<f64> {
        self.with_media(*node, |media| media.duration)
    }

    fn seek(&self, node: &NodeId, time: f64) -> Result<(), MediaError> {
        self.with_media(*node, |media| {
            if let Some(err) = media.seek_error.clone() {
                return Err(err);
            }
            media.current_time = time;
            Ok(())
        })?;
        self.state.lock().seeks.push((*node, time));
        Ok(())
    }

    fn is_paused(&self, node: &NodeId) -> bool {
        self.with_media(*node, |media| media.paused)
    }

    fn play(&self, node: &NodeId) -> Result<(), MediaError> {
        self.with_media(*node, |media| match media.play_error.clone() {
            Some(err) => Err(err),
            None => {
                media.paused = false;
                Ok(())
            }
        })
    }

    fn pause(&self, node: &NodeId) {
        self.with_media(*node, |media| media.paused = true);
    }

    fn playback_rate(&self, node: &NodeId) -> f64 {
        self.with_media(*node, |media| media.rate)
    }

    fn set_playback_rate(&self, node: &NodeId, rate: f64) {
        self.with_media(*node, |media| media.rate = rate);
    }
}

/// Decoded-frame counter with per-node totals set by the test.
#[derive(Default)]
pub struct FakeFrameCounter {
    frames: Mutex<HashMap<NodeId, u64>>,
}

impl FakeFrameCounter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, node: NodeId, frames: u64) {
        self.frames.lock().insert(node, frames);
    }

    pub fn advance(&self, node: NodeId, by: u64) {
        *self.frames.lock().entry(node).or_insert(0) += by;
    }
}

impl DecodedFrameCounter<NodeId> for FakeFrameCounter {
    fn total_video_frames(&self, node: &NodeId) -> Option<u64> {
        self.frames.lock().get(node).copied()
    }
}

#[derive(Debug, Default)]
struct PresentationState {
    visible: bool,
    shows: Vec<Rect>,
    hides: usize,
    updates: Vec<SurfaceState>,
    collapsed: bool,
    busy: bool,
    panel: Rect,
    affordances: HashMap<Affordance, Rect>,
    fail_show: bool,
}

/// A presentation that records every call.
///
/// The panel sits at (0, 0) 200x60. The toggle is its top-left 10x10 corner,
/// the drag handle the next 10x10 to the right and the resize handle the
/// bottom-right 10x10 corner. Affordances move with the panel.
pub struct FakePresentation {
    state: Mutex<PresentationState>,
}

impl FakePresentation {
    pub fn new() -> Arc<Self> {
        let presentation = Self {
            state: Mutex::new(PresentationState::default()),
        };
        presentation.place(Rect::new(0.0, 0.0, 200.0, 60.0));
        Arc::new(presentation)
    }

    fn place(&self, panel: Rect) {
        let mut state = self.state.lock();
        state.panel = panel;
        state.affordances = HashMap::from([
            (Affordance::Toggle, Rect::new(panel.x, panel.y, 10.0, 10.0)),
            (Affordance::Drag, Rect::new(panel.x + 10.0, panel.y, 10.0, 10.0)),
            (
                Affordance::Resize,
                Rect::new(
                    panel.x + panel.width - 10.0,
                    panel.y + panel.height - 10.0,
                    10.0,
                    10.0,
                ),
            ),
        ]);
    }

    pub fn set_fail_show(&self, fail: bool) {
        self.state.lock().fail_show = fail;
    }

    pub fn shows(&self) -> Vec<Rect> {
        self.state.lock().shows.clone()
    }

    pub fn hides(&self) -> usize {
        self.state.lock().hides
    }

    pub fn updates(&self) -> Vec<SurfaceState> {
        self.state.lock().updates.clone()
    }

    pub fn last_update(&self) -> Option<SurfaceState> {
        self.state.lock().updates.last().copied()
    }

    pub fn collapsed(&self) -> bool {
        self.state.lock().collapsed
    }

    pub fn busy(&self) -> bool {
        self.state.lock().busy
    }

    pub fn panel(&self) -> Rect {
        self.state.lock().panel
    }
}

impl Presentation for FakePresentation {
    fn show(&self, bounds: Rect) -> Result<(), PresentationError> {
        let mut state = self.state.lock();
        if state.fail_show {
            return Err(PresentationError::Show("detached shadow root".into()));
        }
        state.visible = true;
        state.shows.push(bounds);
        Ok(())
    }

    fn hide(&self) {
        let mut state = self.state.lock();
        state.visible = false;
        state.hides += 1;
    }

    fn is_visible(&self) -> bool {
        self.state.lock().visible
    }

    fn update(&self, surface: &SurfaceState) {
        self.state.lock().updates.push(*surface);
    }

    fn affordance_rect(&self, affordance: Affordance) -> Option<Rect> {
        self.state.lock().affordances.get(&affordance).copied()
    }

    fn surface_rect(&self) -> Option<Rect> {
        Some(self.state.lock().panel)
    }

    fn set_busy(&self, busy: bool) {
        self.state.lock().busy = busy;
    }

    fn set_collapsed(&self, collapsed: bool) {
        self.state.lock().collapsed = collapsed;
    }

    fn move_to(&self, origin: Point) {
        let panel = self.panel();
        self.place(Rect::new(origin.x, origin.y, panel.width, panel.height));
    }

    fn resize_to(&self, size: Size) {
        let panel = self.panel();
        self.place(Rect::new(panel.x, panel.y, size.width, size.height));
    }
}

/// Everything a session needs, with handles kept for assertions.
pub struct Fixture {
    pub doc: Arc<FakeDocument>,
    pub presentation: Arc<FakePresentation>,
    pub settings: Arc<MemorySettings>,
    pub clock: Arc<ManualClock>,
    pub counter: Arc<FakeFrameCounter>,
}

impl Fixture {
    pub fn new() -> Self {
        init_tracing();
        Self {
            doc: FakeDocument::new(),
            presentation: FakePresentation::new(),
            settings: Arc::new(MemorySettings::new()),
            clock: Arc::new(ManualClock::new()),
            counter: FakeFrameCounter::new(),
        }
    }

    /// Build a session with every capability present.
    pub fn session(&self) -> Session<FakeDocument> {
        Session::builder(self.doc.clone(), self.presentation.clone())
            .settings(self.settings.clone())
            .clock(self.clock.clone())
            .frame_counter(self.counter.clone())
            .build()
    }

    /// Build a session without decoded-frame sampling.
    pub fn session_without_counter(&self) -> Session<FakeDocument> {
        Session::builder(self.doc.clone(), self.presentation.clone())
            .settings(self.settings.clone())
            .clock(self.clock.clone())
            .build()
    }
}

/// Record every diagnostic the session emits.
pub fn collect_diagnostics(session: &Session<FakeDocument>) -> Arc<Mutex<Vec<Error>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    session.diagnostics().connect(move |err: &Error| sink.lock().push(err.clone()));
    seen
}
