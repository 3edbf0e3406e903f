//! Media lifecycle registry.
//!
//! The registry discovers media elements in a live, mutating document, owns
//! the observation resources attached on their behalf, and elects the single
//! *active* element that input actions operate on.
//!
//! # Resource accounting
//!
//! Each tracked element owns one size observation and a list of the ancestors
//! it registered scroll interest on. Ancestors are shared between elements, so
//! the registry keeps a reference count per ancestor and holds exactly one
//! scroll observation while the count is above zero. [`MediaRegistry::untrack`]
//! releases exactly what [`MediaRegistry::track`] acquired.
//!
//! # Active element
//!
//! The active element is stored as a [`MediaId`] key into the registry's own
//! arena, never as a second owner of the element. The registry clears it the
//! moment the referent is untracked and re-checks liveness against the host on
//! every [`MediaRegistry::ensure_active`] call, because hosts can detach
//! subtrees without delivering a removal notification.

use std::collections::HashMap;
use std::sync::Arc;

use framestep_core::Signal;
use slotmap::{SlotMap, new_key_type};

use crate::host::{DocumentHost, Observation, ObserverHandle, Point, Rect};

new_key_type! {
    /// Stable identifier of a tracked media element.
    ///
    /// Becomes invalid once the element is untracked; lookups with a stale
    /// id return `None`.
    pub struct MediaId;
}

/// One batch entry of child-list mutations reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord<N> {
    /// Subtree roots inserted into the document.
    pub added: Vec<N>,
    /// Subtree roots removed from the document.
    pub removed: Vec<N>,
}

impl<N> MutationRecord<N> {
    /// A record with only additions.
    pub fn added(nodes: Vec<N>) -> Self {
        Self {
            added: nodes,
            removed: Vec::new(),
        }
    }

    /// A record with only removals.
    pub fn removed(nodes: Vec<N>) -> Self {
        Self {
            added: Vec::new(),
            removed: nodes,
        }
    }
}

/// Lifecycle events dispatched by a tracked media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    /// Metadata (dimensions, duration) became available.
    LoadedMetadata,
    /// Playback was requested.
    Play,
    /// Playback started.
    Playing,
    /// The playback position changed.
    TimeUpdate,
    /// The media resource was unloaded.
    Emptied,
}

struct TrackedElement<N> {
    node: N,
    /// Ancestors this element holds a scroll reference on, nearest first.
    scroll_ancestors: Vec<N>,
    size_observer: ObserverHandle,
}

struct AncestorEntry {
    count: usize,
    scroll_observer: ObserverHandle,
}

struct RootObservers {
    structure: ObserverHandle,
    interactions: ObserverHandle,
}

/// Tracks media elements and elects the active one.
pub struct MediaRegistry<H: DocumentHost> {
    host: Arc<H>,
    elements: SlotMap<MediaId, TrackedElement<H::Node>>,
    by_node: HashMap<H::Node, MediaId>,
    /// Tracked ids in discovery order.
    order: Vec<MediaId>,
    ancestors: HashMap<H::Node, AncestorEntry>,
    active: Option<MediaId>,
    root_observers: Option<RootObservers>,
    active_changed: Signal<Option<H::Node>>,
}

impl<H: DocumentHost> MediaRegistry<H> {
    /// Create an empty registry. Call [`attach`](Self::attach) to start
    /// observing the document.
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            elements: SlotMap::with_key(),
            by_node: HashMap::new(),
            order: Vec::new(),
            ancestors: HashMap::new(),
            active: None,
            root_observers: None,
            active_changed: Signal::new(),
        }
    }

    /// Subscribe to structural mutations and delegated interactions, then track
    /// every media element already in the document.
    ///
    /// Calling this on an attached registry only re-runs discovery.
    pub fn attach(&mut self) {
        if self.root_observers.is_none() {
            let structure = self.host.observe(Observation::Structure);
            let interactions = self.host.observe(Observation::Interactions);
            self.root_observers = Some(RootObservers {
                structure,
                interactions,
            });
        }

        for node in self.host.query_media() {
            self.track(&node);
        }
        self.prune_disconnected();
    }

    /// Signal emitted whenever the active element changes. `None` means the
    /// active element was cleared.
    pub fn active_changed(&self) -> &Signal<Option<H::Node>> {
        &self.active_changed
    }

    /// Track every untracked media element in the subtree rooted at `root`.
    pub fn discover(&mut self, root: &H::Node) {
        for node in self.subtree(root) {
            self.track(&node);
        }
    }

    /// Begin observing a media element.
    ///
    /// Returns the element's id, or `None` if `node` is not a media element.
    /// Tracking an already tracked element returns its existing id and has no
    /// other effect. If nothing is active, the element becomes active.
    #[tracing::instrument(skip(self), target = "framestep::registry", level = "trace")]
    pub fn track(&mut self, node: &H::Node) -> Option<MediaId> {
        if !self.host.is_media(node) {
            return None;
        }
        if let Some(&id) = self.by_node.get(node) {
            return Some(id);
        }

        let scroll_ancestors = self.retain_ancestors(node);
        let size_observer = self.host.observe(Observation::Size(node));

        let id = self.elements.insert(TrackedElement {
            node: node.clone(),
            scroll_ancestors,
            size_observer,
        });
        self.by_node.insert(node.clone(), id);
        self.order.push(id);
        tracing::debug!(target: "framestep::registry", ?id, ?node, tracked = self.order.len(), "tracking media element");

        if self.active.is_none() && self.host.is_connected(node) {
            self.activate(id);
        }

        Some(id)
    }

    /// Stop observing a media element, releasing everything `track` acquired.
    ///
    /// Returns `false` if the element was not tracked.
    #[tracing::instrument(skip(self), target = "framestep::registry", level = "trace")]
    pub fn untrack(&mut self, node: &H::Node) -> bool {
        let Some(id) = self.by_node.remove(node) else {
            return false;
        };
        let Some(record) = self.elements.remove(id) else {
            return false;
        };
        self.order.retain(|&other| other != id);

        for ancestor in &record.scroll_ancestors {
            self.release_ancestor(ancestor);
        }
        self.host.disconnect(record.size_observer);
        tracing::debug!(target: "framestep::registry", ?id, ?node, tracked = self.order.len(), "untracked media element");

        if self.active == Some(id) {
            self.active = None;
            tracing::debug!(target: "framestep::registry", "active element cleared");
            self.active_changed.emit(None);
        }

        true
    }

    /// Return a live active element, recovering one if necessary.
    ///
    /// Recovery order: the current active element if still connected, then
    /// any other connected tracked element in discovery order, then a fresh
    /// document-wide scan.
    pub fn ensure_active(&mut self) -> Option<MediaId> {
        if let Some(id) = self.active {
            if self.is_live(id) {
                return Some(id);
            }
            if let Some(node) = self.elements.get(id).map(|e| e.node.clone()) {
                self.untrack(&node);
            }
        }

        let candidate = self.order.iter().copied().find(|&id| self.is_live(id));
        if let Some(id) = candidate {
            self.activate(id);
            return Some(id);
        }

        for node in self.host.query_media() {
            if !self.host.is_connected(&node) {
                continue;
            }
            if let Some(id) = self.track(&node) {
                self.activate(id);
                tracing::debug!(target: "framestep::registry", ?id, "recovered active element from document scan");
                return Some(id);
            }
        }

        None
    }

    /// Promote `node` to active.
    ///
    /// The node is tracked first if needed. Returns `false` (and changes
    /// nothing) if it is not a connected media element.
    pub fn set_active(&mut self, node: &H::Node) -> bool {
        if !self.host.is_media(node) || !self.host.is_connected(node) {
            return false;
        }
        match self.track(node) {
            Some(id) => {
                self.activate(id);
                true
            }
            None => false,
        }
    }

    /// Untrack every element that is no longer connected.
    pub fn prune_disconnected(&mut self) {
        let detached: Vec<H::Node> = self
            .order
            .iter()
            .filter_map(|&id| self.elements.get(id))
            .filter(|element| !self.host.is_connected(&element.node))
            .map(|element| element.node.clone())
            .collect();

        for node in detached {
            tracing::trace!(target: "framestep::registry", ?node, "pruning disconnected element");
            self.untrack(&node);
        }
    }

    /// Apply a batch of child-list mutations.
    ///
    /// All additions in the batch are tracked before any removal is applied.
    /// A removed element that is connected again by the end of the batch was
    /// moved, not deleted: it stays tracked and its scroll ancestors are
    /// re-derived from its new position.
    #[tracing::instrument(skip_all, target = "framestep::registry", level = "trace")]
    pub fn handle_mutations(&mut self, batch: &[MutationRecord<H::Node>]) {
        for record in batch {
            for root in &record.added {
                self.discover(root);
            }
        }

        for record in batch {
            for root in &record.removed {
                for node in self.subtree(root) {
                    let Some(&id) = self.by_node.get(&node) else {
                        continue;
                    };
                    if self.host.is_connected(&node) {
                        self.rebind_ancestors(id);
                    } else {
                        self.untrack(&node);
                    }
                }
            }
        }

        self.prune_disconnected();
    }

    /// Handle a delegated pointer-down or click whose target is `target`.
    ///
    /// If the target is inside a media element, that element becomes active.
    pub fn handle_interaction(&mut self, target: &H::Node) -> Option<MediaId> {
        let media = self.host.closest_media(target)?;
        if self.set_active(&media) {
            self.by_node.get(&media).copied()
        } else {
            None
        }
    }

    /// Apply a lifecycle event from a tracked element.
    ///
    /// Returns `true` if the element is tracked and the event was relevant.
    pub fn handle_media_event(&mut self, node: &H::Node, event: MediaEvent) -> bool {
        if !self.by_node.contains_key(node) {
            return false;
        }
        match event {
            MediaEvent::LoadedMetadata | MediaEvent::Play | MediaEvent::Playing => {
                self.set_active(node);
            }
            MediaEvent::Emptied => {
                self.untrack(node);
            }
            MediaEvent::TimeUpdate => {}
        }
        true
    }

    /// The first tracked element (in discovery order) whose bounds contain
    /// `point`.
    pub fn element_at(&mut self, point: Point) -> Option<MediaId> {
        self.prune_disconnected();
        self.order.iter().copied().find(|&id| {
            self.elements
                .get(id)
                .and_then(|element| self.host.bounding_rect(&element.node))
                .is_some_and(|rect| rect.contains(point))
        })
    }

    /// Current on-screen bounds of a tracked element.
    pub fn bounds(&mut self, id: MediaId) -> Option<Rect> {
        self.prune_disconnected();
        let element = self.elements.get(id)?;
        self.host.bounding_rect(&element.node)
    }

    /// Untrack everything and release the root-level observers.
    ///
    /// Safe to call more than once.
    pub fn destroy(&mut self) {
        if let Some(root) = self.root_observers.take() {
            self.host.disconnect(root.structure);
            self.host.disconnect(root.interactions);
        }

        let nodes: Vec<H::Node> = self
            .order
            .iter()
            .filter_map(|&id| self.elements.get(id))
            .map(|element| element.node.clone())
            .collect();
        for node in nodes {
            self.untrack(&node);
        }
    }

    /// The active element's id, without any liveness check.
    pub fn active(&self) -> Option<MediaId> {
        self.active
    }

    /// The active element's handle, without any liveness check.
    pub fn active_node(&self) -> Option<&H::Node> {
        self.active.and_then(|id| self.node(id))
    }

    /// Handle of a tracked element.
    pub fn node(&self, id: MediaId) -> Option<&H::Node> {
        self.elements.get(id).map(|element| &element.node)
    }

    /// Id of a tracked element.
    pub fn id_of(&self, node: &H::Node) -> Option<MediaId> {
        self.by_node.get(node).copied()
    }

    /// Whether `node` is tracked.
    pub fn is_tracked(&self, node: &H::Node) -> bool {
        self.by_node.contains_key(node)
    }

    /// Tracked ids in discovery order.
    pub fn ids(&self) -> impl Iterator<Item = MediaId> + '_ {
        self.order.iter().copied()
    }

    /// Number of tracked elements.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// How many tracked elements hold a scroll reference on `ancestor`.
    pub fn ancestor_ref_count(&self, ancestor: &H::Node) -> usize {
        self.ancestors.get(ancestor).map_or(0, |entry| entry.count)
    }

    /// Number of ancestors with an attached scroll observation.
    pub fn scroll_observer_count(&self) -> usize {
        self.ancestors.len()
    }

    /// Whether the root-level observers are attached.
    pub fn is_attached(&self) -> bool {
        self.root_observers.is_some()
    }

    fn is_live(&self, id: MediaId) -> bool {
        self.elements
            .get(id)
            .is_some_and(|element| self.host.is_connected(&element.node))
    }

    fn activate(&mut self, id: MediaId) {
        if self.active == Some(id) {
            return;
        }
        let Some(node) = self.elements.get(id).map(|e| e.node.clone()) else {
            return;
        };
        self.active = Some(id);
        tracing::debug!(target: "framestep::registry", ?id, ?node, "active element changed");
        self.active_changed.emit(Some(node));
    }

    /// Walk from the parent of `node` up to, but excluding, the document root,
    /// taking one reference on each ancestor.
    fn retain_ancestors(&mut self, node: &H::Node) -> Vec<H::Node> {
        let mut retained = Vec::new();
        let mut current = self.host.parent(node);

        while let Some(ancestor) = current {
            if self.host.is_document_root(&ancestor) {
                break;
            }

            match self.ancestors.get_mut(&ancestor) {
                Some(entry) => entry.count += 1,
                None => {
                    let scroll_observer = self.host.observe(Observation::Scroll(&ancestor));
                    tracing::trace!(target: "framestep::registry", ?ancestor, "scroll observer attached");
                    self.ancestors.insert(
                        ancestor.clone(),
                        AncestorEntry {
                            count: 1,
                            scroll_observer,
                        },
                    );
                }
            }

            current = self.host.parent(&ancestor);
            retained.push(ancestor);
        }

        retained
    }

    /// Move an element's scroll references to its current ancestor chain.
    /// New references are taken before old ones are dropped, so ancestors
    /// common to both chains keep their observation.
    fn rebind_ancestors(&mut self, id: MediaId) {
        let Some(node) = self.elements.get(id).map(|e| e.node.clone()) else {
            return;
        };
        let retained = self.retain_ancestors(&node);
        let Some(element) = self.elements.get_mut(id) else {
            return;
        };
        let previous = std::mem::replace(&mut element.scroll_ancestors, retained);
        for ancestor in &previous {
            self.release_ancestor(ancestor);
        }
        tracing::trace!(target: "framestep::registry", ?id, "scroll ancestors rebound after move");
    }

    fn release_ancestor(&mut self, ancestor: &H::Node) {
        let Some(entry) = self.ancestors.get_mut(ancestor) else {
            return;
        };
        if entry.count > 1 {
            entry.count -= 1;
            return;
        }
        if let Some(entry) = self.ancestors.remove(ancestor) {
            self.host.disconnect(entry.scroll_observer);
            tracing::trace!(target: "framestep::registry", ?ancestor, "scroll observer detached");
        }
    }

    fn subtree(&self, root: &H::Node) -> Vec<H::Node> {
        let mut nodes = Vec::new();
        let mut stack = vec![root.clone()];
        while let Some(node) = stack.pop() {
            let children = self.host.children(&node);
            stack.extend(children.into_iter().rev());
            nodes.push(node);
        }
        nodes
    }
}

impl<H: DocumentHost> Drop for MediaRegistry<H> {
    fn drop(&mut self) {
        self.destroy();
    }
}
