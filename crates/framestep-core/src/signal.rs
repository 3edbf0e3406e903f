//! Signal/slot system for framestep.
//!
//! Signals are emitted when state changes (the active element moved, a setting
//! was written, a diagnostic was reported) and every connected slot is invoked
//! with the emitted value.
//!
//! # Re-entrancy
//!
//! Slots are invoked after the connection table lock has been released, on a
//! snapshot of the connections taken at emit time. A slot may therefore
//! connect, disconnect, or emit on the same signal without deadlocking.
//! Connections added during an emission are not invoked by that emission.
//!
//! # Example
//!
//! ```
//! use framestep_core::Signal;
//!
//! let key_changed = Signal::<String>::new();
//!
//! let conn_id = key_changed.connect(|key| {
//!     println!("setting changed: {key}");
//! });
//!
//! key_changed.emit("framerate".to_string());
//! key_changed.disconnect(conn_id);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle for one connected slot; pass it to [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A typed notification with any number of connected slots.
///
/// Slots receive `&Args`. Use `()` when there is nothing to pass.
pub struct Signal<Args> {
    /// Connected slots, iterated in insertion order.
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    /// Set while emission is suppressed.
    blocked: AtomicBool,
}

impl<Args: 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: 'static> Signal<Args> {
    /// A signal with nothing connected.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Connect `slot`. Keep the returned id to disconnect it later.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connections.lock().insert(Arc::new(slot));
        tracing::trace!(target: "framestep_core::signal", ?id, "slot connected");
        id
    }

    /// Remove one slot. Returns `false` if `id` was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Remove every slot.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Number of connected slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Suppress (or resume) emission. A suppressed `emit` is dropped, not
    /// queued.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    /// Whether emission is suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Emit the signal, invoking all connected slots in connection order.
    #[tracing::instrument(skip_all, target = "framestep_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: "framestep_core::signal", "signal blocked, skipping emit");
            return;
        }

        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        tracing::trace!(target: "framestep_core::signal", connection_count = slots.len(), "emitting signal");

        for slot in slots {
            slot(&args);
        }
    }
}
