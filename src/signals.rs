//! Change notifications of a mesh.
//!
//! Objects that cache data derived from a mesh subscribe to its [`MeshSignals`] and receive a
//! [`MeshChange`] whenever the topology or geometry of the mesh is modified. A subscription is
//! represented by a [`Connection`], which disconnects the listener when dropped.
use log::trace;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

static NEXT_MESH_ID: AtomicUsize = AtomicUsize::new(0);

/// Identity of a mesh instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshChange {
    /// Cells were refined or coarsened.
    Refinement,
    /// Vertices were moved.
    Transformation,
    /// The mesh was cleared or otherwise rebuilt.
    Clear,
}

type Listener = Arc<dyn Fn(MeshChange) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_listener: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Registry of listeners to changes of one mesh.
pub struct MeshSignals {
    id: MeshId,
    registry: Arc<Mutex<Registry>>,
}

impl Default for MeshSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MeshSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeshSignals")
            .field("id", &self.id)
            .field("n_listeners", &self.n_listeners())
            .finish()
    }
}

impl MeshSignals {
    pub fn new() -> Self {
        Self {
            id: MeshId(NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)),
            registry: Arc::default(),
        }
    }

    pub fn id(&self) -> MeshId {
        self.id
    }

    /// Registers a listener. The listener stays connected until the returned connection is
    /// dropped.
    #[must_use = "Dropping the connection disconnects the listener"]
    pub fn connect<F>(&self, listener: F) -> Connection
    where
        F: Fn(MeshChange) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.next_listener;
        registry.next_listener += 1;
        registry.listeners.push((id, Arc::new(listener)));
        trace!("Connected listener {} to mesh {:?}", id, self.id);
        Connection {
            id,
            mesh: self.id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Invokes all listeners connected at the time of the call.
    ///
    /// The registry is not locked while listeners run, so a listener may connect new listeners
    /// or drop connections to this mesh. Such changes take effect with the next notification.
    pub fn notify(&self, change: MeshChange) {
        let listeners: Vec<Listener> = self
            .registry
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        trace!("Mesh {:?} notifies {} listeners of {:?}", self.id, listeners.len(), change);
        for listener in listeners {
            listener(change);
        }
    }

    pub fn n_listeners(&self) -> usize {
        self.registry.lock().listeners.len()
    }
}

/// A scoped subscription to [`MeshSignals`].
pub struct Connection {
    id: u64,
    mesh: MeshId,
    registry: Weak<Mutex<Registry>>,
}

impl Connection {
    /// The mesh this connection listens to.
    pub fn mesh(&self) -> MeshId {
        self.mesh
    }

    pub fn is_connected(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.lock().listeners.iter().any(|(id, _)| *id == self.id))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("mesh", &self.mesh)
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().listeners.retain(|(id, _)| *id != self.id);
            trace!("Disconnected listener {} from mesh {:?}", self.id, self.mesh);
        }
    }
}
