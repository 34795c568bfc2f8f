//! Process-wide registry of live contexts and live streams.
//!
//! The registry is an injectable object, constructed at library
//! initialization and shared by reference; it owns no business logic and
//! only answers liveness questions. All operations serialize on one mutex
//! that is held for map access only: callers copy what they need under the
//! lock and invoke application callbacks only after it is released, so no
//! callback ever runs while the registry is locked.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::context::Context;
use crate::engine::EngineStream;
use crate::types::Handle;

struct StreamEntry {
    stream: Weak<dyn EngineStream>,
    owner: Handle,
}

#[derive(Default)]
struct Inner {
    contexts: HashMap<Handle, Arc<Context>>,
    streams: HashMap<Handle, StreamEntry>,
}

/// Concurrent table of live context handles and live stream handles.
///
/// Context entries own their context; resolving yields a clone of the `Arc`,
/// so a context can never be used after a concurrent destroy released it.
/// Stream entries hold only a weak reference (the engine owns the stream)
/// and liveness is re-validated on every resolve.
pub struct Registry {
    inner: Mutex<Inner>,
    next_stream: AtomicUsize,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            next_stream: AtomicUsize::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a context and return its handle (the context's address).
    pub fn add_context(&self, context: Arc<Context>) -> Handle {
        let handle = Handle::from_raw(Arc::as_ptr(&context) as usize);
        self.lock().contexts.insert(handle, context);
        tracing::trace!(%handle, "context registered");
        handle
    }

    /// Whether `handle` refers to a live, registered context.
    #[must_use]
    pub fn is_valid_context(&self, handle: Handle) -> bool {
        self.lock().contexts.contains_key(&handle)
    }

    /// Resolve a context handle to the live context, if still registered.
    #[must_use]
    pub fn resolve_context(&self, handle: Handle) -> Option<Arc<Context>> {
        self.lock().contexts.get(&handle).cloned()
    }

    /// Atomically unregister a context, returning it for release.
    ///
    /// `None` when the handle was absent, so concurrent destroys release the
    /// context exactly once.
    pub fn remove_context(&self, handle: Handle) -> Option<Arc<Context>> {
        let removed = self.lock().contexts.remove(&handle);
        if removed.is_some() {
            tracing::trace!(%handle, "context unregistered");
        }
        removed
    }

    /// Register a stream under a freshly minted handle.
    ///
    /// Handles are allocated from a monotonically increasing counter and are
    /// never reused within a process run. The entry records the owning
    /// context so callback sites can check its liveness.
    pub fn register_stream(&self, owner: Handle, stream: &Arc<dyn EngineStream>) -> Handle {
        let handle = Handle::from_raw(self.next_stream.fetch_add(1, Ordering::Relaxed));
        self.lock().streams.insert(
            handle,
            StreamEntry {
                stream: Arc::downgrade(stream),
                owner,
            },
        );
        tracing::trace!(%handle, %owner, "stream registered");
        handle
    }

    /// Resolve a stream handle to the live stream.
    ///
    /// Liveness is re-checked on every call: an entry whose stream the
    /// engine has already destroyed resolves to `None` even though the map
    /// still carries it.
    #[must_use]
    pub fn resolve_stream(&self, handle: Handle) -> Option<Arc<dyn EngineStream>> {
        self.lock().streams.get(&handle).and_then(|e| e.stream.upgrade())
    }

    /// The context that initiated the stream, while the entry exists.
    #[must_use]
    pub fn stream_owner(&self, handle: Handle) -> Option<Handle> {
        self.lock().streams.get(&handle).map(|e| e.owner)
    }

    /// Erase a stream entry. No-op if absent.
    pub fn unregister_stream(&self, handle: Handle) {
        if self.lock().streams.remove(&handle).is_some() {
            tracing::trace!(%handle, "stream unregistered");
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Registry")
            .field("contexts", &inner.contexts.len())
            .field("streams", &inner.streams.len())
            .finish()
    }
}
