//! Scoped connections.
//!
//! Adapters check out a connection handle at the start of every operation and hold it in a
//! [`ScopedConnection`]. The guard is released when it goes out of scope, so the handle is
//! returned on success, on early `?` returns and during unwinding alike.

use std::{
    fmt,
    ops::Deref,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Counts the connection handles an adapter currently has checked out.
///
/// A tracker is shared by every clone of an adapter and by adapters rebound to other
/// collections of the same client.
#[derive(Debug, Default)]
pub struct ConnectionTracker {
    open: AtomicUsize,
}

impl ConnectionTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wraps `handle` in a guard and records it as checked out.
    pub fn checkout<C>(self: &Arc<Self>, handle: C) -> ScopedConnection<C> {
        let open = self.open.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(open, "connection checked out");

        ScopedConnection {
            handle,
            tracker: Arc::clone(self),
        }
    }

    /// Number of handles checked out and not yet released.
    pub fn open(&self) -> usize {
        self.open.load(Ordering::Acquire)
    }
}

/// A connection handle held for the duration of one operation.
pub struct ScopedConnection<C> {
    handle: C,
    tracker: Arc<ConnectionTracker>,
}

impl<C> Deref for ScopedConnection<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.handle
    }
}

impl<C> Drop for ScopedConnection<C> {
    fn drop(&mut self) {
        let open = self.tracker.open.fetch_sub(1, Ordering::AcqRel) - 1;
        tracing::trace!(open, "connection released");
    }
}

impl<C> fmt::Debug for ScopedConnection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedConnection")
            .field("open", &self.tracker.open())
            .finish_non_exhaustive()
    }
}
