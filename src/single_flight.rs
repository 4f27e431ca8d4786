//! Per-path request coalescing so concurrent callers never trigger
//! concurrent origin fetches for the same path.
//!
//! Grounded on the leader/follower `DashMap<String, Entry>` + `Arc<Notify>`
//! pattern used for idempotency-key deduplication elsewhere in this
//! codebase: the first caller for a key becomes the leader and does the
//! work, everyone else waits on a shared [`tokio::sync::Notify`] and is
//! woken on completion. Unlike that pattern, tickets here carry no cached
//! result — completion only means "check the cache again", since the
//! engine's caches are the source of truth for the fetched bytes.

use std::sync::Arc;

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use tokio::sync::Notify;

#[derive(Clone, Default)]
pub struct SingleFlightRegistry {
    inflight: Arc<DashMap<String, Arc<Notify>>>,
}

/// Result of [`SingleFlightRegistry::acquire`].
pub enum Acquired {
    /// No ticket existed for this path; the caller must perform the origin
    /// work and drop the handle when done (success or failure).
    Leader(ReleaseHandle),
    /// A ticket already existed; await [`Waiter::wait`] then re-check the cache.
    Waiter(Waiter),
}

/// Held by the leader for the duration of its origin fetch. Releasing the
/// ticket (on drop, unconditionally) removes it from the registry and wakes
/// every follower waiting on it.
pub struct ReleaseHandle {
    path: String,
    notify: Arc<Notify>,
    inflight: Arc<DashMap<String, Arc<Notify>>>,
}

impl Drop for ReleaseHandle {
    fn drop(&mut self) {
        self.inflight.remove(&self.path);
        self.notify.notify_waiters();
    }
}

/// Held by a follower. Resolves once the leader's ticket is released.
pub struct Waiter {
    notify: Arc<Notify>,
}

impl Waiter {
    pub async fn wait(self) {
        self.notify.notified().await;
    }
}

impl SingleFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically checks for and, if absent, inserts a ticket for `path`.
    /// `DashMap::entry` holds the shard lock across the check-and-insert, so
    /// there is no window where two callers both observe themselves as
    /// leader for the same path.
    pub fn acquire(&self, path: &str) -> Acquired {
        match self.inflight.entry(path.to_string()) {
            MapEntry::Occupied(entry) => Acquired::Waiter(Waiter {
                notify: entry.get().clone(),
            }),
            MapEntry::Vacant(entry) => {
                let notify = Arc::new(Notify::new());
                entry.insert(notify.clone());
                Acquired::Leader(ReleaseHandle {
                    path: path.to_string(),
                    notify,
                    inflight: self.inflight.clone(),
                })
            }
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inflight.len()
    }
}
