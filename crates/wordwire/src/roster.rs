//! Cached roster with bounded staleness.
//!
//! Computing an authoritative roster means asking every connected peer for
//! its player state and waiting for the replies, so the server must not do
//! it on every request. One cached `PlayersList` response is kept with its
//! creation time and served as long as it is younger than the freshness
//! window; only an aged-out cache triggers a recompute. This bounds request
//! amplification to O(peers) per window regardless of how often clients ask.
//!
//! The cache is invalidated by age only, never by membership change — a
//! joiner shows up in the roster once the window elapses.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;
use wordwire_protocol::Response;

/// Single mutable slot holding the last computed roster response.
pub struct RosterCache {
    freshness: Duration,
    slot: Mutex<Option<CachedRoster>>,
}

struct CachedRoster {
    response: Response,
    created: Instant,
}

impl RosterCache {
    pub fn new(freshness: Duration) -> Self {
        Self { freshness, slot: Mutex::new(None) }
    }

    /// Serves the cached roster, or runs `recompute` and caches its result
    /// when no cache exists or it has aged past the freshness window.
    ///
    /// The slot stays locked for the duration of the recompute, so
    /// concurrent lookups never trigger two sweeps for one window.
    pub fn get_or_recompute(
        &self,
        recompute: impl FnOnce() -> Response,
    ) -> Response {
        let mut slot = self.slot.lock();
        if let Some(cached) = slot.as_ref() {
            if cached.created.elapsed() < self.freshness {
                return cached.response.clone();
            }
            debug!(age = ?cached.created.elapsed(), "roster cache aged out");
        }

        let response = recompute();
        *slot = Some(CachedRoster {
            response: response.clone(),
            created: Instant::now(),
        });
        response
    }
}

// =========================================================================
// Tests
// =========================================================================
