//! Bounded, time-limited cache of document bodies used during inflation.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use lru::LruCache;

struct Entry {
    body: Arc<[u8]>,
    inserted: Instant,
}

struct State {
    entries: LruCache<i64, Entry>,
    /// Bumped by every invalidation; readers that started before a bump
    /// may hold a stale body and must not cache it.
    generation: u64,
}

/// Document bodies keyed by record id. A zero capacity disables caching.
pub struct InflationCache {
    state: Option<Mutex<State>>,
    ttl: Duration,
}

impl InflationCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            state: NonZeroUsize::new(capacity).map(|c| {
                Mutex::new(State {
                    entries: LruCache::new(c),
                    generation: 0,
                })
            }),
            ttl,
        }
    }

    pub fn disabled() -> Self {
        Self::new(0, Duration::ZERO)
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }

    pub fn get(&self, id: i64) -> Option<Arc<[u8]>> {
        let mut state = self.state.as_ref()?.lock().ok()?;
        let expired = match state.entries.get(&id) {
            Some(entry) if entry.inserted.elapsed() < self.ttl => return Some(entry.body.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            state.entries.pop(&id);
        }
        None
    }

    /// Current invalidation generation. Take it before reading a body from
    /// storage and hand it to [`insert_if_unchanged`](Self::insert_if_unchanged).
    pub fn generation(&self) -> u64 {
        self.state
            .as_ref()
            .and_then(|m| m.lock().ok().map(|s| s.generation))
            .unwrap_or(0)
    }

    pub fn insert(&self, id: i64, body: Arc<[u8]>) {
        if let Some(Ok(mut state)) = self.state.as_ref().map(|m| m.lock()) {
            state.entries.put(id, Entry { body, inserted: Instant::now() });
        }
    }

    /// Insert only if nothing was invalidated since `seen` was taken.
    pub fn insert_if_unchanged(&self, id: i64, body: Arc<[u8]>, seen: u64) -> bool {
        match self.state.as_ref().map(|m| m.lock()) {
            Some(Ok(mut state)) if state.generation == seen => {
                state.entries.put(id, Entry { body, inserted: Instant::now() });
                true
            }
            _ => false,
        }
    }

    pub fn invalidate(&self, id: i64) {
        if let Some(Ok(mut state)) = self.state.as_ref().map(|m| m.lock()) {
            state.entries.pop(&id);
            state.generation += 1;
        }
    }

    pub fn clear(&self) {
        if let Some(Ok(mut state)) = self.state.as_ref().map(|m| m.lock()) {
            state.entries.clear();
            state.generation += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.state
            .as_ref()
            .and_then(|m| m.lock().ok().map(|s| s.entries.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for InflationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InflationCache")
            .field("enabled", &self.is_enabled())
            .field("len", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}
