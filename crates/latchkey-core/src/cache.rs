//! Formatted-message cache.
//!
//! Presentation layers cache the rendered form of a message by id instead of
//! writing it back onto the message. Races are tolerated: the last writer
//! wins, and a reader that finds nothing recomputes.
//!
//! A bounded cache drops the lowest ids first. Message ids grow with arrival,
//! so that is the oldest message.

use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use crate::message::MessageId;

/// Cloneable handle to a shared `MessageId -> V` cache.
#[derive(Debug)]
pub struct FormattedCache<V> {
    entries: Arc<RwLock<BTreeMap<MessageId, V>>>,
    capacity: Option<usize>,
}

impl<V> Clone for FormattedCache<V> {
    fn clone(&self) -> Self {
        Self { entries: Arc::clone(&self.entries), capacity: self.capacity }
    }
}

impl<V> Default for FormattedCache<V> {
    fn default() -> Self {
        Self { entries: Arc::new(RwLock::new(BTreeMap::new())), capacity: None }
    }
}

impl<V: Clone> FormattedCache<V> {
    /// Create an empty, unbounded cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty cache holding at most `capacity` values.
    pub fn bounded(capacity: usize) -> Self {
        Self { capacity: Some(capacity), ..Self::default() }
    }

    /// Maximum number of values held, if bounded.
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Cached value for `id`.
    pub fn get(&self, id: MessageId) -> Option<V> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).get(&id).cloned()
    }

    /// Store `value` for `id`, replacing any previous value.
    ///
    /// On a bounded cache the lowest other ids are evicted until it fits, so
    /// the value just stored is always kept.
    pub fn insert(&self, id: MessageId, value: V) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(id, value);

        let Some(capacity) = self.capacity else {
            return;
        };

        while entries.len() > capacity.max(1) {
            let Some(oldest) = entries.keys().copied().find(|key| *key != id) else {
                break;
            };
            entries.remove(&oldest);
        }
    }

    /// Cached value for `id`, computing and storing it on a miss.
    ///
    /// `compute` runs without the lock held, so two racing readers may both
    /// compute; the later insert wins.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&self, id: MessageId, compute: F) -> V {
        if let Some(value) = self.get(id) {
            return value;
        }

        let value = compute();
        self.insert(id, value.clone());
        value
    }

    /// Drop the cached value for `id`. Returns true if one was present.
    pub fn invalidate(&self, id: MessageId) -> bool {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(&id).is_some()
    }

    /// Drop every cached value.
    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Number of cached values.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
