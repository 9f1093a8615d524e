//! Generic keyed in-memory collection.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

/// Thread-safe, cloneable keyed collection.
///
/// The lock is `parking_lot` and is never held across `.await`, so every
/// method is synchronous. Each method takes the lock once, which makes the
/// closure-taking methods atomic read-check-write operations.
#[derive(Debug)]
pub struct MemoryStore<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for MemoryStore<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Clone, T: Clone> MemoryStore<K, T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn get(&self, key: &K) -> Option<T> {
        self.data.read().get(key).cloned()
    }

    /// First record matching the predicate.
    pub fn find(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        self.data.read().values().find(|v| pred(v)).cloned()
    }

    /// Insert unless the key exists or `conflicts` matches a stored record.
    /// On refusal, returns the record that blocked the insert.
    pub fn insert_unique(
        &self,
        key: K,
        value: T,
        conflicts: impl Fn(&T) -> bool,
    ) -> Result<(), T> {
        let mut guard = self.data.write();
        if let Some(existing) = guard.get(&key) {
            return Err(existing.clone());
        }
        if let Some(existing) = guard.values().find(|v| conflicts(v)) {
            return Err(existing.clone());
        }
        guard.insert(key, value);
        Ok(())
    }

    /// Update a record in place. Returns the updated record, or `None` if not found.
    pub fn update(&self, key: &K, f: impl FnOnce(&mut T)) -> Option<T> {
        let mut guard = self.data.write();
        let entry = guard.get_mut(key)?;
        f(entry);
        Some(entry.clone())
    }

    /// Atomically read-validate-update a record.
    ///
    /// Returns `None` if the record doesn't exist, or `Some(result)` with
    /// the closure's `Result`.
    pub fn try_update<R, E>(
        &self,
        key: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(key).map(f)
    }

    /// Remove a record if `keep` rejects it.
    ///
    /// `None` if not found, `Some(Err(current))` if the record was kept.
    pub fn remove_unless(&self, key: &K, keep: impl FnOnce(&T) -> bool) -> Option<Result<T, T>> {
        let mut guard = self.data.write();
        let current = guard.get(key)?;
        if keep(current) {
            return Some(Err(current.clone()));
        }
        guard.remove(key).map(Ok)
    }

    /// Apply `f` to every record matching `pred`. Returns the number touched.
    pub fn update_where(&self, pred: impl Fn(&T) -> bool, mut f: impl FnMut(&mut T)) -> usize {
        let mut guard = self.data.write();
        let mut touched = 0;
        for value in guard.values_mut().filter(|v| pred(v)) {
            f(value);
            touched += 1;
        }
        touched
    }

    /// Run `f` against a mutable entry, creating it with `T::default()` first.
    pub fn upsert_with<R>(&self, key: K, f: impl FnOnce(&mut T) -> R) -> R
    where
        T: Default,
    {
        let mut guard = self.data.write();
        f(guard.entry(key).or_default())
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone, T: Clone> Default for MemoryStore<K, T> {
    fn default() -> Self {
        Self::new()
    }
}
