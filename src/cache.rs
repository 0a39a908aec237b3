//! Compute-once cell with an explicit reset.

use parking_lot::RwLock;
use std::sync::Arc;

/// Lazily computed shared value.
///
/// The first `get_or_init` runs the initializer under the write lock, so
/// concurrent callers never compute twice. `reset` empties the cell and the
/// next call recomputes.
#[derive(Debug)]
pub struct Cached<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Cached<T> {
    /// Create an empty (cold) cell.
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Return the cached value, computing it on first use.
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> Arc<T> {
        if let Some(value) = self.slot.read().as_ref() {
            return Arc::clone(value);
        }

        let mut slot = self.slot.write();
        if let Some(value) = slot.as_ref() {
            return Arc::clone(value);
        }

        let value = Arc::new(init());
        *slot = Some(Arc::clone(&value));
        value
    }

    /// Drop the cached value.
    pub fn reset(&self) {
        self.slot.write().take();
    }

    /// Whether a value is currently cached.
    pub fn is_warm(&self) -> bool {
        self.slot.read().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_computes_once() {
        let cache = Cached::new();
        let calls = Cell::new(0);

        let first = cache.get_or_init(|| {
            calls.set(calls.get() + 1);
            vec![1, 2, 3]
        });
        let second = cache.get_or_init(|| {
            calls.set(calls.get() + 1);
            vec![9]
        });

        assert_eq!(calls.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_reset_recomputes() {
        let cache = Cached::new();
        assert!(!cache.is_warm());

        assert_eq!(*cache.get_or_init(|| 1), 1);
        assert!(cache.is_warm());

        cache.reset();
        assert!(!cache.is_warm());
        assert_eq!(*cache.get_or_init(|| 2), 2);
    }
}
