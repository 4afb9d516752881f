//! Registry for transient result buffers.
//!
//! Every buffer handed out for preview or download is owned by a registry
//! entry and must be explicitly released when no longer displayed or needed.
//! Dropping the registry releases whatever is left so no exit path can leak.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Opaque reference to a registered buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(Uuid);

#[derive(Debug, Default)]
pub struct HandleRegistry {
    entries: Mutex<HashMap<Uuid, Arc<Vec<u8>>>>,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a buffer and hand back a handle for it.
    pub fn register(&self, bytes: Vec<u8>) -> Handle {
        let id = Uuid::new_v4();
        self.lock().insert(id, Arc::new(bytes));
        Handle(id)
    }

    /// Access a registered buffer. Returns `None` once released.
    pub fn get(&self, handle: Handle) -> Option<Arc<Vec<u8>>> {
        self.lock().get(&handle.0).cloned()
    }

    /// Release one handle. Returns whether it was still registered.
    pub fn release(&self, handle: Handle) -> bool {
        self.lock().remove(&handle.0).is_some()
    }

    /// Release every registered handle, returning how many were held.
    pub fn release_all(&self) -> usize {
        let mut entries = self.lock();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Arc<Vec<u8>>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for HandleRegistry {
    fn drop(&mut self) {
        let leaked = self.release_all();
        if leaked > 0 {
            log::warn!("Handle registry dropped with {} unreleased handles", leaked);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_get_release() {
        let registry = HandleRegistry::new();
        let handle = registry.register(vec![1, 2, 3]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(handle).unwrap().as_ref(), &vec![1, 2, 3]);

        assert!(registry.release(handle));
        assert!(registry.get(handle).is_none());
        // Double release is a no-op
        assert!(!registry.release(handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_release_all() {
        let registry = HandleRegistry::new();
        registry.register(vec![1]);
        registry.register(vec![2]);
        registry.register(vec![3]);
        assert_eq!(registry.release_all(), 3);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_buffers_survive_while_borrowed() {
        let registry = HandleRegistry::new();
        let handle = registry.register(vec![9; 16]);
        let borrowed = registry.get(handle).unwrap();
        registry.release(handle);
        // The Arc keeps the bytes alive for existing readers
        assert_eq!(borrowed.len(), 16);
    }
}
