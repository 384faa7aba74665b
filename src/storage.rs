//! Binding registry and instance cache
//!
//! Both maps live in one `Registry` so the container can guard them with a
//! single reader/writer lock and clear them atomically.

use crate::resolver::{Binding, Service};
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::Arc;

/// String-keyed bindings plus realised values
pub(crate) struct Registry {
    /// Key to resolver; replacing a key drops the previous binding
    bindings: HashMap<String, Arc<Binding>, RandomState>,
    /// Key to already-constructed value (direct instances and memoised singletons)
    instances: HashMap<String, Service, RandomState>,
}

impl Registry {
    #[inline]
    pub fn new() -> Self {
        Self {
            bindings: HashMap::with_hasher(RandomState::new()),
            instances: HashMap::with_hasher(RandomState::new()),
        }
    }

    /// Insert or replace the binding for `key`
    #[inline]
    pub fn bind(&mut self, key: String, binding: Binding) {
        self.bindings.insert(key, Arc::new(binding));
    }

    /// Store a direct instance. The first value stored under a key is kept.
    ///
    /// Returns `false` if a value already existed.
    #[inline]
    pub fn insert_instance(&mut self, key: String, service: Service) -> bool {
        use std::collections::hash_map::Entry;

        match self.instances.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(service);
                true
            }
        }
    }

    /// Cached value for `key`
    #[inline]
    pub fn instance(&self, key: &str) -> Option<Service> {
        self.instances.get(key).cloned()
    }

    /// Binding registered for `key`
    #[inline]
    pub fn binding(&self, key: &str) -> Option<Arc<Binding>> {
        self.bindings.get(key).cloned()
    }

    /// Publish a value constructed by a shared binding.
    ///
    /// Re-checks the cache first: an instance that appeared while the value
    /// was being built wins. The value is only cached if `binding` is still
    /// the one registered for `key`.
    pub fn publish(&mut self, key: &str, binding: &Arc<Binding>, service: Service) -> Service {
        if let Some(existing) = self.instances.get(key) {
            return Arc::clone(existing);
        }

        let current = self
            .bindings
            .get(key)
            .is_some_and(|b| Arc::ptr_eq(b, binding));

        if current {
            self.instances.insert(key.to_string(), Arc::clone(&service));
        }

        service
    }

    /// Whether an instance or binding exists for `key`
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.instances.contains_key(key) || self.bindings.contains_key(key)
    }

    /// Whether a binding exists for `key`
    #[inline]
    pub fn is_bound(&self, key: &str) -> bool {
        self.bindings.contains_key(key)
    }

    /// Whether a realised value exists for `key`
    #[inline]
    pub fn is_resolved(&self, key: &str) -> bool {
        self.instances.contains_key(key)
    }

    /// All keys known to either map, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .bindings
            .keys()
            .chain(self.instances.keys().filter(|k| !self.bindings.contains_key(*k)))
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    /// Number of distinct keys
    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
            + self
                .instances
                .keys()
                .filter(|k| !self.bindings.contains_key(*k))
                .count()
    }

    /// Drop every binding and instance
    #[inline]
    pub fn clear(&mut self) {
        self.bindings.clear();
        self.instances.clear();
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("bindings", &self.bindings.len())
            .field("instances", &self.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;

    fn service(v: i32) -> Service {
        Arc::new(v)
    }

    #[test]
    fn test_first_instance_is_kept() {
        let mut registry = Registry::new();
        assert!(registry.insert_instance("port".into(), service(80)));
        assert!(!registry.insert_instance("port".into(), service(8080)));

        let v = registry.instance("port").unwrap();
        assert_eq!(*v.downcast::<i32>().unwrap(), 80);
    }

    #[test]
    fn test_publish_skips_replaced_binding() {
        let mut registry = Registry::new();
        registry.bind("k".into(), Binding::new(Resolver::plain(|| 1i32), true));
        let stale = registry.binding("k").unwrap();

        registry.bind("k".into(), Binding::new(Resolver::plain(|| 2i32), true));
        registry.publish("k", &stale, service(1));

        assert!(!registry.is_resolved("k"));
    }

    #[test]
    fn test_publish_prefers_existing_instance() {
        let mut registry = Registry::new();
        registry.bind("k".into(), Binding::new(Resolver::plain(|| 1i32), true));
        let binding = registry.binding("k").unwrap();
        registry.insert_instance("k".into(), service(7));

        let out = registry.publish("k", &binding, service(1));
        assert_eq!(*out.downcast::<i32>().unwrap(), 7);
    }

    #[test]
    fn test_keys_and_clear() {
        let mut registry = Registry::new();
        registry.bind("b".into(), Binding::new(Resolver::plain(|| 1i32), false));
        registry.insert_instance("a".into(), service(1));
        registry.insert_instance("b".into(), service(2));

        assert_eq!(registry.keys(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(registry.len(), 2);

        registry.clear();
        assert_eq!(registry.len(), 0);
        assert!(!registry.contains("a"));
    }
}
