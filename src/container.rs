//! String-keyed service container
//!
//! The `Container` stores bindings and realised values under string keys and
//! resolves them safely from any number of threads.

use crate::resolver::{Binding, Injectable, Resolver, Service};
use crate::storage::Registry;
use crate::{DiError, Result};
use parking_lot::RwLock;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

/// Concurrency-safe service container.
///
/// Cloning is cheap and every clone shares the same registry.
///
/// # Examples
///
/// ```rust
/// use armature_kernel::Container;
///
/// struct Database { url: String }
///
/// let container = Container::new();
/// container.singleton("db", || Database { url: "postgres://localhost".into() });
///
/// let db = container.make::<Database>("db").unwrap();
/// assert_eq!(db.url, "postgres://localhost");
/// ```
#[derive(Clone, Default)]
pub struct Container {
    registry: Arc<RwLock<Registry>>,
}

impl Container {
    /// Create an empty container.
    #[inline]
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "armature_kernel", "Creating new service container");

        Self {
            registry: Arc::new(RwLock::new(Registry::new())),
        }
    }

    // =========================================================================
    // Registration Methods
    // =========================================================================

    /// Register a non-shared binding; every `make` runs the factory again.
    ///
    /// Replaces any previous binding for `key`. A direct instance registered
    /// under the same key still wins at resolution time.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use armature_kernel::Container;
    /// use std::sync::atomic::{AtomicU64, Ordering};
    ///
    /// static NEXT: AtomicU64 = AtomicU64::new(0);
    ///
    /// let container = Container::new();
    /// container.bind("request_id", || NEXT.fetch_add(1, Ordering::SeqCst));
    ///
    /// let a = container.make::<u64>("request_id").unwrap();
    /// let b = container.make::<u64>("request_id").unwrap();
    /// assert_ne!(*a, *b);
    /// ```
    #[inline]
    pub fn bind<T: Injectable, F>(&self, key: impl Into<String>, factory: F)
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_binding(key.into(), Resolver::plain(factory), false);
    }

    /// Register a non-shared binding whose factory receives the container.
    #[inline]
    pub fn bind_with<T: Injectable, F>(&self, key: impl Into<String>, factory: F)
    where
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.register_binding(key.into(), Resolver::with_container(factory), false);
    }

    /// Register a shared binding; the first successful `make` is memoised.
    #[inline]
    pub fn singleton<T: Injectable, F>(&self, key: impl Into<String>, factory: F)
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.register_binding(key.into(), Resolver::plain(factory), true);
    }

    /// Register a shared binding whose factory receives the container.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use armature_kernel::Container;
    /// use std::sync::Arc;
    ///
    /// struct Config { dsn: String }
    /// struct Pool { dsn: String }
    ///
    /// let container = Container::new();
    /// container.instance("config", Config { dsn: "sqlite::memory:".into() });
    /// container.singleton_with("pool", |c| {
    ///     let config = c.make::<Config>("config")?;
    ///     Ok(Pool { dsn: config.dsn.clone() })
    /// });
    ///
    /// let pool = container.make::<Pool>("pool").unwrap();
    /// assert_eq!(pool.dsn, "sqlite::memory:");
    /// ```
    #[inline]
    pub fn singleton_with<T: Injectable, F>(&self, key: impl Into<String>, factory: F)
    where
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.register_binding(key.into(), Resolver::with_container(factory), true);
    }

    /// Register a prebuilt resolver (advanced use).
    pub fn register_resolver(&self, key: impl Into<String>, resolver: Resolver, shared: bool) {
        self.register_binding(key.into(), resolver, shared);
    }

    fn register_binding(&self, key: String, resolver: Resolver, shared: bool) {
        #[cfg(feature = "logging")]
        debug!(
            target: "armature_kernel",
            key = %key,
            shared = shared,
            takes_container = resolver.takes_container(),
            "Registering binding"
        );

        self.registry.write().bind(key, Binding::new(resolver, shared));
    }

    /// Register an already-built value, bypassing resolution.
    ///
    /// The first value stored under a key is kept for the lifetime of the
    /// container (until `flush`). Returns `false` when a value already existed.
    #[inline]
    pub fn instance<T: Injectable>(&self, key: impl Into<String>, value: T) -> bool {
        self.instance_service(key, Arc::new(value))
    }

    /// Register an already-shared value.
    #[inline]
    pub fn instance_arc<T: Injectable>(&self, key: impl Into<String>, value: Arc<T>) -> bool {
        self.instance_service(key, value)
    }

    /// Register a type-erased value.
    pub fn instance_service(&self, key: impl Into<String>, service: Service) -> bool {
        let key = key.into();
        let stored = self.registry.write().insert_instance(key.clone(), service);

        #[cfg(feature = "logging")]
        debug!(
            target: "armature_kernel",
            key = %key,
            stored = stored,
            "Registering instance"
        );
        #[cfg(not(feature = "logging"))]
        let _ = key;

        stored
    }

    // =========================================================================
    // Resolution Methods
    // =========================================================================

    /// Resolve `key` to its type-erased value.
    ///
    /// Direct instances and memoised singletons are returned from the cache
    /// under a read lock. Otherwise the binding's factory runs without the
    /// registry lock held, so container-aware factories may resolve other
    /// keys. Resolving a key from inside its own factory fails with
    /// [`DiError::CircularDependency`].
    pub fn resolve(&self, key: &str) -> Result<Service> {
        let binding = {
            let registry = self.registry.read();
            if let Some(service) = registry.instance(key) {
                #[cfg(feature = "logging")]
                trace!(
                    target: "armature_kernel",
                    key = key,
                    location = "instances",
                    "Resolved from instance cache"
                );
                return Ok(service);
            }
            registry.binding(key)
        };

        let Some(binding) = binding else {
            #[cfg(feature = "logging")]
            debug!(target: "armature_kernel", key = key, "Binding not found");
            return Err(DiError::not_found(key));
        };

        let service = binding.resolve(key, self)?;

        if !binding.is_shared() {
            return Ok(service);
        }

        Ok(self.registry.write().publish(key, &binding, service))
    }

    /// Resolve `key` and downcast it to `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use armature_kernel::Container;
    ///
    /// let container = Container::new();
    /// let err = container.make::<String>("nonexistent").unwrap_err();
    /// assert_eq!(err.to_string(), "binding not found for key: nonexistent");
    /// ```
    #[inline]
    pub fn make<T: Injectable>(&self, key: &str) -> Result<Arc<T>> {
        self.resolve(key)?
            .downcast::<T>()
            .map_err(|_| DiError::type_mismatch::<T>(key))
    }

    /// Resolve, returning `None` on any error.
    #[inline]
    pub fn try_make<T: Injectable>(&self, key: &str) -> Option<Arc<T>> {
        self.make::<T>(key).ok()
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Whether a binding or instance exists for `key`.
    #[inline]
    pub fn has(&self, key: &str) -> bool {
        self.registry.read().contains(key)
    }

    /// Whether a binding (not just an instance) exists for `key`.
    #[inline]
    pub fn bound(&self, key: &str) -> bool {
        self.registry.read().is_bound(key)
    }

    /// Whether `key` has a realised value in the instance cache.
    #[inline]
    pub fn resolved(&self, key: &str) -> bool {
        self.registry.read().is_resolved(key)
    }

    /// All registered keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.registry.read().keys()
    }

    /// Number of distinct registered keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.read().len()
    }

    /// Whether the container holds nothing.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =========================================================================
    // Lifecycle Methods
    // =========================================================================

    /// Drop every binding and cached value in one step.
    ///
    /// Intended for test isolation.
    pub fn flush(&self) {
        let mut registry = self.registry.write();
        let count = registry.len();
        registry.clear();
        drop(registry);

        #[cfg(feature = "logging")]
        debug!(
            target: "armature_kernel",
            keys_removed = count,
            "Container flushed"
        );
        #[cfg(not(feature = "logging"))]
        let _ = count;
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("registry", &*self.registry.read())
            .finish()
    }
}
