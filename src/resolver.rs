//! Resolver types for creating bound values
//!
//! A resolver is either a plain zero-argument closure or a container-aware
//! closure that can look up sibling bindings. Both are stored type-erased so
//! the registry can hold heterogeneous values under string keys.

use crate::{Container, DiError, Result};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

/// Type-erased value produced by a resolver or registered as an instance
pub type Service = Arc<dyn Any + Send + Sync>;

/// Marker trait for types that can be stored in the container.
///
/// Implemented for every `Send + Sync + 'static` type.
pub trait Injectable: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Injectable for T {}

type PlainFn = Arc<dyn Fn() -> Service + Send + Sync>;
type ContainerFn = Arc<dyn Fn(&Container) -> Result<Service> + Send + Sync>;

/// Factory closure registered through `bind`/`singleton` and their `_with` variants
#[derive(Clone)]
pub enum Resolver {
    /// Zero-argument factory
    Plain(PlainFn),
    /// Factory that receives the container itself
    WithContainer(ContainerFn),
}

impl Resolver {
    /// Wrap a zero-argument factory
    #[inline]
    pub fn plain<T: Injectable, F>(factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Resolver::Plain(Arc::new(move || Arc::new(factory()) as Service))
    }

    /// Wrap a container-aware, fallible factory
    #[inline]
    pub fn with_container<T: Injectable, F>(factory: F) -> Self
    where
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        Resolver::WithContainer(Arc::new(move |c: &Container| {
            factory(c).map(|value| Arc::new(value) as Service)
        }))
    }

    /// Whether the factory declares the container parameter
    #[inline]
    pub fn takes_container(&self) -> bool {
        matches!(self, Resolver::WithContainer(_))
    }

    /// Run the factory, converting a panic into an ordinary error
    fn invoke(&self, key: &str, container: &Container) -> Result<Service> {
        let outcome = match self {
            Resolver::Plain(f) => catch_unwind(AssertUnwindSafe(|| Ok(f()))),
            Resolver::WithContainer(f) => catch_unwind(AssertUnwindSafe(|| f(container))),
        };

        match outcome {
            Ok(Ok(service)) => Ok(service),
            Ok(Err(source)) => Err(DiError::Resolution {
                key: key.to_string(),
                source: Box::new(source),
            }),
            Err(payload) => {
                let message = panic_message(payload.as_ref());

                #[cfg(feature = "logging")]
                warn!(
                    target: "armature_kernel",
                    key = key,
                    panic = %message,
                    "Resolver panicked; panic contained and returned as error"
                );

                Err(DiError::ResolverPanicked {
                    key: key.to_string(),
                    message,
                })
            }
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolver::Plain(_) => f.write_str("Resolver::Plain"),
            Resolver::WithContainer(_) => f.write_str("Resolver::WithContainer"),
        }
    }
}

/// Extract a readable message from a panic payload
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// =============================================================================
// Resolution stack
// =============================================================================

thread_local! {
    /// Keys currently being constructed on this thread, innermost last
    static RESOLVING: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

/// Pops the key pushed by `ResolutionGuard::enter` when dropped
struct ResolutionGuard;

impl ResolutionGuard {
    fn enter(key: &str) -> Result<Self> {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.iter().any(|k| k == key) {
                return Err(DiError::circular(key));
            }
            stack.push(key.to_string());
            Ok(ResolutionGuard)
        })
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

// =============================================================================
// Binding
// =============================================================================

/// A registered resolver plus its sharing policy.
///
/// Shared bindings memoise through their own cell, so concurrent first
/// resolutions of the same binding construct at most once while unrelated
/// keys proceed in parallel.
pub(crate) struct Binding {
    resolver: Resolver,
    shared: bool,
    cell: OnceCell<Service>,
}

impl Binding {
    #[inline]
    pub fn new(resolver: Resolver, shared: bool) -> Self {
        Self {
            resolver,
            shared,
            cell: OnceCell::new(),
        }
    }

    #[inline]
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Produce a value for `key`.
    ///
    /// Shared bindings return the memoised value once it exists.
    pub fn resolve(&self, key: &str, container: &Container) -> Result<Service> {
        if let Some(service) = self.cell.get() {
            #[cfg(feature = "logging")]
            trace!(
                target: "armature_kernel",
                key = key,
                "Shared binding already constructed"
            );
            return Ok(Arc::clone(service));
        }

        let _guard = ResolutionGuard::enter(key)?;

        if !self.shared {
            #[cfg(feature = "logging")]
            trace!(
                target: "armature_kernel",
                key = key,
                "Creating new transient value"
            );
            return self.resolver.invoke(key, container);
        }

        self.cell
            .get_or_try_init(|| {
                #[cfg(feature = "logging")]
                debug!(
                    target: "armature_kernel",
                    key = key,
                    "Shared binding constructing on first access"
                );
                self.resolver.invoke(key, container)
            })
            .map(Arc::clone)
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("resolver", &self.resolver)
            .field("shared", &self.shared)
            .field("constructed", &self.cell.get().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Counter(u32);

    #[test]
    fn test_shared_binding_constructs_once() {
        let created = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&created);
        let binding = Binding::new(
            Resolver::plain(move || Counter(c.fetch_add(1, Ordering::SeqCst))),
            true,
        );
        let container = Container::new();

        let a = binding.resolve("counter", &container).unwrap();
        let b = binding.resolve("counter", &container).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transient_binding_constructs_every_time() {
        let created = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&created);
        let binding = Binding::new(
            Resolver::plain(move || Counter(c.fetch_add(1, Ordering::SeqCst))),
            false,
        );
        let container = Container::new();

        let a = binding.resolve("counter", &container).unwrap();
        let b = binding.resolve("counter", &container).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(created.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panic_is_contained() {
        let binding = Binding::new(
            Resolver::plain(|| -> Counter { panic!("connection refused") }),
            true,
        );
        let container = Container::new();

        let err = binding.resolve("db", &container).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("db"));
        assert!(msg.contains("connection refused"));

        // Failed construction leaves the cell empty
        assert!(binding.cell.get().is_none());
    }

    #[test]
    fn test_resolution_stack_unwinds_after_error() {
        let binding = Binding::new(Resolver::plain(|| -> Counter { panic!("boom") }), false);
        let container = Container::new();

        let _ = binding.resolve("k", &container);
        RESOLVING.with(|stack| assert!(stack.borrow().is_empty()));
    }

    #[test]
    fn test_takes_container() {
        assert!(!Resolver::plain(|| 1u8).takes_container());
        assert!(Resolver::with_container(|_c: &Container| Ok(1u8)).takes_container());
    }
}
