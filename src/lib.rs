//! # Armature Kernel - Service Container and Provider Lifecycle
//!
//! A string-keyed service container plus an orchestrator that composes
//! service providers into one ordered, fault-tolerant startup and shutdown
//! sequence.
//!
//! ## Features
//!
//! - **String-keyed locator** - `bind`, `singleton` and `instance` under plain keys
//! - **Typed boundary** - `make::<T>(key)` returns `Arc<T>` with a checked downcast
//! - **Concurrent** - at most one construction per shared binding, no global lock held while factories run
//! - **Fault containment** - a panicking factory fails one resolution instead of the process
//! - **Providers** - two-phase `register`/`boot` with optional capability hooks
//! - **Plugins** - named providers with duplicate rejection and dependency checks
//! - **LIFO shutdown** - hooks drained in reverse order under a cancellable deadline
//!
//! ## Quick Start
//!
//! ```rust
//! use armature_kernel::Container;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let container = Container::new();
//! container.singleton("db", || Database { url: "postgres://localhost".into() });
//!
//! let db = container.make::<Database>("db").unwrap();
//! assert_eq!(db.url, "postgres://localhost");
//! ```
//!
//! ## Providers and Plugins
//!
//! ```rust
//! use armature_kernel::{Application, Plugin, Provider, Result};
//!
//! struct Auth;
//!
//! impl Provider for Auth {
//!     fn register(&self, app: &Application) -> Result<()> {
//!         app.singleton("auth.secret", || "s3cr3t".to_string());
//!         Ok(())
//!     }
//!     fn boot(&self, _app: &Application) -> Result<()> { Ok(()) }
//!     fn as_plugin(&self) -> Option<&dyn Plugin> { Some(self) }
//! }
//!
//! impl Plugin for Auth {
//!     fn name(&self) -> &str { "auth" }
//!     fn version(&self) -> &str { "1.0.0" }
//! }
//!
//! let app = Application::new();
//! app.register_plugin(Auth).unwrap();
//! app.boot().unwrap();
//!
//! // A second plugin named "auth" is rejected
//! assert!(app.register_plugin(Auth).is_err());
//! ```
//!
//! ## Shutdown
//!
//! ```rust
//! use armature_kernel::{Application, ShutdownContext};
//! use std::time::Duration;
//!
//! let app = Application::new();
//! app.register_shutdown_hook(|| Ok(()));
//! app.shutdown(&ShutdownContext::with_timeout(Duration::from_secs(5))).unwrap();
//! ```

mod application;
mod container;
mod environment;
mod error;
#[cfg(feature = "logging")]
pub mod logging;
mod plugin;
mod provider;
mod resolver;
mod shutdown;
mod signal;
mod storage;

pub use application::*;
pub use container::*;
pub use environment::*;
pub use error::*;
pub use plugin::PluginInfo;
pub use provider::*;
pub use resolver::{Injectable, Resolver, Service};
pub use shutdown::*;
pub use signal::termination_signal;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

pub use std::sync::Arc;
pub use tokio_util::sync::CancellationToken;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AfterBoot, Application, BeforeRegister, Container, DiError, Environment, Plugin,
        Provider, Result, Shutdown, ShutdownContext,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct Database {
        url: String,
    }

    #[test]
    fn test_singleton_registration() {
        let container = Container::new();
        container.singleton("db", || Database { url: "test".into() });

        let db = container.make::<Database>("db").unwrap();
        assert_eq!(db.url, "test");
    }

    #[test]
    fn test_transient_creates_new_instance() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let container = Container::new();
        container.bind("counter", || COUNTER.fetch_add(1, Ordering::SeqCst));

        let c1 = container.make::<u32>("counter").unwrap();
        let c2 = container.make::<u32>("counter").unwrap();

        assert_ne!(*c1, *c2);
    }

    #[test]
    fn test_not_found_error() {
        let container = Container::new();
        let err = container.make::<Database>("db").unwrap_err();
        assert_eq!(err.to_string(), "binding not found for key: db");
    }

    #[test]
    fn test_application_derefs_to_container() {
        let app = Application::new();
        app.instance("name", "kernel".to_string());

        assert_eq!(app.container().make::<String>("name").unwrap().as_str(), "kernel");
    }
}
