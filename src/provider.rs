//! Provider contract and optional capabilities
//!
//! A provider declares bindings in `register` and performs setup in `boot`.
//! Extra behaviour is opted into by implementing a capability trait and
//! returning `Some(self)` from the matching probe on [`Provider`].

use crate::{Application, Result};

/// Two-phase unit of startup logic.
///
/// # Examples
///
/// ```rust
/// use armature_kernel::{Application, Provider, Result, Shutdown};
///
/// struct CacheProvider;
///
/// impl Provider for CacheProvider {
///     fn register(&self, app: &Application) -> Result<()> {
///         app.singleton("cache", || std::collections::HashMap::<String, String>::new());
///         Ok(())
///     }
///
///     fn boot(&self, _app: &Application) -> Result<()> {
///         Ok(())
///     }
///
///     fn as_shutdown(&self) -> Option<&dyn Shutdown> {
///         Some(self)
///     }
/// }
///
/// impl Shutdown for CacheProvider {
///     fn shutdown(&self, _app: &Application) -> Result<()> {
///         Ok(())
///     }
/// }
///
/// let app = Application::new();
/// app.register(CacheProvider).unwrap();
/// app.boot().unwrap();
/// assert!(app.has("cache"));
/// ```
pub trait Provider: Send + Sync + 'static {
    /// Declare bindings. Runs once, when the provider is registered.
    fn register(&self, app: &Application) -> Result<()>;

    /// Perform setup that may resolve other bindings.
    fn boot(&self, app: &Application) -> Result<()>;

    /// Probe for the [`BeforeRegister`] capability
    fn as_before_register(&self) -> Option<&dyn BeforeRegister> {
        None
    }

    /// Probe for the [`AfterBoot`] capability
    fn as_after_boot(&self) -> Option<&dyn AfterBoot> {
        None
    }

    /// Probe for the [`Shutdown`] capability
    fn as_shutdown(&self) -> Option<&dyn Shutdown> {
        None
    }

    /// Probe for the [`Plugin`] capability
    fn as_plugin(&self) -> Option<&dyn Plugin> {
        None
    }
}

/// Runs before `register`; a failure aborts registration entirely.
pub trait BeforeRegister: Send + Sync {
    fn before_register(&self, app: &Application) -> Result<()>;
}

/// Runs after every provider has booted, or right after a late boot.
pub trait AfterBoot: Send + Sync {
    fn after_boot(&self, app: &Application) -> Result<()>;
}

/// Teardown hook, queued at registration time and run in reverse order.
pub trait Shutdown: Send + Sync {
    fn shutdown(&self, app: &Application) -> Result<()>;
}

/// Provider with an identity and declared plugin dependencies.
pub trait Plugin: Provider {
    /// Unique plugin name
    fn name(&self) -> &str;

    /// Plugin version string
    fn version(&self) -> &str;

    /// Names of plugins that must also be registered before boot
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }
}
