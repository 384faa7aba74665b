//! Provider lifecycle orchestration
//!
//! The `Application` owns one [`Container`], the ordered provider list, the
//! plugin index and the [`ShutdownManager`]. It drives registration, a single
//! boot pass and LIFO teardown.
//!
//! Registration and boot are fail-fast: a provider that fails part-way keeps
//! whatever bindings it already created, and providers booted earlier in the
//! same pass are not rolled back.

use crate::environment::{DEFAULT_ENV_VAR, Environment, Paths};
use crate::plugin::{PluginInfo, PluginRegistry};
use crate::shutdown::{DEFAULT_SHUTDOWN_TIMEOUT, ShutdownContext, ShutdownManager};
use crate::{Container, DiError, Phase, Plugin, Provider, Result};
use parking_lot::{ReentrantMutex, RwLock};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[cfg(feature = "logging")]
use tracing::{debug, info};

#[derive(Clone)]
struct Registered {
    name: String,
    provider: Arc<dyn Provider>,
}

struct Inner {
    container: Container,
    providers: RwLock<Vec<Registered>>,
    plugins: PluginRegistry,
    shutdown: ShutdownManager,
    /// Serialises register and boot; re-entrant so providers may register
    /// further providers from inside their own phases
    lifecycle: ReentrantMutex<()>,
    booting: AtomicBool,
    booted: AtomicBool,
    environment: Environment,
    paths: Paths,
}

/// Lifecycle orchestrator.
///
/// Dereferences to its [`Container`], so providers bind and resolve through
/// the application directly. Cloning is cheap and clones share all state.
///
/// # Examples
///
/// ```rust
/// use armature_kernel::{Application, Provider, Result};
///
/// struct Greeting;
///
/// impl Provider for Greeting {
///     fn register(&self, app: &Application) -> Result<()> {
///         app.instance("greeting", "hello".to_string());
///         Ok(())
///     }
///
///     fn boot(&self, app: &Application) -> Result<()> {
///         let greeting = app.make::<String>("greeting")?;
///         assert_eq!(greeting.as_str(), "hello");
///         Ok(())
///     }
/// }
///
/// let app = Application::new();
/// app.register(Greeting).unwrap();
/// app.boot().unwrap();
/// assert!(app.is_booted());
/// ```
#[derive(Clone)]
pub struct Application {
    inner: Arc<Inner>,
}

impl Application {
    /// Application with a fresh container, paths rooted at the current
    /// directory and the environment read from `APP_ENV`.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring an application
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a provider.
    ///
    /// Runs `BeforeRegister` (if present), then `register`, queues the
    /// provider's `Shutdown` hook, and appends it to the provider list. If the
    /// application has already booted, the provider is booted (and its
    /// `AfterBoot` run) before this returns.
    ///
    /// A provider whose `as_plugin` returns `Some` is also subject to the
    /// plugin duplicate-name check.
    pub fn register<P: Provider>(&self, provider: P) -> Result<()> {
        let plugin = provider.as_plugin().map(PluginInfo::of);
        let name = plugin
            .as_ref()
            .map(|p| p.name.clone())
            .unwrap_or_else(|| std::any::type_name::<P>().to_string());

        self.register_entry(name, Arc::new(provider), plugin)
    }

    /// Register a plugin, rejecting it before any of its phases run if a
    /// plugin with the same name already exists.
    pub fn register_plugin<P: Plugin>(&self, plugin: P) -> Result<()> {
        let info = PluginInfo::of(&plugin);
        self.register_entry(info.name.clone(), Arc::new(plugin), Some(info))
    }

    fn register_entry(
        &self,
        name: String,
        provider: Arc<dyn Provider>,
        plugin: Option<PluginInfo>,
    ) -> Result<()> {
        let _lifecycle = self.inner.lifecycle.lock();

        let plugin_name = match plugin {
            Some(info) => {
                let plugin_name = info.name.clone();
                self.inner.plugins.reserve(info)?;
                Some(plugin_name)
            }
            None => None,
        };

        if let Err(err) = self.run_register_phases(&name, &provider) {
            if let Some(plugin_name) = plugin_name {
                self.inner.plugins.release(&plugin_name);
            }
            return Err(err);
        }

        if provider.as_shutdown().is_some() {
            self.queue_shutdown_hook(&name, &provider);
        }

        self.inner.providers.write().push(Registered {
            name: name.clone(),
            provider: Arc::clone(&provider),
        });

        #[cfg(feature = "logging")]
        debug!(
            target: "armature_kernel",
            provider = %name,
            booted = self.is_booted(),
            "Provider registered"
        );

        if self.is_booted() {
            #[cfg(feature = "logging")]
            debug!(target: "armature_kernel", provider = %name, "Booting late-registered provider");

            if let Some(plugin_name) = &plugin_name {
                self.inner.plugins.validate_one(plugin_name)?;
            }
            self.boot_provider(&name, provider.as_ref())?;
            self.after_boot_provider(&name, provider.as_ref())?;
        }

        Ok(())
    }

    fn run_register_phases(&self, name: &str, provider: &Arc<dyn Provider>) -> Result<()> {
        if let Some(hook) = provider.as_before_register() {
            hook.before_register(self)
                .map_err(|e| DiError::lifecycle(Phase::BeforeRegister, name, e))?;
        }

        provider
            .register(self)
            .map_err(|e| DiError::lifecycle(Phase::Register, name, e))
    }

    /// Push a hook that calls the provider's `Shutdown` capability.
    ///
    /// The hook holds the application weakly so the hook list does not keep
    /// the application alive.
    fn queue_shutdown_hook(&self, name: &str, provider: &Arc<dyn Provider>) {
        let app = Arc::downgrade(&self.inner);
        let provider = Arc::clone(provider);
        let hook_name = name.to_string();

        self.inner.shutdown.register_named_hook(name, move || {
            let Some(inner) = app.upgrade() else {
                return Ok(());
            };
            let app = Application { inner };
            match provider.as_shutdown() {
                Some(hook) => hook
                    .shutdown(&app)
                    .map_err(|e| DiError::lifecycle(Phase::Shutdown, hook_name.as_str(), e)),
                None => Ok(()),
            }
        });
    }

    /// Append an ad-hoc teardown hook.
    pub fn register_shutdown_hook<F>(&self, hook: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        self.inner.shutdown.register_hook(hook);
    }

    // =========================================================================
    // Boot
    // =========================================================================

    /// Boot every registered provider once.
    ///
    /// Calling again after success is a no-op. The pass boots providers in
    /// registration order (including any registered during the pass),
    /// validates plugin dependencies, runs `AfterBoot` hooks, and only then
    /// marks the application booted. The first failure aborts the pass.
    ///
    /// A call made while the pass is already running (from a provider's own
    /// `boot` or `after_boot`) returns `Ok(())` without doing anything. It
    /// does not mean the application is booted; check [`is_booted`] for that.
    ///
    /// [`is_booted`]: Application::is_booted
    pub fn boot(&self) -> Result<()> {
        let _lifecycle = self.inner.lifecycle.lock();

        if self.is_booted() || self.inner.booting.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let result = self.run_boot_pass();
        self.inner.booting.store(false, Ordering::Release);
        result?;

        self.inner.booted.store(true, Ordering::Release);

        #[cfg(feature = "logging")]
        info!(
            target: "armature_kernel",
            providers = self.provider_count(),
            environment = %self.inner.environment,
            "Application booted"
        );

        Ok(())
    }

    fn run_boot_pass(&self) -> Result<()> {
        let mut booted = 0;
        while let Some(entry) = self.provider_at(booted) {
            self.boot_provider(&entry.name, entry.provider.as_ref())?;
            booted += 1;
        }

        self.inner.plugins.validate()?;

        let mut index = 0;
        while let Some(entry) = self.provider_at(index) {
            // registered by an AfterBoot hook earlier in this loop
            if index >= booted {
                self.boot_provider(&entry.name, entry.provider.as_ref())?;
                booted += 1;
            }
            self.after_boot_provider(&entry.name, entry.provider.as_ref())?;
            index += 1;
        }

        Ok(())
    }

    fn provider_at(&self, index: usize) -> Option<Registered> {
        self.inner.providers.read().get(index).cloned()
    }

    fn boot_provider(&self, name: &str, provider: &dyn Provider) -> Result<()> {
        #[cfg(feature = "logging")]
        debug!(target: "armature_kernel", provider = name, "Booting provider");

        provider
            .boot(self)
            .map_err(|e| DiError::lifecycle(Phase::Boot, name, e))
    }

    fn after_boot_provider(&self, name: &str, provider: &dyn Provider) -> Result<()> {
        match provider.as_after_boot() {
            Some(hook) => hook
                .after_boot(self)
                .map_err(|e| DiError::lifecycle(Phase::AfterBoot, name, e)),
            None => Ok(()),
        }
    }

    /// Whether `boot` has completed successfully
    #[inline]
    pub fn is_booted(&self) -> bool {
        self.inner.booted.load(Ordering::Acquire)
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Run shutdown hooks in reverse registration order.
    ///
    /// Only returns an error if `ctx` is cancelled or expires before every
    /// hook ran; individual hook failures are logged.
    pub fn shutdown(&self, ctx: &ShutdownContext) -> Result<()> {
        #[cfg(feature = "logging")]
        info!(
            target: "armature_kernel",
            hooks = self.inner.shutdown.hook_count(),
            "Shutting down application"
        );

        self.inner.shutdown.shutdown(ctx)
    }

    /// Run shutdown bounded by the configured timeout
    pub fn shutdown_with_timeout(&self) -> Result<()> {
        self.shutdown(&ShutdownContext::with_timeout(self.inner.shutdown.timeout()))
    }

    /// Hook list and timeout backing `shutdown`
    pub fn shutdown_manager(&self) -> &ShutdownManager {
        &self.inner.shutdown
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Container shared by every provider
    pub fn container(&self) -> &Container {
        &self.inner.container
    }

    /// Provider names in registration order
    pub fn providers(&self) -> Vec<String> {
        self.inner
            .providers
            .read()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    /// Number of registered providers
    pub fn provider_count(&self) -> usize {
        self.inner.providers.read().len()
    }

    /// Registered plugins in registration order
    pub fn plugins(&self) -> Vec<PluginInfo> {
        self.inner.plugins.list()
    }

    /// Whether a plugin named `name` is registered
    pub fn has_plugin(&self, name: &str) -> bool {
        self.inner.plugins.contains(name)
    }

    /// Environment the application was built for
    pub fn environment(&self) -> &Environment {
        &self.inner.environment
    }

    /// Whether running in production
    pub fn is_production(&self) -> bool {
        self.inner.environment == Environment::Production
    }

    /// Whether running under tests
    pub fn is_testing(&self) -> bool {
        self.inner.environment == Environment::Testing
    }

    /// Whether the current environment is any of `environments`
    pub fn running_in(&self, environments: &[Environment]) -> bool {
        environments.contains(&self.inner.environment)
    }

    /// Well-known application directories
    pub fn paths(&self) -> &Paths {
        &self.inner.paths
    }

    /// `base/<sub>`
    pub fn base_path(&self, sub: impl AsRef<Path>) -> PathBuf {
        self.inner.paths.base_path(sub)
    }

    /// `base/config/<sub>`
    pub fn config_path(&self, sub: impl AsRef<Path>) -> PathBuf {
        self.inner.paths.config_path(sub)
    }

    /// `base/storage/<sub>`
    pub fn storage_path(&self, sub: impl AsRef<Path>) -> PathBuf {
        self.inner.paths.storage_path(sub)
    }

    // =========================================================================
    // Test support
    // =========================================================================

    /// Reset the container, providers, plugins, hooks and boot state.
    ///
    /// Intended for test isolation.
    pub fn flush(&self) {
        let _lifecycle = self.inner.lifecycle.lock();

        self.inner.container.flush();
        self.inner.providers.write().clear();
        self.inner.plugins.clear();
        self.inner.shutdown.clear();
        self.inner.booted.store(false, Ordering::Release);

        #[cfg(feature = "logging")]
        debug!(target: "armature_kernel", "Application flushed");
    }
}

impl Default for Application {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for Application {
    type Target = Container;

    #[inline]
    fn deref(&self) -> &Container {
        &self.inner.container
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("environment", &self.inner.environment)
            .field("booted", &self.is_booted())
            .field("providers", &self.providers())
            .field("shutdown", &self.inner.shutdown)
            .finish()
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`Application`]
#[derive(Debug, Clone)]
pub struct ApplicationBuilder {
    container: Option<Container>,
    base_path: Option<PathBuf>,
    environment: Option<Environment>,
    env_var: String,
    shutdown_timeout: Duration,
}

impl Default for ApplicationBuilder {
    fn default() -> Self {
        Self {
            container: None,
            base_path: None,
            environment: None,
            env_var: DEFAULT_ENV_VAR.to_string(),
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ApplicationBuilder {
    /// Builder with the default env var and shutdown timeout
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing container instead of a fresh one
    pub fn container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    /// Root for `base_path`, `config_path` and friends
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Fix the environment instead of reading it from the process
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Variable read for the environment (default `APP_ENV`)
    pub fn env_var(mut self, var: impl Into<String>) -> Self {
        self.env_var = var.into();
        self
    }

    /// Budget for the signal-driven shutdown pass (default 30s)
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Create the application, reading the environment variable if no
    /// environment was set
    pub fn build(self) -> Application {
        let environment = self
            .environment
            .unwrap_or_else(|| Environment::from_env_var(&self.env_var));
        let paths = self.base_path.map(Paths::new).unwrap_or_default();

        #[cfg(feature = "logging")]
        debug!(
            target: "armature_kernel",
            environment = %environment,
            base_path = %paths.base().display(),
            "Creating application"
        );

        Application {
            inner: Arc::new(Inner {
                container: self.container.unwrap_or_default(),
                providers: RwLock::new(Vec::new()),
                plugins: PluginRegistry::new(),
                shutdown: ShutdownManager::with_timeout(self.shutdown_timeout),
                lifecycle: ReentrantMutex::new(()),
                booting: AtomicBool::new(false),
                booted: AtomicBool::new(false),
                environment,
                paths,
            }),
        }
    }
}
