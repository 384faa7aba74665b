//! Shutdown hook manager
//!
//! Hooks run most-recently-registered first. Cancellation and the deadline
//! are only observed between hooks; a running hook is never interrupted.

use crate::{DiError, Result};
use parking_lot::{Mutex, RwLock};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

#[cfg(feature = "logging")]
use tracing::{debug, warn};

/// Default budget for a full shutdown pass
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Cleanup closure run during teardown
pub type HookFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;

// =============================================================================
// Shutdown Context
// =============================================================================

/// Cancellation signal plus optional deadline for one shutdown pass.
///
/// # Examples
///
/// ```rust
/// use armature_kernel::{DiError, ShutdownContext};
///
/// let ctx = ShutdownContext::new();
/// assert!(ctx.err().is_none());
///
/// ctx.cancel();
/// assert!(matches!(ctx.err(), Some(DiError::Cancelled)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShutdownContext {
    token: CancellationToken,
    deadline: Option<(Instant, Duration)>,
}

impl ShutdownContext {
    /// Context that only ends when cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that also ends `timeout` from now.
    ///
    /// A timeout too large to represent as an instant means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now()
                .checked_add(timeout)
                .map(|at| (at, timeout)),
        }
    }

    /// Context driven by an existing token, e.g. a child of an app-wide token
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Token backing this context
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Signal cancellation
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Why the context has ended, if it has
    pub fn err(&self) -> Option<DiError> {
        if self.token.is_cancelled() {
            return Some(DiError::Cancelled);
        }
        match self.deadline {
            Some((at, timeout)) if Instant::now() >= at => {
                Some(DiError::DeadlineExceeded { timeout })
            }
            _ => None,
        }
    }

    /// Whether the context has been cancelled or has expired
    #[inline]
    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }
}

// =============================================================================
// Shutdown Manager
// =============================================================================

struct Hook {
    name: String,
    run: HookFn,
}

struct Inner {
    hooks: Mutex<Vec<Hook>>,
    timeout: RwLock<Duration>,
}

/// Ordered list of teardown hooks with a configurable timeout.
///
/// Cloning is cheap and clones share the same hook list.
#[derive(Clone)]
pub struct ShutdownManager {
    inner: Arc<Inner>,
}

impl ShutdownManager {
    /// Manager with the default 30s timeout
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_SHUTDOWN_TIMEOUT)
    }

    /// Manager with a custom timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                hooks: Mutex::new(Vec::new()),
                timeout: RwLock::new(timeout),
            }),
        }
    }

    /// Timeout applied by the signal-driven shutdown path
    pub fn timeout(&self) -> Duration {
        *self.inner.timeout.read()
    }

    pub fn set_timeout(&self, timeout: Duration) {
        *self.inner.timeout.write() = timeout;
    }

    /// Append an anonymous hook, named `hook-N` in logs.
    pub fn register_hook<F>(&self, hook: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let name = format!("hook-{}", self.hook_count());
        self.register_named_hook(name, hook);
    }

    /// Append a hook with a name used in logs.
    pub fn register_named_hook<F>(&self, name: impl Into<String>, hook: F)
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let name = name.into();

        #[cfg(feature = "logging")]
        debug!(target: "armature_kernel", hook = %name, "Registering shutdown hook");

        self.inner.hooks.lock().push(Hook {
            name,
            run: Arc::new(hook),
        });
    }

    /// Number of registered hooks
    pub fn hook_count(&self) -> usize {
        self.inner.hooks.lock().len()
    }

    /// Remove every hook
    pub fn clear(&self) {
        self.inner.hooks.lock().clear();
    }

    /// Run hooks from last registered to first.
    ///
    /// Before each hook the context is checked; once it has ended the
    /// remaining hooks are skipped and the context error is returned. A hook
    /// that fails or panics is logged and the pass continues.
    pub fn shutdown(&self, ctx: &ShutdownContext) -> Result<()> {
        let snapshot: Vec<(String, HookFn)> = self
            .inner
            .hooks
            .lock()
            .iter()
            .map(|h| (h.name.clone(), Arc::clone(&h.run)))
            .collect();

        #[cfg(feature = "logging")]
        debug!(
            target: "armature_kernel",
            hooks = snapshot.len(),
            "Running shutdown hooks"
        );

        for (name, hook) in snapshot.into_iter().rev() {
            if let Some(err) = ctx.err() {
                #[cfg(feature = "logging")]
                warn!(
                    target: "armature_kernel",
                    next_hook = %name,
                    error = %err,
                    "Shutdown interrupted; remaining hooks skipped"
                );
                return Err(err);
            }

            let outcome = catch_unwind(AssertUnwindSafe(|| hook()));

            #[cfg(feature = "logging")]
            match outcome {
                Ok(Ok(())) => debug!(target: "armature_kernel", hook = %name, "Shutdown hook completed"),
                Ok(Err(err)) => warn!(
                    target: "armature_kernel",
                    hook = %name,
                    error = %err,
                    "Shutdown hook failed"
                ),
                Err(_) => warn!(target: "armature_kernel", hook = %name, "Shutdown hook panicked"),
            }
            #[cfg(not(feature = "logging"))]
            let _ = (name, outcome);
        }

        Ok(())
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownManager")
            .field("hooks", &self.hook_count())
            .field("timeout", &self.timeout())
            .finish()
    }
}
