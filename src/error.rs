//! Error types for the container and the provider lifecycle

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Lifecycle phase in which a provider failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// `BeforeRegister` capability hook
    BeforeRegister,
    /// Provider `register` phase
    Register,
    /// Provider `boot` phase
    Boot,
    /// `AfterBoot` capability hook
    AfterBoot,
    /// `Shutdown` capability hook
    Shutdown,
}

impl Phase {
    /// Stable lowercase name, also used as a log field
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::BeforeRegister => "before_register",
            Phase::Register => "register",
            Phase::Boot => "boot",
            Phase::AfterBoot => "after_boot",
            Phase::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during resolution and lifecycle operations
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// No binding or instance exists for the key
    #[error("binding not found for key: {key}")]
    NotFound { key: String },

    /// The resolver panicked; the panic was contained
    #[error("resolver for key '{key}' panicked: {message}")]
    ResolverPanicked { key: String, message: String },

    /// A container-aware resolver returned an error
    #[error("failed to resolve '{key}': {source}")]
    Resolution {
        key: String,
        #[source]
        source: Box<DiError>,
    },

    /// The value stored under the key is not of the requested type
    #[error("value for key '{key}' is not of type {expected}")]
    TypeMismatch { key: String, expected: &'static str },

    /// The key is already being resolved further up the current thread's stack
    #[error("circular dependency detected while resolving: {key}")]
    CircularDependency { key: String },

    /// A provider failed during one of its lifecycle phases
    #[error("{phase} failed for provider {provider}: {source}")]
    Lifecycle {
        phase: Phase,
        provider: String,
        #[source]
        source: Box<DiError>,
    },

    /// A plugin with the same name was already registered
    #[error("plugin already registered: {name}")]
    DuplicatePlugin { name: String },

    /// A plugin declares a dependency that was never registered
    #[error("plugin '{plugin}' depends on '{dependency}', which is not registered")]
    MissingDependency { plugin: String, dependency: String },

    /// Shutdown was cancelled before all hooks ran
    #[error("shutdown cancelled")]
    Cancelled,

    /// Shutdown ran past its deadline before all hooks ran
    #[error("shutdown deadline of {timeout:?} exceeded")]
    DeadlineExceeded { timeout: Duration },

    /// Failure reported by provider or hook code
    #[error("{0}")]
    Provider(String),

    /// Internal error
    #[error("internal kernel error: {0}")]
    Internal(String),
}

impl DiError {
    /// Create a NotFound error for a key
    #[inline]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Create a TypeMismatch error for a key and the requested type
    #[inline]
    pub fn type_mismatch<T: 'static>(key: impl Into<String>) -> Self {
        Self::TypeMismatch {
            key: key.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Create a CircularDependency error
    #[inline]
    pub fn circular(key: impl Into<String>) -> Self {
        Self::CircularDependency { key: key.into() }
    }

    /// Create an error from provider code
    #[inline]
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider(message.into())
    }

    /// Wrap an error with the lifecycle phase and provider it came from
    pub(crate) fn lifecycle(phase: Phase, provider: impl Into<String>, source: DiError) -> Self {
        Self::Lifecycle {
            phase,
            provider: provider.into(),
            source: Box::new(source),
        }
    }

    /// Phase of a lifecycle error, if this is one
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Lifecycle { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    /// Whether this error is a missing-binding error
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type alias for kernel operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = DiError::not_found("nonexistent");
        assert_eq!(err.to_string(), "binding not found for key: nonexistent");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_lifecycle_wraps_phase() {
        let err = DiError::lifecycle(Phase::Boot, "cache", DiError::provider("redis down"));
        assert_eq!(err.phase(), Some(Phase::Boot));
        assert_eq!(err.to_string(), "boot failed for provider cache: redis down");
    }

    #[test]
    fn test_missing_dependency_names_both() {
        let err = DiError::MissingDependency {
            plugin: "billing".into(),
            dependency: "auth".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("billing"));
        assert!(msg.contains("auth"));
    }
}
