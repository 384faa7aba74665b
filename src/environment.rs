//! Runtime environment and application paths

use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable consulted when no environment is set explicitly
pub const DEFAULT_ENV_VAR: &str = "APP_ENV";

/// Deployment environment the application runs in
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Environment {
    Production,
    #[default]
    Development,
    Testing,
    /// Any other name, kept verbatim
    Other(String),
}

impl Environment {
    /// Parse an environment name, case-insensitively.
    ///
    /// ```rust
    /// use armature_kernel::Environment;
    ///
    /// assert_eq!(Environment::parse("PROD"), Environment::Production);
    /// assert_eq!(Environment::parse("staging"), Environment::Other("staging".into()));
    /// ```
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Environment::Production,
            "dev" | "development" | "local" | "" => Environment::Development,
            "test" | "testing" => Environment::Testing,
            _ => Environment::Other(name.trim().to_string()),
        }
    }

    /// Read the environment from `var`; unset means development
    pub fn from_env_var(var: &str) -> Self {
        std::env::var(var)
            .map(|v| Self::parse(&v))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        match self {
            Environment::Production => "production",
            Environment::Development => "development",
            Environment::Testing => "testing",
            Environment::Other(name) => name,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known directories under the application base path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    base: PathBuf,
}

impl Paths {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Current working directory, falling back to `.`
    pub fn from_current_dir() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `base/<sub>`
    pub fn base_path(&self, sub: impl AsRef<Path>) -> PathBuf {
        join(&self.base, sub)
    }

    /// `base/config/<sub>`
    pub fn config_path(&self, sub: impl AsRef<Path>) -> PathBuf {
        join(&self.base.join("config"), sub)
    }

    /// `base/storage/<sub>`
    pub fn storage_path(&self, sub: impl AsRef<Path>) -> PathBuf {
        join(&self.base.join("storage"), sub)
    }

    /// `base/resources/<sub>`
    pub fn resource_path(&self, sub: impl AsRef<Path>) -> PathBuf {
        join(&self.base.join("resources"), sub)
    }

    /// `base/bootstrap/<sub>`
    pub fn bootstrap_path(&self, sub: impl AsRef<Path>) -> PathBuf {
        join(&self.base.join("bootstrap"), sub)
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::from_current_dir()
    }
}

fn join(dir: &Path, sub: impl AsRef<Path>) -> PathBuf {
    let sub = sub.as_ref();
    if sub.as_os_str().is_empty() {
        dir.to_path_buf()
    } else {
        dir.join(sub)
    }
}
