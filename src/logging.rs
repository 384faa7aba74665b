//! Log subscriber setup
//!
//! The kernel emits `tracing` events under the `armature_kernel` target.
//! This module installs a subscriber for binaries and demos that do not bring
//! their own.
//!
//! # Features
//!
//! - `logging` - emit events (default)
//! - `logging-json` - install a JSON subscriber
//! - `logging-pretty` - install a human-readable subscriber
//!
//! # Example
//!
//! ```rust,ignore
//! use armature_kernel::logging;
//!
//! logging::builder()
//!     .info()
//!     .kernel_only()
//!     .pretty()
//!     .init();
//! ```

use tracing::Level;

/// Target used by every kernel event
pub const TARGET: &str = "armature_kernel";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON lines (production default)
    #[default]
    Json,
    /// Multi-line, colourful
    Pretty,
    /// Single line
    Compact,
}

/// Builder for the global subscriber
#[derive(Debug, Clone)]
#[cfg_attr(
    not(any(feature = "logging-json", feature = "logging-pretty")),
    allow(dead_code)
)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    respect_env: bool,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Json,
            target: None,
            respect_env: true,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    /// Only show events from `target`
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show kernel events
    pub fn kernel_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Ignore `RUST_LOG` even when it is set
    pub fn ignore_env(mut self) -> Self {
        self.respect_env = false;
        self
    }

    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Directive string handed to `EnvFilter` when `RUST_LOG` is not used
    #[cfg_attr(
        not(any(feature = "logging-json", feature = "logging-pretty")),
        allow(dead_code)
    )]
    fn directive(&self) -> String {
        match self.target {
            Some(target) => format!("{}={}", target, self.level),
            None => self.level.to_string(),
        }
    }

    /// Install the subscriber. Does nothing if one is already installed.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn init(self) {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = if self.respect_env {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()))
        } else {
            EnvFilter::new(self.directive())
        };

        let layer = fmt::layer()
            .with_file(self.with_file)
            .with_line_number(self.with_line_number)
            .with_thread_ids(self.with_thread_ids)
            .with_target(true);

        let registry = tracing_subscriber::registry().with(filter);
        let _ = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => registry.with(layer.json()).try_init(),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => registry.with(layer).try_init(),
            LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
            LogFormat::Compact => registry.with(layer.compact()).try_init(),
        };
    }

    /// Install the subscriber (no-op without a subscriber feature)
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn init(self) {}
}

pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// JSON if `logging-json` is enabled, otherwise pretty
pub fn init() {
    #[cfg(feature = "logging-json")]
    init_json();
    #[cfg(not(feature = "logging-json"))]
    init_pretty();
}

pub fn init_json() {
    builder().json().debug().init();
}

pub fn init_pretty() {
    builder().pretty().debug().init();
}

/// Debug-level kernel events only
pub fn init_kernel_only() {
    builder().kernel_only().debug().init();
}
