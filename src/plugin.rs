//! Plugin identity index
//!
//! Tracks registered plugin names for duplicate detection and checks
//! declared dependencies before the application finishes booting.

use crate::{DiError, Plugin, Result};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(feature = "logging")]
use tracing::debug;

/// Snapshot of a plugin's identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub dependencies: Vec<String>,
}

impl PluginInfo {
    /// Capture the identity of a plugin
    pub fn of(plugin: &dyn Plugin) -> Self {
        Self {
            name: plugin.name().to_string(),
            version: plugin.version().to_string(),
            dependencies: plugin.dependencies(),
        }
    }
}

struct Slot {
    info: PluginInfo,
    seq: u64,
}

/// Registered plugins keyed by name
pub(crate) struct PluginRegistry {
    plugins: DashMap<String, Slot, RandomState>,
    next_seq: AtomicU64,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: DashMap::with_hasher(RandomState::new()),
            next_seq: AtomicU64::new(0),
        }
    }

    /// Claim `info.name`, failing if another plugin already holds it.
    pub fn reserve(&self, info: PluginInfo) -> Result<()> {
        match self.plugins.entry(info.name.clone()) {
            Entry::Occupied(_) => {
                #[cfg(feature = "logging")]
                debug!(
                    target: "armature_kernel",
                    plugin = %info.name,
                    "Rejecting duplicate plugin"
                );
                Err(DiError::DuplicatePlugin { name: info.name })
            }
            Entry::Vacant(slot) => {
                let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
                slot.insert(Slot { info, seq });
                Ok(())
            }
        }
    }

    /// Give a name back after the plugin failed to register
    pub fn release(&self, name: &str) {
        self.plugins.remove(name);
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Plugins in registration order
    pub fn list(&self) -> Vec<PluginInfo> {
        let mut entries: Vec<(u64, PluginInfo)> = self
            .plugins
            .iter()
            .map(|e| (e.value().seq, e.value().info.clone()))
            .collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.into_iter().map(|(_, info)| info).collect()
    }

    /// Check that every declared dependency names a registered plugin.
    ///
    /// Only presence is checked; boot order stays registration order.
    pub fn validate(&self) -> Result<()> {
        self.list().iter().try_for_each(|plugin| self.check(plugin))
    }

    /// Check the dependencies of the single plugin registered as `name`
    pub fn validate_one(&self, name: &str) -> Result<()> {
        let info = self.plugins.get(name).map(|slot| slot.info.clone());
        match info {
            Some(info) => self.check(&info),
            None => Ok(()),
        }
    }

    fn check(&self, plugin: &PluginInfo) -> Result<()> {
        match plugin
            .dependencies
            .iter()
            .find(|dep| !self.plugins.contains_key(dep.as_str()))
        {
            Some(missing) => Err(DiError::MissingDependency {
                plugin: plugin.name.clone(),
                dependency: missing.clone(),
            }),
            None => Ok(()),
        }
    }

    pub fn clear(&self) {
        self.plugins.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(name: &str, deps: &[&str]) -> PluginInfo {
        PluginInfo {
            name: name.into(),
            version: "1.0.0".into(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_reserve_rejects_duplicate() {
        let registry = PluginRegistry::new();
        registry.reserve(info("auth", &[])).unwrap();

        let err = registry.reserve(info("auth", &[])).unwrap_err();
        assert!(matches!(err, DiError::DuplicatePlugin { name } if name == "auth"));
    }

    #[test]
    fn test_release_frees_name() {
        let registry = PluginRegistry::new();
        registry.reserve(info("auth", &[])).unwrap();
        registry.release("auth");

        assert!(registry.reserve(info("auth", &[])).is_ok());
    }

    #[test]
    fn test_validate_reports_missing() {
        let registry = PluginRegistry::new();
        registry.reserve(info("billing", &["auth"])).unwrap();

        let err = registry.validate().unwrap_err();
        assert!(matches!(
            err,
            DiError::MissingDependency { ref plugin, ref dependency }
                if plugin == "billing" && dependency == "auth"
        ));

        registry.reserve(info("auth", &[])).unwrap();
        assert!(registry.validate().is_ok());
    }

    #[test]
    fn test_validate_one_checks_only_that_plugin() {
        let registry = PluginRegistry::new();
        registry.reserve(info("billing", &["auth"])).unwrap();
        registry.reserve(info("search", &[])).unwrap();

        assert!(registry.validate_one("search").is_ok());
        assert!(matches!(
            registry.validate_one("billing"),
            Err(DiError::MissingDependency { .. })
        ));
    }

    #[test]
    fn test_list_keeps_registration_order() {
        let registry = PluginRegistry::new();
        for name in ["c", "a", "b"] {
            registry.reserve(info(name, &[])).unwrap();
        }

        let names: Vec<String> = registry.list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
