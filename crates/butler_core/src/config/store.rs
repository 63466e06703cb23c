//! Storage of the per-scope Butler settings.

use std::collections::HashMap;

use super::manager::ConfigResult;
use super::settings::{ButlerOverrides, ConfigScope};

/// Backing store for the project and local settings layers.
pub trait ConfigStore {
    /// Load the layer of a scope. A scope that was never saved is empty.
    fn load(&self, scope: ConfigScope) -> ConfigResult<ButlerOverrides>;

    /// Replace the layer of a scope.
    fn save(&mut self, scope: ConfigScope, layer: &ButlerOverrides) -> ConfigResult<()>;
}

/// In-memory store, for tests and hosts that persist settings themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    layers: HashMap<ConfigScope, ButlerOverrides>,
}

impl MemoryConfigStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with both layers preset.
    pub fn with_layers(project: ButlerOverrides, local: ButlerOverrides) -> Self {
        let mut layers = HashMap::new();
        layers.insert(ConfigScope::Project, project);
        layers.insert(ConfigScope::Local, local);
        Self { layers }
    }

    /// Current layer of a scope.
    pub fn layer(&self, scope: ConfigScope) -> ButlerOverrides {
        self.layers.get(&scope).copied().unwrap_or_default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self, scope: ConfigScope) -> ConfigResult<ButlerOverrides> {
        Ok(self.layer(scope))
    }

    fn save(&mut self, scope: ConfigScope, layer: &ButlerOverrides) -> ConfigResult<()> {
        self.layers.insert(scope, *layer);
        Ok(())
    }
}

impl<S: ConfigStore + ?Sized> ConfigStore for &mut S {
    fn load(&self, scope: ConfigScope) -> ConfigResult<ButlerOverrides> {
        (**self).load(scope)
    }

    fn save(&mut self, scope: ConfigScope, layer: &ButlerOverrides) -> ConfigResult<()> {
        (**self).save(scope, layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigKey;

    #[test]
    fn unsaved_scope_is_empty() {
        let store = MemoryConfigStore::new();
        assert!(store.load(ConfigScope::Project).unwrap().is_empty());
        assert!(store.load(ConfigScope::Local).unwrap().is_empty());
    }

    #[test]
    fn scopes_are_independent() {
        let mut store = MemoryConfigStore::new();
        let mut layer = ButlerOverrides::default();
        layer.set(ConfigKey::LeadOut, Some(10));
        store.save(ConfigScope::Local, &layer).unwrap();

        assert_eq!(store.layer(ConfigScope::Local).lead_out, Some(10));
        assert_eq!(store.layer(ConfigScope::Project).lead_out, None);
    }
}
