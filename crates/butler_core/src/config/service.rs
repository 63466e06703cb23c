//! Configuration service used by the Butler.

use super::manager::ConfigResult;
use super::settings::{ButlerConfig, ButlerOverrides, ConfigKey, ConfigScope};
use super::store::ConfigStore;

/// Both layers as stored, for display in a settings editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigSnapshot {
    /// Project layer.
    pub project: ButlerOverrides,
    /// Local layer.
    pub local: ButlerOverrides,
    /// Values the Butler would use right now.
    pub effective: ButlerConfig,
}

/// Resolves and edits Butler settings on top of a [`ConfigStore`].
#[derive(Debug)]
pub struct ButlerConfigService<S> {
    store: S,
}

impl<S: ConfigStore> ButlerConfigService<S> {
    /// Create a service over a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve the thresholds for one invocation.
    ///
    /// Keys set in neither scope get their default written to the local
    /// layer, so the personal config always lists every setting.
    pub fn effective_config(&mut self) -> ConfigResult<ButlerConfig> {
        let project = self.store.load(ConfigScope::Project)?;
        let mut local = self.store.load(ConfigScope::Local)?;

        let absent: Vec<ConfigKey> = local
            .missing_keys()
            .filter(|key| project.get(*key).is_none())
            .collect();

        if !absent.is_empty() {
            for key in &absent {
                tracing::debug!(
                    "Setting '{}' missing, writing default {}",
                    key,
                    key.default_value()
                );
                local.set(*key, Some(key.default_value()));
            }
            self.store.save(ConfigScope::Local, &local)?;
        }

        let config = ButlerConfig::resolve(&project, &local);
        tracing::trace!("Effective Butler config: {:?}", config);
        Ok(config)
    }

    /// Both layers and the resolved values.
    pub fn snapshot(&mut self) -> ConfigResult<ConfigSnapshot> {
        let effective = self.effective_config()?;
        Ok(ConfigSnapshot {
            project: self.store.load(ConfigScope::Project)?,
            local: self.store.load(ConfigScope::Local)?,
            effective,
        })
    }

    /// Value of a key in one scope.
    pub fn get(&self, scope: ConfigScope, key: ConfigKey) -> ConfigResult<Option<u32>> {
        Ok(self.store.load(scope)?.get(key))
    }

    /// Set (or with `None`, clear) a key in one scope.
    pub fn set(&mut self, scope: ConfigScope, key: ConfigKey, value: Option<u32>) -> ConfigResult<()> {
        let mut layer = self.store.load(scope)?;
        layer.set(key, value);
        self.store.save(scope, &layer)?;
        tracing::info!(
            "Set {} '{}' to {}",
            scope,
            key,
            value.map_or_else(|| "unset".to_string(), |v| v.to_string())
        );
        Ok(())
    }

    /// Replace a whole layer, as a settings editor's save button does.
    pub fn save_layer(&mut self, scope: ConfigScope, layer: &ButlerOverrides) -> ConfigResult<()> {
        self.store.save(scope, layer)?;
        tracing::info!("{} config saved", scope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigStore;

    #[test]
    fn defaults_are_written_back_to_local() {
        let mut service = ButlerConfigService::new(MemoryConfigStore::new());
        let config = service.effective_config().unwrap();

        assert_eq!(config, ButlerConfig::default());
        let local = service.store().layer(ConfigScope::Local);
        assert!(local.missing_keys().next().is_none());
        assert_eq!(local.chain, Some(620));
        // Project layer stays untouched
        assert!(service.store().layer(ConfigScope::Project).is_empty());
    }

    #[test]
    fn project_value_is_not_shadowed_by_written_default() {
        let mut project = ButlerOverrides::default();
        project.set(ConfigKey::LeadIn, Some(40));
        let store = MemoryConfigStore::with_layers(project, ButlerOverrides::default());
        let mut service = ButlerConfigService::new(store);

        let config = service.effective_config().unwrap();
        assert_eq!(config.lead_in, 40);
        // Key defined by the project is not written to local
        assert_eq!(service.store().layer(ConfigScope::Local).lead_in, None);
    }

    #[test]
    fn project_overrides_local() {
        let mut service = ButlerConfigService::new(MemoryConfigStore::new());
        service
            .set(ConfigScope::Local, ConfigKey::SnapEndLater, Some(800))
            .unwrap();
        assert_eq!(service.effective_config().unwrap().snap_end_later, 800);

        service
            .set(ConfigScope::Project, ConfigKey::SnapEndLater, Some(1200))
            .unwrap();
        assert_eq!(service.effective_config().unwrap().snap_end_later, 1200);

        // Clearing the project value falls through to local again
        service
            .set(ConfigScope::Project, ConfigKey::SnapEndLater, None)
            .unwrap();
        assert_eq!(service.effective_config().unwrap().snap_end_later, 800);
    }

    #[test]
    fn resolved_fresh_on_every_call() {
        let mut service = ButlerConfigService::new(MemoryConfigStore::new());
        assert_eq!(service.effective_config().unwrap().lead_in, 120);

        let mut local = service.store().layer(ConfigScope::Local);
        local.set(ConfigKey::LeadIn, Some(60));
        service.save_layer(ConfigScope::Local, &local).unwrap();

        assert_eq!(service.effective_config().unwrap().lead_in, 60);
    }

    #[test]
    fn snapshot_reports_layers() {
        let mut service = ButlerConfigService::new(MemoryConfigStore::new());
        service
            .set(ConfigScope::Project, ConfigKey::ChainGap, Some(1))
            .unwrap();

        let snapshot = service.snapshot().unwrap();
        assert_eq!(snapshot.project.chain_gap, Some(1));
        assert_eq!(snapshot.local.chain_gap, None);
        assert_eq!(snapshot.local.lead_out, Some(400));
        assert_eq!(snapshot.effective.chain_gap, 1);
        assert_eq!(
            service.get(ConfigScope::Project, ConfigKey::ChainGap).unwrap(),
            Some(1)
        );
    }
}
