//! TOML-backed settings store.
//!
//! Key features:
//! - One file per scope (project file, personal file)
//! - Only the `[timing_butler]` table is rewritten; other tables and
//!   their comments are preserved with toml_edit
//! - Atomic writes (write to temp file, then rename)

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ButlerOverrides, ConfigScope};
use super::store::ConfigStore;

/// Name of the table holding the Butler settings.
pub const BUTLER_TABLE: &str = "timing_butler";

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError { path: PathBuf, source: io::Error },

    #[error("Failed to write config file '{path}': {source}")]
    WriteError { path: PathBuf, source: io::Error },

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("'{table}' in {path} is not a table")]
    MalformedTable { path: PathBuf, table: &'static str },
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Shape of a config file; unrelated tables are ignored.
#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    timing_butler: ButlerOverrides,
}

/// Settings store keeping each scope in its own TOML file.
#[derive(Debug, Clone)]
pub struct TomlConfigStore {
    project_path: PathBuf,
    local_path: PathBuf,
}

impl TomlConfigStore {
    /// Create a store over the given files. Nothing is read until `load()`.
    pub fn new(project_path: impl Into<PathBuf>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            local_path: local_path.into(),
        }
    }

    /// File backing a scope.
    pub fn path(&self, scope: ConfigScope) -> &Path {
        match scope {
            ConfigScope::Project => &self.project_path,
            ConfigScope::Local => &self.local_path,
        }
    }

    fn read(path: &Path) -> ConfigResult<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(path)
            .map(Some)
            .map_err(|source| ConfigError::ReadError {
                path: path.to_path_buf(),
                source,
            })
    }

}

/// Write content to a file atomically.
///
/// Writes to `<path>.tmp` next to the target first, then renames, so
/// readers see either the old or the new content.
pub(crate) fn atomic_write(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let temp_path = temp_path_for(path);

    {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

impl ConfigStore for TomlConfigStore {
    fn load(&self, scope: ConfigScope) -> ConfigResult<ButlerOverrides> {
        let path = self.path(scope);
        let Some(content) = Self::read(path)? else {
            tracing::debug!("No {} config at {}, using empty layer", scope, path.display());
            return Ok(ButlerOverrides::default());
        };

        let file: ConfigFile = toml::from_str(&content)?;
        Ok(file.timing_butler)
    }

    fn save(&mut self, scope: ConfigScope, layer: &ButlerOverrides) -> ConfigResult<()> {
        let path = self.path(scope).to_path_buf();

        // Re-read current file from disk so other tables are kept as-is
        let mut doc: DocumentMut = match Self::read(&path)? {
            Some(content) if !content.trim().is_empty() => content.parse()?,
            _ => DocumentMut::new(),
        };

        if doc.get(BUTLER_TABLE).is_some_and(|item| !item.is_table()) {
            return Err(ConfigError::MalformedTable {
                path,
                table: BUTLER_TABLE,
            });
        }

        let section_doc: DocumentMut = toml::to_string_pretty(layer)?.parse()?;
        doc[BUTLER_TABLE] = Item::Table(section_doc.as_table().clone());

        atomic_write(&path, &doc.to_string())
            .map_err(|source| ConfigError::WriteError { path: path.clone(), source })?;

        tracing::debug!("Saved {} config to {}", scope, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigKey;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> TomlConfigStore {
        TomlConfigStore::new(dir.join("project.toml"), dir.join(".config").join("butler.toml"))
    }

    #[test]
    fn missing_files_load_empty() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(store.load(ConfigScope::Project).unwrap().is_empty());
        assert!(store.load(ConfigScope::Local).unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path());

        let mut layer = ButlerOverrides::default();
        layer.set(ConfigKey::LeadIn, Some(90));
        layer.set(ConfigKey::ChainGap, Some(2));
        store.save(ConfigScope::Local, &layer).unwrap();

        // Parent directory is created on demand
        assert!(store.path(ConfigScope::Local).exists());
        assert_eq!(store.load(ConfigScope::Local).unwrap(), layer);
        assert!(store.load(ConfigScope::Project).unwrap().is_empty());
    }

    #[test]
    fn save_preserves_other_tables_and_comments() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path());
        let project = store.path(ConfigScope::Project).to_path_buf();
        fs::write(
            &project,
            "# Project settings\n[other_script]\nenabled = true # keep me\n\n[timing_butler]\nlead_in = 10\n",
        )
        .unwrap();

        let mut layer = store.load(ConfigScope::Project).unwrap();
        assert_eq!(layer.lead_in, Some(10));
        layer.set(ConfigKey::SnapEndLater, Some(700));
        store.save(ConfigScope::Project, &layer).unwrap();

        let content = fs::read_to_string(&project).unwrap();
        assert!(content.contains("# Project settings"));
        assert!(content.contains("enabled = true # keep me"));
        assert!(content.contains("snap_end_later = 700"));
        assert!(content.contains("lead_in = 10"));
    }

    #[test]
    fn legacy_sentinel_is_read_as_unset() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(
            store.path(ConfigScope::Project),
            "[timing_butler]\nLeadIn = -1\nChain = 400\n",
        )
        .unwrap();

        let layer = store.load(ConfigScope::Project).unwrap();
        assert_eq!(layer.lead_in, None);
        assert_eq!(layer.chain, Some(400));
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path());
        store
            .save(ConfigScope::Project, &ButlerOverrides::default())
            .unwrap();

        let temp_path = temp_path_for(store.path(ConfigScope::Project));
        assert_eq!(temp_path, dir.path().join("project.toml.tmp"));
        assert!(!temp_path.exists());
    }

    #[test]
    fn non_table_entry_is_rejected() {
        let dir = tempdir().unwrap();
        let mut store = store_in(dir.path());
        let local = store.path(ConfigScope::Local).to_path_buf();
        fs::create_dir_all(local.parent().unwrap()).unwrap();
        fs::write(&local, "timing_butler = 5\n").unwrap();

        let err = store
            .save(ConfigScope::Local, &ButlerOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::MalformedTable { .. }));
        assert!(store.load(ConfigScope::Local).is_err());
    }
}
