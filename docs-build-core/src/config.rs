//! Documentation tables (`conf.json`) and the small JSON load/save helpers.
//!
//! The configuration is read once and treated as read-only by the rest of the core.
//! Language and scope tables keep their source order: the first entry is the default
//! used when a filter is left at `*` and a concrete value is needed (preview paths).

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::filter::Dimension;
use crate::glossary::Glossary;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialise JSON: {0}")]
    Serialise(#[source] serde_json::Error),
}

/// Ordered `code -> display name` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedTable {
    entries: Vec<(String, String)>,
}

impl NamedTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entry; replacing keeps the original position.
    pub fn insert(&mut self, code: impl Into<String>, name: impl Into<String>) {
        let code = code.into();
        let name = name.into();
        match self.entries.iter_mut().find(|(c, _)| *c == code) {
            Some(entry) => entry.1 = name,
            None => self.entries.push((code, name)),
        }
    }

    pub fn get(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, n)| n.as_str())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.get(code).is_some()
    }

    pub fn first_code(&self) -> Option<&str> {
        self.entries.first().map(|(c, _)| c.as_str())
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, n)| (c.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NamedTable {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut table = NamedTable::new();
        for (k, v) in iter {
            table.insert(k, v);
        }
        table
    }
}

impl Serialize for NamedTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (code, name) in &self.entries {
            map.serialize_entry(code, name)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NamedTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = NamedTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of codes to display names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<NamedTable, A::Error> {
                let mut table = NamedTable::new();
                while let Some((code, name)) = access.next_entry::<String, String>()? {
                    table.insert(code, name);
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Contents of `conf.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocsConfig {
    /// Language code -> display name, e.g. `en -> English`.
    #[serde(default)]
    pub langs: NamedTable,
    /// Version tags, newest first.
    #[serde(default)]
    pub vers: Vec<String>,
    /// Version currently being documented.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Scope namespace -> display name, e.g. `app -> Reference`.
    #[serde(default)]
    pub scopes: NamedTable,
    #[serde(default, rename = "regHide", skip_serializing_if = "Option::is_none")]
    pub reg_hide: Option<String>,
    #[serde(default, rename = "regControl", skip_serializing_if = "Option::is_none")]
    pub reg_control: Option<String>,
    /// Glossary short-code -> category name.
    #[serde(default)]
    pub tname: NamedTable,
    /// Glossary short-code -> description.
    #[serde(default)]
    pub tdesc: NamedTable,
}

impl DocsConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(config_path = ?path, "Loading documentation config");
        let content = fs::read_to_string(path).map_err(|source| {
            error!(error = ?source, config_path = ?path, "Failed to read documentation config");
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let config: DocsConfig = serde_json::from_str(&content).map_err(|source| {
            error!(error = ?source, config_path = ?path, "Failed to parse documentation config");
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        config.trace_loaded();
        Ok(config)
    }

    pub fn trace_loaded(&self) {
        info!(
            langs = self.langs.len(),
            vers = self.vers.len(),
            scopes = self.scopes.len(),
            glossary_terms = self.tname.len() + self.tdesc.len(),
            "Loaded DocsConfig"
        );
        debug!(?self, "DocsConfig loaded (full debug)");
    }

    /// Values a filter dimension may take besides `*`. The name dimension is not
    /// enumerable and yields nothing.
    pub fn values(&self, dimension: Dimension) -> Vec<&str> {
        match dimension {
            Dimension::Language => self.langs.codes().collect(),
            Dimension::Version => self.vers.iter().map(String::as_str).collect(),
            Dimension::Scope => self.scopes.codes().collect(),
            Dimension::Name => Vec::new(),
        }
    }

    pub fn allows(&self, dimension: Dimension, value: &str) -> bool {
        match dimension {
            Dimension::Language => self.langs.contains(value),
            Dimension::Version => self.vers.iter().any(|v| v == value),
            Dimension::Scope => self.scopes.contains(value),
            Dimension::Name => false,
        }
    }

    pub fn default_language(&self) -> Option<&str> {
        self.langs.first_code()
    }

    pub fn default_version(&self) -> Option<&str> {
        self.vers.first().map(String::as_str)
    }

    pub fn glossary(&self) -> Glossary {
        Glossary::from_tables(&self.tname, &self.tdesc)
    }
}

/// Resolves `file` against `base`, expanding a leading `~/` to the home directory.
pub fn resolve_path(base: &Path, file: &str) -> PathBuf {
    if let Some(rest) = file.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    base.join(file)
}

/// Reads a JSON document, yielding `T::default()` when the file does not exist.
pub fn load_json<T>(base: &Path, file: &str) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let path = resolve_path(base, file);
    if !path.exists() {
        debug!(path = %path.display(), "JSON file absent, using defaults");
        return Ok(T::default());
    }
    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
}

/// Writes `data` as two-space indented JSON.
pub fn save_json<T: Serialize>(base: &Path, file: &str, data: &T) -> Result<(), ConfigError> {
    let path = resolve_path(base, file);
    let content = serde_json::to_string_pretty(data).map_err(ConfigError::Serialise)?;
    fs::write(&path, content).map_err(|source| ConfigError::Write {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "Saved JSON file");
    Ok(())
}
