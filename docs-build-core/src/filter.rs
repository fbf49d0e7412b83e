//! Session filter state: language, version, scope and name pattern.
//!
//! All mutation goes through validated setters. A rejected value leaves the
//! state exactly as it was.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::config::DocsConfig;

/// Matches every value of a dimension.
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Language,
    Version,
    Scope,
    Name,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Language,
        Dimension::Version,
        Dimension::Scope,
        Dimension::Name,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Language => "language",
            Dimension::Version => "version",
            Dimension::Scope => "scope",
            Dimension::Name => "name",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "language" | "lang" => Ok(Dimension::Language),
            "version" | "ver" => Ok(Dimension::Version),
            "scope" => Ok(Dimension::Scope),
            "name" => Ok(Dimension::Name),
            other => Err(format!("unknown filter dimension '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("invalid {dimension} filter value '{value}'")]
    InvalidFilterValue { dimension: Dimension, value: String },
    #[error("invalid RegExp pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    language: String,
    version: String,
    scope: String,
    name: String,
    last_action: Option<String>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            language: WILDCARD.to_string(),
            version: WILDCARD.to_string(),
            scope: WILDCARD.to_string(),
            name: WILDCARD.to_string(),
            last_action: None,
        }
    }
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The name filter as a validated regular-expression source, or `*`.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Language => &self.language,
            Dimension::Version => &self.version,
            Dimension::Scope => &self.scope,
            Dimension::Name => &self.name,
        }
    }

    pub fn has_name_filter(&self) -> bool {
        self.name != WILDCARD
    }

    pub fn name_regex(&self) -> Option<Regex> {
        if self.has_name_filter() {
            Regex::new(&self.name).ok()
        } else {
            None
        }
    }

    pub fn last_action(&self) -> Option<&str> {
        self.last_action.as_deref()
    }

    pub fn set_last_action(&mut self, action: impl Into<String>) {
        self.last_action = Some(action.into());
    }

    /// Sets one dimension. Enumerable dimensions accept `*` or a configured value;
    /// the name dimension is routed through [`FilterState::set_name_pattern`].
    pub fn set_filter(
        &mut self,
        config: &DocsConfig,
        dimension: Dimension,
        value: &str,
    ) -> Result<(), FilterError> {
        if dimension == Dimension::Name {
            return self.set_name_pattern(value);
        }
        if value != WILDCARD && !config.allows(dimension, value) {
            warn!(%dimension, value, "Rejected filter value");
            return Err(FilterError::InvalidFilterValue {
                dimension,
                value: value.to_string(),
            });
        }
        let slot = match dimension {
            Dimension::Language => &mut self.language,
            Dimension::Version => &mut self.version,
            Dimension::Scope => &mut self.scope,
            Dimension::Name => unreachable!("name handled above"),
        };
        *slot = value.to_string();
        debug!(%dimension, value, "Filter updated");
        Ok(())
    }

    /// Compiles `pattern` and stores the expression source. `*` clears the filter.
    pub fn set_name_pattern(&mut self, pattern: &str) -> Result<(), FilterError> {
        if pattern == WILDCARD {
            self.name = WILDCARD.to_string();
            return Ok(());
        }
        if pattern.is_empty() {
            return Err(FilterError::InvalidPattern {
                pattern: String::new(),
                reason: "empty pattern".to_string(),
            });
        }
        let regex = Regex::new(pattern).map_err(|e| {
            warn!(pattern, error = %e, "Rejected name pattern");
            FilterError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
        })?;
        self.name = regex.as_str().to_string();
        debug!(name = %self.name, "Name filter updated");
        Ok(())
    }

    /// Applies a `<lang>.<scope>.<name>` target. Parts may be `*`; missing trailing
    /// parts are left untouched. Nothing changes unless every part is valid.
    pub fn apply_target(&mut self, config: &DocsConfig, target: &str) -> Result<(), FilterError> {
        let mut next = self.clone();
        let mut parts = target.splitn(3, '.');
        if let Some(lang) = parts.next().filter(|p| !p.is_empty()) {
            next.set_filter(config, Dimension::Language, lang)?;
        }
        if let Some(scope) = parts.next().filter(|p| !p.is_empty()) {
            next.set_filter(config, Dimension::Scope, scope)?;
        }
        if let Some(name) = parts.next().filter(|p| !p.is_empty()) {
            next.set_name_pattern(name)?;
        }
        *self = next;
        Ok(())
    }

    /// Returns every dimension to `*`. The last action label is kept.
    pub fn reset(&mut self) {
        let last_action = self.last_action.take();
        *self = Self {
            last_action,
            ..Self::default()
        };
    }

    pub fn describe(&self) -> String {
        format!(
            "language: {}\nversion: {}\nscope: {}\nname: {}",
            self.language, self.version, self.scope, self.name
        )
    }

    /// Pick-list entries for a dimension: `code (Name)` for mapped tables, plain
    /// values for versions, then `* (all)`.
    pub fn choices(config: &DocsConfig, dimension: Dimension) -> Vec<String> {
        let mut items: Vec<String> = match dimension {
            Dimension::Language => config
                .langs
                .iter()
                .map(|(c, n)| format!("{c} ({n})"))
                .collect(),
            Dimension::Scope => config
                .scopes
                .iter()
                .map(|(c, n)| format!("{c} ({n})"))
                .collect(),
            Dimension::Version => config.vers.clone(),
            Dimension::Name => Vec::new(),
        };
        items.push(format!("{WILDCARD} (all)"));
        items
    }

    /// The value part of a pick-list entry.
    pub fn parse_choice(choice: &str) -> &str {
        choice.split_whitespace().next().unwrap_or(WILDCARD)
    }
}
