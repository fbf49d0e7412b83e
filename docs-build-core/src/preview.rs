//! Locating the generated page that best matches the current filter.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::DocsConfig;
use crate::filter::{FilterState, WILDCARD};

pub const INDEX_PAGE: &str = "Docs.htm";

/// Output folder for a language: English and `*` share `docs`.
pub fn lang_dir(language: &str) -> String {
    if language == WILDCARD || language == "en" {
        "docs".to_string()
    } else {
        format!("docs-{language}")
    }
}

/// `out/<langDir>/<version>/...` below `root`, or `None` when the page does not
/// exist.
///
/// With no name filter the page is `Docs.htm` (all scopes) or the scope's title
/// without whitespace. With a name filter, a single matching file in the scope
/// folder is chosen; zero or several matches fall back to `Docs.htm`.
pub fn resolve_preview_path(root: &Path, config: &DocsConfig, filter: &FilterState) -> Option<PathBuf> {
    let language = match filter.language() {
        WILDCARD => config.default_language().unwrap_or("en"),
        lang => lang,
    };
    let version = match filter.version() {
        WILDCARD => config.default_version()?,
        ver => ver,
    };
    let base = root.join("out").join(lang_dir(language)).join(version);

    let page = if !filter.has_name_filter() {
        match filter.scope() {
            WILDCARD => base.join(INDEX_PAGE),
            scope => {
                let title = config.scopes.get(scope)?;
                let file: String = title.chars().filter(|c| !c.is_whitespace()).collect();
                base.join(format!("{file}.htm"))
            }
        }
    } else {
        let pattern = base.join(filter.scope()).join(name_glob(filter.name()));
        let matches: Vec<PathBuf> = glob::glob(&pattern.to_string_lossy())
            .map(|paths| paths.filter_map(Result::ok).collect())
            .unwrap_or_default();
        debug!(pattern = %pattern.display(), matches = matches.len(), "Preview lookup");
        match matches.as_slice() {
            [single] => single.clone(),
            _ => base.join(INDEX_PAGE),
        }
    };

    page.exists().then_some(page)
}

/// `*<name>*` with `.*` read as `*`. Runs of `*` collapse to one, since `glob`
/// only accepts `**` as a whole path component.
fn name_glob(name: &str) -> String {
    let raw = format!("*{}*", name.replace(".*", "*"));
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '*' && out.ends_with('*') {
            continue;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::name_glob;

    #[test]
    fn name_glob_collapses_stars() {
        assert_eq!(name_glob("CreateBut.*"), "*CreateBut*");
        assert_eq!(name_glob("Add"), "*Add*");
        assert_eq!(name_glob("*"), "*");
    }
}
